//! Rule repository with atomically swapped snapshots
//!
//! Readers take an `Arc<RuleSet>` snapshot and keep it for a whole pass or
//! batch; a reload builds a complete new set and swaps it in, so a reader
//! sees either the old set or the new one, never a mix. Reloads are
//! serialized and a failed reload leaves the current snapshot in place.

use crate::logging::log_rules_loaded;
use arc_swap::ArcSwap;
use invr_domain::entities::RuleSet;
use invr_domain::error::Result;
use invr_domain::ports::RuleSource;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Holds the current rule set and reloads it from a [`RuleSource`]
pub struct RuleStore {
    source: Arc<dyn RuleSource>,
    current: ArcSwap<RuleSet>,
    reload_lock: Mutex<()>,
    generation: AtomicU64,
}

impl RuleStore {
    /// Load the initial rule set; failure here is fatal to the caller
    pub async fn open(source: Arc<dyn RuleSource>) -> Result<Self> {
        let origin = source.describe();
        let initial = source.load().await;
        log_rules_loaded(&origin, initial.as_ref().map(RuleSet::len));
        Ok(Self::with_rules(source, initial?))
    }

    /// Start from an already built rule set
    pub fn with_rules(source: Arc<dyn RuleSource>, rules: RuleSet) -> Self {
        Self {
            source,
            current: ArcSwap::from_pointee(rules),
            reload_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// The current rule set
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.current.load_full()
    }

    /// Rebuild the rule set from the source and swap it in
    ///
    /// On error the previous snapshot stays current and the error is returned.
    pub async fn reload(&self) -> Result<Arc<RuleSet>> {
        let _guard = self.reload_lock.lock().await;
        let origin = self.source.describe();
        match self.source.load().await {
            Ok(rules) => {
                let rules = Arc::new(rules);
                self.current.store(Arc::clone(&rules));
                self.generation.fetch_add(1, Ordering::SeqCst);
                log_rules_loaded(&origin, Ok(rules.len()));
                Ok(rules)
            }
            Err(e) => {
                log_rules_loaded(&origin, Err(&e));
                Err(e)
            }
        }
    }

    /// Number of successful reloads since the store was opened
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn describe(&self) -> String {
        self.source.describe()
    }
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore")
            .field("source", &self.source.describe())
            .field("rules", &self.current.load().len())
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}
