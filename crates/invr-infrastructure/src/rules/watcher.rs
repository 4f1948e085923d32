//! Rule file watcher for hot reloading
//!
//! Reloads the [`RuleStore`] whenever a watched rule file is written or
//! created. Subscribers receive a [`RuleWatchEvent`] per attempt.

use crate::constants::{RULE_EVENT_CHANNEL_CAPACITY, RULE_RELOAD_DEBOUNCE_MS};
use crate::error_ext::ErrorContext;
use crate::rules::store::RuleStore;
use invr_domain::error::{Error, Result};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Rule watch event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleWatchEvent {
    /// Rule set reloaded; carries the new rule count
    Reloaded(usize),
    /// Reload failed; the previous rule set is still active
    ReloadFailed(String),
}

/// Watches a rule file or directory and reloads the store on change
pub struct RuleWatcher {
    path: PathBuf,
    store: Arc<RuleStore>,
    event_sender: Sender<RuleWatchEvent>,
    _watcher: RecommendedWatcher,
}

impl RuleWatcher {
    /// Start watching `path`; must be called inside a tokio runtime
    pub fn new(path: PathBuf, store: Arc<RuleStore>) -> Result<Self> {
        let (event_sender, _) = broadcast::channel(RULE_EVENT_CHANNEL_CAPACITY);

        let mut watcher = Self::create_file_watcher(Arc::clone(&store), event_sender.clone())?;

        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&path, mode)
            .config_context(format!("Failed to watch rules at {}", path.display()))?;

        Ok(Self {
            path,
            store,
            event_sender,
            _watcher: watcher,
        })
    }

    /// Subscribe to reload events
    pub fn subscribe(&self) -> Receiver<RuleWatchEvent> {
        self.event_sender.subscribe()
    }

    /// Manually trigger a reload
    pub async fn reload(&self) -> Result<usize> {
        let event = reload_event(&self.store).await;
        let _ = self.event_sender.send(event.clone());
        match event {
            RuleWatchEvent::Reloaded(count) => Ok(count),
            RuleWatchEvent::ReloadFailed(message) => Err(Error::rule_load(message)),
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn create_file_watcher(
        store: Arc<RuleStore>,
        event_sender: Sender<RuleWatchEvent>,
    ) -> Result<RecommendedWatcher> {
        // notify calls back on its own thread
        let runtime_handle =
            Handle::try_current().config_context("Rule watching needs a tokio runtime")?;

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let store = Arc::clone(&store);
                let event_sender = event_sender.clone();

                runtime_handle.spawn(async move {
                    match res {
                        Ok(event) if should_reload(&event) => {
                            tokio::time::sleep(Duration::from_millis(RULE_RELOAD_DEBOUNCE_MS))
                                .await;
                            let _ = event_sender.send(reload_event(&store).await);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let _ = event_sender.send(RuleWatchEvent::ReloadFailed(format!(
                                "File watch error: {e}"
                            )));
                        }
                    }
                });
            },
            Config::default(),
        )
        .config_context("Failed to create file watcher")?;

        Ok(watcher)
    }
}

impl std::fmt::Debug for RuleWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleWatcher")
            .field("path", &self.path)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Only writes and creations trigger a reload
fn should_reload(event: &Event) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any | ModifyKind::Name(_))
            | EventKind::Create(_)
            | EventKind::Remove(_)
    );
    relevant_kind && event.paths.iter().any(|p| is_watched_file(p))
}

fn is_watched_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| crate::constants::RULE_FILE_EXTENSIONS.contains(&e))
}

async fn reload_event(store: &RuleStore) -> RuleWatchEvent {
    match store.reload().await {
        Ok(rules) => RuleWatchEvent::Reloaded(rules.len()),
        Err(e) => RuleWatchEvent::ReloadFailed(format!("Failed to reload rules: {e}")),
    }
}

/// Rule watcher builder
#[derive(Debug, Default)]
pub struct RuleWatcherBuilder {
    path: Option<PathBuf>,
    store: Option<Arc<RuleStore>>,
}

impl RuleWatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<RuleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the rule watcher
    pub fn build(self) -> Result<RuleWatcher> {
        let path = self.path.ok_or_else(|| Error::Configuration {
            message: "Rule path is required".to_string(),
            source: None,
        })?;

        let store = self.store.ok_or_else(|| Error::Configuration {
            message: "Rule store is required".to_string(),
            source: None,
        })?;

        RuleWatcher::new(path, store)
    }
}
