//! Composition root
//!
//! Builds everything a caller needs from an [`AppConfig`]:
//!
//! ```text
//! AppConfig → ReferenceData → DataSource (+ cache) ─┐
//!                           → FunctionRegistry ─────┼→ RuleEngine
//!           → YamlRuleSource → RuleStore (+ watcher)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let context = init_app(ConfigLoader::new().load()?).await?;
//! let rules = context.rules().snapshot();
//! let outcome = context.engine().process(&mut invoice, &rules, &CancellationToken::new()).await;
//! ```

use crate::config::AppConfig;
use crate::data::{
    CachedDataSource, FunctionRegistry, InMemoryDataSource, NamedQueries, ProductCatalog,
    ReferenceData,
};
use crate::rules::{RuleStore, RuleWatcher, YamlRuleSource};
use invr_domain::error::Result;
use invr_domain::ports::{DataSource, FunctionHost};
use invr_engine::{BatchProcessor, FieldDefaults, MergePlan, RuleEngine};
use std::sync::Arc;
use tracing::info;

/// Application context holding the engine, the rule store and their collaborators
pub struct AppContext {
    /// Application configuration
    pub config: Arc<AppConfig>,

    engine: Arc<RuleEngine>,
    merge: MergePlan,
    rules: Arc<RuleStore>,
    functions: Arc<dyn FunctionHost>,
    data_source: Arc<dyn DataSource>,
    watcher: Option<RuleWatcher>,
}

impl AppContext {
    pub fn engine(&self) -> Arc<RuleEngine> {
        Arc::clone(&self.engine)
    }

    pub fn rules(&self) -> Arc<RuleStore> {
        Arc::clone(&self.rules)
    }

    /// Function host used by the engine, also needed for authoring checks
    pub fn functions(&self) -> Arc<dyn FunctionHost> {
        Arc::clone(&self.functions)
    }

    pub fn data_source(&self) -> Arc<dyn DataSource> {
        Arc::clone(&self.data_source)
    }

    /// Batch processor sized and merging as configured
    pub fn batch_processor(&self) -> BatchProcessor {
        BatchProcessor::new(self.engine())
            .with_concurrency(self.config.batch.concurrency)
            .with_merge(self.merge.clone())
    }

    /// Whether rule files are being watched
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn watcher(&self) -> Option<&RuleWatcher> {
        self.watcher.as_ref()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("rules", &self.rules)
            .field("watching", &self.watcher.is_some())
            .finish_non_exhaustive()
    }
}

/// Data source and function host described by the reference data
pub fn build_collaborators(
    config: &AppConfig,
    reference: ReferenceData,
) -> Result<(Arc<dyn DataSource>, Arc<dyn FunctionHost>)> {
    let tables: Arc<dyn DataSource> = Arc::new(InMemoryDataSource::new(reference.tables));
    let data_source: Arc<dyn DataSource> = if config.smart_query.cache_enabled {
        Arc::new(CachedDataSource::with_config(
            tables,
            config.smart_query.cache_max_entries,
            config.smart_query.cache_ttl(),
        ))
    } else {
        tables
    };

    let catalog = match reference.products {
        Some(products) => ProductCatalog::new(products)?,
        None => ProductCatalog::builtin(),
    };
    let functions = FunctionRegistry::new()
        .with_host(Arc::new(catalog))
        .with_host(Arc::new(NamedQueries::new(
            reference.queries,
            Arc::clone(&data_source),
        )))
        .with_defaults(config.functions.defaults.clone());

    Ok((data_source, Arc::new(functions)))
}

/// Engine configured from `config` over the given collaborators
pub fn build_engine(
    config: &AppConfig,
    data_source: Arc<dyn DataSource>,
    functions: Arc<dyn FunctionHost>,
) -> RuleEngine {
    let defaults = FieldDefaults::default().extend(config.smart_query.field_defaults.clone());
    RuleEngine::builder()
        .data_source(data_source)
        .functions(functions)
        .field_defaults(defaults)
        .lookup_timeout(config.smart_query.lookup_timeout())
        .call_timeout(config.functions.call_timeout())
        .build()
}

/// Initialize the application context
///
/// Loads reference data and the initial rule set; either failing aborts
/// startup. Starts the rule watcher when `rules.watch` is set, which
/// requires a running tokio runtime.
pub async fn init_app(config: AppConfig) -> Result<AppContext> {
    info!("Initializing invoice rule engine");
    let config = Arc::new(config);
    let merge = config.batch.merge_plan()?;

    let reference = ReferenceData::load(&config.reference_data.path).await?;
    let (data_source, functions) = build_collaborators(&config, reference)?;
    let engine = Arc::new(build_engine(
        &config,
        Arc::clone(&data_source),
        Arc::clone(&functions),
    ));

    let source = Arc::new(YamlRuleSource::new(&config.rules.path));
    let rules = Arc::new(RuleStore::open(source).await?);

    let watcher = if config.rules.watch {
        Some(RuleWatcher::new(config.rules.path.clone(), Arc::clone(&rules))?)
    } else {
        None
    };

    info!(
        rules = rules.snapshot().len(),
        watching = watcher.is_some(),
        "Invoice rule engine ready"
    );

    Ok(AppContext {
        config,
        engine,
        merge,
        rules,
        functions,
        data_source,
        watcher,
    })
}
