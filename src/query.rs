use crate::{
    ast::Expr,
    compiler::{compile_predicate, BooleanProvider},
    config::EngineConfig,
    environment::FilterEnvironment,
    error::{LookupError, QueryError},
    fragment::compile_query_fragment,
    live::{LifecycleContext, LivePhase, LiveValue, RefilterSignal},
    parser::{self, ParsedQuery},
    sources::StatusSource,
    status::Status,
};
use itertools::Itertools;
use std::{
    fmt::{Debug, Display, Formatter},
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug)]
struct Shared {
    environment: FilterEnvironment,
    config: EngineConfig,
}

/// Builds [`FilterQuery`]s bound to one set of collaborators.
///
/// Cloning is cheap, clones share the collaborators and the configuration.
#[derive(Clone, Debug)]
pub struct FilterEngine {
    shared: Arc<Shared>,
}

impl FilterEngine {
    pub fn new(environment: FilterEnvironment, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                environment,
                config,
            }),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Parse, type check and compile a query.
    ///
    /// The returned query is inactive: its live values stay empty until
    /// [`FilterQuery::begin_lifecycle`] is called.
    pub fn parse(&self, text: &str) -> Result<FilterQuery, QueryError> {
        let ParsedQuery { sources, root } = parser::parse(text)?;
        self.build(sources, root)
    }

    /// Compile a query from an already built tree.
    ///
    /// The query gets its own live bindings, so trees can be reused to build several queries
    /// whose lifecycles stay independent.
    pub fn build(&self, sources: Vec<StatusSource>, root: Expr) -> Result<FilterQuery, QueryError> {
        if sources.is_empty() {
            return Err(QueryError::NoSource);
        }
        let sources = sources.iter().map(StatusSource::rebind).collect_vec();
        let root = root.rebind();
        let predicate = compile_predicate(&root)?;
        let (refilter, _) = broadcast::channel(self.shared.config.refilter_capacity.max(1));
        Ok(FilterQuery {
            shared: Arc::clone(&self.shared),
            sources,
            root,
            predicate,
            refilter,
        })
    }
}

/// A compiled query: its sources, its boolean root and both compiled forms of the root.
///
/// Queries are immutable, editing one means building a new one. Dropping a query ends its
/// lifecycle.
pub struct FilterQuery {
    shared: Arc<Shared>,
    sources: Vec<StatusSource>,
    root: Expr,
    predicate: BooleanProvider,
    refilter: broadcast::Sender<RefilterSignal>,
}

impl FilterQuery {
    /// Whether `status` comes from any of the sources and satisfies the root.
    ///
    /// Live values are read as cached, a stale or failed refresh never makes this fail.
    pub fn matches(&self, status: &Status) -> bool {
        self.sources.iter().any(|source| source.accepts(status)) && (self.predicate)(status)
    }

    /// The text form of the query, which parses back into the same tree.
    pub fn to_query_text(&self) -> String {
        self.to_string()
    }

    /// An SQL condition over the configured status table equivalent to [`FilterQuery::matches`].
    ///
    /// Live values are read from the persisted tables, not from the in-memory caches.
    pub fn storage_fragment(&self) -> String {
        compile_query_fragment(&self.sources, &self.root, &self.shared.config)
    }

    /// Receive a [`RefilterSignal`] whenever a live value of the query installs a new set.
    pub fn subscribe_refilter(&self) -> broadcast::Receiver<RefilterSignal> {
        self.refilter.subscribe()
    }

    /// Subscribe every live value to its change feeds and schedule their first refresh.
    ///
    /// Calling it on an active query does nothing.
    pub fn begin_lifecycle(&self) {
        let context = LifecycleContext {
            environment: self.shared.environment.clone(),
            refilter: self.refilter.clone(),
            timeout: self.shared.config.refresh_timeout(),
        };
        let live_values = self.live_values();
        debug!(query = %self, live_values = live_values.len(), "beginning query lifecycle");
        for live in live_values {
            live.begin_lifecycle(context.clone());
        }
    }

    /// Release every subscription and discard the cached sets. Safe to call at any time.
    pub fn end_lifecycle(&self) {
        let live_values = self.live_values();
        if !live_values.is_empty() {
            debug!(query = %self, "ending query lifecycle");
        }
        for live in live_values {
            live.end_lifecycle();
        }
    }

    /// Refresh every live value now.
    ///
    /// A failing value keeps its previous set; the others are still refreshed and the first
    /// failure is returned.
    pub async fn refresh(&self) -> Result<(), LookupError> {
        let mut outcome = Ok(());
        for live in self.live_values() {
            if let Err(error) = live.refresh().await {
                if outcome.is_ok() {
                    outcome = Err(error);
                }
            }
        }
        outcome
    }

    /// Whether every live value is active and up to date.
    pub fn is_fresh(&self) -> bool {
        self.live_values()
            .into_iter()
            .all(|live| live.phase() == LivePhase::Fresh)
    }

    #[inline]
    pub fn sources(&self) -> &[StatusSource] {
        &self.sources
    }

    #[inline]
    pub fn root(&self) -> &Expr {
        &self.root
    }

    fn live_values(&self) -> Vec<&LiveValue> {
        self.sources
            .iter()
            .filter_map(StatusSource::live_value)
            .chain(self.root.live_values())
            .collect_vec()
    }
}

impl Drop for FilterQuery {
    fn drop(&mut self) {
        self.end_lifecycle();
    }
}

impl Display for FilterQuery {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "from {} where {}",
            self.sources.iter().join(", "),
            self.root
        )
    }
}

impl Debug for FilterQuery {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter
            .debug_struct("FilterQuery")
            .field("sources", &self.sources)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
