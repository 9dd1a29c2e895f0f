//! Set-valued expression nodes bound to external, mutable data.
//!
//! A [`LiveValue`] caches an [`IdentifierSet`] fetched from the collaborators of a
//! [`FilterEnvironment`]. The cache starts empty, is filled by an asynchronous refresh once the
//! owning query begins its lifecycle, and is refreshed again whenever one of the node's change
//! feeds fires. Fetches never run under the cache lock; the lock only guards swapping the shared
//! snapshot.

use crate::{
    environment::{ChangeFeed, FilterEnvironment, ListRef, RelationKind},
    error::LookupError,
    identifiers::{AccountId, IdentifierSet},
    lexer::{escape, screen_name},
    types::{FilterType, TypeSet},
    values::NO_ID,
};
use parking_lot::Mutex;
use std::{
    fmt::{Debug, Display, Formatter},
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{sync::broadcast, task::JoinHandle, time::timeout};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt, StreamMap,
};
use tracing::{debug, trace, warn};

/// Notification that live data changed and already evaluated statuses may need filtering again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RefilterSignal;

/// A local account, named either by screen name or by identifier.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AccountRef {
    ScreenName(String),
    Id(AccountId),
}

impl Display for AccountRef {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::ScreenName(name) => write!(formatter, "{}", screen_name(name)),
            Self::Id(id) => write!(formatter, "#{id}"),
        }
    }
}

/// The local accounts whose relationships a relation set is built from.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AccountSelector {
    Any,
    Local(AccountRef),
}

impl Display for AccountSelector {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Any => write!(formatter, "*"),
            Self::Local(account) => write!(formatter, "local.{account}"),
        }
    }
}

/// What a live value tracks.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum LiveKind {
    /// Every locally registered account.
    AnyAccount,
    /// A single local account. Empty until its lookup completes.
    SpecificAccount(AccountRef),
    /// Accounts the selected local accounts have a `kind` relationship with.
    Relations {
        selector: AccountSelector,
        kind: RelationKind,
    },
    /// Current members of a list.
    ListMembers(ListRef),
}

impl LiveKind {
    const NUMERIC_OR_SET: TypeSet = TypeSet::of(&[FilterType::Numeric, FilterType::Set]);

    pub const fn supported_types(&self) -> TypeSet {
        match self {
            Self::SpecificAccount(_) => Self::NUMERIC_OR_SET,
            Self::AnyAccount | Self::Relations { .. } | Self::ListMembers(_) => TypeSet::SET,
        }
    }

    fn subscribe(&self, environment: &FilterEnvironment) -> Vec<ChangeFeed> {
        match self {
            Self::AnyAccount | Self::SpecificAccount(_) => vec![environment.accounts.subscribe()],
            Self::Relations { .. } => vec![
                environment.accounts.subscribe(),
                environment.relationships.subscribe(),
            ],
            Self::ListMembers(list) => vec![environment.lists.subscribe(list)],
        }
    }

    async fn fetch(&self, environment: &FilterEnvironment) -> Result<IdentifierSet, LookupError> {
        match self {
            Self::AnyAccount => Ok(environment.accounts.account_ids().await?.into()),
            Self::SpecificAccount(account) => Ok(resolve_account(environment, account)
                .await?
                .into_iter()
                .collect()),
            Self::Relations { selector, kind } => {
                let accounts: Vec<AccountId> = match selector {
                    AccountSelector::Any => environment.accounts.account_ids().await?,
                    AccountSelector::Local(account) => resolve_account(environment, account)
                        .await?
                        .into_iter()
                        .collect(),
                };
                let mut related = IdentifierSet::new();
                for account in accounts {
                    let targets: IdentifierSet =
                        environment.relationships.related(account, *kind).await?.into();
                    related = related.union(&targets);
                }
                Ok(related)
            }
            Self::ListMembers(list) => Ok(environment.lists.fetch_list(list).await?.members.into()),
        }
    }
}

async fn resolve_account(
    environment: &FilterEnvironment,
    account: &AccountRef,
) -> Result<Option<AccountId>, LookupError> {
    match account {
        AccountRef::ScreenName(name) => environment.accounts.resolve_screen_name(name).await,
        AccountRef::Id(id) => Ok(environment
            .accounts
            .account_ids()
            .await?
            .contains(id)
            .then_some(*id)),
    }
}

impl Display for LiveKind {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::AnyAccount => write!(formatter, "*"),
            Self::SpecificAccount(account) => write!(formatter, "local.{account}"),
            Self::Relations { selector, kind } => write!(formatter, "{selector}.{kind}"),
            Self::ListMembers(list) => write!(
                formatter,
                "list.{}{}",
                screen_name(&list.owner),
                escape(&list.slug)
            ),
        }
    }
}

/// Where a live value stands in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LivePhase {
    /// Not subscribed, nothing cached.
    Inactive,
    /// Subscribed, the cache is empty or out of date.
    Stale,
    /// Subscribed, the cache reflects the last fetch.
    Fresh,
}

/// What an active binding needs to refresh itself and notify its query.
#[derive(Clone, Debug)]
pub(crate) struct LifecycleContext {
    pub(crate) environment: FilterEnvironment,
    pub(crate) refilter: broadcast::Sender<RefilterSignal>,
    pub(crate) timeout: Duration,
}

struct Activation {
    context: LifecycleContext,
    watcher: JoinHandle<()>,
}

struct LiveState {
    /// Bumped on every begin and end; results fetched under another generation are dropped.
    generation: u64,
    activation: Option<Activation>,
    members: Arc<IdentifierSet>,
    /// Last refresh ticket handed out.
    issued: u64,
    /// Ticket of the refresh whose result is cached.
    installed: u64,
    stale: bool,
}

struct LiveBinding {
    kind: LiveKind,
    state: Mutex<LiveState>,
}

impl LiveBinding {
    fn begin(self: &Arc<Self>, context: LifecycleContext) {
        let mut state = self.state.lock();
        if state.activation.is_some() {
            return;
        }
        let feeds = self.kind.subscribe(&context.environment);
        state.generation += 1;
        state.stale = true;
        let watcher = context
            .environment
            .runtime
            .spawn(watch(Arc::downgrade(self), feeds));
        state.activation = Some(Activation { context, watcher });
        debug!(live = %self.kind, generation = state.generation, "began live value lifecycle");
    }

    fn end(&self) {
        let mut state = self.state.lock();
        let Some(activation) = state.activation.take() else {
            return;
        };
        activation.watcher.abort();
        state.generation += 1;
        state.members = Arc::new(IdentifierSet::new());
        state.installed = state.issued;
        state.stale = false;
        debug!(live = %self.kind, generation = state.generation, "ended live value lifecycle");
    }

    async fn refresh(&self) -> Result<bool, LookupError> {
        let (context, generation, ticket) = {
            let mut state = self.state.lock();
            let Some(activation) = &state.activation else {
                return Ok(false);
            };
            let context = activation.context.clone();
            state.issued += 1;
            (context, state.generation, state.issued)
        };

        let fetched = match timeout(context.timeout, self.kind.fetch(&context.environment)).await {
            Ok(fetched) => fetched,
            Err(_) => Err(LookupError::TimedOut(
                u64::try_from(context.timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };
        let members = match fetched {
            Ok(members) => members,
            Err(error) => {
                warn!(live = %self.kind, %error, "failed to refresh live value, keeping the cached set");
                return Err(error);
            }
        };

        {
            let mut state = self.state.lock();
            if state.activation.is_none()
                || state.generation != generation
                || ticket <= state.installed
            {
                trace!(live = %self.kind, ticket, "discarding superseded refresh");
                return Ok(false);
            }
            debug!(live = %self.kind, ticket, members = members.len(), "refreshed live value");
            state.members = Arc::new(members);
            state.installed = ticket;
            state.stale = false;
        }
        // No receiver simply means nobody is listening for re-filters right now.
        let _ = context.refilter.send(RefilterSignal);
        Ok(true)
    }

    fn mark_stale(&self) {
        let mut state = self.state.lock();
        if state.activation.is_some() {
            state.stale = true;
        }
    }
}

impl Drop for LiveBinding {
    fn drop(&mut self) {
        if let Some(activation) = self.state.get_mut().activation.take() {
            activation.watcher.abort();
        }
    }
}

/// Refresh once, then again on every change notification, until the binding goes away.
async fn watch(binding: Weak<LiveBinding>, feeds: Vec<ChangeFeed>) {
    let mut changes = StreamMap::new();
    for (index, feed) in feeds.into_iter().enumerate() {
        changes.insert(index, BroadcastStream::new(feed));
    }

    match binding.upgrade() {
        Some(live) => {
            let _ = live.refresh().await;
        }
        None => return,
    }

    while let Some((_, change)) = changes.next().await {
        if let Err(BroadcastStreamRecvError::Lagged(skipped)) = change {
            trace!(skipped, "change feed lagged");
        }
        let Some(live) = binding.upgrade() else {
            return;
        };
        live.mark_stale();
        let _ = live.refresh().await;
    }
}

/// A live-bound expression node.
///
/// Clones share the same cache and lifecycle, [`LiveValue::rebind`] does not. Equality compares
/// what the values track, not their cached contents.
#[derive(Clone)]
pub struct LiveValue(Arc<LiveBinding>);

impl LiveValue {
    pub fn new(kind: LiveKind) -> Self {
        Self(Arc::new(LiveBinding {
            kind,
            state: Mutex::new(LiveState {
                generation: 0,
                activation: None,
                members: Arc::new(IdentifierSet::new()),
                issued: 0,
                installed: 0,
                stale: false,
            }),
        }))
    }

    #[inline]
    pub fn kind(&self) -> &LiveKind {
        &self.0.kind
    }

    /// A new, inactive value tracking the same data.
    pub fn rebind(&self) -> Self {
        Self::new(self.0.kind.clone())
    }

    #[inline]
    pub fn supported_types(&self) -> TypeSet {
        self.0.kind.supported_types()
    }

    pub fn phase(&self) -> LivePhase {
        let state = self.0.state.lock();
        match (&state.activation, state.stale) {
            (None, _) => LivePhase::Inactive,
            (Some(_), true) => LivePhase::Stale,
            (Some(_), false) => LivePhase::Fresh,
        }
    }

    /// The cached set as of now. Later refreshes never alter a returned snapshot.
    pub fn snapshot(&self) -> Arc<IdentifierSet> {
        Arc::clone(&self.0.state.lock().members)
    }

    /// The account identifier of a single account value, [`NO_ID`] while unresolved.
    pub(crate) fn account_id(&self) -> i64 {
        self.snapshot().first().unwrap_or(NO_ID)
    }

    pub(crate) fn begin_lifecycle(&self, context: LifecycleContext) {
        self.0.begin(context);
    }

    pub(crate) fn end_lifecycle(&self) {
        self.0.end();
    }

    /// Fetch and install a fresh set. `Ok(false)` when the value is inactive or the result was
    /// superseded.
    pub(crate) async fn refresh(&self) -> Result<bool, LookupError> {
        self.0.refresh().await
    }
}

impl PartialEq for LiveValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind == other.0.kind
    }
}

impl Eq for LiveValue {}

impl Debug for LiveValue {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter
            .debug_struct("LiveValue")
            .field("kind", &self.0.kind)
            .field("phase", &self.phase())
            .finish()
    }
}

impl Display for LiveValue {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.0.kind)
    }
}
