//! Boundary with the external collaborators the live values depend on.
//!
//! Every collaborator is injected as an `Arc<dyn ...>` handle so tests can substitute fakes.
//! Change feeds are broadcast receivers carrying no payload: any message, or a lag, means
//! "something changed, fetch again".

use crate::{error::LookupError, identifiers::AccountId};
use async_trait::async_trait;
use std::{
    fmt::{Display, Formatter},
    sync::Arc,
};
use tokio::{runtime::Handle, sync::broadcast};

pub type ChangeFeed = broadcast::Receiver<()>;

/// The accounts registered locally in the client.
#[async_trait]
pub trait AccountRegistry: Send + Sync {
    async fn account_ids(&self) -> Result<Vec<AccountId>, LookupError>;

    async fn resolve_screen_name(&self, screen_name: &str) -> Result<Option<AccountId>, LookupError>;

    fn subscribe(&self) -> ChangeFeed;
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RelationKind {
    Following,
    Followers,
    Blocking,
    Muting,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        Self::Following,
        Self::Followers,
        Self::Blocking,
        Self::Muting,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Following => "following",
            Self::Followers => "followers",
            Self::Blocking => "blocking",
            Self::Muting => "muting",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Display for RelationKind {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(formatter, "{}", self.name())
    }
}

/// Relationships between a local account and other accounts.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Accounts `account` has a `kind` relationship with.
    async fn related(
        &self,
        account: AccountId,
        kind: RelationKind,
    ) -> Result<Vec<AccountId>, LookupError>;

    /// Whether `account` has a `kind` relationship with `target`.
    async fn is_related(
        &self,
        account: AccountId,
        target: AccountId,
        kind: RelationKind,
    ) -> Result<bool, LookupError> {
        Ok(self.related(account, kind).await?.contains(&target))
    }

    fn subscribe(&self) -> ChangeFeed;
}

/// A list identified by its owner's screen name and its slug.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ListRef {
    pub owner: String,
    pub slug: String,
}

impl ListRef {
    pub fn new(owner: &str, slug: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            slug: slug.to_owned(),
        }
    }
}

/// The current state of a list as fetched from the list service.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListSnapshot {
    pub id: i64,
    pub members: Vec<AccountId>,
}

#[async_trait]
pub trait ListService: Send + Sync {
    async fn fetch_list(&self, list: &ListRef) -> Result<ListSnapshot, LookupError>;

    fn subscribe(&self, list: &ListRef) -> ChangeFeed;
}

/// Collaborator handles shared by every query built by one engine.
#[derive(Clone)]
pub struct FilterEnvironment {
    pub(crate) accounts: Arc<dyn AccountRegistry>,
    pub(crate) relationships: Arc<dyn RelationshipStore>,
    pub(crate) lists: Arc<dyn ListService>,
    pub(crate) runtime: Handle,
}

impl FilterEnvironment {
    /// Bundle the collaborators; refresh tasks are spawned on `runtime`.
    pub fn new(
        accounts: Arc<dyn AccountRegistry>,
        relationships: Arc<dyn RelationshipStore>,
        lists: Arc<dyn ListService>,
        runtime: Handle,
    ) -> Self {
        Self {
            accounts,
            relationships,
            lists,
            runtime,
        }
    }
}

impl std::fmt::Debug for FilterEnvironment {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.debug_struct("FilterEnvironment").finish_non_exhaustive()
    }
}
