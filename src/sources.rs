use crate::{
    live::{AccountRef, LiveKind, LiveValue},
    lexer::escape,
    operators::BinaryOperator,
    status::Status,
};
use std::fmt::{Display, Formatter};

/// A logical origin of statuses a query draws from.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusSource {
    /// Everything in the local store.
    Local,
    /// Statuses authored by one account.
    User(AccountRef),
    /// Statuses authored by the current members of a list.
    List(LiveValue),
    /// Statuses whose text contains a term, ignoring ASCII case.
    Search(String),
}

impl StatusSource {
    pub fn accepts(&self, status: &Status) -> bool {
        match self {
            Self::Local => true,
            Self::User(AccountRef::ScreenName(name)) => status.author().screen_name == *name,
            Self::User(AccountRef::Id(id)) => status.author().id == *id,
            Self::List(members) => members.snapshot().contains(status.author().id),
            Self::Search(term) => BinaryOperator::Contains.match_strings(status.text(), term),
        }
    }

    pub(crate) fn live_value(&self) -> Option<&LiveValue> {
        match self {
            Self::List(members) => Some(members),
            Self::Local | Self::User(_) | Self::Search(_) => None,
        }
    }

    /// A copy whose list members are a new, inactive binding.
    pub fn rebind(&self) -> Self {
        match self {
            Self::List(members) => Self::List(members.rebind()),
            Self::Local | Self::User(_) | Self::Search(_) => self.clone(),
        }
    }

    pub(crate) fn list(members: LiveValue) -> Self {
        debug_assert!(matches!(members.kind(), LiveKind::ListMembers(_)));
        Self::List(members)
    }
}

impl Display for StatusSource {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Local => write!(formatter, "local"),
            Self::User(account) => write!(formatter, "user.{account}"),
            Self::List(members) => write!(formatter, "{members}"),
            Self::Search(term) => write!(formatter, "search {}", escape(term)),
        }
    }
}
