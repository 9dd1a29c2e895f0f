use crate::identifiers::AccountId;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Identifier of a status.
pub type StatusId = i64;

/// The account that authored a [`Status`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: AccountId,
    pub screen_name: String,
}

/// A single feed entry. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Status {
    id: StatusId,
    author: Author,
    text: String,
    created_at: DateTime<Utc>,
    original_id: Option<StatusId>,
    in_reply_to_id: Option<StatusId>,
    via: String,
    mentions: Vec<AccountId>,
    links: Vec<String>,
}

impl Status {
    /// Start building a status with the mandatory fields.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use status_filter::Status;
    ///
    /// let status = Status::builder(1, 42, "alice")
    ///     .with_text("hello")
    ///     .with_mentions(&[7, 3, 7])
    ///     .build();
    /// assert_eq!("alice", status.author().screen_name);
    /// assert_eq!(&[3, 7], status.mentions());
    /// ```
    pub fn builder(id: StatusId, author_id: AccountId, screen_name: &str) -> StatusBuilder {
        StatusBuilder::new(id, author_id, screen_name)
    }

    #[inline]
    pub fn id(&self) -> StatusId {
        self.id
    }

    #[inline]
    pub fn author(&self) -> &Author {
        &self.author
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The reshared status, when this status is a retweet.
    #[inline]
    pub fn original_id(&self) -> Option<StatusId> {
        self.original_id
    }

    #[inline]
    pub fn in_reply_to_id(&self) -> Option<StatusId> {
        self.in_reply_to_id
    }

    #[inline]
    pub fn via(&self) -> &str {
        &self.via
    }

    /// Mentioned accounts, sorted and without duplicates.
    #[inline]
    pub fn mentions(&self) -> &[AccountId] {
        &self.mentions
    }

    #[inline]
    pub fn links(&self) -> &[String] {
        &self.links
    }
}

/// A [`Status`] builder
///
/// Every optional field starts empty: no text, no reshare, no reply, no entities, created at the
/// Unix epoch.
#[derive(Debug)]
pub struct StatusBuilder {
    status: Status,
}

impl StatusBuilder {
    fn new(id: StatusId, author_id: AccountId, screen_name: &str) -> Self {
        Self {
            status: Status {
                id,
                author: Author {
                    id: author_id,
                    screen_name: screen_name.to_owned(),
                },
                text: String::new(),
                created_at: DateTime::<Utc>::default(),
                original_id: None,
                in_reply_to_id: None,
                via: String::new(),
                mentions: Vec::new(),
                links: Vec::new(),
            },
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.status.text = text.to_owned();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.status.created_at = created_at;
        self
    }

    /// Mark the status as a reshare of `original_id`.
    pub fn with_original(mut self, original_id: StatusId) -> Self {
        self.status.original_id = Some(original_id);
        self
    }

    pub fn with_in_reply_to(mut self, status_id: StatusId) -> Self {
        self.status.in_reply_to_id = Some(status_id);
        self
    }

    pub fn with_via(mut self, client: &str) -> Self {
        self.status.via = client.to_owned();
        self
    }

    pub fn with_mentions(mut self, accounts: &[AccountId]) -> Self {
        self.status.mentions = accounts.iter().sorted().unique().copied().collect_vec();
        self
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.status.links = links.iter().map(|link| (*link).to_owned()).collect_vec();
        self
    }

    pub fn build(self) -> Status {
        self.status
    }
}
