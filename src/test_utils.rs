pub mod ast {
    macro_rules! or {
        ($left:expr, $right:expr) => {
            $crate::ast::Expr::or($left, $right).unwrap()
        };
    }

    macro_rules! and {
        ($left:expr, $right:expr) => {
            $crate::ast::Expr::and($left, $right).unwrap()
        };
    }

    macro_rules! not {
        ($value:expr) => {
            $crate::ast::Expr::not($value).unwrap()
        };
    }

    macro_rules! property {
        ($name:ident) => {
            $crate::ast::Expr::property($crate::values::StatusProperty::$name)
        };
    }

    macro_rules! binary {
        ($property:ident, $operator:ident, $right:expr) => {
            $crate::ast::Expr::binary(
                $crate::operators::BinaryOperator::$operator,
                $crate::ast::Expr::property($crate::values::StatusProperty::$property),
                $right,
            )
            .unwrap()
        };
    }

    pub(crate) use and;
    pub(crate) use binary;
    pub(crate) use not;
    pub(crate) use or;
    pub(crate) use property;
}

pub mod fakes {
    use crate::{
        config::EngineConfig,
        environment::{
            AccountRegistry, ChangeFeed, FilterEnvironment, ListRef, ListService, ListSnapshot,
            RelationKind, RelationshipStore,
        },
        error::LookupError,
        fragment::storage_schema,
        identifiers::AccountId,
        live::RefilterSignal,
        query::FilterEngine,
        status::Status,
    };
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use parking_lot::Mutex;
    use rusqlite::{params, Connection};
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };
    use tokio::{
        runtime::Handle,
        sync::{broadcast, Semaphore},
        time::timeout,
    };

    pub(crate) struct FakeAccounts {
        accounts: Vec<(AccountId, String)>,
        changes: broadcast::Sender<()>,
        subscriptions: AtomicUsize,
    }

    impl FakeAccounts {
        fn new(accounts: &[(AccountId, &str)]) -> Self {
            Self {
                accounts: accounts
                    .iter()
                    .map(|(id, name)| (*id, (*name).to_owned()))
                    .collect(),
                changes: broadcast::channel(16).0,
                subscriptions: AtomicUsize::new(0),
            }
        }

        pub(crate) fn subscriptions(&self) -> usize {
            self.subscriptions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountRegistry for FakeAccounts {
        async fn account_ids(&self) -> Result<Vec<AccountId>, LookupError> {
            Ok(self.accounts.iter().map(|(id, _)| *id).collect())
        }

        async fn resolve_screen_name(
            &self,
            screen_name: &str,
        ) -> Result<Option<AccountId>, LookupError> {
            Ok(self
                .accounts
                .iter()
                .find(|(_, name)| name == screen_name)
                .map(|(id, _)| *id))
        }

        fn subscribe(&self) -> ChangeFeed {
            self.subscriptions.fetch_add(1, Ordering::SeqCst);
            self.changes.subscribe()
        }
    }

    pub(crate) struct FakeRelationships {
        relations: Mutex<Vec<(AccountId, RelationKind, AccountId)>>,
        changes: broadcast::Sender<()>,
    }

    impl FakeRelationships {
        pub(crate) fn add(&self, account: AccountId, kind: RelationKind, target: AccountId) {
            self.relations.lock().push((account, kind, target));
        }

        pub(crate) fn notify(&self) {
            let _ = self.changes.send(());
        }
    }

    #[async_trait]
    impl RelationshipStore for FakeRelationships {
        async fn related(
            &self,
            account: AccountId,
            kind: RelationKind,
        ) -> Result<Vec<AccountId>, LookupError> {
            Ok(self
                .relations
                .lock()
                .iter()
                .filter(|(source, relation, _)| *source == account && *relation == kind)
                .map(|(_, _, target)| *target)
                .collect())
        }

        fn subscribe(&self) -> ChangeFeed {
            self.changes.subscribe()
        }
    }

    /// Lists with an optional gate: when gated, every fetch waits for a permit.
    pub(crate) struct FakeLists {
        lists: Mutex<HashMap<ListRef, ListSnapshot>>,
        gate: Option<Semaphore>,
        failing: AtomicBool,
        changes: broadcast::Sender<()>,
    }

    impl FakeLists {
        pub(crate) fn open_gate(&self, fetches: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(fetches);
            }
        }

        pub(crate) fn fail(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub(crate) fn set_members(&self, list: &ListRef, members: &[AccountId]) {
            if let Some(snapshot) = self.lists.lock().get_mut(list) {
                snapshot.members = members.to_vec();
            }
        }

        pub(crate) fn notify(&self) {
            let _ = self.changes.send(());
        }
    }

    #[async_trait]
    impl ListService for FakeLists {
        async fn fetch_list(&self, list: &ListRef) -> Result<ListSnapshot, LookupError> {
            if let Some(gate) = &self.gate {
                gate.acquire()
                    .await
                    .map_err(|error| LookupError::Unavailable(error.to_string()))?
                    .forget();
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(LookupError::Unavailable("list service is down".to_owned()));
            }
            self.lists
                .lock()
                .get(list)
                .cloned()
                .ok_or_else(|| LookupError::NotFound(format!("list {}/{}", list.owner, list.slug)))
        }

        fn subscribe(&self, _list: &ListRef) -> ChangeFeed {
            self.changes.subscribe()
        }
    }

    pub(crate) fn friends() -> ListRef {
        ListRef::new("alice", "friends")
    }

    pub(crate) fn news() -> ListRef {
        ListRef::new("bob", "news")
    }

    /// Fakes seeded with the same snapshot [`Fixture::database`] persists.
    pub(crate) struct Fixture {
        pub(crate) accounts: Arc<FakeAccounts>,
        pub(crate) relationships: Arc<FakeRelationships>,
        pub(crate) lists: Arc<FakeLists>,
        pub(crate) environment: FilterEnvironment,
    }

    impl Fixture {
        /// Must be called from within a Tokio runtime.
        pub(crate) fn new() -> Self {
            Self::build(None)
        }

        /// Like [`Fixture::new`], but list fetches block until [`FakeLists::open_gate`].
        pub(crate) fn gated() -> Self {
            Self::build(Some(Semaphore::new(0)))
        }

        fn build(gate: Option<Semaphore>) -> Self {
            let accounts = Arc::new(FakeAccounts::new(&[(1, "alice"), (2, "bob")]));
            let relationships = Arc::new(FakeRelationships {
                relations: Mutex::new(vec![
                    (1, RelationKind::Following, 10),
                    (1, RelationKind::Following, 20),
                    (2, RelationKind::Following, 20),
                    (2, RelationKind::Following, 30),
                    (1, RelationKind::Muting, 40),
                    (2, RelationKind::Blocking, 50),
                ]),
                changes: broadcast::channel(16).0,
            });
            let lists = Arc::new(FakeLists {
                lists: Mutex::new(HashMap::from([
                    (
                        friends(),
                        ListSnapshot {
                            id: 100,
                            members: vec![30, 10, 20],
                        },
                    ),
                    (
                        news(),
                        ListSnapshot {
                            id: 200,
                            members: vec![2, 40],
                        },
                    ),
                ])),
                gate,
                failing: AtomicBool::new(false),
                changes: broadcast::channel(16).0,
            });
            let environment = FilterEnvironment::new(
                accounts.clone(),
                relationships.clone(),
                lists.clone(),
                Handle::current(),
            );
            Self {
                accounts,
                relationships,
                lists,
                environment,
            }
        }

        pub(crate) fn engine(&self) -> FilterEngine {
            FilterEngine::new(self.environment.clone(), EngineConfig::default())
        }

        /// An in-memory database holding `statuses` and the current state of the fakes.
        pub(crate) fn database(&self, statuses: &[Status]) -> Connection {
            let connection = Connection::open_in_memory().unwrap();
            connection
                .execute_batch(&storage_schema(&EngineConfig::default()))
                .unwrap();

            for (id, name) in &self.accounts.accounts {
                connection
                    .execute(
                        "INSERT INTO local_accounts (id, screen_name) VALUES (?1, ?2)",
                        params![id, name],
                    )
                    .unwrap();
            }
            for (account, kind, target) in self.relationships.relations.lock().iter() {
                connection
                    .execute(
                        "INSERT INTO relationships (account_id, kind, target_id) VALUES (?1, ?2, ?3)",
                        params![account, kind.name(), target],
                    )
                    .unwrap();
            }
            for (list, snapshot) in self.lists.lists.lock().iter() {
                connection
                    .execute(
                        "INSERT INTO lists (id, owner, slug) VALUES (?1, ?2, ?3)",
                        params![snapshot.id, list.owner, list.slug],
                    )
                    .unwrap();
                for member in &snapshot.members {
                    connection
                        .execute(
                            "INSERT INTO list_members (list_id, user_id) VALUES (?1, ?2)",
                            params![snapshot.id, member],
                        )
                        .unwrap();
                }
            }
            for status in statuses {
                connection
                    .execute(
                        r#"INSERT INTO "statuses"
                           (id, user_id, screen_name, text, created_at, original_id, in_reply_to_id, via)
                           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                        params![
                            status.id(),
                            status.author().id,
                            status.author().screen_name,
                            status.text(),
                            status.created_at().timestamp(),
                            status.original_id(),
                            status.in_reply_to_id(),
                            status.via(),
                        ],
                    )
                    .unwrap();
                for mention in status.mentions() {
                    connection
                        .execute(
                            "INSERT INTO status_mentions (status_id, user_id) VALUES (?1, ?2)",
                            params![status.id(), mention],
                        )
                        .unwrap();
                }
            }
            connection
        }
    }

    pub(crate) fn statuses() -> Vec<Status> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        vec![
            Status::builder(1, 1, "alice")
                .with_text("Learning Rust today")
                .with_via("web")
                .with_created_at(start)
                .with_mentions(&[2])
                .build(),
            Status::builder(2, 2, "bob")
                .with_text("RT it's fine, really")
                .with_original(1)
                .with_via("Web Client")
                .with_created_at(start + chrono::Duration::minutes(1))
                .with_mentions(&[1, 10])
                .build(),
            Status::builder(3, 10, "carol")
                .with_text(r#"foo "bar""#)
                .with_in_reply_to(1)
                .with_via("mobile")
                .with_created_at(start + chrono::Duration::hours(1))
                .build(),
            Status::builder(4, 20, "dave").build(),
            Status::builder(5, 40, "erin")
                .with_text("rust and RUST")
                .with_original(2)
                .with_in_reply_to(3)
                .with_via("web")
                .with_created_at(start + chrono::Duration::minutes(2))
                .with_mentions(&[40])
                .build(),
            Status::builder(6, 99, "zed")
                .with_text("nothing")
                .with_via("client")
                .with_created_at(start + chrono::Duration::hours(2))
                .with_mentions(&[20, 40])
                .build(),
        ]
    }

    /// Wait for the next re-filter signal, failing the test after a few seconds.
    pub(crate) async fn recv_refilter(receiver: &mut broadcast::Receiver<RefilterSignal>) {
        let received = timeout(Duration::from_secs(5), receiver.recv())
            .await
            .expect("no re-filter signal was raised");
        assert_eq!(Ok(RefilterSignal), received);
    }
}
