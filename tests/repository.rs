//! Integration tests for the unit-of-work repositories.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use deltabase::{
    Agent, AgentStamp, Delta, Entity, Id, Lease, MultiRepository, Pointer, SystemAgent,
    UsageError, Version, store::inmemory,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Test Domain: Account
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Account {
    balance: i64,
    username: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum AccountDelta {
    Deposited { amount: i64 },
    Withdrawn { amount: i64 },
    Registered { username: String },
}

impl Delta for AccountDelta {
    fn kind(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "deposited",
            Self::Withdrawn { .. } => "withdrawn",
            Self::Registered { .. } => "registered",
        }
    }

    fn add_leases(&self) -> Vec<Lease> {
        match self {
            Self::Registered { username } => vec![Lease::new("auth", "username", username)],
            _ => Vec::new(),
        }
    }
}

impl Entity for Account {
    const KIND: &'static str = "account";

    type Delta = AccountDelta;

    fn construct(_id: Id) -> Self {
        Self::default()
    }

    fn can_reduce(&self, delta: &Self::Delta) -> bool {
        match delta {
            AccountDelta::Withdrawn { amount } => *amount <= self.balance,
            AccountDelta::Registered { .. } => self.username.is_none(),
            AccountDelta::Deposited { .. } => true,
        }
    }

    fn reduce(mut self, delta: &Self::Delta) -> Self {
        match delta {
            AccountDelta::Deposited { amount } => self.balance += amount,
            AccountDelta::Withdrawn { amount } => self.balance -= amount,
            AccountDelta::Registered { username } => self.username = Some(username.clone()),
        }
        self
    }
}

type AccountStore = inmemory::Store<AccountDelta>;
type AccountRepository = MultiRepository<Account, AccountStore, SystemAgent>;

fn repository(store: &AccountStore) -> AccountRepository {
    MultiRepository::new(store.clone(), SystemAgent::default(), "tests")
}

/// Agent that counts how often it is consulted.
#[derive(Clone, Default)]
struct CountingAgent {
    stamps: Arc<AtomicUsize>,
}

impl Agent for CountingAgent {
    async fn stamp(&self, signature_profile: &str) -> AgentStamp {
        self.stamps.fetch_add(1, Ordering::SeqCst);
        AgentStamp {
            timestamp: chrono::Utc::now(),
            signature: serde_json::json!({ "profile": signature_profile }),
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn fresh_entity_commits_at_version_one() {
    let store = AccountStore::new();
    let mut repo = repository(&store);
    let id = Id::random();

    repo.create(id).unwrap();
    repo.append(id, AccountDelta::Deposited { amount: 100 }).unwrap();
    assert!(repo.commit().await.unwrap());

    let state = repo.get(id).unwrap();
    assert_eq!(state.version(), Version::new(1));
    assert_eq!(state.body().balance, 100);
}

#[tokio::test]
async fn concurrent_writers_exactly_one_wins() {
    let store = AccountStore::new();
    let id = Id::random();
    {
        let mut seed = repository(&store);
        seed.create(id).unwrap();
        for _ in 0..5 {
            seed.append(id, AccountDelta::Deposited { amount: 1 }).unwrap();
        }
        assert!(seed.commit().await.unwrap());
    }

    // Two independent units of work both observe version 5.
    let mut first = repository(&store);
    first.load(Pointer::latest(id)).await.unwrap();
    let mut second = repository(&store);
    second.load(Pointer::latest(id)).await.unwrap();

    first.append(id, AccountDelta::Deposited { amount: 10 }).unwrap();
    second.append(id, AccountDelta::Withdrawn { amount: 2 }).unwrap();

    let outcomes = [
        first.commit().await.unwrap(),
        second.commit().await.unwrap(),
    ];
    assert_eq!(outcomes, [true, false]);
}

#[tokio::test]
async fn loser_reloads_and_retries() {
    let store = AccountStore::new();
    let id = Id::random();
    {
        let mut seed = repository(&store);
        seed.create(id).unwrap();
        seed.append(id, AccountDelta::Deposited { amount: 10 }).unwrap();
        assert!(seed.commit().await.unwrap());
    }

    let mut winner = repository(&store);
    winner.load(Pointer::latest(id)).await.unwrap();
    let mut loser = repository(&store);
    loser.load(Pointer::latest(id)).await.unwrap();

    winner.append(id, AccountDelta::Deposited { amount: 5 }).unwrap();
    loser.append(id, AccountDelta::Withdrawn { amount: 3 }).unwrap();
    assert!(winner.commit().await.unwrap());
    assert!(!loser.commit().await.unwrap());

    // Recovery is a fresh unit of work: reload and retry.
    let mut retry = repository(&store);
    retry.load(Pointer::latest(id)).await.unwrap();
    retry.append(id, AccountDelta::Withdrawn { amount: 3 }).unwrap();
    assert!(retry.commit().await.unwrap());

    let state = retry.get(id).unwrap();
    assert_eq!(state.version(), Version::new(3));
    assert_eq!(state.body().balance, 12);
}

#[tokio::test]
async fn agent_is_consulted_exactly_once_per_commit() {
    let store = AccountStore::new();
    let agent = CountingAgent::default();
    let mut repo: MultiRepository<Account, _, _> =
        MultiRepository::new(store.clone(), agent.clone(), "tests");
    let id = Id::random();

    repo.create(id).unwrap();
    for _ in 0..3 {
        repo.append(id, AccountDelta::Deposited { amount: 1 }).unwrap();
    }
    assert!(repo.commit().await.unwrap());
    assert_eq!(agent.stamps.load(Ordering::SeqCst), 1);

    // A no-op commit never consults the agent.
    assert!(repo.commit().await.unwrap());
    assert_eq!(agent.stamps.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lease_conflict_fails_the_second_registration() {
    let store = AccountStore::new();
    let (u1, u2) = (Id::random(), Id::random());

    let mut first = repository(&store);
    first.create(u1).unwrap();
    first
        .append(u1, AccountDelta::Registered { username: "alice".to_string() })
        .unwrap();
    assert!(first.commit().await.unwrap());

    let mut second = repository(&store);
    second.create(u2).unwrap();
    second
        .append(u2, AccountDelta::Registered { username: "alice".to_string() })
        .unwrap();
    assert!(!second.commit().await.unwrap());

    // A different username goes through.
    let mut third = repository(&store);
    third.create(u2).unwrap();
    third
        .append(u2, AccountDelta::Registered { username: "bob".to_string() })
        .unwrap();
    assert!(third.commit().await.unwrap());
}

#[tokio::test]
async fn lease_conflict_aborts_the_whole_source() {
    let store = AccountStore::new();
    let (u1, u2, bystander) = (Id::random(), Id::random(), Id::random());

    let mut first = repository(&store);
    first.create(u1).unwrap();
    first
        .append(u1, AccountDelta::Registered { username: "alice".to_string() })
        .unwrap();
    assert!(first.commit().await.unwrap());

    // One source: a fresh bystander entity plus a conflicting registration.
    let mut second = repository(&store);
    second.create(bystander).unwrap();
    second.create(u2).unwrap();
    second
        .append(bystander, AccountDelta::Deposited { amount: 1 })
        .unwrap();
    second
        .append(u2, AccountDelta::Registered { username: "alice".to_string() })
        .unwrap();
    assert!(!second.commit().await.unwrap());

    // The bystander's message never landed.
    let mut reader = repository(&store);
    assert!(reader.load(Pointer::latest(bystander)).await.is_err());
}

#[tokio::test]
async fn usage_errors_identify_the_entity() {
    let store = AccountStore::new();
    let mut repo = repository(&store);
    let id = Id::random();

    assert_eq!(repo.get(id).unwrap_err(), UsageError::UnknownEntityId(id));
    repo.create(id).unwrap();
    assert_eq!(repo.create(id).unwrap_err(), UsageError::ExistingEntity(id));

    let error = repo
        .append(id, AccountDelta::Withdrawn { amount: 1 })
        .unwrap_err();
    assert_eq!(
        error,
        UsageError::IrreducibleDelta {
            entity_id: id,
            version: Version::ZERO
        }
    );
}

#[tokio::test]
async fn one_source_spans_multiple_entities_atomically() {
    let store = AccountStore::new();
    let (a, b) = (Id::random(), Id::random());

    let mut repo = repository(&store);
    repo.create(a).unwrap();
    repo.create(b).unwrap();
    repo.append(a, AccountDelta::Deposited { amount: 10 }).unwrap();
    repo.append(b, AccountDelta::Deposited { amount: 20 }).unwrap();
    repo.append(a, AccountDelta::Withdrawn { amount: 3 }).unwrap();
    assert!(repo.commit().await.unwrap());

    let mut reader = repository(&store);
    let state_a = reader.load(Pointer::latest(a)).await.unwrap();
    assert_eq!(state_a.version(), Version::new(2));
    assert_eq!(state_a.body().balance, 7);
    let state_b = reader.load(Pointer::latest(b)).await.unwrap();
    assert_eq!(state_b.version(), Version::new(1));
    assert_eq!(state_b.body().balance, 20);
}
