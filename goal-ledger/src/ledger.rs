//! The ledger host: a single task that owns the goal store.
//!
//! Callers talk to the store through a cloneable `LedgerHandle`. Every call
//! becomes a command on a bounded queue and the ledger task applies commands
//! one at a time, which gives mutating calls a total order without any lock
//! around the store. Mutations are stamped with the admission time and their
//! events are broadcast after the command commits.
//!
//! An admitted command always runs to completion. Dropping the reply
//! receiver does not undo it. A panicking read closure fails only its own
//! call.

use std::panic::{catch_unwind, AssertUnwindSafe};

use goal_store::{
    EncryptedField, EncryptedInput, GoalEvent, GoalId, GoalMeta, GoalStore, Handle, NewGoal,
    Principal, StoreError, StoreSnapshot, TxContext,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;

/// Error types for the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The store rejected the call
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The ledger task has stopped
    #[error("Ledger is shut down")]
    Closed,

    /// A read closure panicked; the store is unaffected
    #[error("Read query panicked")]
    ReadPanicked,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Snapshot or config file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding
    #[error("Snapshot encoding error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Config encoding
    #[error("Config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The oracle refused a decryption request
    #[error("Oracle error: {0}")]
    Oracle(#[from] goal_store::OracleError),

    /// Description could not be sealed or opened
    #[error(transparent)]
    Cipher(#[from] goal_cipher::CipherError),
}

type Reply<T> = oneshot::Sender<Result<T, StoreError>>;
type Query = Box<dyn FnOnce(&GoalStore) + Send>;

/// Request sent to the ledger task.
enum Command {
    Create {
        caller: Principal,
        goal: NewGoal,
        reply: Reply<GoalId>,
    },
    UpdateProgress {
        caller: Principal,
        goal_id: GoalId,
        progress: EncryptedInput,
        reply: Reply<()>,
    },
    Complete {
        caller: Principal,
        goal_id: GoalId,
        completed_at: EncryptedInput,
        reply: Reply<()>,
    },
    Query(Query),
}

/// Spawns the ledger task.
pub struct Ledger;

impl Ledger {
    /// Move `store` into a new task and return a handle to it.
    ///
    /// The join handle yields the store back once every `LedgerHandle` has
    /// been dropped, so the caller can snapshot it.
    pub fn spawn(
        store: GoalStore,
        ledger_id: impl Into<String>,
        channels: &ChannelConfig,
    ) -> (LedgerHandle, JoinHandle<GoalStore>) {
        let (command_tx, command_rx) = mpsc::channel(channels.command_buffer);
        let (event_tx, _) = broadcast::channel(channels.event_buffer);
        let ledger_id = ledger_id.into();

        info!(
            ledger_id = %ledger_id,
            contract = %store.address(),
            goals = store.total_goals(),
            "Starting ledger"
        );

        let task = tokio::spawn(run(store, command_rx, event_tx.clone(), ledger_id));

        let handle = LedgerHandle {
            commands: command_tx,
            events: event_tx,
        };
        (handle, task)
    }
}

async fn run(
    mut store: GoalStore,
    mut commands: mpsc::Receiver<Command>,
    events: broadcast::Sender<GoalEvent>,
    ledger_id: String,
) -> GoalStore {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Create {
                caller,
                goal,
                reply,
            } => {
                let ctx = TxContext::now(caller);
                let result = store.create_goal(goal, &ctx);
                log_outcome("create_goal", &ctx, &result);
                let _ = reply.send(result);
            }
            Command::UpdateProgress {
                caller,
                goal_id,
                progress,
                reply,
            } => {
                let ctx = TxContext::now(caller);
                let result = store.update_progress(goal_id, &progress, &ctx);
                log_outcome("update_progress", &ctx, &result);
                let _ = reply.send(result);
            }
            Command::Complete {
                caller,
                goal_id,
                completed_at,
                reply,
            } => {
                let ctx = TxContext::now(caller);
                let result = store.complete_goal(goal_id, &completed_at, &ctx);
                log_outcome("complete_goal", &ctx, &result);
                let _ = reply.send(result);
            }
            Command::Query(query) => query(&store),
        }

        for event in store.take_events() {
            // No subscribers is fine
            let _ = events.send(event);
        }
    }

    info!(ledger_id = %ledger_id, goals = store.total_goals(), "Ledger stopped");
    store
}

fn log_outcome<T: std::fmt::Debug>(op: &str, ctx: &TxContext, result: &Result<T, StoreError>) {
    match result {
        Ok(value) => debug!(op, caller = %ctx.caller, result = ?value, "Committed"),
        Err(e) => warn!(op, caller = %ctx.caller, error = %e, "Rejected"),
    }
}

/// Cloneable client for a running ledger.
#[derive(Clone)]
pub struct LedgerHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<GoalEvent>,
}

impl LedgerHandle {
    /// Receive every event committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GoalEvent> {
        self.events.subscribe()
    }

    pub async fn create_goal(&self, caller: Principal, goal: NewGoal) -> Result<GoalId, LedgerError> {
        self.submit(|reply| Command::Create {
            caller,
            goal,
            reply,
        })
        .await
    }

    pub async fn update_progress(
        &self,
        caller: Principal,
        goal_id: GoalId,
        progress: EncryptedInput,
    ) -> Result<(), LedgerError> {
        self.submit(|reply| Command::UpdateProgress {
            caller,
            goal_id,
            progress,
            reply,
        })
        .await
    }

    pub async fn complete_goal(
        &self,
        caller: Principal,
        goal_id: GoalId,
        completed_at: EncryptedInput,
    ) -> Result<(), LedgerError> {
        self.submit(|reply| Command::Complete {
            caller,
            goal_id,
            completed_at,
            reply,
        })
        .await
    }

    /// Run a read-only closure against the store, in order with mutations.
    pub async fn read<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        T: Send + 'static,
        F: FnOnce(&GoalStore) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let query: Query = Box::new(move |store| {
            // Reads take `&GoalStore`, so a panic cannot leave it half-written
            let outcome = catch_unwind(AssertUnwindSafe(|| f(store)));
            let _ = reply_tx.send(outcome.map_err(|_| ()));
        });

        self.commands
            .send(Command::Query(query))
            .await
            .map_err(|_| LedgerError::Closed)?;
        reply_rx
            .await
            .map_err(|_| LedgerError::Closed)?
            .map_err(|()| LedgerError::ReadPanicked)
    }

    pub async fn goal_meta(&self, goal_id: GoalId) -> Result<GoalMeta, LedgerError> {
        Ok(self.read(move |store| store.goal_meta(goal_id)).await??)
    }

    pub async fn encrypted_description(&self, goal_id: GoalId) -> Result<Vec<u8>, LedgerError> {
        let blob = self
            .read(move |store| store.encrypted_description(goal_id).map(<[u8]>::to_vec))
            .await??;
        Ok(blob)
    }

    pub async fn encrypted_handle(
        &self,
        goal_id: GoalId,
        field: EncryptedField,
    ) -> Result<Handle, LedgerError> {
        Ok(self
            .read(move |store| store.encrypted_handle(goal_id, field))
            .await??)
    }

    pub async fn goals_of(&self, owner: Principal) -> Result<Vec<GoalId>, LedgerError> {
        self.read(move |store| store.goals_of(&owner).to_vec()).await
    }

    pub async fn goal_count_of(&self, owner: Principal) -> Result<usize, LedgerError> {
        self.read(move |store| store.goal_count_of(&owner)).await
    }

    pub async fn summaries_of(&self, owner: Principal) -> Result<Vec<(GoalId, GoalMeta)>, LedgerError> {
        self.read(move |store| store.summaries_of(&owner)).await
    }

    pub async fn total_goals(&self) -> Result<usize, LedgerError> {
        self.read(|store| store.total_goals()).await
    }

    pub async fn exists(&self, goal_id: GoalId) -> Result<bool, LedgerError> {
        self.read(move |store| store.exists(goal_id)).await
    }

    pub async fn snapshot(&self) -> Result<StoreSnapshot, LedgerError> {
        self.read(|store| store.snapshot()).await
    }

    async fn submit<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, LedgerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(build(reply_tx))
            .await
            .map_err(|_| LedgerError::Closed)?;

        let result = reply_rx.await.map_err(|_| LedgerError::Closed)?;
        Ok(result?)
    }
}
