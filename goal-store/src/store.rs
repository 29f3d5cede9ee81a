//! The encrypted goal record store.
//!
//! Records live in an append-only arena addressed by dense `GoalId`, with a
//! secondary owner index maintained on insert. Mutating calls take
//! `&mut self`; whoever hosts the store is responsible for serializing
//! transactions (see `goal-ledger`).
//!
//! Every precondition of a mutating call is checked before the first write,
//! so a failed call leaves the store untouched and emits no event.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::GoalEvent;
use crate::oracle::FheOracle;
use crate::snapshot::{StoreSnapshot, SNAPSHOT_VERSION};
use crate::types::*;

/// Error types for store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Id is past the end of the record arena
    #[error("Goal not found: {0}")]
    NotFound(GoalId),

    /// Caller is not the record owner
    #[error("Unauthorized: {caller} does not own goal {goal_id}")]
    Unauthorized { goal_id: GoalId, caller: Principal },

    /// Mutation attempted on a completed goal
    #[error("Goal already completed: {0}")]
    AlreadyCompleted(GoalId),

    /// The oracle rejected the proof for an encrypted input
    #[error("Invalid proof for {field}: {reason}")]
    InvalidProof {
        field: EncryptedField,
        reason: String,
    },

    /// Snapshot cannot be restored
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

/// Arguments to `GoalStore::create_goal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGoal {
    /// Plaintext title
    pub title: String,
    /// Description already encrypted by the client
    pub encrypted_description: Vec<u8>,
    /// Deadline input (64-bit domain) and its proof
    pub deadline: EncryptedInput,
    /// Priority input (8-bit domain) and its proof
    pub priority: EncryptedInput,
}

/// Append-only store of goal records.
pub struct GoalStore {
    /// External FHE engine
    oracle: Arc<dyn FheOracle>,
    /// Records, indexed by id
    goals: Vec<Goal>,
    /// Ids owned by each principal, in creation order
    by_owner: HashMap<Principal, Vec<GoalId>>,
    /// Events not yet drained by the host
    pending_events: Vec<GoalEvent>,
}

impl GoalStore {
    /// Create an empty store backed by `oracle`.
    pub fn new(oracle: Arc<dyn FheOracle>) -> Self {
        Self {
            oracle,
            goals: Vec::new(),
            by_owner: HashMap::new(),
            pending_events: Vec::new(),
        }
    }

    /// Identity the oracle grants "self" authorization to.
    pub fn address(&self) -> &Principal {
        self.oracle.contract()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a goal owned by the caller and return its id.
    pub fn create_goal(&mut self, goal: NewGoal, ctx: &TxContext) -> Result<GoalId, StoreError> {
        // Both proofs must hold before the oracle imports either input
        self.verify(EncryptedField::Deadline, &goal.deadline, &ctx.caller)?;
        self.verify(EncryptedField::Priority, &goal.priority, &ctx.caller)?;

        let deadline = self.import(EncryptedField::Deadline, &goal.deadline, &ctx.caller)?;
        let priority = self.import(EncryptedField::Priority, &goal.priority, &ctx.caller)?;

        let progress = self.oracle.encrypt_zero(EncryptedField::Progress.width());
        let completed_at = self.oracle.encrypt_zero(EncryptedField::CompletedAt.width());

        for handle in [&deadline, &priority, &progress, &completed_at] {
            self.grant(handle, &ctx.caller);
        }

        let id = GoalId(self.goals.len() as u64);
        self.goals.push(Goal {
            id,
            owner: ctx.caller.clone(),
            title: goal.title.clone(),
            encrypted_description: goal.encrypted_description,
            encrypted_deadline: deadline,
            encrypted_priority: priority,
            encrypted_progress: progress,
            encrypted_completed_at: completed_at,
            is_completed: false,
            created_at: ctx.timestamp,
        });
        self.by_owner.entry(ctx.caller.clone()).or_default().push(id);

        tracing::debug!(goal_id = %id, owner = %ctx.caller, "Created goal");

        self.pending_events.push(GoalEvent::GoalCreated {
            goal_id: id,
            owner: ctx.caller.clone(),
            title: goal.title,
            created_at: ctx.timestamp,
        });

        Ok(id)
    }

    /// Replace the encrypted progress of an active goal.
    pub fn update_progress(
        &mut self,
        id: GoalId,
        progress: &EncryptedInput,
        ctx: &TxContext,
    ) -> Result<(), StoreError> {
        let index = self.writable(id, &ctx.caller)?;
        let handle = self.import(EncryptedField::Progress, progress, &ctx.caller)?;
        self.grant(&handle, &ctx.caller);

        let goal = &mut self.goals[index];
        goal.encrypted_progress = handle;

        tracing::debug!(goal_id = %id, "Updated progress");

        self.pending_events.push(GoalEvent::ProgressUpdated {
            goal_id: id,
            owner: goal.owner.clone(),
            updated_at: ctx.timestamp,
        });

        Ok(())
    }

    /// Record the encrypted completion time and mark the goal completed.
    pub fn complete_goal(
        &mut self,
        id: GoalId,
        completed_at: &EncryptedInput,
        ctx: &TxContext,
    ) -> Result<(), StoreError> {
        let index = self.writable(id, &ctx.caller)?;
        let handle = self.import(EncryptedField::CompletedAt, completed_at, &ctx.caller)?;
        self.grant(&handle, &ctx.caller);

        let goal = &mut self.goals[index];
        goal.encrypted_completed_at = handle;
        goal.is_completed = true;

        tracing::debug!(goal_id = %id, "Completed goal");

        self.pending_events.push(GoalEvent::GoalCompleted {
            goal_id: id,
            owner: goal.owner.clone(),
            completed_at: ctx.timestamp,
        });

        Ok(())
    }

    /// Drain events produced since the last call.
    pub fn take_events(&mut self) -> Vec<GoalEvent> {
        std::mem::take(&mut self.pending_events)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn goal(&self, id: GoalId) -> Result<&Goal, StoreError> {
        id.index()
            .and_then(|index| self.goals.get(index))
            .ok_or(StoreError::NotFound(id))
    }

    /// Public metadata: owner, title, creation time and completion flag.
    pub fn goal_meta(&self, id: GoalId) -> Result<GoalMeta, StoreError> {
        self.goal(id).map(Goal::meta)
    }

    pub fn encrypted_description(&self, id: GoalId) -> Result<&[u8], StoreError> {
        self.goal(id).map(|goal| goal.encrypted_description.as_slice())
    }

    pub fn encrypted_handle(&self, id: GoalId, field: EncryptedField) -> Result<Handle, StoreError> {
        self.goal(id).map(|goal| goal.handle(field))
    }

    pub fn encrypted_deadline(&self, id: GoalId) -> Result<Handle, StoreError> {
        self.encrypted_handle(id, EncryptedField::Deadline)
    }

    pub fn encrypted_priority(&self, id: GoalId) -> Result<Handle, StoreError> {
        self.encrypted_handle(id, EncryptedField::Priority)
    }

    pub fn encrypted_progress(&self, id: GoalId) -> Result<Handle, StoreError> {
        self.encrypted_handle(id, EncryptedField::Progress)
    }

    pub fn encrypted_completed_at(&self, id: GoalId) -> Result<Handle, StoreError> {
        self.encrypted_handle(id, EncryptedField::CompletedAt)
    }

    /// Ids owned by `owner`, oldest first. Empty for unknown principals.
    pub fn goals_of(&self, owner: &Principal) -> &[GoalId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn goal_count_of(&self, owner: &Principal) -> usize {
        self.goals_of(owner).len()
    }

    /// Id and metadata of every goal owned by `owner`.
    pub fn summaries_of(&self, owner: &Principal) -> Vec<(GoalId, GoalMeta)> {
        self.goals_of(owner)
            .iter()
            .filter_map(|id| self.goal(*id).ok())
            .map(|goal| (goal.id, goal.meta()))
            .collect()
    }

    pub fn total_goals(&self) -> usize {
        self.goals.len()
    }

    pub fn exists(&self, id: GoalId) -> bool {
        id.index().is_some_and(|index| index < self.goals.len())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Copy of the persisted state.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            contract: self.address().clone(),
            goals: self.goals.clone(),
        }
    }

    /// Rebuild a store from a snapshot taken against the same oracle identity.
    ///
    /// The owner index is derived from the records.
    pub fn restore(oracle: Arc<dyn FheOracle>, snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::CorruptSnapshot(format!(
                "unsupported version {}",
                snapshot.version
            )));
        }
        if &snapshot.contract != oracle.contract() {
            return Err(StoreError::CorruptSnapshot(format!(
                "snapshot belongs to {}, oracle is bound to {}",
                snapshot.contract,
                oracle.contract()
            )));
        }

        let mut by_owner: HashMap<Principal, Vec<GoalId>> = HashMap::new();
        for (position, goal) in snapshot.goals.iter().enumerate() {
            if goal.id.index() != Some(position) {
                return Err(StoreError::CorruptSnapshot(format!(
                    "goal at position {} has id {}",
                    position, goal.id
                )));
            }
            by_owner.entry(goal.owner.clone()).or_default().push(goal.id);
        }

        tracing::debug!(goals = snapshot.goals.len(), "Restored goal store");

        Ok(Self {
            oracle,
            goals: snapshot.goals,
            by_owner,
            pending_events: Vec::new(),
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Existence, ownership and not-completed checks, in that order.
    fn writable(&self, id: GoalId, caller: &Principal) -> Result<usize, StoreError> {
        let goal = self.goal(id)?;
        if &goal.owner != caller {
            return Err(StoreError::Unauthorized {
                goal_id: id,
                caller: caller.clone(),
            });
        }
        if goal.is_completed {
            return Err(StoreError::AlreadyCompleted(id));
        }
        // goal() succeeded, so the id is a valid index
        Ok(goal.id.0 as usize)
    }

    fn verify(
        &self,
        field: EncryptedField,
        input: &EncryptedInput,
        caller: &Principal,
    ) -> Result<(), StoreError> {
        self.oracle
            .verify(&input.handle, &input.proof, field.width(), caller)
            .map_err(|e| StoreError::InvalidProof {
                field,
                reason: e.to_string(),
            })
    }

    fn import(
        &self,
        field: EncryptedField,
        input: &EncryptedInput,
        caller: &Principal,
    ) -> Result<Handle, StoreError> {
        self.oracle
            .verify_and_import(&input.handle, &input.proof, field.width(), caller)
            .map_err(|e| StoreError::InvalidProof {
                field,
                reason: e.to_string(),
            })
    }

    /// Store and owner may decrypt `handle`. Earlier handles keep their grants.
    fn grant(&self, handle: &Handle, owner: &Principal) {
        self.oracle.authorize_self(handle);
        self.oracle.authorize_for(handle, owner);
    }
}
