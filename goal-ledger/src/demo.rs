//! Scripted goal lifecycle against the mock oracle.
//!
//! Creates one goal for a demo owner, records progress, shows a stranger
//! being turned away, completes the goal and then reads everything back the
//! way the owner's client would.

use std::sync::Arc;

use chrono::{Duration, Utc};
use goal_store::{
    EncryptedField, FheWidth, GoalEvent, GoalId, MockOracle, NewGoal, Principal,
};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

use crate::config::LedgerConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::persist::{load_store, save_snapshot};

/// Owner of the demo goal.
pub const DEMO_OWNER: &str = "0xA11CE0000000000000000000000000000000A11C";

/// Principal that tries to update a goal it does not own.
pub const DEMO_STRANGER: &str = "0xB0B0000000000000000000000000000000000B0B";

const DEMO_TITLE: &str = "Learn X";
const DEMO_DESCRIPTION: &str = "Finish the book and ship one small project";

/// What the demo observed, decrypted from the owner's point of view.
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub goal_id: GoalId,
    pub owner: Principal,
    pub title: String,
    pub description: String,
    pub deadline: u64,
    pub priority: u64,
    pub progress: u64,
    pub completed_at: u64,
    pub is_completed: bool,
    /// Calls the store refused, with the error it gave
    pub rejected: Vec<String>,
    /// Events in commit order
    pub events: Vec<GoalEvent>,
}

/// Run the lifecycle and return what happened.
///
/// Loads the configured snapshot first if there is one, and writes it back
/// after the ledger stops.
pub async fn run_demo(config: &LedgerConfig) -> Result<DemoReport, LedgerError> {
    let contract = config.contract()?;
    let oracle = Arc::new(MockOracle::new(contract));
    let snapshot_path = config.store.snapshot_path.as_deref();

    let store = load_store(oracle.clone(), snapshot_path).await?;
    let (ledger, task) = Ledger::spawn(store, config.ledger_id.clone(), &config.channels);
    let mut events = ledger.subscribe();

    let owner = demo_principal(DEMO_OWNER)?;
    let stranger = demo_principal(DEMO_STRANGER)?;
    let mut rejected = Vec::new();

    let deadline = (Utc::now() + Duration::days(30)).timestamp().max(0) as u64;
    let goal = NewGoal {
        title: DEMO_TITLE.to_string(),
        encrypted_description: goal_cipher::encrypt_bytes(
            DEMO_DESCRIPTION.as_bytes(),
            owner.as_str(),
        )?,
        deadline: oracle.encrypt_input(deadline, FheWidth::U64, &owner),
        priority: oracle.encrypt_input(2, FheWidth::U8, &owner),
    };
    let goal_id = ledger.create_goal(owner.clone(), goal).await?;
    info!(goal_id = %goal_id, owner = %owner, "Demo goal created");

    for percent in [40, 75] {
        let progress = oracle.encrypt_input(percent, FheWidth::U8, &owner);
        ledger.update_progress(owner.clone(), goal_id, progress).await?;
    }

    let intrusion = oracle.encrypt_input(100, FheWidth::U8, &stranger);
    match ledger.update_progress(stranger.clone(), goal_id, intrusion).await {
        Err(LedgerError::Store(e)) => rejected.push(e.to_string()),
        Err(e) => return Err(e),
        Ok(()) => warn!(goal_id = %goal_id, "Stranger update was accepted"),
    }

    let now = Utc::now().timestamp().max(0) as u64;
    let completed_at = oracle.encrypt_input(now, FheWidth::U64, &owner);
    ledger.complete_goal(owner.clone(), goal_id, completed_at).await?;

    let late = oracle.encrypt_input(100, FheWidth::U8, &owner);
    match ledger.update_progress(owner.clone(), goal_id, late).await {
        Err(LedgerError::Store(e)) => rejected.push(e.to_string()),
        Err(e) => return Err(e),
        Ok(()) => warn!(goal_id = %goal_id, "Update after completion was accepted"),
    }

    let meta = ledger.goal_meta(goal_id).await?;
    let blob = ledger.encrypted_description(goal_id).await?;
    let description = String::from_utf8(goal_cipher::decrypt_bytes(&blob, owner.as_str())?)
        .map_err(|e| goal_cipher::CipherError::DecryptionFailed(e.to_string()))?;

    let mut values = [0u64; 4];
    for (slot, field) in values.iter_mut().zip(EncryptedField::all()) {
        let handle = ledger.encrypted_handle(goal_id, field).await?;
        *slot = oracle.decrypt(&handle, &owner)?;
    }
    let [deadline, priority, progress, completed_at] = values;

    // Reads are ordered after the mutations, so every event is already sent.
    let mut observed = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => observed.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Demo subscriber lagged");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    drop(ledger);
    let store = task.await.map_err(|_| LedgerError::Closed)?;
    if let Some(path) = snapshot_path {
        save_snapshot(&store.snapshot(), path).await?;
    }

    Ok(DemoReport {
        goal_id,
        owner: meta.owner,
        title: meta.title,
        description,
        deadline,
        priority,
        progress,
        completed_at,
        is_completed: meta.is_completed,
        rejected,
        events: observed,
    })
}

fn demo_principal(address: &str) -> Result<Principal, LedgerError> {
    Principal::new(address).map_err(|e| LedgerError::Config(e.to_string()))
}
