//! Loading and saving store snapshots on disk.

use std::path::Path;
use std::sync::Arc;

use goal_store::{FheOracle, GoalStore, StoreSnapshot};
use tracing::info;

use crate::ledger::LedgerError;

/// Restore the store from `path` if a snapshot exists there, else start empty.
pub async fn load_store(
    oracle: Arc<dyn FheOracle>,
    path: Option<&Path>,
) -> Result<GoalStore, LedgerError> {
    let Some(path) = path else {
        return Ok(GoalStore::new(oracle));
    };

    if !tokio::fs::try_exists(path).await? {
        info!(path = %path.display(), "No snapshot found, starting empty");
        return Ok(GoalStore::new(oracle));
    }

    let json = tokio::fs::read_to_string(path).await?;
    let snapshot = StoreSnapshot::from_json(&json)?;
    let store = GoalStore::restore(oracle, snapshot)?;

    info!(path = %path.display(), goals = store.total_goals(), "Loaded snapshot");
    Ok(store)
}

/// Write `snapshot` to `path`, replacing any previous file.
///
/// The JSON goes to a sibling temp file first and is renamed into place.
pub async fn save_snapshot(snapshot: &StoreSnapshot, path: &Path) -> Result<(), LedgerError> {
    let json = snapshot.to_json()?;
    let tmp = path.with_extension("json.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;

    info!(path = %path.display(), goals = snapshot.goals.len(), "Saved snapshot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use goal_store::{FheWidth, MockOracle, NewGoal, Principal, StoreError, TxContext};

    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("goals.json");

        let oracle = Arc::new(MockOracle::new(Principal::new("0xc0ffee").unwrap()));
        let alice = Principal::new("0xa11ce").unwrap();

        let mut store = load_store(oracle.clone(), Some(&path)).await.unwrap();
        assert_eq!(store.total_goals(), 0);

        let goal = NewGoal {
            title: "Persist me".to_string(),
            encrypted_description: vec![9; 40],
            deadline: oracle.encrypt_input(1, FheWidth::U64, &alice),
            priority: oracle.encrypt_input(1, FheWidth::U8, &alice),
        };
        store.create_goal(goal, &TxContext::now(alice.clone())).unwrap();
        save_snapshot(&store.snapshot(), &path).await.unwrap();

        let restored = load_store(oracle, Some(&path)).await.unwrap();
        assert_eq!(restored.total_goals(), 1);
        assert_eq!(restored.goal_count_of(&alice), 1);
        assert_eq!(restored.goal_meta(goal_store::GoalId(0)).unwrap().title, "Persist me");
    }

    #[tokio::test]
    async fn test_load_rejects_foreign_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goals.json");

        let ours = Arc::new(MockOracle::new(Principal::new("0xc0ffee").unwrap()));
        let theirs = Arc::new(MockOracle::new(Principal::new("0xdecaf").unwrap()));

        let store = GoalStore::new(ours);
        save_snapshot(&store.snapshot(), &path).await.unwrap();

        let err = load_store(theirs, Some(&path)).await.err().unwrap();
        assert!(matches!(
            err,
            LedgerError::Store(StoreError::CorruptSnapshot(_))
        ));
    }

    #[tokio::test]
    async fn test_no_path_starts_empty() {
        let oracle = Arc::new(MockOracle::new(Principal::new("0xc0ffee").unwrap()));
        let store = load_store(oracle, None).await.unwrap();
        assert_eq!(store.total_goals(), 0);
    }
}
