//! Client-held board view and the optimistic pin toggle.
//!
//! A toggle runs in two phases. [`ViewCollections::apply_optimistic`] flips
//! the board in all three collections synchronously and returns a
//! [`PendingToggle`]; once the single persistence attempt settles,
//! [`ViewCollections::reconcile`] either keeps the flip or restores the
//! previous state exactly. [`BoardSession`] drives the two phases, keeps
//! toggles on the same board strictly ordered and ignores responses that
//! arrive after teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use corkboard_common::{BoardId, BoardLists, PinnedBoard};

use super::aggregate::BoardSource;
use super::identity::{IdentityProvider, require_user};
use super::pin::PinPersistence;
use crate::errors::{BoardError, BoardResult};

/// Local projection of a user's boards.
///
/// Invariant: a board is in `pinned` exactly when its `owned`/`shared`
/// entry is flagged `pinned: true`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewCollections {
    pub owned: Vec<PinnedBoard>,
    pub shared: Vec<PinnedBoard>,
    pub pinned: Vec<PinnedBoard>,
}

impl From<BoardLists> for ViewCollections {
    fn from(lists: BoardLists) -> Self {
        Self {
            owned: lists.owned,
            shared: lists.shared,
            pinned: lists.pinned,
        }
    }
}

/// Undo record for one optimistic flip.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingToggle {
    pub board_id: BoardId,
    pub was_pinned: bool,
    /// Entry taken out of `pinned` by an unpin, with its position.
    removed: Option<(usize, PinnedBoard)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server's new state matches the optimistic flip.
    Confirmed,
    /// The server disagreed or could not be reached; the flip was undone.
    RolledBack,
    /// The session ended before the response arrived; nothing was applied.
    Discarded,
}

impl ViewCollections {
    pub fn is_pinned(&self, board_id: &str) -> bool {
        self.pinned.iter().any(|b| b.id() == board_id)
    }

    fn find(&self, board_id: &str) -> Option<&PinnedBoard> {
        self.owned
            .iter()
            .chain(&self.shared)
            .find(|b| b.id() == board_id)
    }

    fn set_flag(&mut self, board_id: &str, pinned: bool) {
        for entry in self.owned.iter_mut().chain(self.shared.iter_mut()) {
            if entry.id() == board_id {
                entry.pinned = pinned;
            }
        }
    }

    /// Flip `board_id` everywhere. `None` if the board is in no collection.
    pub fn apply_optimistic(&mut self, board_id: &str) -> Option<PendingToggle> {
        let was_pinned = self.is_pinned(board_id);
        let removed = if was_pinned {
            let index = self.pinned.iter().position(|b| b.id() == board_id)?;
            Some((index, self.pinned.remove(index)))
        } else {
            let board = self.find(board_id)?.board.clone();
            self.pinned.push(PinnedBoard {
                board,
                pinned: true,
            });
            None
        };
        self.set_flag(board_id, !was_pinned);

        Some(PendingToggle {
            board_id: board_id.to_string(),
            was_pinned,
            removed,
        })
    }

    /// Settle a toggle against the persistence result.
    pub fn reconcile(
        &mut self,
        pending: PendingToggle,
        result: BoardResult<bool>,
    ) -> ToggleOutcome {
        match result {
            Ok(pinned) if pinned != pending.was_pinned => {
                debug!(board_id = %pending.board_id, pinned, "Pin toggle confirmed");
                ToggleOutcome::Confirmed
            }
            Ok(pinned) => {
                warn!(
                    board_id = %pending.board_id,
                    expected = !pending.was_pinned,
                    server = pinned,
                    "Server disagreed with pin toggle; rolling back"
                );
                self.rollback(pending);
                ToggleOutcome::RolledBack
            }
            Err(e) => {
                warn!(
                    board_id = %pending.board_id,
                    error = %e,
                    "Pin toggle failed; rolling back"
                );
                self.rollback(pending);
                ToggleOutcome::RolledBack
            }
        }
    }

    fn rollback(&mut self, pending: PendingToggle) {
        let board_id = pending.board_id.as_str();
        if pending.was_pinned {
            if let Some((index, entry)) = pending.removed
                && !self.is_pinned(board_id)
            {
                let index = index.min(self.pinned.len());
                self.pinned.insert(index, entry);
            }
        } else {
            self.pinned.retain(|b| b.id() != board_id);
        }
        self.set_flag(board_id, pending.was_pinned);
    }

    /// Check the pinned-list invariant.
    pub fn is_consistent(&self) -> bool {
        let flags_match = self
            .owned
            .iter()
            .chain(&self.shared)
            .all(|b| b.pinned == self.is_pinned(b.id()));
        let pinned_flagged = self.pinned.iter().all(|b| b.pinned);
        let mut ids: Vec<&str> = self.pinned.iter().map(PinnedBoard::id).collect();
        ids.sort_unstable();
        ids.dedup();
        flags_match && pinned_flagged && ids.len() == self.pinned.len()
    }
}

/// View controller owning one user's [`ViewCollections`].
pub struct BoardSession {
    identity: Arc<dyn IdentityProvider>,
    source: Arc<dyn BoardSource>,
    persistence: Arc<dyn PinPersistence>,
    view: Mutex<ViewCollections>,
    board_locks: Mutex<HashMap<BoardId, Arc<tokio::sync::Mutex<()>>>>,
    alive: Arc<AtomicBool>,
}

impl BoardSession {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        source: Arc<dyn BoardSource>,
        persistence: Arc<dyn PinPersistence>,
    ) -> Self {
        Self {
            identity,
            source,
            persistence,
            view: Mutex::new(ViewCollections::default()),
            board_locks: Mutex::new(HashMap::new()),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    fn view(&self) -> BoardResult<MutexGuard<'_, ViewCollections>> {
        self.view.lock().map_err(|_| BoardError::LockPoisoned)
    }

    fn board_lock(&self, board_id: &str) -> BoardResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .board_locks
            .lock()
            .map_err(|_| BoardError::LockPoisoned)?;
        Ok(locks.entry(board_id.to_string()).or_default().clone())
    }

    /// Replace the view with a fresh aggregation for the signed-in user.
    pub async fn load(&self) -> BoardResult<()> {
        let user_id = require_user(self.identity.as_ref())?;
        let lists = self.source.load_boards(&user_id).await?;
        if !self.is_active() {
            return Ok(());
        }
        *self.view()? = lists.into();
        Ok(())
    }

    pub fn snapshot(&self) -> BoardResult<ViewCollections> {
        Ok(self.view()?.clone())
    }

    /// Optimistically toggle `board_id`, persist once, then reconcile.
    pub async fn toggle_pin(&self, board_id: &str) -> BoardResult<ToggleOutcome> {
        let user_id = require_user(self.identity.as_ref())?;
        if !self.is_active() {
            return Ok(ToggleOutcome::Discarded);
        }

        let lock = self.board_lock(board_id)?;
        let _guard = lock.lock().await;
        if !self.is_active() {
            return Ok(ToggleOutcome::Discarded);
        }

        let pending = self
            .view()?
            .apply_optimistic(board_id)
            .ok_or_else(|| BoardError::board_not_found(board_id))?;

        let result = self.persistence.toggle_pin(&user_id, board_id).await;

        if !self.is_active() {
            debug!(board_id, "Session torn down; pin response ignored");
            return Ok(ToggleOutcome::Discarded);
        }
        Ok(self.view()?.reconcile(pending, result))
    }

    /// Stop applying results to the view.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Tear the session down as soon as the identity provider reports a
    /// sign-out.
    pub fn watch_identity(&self) -> tokio::task::JoinHandle<()> {
        let mut rx = self.identity.subscribe();
        let alive = Arc::clone(&self.alive);
        tokio::spawn(async move {
            loop {
                if rx.borrow_and_update().is_none() {
                    alive.store(false, Ordering::SeqCst);
                    info!("Signed out; board session torn down");
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boards::aggregate::BoardQuery;
    use crate::boards::fixtures::{board, scenario};
    use crate::boards::identity::StaticIdentity;
    use crate::boards::pin::StorePinPersistence;
    use crate::boards::store::{DocumentStore, MemoryStore};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{Notify, Semaphore};

    /// Returns queued responses without touching any store.
    struct Scripted(Mutex<VecDeque<BoardResult<bool>>>);

    impl Scripted {
        fn new(responses: Vec<BoardResult<bool>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(responses.into())))
        }
    }

    #[async_trait]
    impl PinPersistence for Scripted {
        async fn toggle_pin(&self, _user_id: &str, _board_id: &str) -> BoardResult<bool> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(BoardError::Transient(anyhow::anyhow!("no response"))))
        }
    }

    /// Holds every request until a permit is released, then delegates.
    struct Gated {
        inner: StorePinPersistence,
        started: Notify,
        release: Semaphore,
    }

    #[async_trait]
    impl PinPersistence for Gated {
        async fn toggle_pin(&self, user_id: &str, board_id: &str) -> BoardResult<bool> {
            self.started.notify_one();
            self.release.acquire().await.unwrap().forget();
            self.inner.toggle_pin(user_id, board_id).await
        }
    }

    async fn session_with(
        persistence: Arc<dyn PinPersistence>,
    ) -> Result<(BoardSession, Arc<StaticIdentity>, Arc<MemoryStore>)> {
        let (store, index) = scenario().await?;
        let identity = Arc::new(StaticIdentity::for_user_id("U1"));
        let source = Arc::new(BoardQuery::new(store.clone(), index));
        let session = BoardSession::new(identity.clone(), source, persistence);
        session.load().await?;
        Ok((session, identity, store))
    }

    async fn store_backed_session() -> Result<(BoardSession, Arc<MemoryStore>)> {
        let (store, index) = scenario().await?;
        let identity = Arc::new(StaticIdentity::for_user_id("U1"));
        let source = Arc::new(BoardQuery::new(store.clone(), index));
        let persistence = Arc::new(StorePinPersistence::new(store.clone()));
        let session = BoardSession::new(identity, source, persistence);
        session.load().await?;
        Ok((session, store))
    }

    fn pinned_ids(view: &ViewCollections) -> Vec<&str> {
        view.pinned.iter().map(PinnedBoard::id).collect()
    }

    fn flag(view: &ViewCollections, board_id: &str) -> bool {
        view.owned
            .iter()
            .chain(&view.shared)
            .find(|b| b.id() == board_id)
            .map(|b| b.pinned)
            .unwrap()
    }

    #[tokio::test]
    async fn test_pin_round_trip_restores_original_view() -> Result<()> {
        let (session, store) = store_backed_session().await?;
        let original = session.snapshot()?;

        assert_eq!(session.toggle_pin("A").await?, ToggleOutcome::Confirmed);
        let view = session.snapshot()?;
        assert!(flag(&view, "A"));
        assert_eq!(pinned_ids(&view), vec!["B", "A"]);
        assert_eq!(view.owned.len(), original.owned.len());
        assert!(view.is_consistent());
        assert!(store.get_user("U1").await?.unwrap().is_pinned("A"));

        assert_eq!(session.toggle_pin("A").await?, ToggleOutcome::Confirmed);
        assert_eq!(session.snapshot()?, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_disagreement_rolls_back() -> Result<()> {
        let (session, _, _) = session_with(Scripted::new(vec![Ok(false)])).await?;
        let original = session.snapshot()?;

        assert_eq!(session.toggle_pin("A").await?, ToggleOutcome::RolledBack);
        let view = session.snapshot()?;
        assert!(!view.is_pinned("A"));
        assert!(!flag(&view, "A"));
        assert_eq!(view, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back() -> Result<()> {
        let failure = Err(BoardError::Transient(anyhow::anyhow!("connection reset")));
        let (session, _, _) = session_with(Scripted::new(vec![failure])).await?;
        let original = session.snapshot()?;

        assert_eq!(session.toggle_pin("B").await?, ToggleOutcome::RolledBack);
        assert_eq!(session.snapshot()?, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_shared_board_can_be_pinned() -> Result<()> {
        let (session, _) = store_backed_session().await?;
        assert_eq!(session.toggle_pin("C").await?, ToggleOutcome::Confirmed);
        let view = session.snapshot()?;
        assert!(flag(&view, "C"));
        assert_eq!(pinned_ids(&view), vec!["B", "C"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_board_is_not_found_and_view_untouched() -> Result<()> {
        let (session, _) = store_backed_session().await?;
        let original = session.snapshot()?;
        let err = session.toggle_pin("Z").await.unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
        assert_eq!(session.snapshot()?, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_signed_out_toggle_is_unauthenticated() -> Result<()> {
        let (session, identity, _) = session_with(Scripted::new(vec![Ok(true)])).await?;
        let original = session.snapshot()?;
        identity.sign_out();

        let err = session.toggle_pin("A").await.unwrap_err();
        assert!(matches!(err, BoardError::Unauthenticated));
        assert_eq!(session.snapshot()?, original);
        Ok(())
    }

    #[tokio::test]
    async fn test_response_after_teardown_is_discarded() -> Result<()> {
        let (store, _) = scenario().await?;
        let gated = Arc::new(Gated {
            inner: StorePinPersistence::new(store),
            started: Notify::new(),
            release: Semaphore::new(0),
        });
        let (session, _, _) = session_with(gated.clone()).await?;
        let session = Arc::new(session);

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.toggle_pin("A").await })
        };
        gated.started.notified().await;
        let optimistic = session.snapshot()?;
        assert!(optimistic.is_pinned("A"));

        session.teardown();
        gated.release.add_permits(1);
        assert_eq!(task.await??, ToggleOutcome::Discarded);
        assert_eq!(session.snapshot()?, optimistic);
        Ok(())
    }

    #[tokio::test]
    async fn test_toggles_on_same_board_are_serialised() -> Result<()> {
        let (store, _) = scenario().await?;
        let gated = Arc::new(Gated {
            inner: StorePinPersistence::new(store.clone()),
            started: Notify::new(),
            release: Semaphore::new(0),
        });
        let (session, _, _) = session_with(gated.clone()).await?;
        let session = Arc::new(session);
        let original = session.snapshot()?;

        let spawn_toggle = |id: &'static str| {
            let session = session.clone();
            tokio::spawn(async move { session.toggle_pin(id).await })
        };

        let first = spawn_toggle("A");
        gated.started.notified().await;
        let second = spawn_toggle("A");
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        // The second toggle waits for the first to settle before applying.
        assert!(session.snapshot()?.is_pinned("A"));

        gated.release.add_permits(1);
        assert_eq!(first.await??, ToggleOutcome::Confirmed);

        gated.started.notified().await;
        assert!(!session.snapshot()?.is_pinned("A"));
        gated.release.add_permits(1);
        assert_eq!(second.await??, ToggleOutcome::Confirmed);

        assert_eq!(session.snapshot()?, original);
        assert!(!store.get_user("U1").await?.unwrap().is_pinned("A"));
        Ok(())
    }

    #[tokio::test]
    async fn test_toggles_on_different_boards_are_independent() -> Result<()> {
        let (store, _) = scenario().await?;
        let gated = Arc::new(Gated {
            inner: StorePinPersistence::new(store),
            started: Notify::new(),
            release: Semaphore::new(0),
        });
        let (session, _, _) = session_with(gated.clone()).await?;
        let session = Arc::new(session);

        let a = {
            let session = session.clone();
            tokio::spawn(async move { session.toggle_pin("A").await })
        };
        gated.started.notified().await;
        let c = {
            let session = session.clone();
            tokio::spawn(async move { session.toggle_pin("C").await })
        };
        gated.started.notified().await;

        // Both flips are applied while both requests are in flight.
        let view = session.snapshot()?;
        assert!(view.is_pinned("A") && view.is_pinned("C"));

        gated.release.add_permits(2);
        assert_eq!(a.await??, ToggleOutcome::Confirmed);
        assert_eq!(c.await??, ToggleOutcome::Confirmed);
        assert!(session.snapshot()?.is_consistent());
        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_tears_session_down() -> Result<()> {
        let (session, identity, _) = session_with(Scripted::new(vec![])).await?;
        let watcher = session.watch_identity();
        assert!(session.is_active());

        identity.sign_out();
        watcher.await?;
        assert!(!session.is_active());
        Ok(())
    }

    fn collections() -> ViewCollections {
        let entry = |id: &str, pinned: bool| PinnedBoard {
            board: board(id, "U1", &["U1"]),
            pinned,
        };
        ViewCollections {
            owned: vec![entry("A", true), entry("B", true), entry("C", true)],
            shared: vec![],
            pinned: vec![entry("A", true), entry("B", true), entry("C", true)],
        }
    }

    #[test]
    fn test_unpin_rollback_restores_position() {
        let mut view = collections();
        let original = view.clone();

        let pending = view.apply_optimistic("B").unwrap();
        assert!(pending.was_pinned);
        assert_eq!(pinned_ids(&view), vec!["A", "C"]);
        assert!(!flag(&view, "B"));

        let outcome = view.reconcile(pending, Ok(true));
        assert_eq!(outcome, ToggleOutcome::RolledBack);
        assert_eq!(view, original);
    }

    #[test]
    fn test_apply_optimistic_unknown_board_is_none() {
        let mut view = collections();
        assert!(view.apply_optimistic("nope").is_none());
        assert_eq!(view, collections());
    }

    #[test]
    fn test_consistency_check_detects_mismatch() {
        let mut view = collections();
        assert!(view.is_consistent());
        view.owned[0].pinned = false;
        assert!(!view.is_consistent());
    }
}
