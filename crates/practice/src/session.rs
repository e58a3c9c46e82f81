use rand::{rngs::StdRng, Rng, SeedableRng};
use shared::{
    domain::{Item, RoomId},
    error::{PracticeError, StoreError},
};
use tracing::{debug, info, warn};

use crate::{EntityStore, SequencePolicy, Sequencer};

/// Result of a successful `advance`.
#[derive(Debug)]
pub enum Advance {
    /// The next item. It counts as shown even when recording it failed.
    Shown(Shown),
    /// The sequence ran out. The controller is idle again and nothing was logged.
    Finished { shown: usize },
}

#[derive(Debug)]
pub struct Shown {
    pub item: Item,
    /// Set when the progress event could not be written.
    pub logging_fault: Option<StoreError>,
}

struct ActiveSession {
    scope: Option<RoomId>,
    sequencer: Sequencer<Item>,
    shown: usize,
}

enum SessionState {
    Idle,
    Active(ActiveSession),
}

/// Owns at most one practice session over an entity store.
///
/// Not meant for concurrent callers. `start`, `advance` and `stop` take
/// `&mut self`; share a controller behind a single mutex if needed.
pub struct SessionController<S: EntityStore> {
    store: S,
    rng: StdRng,
    state: SessionState,
    current: Option<Item>,
}

impl<S: EntityStore> SessionController<S> {
    pub fn new(store: S) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Shuffles become reproducible for a given seed.
    pub fn with_seed(store: S, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: S, rng: StdRng) -> Self {
        Self {
            store,
            rng,
            state: SessionState::Idle,
            current: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Room the active session draws from; `None` when idle or practicing every room.
    pub fn scope(&self) -> Option<RoomId> {
        match &self.state {
            SessionState::Active(active) => active.scope,
            SessionState::Idle => None,
        }
    }

    /// Items shown so far in the active session.
    pub fn shown_count(&self) -> usize {
        match &self.state {
            SessionState::Active(active) => active.shown,
            SessionState::Idle => 0,
        }
    }

    /// Last item returned by `advance`, cleared by `stop` and by exhaustion.
    pub fn current(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    /// Begins a session over one room, or over every item when `scope` is `None`.
    ///
    /// An active session is dropped without logging its unseen tail. If the
    /// item lookup fails, the previous state is left untouched. Returns the
    /// number of items queued.
    pub async fn start(&mut self, scope: Option<RoomId>) -> Result<usize, PracticeError> {
        let items = self.store.list_items(scope).await?;
        let queued = items.len();

        if let SessionState::Active(previous) = &self.state {
            debug!(
                previous_scope = ?previous.scope,
                previous_shown = previous.shown,
                "discarding in-flight practice session"
            );
        }

        let sequencer = Sequencer::with_rng(
            items,
            SequencePolicy::SESSION,
            StdRng::seed_from_u64(self.rng.gen()),
        );
        self.state = SessionState::Active(ActiveSession {
            scope,
            sequencer,
            shown: 0,
        });
        self.current = None;
        info!(scope = ?scope, queued, "practice session started");
        Ok(queued)
    }

    pub async fn advance(&mut self) -> Result<Advance, PracticeError> {
        self.advance_with_note(None).await
    }

    /// Like `advance`, attaching `note` to the progress event.
    pub async fn advance_with_note(&mut self, note: Option<&str>) -> Result<Advance, PracticeError> {
        let SessionState::Active(active) = &mut self.state else {
            return Err(PracticeError::NoActiveSession);
        };

        let Some(item) = active.sequencer.next() else {
            let shown = active.shown;
            self.state = SessionState::Idle;
            self.current = None;
            info!(shown, "practice session finished");
            return Ok(Advance::Finished { shown });
        };
        active.shown += 1;

        let logging_fault = match self.store.append_progress_event(item.id, note).await {
            Ok(event) => {
                debug!(item_id = %item.id, event_id = %event.id, "review logged");
                None
            }
            Err(error) => {
                warn!(item_id = %item.id, %error, "failed to log review; item still shown");
                Some(error)
            }
        };

        self.current = Some(item.clone());
        Ok(Advance::Shown(Shown {
            item,
            logging_fault,
        }))
    }

    /// `start` followed immediately by the first `advance`.
    pub async fn start_and_advance(
        &mut self,
        scope: Option<RoomId>,
    ) -> Result<Advance, PracticeError> {
        self.start(scope).await?;
        self.advance().await
    }

    /// Ends the session without logging anything. Idempotent.
    pub fn stop(&mut self) {
        if let SessionState::Active(active) = &self.state {
            info!(shown = active.shown, "practice session stopped");
        }
        self.state = SessionState::Idle;
        self.current = None;
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
