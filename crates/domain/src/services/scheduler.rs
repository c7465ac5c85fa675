//! The Scheduler Loop (§4.3): a durable, multi-replica-safe timer that wakes
//! drafts whose deadline has passed and dispatches them to a bounded worker
//! pool. Grounded in the teacher's `ClockManager::run`/`run_async` tick-loop
//! shape, generalized from in-memory per-session countdown to database-backed
//! per-draft deadlines read through `DraftRepository`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::commit::CommitProtocol;
use crate::repositories::DraftRepository;
use crate::services::auto_pick::AutoPickStrategy;

/// Upper bound on how long the loop sleeps with nothing scheduled before
/// re-polling `fetch_next_deadline`. Guards against a missed wake signal
/// (e.g. a draft created by another replica) stalling this loop forever.
const IDLE_POLL: StdDuration = StdDuration::from_secs(5);

/// Default size of the bounded worker pool handling timed-out drafts.
const DEFAULT_WORKERS: usize = 10;

pub struct SchedulerConfig {
    pub worker_capacity: usize,
    pub batch_size: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_capacity: DEFAULT_WORKERS,
            batch_size: 32,
        }
    }
}

/// Sends a wake signal to an already-running `SchedulerLoop`, e.g. right
/// after a new draft is started so its deadline doesn't wait out a full
/// `IDLE_POLL` cycle.
#[derive(Clone)]
pub struct SchedulerWake {
    tx: mpsc::Sender<()>,
}

impl SchedulerWake {
    /// A disconnected wake handle for tests that exercise handlers without a
    /// running `SchedulerLoop`; `wake()` on it is a harmless no-op.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::channel(1);
        Self { tx }
    }

    pub fn wake(&self) {
        // A full channel means a wake is already pending; that's fine, the
        // loop only needs to know "something changed", not how many times.
        let _ = self.tx.try_send(());
    }
}

pub struct SchedulerLoop<C: Clock> {
    draft_repo: Arc<dyn DraftRepository>,
    commit: Arc<dyn CommitProtocol>,
    auto_pick: Arc<dyn AutoPickStrategy>,
    clock: Arc<C>,
    config: SchedulerConfig,
    wake_rx: mpsc::Receiver<()>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl<C: Clock + 'static> SchedulerLoop<C> {
    pub fn new(
        draft_repo: Arc<dyn DraftRepository>,
        commit: Arc<dyn CommitProtocol>,
        auto_pick: Arc<dyn AutoPickStrategy>,
        clock: Arc<C>,
        config: SchedulerConfig,
    ) -> (Self, SchedulerWake) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                draft_repo,
                commit,
                auto_pick,
                clock,
                config,
                wake_rx: rx,
                in_flight: Arc::new(Mutex::new(HashSet::new())),
            },
            SchedulerWake { tx },
        )
    }

    /// Run until `shutdown` is cancelled. Each iteration:
    /// 1. drains any pending wake signals;
    /// 2. fetches the single next deadline across all in-progress drafts;
    /// 3. sleeps until that deadline (or `IDLE_POLL`, whichever is sooner),
    ///    racing against a wake signal or shutdown;
    /// 4. on wake, fetches every draft whose deadline has passed and
    ///    dispatches each to the worker pool, deduped against in-flight work.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_capacity));

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            while self.wake_rx.try_recv().is_ok() {}

            let next_deadline = match self.draft_repo.fetch_next_deadline().await {
                Ok(due) => due.map(|d| d.deadline),
                Err(err) => {
                    error!(error = %err, "failed to fetch next deadline, backing off");
                    None
                }
            };

            let wait = self.compute_wait(next_deadline);

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = self.wake_rx.recv() => continue,
                _ = tokio::time::sleep(wait) => {}
            }

            self.dispatch_due(&semaphore).await;
        }

        info!("scheduler loop shutting down, draining in-flight workers");
        // Acquiring every permit blocks until all spawned workers release
        // theirs, giving in-flight commits a chance to finish cleanly.
        let _ = semaphore
            .acquire_many(self.config.worker_capacity as u32)
            .await;
    }

    fn compute_wait(&self, next_deadline: Option<DateTime<Utc>>) -> StdDuration {
        match next_deadline {
            None => IDLE_POLL,
            Some(deadline) => {
                let now = self.clock.now();
                if deadline <= now {
                    StdDuration::ZERO
                } else {
                    (deadline - now)
                        .to_std()
                        .unwrap_or(StdDuration::ZERO)
                        .min(IDLE_POLL)
                }
            }
        }
    }

    async fn dispatch_due(&self, semaphore: &Arc<Semaphore>) {
        let due = match self
            .draft_repo
            .fetch_drafts_due_for_pick(self.config.batch_size)
            .await
        {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "failed to fetch drafts due for pick");
                return;
            }
        };

        for entry in due {
            let already_running = {
                let mut in_flight = self.in_flight.lock().unwrap();
                !in_flight.insert(entry.draft_id)
            };
            if already_running {
                debug!(draft_id = %entry.draft_id, "timeout handler already in flight, skipping");
                continue;
            }

            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    debug!(draft_id = %entry.draft_id, "worker pool saturated, will retry next tick");
                    self.in_flight.lock().unwrap().remove(&entry.draft_id);
                    continue;
                }
            };

            let commit = self.commit.clone();
            let auto_pick = self.auto_pick.clone();
            let in_flight = self.in_flight.clone();
            let draft_id = entry.draft_id;

            tokio::spawn(async move {
                let _permit = permit;
                let result = std::panic::AssertUnwindSafe(handle_timeout(draft_id, commit, auto_pick))
                    .catch_unwind()
                    .await;
                if let Err(panic) = result {
                    error!(draft_id = %draft_id, ?panic, "auto-pick worker panicked");
                }
                in_flight.lock().unwrap().remove(&draft_id);
            });
        }
    }
}

async fn handle_timeout(
    draft_id: Uuid,
    commit: Arc<dyn CommitProtocol>,
    auto_pick: Arc<dyn AutoPickStrategy>,
) {
    let request = match auto_pick.select_and_claim(draft_id).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            warn!(draft_id = %draft_id, "no available players for auto-pick, checking remaining picks");
            match commit.handle_pick_exhaustion(draft_id).await {
                Ok(true) => info!(draft_id = %draft_id, "draft completed with no player available for the final slot"),
                Ok(false) => warn!(draft_id = %draft_id, "deadline advanced, slot left open with no player available"),
                Err(err) => error!(draft_id = %draft_id, error = %err, "failed to resolve exhausted auto-pick"),
            }
            return;
        }
        Err(err) => {
            error!(draft_id = %draft_id, error = %err, "auto-pick strategy failed");
            return;
        }
    };

    match commit.commit_auto_pick(draft_id, request.player_id).await {
        Ok(Some(outcome)) => {
            info!(
                draft_id = %draft_id,
                pick_id = %outcome.pick_id,
                overall_pick = outcome.overall_pick,
                draft_completed = outcome.draft_completed,
                "auto-pick committed"
            );
        }
        Ok(None) => {
            debug!(draft_id = %draft_id, "no open slot remained by commit time");
        }
        Err(err) => {
            error!(draft_id = %draft_id, error = %err, "auto-pick commit failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use mockall::mock;

    mock! {
        Commit {}

        #[async_trait::async_trait]
        impl CommitProtocol for Commit {
            async fn commit_user_pick(
                &self,
                draft_id: Uuid,
                pick_id: Uuid,
                team_id: Uuid,
                player_id: Uuid,
            ) -> crate::errors::DomainResult<crate::commit::CommitOutcome>;
            async fn commit_auto_pick(
                &self,
                draft_id: Uuid,
                player_id: Uuid,
            ) -> crate::errors::DomainResult<Option<crate::commit::CommitOutcome>>;
            async fn start_draft(
                &self,
                draft: crate::models::Draft,
                picks: Vec<crate::models::DraftPick>,
            ) -> crate::errors::DomainResult<crate::models::Draft>;
            async fn pause_draft(&self, draft_id: Uuid) -> crate::errors::DomainResult<crate::models::Draft>;
            async fn resume_draft(&self, draft_id: Uuid) -> crate::errors::DomainResult<crate::models::Draft>;
            async fn handle_pick_exhaustion(&self, draft_id: Uuid) -> crate::errors::DomainResult<bool>;
        }
    }

    #[tokio::test]
    async fn compute_wait_is_zero_once_deadline_has_passed() {
        let clock = Arc::new(TestClock::new(Utc::now()));
        let (scheduler, _wake) = SchedulerLoop::new(
            Arc::new(NoopDraftRepo),
            Arc::new(MockCommit::new()),
            Arc::new(crate::services::auto_pick::UniformRandomAutoPick::new(Arc::new(
                NoopPlayerPool,
            ))),
            clock.clone(),
            SchedulerConfig::default(),
        );
        let past = clock.now() - chrono::Duration::seconds(1);
        assert_eq!(scheduler.compute_wait(Some(past)), StdDuration::ZERO);
    }

    #[tokio::test]
    async fn compute_wait_falls_back_to_idle_poll_with_nothing_scheduled() {
        let clock = Arc::new(TestClock::new(Utc::now()));
        let (scheduler, _wake) = SchedulerLoop::new(
            Arc::new(NoopDraftRepo),
            Arc::new(MockCommit::new()),
            Arc::new(crate::services::auto_pick::UniformRandomAutoPick::new(Arc::new(
                NoopPlayerPool,
            ))),
            clock,
            SchedulerConfig::default(),
        );
        assert_eq!(scheduler.compute_wait(None), IDLE_POLL);
    }

    /// Covers review-driven fix: an exhausted auto-pick attempt (no
    /// available players) must consult `CommitProtocol::handle_pick_exhaustion`
    /// rather than silently leaving the slot open forever.
    #[tokio::test]
    async fn handle_timeout_resolves_exhaustion_through_commit_protocol() {
        let mut commit = MockCommit::new();
        commit.expect_handle_pick_exhaustion().times(1).returning(|_| Ok(false));

        let commit: Arc<dyn CommitProtocol> = Arc::new(commit);
        let auto_pick = Arc::new(crate::services::auto_pick::UniformRandomAutoPick::new(Arc::new(NoopPlayerPool)));
        handle_timeout(Uuid::new_v4(), commit, auto_pick).await;
    }

    struct NoopDraftRepo;
    #[async_trait::async_trait]
    impl DraftRepository for NoopDraftRepo {
        async fn create(&self, draft: &crate::models::Draft) -> crate::errors::DomainResult<crate::models::Draft> {
            Ok(draft.clone())
        }
        async fn find_by_id(&self, _id: Uuid) -> crate::errors::DomainResult<Option<crate::models::Draft>> {
            Ok(None)
        }
        async fn find_by_status(
            &self,
            _status: crate::models::DraftStatus,
        ) -> crate::errors::DomainResult<Vec<crate::models::Draft>> {
            Ok(vec![])
        }
        async fn find_all(&self) -> crate::errors::DomainResult<Vec<crate::models::Draft>> {
            Ok(vec![])
        }
        async fn update(&self, draft: &crate::models::Draft) -> crate::errors::DomainResult<crate::models::Draft> {
            Ok(draft.clone())
        }
        async fn delete(&self, _id: Uuid) -> crate::errors::DomainResult<()> {
            Ok(())
        }
        async fn fetch_next_deadline(&self) -> crate::errors::DomainResult<Option<crate::repositories::DueDraft>> {
            Ok(None)
        }
        async fn fetch_drafts_due_for_pick(
            &self,
            _limit: i64,
        ) -> crate::errors::DomainResult<Vec<crate::repositories::DueDraft>> {
            Ok(vec![])
        }
        async fn update_next_deadline(
            &self,
            _draft_id: Uuid,
            _deadline: Option<DateTime<Utc>>,
        ) -> crate::errors::DomainResult<()> {
            Ok(())
        }
    }

    struct NoopPlayerPool;
    #[async_trait::async_trait]
    impl crate::repositories::AvailablePlayerPool for NoopPlayerPool {
        async fn available_players(&self, _draft_id: Uuid) -> crate::errors::DomainResult<Vec<Uuid>> {
            Ok(vec![])
        }
    }
}
