//! Background job that applies finalized corrections.
//!
//! Each round loads the pending corrections finalized at least
//! `min_delay` ago and applies them with bounded concurrency. No round runs
//! while the game is paused. Each
//! application runs in its own task; a task torn down before it finishes
//! reports [`ActionError::Cancelled`], is counted as failed, and leaves its
//! correction pending for the next round.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use bermudia_db::GameStore;
use bermudia_types::{Entity, store_timestamp};

use crate::config::AppConfig;
use crate::error::{ActionError, ErrorKind};
use crate::service::GameService;

/// Shortest interval between rounds.
const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// What one round did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Corrections that were due.
    pub due: usize,
    /// Corrections applied.
    pub applied: usize,
    /// Corrections rejected by the fence, a settled answer, or a missing
    /// player or answer.
    pub rejected: usize,
    /// Corrections left pending by another failure.
    pub failed: usize,
}

/// The correction job.
#[derive(Debug)]
pub struct CorrectionJob<S> {
    service: GameService<S>,
    interval: Duration,
    min_delay: Duration,
    workers: usize,
}

impl<S: GameStore> CorrectionJob<S> {
    /// Build a job with explicit timing.
    pub fn new(
        service: GameService<S>,
        interval: Duration,
        min_delay: Duration,
        workers: usize,
    ) -> Self {
        Self {
            service,
            interval: interval.max(MIN_INTERVAL),
            min_delay,
            workers: workers.max(1),
        }
    }

    /// Build a job from the grading section of `config`.
    pub fn from_config(service: GameService<S>, config: &AppConfig) -> Self {
        Self::new(
            service,
            config.grading.job_interval(),
            config.min_correction_delay(),
            config.grading.correction_workers,
        )
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.min_delay)
            .ok()
            .and_then(|delay| now.checked_sub_signed(delay))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Apply every correction that is due now.
    pub async fn run_round(&self) -> Result<RoundReport, ActionError> {
        if self.service.is_paused().await? {
            tracing::debug!("Game paused, correction round skipped");
            return Ok(RoundReport::default());
        }
        let due = self
            .service
            .due_corrections(self.cutoff(store_timestamp()))
            .await?;
        if due.is_empty() {
            return Ok(RoundReport::default());
        }

        let count = due.len();
        let applied = AtomicUsize::new(0);
        let rejected = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        futures::stream::iter(due)
            .for_each_concurrent(self.workers, |correction| {
                let service = self.service.clone();
                let (applied, rejected, failed) = (&applied, &rejected, &failed);
                async move {
                    let id = correction.id;
                    let outcome = tokio::spawn(async move {
                        service.apply_correction(correction).await
                    })
                    .await
                    .map_err(ActionError::from)
                    .and_then(|result| result);
                    let counter = match &outcome {
                        Ok(_) => applied,
                        Err(err) if is_rejection(err) => rejected,
                        Err(err) => {
                            tracing::warn!(
                                correction_id = %id,
                                error = %err,
                                "Correction not applied"
                            );
                            failed
                        }
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .await;

        let report = RoundReport {
            due: count,
            applied: applied.into_inner(),
            rejected: rejected.into_inner(),
            failed: failed.into_inner(),
        };
        tracing::info!(
            due = report.due,
            applied = report.applied,
            rejected = report.rejected,
            failed = report.failed,
            "Correction round finished"
        );
        Ok(report)
    }

    /// Run rounds on the interval until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            min_delay_secs = self.min_delay.as_secs(),
            workers = self.workers,
            "Correction job started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.run_round().await {
                        tracing::error!(error = %err, "Correction round failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Correction job stopped");
    }
}

fn is_rejection(err: &ActionError) -> bool {
    err.kind() == ErrorKind::FenceRejected
        || matches!(
            err.violation(),
            Some(bermudia_players::Violation::AnswerNotPending { .. })
        )
        || matches!(
            err,
            ActionError::NotFound {
                entity: Entity::Player | Entity::Answer | Entity::Question,
                ..
            }
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use bermudia_db::MemoryStore;
    use bermudia_players::Submission;
    use bermudia_types::{
        AnswerStatus, Correction, CorrectionId, CorrectionStatus, QuestionId, UserId,
    };

    use super::*;
    use crate::catalog::fixtures::catalog;
    use crate::hub::Hub;
    use crate::service::fixtures::{service, settings};

    fn submission(text: &str) -> Submission {
        Submission {
            text: Some(text.to_owned()),
            filename: None,
        }
    }

    #[tokio::test]
    async fn corrections_wait_out_the_delay() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();
        let q1 = QuestionId::new("q1");
        svc.submit_answer(UserId(1), &q1, submission("my answer"))
            .await
            .unwrap();
        let draft = svc
            .create_correction(
                UserId(1),
                q1.clone(),
                AnswerStatus::Correct,
                Some(String::from("ok")),
            )
            .await
            .unwrap();
        svc.finalize_correction(draft.id).await.unwrap();

        let patient = CorrectionJob::new(
            svc.clone(),
            Duration::from_secs(1),
            Duration::from_secs(3600),
            2,
        );
        assert_eq!(patient.run_round().await.unwrap(), RoundReport::default());

        let eager = CorrectionJob::new(svc.clone(), Duration::from_secs(1), Duration::ZERO, 2);
        let report = eager.run_round().await.unwrap();
        assert_eq!(report.due, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(
            svc.answer(UserId(1), &q1).await.unwrap().status,
            AnswerStatus::Correct
        );
        assert_eq!(eager.run_round().await.unwrap().due, 0);
    }

    #[tokio::test]
    async fn stale_corrections_are_rejected_not_retried() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();
        let q1 = QuestionId::new("q1");
        svc.submit_answer(UserId(1), &q1, submission("answer"))
            .await
            .unwrap();
        for status in [AnswerStatus::Wrong, AnswerStatus::Correct] {
            let draft = svc
                .create_correction(UserId(1), q1.clone(), status, Some(String::from("seen")))
                .await
                .unwrap();
            svc.finalize_correction(draft.id).await.unwrap();
        }

        let job = CorrectionJob::new(svc.clone(), Duration::from_secs(1), Duration::ZERO, 1);
        let report = job.run_round().await.unwrap();
        assert_eq!(report.due, 2);
        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(job.run_round().await.unwrap().due, 0);
        assert_eq!(
            svc.answer(UserId(1), &q1).await.unwrap().status,
            AnswerStatus::Wrong
        );
    }

    #[tokio::test]
    async fn corrections_for_missing_players_are_rejected_once() {
        let store = Arc::new(MemoryStore::new());
        store
            .create_correction(Correction {
                id: CorrectionId::new(),
                user_id: UserId(42),
                question_id: QuestionId::new("q1"),
                new_status: AnswerStatus::Correct,
                feedback: Some(String::from("fine")),
                status: CorrectionStatus::Pending,
                updated_at: store_timestamp(),
            })
            .await
            .unwrap();
        let svc = GameService::new(
            Arc::clone(&store),
            Arc::new(catalog()),
            Arc::new(Hub::new(Duration::from_millis(100))),
            settings(),
        );

        let job = CorrectionJob::new(svc, Duration::from_secs(1), Duration::ZERO, 1);
        let report = job.run_round().await.unwrap();
        assert_eq!(report.due, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(job.run_round().await.unwrap().due, 0);
        assert!(store.answers_of(UserId(42)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paused_game_skips_rounds() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();
        let q1 = QuestionId::new("q1");
        svc.submit_answer(UserId(1), &q1, submission("answer"))
            .await
            .unwrap();
        let draft = svc
            .create_correction(
                UserId(1),
                q1.clone(),
                AnswerStatus::Wrong,
                Some(String::from("no")),
            )
            .await
            .unwrap();
        svc.finalize_correction(draft.id).await.unwrap();

        let job = CorrectionJob::new(svc.clone(), Duration::from_secs(1), Duration::ZERO, 1);
        svc.set_paused(true).await.unwrap();
        assert_eq!(job.run_round().await.unwrap(), RoundReport::default());
        assert_eq!(
            svc.answer(UserId(1), &q1).await.unwrap().status,
            AnswerStatus::Pending
        );

        svc.set_paused(false).await.unwrap();
        assert_eq!(job.run_round().await.unwrap().applied, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let job = CorrectionJob::new(service(), Duration::from_millis(10), Duration::ZERO, 1);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(job.run(rx));
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
