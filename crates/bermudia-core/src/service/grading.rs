//! Answers and their grading.
//!
//! A correction is drafted, revised and finalized by a grader, then
//! applied later by the correction job (or at once when auto-correction
//! grades a marked submission). Application is fenced: it only lands on an
//! answer that is still pending and has not been written since the
//! correction was finalized. A correction that misses the fence, or whose
//! player or answer no longer exists, is rejected and never retried.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bermudia_db::{GameStore, Swap};
use bermudia_players::{self as engine, Submission, Violation};
use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, Cost, InboxContent, Notification, Player,
    PlayerUpdateReason, Question, QuestionId, UserId, store_timestamp,
};

use super::GameService;
use crate::error::ActionError;

/// A correction that landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Graded {
    /// The correction, now applied.
    pub correction: Correction,
    /// The graded answer.
    pub answer: Answer,
    /// Keys granted for a correct answer, if any.
    pub reward: Option<Cost>,
}

impl<S: GameStore> GameService<S> {
    /// The answer `user` has on record for `question`.
    pub async fn answer(
        &self,
        user: UserId,
        question: &QuestionId,
    ) -> Result<Answer, ActionError> {
        self.catalog.question(question)?;
        self.player(user).await?;
        self.call(self.store.get_or_create_answer(user, question.clone())).await
    }

    /// Submit an answer. With auto-correction on, a marked submission is
    /// graded before this returns.
    pub async fn submit_answer(
        &self,
        user: UserId,
        question_id: &QuestionId,
        submission: Submission,
    ) -> Result<Answer, ActionError> {
        let question = self.catalog.question(question_id)?;
        self.player(user).await?;
        let answer = self
            .call(self.store.get_or_create_answer(user, question_id.clone()))
            .await?;
        let submitted = engine::submit_answer(&answer, question, submission, store_timestamp())?;
        let committed = self
            .call(self.store.update_answer(Swap::new(answer, submitted)))
            .await?;
        tracing::info!(user_id = %user, question_id = %question_id, "Answer submitted");

        if !self.settings.auto_correct {
            return Ok(committed);
        }
        let Some(correction) = engine::auto_correction(&committed, store_timestamp()) else {
            return Ok(committed);
        };
        match self.auto_grade(correction).await {
            Ok(graded) => Ok(graded.answer),
            Err(err) => {
                tracing::warn!(
                    user_id = %user,
                    question_id = %question_id,
                    error = %err,
                    "Auto-correction failed; answer left pending"
                );
                Ok(committed)
            }
        }
    }

    async fn auto_grade(&self, correction: Correction) -> Result<Graded, ActionError> {
        let correction = self.call(self.store.create_correction(correction)).await?;
        tracing::debug!(
            correction_id = %correction.id,
            status = %correction.new_status,
            "Auto-correction created"
        );
        self.apply_correction(correction).await
    }

    /// Draft a correction for `user`'s answer to `question_id`.
    ///
    /// # Errors
    ///
    /// [`ActionError::NotFound`] unless the player is onboarded and has an
    /// answer on record for the question.
    pub async fn create_correction(
        &self,
        user: UserId,
        question_id: QuestionId,
        new_status: AnswerStatus,
        feedback: Option<String>,
    ) -> Result<Correction, ActionError> {
        self.catalog.question(&question_id)?;
        self.player(user).await?;
        self.call(self.store.get_answer(user, question_id.clone())).await?;
        let draft =
            engine::create_correction(user, question_id, new_status, feedback, store_timestamp())?;
        let draft = self.call(self.store.create_correction(draft)).await?;
        tracing::info!(correction_id = %draft.id, user_id = %user, "Correction drafted");
        Ok(draft)
    }

    /// Change a draft's verdict and/or feedback.
    pub async fn revise_correction(
        &self,
        id: CorrectionId,
        new_status: Option<AnswerStatus>,
        feedback: Option<String>,
    ) -> Result<Correction, ActionError> {
        let draft = self.call(self.store.get_correction(id)).await?;
        let revised = engine::revise_correction(&draft, new_status, feedback, store_timestamp())?;
        self.call(self.store.update_correction(Swap::new(draft, revised))).await
    }

    /// Finalize a draft. The commit time becomes the correction's fence.
    pub async fn finalize_correction(&self, id: CorrectionId) -> Result<Correction, ActionError> {
        let draft = self.call(self.store.get_correction(id)).await?;
        let pending = engine::finalize_correction(&draft, store_timestamp())?;
        let pending = self
            .call(self.store.update_correction(Swap::new(draft, pending)))
            .await?;
        tracing::info!(
            correction_id = %pending.id,
            fence = %pending.updated_at,
            "Correction finalized"
        );
        Ok(pending)
    }

    /// Pending corrections finalized at or before `cutoff`, oldest first.
    pub async fn due_corrections(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Correction>, ActionError> {
        self.call(self.store.pending_corrections(cutoff)).await
    }

    /// Apply a pending correction to its answer.
    ///
    /// A correction that misses the fence, finds the answer no longer
    /// pending, or targets a player, answer or question that does not exist
    /// is marked rejected and the error is returned.
    pub async fn apply_correction(&self, correction: Correction) -> Result<Graded, ActionError> {
        let (question, answer, player) = match self.correction_target(&correction).await {
            Ok(target) => target,
            Err(err @ ActionError::NotFound { .. }) => {
                self.reject(correction).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let applied = engine::apply_correction(
            &correction,
            &answer,
            question,
            &player,
            store_timestamp(),
            &mut rand::rng(),
        );
        let applied = match applied {
            Ok(applied) => applied,
            Err(err) => {
                if matches!(err.violation(), Some(Violation::AnswerNotPending { .. })) {
                    self.reject(correction).await;
                }
                return Err(err.into());
            }
        };
        if !engine::passes_fence(&correction, &answer) {
            self.reject(correction).await;
            return Err(ActionError::FenceRejected);
        }

        let fence = correction.updated_at;
        let player_swap = applied
            .player
            .as_ref()
            .map(|event| Swap::new(player, event.player.clone()));
        let outcome = self
            .call(self.store.apply_correction(
                Swap::new(correction.clone(), applied.correction),
                applied.answer,
                fence,
                player_swap,
            ))
            .await;
        let committed = match outcome {
            Ok(committed) => committed,
            Err(
                err @ (ActionError::FenceRejected
                | ActionError::RuleViolation(Violation::AnswerNotPending { .. })),
            ) => {
                self.reject(correction).await;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let user = committed.answer.user_id;
        tracing::info!(
            correction_id = %committed.correction.id,
            user_id = %user,
            status = %committed.answer.status,
            rewarded = applied.reward.is_some(),
            "Correction applied"
        );
        self.hub
            .send(
                user,
                Notification::CorrectionApplied {
                    question_id: committed.answer.question_id.clone(),
                    status: committed.answer.status,
                    feedback: committed.answer.feedback.clone(),
                    reward: applied.reward.clone(),
                },
            )
            .await;
        self.deliver(
            user,
            InboxContent::NewCorrection {
                question_id: committed.answer.question_id.clone(),
                status: committed.answer.status,
                feedback: committed.answer.feedback.clone(),
                reward: applied.reward.clone(),
            },
        )
        .await;
        if let Some(player) = committed.player {
            self.notify_player(PlayerUpdateReason::Correction, player).await;
        }
        Ok(Graded {
            correction: committed.correction,
            answer: committed.answer,
            reward: applied.reward,
        })
    }

    /// The question, answer and player a correction lands on. Never
    /// creates a row.
    async fn correction_target(
        &self,
        correction: &Correction,
    ) -> Result<(&Question, Answer, Player), ActionError> {
        let question = self.catalog.question(&correction.question_id)?;
        let player = self.player(correction.user_id).await?;
        let answer = self
            .call(
                self.store
                    .get_answer(correction.user_id, correction.question_id.clone()),
            )
            .await?;
        Ok((question, answer, player))
    }

    /// Mark `correction` rejected. A failure to do so is logged; the caller
    /// reports why the correction could not be applied.
    async fn reject(&self, correction: Correction) {
        let id = correction.id;
        let rejected = engine::reject_correction(&correction, store_timestamp());
        match self
            .call(self.store.update_correction(Swap::new(correction, rejected)))
            .await
        {
            Ok(rejected) => tracing::warn!(
                correction_id = %rejected.id,
                user_id = %rejected.user_id,
                question_id = %rejected.question_id,
                "Correction rejected"
            ),
            Err(err) => tracing::warn!(
                correction_id = %id,
                error = %err,
                "Could not mark correction rejected; it stays pending"
            ),
        }
    }

    /// Push a message to every connected user.
    pub async fn broadcast(&self, text: String) -> usize {
        self.hub.broadcast(&Notification::Broadcast { text }).await
    }
}
