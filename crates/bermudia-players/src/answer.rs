//! Answer submission and the correction (grading) state machine.
//!
//! ```text
//! Answer:      Empty -> Pending -> Correct | Wrong | HalfCorrect
//!                        ^            |
//!                        +-- Wrong ---+  (only if the question is resubmittable)
//!
//! Correction:  Draft -> Pending -> Applied
//!                          |
//!                          +----> Rejected  (the answer moved on)
//! ```
//!
//! A pending correction carries a fence: the time it was finalized. It may
//! only be applied to an answer that is still pending and has not been
//! written since the fence. The store re-checks the fence atomically with
//! the write; [`passes_fence`] lets callers short-circuit before that.

use chrono::{DateTime, Utc};
use rand::Rng;

use bermudia_ledger::induct;
use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, CorrectionStatus, Cost, Player,
    PlayerUpdateEvent, PlayerUpdateReason, Question, QuestionId, UserId,
};

use crate::error::{GameError, Violation};
use crate::player::with_resources;
use crate::reward::roll_reward;

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// What a player sends for a question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// Typed answer.
    pub text: Option<String>,
    /// Name of an uploaded file.
    pub filename: Option<String>,
}

impl Submission {
    fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().is_none_or(|v| v.trim().is_empty());
        blank(&self.text) && blank(&self.filename)
    }
}

/// Move `answer` to `Pending` with the submitted content.
pub fn submit_answer(
    answer: &Answer,
    question: &Question,
    submission: Submission,
    now: DateTime<Utc>,
) -> Result<Answer, GameError> {
    match answer.status {
        AnswerStatus::Correct | AnswerStatus::HalfCorrect => {
            return Err(Violation::AlreadyAnsweredCorrectly.into());
        }
        AnswerStatus::Pending => return Err(Violation::AwaitingGrading.into()),
        AnswerStatus::Wrong if !question.resubmittable => {
            return Err(Violation::ResubmissionNotAllowed.into());
        }
        AnswerStatus::Empty | AnswerStatus::Wrong => {}
    }
    if submission.is_empty() {
        return Err(Violation::EmptySubmission.into());
    }

    Ok(Answer {
        status: AnswerStatus::Pending,
        text_content: submission.text,
        filename: submission.filename,
        feedback: None,
        submitted_at: Some(now),
        updated_at: now,
        ..answer.clone()
    })
}

// ---------------------------------------------------------------------------
// Grading decisions
// ---------------------------------------------------------------------------

fn ensure_verdict(status: AnswerStatus) -> Result<(), GameError> {
    if status.is_verdict() {
        Ok(())
    } else {
        Err(Violation::InvalidCorrectionStatus { status }.into())
    }
}

fn ensure_draft(correction: &Correction) -> Result<(), GameError> {
    if correction.status == CorrectionStatus::Draft {
        Ok(())
    } else {
        Err(Violation::CorrectionNotDraft {
            status: correction.status,
        }
        .into())
    }
}

/// Record a grader's decision as a draft.
pub fn create_correction(
    user_id: UserId,
    question_id: QuestionId,
    new_status: AnswerStatus,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> Result<Correction, GameError> {
    ensure_verdict(new_status)?;
    Ok(Correction {
        id: CorrectionId::new(),
        user_id,
        question_id,
        new_status,
        feedback,
        status: CorrectionStatus::Draft,
        updated_at: now,
    })
}

/// Change the verdict and/or feedback of a draft.
pub fn revise_correction(
    correction: &Correction,
    new_status: Option<AnswerStatus>,
    feedback: Option<String>,
    now: DateTime<Utc>,
) -> Result<Correction, GameError> {
    ensure_draft(correction)?;
    if let Some(status) = new_status {
        ensure_verdict(status)?;
    }
    Ok(Correction {
        new_status: new_status.unwrap_or(correction.new_status),
        feedback: feedback.or_else(|| correction.feedback.clone()),
        updated_at: now,
        ..correction.clone()
    })
}

/// Seal a draft. Its `updated_at` becomes the fence.
pub fn finalize_correction(
    correction: &Correction,
    now: DateTime<Utc>,
) -> Result<Correction, GameError> {
    ensure_draft(correction)?;
    if correction
        .feedback
        .as_deref()
        .is_none_or(|f| f.trim().is_empty())
    {
        return Err(Violation::MissingFeedback.into());
    }
    Ok(Correction {
        status: CorrectionStatus::Pending,
        updated_at: now,
        ..correction.clone()
    })
}

// ---------------------------------------------------------------------------
// Auto-correction
// ---------------------------------------------------------------------------

/// Verdict suggested by the trivial markers in a submission, if any.
///
/// The filename is compared lowercased, the text as written. Wrong markers
/// win over correct ones, which win over half-correct ones.
pub fn auto_verdict(answer: &Answer) -> Option<AnswerStatus> {
    let filename = answer.filename.as_deref().unwrap_or_default().to_lowercase();
    let text = answer.text_content.as_deref().unwrap_or_default();
    let marked = |word: &str, digit: &str| {
        filename.contains(word) || text.contains(word) || text.contains(digit)
    };

    if marked("false", "0") {
        Some(AnswerStatus::Wrong)
    } else if marked("true", "1") {
        Some(AnswerStatus::Correct)
    } else if marked("half", "2") {
        Some(AnswerStatus::HalfCorrect)
    } else {
        None
    }
}

fn auto_feedback(status: AnswerStatus) -> &'static str {
    match status {
        AnswerStatus::Wrong => "Think about it a little more!",
        AnswerStatus::HalfCorrect => "Almost there :)",
        _ => "Well done, on to the next question :)",
    }
}

/// A pending correction for a freshly submitted answer, when its content
/// carries a marker. The fence is `now`.
pub fn auto_correction(answer: &Answer, now: DateTime<Utc>) -> Option<Correction> {
    let verdict = auto_verdict(answer)?;
    Some(Correction {
        id: CorrectionId::new(),
        user_id: answer.user_id,
        question_id: answer.question_id.clone(),
        new_status: verdict,
        feedback: Some(auto_feedback(verdict).to_owned()),
        status: CorrectionStatus::Pending,
        updated_at: now,
    })
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Whether `answer` has not been written since `correction` was finalized.
pub fn passes_fence(correction: &Correction, answer: &Answer) -> bool {
    answer.updated_at <= correction.updated_at
}

/// Everything applying a correction changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedCorrection {
    /// The correction, now `Applied`.
    pub correction: Correction,
    /// The answer with its verdict and feedback.
    pub answer: Answer,
    /// The rewarded player, for a correct verdict on a rewarding question.
    pub player: Option<PlayerUpdateEvent>,
    /// The keys paid out, if any.
    pub reward: Option<Cost>,
}

/// Apply a pending correction to its answer.
///
/// A `Correct` verdict on a question with a reward worth rolls that worth
/// in keys for `player`. Coins are never part of a grading reward.
pub fn apply_correction<R: Rng + ?Sized>(
    correction: &Correction,
    answer: &Answer,
    question: &Question,
    player: &Player,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<AppliedCorrection, GameError> {
    if correction.status != CorrectionStatus::Pending {
        return Err(Violation::CorrectionNotPending {
            status: correction.status,
        }
        .into());
    }
    if answer.status != AnswerStatus::Pending {
        return Err(Violation::AnswerNotPending {
            status: answer.status,
        }
        .into());
    }

    let rewarded = correction.new_status == AnswerStatus::Correct && question.reward_worth > 0;
    let reward = rewarded
        .then(|| roll_reward(question.reward_worth, false, rng))
        .filter(|r| !r.is_empty());
    let player = reward.as_ref().map(|r| {
        PlayerUpdateEvent::new(
            PlayerUpdateReason::Correction,
            with_resources(player, induct(&player.resources, r)),
        )
    });

    Ok(AppliedCorrection {
        correction: Correction {
            status: CorrectionStatus::Applied,
            updated_at: now,
            ..correction.clone()
        },
        answer: Answer {
            status: correction.new_status,
            feedback: correction.feedback.clone(),
            updated_at: now,
            ..answer.clone()
        },
        player,
        reward,
    })
}

/// Terminal state for a correction that can no longer be applied.
pub fn reject_correction(correction: &Correction, now: DateTime<Utc>) -> Correction {
    Correction {
        status: CorrectionStatus::Rejected,
        updated_at: now,
        ..correction.clone()
    }
}
