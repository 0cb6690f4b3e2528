//! Concurrency and change-set tests for the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::arithmetic_side_effects)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use bermudia_db::{GameStore, MemoryStore, StoreError, Swap, with_deadline};
use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, CorrectionStatus, Entity, InboxContent,
    InboxMessage, InboxMessageId, InvestmentSession, InvestmentSessionId, IslandId, Player,
    QuestionId, ResourceVector, TerritoryId, UserId, UserInvestment, store_timestamp,
};

fn player(user: i32, coin: i32) -> Player {
    Player {
        user_id: UserId(user),
        territory: TerritoryId::new("bermuda"),
        island: IslandId::new("a"),
        anchored: true,
        visited_territories: vec![TerritoryId::new("bermuda")],
        resources: ResourceVector {
            fuel: 15,
            fuel_cap: 15,
            coin,
            ..ResourceVector::default()
        },
        updated_at: store_timestamp(),
    }
}

#[tokio::test]
async fn concurrent_swaps_from_one_snapshot_have_one_winner() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(1)));
    let (snapshot, _) = store.get_or_create_player(player(1, 100)).await.unwrap();

    let attempts = (0..16).map(|i| {
        let store = Arc::clone(&store);
        let old = snapshot.clone();
        tokio::spawn(async move {
            let mut new = old.clone();
            new.resources.coin = old.resources.coin - i - 1;
            store.update_player(Swap::new(old, new)).await
        })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let winners: Vec<&Player> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::Conflict { .. }) && e.is_retryable())
    );

    let stored = store.get_player(UserId(1)).await.unwrap();
    assert_eq!(&&stored, winners.first().unwrap());
}

#[tokio::test]
async fn unrelated_players_do_not_conflict() {
    let store = Arc::new(MemoryStore::new());
    let mut handles = Vec::new();
    for user in 1..=8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let (old, _) = store.get_or_create_player(player(user, 50)).await?;
            let mut new = old.clone();
            new.resources.coin += 1;
            store.update_player(Swap::new(old, new)).await
        }));
    }
    for handle in handles {
        let updated = handle.await.unwrap().unwrap();
        assert_eq!(updated.resources.coin, 51);
    }
}

#[tokio::test]
async fn slow_store_hits_the_deadline() {
    let store = MemoryStore::new().with_latency(Duration::from_millis(200));
    let err = with_deadline(Duration::from_millis(10), store.get_player(UserId(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Timeout { .. }));
}

async fn pending_answer(store: &MemoryStore, user: UserId, question: &QuestionId) -> Answer {
    let empty = store.get_or_create_answer(user, question.clone()).await.unwrap();
    let mut submitted = empty.clone();
    submitted.status = AnswerStatus::Pending;
    submitted.text_content = Some(String::from("the tide"));
    submitted.submitted_at = Some(store_timestamp());
    store.update_answer(Swap::new(empty, submitted)).await.unwrap()
}

fn finalized(user: UserId, question: &QuestionId) -> Correction {
    Correction {
        id: CorrectionId::new(),
        user_id: user,
        question_id: question.clone(),
        new_status: AnswerStatus::Correct,
        feedback: Some(String::from("well done")),
        status: CorrectionStatus::Pending,
        updated_at: store_timestamp(),
    }
}

#[tokio::test]
async fn correction_applies_when_the_answer_predates_the_fence() {
    let store = MemoryStore::new();
    let user = UserId(1);
    let question = QuestionId::new("q1");
    let answer = pending_answer(&store, user, &question).await;
    tokio::time::sleep(Duration::from_millis(2)).await;
    let correction = store.create_correction(finalized(user, &question)).await.unwrap();

    let mut graded = answer;
    graded.status = AnswerStatus::Correct;
    graded.feedback = correction.feedback.clone();
    let mut applied = correction.clone();
    applied.status = CorrectionStatus::Applied;

    let committed = store
        .apply_correction(
            Swap::new(correction.clone(), applied),
            graded,
            correction.updated_at,
            None,
        )
        .await
        .unwrap();
    assert_eq!(committed.answer.status, AnswerStatus::Correct);
    assert_eq!(committed.correction.status, CorrectionStatus::Applied);
    assert!(committed.player.is_none());
}

#[tokio::test]
async fn resubmission_after_the_fence_is_rejected() {
    let store = MemoryStore::new();
    let user = UserId(2);
    let question = QuestionId::new("q1");
    let correction = store.create_correction(finalized(user, &question)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    let answer = pending_answer(&store, user, &question).await;

    let mut graded = answer.clone();
    graded.status = AnswerStatus::Correct;
    let mut applied = correction.clone();
    applied.status = CorrectionStatus::Applied;

    let err = store
        .apply_correction(
            Swap::new(correction.clone(), applied),
            graded,
            correction.updated_at,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Fenced));

    let untouched = store.get_or_create_answer(user, question).await.unwrap();
    assert_eq!(untouched, answer);
    assert_eq!(
        store.get_correction(correction.id).await.unwrap().status,
        CorrectionStatus::Pending
    );
}

#[tokio::test]
async fn graded_answers_are_not_regraded() {
    let store = MemoryStore::new();
    let user = UserId(3);
    let question = QuestionId::new("q2");
    let answer = store.get_or_create_answer(user, question.clone()).await.unwrap();
    let correction = store.create_correction(finalized(user, &question)).await.unwrap();
    let mut applied = correction.clone();
    applied.status = CorrectionStatus::Applied;

    let err = store
        .apply_correction(
            Swap::new(correction.clone(), applied),
            answer,
            correction.updated_at,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotPending {
            status: AnswerStatus::Empty
        }
    ));
}

#[tokio::test]
async fn pending_corrections_respect_the_delay() {
    let store = MemoryStore::new();
    let question = QuestionId::new("q1");
    let early = store.create_correction(finalized(UserId(1), &question)).await.unwrap();
    let cutoff = store_timestamp();
    tokio::time::sleep(Duration::from_millis(2)).await;
    store.create_correction(finalized(UserId(2), &question)).await.unwrap();

    let mut draft = finalized(UserId(3), &question);
    draft.status = CorrectionStatus::Draft;
    draft.updated_at = early.updated_at;
    store.create_correction(draft).await.unwrap();

    let due = store.pending_corrections(cutoff).await.unwrap();
    assert_eq!(due, vec![early]);
}

fn session(end_at: DateTime<Utc>) -> InvestmentSession {
    InvestmentSession {
        id: InvestmentSessionId::new(),
        text: String::from("Will the storm pass?"),
        end_at,
        resolved: false,
    }
}

fn stake(session: &InvestmentSession, user: UserId, coin: i32) -> UserInvestment {
    UserInvestment {
        session_id: session.id,
        user_id: user,
        coin,
    }
}

fn paying(p: &Player, coin: i32) -> Swap<Player> {
    let mut paid = p.clone();
    paid.resources.coin -= coin;
    Swap::new(p.clone(), paid)
}

fn flagged(session: &InvestmentSession) -> Swap<InvestmentSession> {
    let mut resolved = session.clone();
    resolved.resolved = true;
    Swap::new(session.clone(), resolved)
}

#[tokio::test]
async fn stake_after_resolution_conflicts_and_keeps_the_coins() {
    let store = MemoryStore::new();
    let (p, _) = store.get_or_create_player(player(1, 100)).await.unwrap();
    let open = store.create_session(session(store_timestamp())).await.unwrap();
    store.resolve_session(flagged(&open), Vec::new(), 0).await.unwrap();

    let err = store
        .invest(stake(&open, p.user_id, 10), paying(&p, 10))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict {
            entity: Entity::InvestmentSession,
            ..
        }
    ));
    assert_eq!(store.get_player(p.user_id).await.unwrap().resources.coin, 100);
    assert!(store.investments(open.id, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn resolution_with_a_stale_stake_count_conflicts() {
    let store = MemoryStore::new();
    let (p, _) = store.get_or_create_player(player(1, 100)).await.unwrap();
    let open = store
        .create_session(session(store_timestamp() + chrono::Duration::minutes(5)))
        .await
        .unwrap();
    let seen = store.investments(open.id, None).await.unwrap();
    store
        .invest(stake(&open, p.user_id, 10), paying(&p, 10))
        .await
        .unwrap();

    let err = store
        .resolve_session(flagged(&open), Vec::new(), seen.len())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Conflict {
            entity: Entity::UserInvestment,
            ..
        }
    ));
    assert!(!store.get_session(open.id).await.unwrap().resolved);
}

#[tokio::test]
async fn stakes_racing_resolution_never_lose_coins() {
    for _ in 0..20 {
        let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(1)));
        let (p, _) = store.get_or_create_player(player(1, 100)).await.unwrap();
        let open = store
            .create_session(session(store_timestamp() + chrono::Duration::minutes(5)))
            .await
            .unwrap();

        let investing = {
            let store = Arc::clone(&store);
            let stake = stake(&open, p.user_id, 10);
            let swap = paying(&p, 10);
            tokio::spawn(async move { store.invest(stake, swap).await })
        };
        let resolving = {
            let store = Arc::clone(&store);
            let swap = flagged(&open);
            tokio::spawn(async move { store.resolve_session(swap, Vec::new(), 0).await })
        };
        let invested = investing.await.unwrap();
        let resolved = resolving.await.unwrap();

        // Exactly one side commits: a stake either counts toward the
        // resolution or never leaves the wallet.
        assert_ne!(invested.is_ok(), resolved.is_ok());
        let coin = store.get_player(p.user_id).await.unwrap().resources.coin;
        if invested.is_ok() {
            assert_eq!(coin, 90);
            assert!(!store.get_session(open.id).await.unwrap().resolved);
        } else {
            assert_eq!(coin, 100);
            assert!(store.get_session(open.id).await.unwrap().resolved);
        }
    }
}

#[tokio::test]
async fn active_session_is_the_nearest_open_deadline() {
    let store = MemoryStore::new();
    let now = store_timestamp();
    let minutes = chrono::Duration::minutes;

    store.create_session(session(now - minutes(1))).await.unwrap();
    let far = store.create_session(session(now + minutes(30))).await.unwrap();
    let near = store.create_session(session(now + minutes(5))).await.unwrap();
    let mut closed = session(now + minutes(2));
    closed.resolved = true;
    store.create_session(closed).await.unwrap();

    assert_eq!(store.active_session(now).await.unwrap(), Some(near.clone()));
    assert_eq!(store.active_session(near.end_at).await.unwrap(), Some(far.clone()));
    assert_eq!(store.active_session(far.end_at).await.unwrap(), None);
}

#[tokio::test]
async fn get_answer_never_creates_a_row() {
    let store = MemoryStore::new();
    let user = UserId(4);
    let question = QuestionId::new("q1");
    let err = store.get_answer(user, question.clone()).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: Entity::Answer,
            ..
        }
    ));
    assert!(store.answers_of(user).await.unwrap().is_empty());

    let answer = pending_answer(&store, user, &question).await;
    assert_eq!(store.get_answer(user, question).await.unwrap(), answer);
    assert_eq!(store.answers_of(user).await.unwrap(), vec![answer]);
}

fn correction_note(user: UserId, at: DateTime<Utc>) -> InboxMessage {
    InboxMessage {
        id: InboxMessageId::new(),
        user_id: user,
        content: InboxContent::NewCorrection {
            question_id: QuestionId::new("q1"),
            status: AnswerStatus::Correct,
            feedback: None,
            reward: None,
        },
        created_at: at,
    }
}

#[tokio::test]
async fn inbox_pages_newest_first() {
    let store = MemoryStore::new();
    let user = UserId(1);
    store.get_or_create_player(player(1, 0)).await.unwrap();
    store.get_or_create_player(player(2, 0)).await.unwrap();
    let t0 = store_timestamp();
    let seconds = chrono::Duration::seconds;
    let oldest = store.create_message(correction_note(user, t0)).await.unwrap();
    let middle = store.create_message(correction_note(user, t0 + seconds(1))).await.unwrap();
    let newest = store.create_message(correction_note(user, t0 + seconds(2))).await.unwrap();
    store
        .create_message(correction_note(UserId(2), t0 + seconds(3)))
        .await
        .unwrap();

    let page = store.messages(user, None, 2).await.unwrap();
    assert_eq!(page, vec![newest, middle.clone()]);
    let next = store.messages(user, Some(middle.created_at), 2).await.unwrap();
    assert_eq!(next, vec![oldest]);
}

#[tokio::test]
async fn inbox_rejects_unknown_recipients() {
    let store = MemoryStore::new();
    let err = store
        .create_message(correction_note(UserId(9), store_timestamp()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: Entity::Player,
            ..
        }
    ));
}

#[tokio::test]
async fn pause_flag_round_trips() {
    let store = MemoryStore::new();
    assert!(!store.is_paused().await.unwrap());
    store.set_paused(true).await.unwrap();
    assert!(store.is_paused().await.unwrap());
    store.set_paused(false).await.unwrap();
    assert!(!store.is_paused().await.unwrap());
}
