//! The store contract shared by the `PostgreSQL` and in-memory backends.
//!
//! Every mutating method takes [`Swap`] values and commits them as one
//! change set: either every compare passes and every row is written, or
//! the call fails with [`StoreError::Conflict`] and nothing changes.

use std::future::Future;

use chrono::{DateTime, Utc};

use bermudia_types::{
    Answer, Correction, CorrectionId, InboxMessage, InvestmentSession, InvestmentSessionId,
    OfferScope, Player, QuestionId, TradeOffer, TradeOfferId, UserId, UserInvestment,
    UserTreasure,
};

use crate::error::StoreError;
use crate::record::Swap;

/// Rows written by a successful [`GameStore::apply_correction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedCorrection {
    /// The correction, now applied.
    pub correction: Correction,
    /// The graded answer.
    pub answer: Answer,
    /// The rewarded player, when the grade paid out.
    pub player: Option<Player>,
}

/// Persistence for the game economy.
pub trait GameStore: Send + Sync + 'static {
    // -- players --

    /// Load a player.
    fn get_player(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Player, StoreError>> + Send;

    /// Insert `fresh` unless the player already exists. Returns the stored
    /// player and whether it was created by this call.
    fn get_or_create_player(
        &self,
        fresh: Player,
    ) -> impl Future<Output = Result<(Player, bool), StoreError>> + Send;

    /// Compare-and-swap a player.
    fn update_player(
        &self,
        player: Swap<Player>,
    ) -> impl Future<Output = Result<Player, StoreError>> + Send;

    // -- treasures --

    /// Load the per-user treasure row, inserting `fresh` on first access.
    fn get_or_create_user_treasure(
        &self,
        fresh: UserTreasure,
    ) -> impl Future<Output = Result<UserTreasure, StoreError>> + Send;

    /// Commit an unlock: the treasure row and the paying player.
    fn unlock_treasure(
        &self,
        treasure: Swap<UserTreasure>,
        player: Swap<Player>,
    ) -> impl Future<Output = Result<(UserTreasure, Player), StoreError>> + Send;

    // -- market --

    /// Number of open offers posted by `user`.
    fn count_open_offers(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Load an offer, open or deleted.
    fn get_offer(
        &self,
        id: TradeOfferId,
    ) -> impl Future<Output = Result<TradeOffer, StoreError>> + Send;

    /// Open offers visible to `viewer` under `scope`, newest first.
    fn list_open_offers(
        &self,
        viewer: UserId,
        scope: OfferScope,
    ) -> impl Future<Output = Result<Vec<TradeOffer>, StoreError>> + Send;

    /// Commit a new offer together with its escrow deduction.
    fn create_offer(
        &self,
        offer: TradeOffer,
        player: Swap<Player>,
    ) -> impl Future<Output = Result<(TradeOffer, Player), StoreError>> + Send;

    /// Commit an accepted trade: the tombstone and both players.
    fn accept_offer(
        &self,
        offer: Swap<TradeOffer>,
        acceptor: Swap<Player>,
        offerer: Swap<Player>,
    ) -> impl Future<Output = Result<(TradeOffer, Player, Player), StoreError>> + Send;

    /// Commit a withdrawn offer and its refund.
    fn delete_offer(
        &self,
        offer: Swap<TradeOffer>,
        player: Swap<Player>,
    ) -> impl Future<Output = Result<(TradeOffer, Player), StoreError>> + Send;

    // -- investment --

    /// Insert a new session.
    fn create_session(
        &self,
        session: InvestmentSession,
    ) -> impl Future<Output = Result<InvestmentSession, StoreError>> + Send;

    /// Load a session.
    fn get_session(
        &self,
        id: InvestmentSessionId,
    ) -> impl Future<Output = Result<InvestmentSession, StoreError>> + Send;

    /// The unresolved session whose deadline is the nearest one after
    /// `now`, if any.
    fn active_session(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<InvestmentSession>, StoreError>> + Send;

    /// Stakes in `session`, optionally only those of `user`.
    fn investments(
        &self,
        session: InvestmentSessionId,
        user: Option<UserId>,
    ) -> impl Future<Output = Result<Vec<UserInvestment>, StoreError>> + Send;

    /// Commit a stake and its coin deduction.
    ///
    /// A second stake by the same user in the same session, or a stake in a
    /// session that has been resolved in the meantime, is a conflict.
    fn invest(
        &self,
        investment: UserInvestment,
        player: Swap<Player>,
    ) -> impl Future<Output = Result<(UserInvestment, Player), StoreError>> + Send;

    /// Commit a resolution: the session flag and every paid player.
    ///
    /// `staked` is the number of stakes the payouts were computed from. If
    /// the session holds a different number once it is flagged, a stake
    /// slipped in after the read and the call is a conflict.
    fn resolve_session(
        &self,
        session: Swap<InvestmentSession>,
        players: Vec<Swap<Player>>,
        staked: usize,
    ) -> impl Future<Output = Result<(InvestmentSession, Vec<Player>), StoreError>> + Send;

    // -- answers and corrections --

    /// Load the answer for `(user, question)`, creating an empty one on
    /// first access.
    fn get_or_create_answer(
        &self,
        user: UserId,
        question: QuestionId,
    ) -> impl Future<Output = Result<Answer, StoreError>> + Send;

    /// Load the answer for `(user, question)`. Never creates a row.
    fn get_answer(
        &self,
        user: UserId,
        question: QuestionId,
    ) -> impl Future<Output = Result<Answer, StoreError>> + Send;

    /// Every answer row of `user`.
    fn answers_of(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<Answer>, StoreError>> + Send;

    /// Compare-and-swap an answer.
    fn update_answer(
        &self,
        answer: Swap<Answer>,
    ) -> impl Future<Output = Result<Answer, StoreError>> + Send;

    /// Insert a new correction.
    fn create_correction(
        &self,
        correction: Correction,
    ) -> impl Future<Output = Result<Correction, StoreError>> + Send;

    /// Load a correction.
    fn get_correction(
        &self,
        id: CorrectionId,
    ) -> impl Future<Output = Result<Correction, StoreError>> + Send;

    /// Compare-and-swap a correction.
    fn update_correction(
        &self,
        correction: Swap<Correction>,
    ) -> impl Future<Output = Result<Correction, StoreError>> + Send;

    /// Pending corrections finalized at or before `finalized_before`,
    /// oldest first.
    fn pending_corrections(
        &self,
        finalized_before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Correction>, StoreError>> + Send;

    /// Apply a grade.
    ///
    /// Inside one change set: the stored answer must still be pending
    /// ([`StoreError::NotPending`]) and must not have been written after
    /// `fence` ([`StoreError::Fenced`]). The answer is then overwritten with
    /// `answer`, the correction swapped, and the player swapped if given.
    fn apply_correction(
        &self,
        correction: Swap<Correction>,
        answer: Answer,
        fence: DateTime<Utc>,
        player: Option<Swap<Player>>,
    ) -> impl Future<Output = Result<CommittedCorrection, StoreError>> + Send;

    // -- inbox --

    /// Persist a message for its recipient.
    fn create_message(
        &self,
        message: InboxMessage,
    ) -> impl Future<Output = Result<InboxMessage, StoreError>> + Send;

    /// Up to `limit` messages of `user` created strictly before `before`
    /// (or the newest ones), newest first.
    fn messages(
        &self,
        user: UserId,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<InboxMessage>, StoreError>> + Send;

    // -- game state --

    /// Whether the game is paused.
    fn is_paused(&self) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Pause or resume the game.
    fn set_paused(&self, paused: bool) -> impl Future<Output = Result<(), StoreError>> + Send;
}
