//! In-memory [`GameStore`] for tests and database-free development.
//!
//! All tables sit behind a single mutex, so a change set is checked and
//! written inside one critical section. An optional latency is awaited
//! before every call to exercise deadlines.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, CorrectionStatus, Entity, InboxMessage,
    InvestmentSession, InvestmentSessionId, OfferScope, Player, QuestionId, TradeOffer,
    TradeOfferId, UserId, UserInvestment, UserTreasure, store_timestamp,
};

use crate::error::StoreError;
use crate::record::{Record, Swap};
use crate::store::{CommittedCorrection, GameStore};

/// Rows of one record type, keyed by primary key.
#[derive(Debug)]
struct CasTable<R: Record> {
    rows: BTreeMap<R::Key, R>,
}

impl<R: Record> Default for CasTable<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<R: Record> CasTable<R> {
    fn load(&self, key: &R::Key, label: impl ToString) -> Result<R, StoreError> {
        self.rows
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(R::ENTITY, label))
    }

    fn check(&self, swap: &Swap<R>) -> Result<(), StoreError> {
        match self.rows.get(&swap.key()) {
            Some(stored) if swap.old.same_version(stored) => Ok(()),
            Some(_) => {
                tracing::debug!(entity = %R::ENTITY, key = %swap.old.label(), "compare-and-swap lost");
                Err(StoreError::conflict(R::ENTITY, swap.old.label()))
            }
            None => Err(StoreError::not_found(R::ENTITY, swap.old.label())),
        }
    }

    fn commit(&mut self, swap: Swap<R>) -> R {
        self.rows.insert(swap.new.key(), swap.new.clone());
        swap.new
    }

    fn insert(&mut self, row: R) -> Result<R, StoreError> {
        if self.rows.contains_key(&row.key()) {
            return Err(StoreError::conflict(R::ENTITY, row.label()));
        }
        self.rows.insert(row.key(), row.clone());
        Ok(row)
    }

    fn get_or_insert(&mut self, row: R) -> (R, bool) {
        match self.rows.get(&row.key()) {
            Some(stored) => (stored.clone(), false),
            None => {
                self.rows.insert(row.key(), row.clone());
                (row, true)
            }
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    players: CasTable<Player>,
    user_treasures: CasTable<UserTreasure>,
    offers: CasTable<TradeOffer>,
    sessions: CasTable<InvestmentSession>,
    investments: Vec<UserInvestment>,
    answers: CasTable<Answer>,
    corrections: CasTable<Correction>,
    inbox: Vec<InboxMessage>,
    paused: bool,
}

/// In-memory store with the same change-set semantics as the `PostgreSQL`
/// backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    latency: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    // A poisoned lock still guards consistent data: every change set is
    // checked in full before the first write.
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GameStore for MemoryStore {
    async fn get_player(&self, user: UserId) -> Result<Player, StoreError> {
        self.pause().await;
        self.tables().players.load(&user, user)
    }

    async fn get_or_create_player(&self, fresh: Player) -> Result<(Player, bool), StoreError> {
        self.pause().await;
        Ok(self.tables().players.get_or_insert(fresh))
    }

    async fn update_player(&self, player: Swap<Player>) -> Result<Player, StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.players.check(&player)?;
        Ok(tables.players.commit(player))
    }

    async fn get_or_create_user_treasure(
        &self,
        fresh: UserTreasure,
    ) -> Result<UserTreasure, StoreError> {
        self.pause().await;
        Ok(self.tables().user_treasures.get_or_insert(fresh).0)
    }

    async fn unlock_treasure(
        &self,
        treasure: Swap<UserTreasure>,
        player: Swap<Player>,
    ) -> Result<(UserTreasure, Player), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.user_treasures.check(&treasure)?;
        tables.players.check(&player)?;
        Ok((
            tables.user_treasures.commit(treasure),
            tables.players.commit(player),
        ))
    }

    async fn count_open_offers(&self, user: UserId) -> Result<u32, StoreError> {
        self.pause().await;
        let count = self
            .tables()
            .offers
            .rows
            .values()
            .filter(|offer| offer.offerer == user && offer.is_open())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn get_offer(&self, id: TradeOfferId) -> Result<TradeOffer, StoreError> {
        self.pause().await;
        self.tables().offers.load(&id, id)
    }

    async fn list_open_offers(
        &self,
        viewer: UserId,
        scope: OfferScope,
    ) -> Result<Vec<TradeOffer>, StoreError> {
        self.pause().await;
        let mut offers: Vec<TradeOffer> = self
            .tables()
            .offers
            .rows
            .values()
            .filter(|offer| offer.is_open())
            .filter(|offer| match scope {
                OfferScope::Mine => offer.offerer == viewer,
                OfferScope::Others => offer.offerer != viewer,
                OfferScope::All => true,
            })
            .cloned()
            .collect();
        offers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(offers)
    }

    async fn create_offer(
        &self,
        offer: TradeOffer,
        player: Swap<Player>,
    ) -> Result<(TradeOffer, Player), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.players.check(&player)?;
        let offer = tables.offers.insert(offer)?;
        Ok((offer, tables.players.commit(player)))
    }

    async fn accept_offer(
        &self,
        offer: Swap<TradeOffer>,
        acceptor: Swap<Player>,
        offerer: Swap<Player>,
    ) -> Result<(TradeOffer, Player, Player), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.offers.check(&offer)?;
        tables.players.check(&acceptor)?;
        tables.players.check(&offerer)?;
        Ok((
            tables.offers.commit(offer),
            tables.players.commit(acceptor),
            tables.players.commit(offerer),
        ))
    }

    async fn delete_offer(
        &self,
        offer: Swap<TradeOffer>,
        player: Swap<Player>,
    ) -> Result<(TradeOffer, Player), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.offers.check(&offer)?;
        tables.players.check(&player)?;
        Ok((tables.offers.commit(offer), tables.players.commit(player)))
    }

    async fn create_session(
        &self,
        session: InvestmentSession,
    ) -> Result<InvestmentSession, StoreError> {
        self.pause().await;
        self.tables().sessions.insert(session)
    }

    async fn get_session(&self, id: InvestmentSessionId) -> Result<InvestmentSession, StoreError> {
        self.pause().await;
        self.tables().sessions.load(&id, id)
    }

    async fn active_session(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<InvestmentSession>, StoreError> {
        self.pause().await;
        Ok(self
            .tables()
            .sessions
            .rows
            .values()
            .filter(|session| !session.resolved && session.end_at > now)
            .min_by_key(|session| session.end_at)
            .cloned())
    }

    async fn investments(
        &self,
        session: InvestmentSessionId,
        user: Option<UserId>,
    ) -> Result<Vec<UserInvestment>, StoreError> {
        self.pause().await;
        Ok(self
            .tables()
            .investments
            .iter()
            .filter(|inv| inv.session_id == session)
            .filter(|inv| user.is_none_or(|user| inv.user_id == user))
            .cloned()
            .collect())
    }

    async fn invest(
        &self,
        investment: UserInvestment,
        player: Swap<Player>,
    ) -> Result<(UserInvestment, Player), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        let session = tables
            .sessions
            .load(&investment.session_id, investment.session_id)?;
        if session.resolved {
            return Err(StoreError::conflict(Entity::InvestmentSession, session.id));
        }
        let taken = tables.investments.iter().any(|inv| {
            inv.session_id == investment.session_id && inv.user_id == investment.user_id
        });
        if taken {
            return Err(StoreError::conflict(
                Entity::UserInvestment,
                format!("{}/{}", investment.session_id, investment.user_id),
            ));
        }
        tables.players.check(&player)?;
        tables.investments.push(investment.clone());
        Ok((investment, tables.players.commit(player)))
    }

    async fn resolve_session(
        &self,
        session: Swap<InvestmentSession>,
        players: Vec<Swap<Player>>,
        staked: usize,
    ) -> Result<(InvestmentSession, Vec<Player>), StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.sessions.check(&session)?;
        let stored = tables
            .investments
            .iter()
            .filter(|inv| inv.session_id == session.key())
            .count();
        if stored != staked {
            return Err(StoreError::conflict(Entity::UserInvestment, session.old.label()));
        }
        let mut seen = BTreeSet::new();
        for swap in &players {
            if !seen.insert(swap.key()) {
                return Err(StoreError::conflict(Entity::Player, swap.old.label()));
            }
            tables.players.check(swap)?;
        }
        let session = tables.sessions.commit(session);
        let players = players
            .into_iter()
            .map(|swap| tables.players.commit(swap))
            .collect();
        Ok((session, players))
    }

    async fn get_or_create_answer(
        &self,
        user: UserId,
        question: QuestionId,
    ) -> Result<Answer, StoreError> {
        self.pause().await;
        let fresh = Answer::empty(user, question, store_timestamp());
        Ok(self.tables().answers.get_or_insert(fresh).0)
    }

    async fn get_answer(&self, user: UserId, question: QuestionId) -> Result<Answer, StoreError> {
        self.pause().await;
        let label = format!("{user}/{question}");
        self.tables().answers.load(&(user, question), label)
    }

    async fn answers_of(&self, user: UserId) -> Result<Vec<Answer>, StoreError> {
        self.pause().await;
        Ok(self
            .tables()
            .answers
            .rows
            .values()
            .filter(|answer| answer.user_id == user)
            .cloned()
            .collect())
    }

    async fn update_answer(&self, answer: Swap<Answer>) -> Result<Answer, StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.answers.check(&answer)?;
        Ok(tables.answers.commit(answer))
    }

    async fn create_correction(&self, correction: Correction) -> Result<Correction, StoreError> {
        self.pause().await;
        self.tables().corrections.insert(correction)
    }

    async fn get_correction(&self, id: CorrectionId) -> Result<Correction, StoreError> {
        self.pause().await;
        self.tables().corrections.load(&id, id)
    }

    async fn update_correction(
        &self,
        correction: Swap<Correction>,
    ) -> Result<Correction, StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.corrections.check(&correction)?;
        Ok(tables.corrections.commit(correction))
    }

    async fn pending_corrections(
        &self,
        finalized_before: DateTime<Utc>,
    ) -> Result<Vec<Correction>, StoreError> {
        self.pause().await;
        let mut pending: Vec<Correction> = self
            .tables()
            .corrections
            .rows
            .values()
            .filter(|c| c.status == CorrectionStatus::Pending && c.updated_at <= finalized_before)
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.updated_at);
        Ok(pending)
    }

    async fn apply_correction(
        &self,
        correction: Swap<Correction>,
        mut answer: Answer,
        fence: DateTime<Utc>,
        player: Option<Swap<Player>>,
    ) -> Result<CommittedCorrection, StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        let stored = tables.answers.load(&answer.key(), answer.label())?;
        if stored.status != AnswerStatus::Pending {
            return Err(StoreError::NotPending {
                status: stored.status,
            });
        }
        if stored.updated_at > fence {
            return Err(StoreError::Fenced);
        }
        tables.corrections.check(&correction)?;
        if let Some(swap) = &player {
            tables.players.check(swap)?;
        }

        answer.touch(store_timestamp());
        tables.answers.rows.insert(answer.key(), answer.clone());
        Ok(CommittedCorrection {
            correction: tables.corrections.commit(correction),
            answer,
            player: player.map(|swap| tables.players.commit(swap)),
        })
    }

    async fn create_message(&self, message: InboxMessage) -> Result<InboxMessage, StoreError> {
        self.pause().await;
        let mut tables = self.tables();
        tables.players.load(&message.user_id, message.user_id)?;
        if tables.inbox.iter().any(|stored| stored.id == message.id) {
            return Err(StoreError::conflict(Entity::InboxMessage, message.id));
        }
        tables.inbox.push(message.clone());
        Ok(message)
    }

    async fn messages(
        &self,
        user: UserId,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<InboxMessage>, StoreError> {
        self.pause().await;
        let mut messages: Vec<InboxMessage> = self
            .tables()
            .inbox
            .iter()
            .filter(|msg| msg.user_id == user)
            .filter(|msg| before.is_none_or(|before| msg.created_at < before))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        messages.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(messages)
    }

    async fn is_paused(&self) -> Result<bool, StoreError> {
        self.pause().await;
        Ok(self.tables().paused)
    }

    async fn set_paused(&self, paused: bool) -> Result<(), StoreError> {
        self.pause().await;
        self.tables().paused = paused;
        Ok(())
    }
}
