//! `PostgreSQL` implementation of [`GameStore`].
//!
//! Every service instance reaches the same database and coordinates only
//! through row-level compare-and-swap. Single-record updates are
//! conditional `UPDATE`s whose `WHERE` clause carries the compare basis;
//! zero affected rows means the record moved on. Change sets run inside
//! one transaction, so the first failed compare rolls back everything
//! written before it.
//!
//! Queries are built at runtime (not compile-time checked) so no live
//! database is needed to build; every value is a bound parameter.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionId, CorrectionStatus, Entity, InboxMessage,
    InvestmentSession, InvestmentSessionId, OfferScope, Player, QuestionId, TradeOffer,
    TradeOfferId, UserId, UserInvestment, UserTreasure, store_timestamp,
};

use crate::error::StoreError;
use crate::record::{Record, Swap};
use crate::rows::{
    ANSWER_COLUMNS, AnswerRow, CORRECTION_COLUMNS, CorrectionRow, INBOX_COLUMNS, InboxRow,
    InvestmentRow, PLAYER_COLUMNS, PlayerRow, SessionRow, TRADE_OFFER_COLUMNS, TradeOfferRow,
    USER_TREASURE_COLUMNS, UserTreasureRow,
};
use crate::store::{CommittedCorrection, GameStore};

/// How long a caller waits for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections are dropped after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// `game_state` key of the pause flag.
const PAUSED_KEY: &str = "is_paused";

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A record with a conditional `UPDATE` for its compare basis.
trait PgRecord: Record {
    /// Build the update from `swap.old` to `swap.new`.
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_>;
}

/// Run a swap query, mapping zero affected rows to a conflict.
async fn compare_and_swap<R: PgRecord>(
    conn: &mut PgConnection,
    swap: &Swap<R>,
) -> Result<(), StoreError> {
    let done = R::swap_query(swap).execute(conn).await?;
    if done.rows_affected() == 0 {
        tracing::debug!(entity = %R::ENTITY, key = %swap.old.label(), "compare-and-swap lost");
        return Err(StoreError::conflict(R::ENTITY, swap.old.label()));
    }
    Ok(())
}

/// Map a unique-key violation on insert to a conflict.
fn insert_error(err: sqlx::Error, entity: Entity, key: impl ToString) -> StoreError {
    let unique = err
        .as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation);
    if unique {
        StoreError::conflict(entity, key)
    } else {
        StoreError::Postgres(err)
    }
}

fn bind_player_state<'q>(query: PgQuery<'q>, player: &'q Player) -> PgQuery<'q> {
    let r = &player.resources;
    let visited: Vec<String> = player
        .visited_territories
        .iter()
        .map(|territory| territory.as_str().to_owned())
        .collect();
    query
        .bind(player.territory.as_str())
        .bind(player.island.as_str())
        .bind(player.anchored)
        .bind(visited)
        .bind(r.fuel)
        .bind(r.fuel_cap)
        .bind(r.coin)
        .bind(r.blue_key)
        .bind(r.red_key)
        .bind(r.golden_key)
        .bind(r.master_key)
        .bind(player.updated_at)
}

impl PgRecord for Player {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        let query = sqlx::query(
            r"UPDATE players
              SET territory = $2, island = $3, anchored = $4, visited_territories = $5,
                  fuel = $6, fuel_cap = $7, coin = $8, blue_key = $9, red_key = $10,
                  golden_key = $11, master_key = $12, updated_at = $13
              WHERE user_id = $1
                AND territory = $14 AND island = $15 AND anchored = $16
                AND visited_territories = $17 AND fuel = $18 AND fuel_cap = $19 AND coin = $20
                AND blue_key = $21 AND red_key = $22 AND golden_key = $23 AND master_key = $24
                AND updated_at = $25",
        )
        .bind(swap.old.user_id.get());
        bind_player_state(bind_player_state(query, &swap.new), &swap.old)
    }
}

impl PgRecord for UserTreasure {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        sqlx::query(
            r"UPDATE user_treasures
              SET unlocked = $3, cost = $4, reward = $5, updated_at = $6
              WHERE user_id = $1 AND treasure_id = $2 AND updated_at = $7",
        )
        .bind(swap.old.user_id.get())
        .bind(swap.old.treasure_id.as_str())
        .bind(swap.new.unlocked)
        .bind(Json(&swap.new.cost))
        .bind(swap.new.reward.as_ref().map(Json))
        .bind(swap.new.updated_at)
        .bind(swap.old.updated_at)
    }
}

impl PgRecord for TradeOffer {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        sqlx::query(
            r"UPDATE trade_offers
              SET deleted_at = $2
              WHERE id = $1 AND deleted_at IS NOT DISTINCT FROM $3",
        )
        .bind(swap.old.id.into_inner())
        .bind(swap.new.deleted_at)
        .bind(swap.old.deleted_at)
    }
}

impl PgRecord for InvestmentSession {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        sqlx::query(
            r"UPDATE investment_sessions
              SET resolved = $2
              WHERE id = $1 AND resolved = $3",
        )
        .bind(swap.old.id.into_inner())
        .bind(swap.new.resolved)
        .bind(swap.old.resolved)
    }
}

impl PgRecord for Answer {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        sqlx::query(
            r"UPDATE answers
              SET status = $3, text_content = $4, filename = $5, feedback = $6,
                  submitted_at = $7, updated_at = $8
              WHERE user_id = $1 AND question_id = $2 AND updated_at = $9",
        )
        .bind(swap.old.user_id.get())
        .bind(swap.old.question_id.as_str())
        .bind(swap.new.status.as_str())
        .bind(swap.new.text_content.as_deref())
        .bind(swap.new.filename.as_deref())
        .bind(swap.new.feedback.as_deref())
        .bind(swap.new.submitted_at)
        .bind(swap.new.updated_at)
        .bind(swap.old.updated_at)
    }
}

impl PgRecord for Correction {
    fn swap_query(swap: &Swap<Self>) -> PgQuery<'_> {
        sqlx::query(
            r"UPDATE corrections
              SET new_status = $2, feedback = $3, status = $4, updated_at = $5
              WHERE id = $1 AND updated_at = $6",
        )
        .bind(swap.old.id.into_inner())
        .bind(swap.new.new_status.as_str())
        .bind(swap.new.feedback.as_deref())
        .bind(swap.new.status.as_str())
        .bind(swap.new.updated_at)
        .bind(swap.old.updated_at)
    }
}

/// Database representation of an [`OfferScope`].
const fn offer_scope_to_db(scope: OfferScope) -> &'static str {
    match scope {
        OfferScope::Mine => "mine",
        OfferScope::Others => "others",
        OfferScope::All => "all",
    }
}

/// `PostgreSQL`-backed [`GameStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database at `url` with at most `max_connections`
    /// pooled connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed and
    /// [`StoreError::Postgres`] if the connection fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options: PgConnectOptions = url
            .parse()
            .map_err(|e: sqlx::Error| StoreError::Config(format!("Invalid database URL: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(IDLE_TIMEOUT)
            .connect_with(options)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Migration`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }

    async fn load_answer(
        conn: &mut PgConnection,
        user: UserId,
        question: &QuestionId,
        lock: bool,
    ) -> Result<Option<Answer>, StoreError> {
        let sql = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE user_id = $1 AND question_id = $2{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        sqlx::query_as::<_, AnswerRow>(&sql)
            .bind(user.get())
            .bind(question.as_str())
            .fetch_optional(conn)
            .await?
            .map(Answer::try_from)
            .transpose()
    }
}

impl GameStore for PgStore {
    async fn get_player(&self, user: UserId) -> Result<Player, StoreError> {
        let sql = format!("SELECT {PLAYER_COLUMNS} FROM players WHERE user_id = $1");
        sqlx::query_as::<_, PlayerRow>(&sql)
            .bind(user.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Player::from)
            .ok_or_else(|| StoreError::not_found(Entity::Player, user))
    }

    async fn get_or_create_player(&self, fresh: Player) -> Result<(Player, bool), StoreError> {
        let sql = format!(
            "INSERT INTO players ({PLAYER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) ON CONFLICT (user_id) DO NOTHING"
        );
        let query = sqlx::query(&sql).bind(fresh.user_id.get());
        let done = bind_player_state(query, &fresh).execute(&self.pool).await?;
        let created = done.rows_affected() > 0;
        if created {
            tracing::info!(user_id = %fresh.user_id, "Player onboarded");
        }
        Ok((self.get_player(fresh.user_id).await?, created))
    }

    async fn update_player(&self, player: Swap<Player>) -> Result<Player, StoreError> {
        let mut conn = self.pool.acquire().await?;
        compare_and_swap(&mut conn, &player).await?;
        Ok(player.new)
    }

    async fn get_or_create_user_treasure(
        &self,
        fresh: UserTreasure,
    ) -> Result<UserTreasure, StoreError> {
        let sql = format!(
            "INSERT INTO user_treasures ({USER_TREASURE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (user_id, treasure_id) DO NOTHING"
        );
        sqlx::query(&sql)
            .bind(fresh.user_id.get())
            .bind(fresh.treasure_id.as_str())
            .bind(fresh.unlocked)
            .bind(Json(&fresh.cost))
            .bind(fresh.reward.as_ref().map(Json))
            .bind(fresh.updated_at)
            .execute(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {USER_TREASURE_COLUMNS} FROM user_treasures WHERE user_id = $1 AND treasure_id = $2"
        );
        sqlx::query_as::<_, UserTreasureRow>(&sql)
            .bind(fresh.user_id.get())
            .bind(fresh.treasure_id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(UserTreasure::from)
            .ok_or_else(|| StoreError::not_found(Entity::UserTreasure, fresh.label()))
    }

    async fn unlock_treasure(
        &self,
        treasure: Swap<UserTreasure>,
        player: Swap<Player>,
    ) -> Result<(UserTreasure, Player), StoreError> {
        let mut tx = self.pool.begin().await?;
        compare_and_swap(&mut tx, &treasure).await?;
        compare_and_swap(&mut tx, &player).await?;
        tx.commit().await?;
        Ok((treasure.new, player.new))
    }

    async fn count_open_offers(&self, user: UserId) -> Result<u32, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trade_offers WHERE offerer = $1 AND deleted_at IS NULL",
        )
        .bind(user.get())
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn get_offer(&self, id: TradeOfferId) -> Result<TradeOffer, StoreError> {
        let sql = format!("SELECT {TRADE_OFFER_COLUMNS} FROM trade_offers WHERE id = $1");
        sqlx::query_as::<_, TradeOfferRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?
            .map(TradeOffer::from)
            .ok_or_else(|| StoreError::not_found(Entity::TradeOffer, id))
    }

    async fn list_open_offers(
        &self,
        viewer: UserId,
        scope: OfferScope,
    ) -> Result<Vec<TradeOffer>, StoreError> {
        let sql = format!(
            r"SELECT {TRADE_OFFER_COLUMNS} FROM trade_offers
              WHERE deleted_at IS NULL
                AND ($2 = 'all' OR ($2 = 'mine' AND offerer = $1) OR ($2 = 'others' AND offerer <> $1))
              ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TradeOfferRow>(&sql)
            .bind(viewer.get())
            .bind(offer_scope_to_db(scope))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TradeOffer::from).collect())
    }

    async fn create_offer(
        &self,
        offer: TradeOffer,
        player: Swap<Player>,
    ) -> Result<(TradeOffer, Player), StoreError> {
        let mut tx = self.pool.begin().await?;
        compare_and_swap(&mut tx, &player).await?;
        let sql = format!(
            "INSERT INTO trade_offers ({TRADE_OFFER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        );
        sqlx::query(&sql)
            .bind(offer.id.into_inner())
            .bind(offer.offerer.get())
            .bind(Json(&offer.offered))
            .bind(Json(&offer.requested))
            .bind(offer.created_at)
            .bind(offer.deleted_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error(e, Entity::TradeOffer, offer.id))?;
        tx.commit().await?;
        Ok((offer, player.new))
    }

    async fn accept_offer(
        &self,
        offer: Swap<TradeOffer>,
        acceptor: Swap<Player>,
        offerer: Swap<Player>,
    ) -> Result<(TradeOffer, Player, Player), StoreError> {
        let mut tx = self.pool.begin().await?;
        compare_and_swap(&mut tx, &offer).await?;
        compare_and_swap(&mut tx, &acceptor).await?;
        compare_and_swap(&mut tx, &offerer).await?;
        tx.commit().await?;
        Ok((offer.new, acceptor.new, offerer.new))
    }

    async fn delete_offer(
        &self,
        offer: Swap<TradeOffer>,
        player: Swap<Player>,
    ) -> Result<(TradeOffer, Player), StoreError> {
        let mut tx = self.pool.begin().await?;
        compare_and_swap(&mut tx, &offer).await?;
        compare_and_swap(&mut tx, &player).await?;
        tx.commit().await?;
        Ok((offer.new, player.new))
    }

    async fn create_session(
        &self,
        session: InvestmentSession,
    ) -> Result<InvestmentSession, StoreError> {
        sqlx::query(
            "INSERT INTO investment_sessions (id, text, end_at, resolved) VALUES ($1, $2, $3, $4)",
        )
        .bind(session.id.into_inner())
        .bind(session.text.as_str())
        .bind(session.end_at)
        .bind(session.resolved)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, Entity::InvestmentSession, session.id))?;
        tracing::info!(session_id = %session.id, end_at = %session.end_at, "Investment session opened");
        Ok(session)
    }

    async fn get_session(&self, id: InvestmentSessionId) -> Result<InvestmentSession, StoreError> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT id, text, end_at, resolved FROM investment_sessions WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await?
        .map(InvestmentSession::from)
        .ok_or_else(|| StoreError::not_found(Entity::InvestmentSession, id))
    }

    async fn active_session(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<InvestmentSession>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"SELECT id, text, end_at, resolved FROM investment_sessions
              WHERE NOT resolved AND end_at > $1
              ORDER BY end_at ASC
              LIMIT 1",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(InvestmentSession::from))
    }

    async fn investments(
        &self,
        session: InvestmentSessionId,
        user: Option<UserId>,
    ) -> Result<Vec<UserInvestment>, StoreError> {
        let rows = sqlx::query_as::<_, InvestmentRow>(
            r"SELECT session_id, user_id, coin FROM user_investments
              WHERE session_id = $1 AND ($2::INTEGER IS NULL OR user_id = $2)
              ORDER BY user_id",
        )
        .bind(session.into_inner())
        .bind(user.map(UserId::get))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserInvestment::from).collect())
    }

    async fn invest(
        &self,
        investment: UserInvestment,
        player: Swap<Player>,
    ) -> Result<(UserInvestment, Player), StoreError> {
        let key = format!("{}/{}", investment.session_id, investment.user_id);
        let mut tx = self.pool.begin().await?;
        // Holds off a concurrent resolution until this stake commits.
        let open = sqlx::query(
            "SELECT 1 FROM investment_sessions WHERE id = $1 AND NOT resolved FOR SHARE",
        )
        .bind(investment.session_id.into_inner())
        .fetch_optional(&mut *tx)
        .await?;
        if open.is_none() {
            return Err(StoreError::conflict(
                Entity::InvestmentSession,
                investment.session_id,
            ));
        }
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_investments WHERE session_id = $1 AND user_id = $2)",
        )
        .bind(investment.session_id.into_inner())
        .bind(investment.user_id.get())
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(StoreError::conflict(Entity::UserInvestment, key));
        }
        compare_and_swap(&mut tx, &player).await?;
        sqlx::query("INSERT INTO user_investments (session_id, user_id, coin) VALUES ($1, $2, $3)")
            .bind(investment.session_id.into_inner())
            .bind(investment.user_id.get())
            .bind(investment.coin)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_error(e, Entity::UserInvestment, key))?;
        tx.commit().await?;
        Ok((investment, player.new))
    }

    async fn resolve_session(
        &self,
        session: Swap<InvestmentSession>,
        players: Vec<Swap<Player>>,
        staked: usize,
    ) -> Result<(InvestmentSession, Vec<Player>), StoreError> {
        let mut tx = self.pool.begin().await?;
        compare_and_swap(&mut tx, &session).await?;
        let stored: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_investments WHERE session_id = $1")
                .bind(session.old.id.into_inner())
                .fetch_one(&mut *tx)
                .await?;
        if usize::try_from(stored).ok() != Some(staked) {
            return Err(StoreError::conflict(Entity::UserInvestment, session.old.id));
        }
        for swap in &players {
            compare_and_swap(&mut tx, swap).await?;
        }
        tx.commit().await?;
        tracing::info!(session_id = %session.new.id, paid = players.len(), "Investment session resolved");
        Ok((session.new, players.into_iter().map(|swap| swap.new).collect()))
    }

    async fn get_or_create_answer(
        &self,
        user: UserId,
        question: QuestionId,
    ) -> Result<Answer, StoreError> {
        let fresh = Answer::empty(user, question, store_timestamp());
        let sql = format!(
            "INSERT INTO answers ({ANSWER_COLUMNS}) VALUES ($1, $2, $3, NULL, NULL, NULL, NULL, $4) ON CONFLICT (user_id, question_id) DO NOTHING"
        );
        sqlx::query(&sql)
            .bind(user.get())
            .bind(fresh.question_id.as_str())
            .bind(AnswerStatus::Empty.as_str())
            .bind(fresh.updated_at)
            .execute(&self.pool)
            .await?;

        let mut conn = self.pool.acquire().await?;
        Self::load_answer(&mut conn, user, &fresh.question_id, false)
            .await?
            .ok_or_else(|| StoreError::not_found(Entity::Answer, fresh.label()))
    }

    async fn get_answer(&self, user: UserId, question: QuestionId) -> Result<Answer, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Self::load_answer(&mut conn, user, &question, false)
            .await?
            .ok_or_else(|| StoreError::not_found(Entity::Answer, format!("{user}/{question}")))
    }

    async fn answers_of(&self, user: UserId) -> Result<Vec<Answer>, StoreError> {
        let sql = format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE user_id = $1");
        let rows = sqlx::query_as::<_, AnswerRow>(&sql)
            .bind(user.get())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Answer::try_from).collect()
    }

    async fn update_answer(&self, answer: Swap<Answer>) -> Result<Answer, StoreError> {
        let mut conn = self.pool.acquire().await?;
        compare_and_swap(&mut conn, &answer).await?;
        Ok(answer.new)
    }

    async fn create_correction(&self, correction: Correction) -> Result<Correction, StoreError> {
        let sql = format!(
            "INSERT INTO corrections ({CORRECTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        sqlx::query(&sql)
            .bind(correction.id.into_inner())
            .bind(correction.user_id.get())
            .bind(correction.question_id.as_str())
            .bind(correction.new_status.as_str())
            .bind(correction.feedback.as_deref())
            .bind(correction.status.as_str())
            .bind(correction.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, Entity::Correction, correction.id))?;
        Ok(correction)
    }

    async fn get_correction(&self, id: CorrectionId) -> Result<Correction, StoreError> {
        let sql = format!("SELECT {CORRECTION_COLUMNS} FROM corrections WHERE id = $1");
        sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await?
            .map(Correction::try_from)
            .transpose()?
            .ok_or_else(|| StoreError::not_found(Entity::Correction, id))
    }

    async fn update_correction(
        &self,
        correction: Swap<Correction>,
    ) -> Result<Correction, StoreError> {
        let mut conn = self.pool.acquire().await?;
        compare_and_swap(&mut conn, &correction).await?;
        Ok(correction.new)
    }

    async fn pending_corrections(
        &self,
        finalized_before: DateTime<Utc>,
    ) -> Result<Vec<Correction>, StoreError> {
        let sql = format!(
            r"SELECT {CORRECTION_COLUMNS} FROM corrections
              WHERE status = $1 AND updated_at <= $2
              ORDER BY updated_at"
        );
        let rows = sqlx::query_as::<_, CorrectionRow>(&sql)
            .bind(CorrectionStatus::Pending.as_str())
            .bind(finalized_before)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Correction::try_from).collect()
    }

    async fn apply_correction(
        &self,
        correction: Swap<Correction>,
        answer: Answer,
        fence: DateTime<Utc>,
        player: Option<Swap<Player>>,
    ) -> Result<CommittedCorrection, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stored = Self::load_answer(&mut tx, answer.user_id, &answer.question_id, true)
            .await?
            .ok_or_else(|| StoreError::not_found(Entity::Answer, answer.label()))?;
        if stored.status != AnswerStatus::Pending {
            return Err(StoreError::NotPending {
                status: stored.status,
            });
        }
        if stored.updated_at > fence {
            return Err(StoreError::Fenced);
        }

        compare_and_swap(&mut tx, &correction).await?;
        if let Some(swap) = &player {
            compare_and_swap(&mut tx, swap).await?;
        }
        let answer_swap = Swap::new(stored, answer);
        compare_and_swap(&mut tx, &answer_swap).await?;
        tx.commit().await?;

        Ok(CommittedCorrection {
            correction: correction.new,
            answer: answer_swap.new,
            player: player.map(|swap| swap.new),
        })
    }

    async fn create_message(&self, message: InboxMessage) -> Result<InboxMessage, StoreError> {
        let sql = format!("INSERT INTO inbox_messages ({INBOX_COLUMNS}) VALUES ($1, $2, $3, $4)");
        sqlx::query(&sql)
            .bind(message.id.into_inner())
            .bind(message.user_id.get())
            .bind(Json(&message.content))
            .bind(message.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, Entity::InboxMessage, message.id))?;
        Ok(message)
    }

    async fn messages(
        &self,
        user: UserId,
        before: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<InboxMessage>, StoreError> {
        let sql = format!(
            r"SELECT {INBOX_COLUMNS} FROM inbox_messages
              WHERE user_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at < $2)
              ORDER BY created_at DESC, id DESC
              LIMIT $3"
        );
        let rows = sqlx::query_as::<_, InboxRow>(&sql)
            .bind(user.get())
            .bind(before)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(InboxMessage::from).collect())
    }

    async fn is_paused(&self) -> Result<bool, StoreError> {
        let value: Option<Json<bool>> =
            sqlx::query_scalar("SELECT value FROM game_state WHERE key = $1")
                .bind(PAUSED_KEY)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.is_some_and(|flag| flag.0))
    }

    async fn set_paused(&self, paused: bool) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO game_state (key, value) VALUES ($1, $2)
              ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(PAUSED_KEY)
        .bind(Json(paused))
        .execute(&self.pool)
        .await?;
        tracing::info!(paused, "Game pause flag set");
        Ok(())
    }
}
