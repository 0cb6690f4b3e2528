//! Row types returned by `PostgreSQL` queries, and their conversion into
//! domain records.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use bermudia_types::{
    Answer, AnswerStatus, Correction, CorrectionStatus, Cost, InboxContent, InboxMessage,
    InvestmentSession, IslandId, Player, QuestionId, ResourceVector, TerritoryId, TradeOffer,
    TreasureId, UserId, UserInvestment, UserTreasure,
};

use crate::error::StoreError;

/// Column list matching [`PlayerRow`].
pub(crate) const PLAYER_COLUMNS: &str = "user_id, territory, island, anchored, visited_territories, fuel, fuel_cap, coin, blue_key, red_key, golden_key, master_key, updated_at";

/// Column list matching [`UserTreasureRow`].
pub(crate) const USER_TREASURE_COLUMNS: &str =
    "user_id, treasure_id, unlocked, cost, reward, updated_at";

/// Column list matching [`TradeOfferRow`].
pub(crate) const TRADE_OFFER_COLUMNS: &str =
    "id, offerer, offered, requested, created_at, deleted_at";

/// Column list matching [`AnswerRow`].
pub(crate) const ANSWER_COLUMNS: &str =
    "user_id, question_id, status, text_content, filename, feedback, submitted_at, updated_at";

/// Column list matching [`CorrectionRow`].
pub(crate) const CORRECTION_COLUMNS: &str =
    "id, user_id, question_id, new_status, feedback, status, updated_at";

/// Column list matching [`InboxRow`].
pub(crate) const INBOX_COLUMNS: &str = "id, user_id, content, created_at";

/// A row from the `players` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PlayerRow {
    user_id: i32,
    territory: String,
    island: String,
    anchored: bool,
    visited_territories: Vec<String>,
    fuel: i32,
    fuel_cap: i32,
    coin: i32,
    blue_key: i32,
    red_key: i32,
    golden_key: i32,
    master_key: i32,
    updated_at: DateTime<Utc>,
}

impl From<PlayerRow> for Player {
    fn from(row: PlayerRow) -> Self {
        Self {
            user_id: UserId(row.user_id),
            territory: TerritoryId(row.territory),
            island: IslandId(row.island),
            anchored: row.anchored,
            visited_territories: row
                .visited_territories
                .into_iter()
                .map(TerritoryId)
                .collect(),
            resources: ResourceVector {
                fuel: row.fuel,
                fuel_cap: row.fuel_cap,
                coin: row.coin,
                blue_key: row.blue_key,
                red_key: row.red_key,
                golden_key: row.golden_key,
                master_key: row.master_key,
            },
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `user_treasures` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserTreasureRow {
    user_id: i32,
    treasure_id: String,
    unlocked: bool,
    cost: Json<Cost>,
    reward: Option<Json<Cost>>,
    updated_at: DateTime<Utc>,
}

impl From<UserTreasureRow> for UserTreasure {
    fn from(row: UserTreasureRow) -> Self {
        Self {
            user_id: UserId(row.user_id),
            treasure_id: TreasureId(row.treasure_id),
            unlocked: row.unlocked,
            cost: row.cost.0,
            reward: row.reward.map(|reward| reward.0),
            updated_at: row.updated_at,
        }
    }
}

/// A row from the `trade_offers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct TradeOfferRow {
    id: Uuid,
    offerer: i32,
    offered: Json<Cost>,
    requested: Json<Cost>,
    created_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<TradeOfferRow> for TradeOffer {
    fn from(row: TradeOfferRow) -> Self {
        Self {
            id: row.id.into(),
            offerer: UserId(row.offerer),
            offered: row.offered.0,
            requested: row.requested.0,
            created_at: row.created_at,
            deleted_at: row.deleted_at,
        }
    }
}

/// A row from the `investment_sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SessionRow {
    id: Uuid,
    text: String,
    end_at: DateTime<Utc>,
    resolved: bool,
}

impl From<SessionRow> for InvestmentSession {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id.into(),
            text: row.text,
            end_at: row.end_at,
            resolved: row.resolved,
        }
    }
}

/// A row from the `user_investments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct InvestmentRow {
    session_id: Uuid,
    user_id: i32,
    coin: i32,
}

impl From<InvestmentRow> for UserInvestment {
    fn from(row: InvestmentRow) -> Self {
        Self {
            session_id: row.session_id.into(),
            user_id: UserId(row.user_id),
            coin: row.coin,
        }
    }
}

/// A row from the `answers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AnswerRow {
    user_id: i32,
    question_id: String,
    status: String,
    text_content: Option<String>,
    filename: Option<String>,
    feedback: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AnswerRow> for Answer {
    type Error = StoreError;

    fn try_from(row: AnswerRow) -> Result<Self, StoreError> {
        Ok(Self {
            user_id: UserId(row.user_id),
            question_id: QuestionId(row.question_id),
            status: answer_status_from_db(&row.status)?,
            text_content: row.text_content,
            filename: row.filename,
            feedback: row.feedback,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `corrections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct CorrectionRow {
    id: Uuid,
    user_id: i32,
    question_id: String,
    new_status: String,
    feedback: Option<String>,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CorrectionRow> for Correction {
    type Error = StoreError;

    fn try_from(row: CorrectionRow) -> Result<Self, StoreError> {
        let status = CorrectionStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Corrupt(format!("correction status {:?}", row.status)))?;
        Ok(Self {
            id: row.id.into(),
            user_id: UserId(row.user_id),
            question_id: QuestionId(row.question_id),
            new_status: answer_status_from_db(&row.new_status)?,
            feedback: row.feedback,
            status,
            updated_at: row.updated_at,
        })
    }
}

/// A row from the `inbox_messages` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct InboxRow {
    id: Uuid,
    user_id: i32,
    content: Json<InboxContent>,
    created_at: DateTime<Utc>,
}

impl From<InboxRow> for InboxMessage {
    fn from(row: InboxRow) -> Self {
        Self {
            id: row.id.into(),
            user_id: UserId(row.user_id),
            content: row.content.0,
            created_at: row.created_at,
        }
    }
}

fn answer_status_from_db(s: &str) -> Result<AnswerStatus, StoreError> {
    AnswerStatus::parse(s).ok_or_else(|| StoreError::Corrupt(format!("answer status {s:?}")))
}
