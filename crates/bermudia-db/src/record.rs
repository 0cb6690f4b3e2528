//! Versioned records and the compare-and-swap value that updates them.
//!
//! Each mutable record type names its key and its compare basis: the part
//! of the stored row that must still match the caller's snapshot for an
//! update to go through. Stores use the basis; they never inspect record
//! contents otherwise.

use chrono::{DateTime, Utc};

use bermudia_types::{
    Answer, Correction, CorrectionId, Entity, InvestmentSession, InvestmentSessionId, Player,
    QuestionId, TradeOffer, TradeOfferId, TreasureId, UserId, UserTreasure, store_timestamp,
};

/// A record that can be updated through compare-and-swap.
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary key.
    type Key: Ord + Clone + Send + Sync + 'static;

    /// Entity reported in errors about this record.
    const ENTITY: Entity;

    /// Primary key of this record.
    fn key(&self) -> Self::Key;

    /// Human-readable key for errors and logs.
    fn label(&self) -> String;

    /// Whether `stored` still matches this snapshot under the compare basis.
    fn same_version(&self, stored: &Self) -> bool;

    /// Stamp the record as written at `at`.
    fn touch(&mut self, at: DateTime<Utc>);
}

/// An update from a snapshot the caller read (`old`) to the value it wants
/// stored (`new`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap<R> {
    /// The snapshot the caller read.
    pub old: R,
    /// The replacement, stamped with the write time.
    pub new: R,
}

impl<R: Record> Swap<R> {
    /// Build a swap, stamping `new` with a fresh store timestamp.
    pub fn new(old: R, mut new: R) -> Self {
        new.touch(store_timestamp());
        Self { old, new }
    }

    /// Key of the record being swapped.
    pub fn key(&self) -> R::Key {
        self.old.key()
    }
}

impl Record for Player {
    type Key = UserId;
    const ENTITY: Entity = Entity::Player;

    fn key(&self) -> UserId {
        self.user_id
    }

    fn label(&self) -> String {
        self.user_id.to_string()
    }

    fn same_version(&self, stored: &Self) -> bool {
        self == stored
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Record for UserTreasure {
    type Key = (UserId, TreasureId);
    const ENTITY: Entity = Entity::UserTreasure;

    fn key(&self) -> Self::Key {
        (self.user_id, self.treasure_id.clone())
    }

    fn label(&self) -> String {
        format!("{}/{}", self.user_id, self.treasure_id)
    }

    fn same_version(&self, stored: &Self) -> bool {
        self.updated_at == stored.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Record for TradeOffer {
    type Key = TradeOfferId;
    const ENTITY: Entity = Entity::TradeOffer;

    fn key(&self) -> TradeOfferId {
        self.id
    }

    fn label(&self) -> String {
        self.id.to_string()
    }

    fn same_version(&self, stored: &Self) -> bool {
        self.deleted_at == stored.deleted_at
    }

    // Offers are immutable apart from the tombstone, which the engine sets.
    fn touch(&mut self, _at: DateTime<Utc>) {}
}

impl Record for InvestmentSession {
    type Key = InvestmentSessionId;
    const ENTITY: Entity = Entity::InvestmentSession;

    fn key(&self) -> InvestmentSessionId {
        self.id
    }

    fn label(&self) -> String {
        self.id.to_string()
    }

    fn same_version(&self, stored: &Self) -> bool {
        self.resolved == stored.resolved
    }

    fn touch(&mut self, _at: DateTime<Utc>) {}
}

impl Record for Answer {
    type Key = (UserId, QuestionId);
    const ENTITY: Entity = Entity::Answer;

    fn key(&self) -> Self::Key {
        (self.user_id, self.question_id.clone())
    }

    fn label(&self) -> String {
        format!("{}/{}", self.user_id, self.question_id)
    }

    fn same_version(&self, stored: &Self) -> bool {
        self.updated_at == stored.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Record for Correction {
    type Key = CorrectionId;
    const ENTITY: Entity = Entity::Correction;

    fn key(&self) -> CorrectionId {
        self.id
    }

    fn label(&self) -> String {
        self.id.to_string()
    }

    fn same_version(&self, stored: &Self) -> bool {
        self.updated_at == stored.updated_at
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use bermudia_types::{Cost, IslandId, ResourceVector, TerritoryId};

    use super::*;

    fn player() -> Player {
        Player {
            user_id: UserId(1),
            territory: TerritoryId::new("bermuda"),
            island: IslandId::new("a"),
            anchored: true,
            visited_territories: vec![TerritoryId::new("bermuda")],
            resources: ResourceVector::default(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }

    #[test]
    fn swap_stamps_the_new_value() {
        let old = player();
        let swap = Swap::new(old.clone(), old.clone());
        assert!(swap.new.updated_at > old.updated_at);
        assert_eq!(swap.key(), UserId(1));
    }

    #[test]
    fn player_basis_is_every_field() {
        let stored = player();
        let mut moved = stored.clone();
        moved.island = IslandId::new("b");
        assert!(stored.same_version(&stored));
        assert!(!moved.same_version(&stored));
    }

    #[test]
    fn offer_basis_is_the_tombstone() {
        let offer = TradeOffer {
            id: TradeOfferId::new(),
            offerer: UserId(1),
            offered: Cost::new(),
            requested: Cost::new(),
            created_at: store_timestamp(),
            deleted_at: None,
        };
        let mut deleted = offer.clone();
        deleted.deleted_at = Some(store_timestamp());
        assert!(offer.same_version(&offer));
        assert!(!offer.same_version(&deleted));
    }
}
