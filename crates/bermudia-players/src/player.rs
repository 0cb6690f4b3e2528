//! Player onboarding and small helpers shared by the engines.

use chrono::{DateTime, Utc};

use bermudia_types::{
    Cost, CostItem, Player, PlayerUpdateEvent, PlayerUpdateReason, ResourceKind, ResourceVector,
    Territory, UserId,
};

use crate::config::EconomyConfig;

/// Create the player record for a user's first visit.
///
/// The player starts anchored at the territory's start island with a full
/// tank, the configured coins, and the configured number of each key.
pub fn new_player(
    user_id: UserId,
    territory: &Territory,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> PlayerUpdateEvent {
    let resources = ResourceVector {
        fuel: config.initial_fuel.min(config.fuel_cap),
        fuel_cap: config.fuel_cap,
        coin: config.initial_coin,
        blue_key: config.initial_keys,
        red_key: config.initial_keys,
        golden_key: config.initial_keys,
        master_key: 0,
    };
    let player = Player {
        user_id,
        territory: territory.id.clone(),
        island: territory.start_island.clone(),
        anchored: true,
        visited_territories: vec![territory.id.clone()],
        resources,
        updated_at: now,
    };
    PlayerUpdateEvent::new(PlayerUpdateReason::Initial, player)
}

/// The player's tradable holdings, in tradable order, zeros included.
pub fn tradable(player: &Player) -> Cost {
    let items = ResourceKind::TRADABLE
        .into_iter()
        .map(|kind| CostItem::new(kind, player.resources.amount(kind)))
        .collect();
    Cost { items }
}

/// A copy of `player` holding `resources`.
pub(crate) fn with_resources(player: &Player, resources: ResourceVector) -> Player {
    Player {
        resources,
        ..player.clone()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared test fixtures.

    use bermudia_types::{Edge, Island, IslandId, TerritoryId};
    use chrono::TimeZone;

    use super::*;

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).single().unwrap_or_default()
    }

    pub fn territory() -> Territory {
        let island = |id: &str| Island {
            id: IslandId::from(id),
            name: id.to_uppercase(),
        };
        let edge = |from: &str, to: &str| Edge {
            from: IslandId::from(from),
            to: IslandId::from(to),
        };
        Territory {
            id: TerritoryId::from("bermuda"),
            name: String::from("Bermuda"),
            start_island: IslandId::from("a"),
            islands: vec![island("a"), island("b"), island("c")],
            edges: vec![edge("a", "b"), edge("b", "c"), edge("c", "a")],
            refuel_islands: vec![IslandId::from("b")],
            terminal_islands: vec![IslandId::from("c")],
        }
    }

    pub fn player(user: i32, resources: ResourceVector) -> Player {
        Player {
            user_id: UserId(user),
            territory: TerritoryId::from("bermuda"),
            island: IslandId::from("a"),
            anchored: true,
            visited_territories: vec![TerritoryId::from("bermuda")],
            resources,
            updated_at: t0(),
        }
    }

    pub fn wallet(fuel: i32, coin: i32) -> ResourceVector {
        ResourceVector {
            fuel,
            fuel_cap: 15,
            coin,
            ..ResourceVector::default()
        }
    }
}
