//! Movement between islands and the services sold on them.
//!
//! 1. [`travel`] -- hop along a directed edge, burning fuel.
//! 2. [`refuel`] -- buy fuel with coins on a refuel island.
//! 3. [`anchor`] -- pay coins to land on the current island.
//!
//! Each operation has a matching `*_check` that runs the same validation
//! and reports feasibility without producing an event.

use serde::Serialize;

use bermudia_ledger::deduct;
use bermudia_types::{
    Cost, IslandId, Player, PlayerUpdateEvent, PlayerUpdateReason, ResourceKind, ResourceVector,
    Territory,
};

use crate::config::EconomyConfig;
use crate::error::{GameError, Violation};
use crate::player::with_resources;

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

/// Feasibility of a hop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelCheck {
    /// Whether the hop would succeed.
    pub feasible: bool,
    /// Why it would not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// Fuel the hop burns.
    pub fuel_cost: i32,
}

/// Report whether `player` can hop from `from` to `to`.
pub fn travel_check(
    player: &Player,
    from: &IslandId,
    to: &IslandId,
    territory: &Territory,
    config: &EconomyConfig,
) -> TravelCheck {
    let reason = validate_travel(player, from, to, territory, config).err();
    TravelCheck {
        feasible: reason.is_none(),
        reason,
        fuel_cost: config.travel_fuel_cost,
    }
}

/// Move `player` from `from` to `to`.
///
/// The checks run in a fixed order and the first failure is reported:
/// location mismatch, missing edge, then insufficient fuel. On success the
/// fuel cost is deducted, the player is at `to`, and no longer anchored.
pub fn travel(
    player: &Player,
    from: &IslandId,
    to: &IslandId,
    territory: &Territory,
    config: &EconomyConfig,
) -> Result<PlayerUpdateEvent, GameError> {
    let resources = validate_travel(player, from, to, territory, config)?;
    let moved = Player {
        island: to.clone(),
        anchored: false,
        ..with_resources(player, resources)
    };
    Ok(PlayerUpdateEvent::new(PlayerUpdateReason::Travel, moved))
}

fn validate_travel(
    player: &Player,
    from: &IslandId,
    to: &IslandId,
    territory: &Territory,
    config: &EconomyConfig,
) -> Result<ResourceVector, Violation> {
    if &player.island != from {
        return Err(Violation::LocationMismatch {
            expected: from.clone(),
            actual: player.island.clone(),
        });
    }
    if !territory.has_edge(from, to) {
        return Err(Violation::NoRoute {
            from: from.clone(),
            to: to.clone(),
        });
    }
    let fuel = Cost::of(ResourceKind::Fuel, config.travel_fuel_cost);
    deduct(&player.resources, &fuel).map_err(Violation::from)
}

// ---------------------------------------------------------------------------
// Refuel
// ---------------------------------------------------------------------------

/// Feasibility of buying fuel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefuelCheck {
    /// Whether at least one unit can be bought.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// Most units that can be bought right now.
    pub max_amount: i32,
    /// Coins per unit.
    pub coin_per_unit: i32,
}

/// Report how much fuel `player` can buy.
///
/// The limit is the smaller of the free tank space and what the player's
/// coins pay for.
pub fn refuel_check(player: &Player, territory: &Territory, config: &EconomyConfig) -> RefuelCheck {
    let mut check = RefuelCheck {
        feasible: false,
        reason: None,
        max_amount: 0,
        coin_per_unit: config.refuel_coin_per_unit,
    };

    if !territory.is_refuel_island(&player.island) {
        check.reason = Some(Violation::NotRefuelIsland);
        return check;
    }

    let space = player
        .resources
        .fuel_cap
        .saturating_sub(player.resources.fuel)
        .max(0);
    let affordable = player
        .resources
        .coin
        .checked_div(config.refuel_coin_per_unit)
        .unwrap_or(space)
        .max(0);
    check.max_amount = space.min(affordable);

    if space == 0 {
        check.reason = Some(Violation::TankFull);
    } else if affordable == 0 {
        check.reason = Some(Violation::InsufficientResources {
            kind: ResourceKind::Coin,
            required: config.refuel_coin_per_unit,
            available: player.resources.coin,
        });
    } else {
        check.feasible = true;
    }
    check
}

/// Buy `amount` units of fuel.
pub fn refuel(
    player: &Player,
    territory: &Territory,
    amount: i32,
    config: &EconomyConfig,
) -> Result<PlayerUpdateEvent, GameError> {
    let check = refuel_check(player, territory, config);
    if let Some(reason) = check.reason {
        return Err(reason.into());
    }
    if amount <= 0 {
        return Err(Violation::InvalidAmount { amount }.into());
    }
    if amount > check.max_amount {
        return Err(Violation::RefuelExceedsLimit {
            requested: amount,
            max: check.max_amount,
        }
        .into());
    }

    let price = amount
        .checked_mul(config.refuel_coin_per_unit)
        .ok_or(Violation::ResourceOverflow {
            kind: ResourceKind::Coin,
        })?;
    let mut resources = deduct(&player.resources, &Cost::of(ResourceKind::Coin, price))?;
    // Bounded by the tank space checked above.
    resources.fuel = resources.fuel.saturating_add(amount);

    Ok(PlayerUpdateEvent::new(
        PlayerUpdateReason::Refuel,
        with_resources(player, resources),
    ))
}

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// Feasibility of anchoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorCheck {
    /// Whether anchoring would succeed.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// Coins anchoring costs.
    pub cost: Cost,
}

/// Report whether `player` can anchor at `island`.
pub fn anchor_check(player: &Player, island: &IslandId, config: &EconomyConfig) -> AnchorCheck {
    let reason = validate_anchor(player, island, config).err();
    AnchorCheck {
        feasible: reason.is_none(),
        reason,
        cost: anchor_cost(config),
    }
}

/// Land at the current island for a coin fee.
pub fn anchor(
    player: &Player,
    island: &IslandId,
    config: &EconomyConfig,
) -> Result<PlayerUpdateEvent, GameError> {
    let resources = validate_anchor(player, island, config)?;
    let anchored = Player {
        anchored: true,
        ..with_resources(player, resources)
    };
    Ok(PlayerUpdateEvent::new(PlayerUpdateReason::Anchor, anchored))
}

fn anchor_cost(config: &EconomyConfig) -> Cost {
    Cost::of(ResourceKind::Coin, config.anchor_coin_cost)
}

fn validate_anchor(
    player: &Player,
    island: &IslandId,
    config: &EconomyConfig,
) -> Result<ResourceVector, Violation> {
    if &player.island != island {
        return Err(Violation::NotAtIsland {
            island: island.clone(),
        });
    }
    if player.anchored {
        return Err(Violation::AlreadyAnchored);
    }
    deduct(&player.resources, &anchor_cost(config)).map_err(Violation::from)
}
