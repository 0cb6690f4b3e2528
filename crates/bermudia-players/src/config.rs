//! Economy parameters threaded into every engine call.
//!
//! The [`EconomyConfig`] struct bundles every tunable so that callers
//! (service, tests) can override defaults. It is read from the `economy`
//! section of `bermudia-config.yaml`; development mode swaps in
//! [`EconomyConfig::development`].

use serde::Deserialize;

/// Configuration for the game economy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Fuel tank capacity of new players (default: 15).
    pub fuel_cap: i32,

    /// Fuel new players start with (default: 15).
    pub initial_fuel: i32,

    /// Coins new players start with (default: 400).
    pub initial_coin: i32,

    /// Keys of each color new players start with (default: 0).
    pub initial_keys: i32,

    /// Fuel burned per hop (default: 1).
    pub travel_fuel_cost: i32,

    /// Coins per unit of fuel (default: 10).
    pub refuel_coin_per_unit: i32,

    /// Coins paid to anchor at an island (default: 20).
    pub anchor_coin_cost: i32,

    /// Maximum open offers per player (default: 10).
    pub max_open_offers: u32,

    /// Coins paid to migrate into an untouched territory without enough
    /// knowledge (default: 80).
    pub migration_coin_cost: i32,

    /// Knowledge that waives the migration cost, capped by what the
    /// territory offers (default: 50).
    pub migration_min_knowledge: i32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            fuel_cap: 15,
            initial_fuel: 15,
            initial_coin: 400,
            initial_keys: 0,
            travel_fuel_cost: 1,
            refuel_coin_per_unit: 10,
            anchor_coin_cost: 20,
            max_open_offers: 10,
            migration_coin_cost: 80,
            migration_min_knowledge: 50,
        }
    }
}

impl EconomyConfig {
    /// Development economy: players start with five keys of each color.
    pub fn development() -> Self {
        Self {
            initial_keys: 5,
            ..Self::default()
        }
    }
}
