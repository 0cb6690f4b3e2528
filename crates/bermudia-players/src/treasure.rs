//! Treasure unlocking.
//!
//! Every (player, treasure) pair has its own key cost, derived from a
//! generator seeded with a hash of the pair. Re-deriving the cost therefore
//! always yields the same answer, on any node and after any restart.

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use twox_hash::XxHash64;

use bermudia_ledger::{deduct, induct};
use bermudia_types::{
    Cost, CostItem, Entity, Player, PlayerUpdateEvent, PlayerUpdateReason, ResourceKind, Treasure,
    TreasureId, UserId, UserTreasure,
};

use crate::error::{GameError, Violation};
use crate::player::with_resources;
use crate::reward::coin_worth;

/// Seed for the treasure cost hash.
const COST_SEED: u64 = 0x6265_726d_7564_6961;

/// Generate the key cost of `treasure` for `user`.
///
/// Shares are drawn in per-mille: a blue share below 30%, a red share of
/// what is left, and a golden share of what is left of 120%. They scale to
/// at most 2 blue, 5 red and 4 golden keys. Zero lines are omitted.
pub fn treasure_cost(user: UserId, treasure: &TreasureId) -> Cost {
    let key = format!("{user}:{treasure}");
    let mut rng = ChaCha8Rng::seed_from_u64(XxHash64::oneshot(COST_SEED, key.as_bytes()));

    let blue_share: i32 = rng.random_range(0..300);
    let red_share: i32 = rng.random_range(0..1000_i32.saturating_sub(blue_share));
    let golden_share: i32 =
        rng.random_range(0..1200_i32.saturating_sub(red_share).saturating_sub(blue_share));

    let scaled = |share: i32, keys: i32| share.saturating_mul(keys).checked_div(1000).unwrap_or(0);
    let items = [
        (ResourceKind::BlueKey, scaled(blue_share, 10)),
        (ResourceKind::RedKey, scaled(red_share, 6)),
        (ResourceKind::GoldenKey, scaled(golden_share, 4)),
    ]
    .into_iter()
    .filter(|&(_, amount)| amount > 0)
    .map(|(kind, amount)| CostItem::new(kind, amount))
    .collect();
    Cost { items }
}

/// The lock state a player sees on first contact with a treasure.
///
/// A treasure whose generated cost is empty starts unlocked with an empty
/// reward.
pub fn new_user_treasure(user: UserId, treasure: &TreasureId, now: DateTime<Utc>) -> UserTreasure {
    let cost = treasure_cost(user, treasure);
    let free = cost.is_empty();
    UserTreasure {
        user_id: user,
        treasure_id: treasure.clone(),
        unlocked: free,
        cost,
        reward: free.then(Cost::new),
        updated_at: now,
    }
}

/// Coins paid out for opening a treasure: the worth of the keys spent.
fn treasure_reward(cost: &Cost) -> Cost {
    let worth = cost
        .iter()
        .filter_map(|item| coin_worth(item.kind).map(|w| w.saturating_mul(item.amount)))
        .fold(0_i32, i32::saturating_add);
    Cost::of(ResourceKind::Coin, worth)
}

/// Feasibility of opening a treasure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockCheck {
    /// Whether opening would succeed.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// Keys needed.
    pub cost: Cost,
    /// Whether the player holds the keys.
    pub can_pay_cost: bool,
}

/// Report whether `player` can open `treasure`.
pub fn unlock_check(player: &Player, treasure: &Treasure, state: &UserTreasure) -> UnlockCheck {
    let paid = deduct(&player.resources, &state.cost);
    let can_pay_cost = paid.is_ok();
    let reason = if player.island != treasure.island {
        Some(Violation::TreasureNotHere)
    } else if state.unlocked {
        Some(Violation::AlreadyUnlocked)
    } else {
        paid.err().map(Violation::from)
    };
    UnlockCheck {
        feasible: reason.is_none(),
        reason,
        cost: state.cost.clone(),
        can_pay_cost,
    }
}

/// Open `treasure`: pay the keys, mark it unlocked, collect the reward.
///
/// A second call is rejected as already unlocked and charges nothing.
pub fn unlock(
    player: &Player,
    treasure: &Treasure,
    state: &UserTreasure,
) -> Result<(PlayerUpdateEvent, UserTreasure), GameError> {
    if state.treasure_id != treasure.id || state.user_id != player.user_id {
        return Err(GameError::not_found(Entity::UserTreasure, &treasure.id));
    }
    if let Some(reason) = unlock_check(player, treasure, state).reason {
        return Err(reason.into());
    }

    let reward = treasure_reward(&state.cost);
    let resources = induct(&deduct(&player.resources, &state.cost)?, &reward);
    let unlocked = UserTreasure {
        unlocked: true,
        reward: Some(reward),
        ..state.clone()
    };
    let event = PlayerUpdateEvent::new(
        PlayerUpdateReason::UnlockTreasure,
        with_resources(player, resources),
    );
    Ok((event, unlocked))
}
