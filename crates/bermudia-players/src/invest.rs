//! Investment sessions: a single time-boxed stake per player, paid out
//! once the session has closed.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::debug;

use bermudia_ledger::{deduct, induct};
use bermudia_types::{
    Cost, InvestmentSession, Player, PlayerUpdateEvent, PlayerUpdateReason, ResourceKind, UserId,
    UserInvestment,
};

use crate::error::{GameError, Violation};
use crate::player::with_resources;

/// Feasibility of staking in the active session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestCheck {
    /// Whether a stake would be accepted.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// The active session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<InvestmentSession>,
    /// The player's stakes in the session.
    pub investments: Vec<UserInvestment>,
    /// Largest stake the player can afford.
    pub max_coin: i32,
}

/// Report whether `player` can stake in `active`.
///
/// `prior` holds the player's earlier stakes in that session.
pub fn invest_check(
    active: Option<&InvestmentSession>,
    prior: &[UserInvestment],
    player: &Player,
    now: DateTime<Utc>,
) -> InvestCheck {
    let reason = match active {
        None => Some(Violation::NoActiveSession),
        Some(session) if now > session.end_at => Some(Violation::SessionClosed),
        Some(_) if !prior.is_empty() => Some(Violation::AlreadyInvested),
        Some(_) if player.resources.coin <= 0 => Some(Violation::NoCoins),
        Some(_) => None,
    };
    InvestCheck {
        feasible: reason.is_none(),
        reason,
        session: active.cloned(),
        investments: prior.to_vec(),
        max_coin: player.resources.coin,
    }
}

/// Stake `amount` coins in `session`.
pub fn invest(
    session: &InvestmentSession,
    prior: &[UserInvestment],
    player: &Player,
    amount: i32,
    now: DateTime<Utc>,
) -> Result<(PlayerUpdateEvent, UserInvestment), GameError> {
    if let Some(reason) = invest_check(Some(session), prior, player, now).reason {
        return Err(reason.into());
    }
    if amount <= 0 {
        return Err(Violation::InvalidAmount { amount }.into());
    }

    let resources = deduct(&player.resources, &Cost::of(ResourceKind::Coin, amount))?;
    let investment = UserInvestment {
        session_id: session.id,
        user_id: player.user_id,
        coin: amount,
    };
    let event = PlayerUpdateEvent::new(PlayerUpdateReason::Invest, with_resources(player, resources));
    Ok((event, investment))
}

/// Compute per-user payouts for a closed session.
///
/// Each user receives `round(sum of stakes * coefficient)` coins, rounding
/// half away from zero. Payouts are capped at `i32::MAX`.
pub fn resolve_investments(
    session: &InvestmentSession,
    investments: &[UserInvestment],
    coefficient: Decimal,
    now: DateTime<Utc>,
) -> Result<BTreeMap<UserId, i32>, GameError> {
    if session.resolved {
        return Err(Violation::SessionAlreadyResolved.into());
    }
    if now <= session.end_at {
        return Err(Violation::SessionStillOpen.into());
    }
    if coefficient < Decimal::ZERO {
        return Err(Violation::NegativeCoefficient.into());
    }

    let mut staked: BTreeMap<UserId, Decimal> = BTreeMap::new();
    for inv in investments.iter().filter(|inv| inv.session_id == session.id) {
        let total = staked.entry(inv.user_id).or_insert(Decimal::ZERO);
        *total = total.saturating_add(Decimal::from(inv.coin));
    }

    let payouts: BTreeMap<UserId, i32> = staked
        .into_iter()
        .map(|(user, coins)| {
            let reward = coins
                .saturating_mul(coefficient)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i32()
                .unwrap_or(i32::MAX);
            (user, reward)
        })
        .collect();
    debug!(
        session = %session.id,
        %coefficient,
        investors = payouts.len(),
        "Investment payouts computed"
    );
    Ok(payouts)
}

/// Pay an investment reward into `player`.
pub fn give_investment_reward(player: &Player, coins: i32) -> PlayerUpdateEvent {
    let resources = induct(&player.resources, &Cost::of(ResourceKind::Coin, coins));
    PlayerUpdateEvent::new(
        PlayerUpdateReason::InvestReward,
        with_resources(player, resources),
    )
}
