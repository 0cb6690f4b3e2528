//! Investment sessions: stakes, creation and resolution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bermudia_db::{GameStore, Swap};
use bermudia_players::{self as engine, InvestCheck};
use bermudia_types::{
    InvestmentSession, InvestmentSessionId, PlayerUpdateReason, UserId, UserInvestment,
    store_timestamp,
};

use super::GameService;
use crate::error::ActionError;

/// Coins paid to one investor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    /// The investor.
    pub user_id: UserId,
    /// Coins credited.
    pub coin: i32,
}

/// Outcome of resolving a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResolution {
    /// The session, now resolved.
    pub session: InvestmentSession,
    /// Every investor's payout, including zero payouts.
    pub payouts: Vec<Payout>,
}

impl<S: GameStore> GameService<S> {
    async fn stakes_of(
        &self,
        session: &InvestmentSession,
        user: UserId,
    ) -> Result<Vec<UserInvestment>, ActionError> {
        self.call(self.store.investments(session.id, Some(user))).await
    }

    /// Report whether `user` can stake in the active session.
    pub async fn invest_check(&self, user: UserId) -> Result<InvestCheck, ActionError> {
        let player = self.player(user).await?;
        let now = store_timestamp();
        let active = self.call(self.store.active_session(now)).await?;
        let prior = match &active {
            Some(session) => self.stakes_of(session, user).await?,
            None => Vec::new(),
        };
        Ok(engine::invest_check(active.as_ref(), &prior, &player, now))
    }

    /// Stake `coin` in `session_id`.
    pub async fn invest(
        &self,
        user: UserId,
        session_id: InvestmentSessionId,
        coin: i32,
    ) -> Result<UserInvestment, ActionError> {
        let session = self.call(self.store.get_session(session_id)).await?;
        let player = self.player(user).await?;
        let prior = self.stakes_of(&session, user).await?;
        let (event, stake) = engine::invest(&session, &prior, &player, coin, store_timestamp())?;
        let (stake, committed) = self
            .call(self.store.invest(stake, Swap::new(player, event.player)))
            .await?;
        tracing::info!(user_id = %user, session_id = %session.id, coin, "Stake placed");
        self.notify_player(event.reason, committed).await;
        Ok(stake)
    }

    /// Open a new session that accepts stakes until `end_at`.
    pub async fn create_session(
        &self,
        text: String,
        end_at: DateTime<Utc>,
    ) -> Result<InvestmentSession, ActionError> {
        let session = InvestmentSession {
            id: InvestmentSessionId::new(),
            text,
            end_at,
            resolved: false,
        };
        let session = self.call(self.store.create_session(session)).await?;
        tracing::info!(
            session_id = %session.id,
            end_at = %session.end_at,
            "Investment session opened"
        );
        Ok(session)
    }

    /// Pay every investor `round(stake * coefficient)` and close the
    /// session, all in one commit.
    pub async fn resolve_session(
        &self,
        session_id: InvestmentSessionId,
        coefficient: Decimal,
    ) -> Result<SessionResolution, ActionError> {
        let session = self.call(self.store.get_session(session_id)).await?;
        let stakes = self.call(self.store.investments(session_id, None)).await?;
        let rewards =
            engine::resolve_investments(&session, &stakes, coefficient, store_timestamp())?;

        let mut swaps = Vec::new();
        for (&user, &coin) in rewards.iter().filter(|&(_, &coin)| coin > 0) {
            let player = self.player(user).await?;
            let event = engine::give_investment_reward(&player, coin);
            swaps.push(Swap::new(player, event.player));
        }

        let resolved = InvestmentSession {
            resolved: true,
            ..session.clone()
        };
        let (session, paid) = self
            .call(self.store.resolve_session(
                Swap::new(session, resolved),
                swaps,
                stakes.len(),
            ))
            .await?;
        tracing::info!(
            session_id = %session.id,
            %coefficient,
            investors = rewards.len(),
            paid = paid.len(),
            "Investment session resolved"
        );
        for player in paid {
            self.notify_player(PlayerUpdateReason::InvestReward, player).await;
        }

        let payouts = rewards
            .into_iter()
            .map(|(user_id, coin)| Payout { user_id, coin })
            .collect();
        Ok(SessionResolution { session, payouts })
    }
}
