//! Onboarding and movement, within a territory and between territories.

use bermudia_db::GameStore;
use bermudia_players::{
    self as engine, AnchorCheck, KnowledgeBar, MigrateCheck, RefuelCheck, TravelCheck,
};
use bermudia_types::{IslandId, Player, Territory, TerritoryId, UserId, store_timestamp};

use super::GameService;
use crate::error::ActionError;

impl<S: GameStore> GameService<S> {
    /// Return the player, creating it at the start island on first
    /// contact. Only the creating call pushes an `initial` update.
    pub async fn onboard(&self, user: UserId) -> Result<Player, ActionError> {
        let territory = self.catalog.start_territory()?;
        let fresh = engine::new_player(user, territory, &self.settings.economy, store_timestamp());
        let (player, created) = self
            .call(self.store.get_or_create_player(fresh.player))
            .await?;
        if created {
            tracing::info!(user_id = %user, island = %player.island, "Player onboarded");
            self.notify_player(fresh.reason, player.clone()).await;
        }
        Ok(player)
    }

    fn territory_of(&self, player: &Player) -> Result<&Territory, ActionError> {
        self.catalog.territory(&player.territory)
    }

    /// Report whether `user` can sail from `from` to `to`.
    pub async fn travel_check(
        &self,
        user: UserId,
        from: &IslandId,
        to: &IslandId,
    ) -> Result<TravelCheck, ActionError> {
        let player = self.player(user).await?;
        let territory = self.territory_of(&player)?;
        Ok(engine::travel_check(
            &player,
            from,
            to,
            territory,
            &self.settings.economy,
        ))
    }

    /// Sail from `from` to `to`.
    pub async fn travel(
        &self,
        user: UserId,
        from: &IslandId,
        to: &IslandId,
    ) -> Result<Player, ActionError> {
        let player = self.player(user).await?;
        let territory = self.territory_of(&player)?;
        let event = engine::travel(&player, from, to, territory, &self.settings.economy)?;
        self.commit_player(player, event).await
    }

    /// Report how much fuel `user` can buy here.
    pub async fn refuel_check(&self, user: UserId) -> Result<RefuelCheck, ActionError> {
        let player = self.player(user).await?;
        let territory = self.territory_of(&player)?;
        Ok(engine::refuel_check(&player, territory, &self.settings.economy))
    }

    /// Buy `amount` units of fuel.
    pub async fn refuel(&self, user: UserId, amount: i32) -> Result<Player, ActionError> {
        let player = self.player(user).await?;
        let territory = self.territory_of(&player)?;
        let event = engine::refuel(&player, territory, amount, &self.settings.economy)?;
        self.commit_player(player, event).await
    }

    /// Report whether `user` can anchor at `island`.
    pub async fn anchor_check(
        &self,
        user: UserId,
        island: &IslandId,
    ) -> Result<AnchorCheck, ActionError> {
        let player = self.player(user).await?;
        Ok(engine::anchor_check(&player, island, &self.settings.economy))
    }

    /// Anchor at `island`.
    pub async fn anchor(&self, user: UserId, island: &IslandId) -> Result<Player, ActionError> {
        let player = self.player(user).await?;
        let event = engine::anchor(&player, island, &self.settings.economy)?;
        self.commit_player(player, event).await
    }

    /// Knowledge `user` gathered in each territory.
    pub async fn knowledge_bars(&self, user: UserId) -> Result<Vec<KnowledgeBar>, ActionError> {
        let answers = self.call(self.store.answers_of(user)).await?;
        Ok(engine::knowledge_bars(self.catalog.questions(), &answers))
    }

    /// Report where `user` can migrate and at what price.
    pub async fn migrate_check(&self, user: UserId) -> Result<MigrateCheck, ActionError> {
        let player = self.player(user).await?;
        let current = self.territory_of(&player)?;
        let bars = self.knowledge_bars(user).await?;
        let territories: Vec<&Territory> = self.catalog.territories().collect();
        Ok(engine::migrate_check(
            &player,
            &bars,
            current,
            &territories,
            &self.settings.economy,
        ))
    }

    /// Move `user` to the start island of territory `to`.
    pub async fn migrate(&self, user: UserId, to: &TerritoryId) -> Result<Player, ActionError> {
        let player = self.player(user).await?;
        let current = self.territory_of(&player)?;
        let bars = self.knowledge_bars(user).await?;
        let territories: Vec<&Territory> = self.catalog.territories().collect();
        let event = engine::migrate(
            &player,
            &bars,
            current,
            &territories,
            to,
            &self.settings.economy,
        )?;
        let from = player.territory.clone();
        let committed = self.commit_player(player, event).await?;
        tracing::info!(user_id = %user, %from, to = %committed.territory, "Player migrated");
        Ok(committed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bermudia_players::{MigrationStatus, Violation};
    use bermudia_types::{Notification, PlayerUpdateEvent, PlayerUpdateReason};

    use super::*;
    use crate::error::ErrorKind;
    use crate::hub::Outgoing;
    use crate::service::fixtures::service;

    fn island(id: &str) -> IslandId {
        IslandId::new(id)
    }

    #[tokio::test]
    async fn onboarding_is_idempotent_and_notifies_once() {
        let svc = service();
        let mut sub = svc.hub().register(UserId(1));

        let first = svc.onboard(UserId(1)).await.unwrap();
        let second = svc.onboard(UserId(1)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.island, island("a"));
        assert_eq!(first.resources.fuel, 15);
        assert_eq!(first.resources.coin, 400);

        assert!(matches!(
            sub.receiver.try_recv(),
            Ok(Outgoing::Notify(Notification::PlayerUpdate(PlayerUpdateEvent {
                reason: PlayerUpdateReason::Initial,
                ..
            })))
        ));
        assert!(sub.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn actions_require_onboarding() {
        let svc = service();
        let err = svc.refuel_check(UserId(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn travel_then_stale_retry_is_a_location_mismatch() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();

        let moved = svc.travel(UserId(1), &island("a"), &island("b")).await.unwrap();
        assert_eq!(moved.island, island("b"));
        assert_eq!(moved.resources.fuel, 14);
        assert!(!moved.anchored);

        let err = svc
            .travel(UserId(1), &island("a"), &island("b"))
            .await
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&Violation::LocationMismatch {
                expected: island("a"),
                actual: island("b"),
            })
        );
    }

    #[tokio::test]
    async fn refuel_and_anchor_at_a_refuel_island() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();
        svc.travel(UserId(1), &island("a"), &island("b")).await.unwrap();

        let check = svc.refuel_check(UserId(1)).await.unwrap();
        assert!(check.feasible);
        assert_eq!(check.max_amount, 1);

        let fueled = svc.refuel(UserId(1), 1).await.unwrap();
        assert_eq!(fueled.resources.fuel, 15);
        assert_eq!(fueled.resources.coin, 390);

        let anchored = svc.anchor(UserId(1), &island("b")).await.unwrap();
        assert!(anchored.anchored);
        assert_eq!(anchored.resources.coin, 370);

        let again = svc.anchor_check(UserId(1), &island("b")).await.unwrap();
        assert_eq!(again.reason, Some(Violation::AlreadyAnchored));
    }

    #[tokio::test]
    async fn missing_route_leaves_the_player_untouched() {
        let svc = service();
        let before = svc.onboard(UserId(1)).await.unwrap();
        let err = svc
            .travel(UserId(1), &island("a"), &island("c"))
            .await
            .unwrap_err();
        assert!(matches!(err.violation(), Some(Violation::NoRoute { .. })));
        assert_eq!(svc.player(UserId(1)).await.unwrap(), before);
    }

    fn territory(id: &str) -> TerritoryId {
        TerritoryId::new(id)
    }

    /// Sail player 1 to the terminal island `c` of bermuda.
    async fn to_the_exit(svc: &GameService<bermudia_db::MemoryStore>) {
        svc.onboard(UserId(1)).await.unwrap();
        svc.travel(UserId(1), &island("a"), &island("b")).await.unwrap();
        svc.travel(UserId(1), &island("b"), &island("c")).await.unwrap();
    }

    #[tokio::test]
    async fn migration_needs_a_terminal_island() {
        let svc = service();
        svc.onboard(UserId(1)).await.unwrap();
        let check = svc.migrate_check(UserId(1)).await.unwrap();
        assert_eq!(check.knowledge_criteria_territory, territory("bermuda"));
        let away = check.option(&territory("sargasso")).unwrap();
        assert_eq!(away.status, MigrationStatus::Untouched);
        assert_eq!(away.reason, Some(Violation::NotAtTerminalIsland));

        let err = svc.migrate(UserId(1), &territory("sargasso")).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::NotAtTerminalIsland));
    }

    #[tokio::test]
    async fn migrating_without_knowledge_costs_coins() {
        let svc = service();
        to_the_exit(&svc).await;
        let check = svc.migrate_check(UserId(1)).await.unwrap();
        assert_eq!(check.min_acceptable_knowledge, 30);
        assert_eq!(check.knowledge_value, 0);
        assert!(check.option(&territory("sargasso")).unwrap().must_pay_cost);

        let moved = svc.migrate(UserId(1), &territory("sargasso")).await.unwrap();
        assert_eq!(moved.territory, territory("sargasso"));
        assert_eq!(moved.island, island("x"));
        assert_eq!(moved.resources.coin, 320);
        assert_eq!(
            moved.visited_territories,
            [territory("bermuda"), territory("sargasso")]
        );
        assert_eq!(svc.player(UserId(1)).await.unwrap(), moved);
    }

    #[tokio::test]
    async fn unknown_destinations_are_not_found() {
        let svc = service();
        to_the_exit(&svc).await;
        let err = svc.migrate(UserId(1), &territory("atlantis")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
