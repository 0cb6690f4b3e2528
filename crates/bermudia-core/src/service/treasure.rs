//! Treasure unlocking.

use bermudia_db::{GameStore, Swap};
use bermudia_players::{self as engine, UnlockCheck};
use bermudia_types::{Treasure, TreasureId, UserId, UserTreasure, store_timestamp};

use super::GameService;
use crate::error::ActionError;

impl<S: GameStore> GameService<S> {
    async fn user_treasure(
        &self,
        user: UserId,
        treasure: &Treasure,
    ) -> Result<UserTreasure, ActionError> {
        let fresh = engine::new_user_treasure(user, &treasure.id, store_timestamp());
        self.call(self.store.get_or_create_user_treasure(fresh)).await
    }

    /// Report the cost of `id` for `user` and whether they can open it.
    pub async fn unlock_check(
        &self,
        user: UserId,
        id: &TreasureId,
    ) -> Result<UnlockCheck, ActionError> {
        let treasure = self.catalog.treasure(id)?;
        let player = self.player(user).await?;
        let state = self.user_treasure(user, treasure).await?;
        Ok(engine::unlock_check(&player, treasure, &state))
    }

    /// Open `id`: pay its keys and collect the reward.
    pub async fn unlock(&self, user: UserId, id: &TreasureId) -> Result<UserTreasure, ActionError> {
        let treasure = self.catalog.treasure(id)?;
        let player = self.player(user).await?;
        let state = self.user_treasure(user, treasure).await?;
        let (event, opened) = engine::unlock(&player, treasure, &state)?;
        let (opened, committed) = self
            .call(self.store.unlock_treasure(
                Swap::new(state, opened),
                Swap::new(player, event.player),
            ))
            .await?;
        tracing::info!(user_id = %user, treasure_id = %id, "Treasure unlocked");
        self.notify_player(event.reason, committed).await;
        Ok(opened)
    }
}
