//! The game-wide pause switch.
//!
//! While paused, player actions are refused and the correction job idles.
//! Graders keep access so they can prepare corrections.

use bermudia_db::GameStore;

use super::GameService;
use crate::error::ActionError;

impl<S: GameStore> GameService<S> {
    /// Whether the game is paused.
    pub async fn is_paused(&self) -> Result<bool, ActionError> {
        self.call(self.store.is_paused()).await
    }

    /// Pause or resume the game.
    pub async fn set_paused(&self, paused: bool) -> Result<(), ActionError> {
        self.call(self.store.set_paused(paused)).await?;
        tracing::info!(paused, "Game pause flag changed");
        Ok(())
    }

    /// Fail with [`ActionError::Paused`] while the game is paused.
    pub async fn ensure_running(&self) -> Result<(), ActionError> {
        if self.is_paused().await? {
            return Err(ActionError::Paused);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::error::ErrorKind;
    use crate::service::fixtures::service;

    #[tokio::test]
    async fn pausing_blocks_until_resumed() {
        let svc = service();
        assert!(!svc.is_paused().await.unwrap());
        svc.ensure_running().await.unwrap();

        svc.set_paused(true).await.unwrap();
        let err = svc.ensure_running().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Paused);

        svc.set_paused(false).await.unwrap();
        svc.ensure_running().await.unwrap();
    }
}
