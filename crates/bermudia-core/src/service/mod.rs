//! The game service: load, run an engine, commit, notify.
//!
//! Every action follows the same pipeline. Records are loaded from the
//! store, the pure engine computes the prospective records and the event,
//! the store commits them as one compare-and-swap change set, and the
//! committed player is pushed to the hub. A conflict surfaces to the
//! caller unchanged; the service never retries.
//!
//! # Submodules
//!
//! - [`travel`] -- Onboarding, travel, refuel, anchor, migration.
//! - [`market`] -- Offer listing, posting, acceptance, withdrawal.
//! - [`treasure`] -- Treasure checks and unlocking.
//! - [`invest`] -- Investment stakes, sessions, resolution.
//! - [`grading`] -- Answers, corrections, application, broadcast.
//! - [`inbox`] -- Messages kept for players who were offline.
//! - [`pause`] -- The game-wide pause switch.

pub mod grading;
pub mod inbox;
pub mod invest;
pub mod market;
pub mod pause;
pub mod travel;
pub mod treasure;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bermudia_db::{GameStore, StoreError, Swap, with_deadline};
use bermudia_players::EconomyConfig;
use bermudia_types::{Notification, Player, PlayerUpdateEvent, PlayerUpdateReason, UserId};

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::error::ActionError;
use crate::hub::Hub;

pub use grading::Graded;
pub use invest::{Payout, SessionResolution};
pub use market::OfferView;

/// Knobs the service reads on every action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Economy parameters handed to every engine.
    pub economy: EconomyConfig,
    /// Deadline for each store call.
    pub deadline: Duration,
    /// Grade marked submissions immediately.
    pub auto_correct: bool,
}

impl ServiceSettings {
    /// Settings in effect for `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            economy: config.effective_economy(),
            deadline: config.store.deadline(),
            auto_correct: config.grading.auto_correct,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Orchestrates engines, the store and the hub.
#[derive(Debug)]
pub struct GameService<S> {
    store: Arc<S>,
    catalog: Arc<Catalog>,
    hub: Arc<Hub>,
    settings: ServiceSettings,
}

impl<S> Clone for GameService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            hub: Arc::clone(&self.hub),
            settings: self.settings.clone(),
        }
    }
}

impl<S: GameStore> GameService<S> {
    /// Build a service over shared components.
    pub const fn new(
        store: Arc<S>,
        catalog: Arc<Catalog>,
        hub: Arc<Hub>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            catalog,
            hub,
            settings,
        }
    }

    /// The notification hub.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// The content catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The settings in effect.
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Run one store call under the configured deadline.
    async fn call<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ActionError> {
        Ok(with_deadline(self.settings.deadline, call).await?)
    }

    /// Load an onboarded player.
    ///
    /// # Errors
    ///
    /// [`ActionError::NotFound`] if the user has never been onboarded.
    pub async fn player(&self, user: UserId) -> Result<Player, ActionError> {
        self.call(self.store.get_player(user)).await
    }

    /// Push a committed player to its owner.
    async fn notify_player(&self, reason: PlayerUpdateReason, player: Player) {
        let user = player.user_id;
        let event = PlayerUpdateEvent::new(reason, player);
        self.hub.send(user, Notification::PlayerUpdate(event)).await;
    }

    /// Commit a single-player event and push the result.
    async fn commit_player(
        &self,
        old: Player,
        event: PlayerUpdateEvent,
    ) -> Result<Player, ActionError> {
        let user = old.user_id;
        let swap = Swap::new(old, event.player);
        let committed = self.call(self.store.update_player(swap)).await?;
        tracing::debug!(user_id = %user, reason = ?event.reason, "Player updated");
        self.notify_player(event.reason, committed.clone()).await;
        Ok(committed)
    }
}
