//! The trade market.
//!
//! Posting an offer moves the offered side into escrow, acceptance is one
//! change set over the tombstone and both players, and withdrawal refunds
//! the escrow.

use serde::Serialize;

use bermudia_db::{GameStore, Swap};
use bermudia_players::{self as engine, OfferCheck};
use bermudia_types::{
    Cost, InboxContent, Notification, OfferScope, TradeOffer, TradeOfferId, UserId,
    store_timestamp,
};

use super::GameService;
use crate::error::ActionError;

/// An open offer as seen by one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferView {
    /// The offer.
    #[serde(flatten)]
    pub offer: TradeOffer,
    /// Whether the viewer could accept it right now.
    pub acceptable: bool,
}

impl<S: GameStore> GameService<S> {
    /// Report whether `user` may post another offer, with what they hold.
    pub async fn offer_check(&self, user: UserId) -> Result<OfferCheck, ActionError> {
        let player = self.player(user).await?;
        let open = self.call(self.store.count_open_offers(user)).await?;
        Ok(engine::make_offer_check(&player, open, &self.settings.economy))
    }

    /// Open offers under `scope`, newest first, annotated for `viewer`.
    pub async fn list_offers(
        &self,
        viewer: UserId,
        scope: OfferScope,
    ) -> Result<Vec<OfferView>, ActionError> {
        let player = self.player(viewer).await?;
        let offers = self.call(self.store.list_open_offers(viewer, scope)).await?;
        Ok(offers
            .into_iter()
            .map(|offer| OfferView {
                acceptable: engine::is_acceptable(&player, &offer).is_ok(),
                offer,
            })
            .collect())
    }

    /// Post an offer, escrowing `offered`.
    pub async fn make_offer(
        &self,
        user: UserId,
        offered: &Cost,
        requested: &Cost,
    ) -> Result<TradeOffer, ActionError> {
        let player = self.player(user).await?;
        let open = self.call(self.store.count_open_offers(user)).await?;
        let (event, offer) = engine::make_offer(
            &player,
            open,
            offered,
            requested,
            &self.settings.economy,
            store_timestamp(),
        )?;
        let (offer, committed) = self
            .call(self.store.create_offer(offer, Swap::new(player, event.player)))
            .await?;
        tracing::info!(user_id = %user, offer_id = %offer.id, "Offer posted");
        self.notify_player(event.reason, committed).await;
        Ok(offer)
    }

    /// Accept `id` on behalf of `user`.
    ///
    /// The tombstone and both players commit together; a conflict on any
    /// of them leaves all three untouched.
    pub async fn accept_offer(
        &self,
        user: UserId,
        id: TradeOfferId,
    ) -> Result<TradeOffer, ActionError> {
        let offer = self.call(self.store.get_offer(id)).await?;
        let acceptor = self.player(user).await?;
        engine::is_acceptable(&acceptor, &offer)?;
        let offerer = self.player(offer.offerer).await?;

        let trade = engine::accept_offer(&acceptor, &offerer, &offer, store_timestamp())?;
        let (closed, acceptor_now, offerer_now) = self
            .call(self.store.accept_offer(
                Swap::new(offer, trade.offer),
                Swap::new(acceptor, trade.acceptor.player),
                Swap::new(offerer, trade.offerer.player),
            ))
            .await?;
        tracing::info!(
            offer_id = %closed.id,
            acceptor = %user,
            offerer = %closed.offerer,
            "Offer accepted"
        );

        self.notify_player(trade.acceptor.reason, acceptor_now).await;
        self.notify_player(trade.offerer.reason, offerer_now).await;
        self.hub
            .send(
                closed.offerer,
                Notification::OwnOfferAccepted {
                    offer_id: closed.id,
                    accepted_by: user,
                },
            )
            .await;
        self.deliver(
            closed.offerer,
            InboxContent::OwnOfferAccepted {
                offer: closed.clone(),
                accepted_by: user,
            },
        )
        .await;
        Ok(closed)
    }

    /// Withdraw an own offer and refund its escrow.
    pub async fn delete_offer(
        &self,
        user: UserId,
        id: TradeOfferId,
    ) -> Result<TradeOffer, ActionError> {
        let offer = self.call(self.store.get_offer(id)).await?;
        let player = self.player(user).await?;
        let (event, deleted) = engine::delete_offer(&player, &offer, store_timestamp())?;
        let (deleted, committed) = self
            .call(self.store.delete_offer(
                Swap::new(offer, deleted),
                Swap::new(player, event.player),
            ))
            .await?;
        tracing::info!(user_id = %user, offer_id = %deleted.id, "Offer withdrawn");
        self.notify_player(event.reason, committed).await;
        Ok(deleted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bermudia_players::{EconomyConfig, Violation};
    use bermudia_types::{Player, PlayerUpdateEvent, PlayerUpdateReason, ResourceKind};

    use super::*;
    use crate::hub::Outgoing;
    use crate::service::fixtures::{service_with, settings};
    use crate::service::ServiceSettings;

    type Service = GameService<bermudia_db::MemoryStore>;

    fn small_wallets() -> Service {
        service_with(ServiceSettings {
            economy: EconomyConfig {
                initial_coin: 10,
                initial_keys: 2,
                ..EconomyConfig::default()
            },
            ..settings()
        })
    }

    fn coins_for_keys() -> (Cost, Cost) {
        (
            Cost::of(ResourceKind::Coin, 3),
            Cost::of(ResourceKind::BlueKey, 2),
        )
    }

    fn total(players: &[&Player], kind: ResourceKind) -> i32 {
        players
            .iter()
            .map(|p| p.resources.amount(kind))
            .fold(0, i32::saturating_add)
    }

    #[tokio::test]
    async fn trade_moves_resources_and_conserves_totals() {
        let svc = small_wallets();
        let offerer = svc.onboard(UserId(1)).await.unwrap();
        let acceptor = svc.onboard(UserId(2)).await.unwrap();
        let before = [&offerer, &acceptor];
        let coin_before = total(&before, ResourceKind::Coin);
        let blue_before = total(&before, ResourceKind::BlueKey);

        let (offered, requested) = coins_for_keys();
        let offer = svc.make_offer(UserId(1), &offered, &requested).await.unwrap();
        assert_eq!(svc.player(UserId(1)).await.unwrap().resources.coin, 7);

        let mut offerer_feed = svc.hub().register(UserId(1));
        let closed = svc.accept_offer(UserId(2), offer.id).await.unwrap();
        assert!(!closed.is_open());

        let offerer = svc.player(UserId(1)).await.unwrap();
        let acceptor = svc.player(UserId(2)).await.unwrap();
        assert_eq!(acceptor.resources.coin, 13);
        assert_eq!(acceptor.resources.blue_key, 0);
        assert_eq!(offerer.resources.coin, 7);
        assert_eq!(offerer.resources.blue_key, 4);

        let after = [&offerer, &acceptor];
        assert_eq!(total(&after, ResourceKind::Coin), coin_before);
        assert_eq!(total(&after, ResourceKind::BlueKey), blue_before);

        assert!(matches!(
            offerer_feed.receiver.try_recv(),
            Ok(Outgoing::Notify(Notification::PlayerUpdate(PlayerUpdateEvent {
                reason: PlayerUpdateReason::OwnOfferAccepted,
                ..
            })))
        ));
        assert_eq!(
            offerer_feed.receiver.try_recv().ok(),
            Some(Outgoing::Notify(Notification::OwnOfferAccepted {
                offer_id: offer.id,
                accepted_by: UserId(2),
            }))
        );

        let inbox = svc.inbox(UserId(1), None, None).await.unwrap();
        assert!(matches!(
            inbox.first().map(|m| &m.content),
            Some(InboxContent::OwnOfferAccepted { offer: kept, accepted_by: UserId(2) })
                if kept.id == offer.id
        ));
        assert!(svc.inbox(UserId(2), None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn eleventh_open_offer_is_rejected_with_the_cap() {
        let svc = small_wallets();
        svc.onboard(UserId(1)).await.unwrap();
        let one_coin = Cost::of(ResourceKind::Coin, 1);
        let one_key = Cost::of(ResourceKind::RedKey, 1);
        for _ in 0..10 {
            svc.make_offer(UserId(1), &one_coin, &one_key).await.unwrap();
        }

        let check = svc.offer_check(UserId(1)).await.unwrap();
        assert!(!check.feasible);
        assert_eq!(check.open_offers, 10);

        let err = svc
            .make_offer(UserId(1), &one_coin, &one_key)
            .await
            .unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::OfferLimitReached { cap: 10 }));
        assert_eq!(svc.player(UserId(1)).await.unwrap().resources.coin, 0);
    }

    #[tokio::test]
    async fn withdrawn_offers_refund_and_cannot_be_accepted() {
        let svc = small_wallets();
        svc.onboard(UserId(1)).await.unwrap();
        svc.onboard(UserId(2)).await.unwrap();
        let (offered, requested) = coins_for_keys();
        let offer = svc.make_offer(UserId(1), &offered, &requested).await.unwrap();

        let err = svc.delete_offer(UserId(2), offer.id).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::NotOfferOwner));

        svc.delete_offer(UserId(1), offer.id).await.unwrap();
        assert_eq!(svc.player(UserId(1)).await.unwrap().resources.coin, 10);

        let err = svc.accept_offer(UserId(2), offer.id).await.unwrap_err();
        assert_eq!(err.violation(), Some(&Violation::OfferAlreadyDeleted));
    }

    #[tokio::test]
    async fn listing_marks_what_the_viewer_can_accept() {
        let svc = small_wallets();
        svc.onboard(UserId(1)).await.unwrap();
        svc.onboard(UserId(2)).await.unwrap();
        let (offered, requested) = coins_for_keys();
        let affordable = svc.make_offer(UserId(1), &offered, &requested).await.unwrap();
        let too_dear = svc
            .make_offer(UserId(1), &offered, &Cost::of(ResourceKind::GoldenKey, 9))
            .await
            .unwrap();

        let seen = svc.list_offers(UserId(2), OfferScope::Others).await.unwrap();
        let flags: Vec<(TradeOfferId, bool)> =
            seen.iter().map(|v| (v.offer.id, v.acceptable)).collect();
        assert_eq!(flags, vec![(too_dear.id, false), (affordable.id, true)]);

        let own = svc.list_offers(UserId(1), OfferScope::Mine).await.unwrap();
        assert_eq!(own.len(), 2);
        assert!(own.iter().all(|v| !v.acceptable));
    }
}
