//! Trading system for the Bermudia market.
//!
//! Implements the offer lifecycle:
//!
//! 1. [`make_offer`] -- a player posts an exchange; the offered side is
//!    deducted immediately and held in escrow by the offer.
//! 2. [`accept_offer`] -- another player pays the requested side and
//!    receives the escrow.
//! 3. [`delete_offer`] -- the offerer withdraws and gets the escrow back.
//!
//! # Conservation
//!
//! Acceptance is a two-party move plus an escrow release. It is verified
//! with [`verify_transfer`] before any result is handed back, so an engine
//! bug surfaces as a rule violation instead of a committed imbalance.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bermudia_ledger::{ConservationResult, deduct, induct, normalize_tradable, verify_transfer};
use bermudia_types::{
    Cost, Entity, Player, PlayerUpdateEvent, PlayerUpdateReason, TradeOffer, TradeOfferId,
};

use crate::config::EconomyConfig;
use crate::error::{GameError, Violation};
use crate::player::{tradable, with_resources};

// ---------------------------------------------------------------------------
// Offer creation
// ---------------------------------------------------------------------------

/// Feasibility of posting another offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferCheck {
    /// Whether an offer may be posted.
    pub feasible: bool,
    /// Why not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Violation>,
    /// Offers the player currently has open.
    pub open_offers: u32,
    /// The configured cap.
    pub max_open_offers: u32,
    /// What the player could put on the table.
    pub tradable: Cost,
}

/// Report whether `player` may post another offer.
pub fn make_offer_check(player: &Player, open_offers: u32, config: &EconomyConfig) -> OfferCheck {
    let reason = (open_offers >= config.max_open_offers).then_some(Violation::OfferLimitReached {
        cap: config.max_open_offers,
    });
    OfferCheck {
        feasible: reason.is_none(),
        reason,
        open_offers,
        max_open_offers: config.max_open_offers,
        tradable: tradable(player),
    }
}

/// Post an offer, moving `offered` into escrow.
///
/// Both sides are normalized first (zero lines dropped, duplicates merged,
/// negative, untradable and empty sides rejected).
pub fn make_offer(
    player: &Player,
    open_offers: u32,
    offered: &Cost,
    requested: &Cost,
    config: &EconomyConfig,
    now: DateTime<Utc>,
) -> Result<(PlayerUpdateEvent, TradeOffer), GameError> {
    if let Some(reason) = make_offer_check(player, open_offers, config).reason {
        return Err(reason.into());
    }

    let offered = normalize_tradable(offered)?;
    let requested = normalize_tradable(requested)?;
    let resources = deduct(&player.resources, &offered)?;

    let offer = TradeOffer {
        id: TradeOfferId::new(),
        offerer: player.user_id,
        offered,
        requested,
        created_at: now,
        deleted_at: None,
    };
    let event = PlayerUpdateEvent::new(
        PlayerUpdateReason::MakeOffer,
        with_resources(player, resources),
    );
    Ok((event, offer))
}

// ---------------------------------------------------------------------------
// Acceptance
// ---------------------------------------------------------------------------

/// Check that `acceptor` may take `offer`.
pub fn is_acceptable(acceptor: &Player, offer: &TradeOffer) -> Result<(), GameError> {
    if !offer.is_open() {
        return Err(Violation::OfferAlreadyDeleted.into());
    }
    if acceptor.user_id == offer.offerer {
        return Err(Violation::SelfTrade.into());
    }
    deduct(&acceptor.resources, &offer.requested)?;
    Ok(())
}

/// Everything an accepted trade changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedTrade {
    /// The acceptor after paying and receiving.
    pub acceptor: PlayerUpdateEvent,
    /// The offerer after receiving the requested side.
    pub offerer: PlayerUpdateEvent,
    /// The offer with its tombstone set.
    pub offer: TradeOffer,
}

/// Execute `offer` between `acceptor` and `offerer`.
///
/// The acceptor pays `requested`, which goes to the offerer; the escrowed
/// `offered` goes to the acceptor.
pub fn accept_offer(
    acceptor: &Player,
    offerer: &Player,
    offer: &TradeOffer,
    now: DateTime<Utc>,
) -> Result<AcceptedTrade, GameError> {
    is_acceptable(acceptor, offer)?;
    if offerer.user_id != offer.offerer {
        return Err(GameError::not_found(Entity::Player, offer.offerer));
    }

    let acceptor_after = induct(&deduct(&acceptor.resources, &offer.requested)?, &offer.offered);
    let offerer_after = induct(&offerer.resources, &offer.requested);

    if let ConservationResult::Anomaly(anomaly) = verify_transfer(
        "accept offer",
        &[acceptor.resources, offerer.resources],
        &[&offer.offered],
        &[acceptor_after, offerer_after],
        &[],
    ) {
        return Err(Violation::Unbalanced {
            message: anomaly.message,
        }
        .into());
    }

    Ok(AcceptedTrade {
        acceptor: PlayerUpdateEvent::new(
            PlayerUpdateReason::AcceptOffer,
            with_resources(acceptor, acceptor_after),
        ),
        offerer: PlayerUpdateEvent::new(
            PlayerUpdateReason::OwnOfferAccepted,
            with_resources(offerer, offerer_after),
        ),
        offer: TradeOffer {
            deleted_at: Some(now),
            ..offer.clone()
        },
    })
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// Withdraw `offer`, returning the escrow to its owner.
pub fn delete_offer(
    player: &Player,
    offer: &TradeOffer,
    now: DateTime<Utc>,
) -> Result<(PlayerUpdateEvent, TradeOffer), GameError> {
    if player.user_id != offer.offerer {
        return Err(Violation::NotOfferOwner.into());
    }
    if !offer.is_open() {
        return Err(Violation::OfferAlreadyDeleted.into());
    }

    let event = PlayerUpdateEvent::new(
        PlayerUpdateReason::OwnOfferDeleted,
        with_resources(player, induct(&player.resources, &offer.offered)),
    );
    let deleted = TradeOffer {
        deleted_at: Some(now),
        ..offer.clone()
    };
    Ok((event, deleted))
}
