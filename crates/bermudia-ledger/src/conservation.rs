//! Conservation verification for multi-party moves.
//!
//! Trades move resources between two players and an escrow (the offered
//! cost of an open offer). Such a move must neither create nor destroy
//! anything: for every kind, the sum over all participants before the move
//! equals the sum after it.
//!
//! Each engine builds its results from [`deduct`](crate::deduct) and
//! [`induct`](crate::induct) on the same costs, so the check passes by
//! construction. It runs after every trade to catch future engine bugs.

use std::collections::BTreeMap;

use bermudia_types::{Cost, ResourceKind, ResourceVector};

use crate::LedgerAnomaly;

/// The result of a conservation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConservationResult {
    /// Every kind balances.
    Balanced,
    /// One or more kinds were created or destroyed.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the move balanced.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Per-kind totals over a set of vectors and escrows.
type Totals = BTreeMap<ResourceKind, i64>;

/// Verify that a move between `before` and `after` conserves every kind.
///
/// `escrow_before` and `escrow_after` hold resources that are in flight
/// (for example the offered side of an open trade offer). Fuel capacity is
/// not a resource and is ignored.
pub fn verify_transfer(
    context: &str,
    before: &[ResourceVector],
    escrow_before: &[&Cost],
    after: &[ResourceVector],
    escrow_after: &[&Cost],
) -> ConservationResult {
    let totals_before = match totals(before, escrow_before) {
        Ok(t) => t,
        Err(kind) => return overflow_anomaly(context, kind),
    };
    let totals_after = match totals(after, escrow_after) {
        Ok(t) => t,
        Err(kind) => return overflow_anomaly(context, kind),
    };

    let mut imbalances = BTreeMap::new();
    for kind in ResourceKind::ALL {
        let b = totals_before.get(&kind).copied().unwrap_or(0);
        let a = totals_after.get(&kind).copied().unwrap_or(0);
        if a != b {
            imbalances.insert(kind, (b, a));
        }
    }

    if imbalances.is_empty() {
        ConservationResult::Balanced
    } else {
        let count = imbalances.len();
        let anomaly = LedgerAnomaly {
            context: context.to_owned(),
            imbalances,
            message: format!("LEDGER_ANOMALY in {context}: {count} resource kind(s) not conserved"),
        };
        tracing::warn!(context, count, "{anomaly}");
        ConservationResult::Anomaly(anomaly)
    }
}

fn totals(vectors: &[ResourceVector], escrows: &[&Cost]) -> Result<Totals, ResourceKind> {
    let mut sums = Totals::new();
    let held = vectors
        .iter()
        .flat_map(|v| ResourceKind::ALL.into_iter().map(move |kind| (kind, v.amount(kind))));
    let escrowed = escrows
        .iter()
        .flat_map(|c| c.iter().map(|item| (item.kind, item.amount)));

    for (kind, amount) in held.chain(escrowed) {
        let sum = sums.entry(kind).or_insert(0);
        *sum = sum.checked_add(i64::from(amount)).ok_or(kind)?;
    }
    Ok(sums)
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(context: &str, kind: ResourceKind) -> ConservationResult {
    let mut imbalances = BTreeMap::new();
    imbalances.insert(kind, (0, 0));
    ConservationResult::Anomaly(LedgerAnomaly {
        context: context.to_owned(),
        imbalances,
        message: format!("LEDGER_ANOMALY in {context}: arithmetic overflow while summing {kind}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{deduct, induct};

    fn holder(coin: i32, blue_key: i32) -> ResourceVector {
        ResourceVector {
            fuel: 10,
            fuel_cap: 15,
            coin,
            blue_key,
            ..ResourceVector::default()
        }
    }

    #[test]
    fn posting_an_offer_moves_resources_into_escrow() {
        let offered = Cost::of(ResourceKind::Coin, 3);
        let before = holder(10, 0);
        let after = deduct(&before, &offered).unwrap_or_default();
        let result = verify_transfer("make offer", &[before], &[], &[after], &[&offered]);
        assert!(result.is_balanced());
    }

    #[test]
    fn accepted_trade_balances() {
        let offered = Cost::of(ResourceKind::Coin, 3);
        let requested = Cost::of(ResourceKind::BlueKey, 1);
        let offerer = holder(7, 0);
        let acceptor = holder(0, 2);

        let acceptor_after = induct(&deduct(&acceptor, &requested).unwrap_or_default(), &offered);
        let offerer_after = induct(&offerer, &requested);

        let result = verify_transfer(
            "accept offer",
            &[offerer, acceptor],
            &[&offered],
            &[offerer_after, acceptor_after],
            &[],
        );
        assert_eq!(result, ConservationResult::Balanced);
    }

    #[test]
    fn created_resources_are_reported() {
        let before = holder(10, 0);
        let after = holder(12, 0);
        match verify_transfer("bogus", &[before], &[], &[after], &[]) {
            ConservationResult::Anomaly(anomaly) => {
                assert_eq!(anomaly.context, "bogus");
                assert_eq!(anomaly.imbalances.get(&ResourceKind::Coin), Some(&(10, 12)));
                assert_eq!(anomaly.imbalances.len(), 1);
            }
            ConservationResult::Balanced => panic!("expected an anomaly"),
        }
    }

    #[test]
    fn sums_do_not_overflow_i32() {
        let rich = holder(i32::MAX, 0);
        let result = verify_transfer("rich", &[rich, rich], &[], &[rich, rich], &[]);
        assert!(result.is_balanced());
    }
}
