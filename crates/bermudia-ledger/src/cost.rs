//! Parsing and normalization of cost lists.
//!
//! Costs arrive from clients as loose lists: kinds may repeat, amounts may
//! be zero, and kind names are plain strings. Before a cost is escrowed or
//! requested on the market it is brought into a single canonical form.

use std::collections::BTreeMap;

use bermudia_types::{Cost, CostItem, ResourceKind};

use crate::LedgerError;

/// Build a cost from raw `(kind name, amount)` pairs.
///
/// # Errors
///
/// Returns [`LedgerError::UnknownKind`] on the first name that is not a
/// resource kind.
pub fn parse_cost(pairs: &[(&str, i32)]) -> Result<Cost, LedgerError> {
    let items = pairs
        .iter()
        .map(|&(name, amount)| Ok(CostItem::new(name.parse()?, amount)))
        .collect::<Result<Vec<_>, LedgerError>>()?;
    Ok(Cost { items })
}

/// Normalize a cost that is about to be offered or requested in a trade.
///
/// - zero lines are dropped
/// - negative lines are rejected
/// - untradable kinds are rejected
/// - duplicate kinds are merged
/// - the result is sorted in tradable order and must not be empty
///
/// # Errors
///
/// [`LedgerError::NegativeAmount`], [`LedgerError::Untradable`],
/// [`LedgerError::Overflow`] while merging, or [`LedgerError::EmptyCost`].
pub fn normalize_tradable(cost: &Cost) -> Result<Cost, LedgerError> {
    let mut merged: BTreeMap<ResourceKind, i32> = BTreeMap::new();

    for item in cost.iter() {
        if item.amount == 0 {
            continue;
        }
        if item.amount < 0 {
            return Err(LedgerError::NegativeAmount {
                kind: item.kind,
                amount: item.amount,
            });
        }
        if !item.kind.is_tradable() {
            return Err(LedgerError::Untradable { kind: item.kind });
        }
        let total = merged.entry(item.kind).or_insert(0);
        *total = total
            .checked_add(item.amount)
            .ok_or(LedgerError::Overflow { kind: item.kind })?;
    }

    if merged.is_empty() {
        return Err(LedgerError::EmptyCost);
    }

    let items = ResourceKind::TRADABLE
        .into_iter()
        .filter_map(|kind| merged.get(&kind).map(|&amount| CostItem::new(kind, amount)))
        .collect();
    Ok(Cost { items })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_kinds() {
        let result = parse_cost(&[("coin", 3), ("silverKey", 1)]);
        assert!(matches!(result, Err(LedgerError::UnknownKind(_))));
    }

    #[test]
    fn parse_keeps_order_and_sign() {
        let cost = parse_cost(&[("redKey", -1), ("coin", 3)]);
        assert_eq!(
            cost,
            Ok(Cost::from_pairs(&[
                (ResourceKind::RedKey, -1),
                (ResourceKind::Coin, 3)
            ]))
        );
    }

    #[test]
    fn normalize_merges_sorts_and_drops_zeros() {
        let raw = Cost::from_pairs(&[
            (ResourceKind::GoldenKey, 1),
            (ResourceKind::Coin, 0),
            (ResourceKind::BlueKey, 2),
            (ResourceKind::GoldenKey, 2),
        ]);
        assert_eq!(
            normalize_tradable(&raw),
            Ok(Cost::from_pairs(&[
                (ResourceKind::BlueKey, 2),
                (ResourceKind::GoldenKey, 3)
            ]))
        );
    }

    #[test]
    fn normalize_rejects_negative_amounts() {
        let raw = Cost::of(ResourceKind::Coin, -3);
        assert_eq!(
            normalize_tradable(&raw),
            Err(LedgerError::NegativeAmount {
                kind: ResourceKind::Coin,
                amount: -3
            })
        );
    }

    #[test]
    fn normalize_rejects_untradable_kinds() {
        for kind in [ResourceKind::Fuel, ResourceKind::MasterKey] {
            assert_eq!(
                normalize_tradable(&Cost::of(kind, 1)),
                Err(LedgerError::Untradable { kind })
            );
        }
    }

    #[test]
    fn normalize_rejects_empty_costs() {
        assert_eq!(normalize_tradable(&Cost::new()), Err(LedgerError::EmptyCost));
        let zeros = Cost::from_pairs(&[(ResourceKind::Coin, 0), (ResourceKind::RedKey, 0)]);
        assert_eq!(normalize_tradable(&zeros), Err(LedgerError::EmptyCost));
    }
}
