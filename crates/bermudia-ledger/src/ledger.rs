//! The four pure operations over a [`ResourceVector`].
//!
//! Costs are applied line by line in the order they are written, so a cost
//! with duplicate kinds behaves like the sum of its lines.

use bermudia_types::{Cost, CostItem, ResourceKind, ResourceVector};

use crate::LedgerError;

/// Whether `vector` can pay `cost` without any quantity going negative.
pub fn can_afford(vector: &ResourceVector, cost: &Cost) -> bool {
    deduct(vector, cost).is_ok()
}

/// Subtract `cost` from `vector`.
///
/// All-or-nothing: on error the caller still holds the untouched input,
/// because the result is computed on a copy.
///
/// # Errors
///
/// - [`LedgerError::Insufficient`] if any line would take its quantity
///   below zero.
/// - [`LedgerError::Overflow`] if a line with a negative amount overflows.
pub fn deduct(vector: &ResourceVector, cost: &Cost) -> Result<ResourceVector, LedgerError> {
    let mut next = *vector;
    for item in cost.iter() {
        let slot = next.slot_mut(item.kind);
        let remaining = slot
            .checked_sub(item.amount)
            .ok_or(LedgerError::Overflow { kind: item.kind })?;
        if remaining < 0 {
            return Err(LedgerError::Insufficient {
                kind: item.kind,
                required: item.amount,
                available: *slot,
            });
        }
        *slot = remaining;
    }
    Ok(next)
}

/// Add `cost` to `vector`.
///
/// Infallible. Quantities saturate instead of overflowing, never drop
/// below zero, and fuel is clamped to the tank capacity.
pub fn induct(vector: &ResourceVector, cost: &Cost) -> ResourceVector {
    let mut next = *vector;
    for item in cost.iter() {
        let slot = next.slot_mut(item.kind);
        *slot = slot.saturating_add(item.amount).max(0);
    }
    next.fuel = next.fuel.min(next.fuel_cap.max(0));
    next
}

/// The cost that turns `old` into `updated` (`updated - old` per kind).
///
/// Lines come out in canonical kind order and zero changes are omitted,
/// so `diff(v, deduct(v, c)) == -c` for any cost already in that form.
pub fn diff(old: &ResourceVector, updated: &ResourceVector) -> Cost {
    let items = ResourceKind::ALL
        .into_iter()
        .filter_map(|kind| {
            let delta = updated.amount(kind).saturating_sub(old.amount(kind));
            (delta != 0).then_some(CostItem::new(kind, delta))
        })
        .collect();
    Cost { items }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet() -> ResourceVector {
        ResourceVector {
            fuel: 5,
            fuel_cap: 15,
            coin: 10,
            blue_key: 2,
            red_key: 1,
            golden_key: 0,
            master_key: 0,
        }
    }

    #[test]
    fn deduct_applies_every_line() {
        let cost = Cost::from_pairs(&[(ResourceKind::Coin, 3), (ResourceKind::BlueKey, 2)]);
        let after = deduct(&wallet(), &cost);
        assert_eq!(
            after,
            Ok(ResourceVector {
                coin: 7,
                blue_key: 0,
                ..wallet()
            })
        );
    }

    #[test]
    fn deduct_is_all_or_nothing() {
        // First line fits, second does not: nothing may be deducted.
        let cost = Cost::from_pairs(&[(ResourceKind::Coin, 3), (ResourceKind::GoldenKey, 1)]);
        let before = wallet();
        let result = deduct(&before, &cost);
        assert_eq!(
            result,
            Err(LedgerError::Insufficient {
                kind: ResourceKind::GoldenKey,
                required: 1,
                available: 0,
            })
        );
        assert_eq!(before, wallet());
    }

    #[test]
    fn duplicate_lines_accumulate() {
        let cost = Cost::from_pairs(&[(ResourceKind::Coin, 6), (ResourceKind::Coin, 6)]);
        assert!(!can_afford(&wallet(), &cost));
        let cost = Cost::from_pairs(&[(ResourceKind::Coin, 5), (ResourceKind::Coin, 5)]);
        assert!(can_afford(&wallet(), &cost));
    }

    #[test]
    fn deduct_overflow_is_reported() {
        let cost = Cost::of(ResourceKind::Coin, i32::MIN);
        assert_eq!(
            deduct(&wallet(), &cost),
            Err(LedgerError::Overflow {
                kind: ResourceKind::Coin
            })
        );
    }

    #[test]
    fn diff_of_deduction_is_negated_cost() {
        let cost = Cost::from_pairs(&[
            (ResourceKind::Fuel, 1),
            (ResourceKind::Coin, 4),
            (ResourceKind::RedKey, 1),
        ]);
        let before = wallet();
        let after = deduct(&before, &cost).unwrap_or_default();
        assert_eq!(Some(diff(&before, &after)), cost.negated());
    }

    #[test]
    fn induct_undoes_deduct() {
        let cost = Cost::from_pairs(&[(ResourceKind::Fuel, 2), (ResourceKind::BlueKey, 1)]);
        let before = wallet();
        let after = deduct(&before, &cost).unwrap_or_default();
        assert_eq!(induct(&after, &cost), before);
    }

    #[test]
    fn induct_clamps_fuel_to_capacity() {
        let after = induct(&wallet(), &Cost::of(ResourceKind::Fuel, 100));
        assert_eq!(after.fuel, 15);
    }

    #[test]
    fn induct_never_goes_negative() {
        let after = induct(&wallet(), &Cost::of(ResourceKind::Coin, -50));
        assert_eq!(after.coin, 0);
    }

    #[test]
    fn diff_of_identical_vectors_is_empty() {
        assert!(diff(&wallet(), &wallet()).is_empty());
    }

    #[test]
    fn diff_lists_kinds_in_canonical_order() {
        let updated = ResourceVector {
            master_key: 1,
            fuel: 4,
            ..wallet()
        };
        let kinds: Vec<ResourceKind> = diff(&wallet(), &updated).iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![ResourceKind::Fuel, ResourceKind::MasterKey]);
    }
}
