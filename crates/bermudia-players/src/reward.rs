//! Reward rolls: turning a coin worth into a random mix of keys.

use rand::Rng;

use bermudia_types::{Cost, CostItem, ResourceKind};

/// A reward kind with its coin worth and draw weight.
#[derive(Debug, Clone, Copy)]
struct RewardKind {
    kind: ResourceKind,
    worth: i32,
    weight: u32,
}

const REWARD_KINDS: [RewardKind; 4] = [
    RewardKind {
        kind: ResourceKind::Coin,
        worth: 1,
        weight: 40,
    },
    RewardKind {
        kind: ResourceKind::BlueKey,
        worth: 20,
        weight: 6,
    },
    RewardKind {
        kind: ResourceKind::RedKey,
        worth: 30,
        weight: 3,
    },
    RewardKind {
        kind: ResourceKind::GoldenKey,
        worth: 50,
        weight: 1,
    },
];

/// Coin worth of one unit of `kind`, for kinds that can be rewarded.
pub fn coin_worth(kind: ResourceKind) -> Option<i32> {
    REWARD_KINDS
        .iter()
        .find(|r| r.kind == kind)
        .map(|r| r.worth)
}

/// Roll a reward worth `worth` coins.
///
/// Draws weighted kinds that still fit the remaining worth until nothing
/// fits. When only coins fit, the remainder is paid in coins if
/// `allow_coins`, otherwise dropped. Lines come out in tradable order.
pub fn roll_reward<R: Rng + ?Sized>(worth: i32, allow_coins: bool, rng: &mut R) -> Cost {
    let mut counts = [0_i32; REWARD_KINDS.len()];
    let mut remaining = worth;

    loop {
        let fitting: Vec<(usize, &RewardKind)> = REWARD_KINDS
            .iter()
            .enumerate()
            .filter(|(_, r)| r.worth <= remaining)
            .collect();

        match fitting.as_slice() {
            [] => break,
            [(slot, only)] if only.kind == ResourceKind::Coin => {
                if allow_coins {
                    add(&mut counts, *slot, remaining);
                }
                break;
            }
            _ => {}
        }

        let total: u32 = fitting.iter().map(|(_, r)| r.weight).sum();
        let mut choice = rng.random_range(0..total);
        let Some(&(slot, pick)) = fitting.iter().find(|(_, r)| {
            let hit = choice < r.weight;
            choice = choice.saturating_sub(r.weight);
            hit
        }) else {
            break;
        };

        if pick.kind != ResourceKind::Coin || allow_coins {
            add(&mut counts, slot, 1);
        }
        remaining = remaining.saturating_sub(pick.worth);
    }

    let items = REWARD_KINDS
        .iter()
        .zip(counts)
        .filter(|&(_, n)| n > 0)
        .map(|(r, n)| CostItem::new(r.kind, n))
        .collect();
    Cost { items }
}

fn add(counts: &mut [i32], slot: usize, n: i32) {
    if let Some(count) = counts.get_mut(slot) {
        *count = count.saturating_add(n);
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn worth_of(cost: &Cost) -> i32 {
        cost.iter()
            .map(|i| coin_worth(i.kind).unwrap_or(0).saturating_mul(i.amount))
            .sum()
    }

    #[test]
    fn key_worths() {
        assert_eq!(coin_worth(ResourceKind::BlueKey), Some(20));
        assert_eq!(coin_worth(ResourceKind::RedKey), Some(30));
        assert_eq!(coin_worth(ResourceKind::GoldenKey), Some(50));
        assert_eq!(coin_worth(ResourceKind::Fuel), None);
    }

    #[test]
    fn rolls_with_coins_pay_the_exact_worth() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for worth in [0, 1, 19, 20, 45, 80, 200] {
            let reward = roll_reward(worth, true, &mut rng);
            assert_eq!(worth_of(&reward), worth);
        }
    }

    #[test]
    fn rolls_without_coins_pay_only_keys() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let reward = roll_reward(60, false, &mut rng);
            assert!(reward.iter().all(|i| i.kind != ResourceKind::Coin));
            assert!(worth_of(&reward) <= 60);
        }
    }

    #[test]
    fn small_worths_without_coins_pay_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(roll_reward(19, false, &mut rng).is_empty());
    }
}
