use crate::draw::{shuffle, RandomSource};
use crate::error::{WheelError, WheelResult};
use crate::types::Participant;

/// Slot the chosen participant always occupies on the drawn wheel.
pub const WINNER_SLOT: usize = 0;

/// Labels in the order the wheel shows them: the chosen participant first,
/// everyone else shuffled behind. The input pool is left untouched.
pub fn presentation_order<R: RandomSource + ?Sized>(
    pool: &[Participant],
    winner_index: usize,
    rng: &mut R,
) -> WheelResult<Vec<String>> {
    if pool.is_empty() {
        return Err(WheelError::invalid("presentation order needs a non-empty pool"));
    }
    if winner_index >= pool.len() {
        return Err(WheelError::invalid(format!(
            "winner index {winner_index} out of range for pool of {}",
            pool.len()
        )));
    }

    let mut others: Vec<String> = pool
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != winner_index)
        .map(|(_, p)| p.label.clone())
        .collect();
    shuffle(&mut others, rng);

    let mut order = Vec::with_capacity(pool.len());
    order.push(pool[winner_index].label.clone());
    order.extend(others);
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::SeededRandom;
    use std::collections::HashMap;

    fn labels_pool(labels: &[&str]) -> Vec<Participant> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| Participant::new(i.to_string(), *l))
            .collect()
    }

    #[test]
    fn test_winner_first_and_multiset_kept() {
        let mut rng = SeededRandom::new(5);
        let pool = labels_pool(&["A", "B", "C", "D", "E", "F", "G", "H"]);
        for winner_index in 0..pool.len() {
            let order = presentation_order(&pool, winner_index, &mut rng).unwrap();
            assert_eq!(order.len(), pool.len());
            assert_eq!(order[WINNER_SLOT], pool[winner_index].label);

            let mut rest: Vec<String> = order[1..].to_vec();
            rest.sort();
            let mut expected: Vec<String> = pool
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != winner_index)
                .map(|(_, p)| p.label.clone())
                .collect();
            expected.sort();
            assert_eq!(rest, expected);
        }
    }

    #[test]
    fn test_duplicate_labels_survive() {
        let mut rng = SeededRandom::new(11);
        let pool = labels_pool(&["Sam", "Sam", "Alex"]);
        let order = presentation_order(&pool, 2, &mut rng).unwrap();
        assert_eq!(order[0], "Alex");
        assert_eq!(order.iter().filter(|l| *l == "Sam").count(), 2);
    }

    #[test]
    fn test_pool_not_mutated() {
        let mut rng = SeededRandom::new(3);
        let pool = labels_pool(&["A", "B", "C", "D"]);
        let before = pool.clone();
        presentation_order(&pool, 1, &mut rng).unwrap();
        assert_eq!(pool, before);
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut rng = SeededRandom::new(3);
        assert!(presentation_order(&[], 0, &mut rng).unwrap_err().is_invalid_input());
        let pool = labels_pool(&["A", "B"]);
        assert!(presentation_order(&pool, 2, &mut rng).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_single_entry_pool() {
        let mut rng = SeededRandom::new(3);
        let pool = labels_pool(&["Solo"]);
        assert_eq!(presentation_order(&pool, 0, &mut rng).unwrap(), vec!["Solo".to_string()]);
    }

    #[test]
    fn test_other_permutations_roughly_even() {
        // 3 non-winners -> 6 permutations, each should show up about 1/6 of the time.
        let mut rng = SeededRandom::new(2024);
        let pool = labels_pool(&["W", "X", "Y", "Z"]);
        let trials = 60_000;
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();
        for _ in 0..trials {
            let order = presentation_order(&pool, 0, &mut rng).unwrap();
            *counts.entry(order[1..].to_vec()).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        let expected = trials as f64 / 6.0;
        for (perm, count) in counts {
            let ratio = count as f64 / expected;
            assert!((0.9..1.1).contains(&ratio), "{perm:?} seen {count} times");
        }
    }
}
