//! Draw engine tests: word reduction, dedup-advance draws, tier matching.

use super::*;
use alloc::vec::Vec;

fn words(values: &[u64]) -> Vec<RandomWord> {
    values.iter().map(|v| U256::from(*v)).collect()
}

// ——— Winning-set derivation ———————————————————————————————————————————————

#[test]
fn duplicate_raw_words_still_yield_distinct_mains() {
    // Raw words 0,0,2,3,68: the second 0 collides on 1 and advances to 2,
    // pushing the later candidates over their raw targets.
    let ws = words(&[0, 0, 2, 3, 68]);
    let drawn = draw_distinct(&ws, u32::from(constants::MAIN_NUMBER_MAX), 5);
    assert_eq!(drawn, [1, 2, 3, 4, 69]);
}

#[test]
fn collision_advance_wraps_from_range_end() {
    // Every word reduces to 69; successors wrap to the low end.
    let ws = words(&[68, 68, 68, 68, 68]);
    let drawn = draw_distinct(&ws, u32::from(constants::MAIN_NUMBER_MAX), 5);
    assert_eq!(drawn, [69, 1, 2, 3, 4]);
}

#[test]
fn derive_winning_set_uses_sixth_word_for_power() {
    let ws = words(&[0, 0, 2, 3, 68, 25]);
    let set = derive_winning_set(&ws).unwrap();
    assert_eq!(set.main, [1, 2, 3, 4, 69]);
    assert_eq!(set.power, 26); // 25 mod 26 + 1
}

#[test]
fn power_number_may_equal_a_main_number() {
    let ws = words(&[0, 1, 2, 3, 4, 0]);
    let set = derive_winning_set(&ws).unwrap();
    assert_eq!(set.main, [1, 2, 3, 4, 5]);
    assert_eq!(set.power, 1);
    assert!(set.main.contains(&set.power));
}

#[test]
fn derive_winning_set_rejects_short_word_vectors() {
    let ws = words(&[1, 2, 3, 4, 5]);
    assert_eq!(
        derive_winning_set(&ws),
        Err(DrawError::NotEnoughWords { needed: 6, got: 5 })
    );
}

#[test]
fn reduction_handles_full_width_words() {
    assert_eq!(reduce_word(&U256::from(137u32), 69), 69); // 137 mod 69 = 68
    for shift in [0usize, 64, 128, 200, 255] {
        let w = U256::one() << shift;
        let v = reduce_word(&w, 69);
        assert!((1..=69).contains(&v));
    }
    assert!((1..=26).contains(&reduce_word(&U256::MAX, 26)));
}

// ——— Generic deduped draw —————————————————————————————————————————————————

#[test]
fn draw_caps_at_range_when_count_exceeds_it() {
    let ws = words(&[0, 0, 0, 0, 0]);
    assert_eq!(draw_distinct(&ws, 3, 5), [1, 2, 3]);
}

#[test]
fn draw_returns_partial_result_when_words_run_short() {
    let ws = words(&[7]);
    assert_eq!(draw_distinct(&ws, 69, 5), [8]);
}

#[test]
fn empty_range_or_count_draws_nothing() {
    let ws = words(&[1, 2, 3]);
    assert!(draw_distinct(&ws, 0, 5).is_empty());
    assert!(draw_distinct(&ws, 10, 0).is_empty());
}

#[test]
fn referral_draw_dedups_and_respects_winner_count() {
    let ws = words(&[0, 0, 5, 5]);
    assert_eq!(derive_referral_winners(&ws, 10, 4), [1, 2, 6, 7]);
    assert_eq!(derive_referral_winners(&ws, 2, 5), [1, 2]);
    assert!(derive_referral_winners(&ws, 0, 4).is_empty());
}

#[test]
fn random_words_always_yield_distinct_mains() {
    use alloc::collections::BTreeSet;
    use rand::Rng;

    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let ws: Vec<RandomWord> = (0..6)
            .map(|_| U256::from_big_endian(&rng.gen::<[u8; 32]>()))
            .collect();
        let set = derive_winning_set(&ws).unwrap();
        let mut seen = BTreeSet::new();
        for n in set.main {
            assert!((1..=constants::MAIN_NUMBER_MAX).contains(&n));
            assert!(seen.insert(n), "duplicate main number {n}");
        }
        assert!((1..=constants::POWER_NUMBER_MAX).contains(&set.power));
    }
}

// ——— Tier matching ————————————————————————————————————————————————————————

fn winning() -> WinningSet {
    WinningSet {
        main: [10, 20, 30, 40, 50],
        power: 7,
    }
}

#[test]
fn tier_table_is_exact() {
    let w = winning();
    assert_eq!(match_tier(&[10, 20, 30, 40, 50], 7, &w), VictoryTier::Tier5Plus);
    assert_eq!(match_tier(&[10, 20, 30, 40, 50], 8, &w), VictoryTier::Tier5);
    assert_eq!(match_tier(&[10, 20, 30, 40, 51], 7, &w), VictoryTier::Tier4Plus);
    assert_eq!(match_tier(&[10, 20, 30, 40, 51], 9, &w), VictoryTier::Tier4);
    assert_eq!(match_tier(&[10, 20, 30, 41, 51], 7, &w), VictoryTier::Tier3Plus);
    assert_eq!(match_tier(&[10, 20, 30, 41, 51], 26, &w), VictoryTier::Tier3);
    assert_eq!(match_tier(&[10, 20, 31, 41, 51], 7, &w), VictoryTier::NoWin);
    assert_eq!(match_tier(&[1, 2, 3, 4, 5], 7, &w), VictoryTier::NoWin);
}

#[test]
fn ticket_number_order_is_irrelevant() {
    let w = winning();
    assert_eq!(match_tier(&[50, 40, 30, 20, 10], 7, &w), VictoryTier::Tier5Plus);
}

#[test]
fn top_tier_fixture_from_edge_of_range() {
    let w = WinningSet {
        main: [1, 2, 3, 4, 69],
        power: 26,
    };
    assert_eq!(match_tier(&[1, 2, 3, 4, 69], 26, &w), VictoryTier::Tier5Plus);
    assert_eq!(match_tier(&[1, 2, 3, 4, 69], 24, &w), VictoryTier::Tier5);
    assert_eq!(match_tier(&[1, 2, 3, 4, 68], 26, &w), VictoryTier::Tier4Plus);
}

#[test]
fn tier_pool_indices_round_trip() {
    for i in 0..VictoryTier::COUNT {
        let tier = VictoryTier::from_pool_index(i).unwrap();
        assert_eq!(tier.pool_index(), Some(i));
    }
    assert_eq!(VictoryTier::NoWin.pool_index(), None);
    assert_eq!(VictoryTier::from_pool_index(6), None);
}

// ——— Ticket validation ————————————————————————————————————————————————————

#[test]
fn main_number_validation() {
    assert!(valid_main_numbers(&[1, 2, 3, 4, 69]));
    assert!(valid_main_numbers(&[69, 1, 22, 14, 5]));
    assert!(!valid_main_numbers(&[0, 2, 3, 4, 5]));
    assert!(!valid_main_numbers(&[1, 2, 3, 4, 70]));
    assert!(!valid_main_numbers(&[5, 5, 3, 4, 1]));
    assert!(!valid_main_numbers(&[1, 2, 3, 69, 69]));
}

#[test]
fn power_number_validation() {
    assert!(valid_power_number(1));
    assert!(valid_power_number(26));
    assert!(!valid_power_number(0));
    assert!(!valid_power_number(27));
}
