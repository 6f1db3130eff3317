//! Pool accountant tests: table validation, exact splits, claims, rollover.

use super::*;

fn table() -> PoolShareTable {
    PoolShareTable::default()
}

// ——— Share table validation ———————————————————————————————————————————————

#[test]
fn default_table_is_valid() {
    assert_eq!(table().validate(), Ok(()));
}

#[test]
fn tier_weights_must_sum_to_100() {
    let mut t = table();
    t.tier_weights = [70, 12, 8, 5, 3, 3];
    assert_eq!(
        t.validate(),
        Err(PoolError::TierWeightsNotWhole { sum: 101 })
    );
    t.tier_weights = [70, 12, 8, 5, 3, 1];
    assert_eq!(t.validate(), Err(PoolError::TierWeightsNotWhole { sum: 99 }));
}

#[test]
fn treasury_share_must_leave_escrow() {
    let mut t = table();
    t.treasury_pct = 100;
    assert_eq!(
        t.validate(),
        Err(PoolError::TreasuryShareTooLarge { pct: 100 })
    );
}

#[test]
fn referral_plus_token_holder_cannot_exceed_whole() {
    let mut t = table();
    t.referral_pct = 60;
    t.token_holder_pct = 50;
    assert_eq!(
        t.validate(),
        Err(PoolError::PoolSharesExceedWhole { pct_sum: 110 })
    );
}

#[test]
fn treasury_cut_truncates() {
    assert_eq!(table().treasury_cut(10), 2);
    assert_eq!(table().treasury_cut(9), 1); // 1.8 floors
    assert_eq!(table().treasury_cut(0), 0);
}

// ——— Allocation ———————————————————————————————————————————————————————————

#[test]
fn allocation_matches_the_table_exactly() {
    let mut book = PoolBook::new(Rollover::default());
    book.allocate(1000, &table()).unwrap();

    assert_eq!(book.referral_pool(), 100);
    assert_eq!(book.token_holder_pool(), 100);
    assert_eq!(book.tier_pools(), [560, 96, 64, 40, 24, 16]);
    assert_eq!(book.victory_total(), 800);
    assert!(book.conserves(1000));
}

#[test]
fn division_dust_lands_in_the_top_tier() {
    let mut book = PoolBook::new(Rollover::default());
    book.allocate(997, &table()).unwrap();

    // referral/token-holder floor to 99 each; victory = 799; raw tier
    // shares sum to 794, so 5 units of dust go to the top tier.
    assert_eq!(book.referral_pool(), 99);
    assert_eq!(book.token_holder_pool(), 99);
    assert_eq!(book.tier_pools(), [564, 95, 63, 39, 23, 15]);
    assert_eq!(book.victory_total(), 799);
    assert!(book.conserves(997));
}

#[test]
fn allocation_is_conservative_for_any_amount() {
    for fresh in (0..5000u128).step_by(7) {
        let mut book = PoolBook::new(Rollover::default());
        book.allocate(fresh, &table()).unwrap();
        assert_eq!(
            book.allocated_total(),
            fresh,
            "conservation broke at fresh = {fresh}"
        );
    }
}

#[test]
fn treasury_record_joins_conservation() {
    let mut book = PoolBook::new(Rollover::default());
    book.record_treasury(150);
    book.record_treasury(100);
    book.allocate(997, &table()).unwrap();

    assert_eq!(book.treasury_pool(), 250);
    // Gross collected = escrowed 997 + treasury 250.
    assert!(book.conserves(1247));
}

#[test]
fn rollover_seeds_fold_into_the_buckets() {
    let seed = Rollover {
        tier: [100, 0, 0, 0, 0, 60],
        referral: 30,
    };
    let mut book = PoolBook::new(seed);
    book.allocate(1000, &table()).unwrap();

    assert_eq!(book.tier_pool(0), 660); // 560 fresh + 100 carried
    assert_eq!(book.tier_pool(5), 76); // 16 fresh + 60 carried
    assert_eq!(book.referral_pool(), 130);
    assert!(book.conserves(1000));
}

#[test]
fn allocation_runs_once() {
    let mut book = PoolBook::new(Rollover::default());
    book.allocate(1000, &table()).unwrap();
    assert_eq!(
        book.allocate(1000, &table()),
        Err(PoolError::AlreadyAllocated)
    );
    assert!(book.is_allocated());
    assert_eq!(book.victory_total(), 800);
}

// ——— Payouts and claims ———————————————————————————————————————————————————

fn seeded_book() -> PoolBook {
    let mut book = PoolBook::new(Rollover {
        tier: [100, 0, 0, 0, 0, 0],
        referral: 50,
    });
    book.allocate(0, &table()).unwrap();
    book
}

#[test]
fn payouts_truncate_and_leave_dust() {
    let book = seeded_book();
    assert_eq!(book.tier_payout(0, 3), 33);
    assert_eq!(book.tier_payout(0, 0), 0);
    assert_eq!(book.tier_payout(1, 5), 0); // empty bucket
    assert_eq!(book.referral_payout(4), 12); // 50 / 4
    assert_eq!(book.referral_payout(0), 0);
}

#[test]
fn claims_accumulate_and_never_overdraw() {
    let mut book = seeded_book();
    for _ in 0..3 {
        book.record_tier_claim(0, 33).unwrap();
    }
    assert_eq!(book.tier_claimed(0), 99);
    assert_eq!(book.total_claimed(), 99);
    assert_eq!(
        book.record_tier_claim(0, 2),
        Err(PoolError::OverClaim {
            pool: 100,
            claimed: 99,
            amount: 2
        })
    );
    // Failed claim left the counters alone.
    assert_eq!(book.tier_claimed(0), 99);

    book.record_referral_claim(50).unwrap();
    assert_eq!(
        book.record_referral_claim(1),
        Err(PoolError::OverClaim {
            pool: 50,
            claimed: 50,
            amount: 1
        })
    );
    assert_eq!(book.record_tier_claim(9, 1), Err(PoolError::UnknownTier { index: 9 }));
}

#[test]
fn rollover_out_carries_pool_minus_claimed() {
    let mut book = seeded_book();
    for _ in 0..3 {
        book.record_tier_claim(0, 33).unwrap();
    }
    book.record_referral_claim(12).unwrap();

    let out = book.rollover_out();
    assert_eq!(out.tier[0], 1); // 100 − 99 dust
    assert_eq!(out.tier[1], 0);
    assert_eq!(out.referral, 38);
    assert_eq!(out.total(), 39);
}

#[test]
fn token_holder_sweep_happens_once() {
    let mut book = seeded_book();
    assert!(book.mark_token_holder_withdrawn());
    assert!(!book.mark_token_holder_withdrawn());
    assert!(book.token_holder_withdrawn());
}

#[test]
fn out_of_range_tier_views_read_zero() {
    let book = seeded_book();
    assert_eq!(book.tier_pool(6), 0);
    assert_eq!(book.tier_claimed(17), 0);
}
