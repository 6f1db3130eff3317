//! Pool accountant.
//!
//! Splits a round's freshly collected amount across the six victory tiers,
//! the referral pool and the token-holder pool by a validated percentage
//! table, carries rollover seeds from the previous round, records the
//! treasury share taken at purchase time, and tracks claimed-vs-available
//! per bucket. All arithmetic is exact: integer-division remainders are
//! absorbed deterministically (table remainder into the victory share,
//! weight remainder into the top tier), so the allocated total always equals
//! collected plus rollover. Amounts use the payment token's native integer
//! unit; intermediate products are promoted to 256 bits so `amount × pct`
//! can never wrap.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use core::fmt;

use lotto_types::{Amount, U256};

/// Number of victory tiers with their own pool bucket.
pub const TIER_COUNT: usize = 6;

/// Exact percentage of an amount, promoted through 256 bits.
#[inline]
#[must_use]
fn pct_of(amount: Amount, pct: u8) -> Amount {
    (U256::from(amount) * U256::from(pct) / U256::from(100u32)).as_u128()
}

/// Accounting errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// Tier weights must sum to exactly 100.
    TierWeightsNotWhole {
        /// Actual sum of the configured weights.
        sum: u32,
    },
    /// The treasury share must leave something to escrow.
    TreasuryShareTooLarge {
        /// Configured treasury percentage.
        pct: u8,
    },
    /// Referral plus token-holder shares cannot exceed the whole.
    PoolSharesExceedWhole {
        /// Sum of the two configured percentages.
        pct_sum: u32,
    },
    /// `allocate` ran twice for the same round.
    AlreadyAllocated,
    /// A claim would push a bucket's claimed total past its pool.
    OverClaim {
        /// Bucket pool amount.
        pool: Amount,
        /// Already claimed from the bucket.
        claimed: Amount,
        /// The offending claim amount.
        amount: Amount,
    },
    /// Tier index outside `0..TIER_COUNT`.
    UnknownTier {
        /// The offending index.
        index: usize,
    },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TierWeightsNotWhole { sum } => {
                write!(f, "tier weights must sum to 100, got {sum}")
            }
            Self::TreasuryShareTooLarge { pct } => {
                write!(f, "treasury share must be below 100 percent, got {pct}")
            }
            Self::PoolSharesExceedWhole { pct_sum } => {
                write!(
                    f,
                    "referral and token-holder shares exceed 100 percent: {pct_sum}"
                )
            }
            Self::AlreadyAllocated => write!(f, "round pools already allocated"),
            Self::OverClaim {
                pool,
                claimed,
                amount,
            } => write!(
                f,
                "claim exceeds pool bucket: pool {pool}, claimed {claimed}, claim {amount}"
            ),
            Self::UnknownTier { index } => write!(f, "unknown tier index {index}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PoolError {}

/// Construction-time percentage table.
///
/// `treasury_pct` applies to the gross price at purchase time and never
/// reaches escrow. Of the escrowed remainder, `referral_pct` and
/// `token_holder_pct` take their shares at round close; the victory tiers
/// split what is left by `tier_weights` (descending, summing to 100).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolShareTable {
    /// Percent of each purchase paid to bank wallets immediately.
    pub treasury_pct: u8,
    /// Percent of the freshly collected amount feeding the referral pool.
    pub referral_pct: u8,
    /// Percent of the freshly collected amount for token holders.
    pub token_holder_pct: u8,
    /// Victory-share split across the six tiers, highest tier first.
    pub tier_weights: [u8; TIER_COUNT],
}

impl PoolShareTable {
    /// Check the table once at construction.
    ///
    /// # Errors
    ///
    /// See the [`PoolError`] table variants; an invalid table must never be
    /// installed.
    pub fn validate(&self) -> Result<(), PoolError> {
        let weight_sum: u32 = self.tier_weights.iter().map(|w| u32::from(*w)).sum();
        if weight_sum != 100 {
            return Err(PoolError::TierWeightsNotWhole { sum: weight_sum });
        }
        if self.treasury_pct >= 100 {
            return Err(PoolError::TreasuryShareTooLarge {
                pct: self.treasury_pct,
            });
        }
        let pool_pct = u32::from(self.referral_pct) + u32::from(self.token_holder_pct);
        if pool_pct > 100 {
            return Err(PoolError::PoolSharesExceedWhole { pct_sum: pool_pct });
        }
        Ok(())
    }

    /// Treasury cut of a gross amount (paid out at purchase time).
    #[must_use]
    pub fn treasury_cut(&self, gross: Amount) -> Amount {
        pct_of(gross, self.treasury_pct)
    }
}

impl Default for PoolShareTable {
    fn default() -> Self {
        Self {
            treasury_pct: 20,
            referral_pct: 10,
            token_holder_pct: 10,
            tier_weights: [70, 12, 8, 5, 3, 2],
        }
    }
}

/// Unclaimed amounts carried from one round into the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rollover {
    /// Per-tier carryover, same indexing as the tier pools.
    pub tier: [Amount; TIER_COUNT],
    /// Referral-bucket carryover.
    pub referral: Amount,
}

impl Rollover {
    /// Sum over all carried buckets.
    #[must_use]
    pub fn total(&self) -> Amount {
        let mut total = self.referral;
        for t in &self.tier {
            total += t;
        }
        total
    }
}

/// Per-round bucket accounting: pools, claims, treasury record, rollover.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolBook {
    tier_pools: [Amount; TIER_COUNT],
    tier_claimed: [Amount; TIER_COUNT],
    referral_pool: Amount,
    referral_claimed: Amount,
    token_holder_pool: Amount,
    token_holder_withdrawn: bool,
    treasury_pool: Amount,
    total_claimed: Amount,
    rollover_in: Rollover,
    allocated: bool,
}

impl PoolBook {
    /// Fresh book seeded with the previous round's carryover. Pools stay
    /// zero until [`PoolBook::allocate`] runs at round close.
    #[must_use]
    pub fn new(rollover_in: Rollover) -> Self {
        Self {
            rollover_in,
            ..Self::default()
        }
    }

    /// Record a purchase-time treasury cut. May run any number of times
    /// before allocation, once per charged purchase.
    pub fn record_treasury(&mut self, cut: Amount) {
        self.treasury_pool += cut;
    }

    /// Split the freshly collected (escrowed) amount across the buckets and
    /// fold in the rollover seeds. Runs exactly once, at round close.
    ///
    /// # Errors
    ///
    /// [`PoolError::AlreadyAllocated`] on a second call; nothing changes.
    pub fn allocate(&mut self, fresh: Amount, table: &PoolShareTable) -> Result<(), PoolError> {
        if self.allocated {
            return Err(PoolError::AlreadyAllocated);
        }
        let referral_cut = pct_of(fresh, table.referral_pct);
        let token_holder_cut = pct_of(fresh, table.token_holder_pct);
        // The victory share absorbs the table remainder; the top tier
        // absorbs the weight remainder. Totals stay exact.
        let victory = fresh - referral_cut - token_holder_cut;
        let mut tier_sum: Amount = 0;
        for (pool, weight) in self.tier_pools.iter_mut().zip(table.tier_weights) {
            *pool = pct_of(victory, weight);
            tier_sum += *pool;
        }
        self.tier_pools[0] += victory - tier_sum;

        for (pool, carried) in self.tier_pools.iter_mut().zip(self.rollover_in.tier) {
            *pool += carried;
        }
        self.referral_pool = referral_cut + self.rollover_in.referral;
        self.token_holder_pool = token_holder_cut;
        self.allocated = true;
        Ok(())
    }

    /// True once [`PoolBook::allocate`] has run.
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    // ——— Bucket views —————————————————————————————————————————————————————

    /// Pool amount of one tier bucket.
    #[must_use]
    pub fn tier_pool(&self, index: usize) -> Amount {
        self.tier_pools.get(index).copied().unwrap_or(0)
    }

    /// Claimed amount of one tier bucket.
    #[must_use]
    pub fn tier_claimed(&self, index: usize) -> Amount {
        self.tier_claimed.get(index).copied().unwrap_or(0)
    }

    /// All six tier pools, highest tier first.
    #[must_use]
    pub fn tier_pools(&self) -> [Amount; TIER_COUNT] {
        self.tier_pools
    }

    /// Referral pool amount.
    #[must_use]
    pub fn referral_pool(&self) -> Amount {
        self.referral_pool
    }

    /// Claimed referral amount.
    #[must_use]
    pub fn referral_claimed(&self) -> Amount {
        self.referral_claimed
    }

    /// Token-holder pool amount.
    #[must_use]
    pub fn token_holder_pool(&self) -> Amount {
        self.token_holder_pool
    }

    /// True once the token-holder bucket has been swept.
    #[must_use]
    pub fn token_holder_withdrawn(&self) -> bool {
        self.token_holder_withdrawn
    }

    /// Treasury amount recorded at purchase time.
    #[must_use]
    pub fn treasury_pool(&self) -> Amount {
        self.treasury_pool
    }

    /// Total claimed across every bucket.
    #[must_use]
    pub fn total_claimed(&self) -> Amount {
        self.total_claimed
    }

    /// Sum of the six tier pools.
    #[must_use]
    pub fn victory_total(&self) -> Amount {
        let mut total: Amount = 0;
        for pool in &self.tier_pools {
            total += pool;
        }
        total
    }

    /// Rollover this book was seeded with.
    #[must_use]
    pub fn rollover_in(&self) -> &Rollover {
        &self.rollover_in
    }

    /// Everything allocated to this round, treasury record included.
    #[must_use]
    pub fn allocated_total(&self) -> Amount {
        self.victory_total() + self.referral_pool + self.token_holder_pool + self.treasury_pool
    }

    /// Conservation check: allocated total equals gross collected plus the
    /// rollover seeds.
    #[must_use]
    pub fn conserves(&self, collected: Amount) -> bool {
        self.allocated_total() == collected + self.rollover_in.total()
    }

    // ——— Payouts and claims ———————————————————————————————————————————————

    /// Per-winner payout of a tier bucket, integer-truncated. Zero winners
    /// pay nothing; the division remainder stays in the pool as dust and
    /// rolls forward eventually.
    #[must_use]
    pub fn tier_payout(&self, index: usize, winners: u64) -> Amount {
        if winners == 0 {
            return 0;
        }
        self.tier_pool(index) / Amount::from(winners)
    }

    /// Per-winner payout of the referral bucket, integer-truncated.
    #[must_use]
    pub fn referral_payout(&self, winners: u64) -> Amount {
        if winners == 0 {
            return 0;
        }
        self.referral_pool / Amount::from(winners)
    }

    /// Book a settled tier claim.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownTier`] for a bad index;
    /// [`PoolError::OverClaim`] when the bucket would be overdrawn. The
    /// book is untouched on failure.
    pub fn record_tier_claim(&mut self, index: usize, amount: Amount) -> Result<(), PoolError> {
        if index >= TIER_COUNT {
            return Err(PoolError::UnknownTier { index });
        }
        let pool = self.tier_pools[index];
        let claimed = self.tier_claimed[index];
        if claimed + amount > pool {
            return Err(PoolError::OverClaim {
                pool,
                claimed,
                amount,
            });
        }
        self.tier_claimed[index] = claimed + amount;
        self.total_claimed += amount;
        Ok(())
    }

    /// Book a settled referral claim.
    ///
    /// # Errors
    ///
    /// [`PoolError::OverClaim`] when the bucket would be overdrawn.
    pub fn record_referral_claim(&mut self, amount: Amount) -> Result<(), PoolError> {
        if self.referral_claimed + amount > self.referral_pool {
            return Err(PoolError::OverClaim {
                pool: self.referral_pool,
                claimed: self.referral_claimed,
                amount,
            });
        }
        self.referral_claimed += amount;
        self.total_claimed += amount;
        Ok(())
    }

    /// Flag the token-holder bucket swept. False when already swept.
    pub fn mark_token_holder_withdrawn(&mut self) -> bool {
        if self.token_holder_withdrawn {
            return false;
        }
        self.token_holder_withdrawn = true;
        true
    }

    /// Unclaimed amounts to seed the next round with:
    /// `pool − claimed` per tier bucket, likewise for the referral bucket.
    #[must_use]
    pub fn rollover_out(&self) -> Rollover {
        let mut tier = [0; TIER_COUNT];
        for (slot, (pool, claimed)) in tier
            .iter_mut()
            .zip(self.tier_pools.iter().zip(self.tier_claimed.iter()))
        {
            *slot = pool - claimed;
        }
        Rollover {
            tier,
            referral: self.referral_pool - self.referral_claimed,
        }
    }
}

#[cfg(test)]
mod tests;
