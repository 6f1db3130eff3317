//! Round state machine.
//!
//! One `Round` value owns one draw cycle:
//! `Open → Closed → RandomnessRequested → NumbersFetched → WinnersMarked`.
//! Purchases are recorded only while Open; closing requires the duration to
//! have elapsed and allocates the pools; the winning set is derived from the
//! fulfilled oracle words; marking resolves every ticket and referral credit
//! of the round exactly once. No phase is re-enterable, and a WinnersMarked
//! round only accepts claim bookkeeping. Rounds are permanent history and
//! are never deleted.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use lotto_draw::constants::{MAIN_NUMBER_COUNT, WORDS_PER_DRAW};
use lotto_draw::{
    derive_referral_winners, derive_winning_set, match_tier, DrawError, VictoryTier, WinningSet,
};
use lotto_ledger::TicketLedger;
use lotto_pools::{PoolBook, PoolError, PoolShareTable, Rollover, TIER_COUNT};
use lotto_types::{Amount, RandomWord, RequestId, RoundId, Timestamp};

// The draw engine and the pool accountant must agree on the tier count.
const _: () = assert!(VictoryTier::COUNT == TIER_COUNT);

/// Lifecycle phase of a round. Ordering follows the lifecycle, so
/// "Closed or later" is a plain comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RoundPhase {
    /// Selling tickets; the only phase accepting purchases.
    Open,
    /// Duration elapsed, pools allocated, randomness not yet requested.
    Closed,
    /// Waiting for the oracle to fulfill the round's request.
    RandomnessRequested,
    /// Winning set derived; tickets not yet resolved.
    NumbersFetched,
    /// Tickets resolved; only claims remain.
    WinnersMarked,
}

/// Errors of the round machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundError {
    /// Purchase-side mutation outside the Open phase.
    NotOpen {
        /// Phase the round is actually in.
        phase: RoundPhase,
    },
    /// Close attempted before the duration elapsed.
    RoundNotOver {
        /// Caller-supplied current time.
        now: Timestamp,
        /// First instant at which closing succeeds.
        ends_at: Timestamp,
    },
    /// Fetch attempted before the oracle fulfilled the request.
    RandomNotReady,
    /// Operation invoked in the wrong lifecycle phase.
    WrongPhase {
        /// Phase the operation requires.
        expected: RoundPhase,
        /// Phase the round is actually in.
        actual: RoundPhase,
    },
    /// Winning-set derivation failed.
    Draw(DrawError),
    /// Pool bookkeeping rejected the mutation.
    Pool(PoolError),
}

impl fmt::Display for RoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen { phase } => {
                write!(f, "round is not open for purchases (phase {phase:?})")
            }
            Self::RoundNotOver { .. } => write!(f, "Round is not over yet"),
            Self::RandomNotReady => write!(f, "Random numbers not ready"),
            Self::WrongPhase { expected, actual } => {
                write!(f, "operation requires phase {expected:?}, round is in {actual:?}")
            }
            Self::Draw(e) => e.fmt(f),
            Self::Pool(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RoundError {}

impl From<DrawError> for RoundError {
    fn from(e: DrawError) -> Self {
        Self::Draw(e)
    }
}

impl From<PoolError> for RoundError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

/// One draw cycle.
#[derive(Clone, Debug)]
pub struct Round {
    /// Sequential internal id, 1-based, never reused.
    pub id: RoundId,
    /// External-facing id; survives orchestrator upgrades.
    pub ui_id: u64,
    /// When ticket sales opened.
    pub started_at: Timestamp,
    /// Sale window in seconds.
    pub duration: u64,
    /// Price snapshotted at round start.
    pub ticket_price: Amount,
    phase: RoundPhase,
    tickets_count: u64,
    referral_count: u64,
    collected: Amount,
    winning_numbers: [u8; MAIN_NUMBER_COUNT],
    power_number: u8,
    randomness_request: Option<RequestId>,
    referral_winner_numbers: Vec<u32>,
    winners_per_tier: [u64; TIER_COUNT],
    referral_winners: u64,
    pools: PoolBook,
}

impl Round {
    /// Open a new round seeded with the previous round's rollover.
    #[must_use]
    pub fn open(
        id: RoundId,
        ui_id: u64,
        started_at: Timestamp,
        duration: u64,
        ticket_price: Amount,
        rollover: Rollover,
    ) -> Self {
        Self {
            id,
            ui_id,
            started_at,
            duration,
            ticket_price,
            phase: RoundPhase::Open,
            tickets_count: 0,
            referral_count: 0,
            collected: 0,
            winning_numbers: [0; MAIN_NUMBER_COUNT],
            power_number: 0,
            randomness_request: None,
            referral_winner_numbers: Vec::new(),
            winners_per_tier: [0; TIER_COUNT],
            referral_winners: 0,
            pools: PoolBook::new(rollover),
        }
    }

    // ——— Views ————————————————————————————————————————————————————————————

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// First instant at which the round can close.
    #[must_use]
    pub fn ends_at(&self) -> Timestamp {
        self.started_at.saturating_add(self.duration)
    }

    /// True once the sale window has elapsed.
    #[must_use]
    pub fn is_over(&self, now: Timestamp) -> bool {
        now >= self.ends_at()
    }

    /// Tickets sold.
    #[must_use]
    pub fn tickets_count(&self) -> u64 {
        self.tickets_count
    }

    /// Referral credits created.
    #[must_use]
    pub fn referral_count(&self) -> u64 {
        self.referral_count
    }

    /// Gross amount charged for this round, treasury share included.
    #[must_use]
    pub fn collected(&self) -> Amount {
        self.collected
    }

    /// The winning numbers; zeroed until NumbersFetched.
    #[must_use]
    pub fn winning_numbers(&self) -> [u8; MAIN_NUMBER_COUNT] {
        self.winning_numbers
    }

    /// The power number; zero until NumbersFetched.
    #[must_use]
    pub fn power_number(&self) -> u8 {
        self.power_number
    }

    /// The full winning set once drawn.
    #[must_use]
    pub fn winning_set(&self) -> Option<WinningSet> {
        if self.phase >= RoundPhase::NumbersFetched {
            Some(WinningSet {
                main: self.winning_numbers,
                power: self.power_number,
            })
        } else {
            None
        }
    }

    /// The round's outstanding oracle request, if any.
    #[must_use]
    pub fn randomness_request(&self) -> Option<RequestId> {
        self.randomness_request
    }

    /// Drawn referral-winner numbers; empty until NumbersFetched.
    #[must_use]
    pub fn referral_winner_numbers(&self) -> &[u32] {
        &self.referral_winner_numbers
    }

    /// Winning tickets per tier, tallied at WinnersMarked.
    #[must_use]
    pub fn winners_for_tier(&self, index: usize) -> u64 {
        self.winners_per_tier.get(index).copied().unwrap_or(0)
    }

    /// Winning referral credits, tallied at WinnersMarked.
    #[must_use]
    pub fn referral_winner_count(&self) -> u64 {
        self.referral_winners
    }

    /// Bucket accounting of this round.
    #[must_use]
    pub fn pools(&self) -> &PoolBook {
        &self.pools
    }

    /// Unclaimed amounts to seed the next round with.
    #[must_use]
    pub fn rollover_out(&self) -> Rollover {
        self.pools.rollover_out()
    }

    /// Conservation invariant: allocated buckets equal gross collected plus
    /// the rollover this round was seeded with.
    #[must_use]
    pub fn conserves(&self) -> bool {
        self.pools.conserves(self.collected)
    }

    // ——— Purchase-side recording (Open phase only) ————————————————————————

    /// Record a batch of purchased tickets: `count` tickets, `charged` gross
    /// tokens actually pulled (zero for free-round tickets), of which
    /// `treasury_cut` went straight to the bank wallets.
    ///
    /// # Errors
    ///
    /// [`RoundError::NotOpen`] outside the Open phase.
    pub fn note_purchases(
        &mut self,
        count: u64,
        charged: Amount,
        treasury_cut: Amount,
    ) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Open {
            return Err(RoundError::NotOpen { phase: self.phase });
        }
        self.tickets_count += count;
        self.collected += charged;
        self.pools.record_treasury(treasury_cut);
        Ok(())
    }

    /// Record one referral credit created alongside a purchase.
    ///
    /// # Errors
    ///
    /// [`RoundError::NotOpen`] outside the Open phase.
    pub fn note_referral(&mut self) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Open {
            return Err(RoundError::NotOpen { phase: self.phase });
        }
        self.referral_count += 1;
        Ok(())
    }

    // ——— Lifecycle transitions ————————————————————————————————————————————

    /// Close ticket sales: freeze the counts and allocate the pools from
    /// the escrowed (post-treasury) collected amount plus rollover.
    ///
    /// # Errors
    ///
    /// [`RoundError::WrongPhase`] unless Open;
    /// [`RoundError::RoundNotOver`] before `started_at + duration`.
    pub fn close(&mut self, now: Timestamp, table: &PoolShareTable) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Open {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::Open,
                actual: self.phase,
            });
        }
        if !self.is_over(now) {
            return Err(RoundError::RoundNotOver {
                now,
                ends_at: self.ends_at(),
            });
        }
        let fresh = self.collected - self.pools.treasury_pool();
        self.pools.allocate(fresh, table)?;
        self.phase = RoundPhase::Closed;
        debug_assert!(self.conserves());
        Ok(())
    }

    /// Attach the oracle request issued for this round.
    ///
    /// # Errors
    ///
    /// [`RoundError::WrongPhase`] unless Closed.
    pub fn attach_randomness_request(&mut self, request: RequestId) -> Result<(), RoundError> {
        if self.phase != RoundPhase::Closed {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::Closed,
                actual: self.phase,
            });
        }
        self.randomness_request = Some(request);
        self.phase = RoundPhase::RandomnessRequested;
        Ok(())
    }

    /// Apply the fulfilled oracle words: derive the winning set from the
    /// first six words and the referral-winner numbers from the rest,
    /// drawn over `1..=peak assigned referral number`.
    ///
    /// # Errors
    ///
    /// [`RoundError::WrongPhase`] unless RandomnessRequested;
    /// [`RoundError::Draw`] when too few words were delivered. The round is
    /// untouched on failure.
    pub fn apply_random_words(
        &mut self,
        words: &[RandomWord],
        ledger: &TicketLedger,
        max_referral_winners: u32,
    ) -> Result<(), RoundError> {
        if self.phase != RoundPhase::RandomnessRequested {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::RandomnessRequested,
                actual: self.phase,
            });
        }
        let set = derive_winning_set(words)?;
        let referral_range = ledger.referral_peak(self.id);
        self.referral_winner_numbers = derive_referral_winners(
            &words[WORDS_PER_DRAW..],
            referral_range,
            max_referral_winners,
        );
        self.winning_numbers = set.main;
        self.power_number = set.power;
        self.phase = RoundPhase::NumbersFetched;
        Ok(())
    }

    /// Resolve every ticket and referral credit of the round and tally the
    /// winner counts. Calling it again after completion is a no-op.
    ///
    /// # Errors
    ///
    /// [`RoundError::WrongPhase`] unless NumbersFetched (or already
    /// WinnersMarked, which succeeds without changes).
    pub fn mark_winners(&mut self, ledger: &mut TicketLedger) -> Result<(), RoundError> {
        if self.phase == RoundPhase::WinnersMarked {
            return Ok(());
        }
        if self.phase != RoundPhase::NumbersFetched {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::NumbersFetched,
                actual: self.phase,
            });
        }
        let winning = WinningSet {
            main: self.winning_numbers,
            power: self.power_number,
        };
        let mut tier_tallies = [0u64; TIER_COUNT];
        ledger.for_each_round_ticket_mut(self.id, &mut |ticket| {
            let tier = match_tier(&ticket.main_numbers, ticket.power_number, &winning);
            ticket.victory_tier = Some(tier);
            if let Some(index) = tier.pool_index() {
                tier_tallies[index] += 1;
            }
        });
        let drawn = &self.referral_winner_numbers;
        let mut referral_tally = 0u64;
        ledger.for_each_round_referral_mut(self.id, &mut |referral| {
            // A drawn index flags every referrer holding it.
            referral.winner = drawn.contains(&referral.referral_number);
            if referral.winner {
                referral_tally += 1;
            }
        });
        self.winners_per_tier = tier_tallies;
        self.referral_winners = referral_tally;
        self.phase = RoundPhase::WinnersMarked;
        Ok(())
    }

    // ——— Claim bookkeeping (WinnersMarked only) ———————————————————————————

    /// Per-winner payout for a tier, integer-truncated.
    #[must_use]
    pub fn tier_payout(&self, index: usize) -> Amount {
        self.pools.tier_payout(index, self.winners_for_tier(index))
    }

    /// Per-winner payout of the referral bucket, integer-truncated.
    #[must_use]
    pub fn referral_payout(&self) -> Amount {
        self.pools.referral_payout(self.referral_winners)
    }

    /// Book a settled tier claim against this round.
    ///
    /// # Errors
    ///
    /// [`RoundError::WrongPhase`] unless WinnersMarked;
    /// [`RoundError::Pool`] when the bucket would be overdrawn.
    pub fn record_tier_claim(&mut self, index: usize, amount: Amount) -> Result<(), RoundError> {
        self.require_marked()?;
        self.pools.record_tier_claim(index, amount)?;
        Ok(())
    }

    /// Book a settled referral claim against this round.
    ///
    /// # Errors
    ///
    /// Same as [`Round::record_tier_claim`].
    pub fn record_referral_claim(&mut self, amount: Amount) -> Result<(), RoundError> {
        self.require_marked()?;
        self.pools.record_referral_claim(amount)?;
        Ok(())
    }

    /// Flag the token-holder bucket swept. False when already swept or the
    /// pools are not yet allocated.
    pub fn mark_token_holder_withdrawn(&mut self) -> bool {
        if !self.pools.is_allocated() {
            return false;
        }
        self.pools.mark_token_holder_withdrawn()
    }

    fn require_marked(&self) -> Result<(), RoundError> {
        if self.phase != RoundPhase::WinnersMarked {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::WinnersMarked,
                actual: self.phase,
            });
        }
        Ok(())
    }
}
