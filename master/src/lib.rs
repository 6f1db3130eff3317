//! Lottery orchestrator.
//!
//! `LotteryMaster` sequences rounds, takes ticket purchases (price charge,
//! free-round credits, referral linkage, immediate treasury split to bank
//! wallets), drives each round through its lifecycle against the randomness
//! oracle, and settles claims from the shared escrow. All monetary state
//! lives in the payment token; the master only keeps the books.
//!
//! Every mutating operation runs to completion with no interleaving, so
//! claim correctness rests on the bucket-accounting invariants rather than
//! locks. The single asynchronous boundary is the oracle: `close_round`
//! issues a request and returns; fulfillment lands out-of-band and is
//! picked up by `fetch_round_numbers`.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

pub mod interface;
pub mod reader;

use interface::{PaymentToken, RandomizerError, RandomnessSource, TokenError};
use lotto_draw::constants::{MAIN_NUMBER_COUNT, WORDS_PER_DRAW};
use lotto_draw::VictoryTier;
use lotto_ledger::{TicketError, TicketLedger};
use lotto_pools::{PoolError, PoolShareTable, Rollover};
use lotto_round::{Round, RoundError, RoundPhase};
use lotto_types::{
    Address, Amount, ReferralId, RequestId, RoundId, TicketId, Timestamp, ZERO_ADDRESS,
};

// Re-export the engine crates for downstream use.
pub use lotto_draw as draw;
pub use lotto_ledger as ledger;
pub use lotto_pools as pools;
pub use lotto_round as round;
pub use lotto_types as types;

/// Values per purchased ticket in the flat batch encoding: 5 main + 1 power.
pub const NUMBERS_PER_TICKET: usize = MAIN_NUMBER_COUNT + 1;

/// Construction-time configuration of the orchestrator.
#[derive(Clone, Debug)]
pub struct LotteryConfig {
    /// Price per ticket in the token's native unit; rounds snapshot it at
    /// start, so changes apply from the next round on.
    pub ticket_price: Amount,
    /// Default sale window in seconds.
    pub round_duration: u64,
    /// Percentage split applied at round close.
    pub shares: PoolShareTable,
    /// Referral winners drawn per round.
    pub max_referral_winners: u32,
    /// Referral numbers one referrer can hold per round.
    pub referral_entitlement: u32,
}

/// Helpers for quick-start wiring.
pub mod utils {
    use super::LotteryConfig;
    use lotto_pools::PoolShareTable;

    /// Production-like defaults: 5-day rounds, 5 whole units of a
    /// 6-decimal token per ticket, 4 referral winners per draw.
    #[must_use]
    pub fn default_config() -> LotteryConfig {
        LotteryConfig {
            ticket_price: 5_000_000,
            round_duration: 432_000,
            shares: PoolShareTable::default(),
            max_referral_winners: 4,
            referral_entitlement: 50,
        }
    }
}

/// Orchestrator errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MasterError {
    /// Administrative call from a wallet that is not the admin.
    NotAdmin,
    /// The operation needs an active round and none exists.
    NoActiveRound,
    /// A new round cannot start while the active one still sells tickets.
    ActiveRoundStillOpen {
        /// The round still open.
        round_id: RoundId,
    },
    /// No round with this id.
    UnknownRound {
        /// The offending id.
        round_id: RoundId,
    },
    /// No ticket with this id.
    UnknownTicket {
        /// The offending id.
        ticket_id: TicketId,
    },
    /// Caller does not own the ticket being claimed.
    InvalidTicketOwner,
    /// The ticket has nothing to pay: no winning tier, or already claimed.
    NoPrize,
    /// The wallet has no unclaimed winnings in the round.
    NothingToClaim,
    /// The escrow cannot cover the computed payout; claimed-state is left
    /// untouched so the same claim succeeds after a top-up.
    InsufficientEscrow {
        /// Escrow balance at claim time.
        have: Amount,
        /// The payout that was due.
        need: Amount,
    },
    /// The round's token-holder bucket was already swept.
    TokenHolderAlreadySwept {
        /// The affected round.
        round_id: RoundId,
    },
    /// Bank wallet rejected: zero address or already registered.
    BadBankWallet,
    /// Ticket validation failed.
    Ticket(TicketError),
    /// The round machine rejected the operation.
    Round(RoundError),
    /// The share table is not additive.
    Pool(PoolError),
    /// The payment token rejected a transfer.
    Token(TokenError),
    /// The randomness oracle rejected the call.
    Randomizer(RandomizerError),
}

impl fmt::Display for MasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAdmin => write!(f, "caller is not the admin"),
            Self::NoActiveRound => write!(f, "no active round"),
            Self::ActiveRoundStillOpen { round_id } => {
                write!(f, "round {round_id} is still open")
            }
            Self::UnknownRound { round_id } => write!(f, "unknown round {round_id}"),
            Self::UnknownTicket { ticket_id } => write!(f, "unknown ticket {ticket_id}"),
            Self::InvalidTicketOwner => write!(f, "Invalid ticket owner"),
            Self::NoPrize => write!(f, "No prize for this ticket"),
            Self::NothingToClaim => write!(f, "Nothing to claim for this wallet"),
            Self::InsufficientEscrow { .. } => write!(f, "Not enough funds on contract"),
            Self::TokenHolderAlreadySwept { round_id } => {
                write!(f, "token-holder pool of round {round_id} already withdrawn")
            }
            Self::BadBankWallet => write!(f, "bank wallet is zero or already registered"),
            Self::Ticket(e) => e.fmt(f),
            Self::Round(e) => e.fmt(f),
            Self::Pool(e) => e.fmt(f),
            Self::Token(e) => e.fmt(f),
            Self::Randomizer(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MasterError {}

impl From<TicketError> for MasterError {
    fn from(e: TicketError) -> Self {
        Self::Ticket(e)
    }
}

impl From<RoundError> for MasterError {
    fn from(e: RoundError) -> Self {
        Self::Round(e)
    }
}

impl From<PoolError> for MasterError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

impl From<TokenError> for MasterError {
    fn from(e: TokenError) -> Self {
        Self::Token(e)
    }
}

impl From<RandomizerError> for MasterError {
    fn from(e: RandomizerError) -> Self {
        Self::Randomizer(e)
    }
}

/// A wallet's unclaimed winnings in one marked round.
pub(crate) struct WalletWinnings {
    /// Unclaimed winning tickets: id, tier pool index, payout.
    pub(crate) tickets: Vec<(TicketId, usize, Amount)>,
    /// Unclaimed winning referral credits.
    pub(crate) referrals: Vec<ReferralId>,
    /// Per-credit referral payout.
    pub(crate) referral_payout: Amount,
    /// Everything summed.
    pub(crate) total: Amount,
}

/// The lottery orchestrator.
pub struct LotteryMaster<T, R> {
    admin: Address,
    escrow: Address,
    config: LotteryConfig,
    token: T,
    randomizer: R,
    ledger: TicketLedger,
    rounds: BTreeMap<RoundId, Round>,
    active_round: Option<RoundId>,
    next_round_id: RoundId,
    next_ui_id: u64,
    request_rounds: BTreeMap<RequestId, RoundId>,
    free_rounds: BTreeMap<Address, u32>,
    bank_wallets: Vec<Address>,
}

impl<T: PaymentToken, R: RandomnessSource> LotteryMaster<T, R> {
    /// Wire up an orchestrator. `escrow` is the wallet holding prize funds;
    /// `admin` gates the administrative surface.
    ///
    /// # Errors
    ///
    /// [`MasterError::Pool`] when the configured share table is not
    /// additive.
    pub fn new(
        admin: Address,
        escrow: Address,
        config: LotteryConfig,
        token: T,
        randomizer: R,
    ) -> Result<Self, MasterError> {
        config.shares.validate()?;
        Ok(Self {
            admin,
            escrow,
            config,
            token,
            randomizer,
            ledger: TicketLedger::new(),
            rounds: BTreeMap::new(),
            active_round: None,
            next_round_id: 1,
            next_ui_id: 1,
            request_rounds: BTreeMap::new(),
            free_rounds: BTreeMap::new(),
            bank_wallets: Vec::new(),
        })
    }

    // ——— Round sequencing (admin) —————————————————————————————————————————

    /// Open the next round, carrying the previous round's unclaimed tier
    /// and referral amounts forward.
    ///
    /// # Errors
    ///
    /// [`MasterError::NotAdmin`]; [`MasterError::ActiveRoundStillOpen`]
    /// while the active round has not closed.
    pub fn start_new_round(
        &mut self,
        caller: Address,
        now: Timestamp,
        duration: u64,
    ) -> Result<RoundId, MasterError> {
        self.require_admin(caller)?;
        let rollover = self.rollover_from_active()?;
        let ui_id = self.next_ui_id;
        Ok(self.open_round(now, duration, rollover, ui_id))
    }

    /// Open a round seeded with an externally supplied rollover and an
    /// explicit external id: continuity across an orchestrator redeploy.
    /// The escrow must already hold the seeded amounts.
    ///
    /// # Errors
    ///
    /// Same as [`LotteryMaster::start_new_round`].
    pub fn start_new_round_for_upgrade(
        &mut self,
        caller: Address,
        now: Timestamp,
        duration: u64,
        rollover: Rollover,
        ui_id: u64,
    ) -> Result<RoundId, MasterError> {
        self.require_admin(caller)?;
        if let Some(round_id) = self.active_round {
            let round = self
                .rounds
                .get(&round_id)
                .ok_or(MasterError::UnknownRound { round_id })?;
            if round.phase() < RoundPhase::Closed {
                return Err(MasterError::ActiveRoundStillOpen { round_id });
            }
        }
        Ok(self.open_round(now, duration, rollover, ui_id))
    }

    /// Change the ticket price for rounds started from now on; the open
    /// round keeps its snapshot.
    ///
    /// # Errors
    ///
    /// [`MasterError::NotAdmin`].
    pub fn set_ticket_price(&mut self, caller: Address, price: Amount) -> Result<(), MasterError> {
        self.require_admin(caller)?;
        self.config.ticket_price = price;
        Ok(())
    }

    /// Grant one free-ticket credit to each listed wallet.
    ///
    /// # Errors
    ///
    /// [`MasterError::NotAdmin`].
    pub fn add_free_round(
        &mut self,
        caller: Address,
        wallets: &[Address],
    ) -> Result<(), MasterError> {
        self.require_admin(caller)?;
        for &wallet in wallets {
            *self.free_rounds.entry(wallet).or_insert(0) += 1;
        }
        Ok(())
    }

    /// Register a treasury-share recipient.
    ///
    /// # Errors
    ///
    /// [`MasterError::NotAdmin`]; [`MasterError::BadBankWallet`] for the
    /// zero address or a duplicate.
    pub fn add_bank_wallet(&mut self, caller: Address, wallet: Address) -> Result<(), MasterError> {
        self.require_admin(caller)?;
        if wallet == ZERO_ADDRESS || self.bank_wallets.contains(&wallet) {
            return Err(MasterError::BadBankWallet);
        }
        self.bank_wallets.push(wallet);
        Ok(())
    }

    /// Sweep a round's token-holder bucket to a distribution wallet, once.
    ///
    /// # Errors
    ///
    /// [`MasterError::NotAdmin`]; a phase error before the round closed;
    /// [`MasterError::TokenHolderAlreadySwept`] on repeats;
    /// [`MasterError::InsufficientEscrow`] when the escrow cannot cover it.
    pub fn withdraw_token_holder_pool(
        &mut self,
        caller: Address,
        round_id: RoundId,
        to: Address,
    ) -> Result<Amount, MasterError> {
        self.require_admin(caller)?;
        let amount = {
            let round = self
                .rounds
                .get(&round_id)
                .ok_or(MasterError::UnknownRound { round_id })?;
            if !round.pools().is_allocated() {
                return Err(RoundError::WrongPhase {
                    expected: RoundPhase::Closed,
                    actual: round.phase(),
                }
                .into());
            }
            if round.pools().token_holder_withdrawn() {
                return Err(MasterError::TokenHolderAlreadySwept { round_id });
            }
            round.pools().token_holder_pool()
        };
        self.settle(to, amount)?;
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.mark_token_holder_withdrawn();
        Ok(amount)
    }

    // ——— Purchases ————————————————————————————————————————————————————————

    /// Buy one ticket in the active round. A valid `referrer` (non-zero,
    /// not the buyer, entitlement not exhausted) earns one referral credit.
    ///
    /// # Errors
    ///
    /// Validation errors with the ticket untouched; a phase error when the
    /// active round no longer sells; token errors when the buyer cannot
    /// pay.
    pub fn buy_ticket(
        &mut self,
        caller: Address,
        main: [u8; MAIN_NUMBER_COUNT],
        power: u8,
        referrer: Address,
    ) -> Result<TicketId, MasterError> {
        TicketLedger::validate_numbers(&main, power)?;
        let ids = self.purchase(caller, &[(main, power)], referrer)?;
        Ok(ids[0])
    }

    /// Buy several tickets in one call. `numbers` is a flat sequence of
    /// 6-value groups (5 main + 1 power); every group is validated before
    /// any state changes. Free-round credits are consumed first, one per
    /// group; the rest is charged at the round's price in a single
    /// transfer. Each group attempts its own referral credit.
    ///
    /// # Errors
    ///
    /// "Invalid numbers" for an empty or ragged sequence or a bad group;
    /// otherwise as [`LotteryMaster::buy_ticket`].
    pub fn buy_tickets(
        &mut self,
        caller: Address,
        numbers: &[u8],
        referrer: Address,
    ) -> Result<Vec<TicketId>, MasterError> {
        if numbers.is_empty() || numbers.len() % NUMBERS_PER_TICKET != 0 {
            return Err(TicketError::InvalidNumbers.into());
        }
        let mut picks = Vec::with_capacity(numbers.len() / NUMBERS_PER_TICKET);
        for group in numbers.chunks_exact(NUMBERS_PER_TICKET) {
            let main = [group[0], group[1], group[2], group[3], group[4]];
            let power = group[5];
            TicketLedger::validate_numbers(&main, power)?;
            picks.push((main, power));
        }
        self.purchase(caller, &picks, referrer)
    }

    // ——— Lifecycle triggers (permissionless keeper operations) ————————————

    /// Close the active round once its duration elapsed and issue the
    /// round's single randomness request (6 draw words plus one per
    /// potential referral winner).
    ///
    /// # Errors
    ///
    /// "Round is not over yet" before `started_at + duration`; a phase
    /// error when the round is past Open.
    pub fn close_round(&mut self, now: Timestamp) -> Result<RequestId, MasterError> {
        let round_id = self.active_round.ok_or(MasterError::NoActiveRound)?;
        let words = WORDS_PER_DRAW as u32 + self.config.max_referral_winners;
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.close(now, &self.config.shares)?;
        let request = self.randomizer.request_random_words(words);
        round.attach_randomness_request(request)?;
        self.request_rounds.insert(request, round_id);
        Ok(request)
    }

    /// Pull the fulfilled oracle words into a round: derives the winning
    /// numbers, the power number and the referral-winner set. Callable by
    /// anyone, any number of times; fails without side effects until the
    /// oracle has delivered.
    ///
    /// # Errors
    ///
    /// "Random numbers not ready" before fulfillment; a phase error when
    /// the round has no outstanding request.
    pub fn fetch_round_numbers(&mut self, round_id: RoundId) -> Result<(), MasterError> {
        let request = {
            let round = self
                .rounds
                .get(&round_id)
                .ok_or(MasterError::UnknownRound { round_id })?;
            match round.randomness_request() {
                Some(request) => request,
                None => {
                    return Err(RoundError::WrongPhase {
                        expected: RoundPhase::RandomnessRequested,
                        actual: round.phase(),
                    }
                    .into())
                }
            }
        };
        let status = self
            .randomizer
            .status(request)
            .ok_or(MasterError::Randomizer(RandomizerError::UnknownRequest {
                request,
            }))?;
        if !status.fulfilled {
            return Err(RoundError::RandomNotReady.into());
        }
        let words = status.words.clone();
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.apply_random_words(&words, &self.ledger, self.config.max_referral_winners)?;
        Ok(())
    }

    /// Resolve every ticket and referral credit of a fetched round.
    /// Idempotent once complete.
    ///
    /// # Errors
    ///
    /// A phase error before the numbers were fetched.
    pub fn mark_winners(&mut self, round_id: RoundId) -> Result<(), MasterError> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.mark_winners(&mut self.ledger)?;
        Ok(())
    }

    // ——— Claims ———————————————————————————————————————————————————————————

    /// Pay out one winning ticket to its owner.
    ///
    /// # Errors
    ///
    /// "Invalid ticket owner" for anyone but the participant; a phase
    /// error before the round is marked; "No prize for this ticket" for
    /// no-win or already-claimed tickets; "Not enough funds on contract"
    /// when the escrow cannot cover the payout, leaving the ticket
    /// unclaimed so the claim can be retried.
    pub fn claim_ticket(
        &mut self,
        caller: Address,
        ticket_id: TicketId,
    ) -> Result<Amount, MasterError> {
        let (round_id, owner, already_claimed, tier) = match self.ledger.ticket(ticket_id) {
            Some(t) => (t.round_id, t.participant, t.claimed, t.victory_tier),
            None => return Err(MasterError::UnknownTicket { ticket_id }),
        };
        if owner != caller {
            return Err(MasterError::InvalidTicketOwner);
        }
        let (index, payout) = {
            let round = self
                .rounds
                .get(&round_id)
                .ok_or(MasterError::UnknownRound { round_id })?;
            if round.phase() != RoundPhase::WinnersMarked {
                return Err(RoundError::WrongPhase {
                    expected: RoundPhase::WinnersMarked,
                    actual: round.phase(),
                }
                .into());
            }
            if already_claimed {
                return Err(MasterError::NoPrize);
            }
            let index = tier
                .and_then(VictoryTier::pool_index)
                .ok_or(MasterError::NoPrize)?;
            (index, round.tier_payout(index))
        };
        self.settle(caller, payout)?;
        self.ledger.mark_ticket_claimed(ticket_id);
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.record_tier_claim(index, payout)?;
        Ok(payout)
    }

    /// Pay out everything the wallet is owed in one round: all unclaimed
    /// winning tickets plus all unclaimed winning referral credits, in a
    /// single settlement.
    ///
    /// # Errors
    ///
    /// "Nothing to claim for this wallet" when no unclaimed winnings
    /// exist; "Not enough funds on contract" when the escrow cannot cover
    /// the total, leaving everything unclaimed.
    pub fn claim_wallet(
        &mut self,
        caller: Address,
        round_id: RoundId,
    ) -> Result<Amount, MasterError> {
        let winnings = self.wallet_winnings(round_id, caller)?;
        if winnings.tickets.is_empty() && winnings.referrals.is_empty() {
            return Err(MasterError::NothingToClaim);
        }
        self.settle(caller, winnings.total)?;
        for &(ticket_id, _, _) in &winnings.tickets {
            self.ledger.mark_ticket_claimed(ticket_id);
        }
        for &referral_id in &winnings.referrals {
            self.ledger.mark_referral_claimed(referral_id);
        }
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        for &(_, index, payout) in &winnings.tickets {
            round.record_tier_claim(index, payout)?;
        }
        for _ in &winnings.referrals {
            round.record_referral_claim(winnings.referral_payout)?;
        }
        Ok(winnings.total)
    }

    // ——— Views ————————————————————————————————————————————————————————————

    /// The admin wallet.
    #[must_use]
    pub fn admin(&self) -> Address {
        self.admin
    }

    /// The escrow wallet holding prize funds.
    #[must_use]
    pub fn escrow(&self) -> Address {
        self.escrow
    }

    /// Token balance of the escrow.
    #[must_use]
    pub fn escrow_balance(&self) -> Amount {
        self.token.balance_of(self.escrow)
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &LotteryConfig {
        &self.config
    }

    /// Id of the round currently driven, if any.
    #[must_use]
    pub fn active_round_id(&self) -> Option<RoundId> {
        self.active_round
    }

    /// The round currently driven, if any.
    #[must_use]
    pub fn current_round(&self) -> Option<&Round> {
        self.active_round.and_then(|id| self.rounds.get(&id))
    }

    /// Round by id.
    #[must_use]
    pub fn round(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.get(&round_id)
    }

    /// Rounds ever started.
    #[must_use]
    pub fn rounds_started(&self) -> u64 {
        self.next_round_id - 1
    }

    /// The ticket and referral ledger.
    #[must_use]
    pub fn ledger(&self) -> &TicketLedger {
        &self.ledger
    }

    /// Round a randomness request belongs to.
    #[must_use]
    pub fn round_of_request(&self, request: RequestId) -> Option<RoundId> {
        self.request_rounds.get(&request).copied()
    }

    /// Remaining free-ticket credits of a wallet.
    #[must_use]
    pub fn free_rounds_of(&self, wallet: Address) -> u32 {
        self.free_rounds.get(&wallet).copied().unwrap_or(0)
    }

    /// Registered treasury-share recipients.
    #[must_use]
    pub fn bank_wallets(&self) -> &[Address] {
        &self.bank_wallets
    }

    /// The payment token collaborator.
    #[must_use]
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Mutable token access, for minting and escrow top-ups in harnesses.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    /// The randomness oracle collaborator.
    #[must_use]
    pub fn randomizer(&self) -> &R {
        &self.randomizer
    }

    /// Mutable oracle access; the fulfillment channel in harnesses.
    pub fn randomizer_mut(&mut self) -> &mut R {
        &mut self.randomizer
    }

    // ——— Internals ————————————————————————————————————————————————————————

    fn require_admin(&self, caller: Address) -> Result<(), MasterError> {
        if caller != self.admin {
            return Err(MasterError::NotAdmin);
        }
        Ok(())
    }

    /// Rollover carried out of the active round; the round must at least
    /// have closed so its pools are settled numbers.
    fn rollover_from_active(&self) -> Result<Rollover, MasterError> {
        match self.active_round {
            None => Ok(Rollover::default()),
            Some(round_id) => {
                let round = self
                    .rounds
                    .get(&round_id)
                    .ok_or(MasterError::UnknownRound { round_id })?;
                if round.phase() < RoundPhase::Closed {
                    return Err(MasterError::ActiveRoundStillOpen { round_id });
                }
                Ok(round.rollover_out())
            }
        }
    }

    fn open_round(
        &mut self,
        now: Timestamp,
        duration: u64,
        rollover: Rollover,
        ui_id: u64,
    ) -> RoundId {
        let id = self.next_round_id;
        self.next_round_id += 1;
        self.next_ui_id = ui_id + 1;
        let round = Round::open(id, ui_id, now, duration, self.config.ticket_price, rollover);
        self.rounds.insert(id, round);
        self.active_round = Some(id);
        id
    }

    /// Shared purchase path; `picks` are already validated.
    fn purchase(
        &mut self,
        caller: Address,
        picks: &[([u8; MAIN_NUMBER_COUNT], u8)],
        referrer: Address,
    ) -> Result<Vec<TicketId>, MasterError> {
        let round_id = self.active_round.ok_or(MasterError::NoActiveRound)?;
        let (phase, price) = {
            let round = self
                .rounds
                .get(&round_id)
                .ok_or(MasterError::UnknownRound { round_id })?;
            (round.phase(), round.ticket_price)
        };
        if phase != RoundPhase::Open {
            return Err(RoundError::NotOpen { phase }.into());
        }

        let count = picks.len() as u64;
        let credit = self.free_rounds.get(&caller).copied().unwrap_or(0);
        let free_used = u64::from(credit).min(count);
        let paid = count - free_used;
        let gross = price * Amount::from(paid);
        let treasury_cut = self.config.shares.treasury_cut(gross);

        // Charge before touching any book. The treasury share leaves the
        // escrow for the bank wallets right away; the rest stays escrowed.
        if gross > 0 {
            self.token.transfer(caller, self.escrow, gross)?;
            self.pay_treasury(treasury_cut)?;
        }
        if free_used > 0 {
            let left = credit - free_used as u32;
            if left == 0 {
                self.free_rounds.remove(&caller);
            } else {
                self.free_rounds.insert(caller, left);
            }
        }

        let mut ids = Vec::with_capacity(picks.len());
        let mut referrals_added = 0u64;
        for &(main, power) in picks {
            let id = self.ledger.append_ticket(round_id, caller, main, power)?;
            ids.push(id);
            if self
                .ledger
                .append_referral(round_id, caller, referrer, self.config.referral_entitlement)
                .is_some()
            {
                referrals_added += 1;
            }
        }

        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        round.note_purchases(count, gross, treasury_cut)?;
        for _ in 0..referrals_added {
            round.note_referral()?;
        }
        Ok(ids)
    }

    /// Split the treasury cut equally across the bank wallets, remainder
    /// to the first. With no wallets registered the cut stays escrowed.
    fn pay_treasury(&mut self, cut: Amount) -> Result<(), MasterError> {
        if cut == 0 || self.bank_wallets.is_empty() {
            return Ok(());
        }
        let n = self.bank_wallets.len() as Amount;
        let share = cut / n;
        let remainder = cut - share * n;
        for i in 0..self.bank_wallets.len() {
            let wallet = self.bank_wallets[i];
            let amount = if i == 0 { share + remainder } else { share };
            if amount > 0 {
                self.token.transfer(self.escrow, wallet, amount)?;
            }
        }
        Ok(())
    }

    /// Pay out of the escrow with an explicit funds guard, so failures
    /// never follow a partial transfer.
    fn settle(&mut self, to: Address, amount: Amount) -> Result<(), MasterError> {
        if amount == 0 {
            return Ok(());
        }
        let have = self.token.balance_of(self.escrow);
        if have < amount {
            return Err(MasterError::InsufficientEscrow { have, need: amount });
        }
        self.token.transfer(self.escrow, to, amount)?;
        Ok(())
    }

    /// Everything a wallet could claim in a round right now. The same
    /// computation backs `claim_wallet` and the read layer.
    pub(crate) fn wallet_winnings(
        &self,
        round_id: RoundId,
        wallet: Address,
    ) -> Result<WalletWinnings, MasterError> {
        let round = self
            .rounds
            .get(&round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        if round.phase() != RoundPhase::WinnersMarked {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::WinnersMarked,
                actual: round.phase(),
            }
            .into());
        }
        let mut total: Amount = 0;
        let mut tickets = Vec::new();
        for &ticket_id in self.ledger.owner_tickets(round_id, wallet) {
            if let Some(ticket) = self.ledger.ticket(ticket_id) {
                if ticket.claimed {
                    continue;
                }
                if let Some(index) = ticket.victory_tier.and_then(VictoryTier::pool_index) {
                    let payout = round.tier_payout(index);
                    total += payout;
                    tickets.push((ticket_id, index, payout));
                }
            }
        }
        let referral_payout = round.referral_payout();
        let mut referrals = Vec::new();
        for &referral_id in self.ledger.referrer_entries(round_id, wallet) {
            if let Some(referral) = self.ledger.referral(referral_id) {
                if referral.winner && !referral.claimed {
                    total += referral_payout;
                    referrals.push(referral_id);
                }
            }
        }
        Ok(WalletWinnings {
            tickets,
            referrals,
            referral_payout,
            total,
        })
    }
}
