//! Ticket ledger.
//!
//! Append-only stores for tickets and referral credits across all rounds,
//! with BTreeMap indexes by round and by owner/referrer. The ledger
//! validates ticket numbers and assigns referral numbers under the
//! entitlement cap; lifecycle rules (which phase may append, who may claim)
//! live with the round machine and the orchestrator. Records are never
//! removed; outcome and claim flags mutate through the focused setters
//! below and nothing else.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use lotto_draw::constants::MAIN_NUMBER_COUNT;
use lotto_draw::{valid_main_numbers, valid_power_number, VictoryTier};
use lotto_types::{Address, ReferralId, RoundId, TicketId, ZERO_ADDRESS};

/// One purchased ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Unique across all rounds; doubles as the ledger index.
    pub id: TicketId,
    /// Round the ticket belongs to.
    pub round_id: RoundId,
    /// Buyer and prize recipient.
    pub participant: Address,
    /// 5 chosen values in `1..=69`, stored as submitted.
    pub main_numbers: [u8; MAIN_NUMBER_COUNT],
    /// Chosen value in `1..=26`.
    pub power_number: u8,
    /// `None` until the round reaches WinnersMarked.
    pub victory_tier: Option<VictoryTier>,
    /// Set once on successful claim.
    pub claimed: bool,
}

/// One referral credit, created alongside a qualifying purchase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferralTicket {
    /// Unique across all rounds; doubles as the ledger index.
    pub id: ReferralId,
    /// Round the credit belongs to.
    pub round_id: RoundId,
    /// The referred buyer.
    pub buyer: Address,
    /// The wallet earning the credit.
    pub referrer: Address,
    /// Per-round, per-referrer sequential index starting at 1.
    pub referral_number: u32,
    /// Set at WinnersMarked when the referral number was drawn.
    pub winner: bool,
    /// Set once the referrer's winnings for this credit settle.
    pub claimed: bool,
}

/// Ticket validation errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TicketError {
    /// Main numbers out of range or not distinct.
    InvalidNumbers,
    /// Power number out of range.
    InvalidPowerNumber,
}

impl fmt::Display for TicketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNumbers => write!(f, "Invalid numbers"),
            Self::InvalidPowerNumber => write!(f, "Invalid power number"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TicketError {}

/// Append-only ticket/referral store with per-round and per-owner indexes.
#[derive(Default)]
pub struct TicketLedger {
    tickets: Vec<Ticket>,
    referrals: Vec<ReferralTicket>,
    round_tickets: BTreeMap<RoundId, Vec<TicketId>>,
    round_referrals: BTreeMap<RoundId, Vec<ReferralId>>,
    owner_tickets: BTreeMap<(RoundId, Address), Vec<TicketId>>,
    referrer_entries: BTreeMap<(RoundId, Address), Vec<ReferralId>>,
    referral_peak: BTreeMap<RoundId, u32>,
}

impl TicketLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate chosen numbers without touching state.
    ///
    /// # Errors
    ///
    /// `InvalidNumbers` unless the 5 main values are in range and distinct;
    /// `InvalidPowerNumber` unless the power value is in range.
    pub fn validate_numbers(
        main: &[u8; MAIN_NUMBER_COUNT],
        power: u8,
    ) -> Result<(), TicketError> {
        if !valid_main_numbers(main) {
            return Err(TicketError::InvalidNumbers);
        }
        if !valid_power_number(power) {
            return Err(TicketError::InvalidPowerNumber);
        }
        Ok(())
    }

    // ——— Appends ——————————————————————————————————————————————————————————

    /// Validate and append one ticket; returns the assigned id.
    ///
    /// # Errors
    ///
    /// Propagates [`TicketLedger::validate_numbers`]; nothing is stored on
    /// failure.
    pub fn append_ticket(
        &mut self,
        round_id: RoundId,
        participant: Address,
        main_numbers: [u8; MAIN_NUMBER_COUNT],
        power_number: u8,
    ) -> Result<TicketId, TicketError> {
        Self::validate_numbers(&main_numbers, power_number)?;
        let id = self.tickets.len() as TicketId;
        self.tickets.push(Ticket {
            id,
            round_id,
            participant,
            main_numbers,
            power_number,
            victory_tier: None,
            claimed: false,
        });
        self.round_tickets.entry(round_id).or_default().push(id);
        self.owner_tickets
            .entry((round_id, participant))
            .or_default()
            .push(id);
        Ok(id)
    }

    /// Append a referral credit for a qualifying purchase.
    ///
    /// Returns `None` without error when the referrer is the zero address,
    /// the buyer themself, or already at the entitlement cap for the round.
    /// The assigned `referral_number` continues the referrer's contiguous
    /// run from 1.
    pub fn append_referral(
        &mut self,
        round_id: RoundId,
        buyer: Address,
        referrer: Address,
        entitlement: u32,
    ) -> Option<ReferralId> {
        if referrer == ZERO_ADDRESS || referrer == buyer {
            return None;
        }
        let assigned = self.referral_count_of(round_id, referrer);
        if assigned >= entitlement {
            return None;
        }
        let referral_number = assigned + 1;
        let id = self.referrals.len() as ReferralId;
        self.referrals.push(ReferralTicket {
            id,
            round_id,
            buyer,
            referrer,
            referral_number,
            winner: false,
            claimed: false,
        });
        self.round_referrals.entry(round_id).or_default().push(id);
        self.referrer_entries
            .entry((round_id, referrer))
            .or_default()
            .push(id);
        let peak = self.referral_peak.entry(round_id).or_insert(0);
        if referral_number > *peak {
            *peak = referral_number;
        }
        Some(id)
    }

    // ——— Lookups ——————————————————————————————————————————————————————————

    /// Ticket by id.
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.get(id as usize)
    }

    /// Referral credit by id.
    #[must_use]
    pub fn referral(&self, id: ReferralId) -> Option<&ReferralTicket> {
        self.referrals.get(id as usize)
    }

    /// Total tickets ever sold.
    #[must_use]
    pub fn tickets_len(&self) -> u64 {
        self.tickets.len() as u64
    }

    /// Total referral credits ever created.
    #[must_use]
    pub fn referrals_len(&self) -> u64 {
        self.referrals.len() as u64
    }

    /// Ordered ticket ids of a round.
    #[must_use]
    pub fn round_tickets(&self, round_id: RoundId) -> &[TicketId] {
        self.round_tickets
            .get(&round_id)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Ordered referral-credit ids of a round.
    #[must_use]
    pub fn round_referrals(&self, round_id: RoundId) -> &[ReferralId] {
        self.round_referrals
            .get(&round_id)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Ticket ids a wallet holds within a round.
    #[must_use]
    pub fn owner_tickets(&self, round_id: RoundId, owner: Address) -> &[TicketId] {
        self.owner_tickets
            .get(&(round_id, owner))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Referral-credit ids a referrer holds within a round.
    #[must_use]
    pub fn referrer_entries(&self, round_id: RoundId, referrer: Address) -> &[ReferralId] {
        self.referrer_entries
            .get(&(round_id, referrer))
            .map_or(&[][..], Vec::as_slice)
    }

    /// How many referral numbers a referrer holds within a round.
    #[must_use]
    pub fn referral_count_of(&self, round_id: RoundId, referrer: Address) -> u32 {
        self.referrer_entries(round_id, referrer).len() as u32
    }

    /// Highest referral number assigned in the round; the referral draw
    /// range. Zero when the round has no referral credits.
    #[must_use]
    pub fn referral_peak(&self, round_id: RoundId) -> u32 {
        self.referral_peak.get(&round_id).copied().unwrap_or(0)
    }

    // ——— Controlled mutation ——————————————————————————————————————————————

    /// Run `f` over every ticket of a round, in purchase order.
    pub fn for_each_round_ticket_mut(
        &mut self,
        round_id: RoundId,
        f: &mut dyn FnMut(&mut Ticket),
    ) {
        if let Some(ids) = self.round_tickets.get(&round_id) {
            for &id in ids {
                if let Some(ticket) = self.tickets.get_mut(id as usize) {
                    f(ticket);
                }
            }
        }
    }

    /// Run `f` over every referral credit of a round, in creation order.
    pub fn for_each_round_referral_mut(
        &mut self,
        round_id: RoundId,
        f: &mut dyn FnMut(&mut ReferralTicket),
    ) {
        if let Some(ids) = self.round_referrals.get(&round_id) {
            for &id in ids {
                if let Some(referral) = self.referrals.get_mut(id as usize) {
                    f(referral);
                }
            }
        }
    }

    /// Flag a ticket claimed. False when unknown or already claimed.
    pub fn mark_ticket_claimed(&mut self, id: TicketId) -> bool {
        match self.tickets.get_mut(id as usize) {
            Some(ticket) if !ticket.claimed => {
                ticket.claimed = true;
                true
            }
            _ => false,
        }
    }

    /// Flag a referral credit claimed. False when unknown or already claimed.
    pub fn mark_referral_claimed(&mut self, id: ReferralId) -> bool {
        match self.referrals.get_mut(id as usize) {
            Some(referral) if !referral.claimed => {
                referral.claimed = true;
                true
            }
            _ => false,
        }
    }
}
