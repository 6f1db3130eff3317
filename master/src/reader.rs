//! Read/aggregation layer.
//!
//! Stateless views over round, ticket and referral state for external
//! consumption. The payout formulas are the claim computation's own
//! (`amount_won_in_round` returns exactly what `claim_wallet` would
//! settle); nothing here diverges from the authoritative path.

use alloc::vec::Vec;

use crate::interface::{PaymentToken, RandomnessSource};
use crate::{LotteryMaster, MasterError};
use lotto_draw::VictoryTier;
use lotto_pools::TIER_COUNT;
use lotto_round::{Round, RoundError, RoundPhase};
use lotto_types::{Address, Amount, ReferralId, RoundId, TicketId};

/// One ticket's standing in a marked round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TicketEvaluation {
    /// The evaluated ticket.
    pub ticket_id: TicketId,
    /// Resolved victory tier.
    pub tier: VictoryTier,
    /// Per-winner payout of the tier; zero for `NoWin`.
    pub payout: Amount,
    /// Whether the prize was already settled.
    pub claimed: bool,
}

/// One referral credit's standing in a marked round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferralEvaluation {
    /// The evaluated credit.
    pub referral_id: ReferralId,
    /// The credit's number in the referral draw.
    pub referral_number: u32,
    /// Whether the number was drawn.
    pub winner: bool,
    /// Per-winner payout of the referral bucket; zero for losers.
    pub payout: Amount,
    /// Whether the commission was already settled.
    pub claimed: bool,
}

impl<T: PaymentToken, R: RandomnessSource> LotteryMaster<T, R> {
    /// Current amount sitting in each tier bucket of a round.
    #[must_use]
    pub fn pool_per_tier(&self, round_id: RoundId) -> Option<[Amount; TIER_COUNT]> {
        let round = self.round(round_id)?;
        let mut pools = [0; TIER_COUNT];
        for (index, slot) in pools.iter_mut().enumerate() {
            *slot = round.pools().tier_pool(index);
        }
        Some(pools)
    }

    /// Unclaimed winnings of a wallet in a marked round. Zero when the
    /// round is missing, not yet marked, or the wallet won nothing.
    #[must_use]
    pub fn amount_won_in_round(&self, round_id: RoundId, wallet: Address) -> Amount {
        match self.wallet_winnings(round_id, wallet) {
            Ok(winnings) => winnings.total,
            Err(_) => 0,
        }
    }

    /// Standing of every ticket the wallet holds in a round, in purchase
    /// order.
    ///
    /// # Errors
    ///
    /// A phase error before the round is marked.
    pub fn evaluate_tickets_for_round(
        &self,
        round_id: RoundId,
        wallet: Address,
    ) -> Result<Vec<TicketEvaluation>, MasterError> {
        let round = self.marked_round(round_id)?;
        let mut evaluations = Vec::new();
        for &ticket_id in self.ledger().owner_tickets(round_id, wallet) {
            if let Some(ticket) = self.ledger().ticket(ticket_id) {
                let tier = ticket.victory_tier.unwrap_or(VictoryTier::NoWin);
                let payout = tier.pool_index().map_or(0, |index| round.tier_payout(index));
                evaluations.push(TicketEvaluation {
                    ticket_id,
                    tier,
                    payout,
                    claimed: ticket.claimed,
                });
            }
        }
        Ok(evaluations)
    }

    /// Standing of every referral credit the wallet earned in a round, in
    /// creation order.
    ///
    /// # Errors
    ///
    /// A phase error before the round is marked.
    pub fn evaluate_referral_for_round(
        &self,
        round_id: RoundId,
        wallet: Address,
    ) -> Result<Vec<ReferralEvaluation>, MasterError> {
        let round = self.marked_round(round_id)?;
        let per_winner = round.referral_payout();
        let mut evaluations = Vec::new();
        for &referral_id in self.ledger().referrer_entries(round_id, wallet) {
            if let Some(referral) = self.ledger().referral(referral_id) {
                evaluations.push(ReferralEvaluation {
                    referral_id,
                    referral_number: referral.referral_number,
                    winner: referral.winner,
                    payout: if referral.winner { per_winner } else { 0 },
                    claimed: referral.claimed,
                });
            }
        }
        Ok(evaluations)
    }

    fn marked_round(&self, round_id: RoundId) -> Result<&Round, MasterError> {
        let round = self
            .round(round_id)
            .ok_or(MasterError::UnknownRound { round_id })?;
        if round.phase() != RoundPhase::WinnersMarked {
            return Err(RoundError::WrongPhase {
                expected: RoundPhase::WinnersMarked,
                actual: round.phase(),
            }
            .into());
        }
        Ok(round)
    }
}
