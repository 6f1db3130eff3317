//! Lottery engine demos.
//!
//! Command-line walkthroughs of the orchestrator: a seeded in-memory token
//! and mock oracle stand in for the real ledger and randomness bindings, so
//! every run is deterministic and self-contained.

use std::time::{SystemTime, UNIX_EPOCH};

use lotto_master::interface::{InMemoryToken, MockRandomizer, PaymentToken};
use lotto_master::types::{address_from_label, Address, Amount, Timestamp, U256, ZERO_ADDRESS};
use lotto_master::{utils::default_config, LotteryMaster, MasterError};

pub type Master = LotteryMaster<InMemoryToken, MockRandomizer>;

/// Demo error type.
#[derive(Debug)]
pub enum DemoError {
    Master(MasterError),
    Other(String),
}

impl From<MasterError> for DemoError {
    fn from(err: MasterError) -> Self {
        DemoError::Master(err)
    }
}

impl std::fmt::Display for DemoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DemoError::Master(err) => write!(f, "{err}"),
            DemoError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DemoError {}

pub mod utils {
    use super::*;

    /// Wall-clock seconds; the demos fast-forward from here instead of
    /// sleeping through a five-day sale window.
    pub fn now() -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Render a native amount as whole tokens (6 decimals).
    pub fn units(amount: Amount) -> String {
        format!("{}.{:06}", amount / 1_000_000, amount % 1_000_000)
    }

    /// Short printable form of an address.
    pub fn short(address: Address) -> String {
        hex::encode(&address[..4])
    }

    /// A master over freshly minted player wallets.
    pub fn wired_master(seed: u64, players: &[(&str, Amount)]) -> Result<Master, DemoError> {
        let mut token = InMemoryToken::new();
        for &(name, balance) in players {
            token.mint(address_from_label(name), balance);
        }
        let master = LotteryMaster::new(
            address_from_label("demo.admin"),
            address_from_label("demo.escrow"),
            default_config(),
            token,
            MockRandomizer::seeded(seed),
        )?;
        Ok(master)
    }
}

/// One full round: purchases, draw, marking, claims.
pub mod single_round {
    use super::utils::{now, short, units, wired_master};
    use super::*;
    use lotto_master::draw::VictoryTier;
    use lotto_master::pools::TIER_COUNT;

    pub fn run(seed: u64) -> Result<(), DemoError> {
        let players = [
            ("alice", 100_000_000),
            ("bob", 100_000_000),
            ("carol", 100_000_000),
        ];
        let mut master = wired_master(seed, &players)?;
        let admin = master.admin();
        let duration = master.config().round_duration;

        let start = now();
        let round_id = master.start_new_round(admin, start, duration)?;
        println!("=== Round {round_id} open ===");
        println!(
            "Ticket price: {} | sale window: {duration}s",
            units(master.config().ticket_price)
        );

        let alice = address_from_label("alice");
        let bob = address_from_label("bob");
        let carol = address_from_label("carol");

        master.buy_ticket(alice, [5, 23, 42, 57, 64], 12, ZERO_ADDRESS)?;
        println!("alice ({}) buys [5 23 42 57 64] + 12", short(alice));
        let flat = [
            1, 2, 3, 4, 69, 26, //
            7, 19, 33, 48, 61, 9, //
            14, 25, 36, 47, 58, 3,
        ];
        let ids = master.buy_tickets(bob, &flat, alice)?;
        println!(
            "bob ({}) buys {} tickets in one batch, alice as referrer",
            short(bob),
            ids.len()
        );
        master.buy_ticket(carol, [11, 22, 33, 44, 55], 20, ZERO_ADDRESS)?;
        println!("carol ({}) buys [11 22 33 44 55] + 20", short(carol));

        let round = master
            .current_round()
            .ok_or_else(|| DemoError::Other("no active round".to_string()))?;
        println!("\n--- Sales ---");
        println!("Tickets sold: {}", round.tickets_count());
        println!("Referral credits: {}", round.referral_count());
        println!("Collected: {}", units(round.collected()));
        println!("Escrow holds: {}", units(master.escrow_balance()));

        // Five days pass.
        let request = master.close_round(start + duration)?;
        println!("\n--- Closed; randomness request {request} issued ---");
        master
            .randomizer_mut()
            .fulfill_auto(request)
            .map_err(|e| DemoError::Other(e.to_string()))?;
        master.fetch_round_numbers(round_id)?;
        master.mark_winners(round_id)?;

        let round = master
            .round(round_id)
            .ok_or_else(|| DemoError::Other("round vanished".to_string()))?;
        println!(
            "Winning numbers: {:?} | power: {}",
            round.winning_numbers(),
            round.power_number()
        );
        println!("\n--- Results ---");
        for index in 0..TIER_COUNT {
            if let Some(tier) = VictoryTier::from_pool_index(index) {
                println!(
                    "{tier}: {} winner(s), pool {}",
                    round.winners_for_tier(index),
                    units(round.pools().tier_pool(index))
                );
            }
        }
        println!(
            "Referral winners: {} of pool {}",
            round.referral_winner_count(),
            units(round.pools().referral_pool())
        );

        println!("\n--- Claims ---");
        for (name, wallet) in [("alice", alice), ("bob", bob), ("carol", carol)] {
            match master.claim_wallet(wallet, round_id) {
                Ok(total) => println!("{name} claims {}", units(total)),
                Err(MasterError::NothingToClaim) => println!("{name}: nothing to claim"),
                Err(err) => return Err(err.into()),
            }
        }

        println!("\n--- Final balances ---");
        for (name, wallet) in [("alice", alice), ("bob", bob), ("carol", carol)] {
            println!("{name}: {}", units(master.token().balance_of(wallet)));
        }
        println!("escrow: {}", units(master.escrow_balance()));
        println!("\nSingle-round demo completed!");
        Ok(())
    }
}

/// Two rounds with a scripted jackpot: shows claims draining buckets and
/// the unclaimed rest rolling into the next round.
pub mod rollover {
    use super::utils::{now, units, wired_master};
    use super::*;
    use lotto_master::pools::TIER_COUNT;

    /// Oracle words that reduce to the winning set {1,2,3,4,69} / 26.
    fn scripted_words(count: u32) -> Vec<U256> {
        let mut words: Vec<U256> = [0u64, 0, 2, 3, 68, 25]
            .iter()
            .map(|&n| U256::from(n))
            .collect();
        words.resize(count as usize, U256::zero());
        words
    }

    pub fn run() -> Result<(), DemoError> {
        let players = [
            ("alice", 100_000_000),
            ("bob", 100_000_000),
            ("dave", 100_000_000),
        ];
        let mut master = wired_master(7, &players)?;
        let admin = master.admin();
        let duration = master.config().round_duration;
        let word_count = u32::try_from(lotto_master::draw::constants::WORDS_PER_DRAW)
            .map_err(|_| DemoError::Other("word count overflow".to_string()))?
            + master.config().max_referral_winners;

        let alice = address_from_label("alice");
        let bob = address_from_label("bob");
        let carol = address_from_label("carol");
        let dave = address_from_label("dave");

        let start = now();
        let first = master.start_new_round(admin, start, duration)?;
        println!("=== Round {first} ===");
        master.buy_ticket(alice, [1, 2, 3, 4, 69], 26, ZERO_ADDRESS)?;
        master.buy_ticket(bob, [10, 20, 30, 40, 50], 5, carol)?;
        master.buy_ticket(bob, [11, 21, 31, 41, 51], 7, carol)?;
        println!("3 tickets sold; escrow {}", units(master.escrow_balance()));

        let request = master.close_round(start + duration)?;
        master
            .randomizer_mut()
            .fulfill(request, scripted_words(word_count))
            .map_err(|e| DemoError::Other(e.to_string()))?;
        master.fetch_round_numbers(first)?;
        master.mark_winners(first)?;

        let jackpot = master.amount_won_in_round(first, alice);
        println!("alice hit the jackpot: {}", units(jackpot));
        master.claim_wallet(alice, first)?;
        let commission = master.amount_won_in_round(first, carol);
        println!("carol's referral commission: {}", units(commission));
        master.claim_wallet(carol, first)?;

        let carried = master
            .round(first)
            .ok_or_else(|| DemoError::Other("round vanished".to_string()))?
            .rollover_out();
        println!("\nUnclaimed after round {first}: {}", units(carried.total()));

        let next_start = start + duration;
        let second = master.start_new_round(admin, next_start, duration)?;
        println!("\n=== Round {second} ===");
        master.buy_ticket(dave, [6, 16, 26, 36, 46], 13, ZERO_ADDRESS)?;
        let request = master.close_round(next_start + duration)?;
        master
            .randomizer_mut()
            .fulfill_auto(request)
            .map_err(|e| DemoError::Other(e.to_string()))?;
        master.fetch_round_numbers(second)?;
        master.mark_winners(second)?;

        println!("Round {second} tier pools (fresh sales + carryover):");
        if let Some(pools) = master.pool_per_tier(second) {
            for index in 0..TIER_COUNT {
                println!("  tier {index}: {}", units(pools[index]));
            }
        }
        println!("escrow still holds {}", units(master.escrow_balance()));
        println!("\nRollover demo completed!");
        Ok(())
    }
}
