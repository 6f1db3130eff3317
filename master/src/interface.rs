//! Collaborator interfaces: the payment token and the randomness oracle.
//!
//! The orchestrator touches its surroundings only through these two traits.
//! The in-memory implementations below are the reference adapters driven by
//! tests and demos; a deployment substitutes real ledger and oracle
//! bindings.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use lotto_types::{h_tag, le_bytes, word_from_hash, Address, Amount, RandomWord, RequestId};

// ——— Payment token ————————————————————————————————————————————————————————

/// Fungible-token ledger the lottery charges and pays through.
///
/// Amounts are in the token's native integer unit; the engine never assumes
/// a decimal scale.
pub trait PaymentToken {
    /// Balance of a wallet.
    fn balance_of(&self, wallet: Address) -> Amount;

    /// Move `amount` from one wallet to another.
    ///
    /// # Errors
    ///
    /// [`TokenError::InsufficientBalance`] when `from` cannot cover
    /// `amount`; nothing moves on failure.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;
}

/// Token transfer errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenError {
    /// The paying wallet holds less than the transfer amount.
    InsufficientBalance {
        /// The paying wallet.
        wallet: Address,
        /// Its current balance.
        have: Amount,
        /// The amount the transfer needed.
        need: Amount,
    },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance { have, need, .. } => {
                write!(f, "wallet balance {have} cannot cover transfer of {need}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TokenError {}

/// Plain in-memory token ledger.
#[derive(Clone, Debug, Default)]
pub struct InMemoryToken {
    balances: BTreeMap<Address, Amount>,
}

impl InMemoryToken {
    /// Empty ledger; every wallet starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a wallet out of thin air.
    pub fn mint(&mut self, wallet: Address, amount: Amount) {
        *self.balances.entry(wallet).or_insert(0) += amount;
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }
}

impl PaymentToken for InMemoryToken {
    fn balance_of(&self, wallet: Address) -> Amount {
        self.balances.get(&wallet).copied().unwrap_or(0)
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        if amount == 0 {
            return Ok(());
        }
        let have = self.balance_of(from);
        if have < amount {
            return Err(TokenError::InsufficientBalance {
                wallet: from,
                have,
                need: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        *self.balances.entry(from).or_insert(0) -= amount;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }
}

// ——— Randomness oracle ————————————————————————————————————————————————————

/// Status of one oracle request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestStatus {
    /// Word count asked for at request time.
    pub requested_words: u32,
    /// True once the oracle delivered.
    pub fulfilled: bool,
    /// Delivered words; empty until fulfilled.
    pub words: Vec<RandomWord>,
}

/// Randomness oracle adapter: request now, poll status later.
///
/// Fulfillment arrives out-of-band through the adapter's own channel; the
/// engine never blocks on it and a stalled request has no timeout.
pub trait RandomnessSource {
    /// Issue a request for `word_count` random words.
    fn request_random_words(&mut self, word_count: u32) -> RequestId;

    /// Current status of a request; `None` for ids this oracle never issued.
    fn status(&self, request: RequestId) -> Option<&RequestStatus>;
}

/// Oracle fulfillment errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RandomizerError {
    /// Fulfillment for an id this oracle never issued.
    UnknownRequest {
        /// The offending id.
        request: RequestId,
    },
    /// A request is fulfilled exactly once; results are never overwritten.
    AlreadyFulfilled {
        /// The already-settled id.
        request: RequestId,
    },
    /// Fulfillment carried a different word count than requested.
    WordCountMismatch {
        /// Count fixed at request time.
        expected: u32,
        /// Count actually delivered.
        got: u32,
    },
}

impl fmt::Display for RandomizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRequest { request } => {
                write!(f, "unknown randomness request {request}")
            }
            Self::AlreadyFulfilled { request } => {
                write!(f, "randomness request {request} is already fulfilled")
            }
            Self::WordCountMismatch { expected, got } => {
                write!(f, "expected {expected} random words, got {got}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RandomizerError {}

/// Deterministic in-memory oracle (not secure, stable across runs).
///
/// Request ids are sequential from 1. Tests play the oracle's delivery
/// channel: either hand in explicit words with [`MockRandomizer::fulfill`]
/// or let [`MockRandomizer::fulfill_auto`] derive them from the seed.
#[derive(Clone, Debug, Default)]
pub struct MockRandomizer {
    seed: u64,
    next_request: RequestId,
    requests: BTreeMap<RequestId, RequestStatus>,
}

impl MockRandomizer {
    /// Oracle with seed zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Oracle whose derived fulfillments follow `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Deliver explicit words for an outstanding request.
    ///
    /// # Errors
    ///
    /// [`RandomizerError::UnknownRequest`] for ids never issued,
    /// [`RandomizerError::AlreadyFulfilled`] on repeats,
    /// [`RandomizerError::WordCountMismatch`] when the delivery does not
    /// match the requested count. Existing results are never overwritten.
    pub fn fulfill(
        &mut self,
        request: RequestId,
        words: Vec<RandomWord>,
    ) -> Result<(), RandomizerError> {
        let status = self
            .requests
            .get_mut(&request)
            .ok_or(RandomizerError::UnknownRequest { request })?;
        if status.fulfilled {
            return Err(RandomizerError::AlreadyFulfilled { request });
        }
        let got = words.len() as u32;
        if got != status.requested_words {
            return Err(RandomizerError::WordCountMismatch {
                expected: status.requested_words,
                got,
            });
        }
        status.words = words;
        status.fulfilled = true;
        Ok(())
    }

    /// Deliver seed-derived words for an outstanding request.
    ///
    /// # Errors
    ///
    /// Same as [`MockRandomizer::fulfill`], minus the count mismatch.
    pub fn fulfill_auto(&mut self, request: RequestId) -> Result<(), RandomizerError> {
        let count = {
            let status = self
                .requests
                .get(&request)
                .ok_or(RandomizerError::UnknownRequest { request })?;
            if status.fulfilled {
                return Err(RandomizerError::AlreadyFulfilled { request });
            }
            status.requested_words
        };
        let words = (0..count)
            .map(|index| Self::derived_word(self.seed, request, index))
            .collect();
        self.fulfill(request, words)
    }

    fn derived_word(seed: u64, request: RequestId, index: u32) -> RandomWord {
        let h = h_tag(
            "lotto.mock.word",
            &[
                &le_bytes::<8>(u128::from(seed)),
                &le_bytes::<8>(u128::from(request)),
                &le_bytes::<4>(u128::from(index)),
            ],
        );
        word_from_hash(&h)
    }
}

impl RandomnessSource for MockRandomizer {
    fn request_random_words(&mut self, word_count: u32) -> RequestId {
        self.next_request += 1;
        let id = self.next_request;
        self.requests.insert(
            id,
            RequestStatus {
                requested_words: word_count,
                fulfilled: false,
                words: Vec::new(),
            },
        );
        id
    }

    fn status(&self, request: RequestId) -> Option<&RequestStatus> {
        self.requests.get(&request)
    }
}
