//! Numbers & Tiers engine.
//!
//! Pure functions only: reduce raw oracle words to the winning set (5
//! distinct main numbers plus an independent power number), draw deduped
//! referral-winner indices over an arbitrary range, and resolve a ticket
//! against the winning set into its victory tier. Everything here is
//! deterministic in the input words; no state, no I/O.

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use lotto_types::{RandomWord, U256};

/// Draw constants. The number space is fixed by the game rules, not by
/// configuration.
pub mod constants {
    /// Main numbers per ticket and per winning set.
    pub const MAIN_NUMBER_COUNT: usize = 5;
    /// Main numbers are drawn from `1..=MAIN_NUMBER_MAX`.
    pub const MAIN_NUMBER_MAX: u8 = 69;
    /// The power number is drawn from `1..=POWER_NUMBER_MAX`.
    pub const POWER_NUMBER_MAX: u8 = 26;
    /// Raw words consumed by one winning-set derivation (5 main + 1 power).
    pub const WORDS_PER_DRAW: usize = MAIN_NUMBER_COUNT + 1;
}

use constants::{MAIN_NUMBER_COUNT, MAIN_NUMBER_MAX, POWER_NUMBER_MAX, WORDS_PER_DRAW};

/// The drawn winning numbers of one round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WinningSet {
    /// 5 distinct values in `1..=69`, in draw order.
    pub main: [u8; MAIN_NUMBER_COUNT],
    /// Value in `1..=26`, drawn independently; may equal a main number.
    pub power: u8,
}

/// Victory tier of a ticket, highest payout first.
///
/// The tier is determined solely by the count of matched main numbers plus
/// whether the power number matched; see [`match_tier`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VictoryTier {
    /// 5 main matches and the power number.
    Tier5Plus,
    /// 5 main matches.
    Tier5,
    /// 4 main matches and the power number.
    Tier4Plus,
    /// 4 main matches.
    Tier4,
    /// 3 main matches and the power number.
    Tier3Plus,
    /// 3 main matches.
    Tier3,
    /// Fewer than 3 main matches; never pays out.
    NoWin,
}

impl VictoryTier {
    /// Number of paying tiers (everything except [`VictoryTier::NoWin`]).
    pub const COUNT: usize = 6;

    /// Index of this tier in the per-tier pool arrays; `None` for `NoWin`.
    #[must_use]
    pub fn pool_index(self) -> Option<usize> {
        match self {
            Self::Tier5Plus => Some(0),
            Self::Tier5 => Some(1),
            Self::Tier4Plus => Some(2),
            Self::Tier4 => Some(3),
            Self::Tier3Plus => Some(4),
            Self::Tier3 => Some(5),
            Self::NoWin => None,
        }
    }

    /// Inverse of [`VictoryTier::pool_index`].
    #[must_use]
    pub fn from_pool_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Tier5Plus),
            1 => Some(Self::Tier5),
            2 => Some(Self::Tier4Plus),
            3 => Some(Self::Tier4),
            4 => Some(Self::Tier3Plus),
            5 => Some(Self::Tier3),
            _ => None,
        }
    }
}

impl fmt::Display for VictoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier5Plus => write!(f, "5 matches + power"),
            Self::Tier5 => write!(f, "5 matches"),
            Self::Tier4Plus => write!(f, "4 matches + power"),
            Self::Tier4 => write!(f, "4 matches"),
            Self::Tier3Plus => write!(f, "3 matches + power"),
            Self::Tier3 => write!(f, "3 matches"),
            Self::NoWin => write!(f, "no win"),
        }
    }
}

/// Errors of the draw engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawError {
    /// The oracle delivered fewer words than one derivation consumes.
    NotEnoughWords {
        /// Words required.
        needed: usize,
        /// Words supplied.
        got: usize,
    },
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughWords { needed, got } => {
                write!(f, "not enough random words: needed {needed}, got {got}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DrawError {}

// ——— Word reduction and deduped draws —————————————————————————————————————

/// Reduce one raw word to a value in `1..=range` by `word mod range + 1`.
///
/// `range` must be non-zero.
#[inline]
#[must_use]
pub fn reduce_word(word: &RandomWord, range: u32) -> u32 {
    debug_assert!(range > 0);
    (*word % U256::from(range)).low_u32() + 1
}

/// Draw up to `count` distinct values in `1..=range` from `words`.
///
/// Each word reduces to a candidate; a candidate colliding with an already
/// drawn value advances deterministically to the next unused value in range
/// order, wrapping from `range` back to 1. Distinctness is therefore
/// guaranteed even when the oracle returns duplicate raw words. When `count`
/// exceeds `range`, the draw stops once the whole range is exhausted; when
/// `words` runs short, the values drawn so far are returned.
#[must_use]
pub fn draw_distinct(words: &[RandomWord], range: u32, count: usize) -> Vec<u32> {
    if range == 0 || count == 0 {
        return Vec::new();
    }
    let target = count.min(range as usize);
    let mut picked = Vec::with_capacity(target);
    let mut used = BTreeSet::new();
    for word in words {
        if picked.len() == target {
            break;
        }
        let mut candidate = reduce_word(word, range);
        while !used.insert(candidate) {
            candidate = if candidate == range { 1 } else { candidate + 1 };
        }
        picked.push(candidate);
    }
    picked
}

/// Derive the winning set from the first [`constants::WORDS_PER_DRAW`] raw
/// words: words 0..5 feed the deduped main draw, word 5 the power number.
///
/// # Errors
///
/// [`DrawError::NotEnoughWords`] when fewer than 6 words are supplied.
pub fn derive_winning_set(words: &[RandomWord]) -> Result<WinningSet, DrawError> {
    if words.len() < WORDS_PER_DRAW {
        return Err(DrawError::NotEnoughWords {
            needed: WORDS_PER_DRAW,
            got: words.len(),
        });
    }
    let values = draw_distinct(
        &words[..MAIN_NUMBER_COUNT],
        u32::from(MAIN_NUMBER_MAX),
        MAIN_NUMBER_COUNT,
    );
    let mut main = [0u8; MAIN_NUMBER_COUNT];
    for (slot, value) in main.iter_mut().zip(values) {
        *slot = value as u8;
    }
    let power = reduce_word(&words[MAIN_NUMBER_COUNT], u32::from(POWER_NUMBER_MAX)) as u8;
    Ok(WinningSet { main, power })
}

/// Draw the referral-winner index set over `1..=assigned_range`.
///
/// Same deduped draw as the main numbers. An empty range (no referral
/// entries in the round) draws nothing; a `winner_count` at or above the
/// range makes every index a winner.
#[must_use]
pub fn derive_referral_winners(
    words: &[RandomWord],
    assigned_range: u32,
    winner_count: u32,
) -> Vec<u32> {
    draw_distinct(words, assigned_range, winner_count as usize)
}

// ——— Ticket validation and tier matching ——————————————————————————————————

/// True iff all 5 values are in `1..=69` with no internal duplicates.
#[must_use]
pub fn valid_main_numbers(numbers: &[u8; MAIN_NUMBER_COUNT]) -> bool {
    for (i, n) in numbers.iter().enumerate() {
        if *n == 0 || *n > MAIN_NUMBER_MAX {
            return false;
        }
        if numbers[..i].contains(n) {
            return false;
        }
    }
    true
}

/// True iff the power number is in `1..=26`.
#[must_use]
pub fn valid_power_number(power: u8) -> bool {
    power >= 1 && power <= POWER_NUMBER_MAX
}

/// Resolve a ticket against the winning set.
///
/// With `k` matched main numbers and `power_hit` on the power number:
/// `(5,true)` → Tier5Plus, `(5,false)` → Tier5, `(4,true)` → Tier4Plus,
/// `(4,false)` → Tier4, `(3,true)` → Tier3Plus, `(3,false)` → Tier3,
/// anything else → NoWin. This mapping determines payouts; it is total and
/// tie-break free.
#[must_use]
pub fn match_tier(
    ticket_main: &[u8; MAIN_NUMBER_COUNT],
    ticket_power: u8,
    winning: &WinningSet,
) -> VictoryTier {
    let mut matches = 0usize;
    for n in ticket_main {
        if winning.main.contains(n) {
            matches += 1;
        }
    }
    let power_hit = ticket_power == winning.power;
    match (matches, power_hit) {
        (5, true) => VictoryTier::Tier5Plus,
        (5, false) => VictoryTier::Tier5,
        (4, true) => VictoryTier::Tier4Plus,
        (4, false) => VictoryTier::Tier4,
        (3, true) => VictoryTier::Tier3Plus,
        (3, false) => VictoryTier::Tier3,
        _ => VictoryTier::NoWin,
    }
}

#[cfg(test)]
mod tests;
