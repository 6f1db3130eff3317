//! Shared primitives for the lottery engine workspace.
//!
//! Every crate in the workspace speaks in these aliases: addresses, token
//! amounts in the payment token's native integer unit, round/ticket ids, and
//! the 256-bit raw words delivered by the randomness oracle. The tagged
//! hashing helpers back the deterministic mock oracle and the label-derived
//! addresses used by demos and tests.

#![no_std]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

use alloc::vec::Vec;
use sha3::{Digest, Sha3_256};

// Re-export dependencies
pub use primitive_types::U256;
pub use sha3;

/// 32-byte account address. Addresses are opaque identifiers; the engine
/// never derives meaning from their bytes beyond equality and ordering.
pub type Address = [u8; 32];

/// The all-zero address, treated as "no address" (e.g. no referrer).
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Token amount in the payment token's native integer unit.
/// No decimal assumptions anywhere in the engine.
pub type Amount = u128;

/// Engine timestamp in seconds. Supplied by the caller on time-sensitive
/// operations; the engine keeps no clock of its own.
pub type Timestamp = u64;

/// Sequential round id, 1-based, never reused.
pub type RoundId = u64;

/// Ticket id, unique across all rounds.
pub type TicketId = u64;

/// Referral-ticket id, unique across all rounds.
pub type ReferralId = u64;

/// Randomness-request id issued by the oracle collaborator.
pub type RequestId = u64;

/// 32-byte hash output.
pub type Hash256 = [u8; 32];

/// One raw random word as delivered by the oracle (full 256-bit range).
pub type RandomWord = U256;

// ——— Integer encoding utilities ———————————————————————————————————————————

/// Convert an integer to little-endian bytes with the specified width.
#[inline]
#[must_use]
pub fn le_bytes<const W: usize>(mut x: u128) -> [u8; W] {
    let mut out = [0u8; W];
    for byte in out.iter_mut().take(W) {
        *byte = (x & 0xFF) as u8;
        x >>= 8;
    }
    out
}

// ——— Domain-tagged hashing ————————————————————————————————————————————————

/// SHA3-256 hash.
#[inline]
#[must_use]
pub fn sha3_256(input: &[u8]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    hasher.update(input);
    hasher.finalize().into()
}

/// Domain-tagged SHA3-256 with length framing:
/// `H(tag || len(part1) || part1 || len(part2) || part2 || ...)`,
/// lengths encoded LE(8).
#[inline]
#[must_use]
pub fn h_tag(tag: &str, parts: &[&[u8]]) -> Hash256 {
    let mut buf = Vec::new();
    buf.extend_from_slice(tag.as_bytes());
    for p in parts {
        let len = le_bytes::<8>(p.len() as u128);
        buf.extend_from_slice(&len);
        buf.extend_from_slice(p);
    }
    sha3_256(&buf)
}

/// Interpret a hash as a big-endian 256-bit random word.
#[inline]
#[must_use]
pub fn word_from_hash(h: &Hash256) -> RandomWord {
    U256::from_big_endian(h)
}

/// Derive a stable address from a human-readable label.
/// Used by demos and tests; production addresses arrive from outside.
#[inline]
#[must_use]
pub fn address_from_label(label: &str) -> Address {
    h_tag("lotto.addr", &[label.as_bytes()])
}
