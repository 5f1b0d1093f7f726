// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Deterministic core types and canonical encoding helpers.

use crate::core::math::Int;
use bincode::Options;
use ring::digest;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for a single decoded store record.
pub const MAX_RECORD_BYTES: usize = 1 << 20;

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization: {0}")]
    Deserialize(String),
    #[error("size limit exceeded")]
    TooLarge,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Varint keeps small counters and heights compact in store values.
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules. Requires deterministic container ordering
/// (use BTreeMap/BTreeSet).
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|e| CodecError::Deserialize(e.to_string()))
}

/// Encode a value that is about to be written to the store.
///
/// Every type routed through here is a plain serde struct, so failure means the
/// encoder itself is broken and the state machine must stop.
pub fn must_encode<T: Serialize>(v: &T) -> Vec<u8> {
    match encode_canonical(v) {
        Ok(b) => b,
        Err(e) => panic!("store record encoding failed: {e}"),
    }
}

/// Decode a value read back from the store. A corrupted record halts the node.
pub fn must_decode<T: DeserializeOwned>(bytes: &[u8], what: &str) -> T {
    match decode_canonical_limited(bytes, MAX_RECORD_BYTES) {
        Ok(v) => v,
        Err(e) => panic!("corrupted {what} record: {e}"),
    }
}

/// First 20 bytes of SHA-256.
pub fn sha256_20(data: &[u8]) -> Vec<u8> {
    let d = digest::digest(&digest::SHA256, data);
    d.as_ref()[..20].to_vec()
}

macro_rules! address_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        pub struct $name(pub Vec<u8>);

        impl $name {
            /// Raw bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// True if no bytes.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Parse lowercase or uppercase hex.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                hex::decode(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0))
            }
        }

        impl From<&[u8]> for $name {
            fn from(b: &[u8]) -> Self {
                Self(b.to_vec())
            }
        }
    };
}

address_type!(
    /// Account address.
    AccAddress
);
address_type!(
    /// Validator operator address.
    ValAddress
);
address_type!(
    /// Consensus address (hash of the consensus public key).
    ConsAddress
);

impl From<&ValAddress> for AccAddress {
    fn from(v: &ValAddress) -> Self {
        AccAddress(v.0.clone())
    }
}

impl From<&AccAddress> for ValAddress {
    fn from(a: &AccAddress) -> Self {
        ValAddress(a.0.clone())
    }
}

/// Consensus public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PubKey {
    /// 32-byte Ed25519 key.
    Ed25519(Vec<u8>),
    /// 33-byte compressed secp256k1 key.
    Secp256k1(Vec<u8>),
}

impl PubKey {
    /// Key type name as listed in consensus params.
    pub fn key_type(&self) -> &'static str {
        match self {
            PubKey::Ed25519(_) => "ed25519",
            PubKey::Secp256k1(_) => "secp256k1",
        }
    }

    /// Raw key bytes.
    pub fn bytes(&self) -> &[u8] {
        match self {
            PubKey::Ed25519(b) | PubKey::Secp256k1(b) => b,
        }
    }

    /// True if the key has the expected length for its type.
    pub fn is_well_formed(&self) -> bool {
        match self {
            PubKey::Ed25519(b) => b.len() == 32,
            PubKey::Secp256k1(b) => b.len() == 33,
        }
    }

    /// Consensus address derived from the key.
    pub fn cons_address(&self) -> ConsAddress {
        ConsAddress(sha256_20(self.bytes()))
    }
}

/// A single-denomination amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: String,
    /// Amount.
    pub amount: Int,
}

impl Coin {
    /// Construct.
    pub fn new(denom: impl Into<String>, amount: Int) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    /// Denomination rules: `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`.
    pub fn validate_denom(denom: &str) -> bool {
        let bytes = denom.as_bytes();
        if bytes.len() < 3 || bytes.len() > 128 {
            return false;
        }
        if !bytes[0].is_ascii_alphabetic() {
            return false;
        }
        bytes[1..]
            .iter()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'/' | b':' | b'.' | b'_' | b'-'))
    }

    /// Valid denom (amounts are non-negative by construction).
    pub fn is_valid(&self) -> bool {
        Self::validate_denom(&self.denom)
    }

    /// True if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Block time in nanoseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Unset time.
    pub const ZERO: Timestamp = Timestamp(0);

    /// From whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000_000))
    }

    /// Nanoseconds.
    pub fn nanos(&self) -> u64 {
        self.0
    }

    /// Whole seconds.
    pub fn unix_secs(&self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// True if unset.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `self - earlier`, zero if `earlier` is later.
    pub fn since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Fixed-width decimal rendering; lexical order equals time order.
    pub fn sortable_bytes(&self) -> Vec<u8> {
        format!("{:020}", self.0).into_bytes()
    }

    /// Parse `sortable_bytes` output.
    pub fn from_sortable_bytes(b: &[u8]) -> Option<Timestamp> {
        std::str::from_utf8(b).ok()?.parse().ok().map(Timestamp)
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Saturating.
    fn add(self, d: Duration) -> Timestamp {
        let n = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(n))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.0 / 1_000_000_000, self.0 % 1_000_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sortable_bytes_follow_time_order() {
        let a = Timestamp::from_secs(9);
        let b = Timestamp::from_secs(10);
        assert!(a.sortable_bytes() < b.sortable_bytes());
        assert_eq!(Timestamp::from_sortable_bytes(&b.sortable_bytes()), Some(b));
    }

    #[test]
    fn denom_rules() {
        assert!(Coin::validate_denom("stake"));
        assert!(Coin::validate_denom("ibc/ABC-1"));
        assert!(!Coin::validate_denom("1atom"));
        assert!(!Coin::validate_denom("ab"));
    }

    #[test]
    fn cons_address_is_20_bytes() {
        let pk = PubKey::Ed25519(vec![7u8; 32]);
        assert_eq!(pk.cons_address().as_bytes().len(), 20);
        assert_eq!(pk.key_type(), "ed25519");
    }
}
