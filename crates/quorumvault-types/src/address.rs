//! Address type for owners and transfer destinations
//!
//! Addresses are 20 bytes, written as `0x` followed by 40 hex digits.
//! Mixed-case text must carry a valid EIP-55 checksum; all-lowercase or
//! all-uppercase text is accepted as-is.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::{Result, VaultError};

/// Number of bytes in an address
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte principal or destination identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The null address. Never a valid owner or destination.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Address whose low 8 bytes are `n`, big-endian; handy for fixtures
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Parse `0x`-prefixed hex text, verifying the checksum of mixed-case input
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| VaultError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let digits = input
            .strip_prefix("0x")
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(invalid("expected 40 hex digits"));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| invalid("not hexadecimal"))?;
        let address = Self(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(invalid("checksum mismatch"));
        }

        Ok(address)
    }

    /// Whether this is the null address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// EIP-55 mixed-case checksum encoding
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: [&str; 2] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
    ];

    #[test]
    fn test_checksum_vectors() {
        for text in CHECKSUMMED {
            let address = Address::parse(text).unwrap();
            assert_eq!(address.to_checksum(), text);
            assert_eq!(address.to_string(), text);
        }
    }

    #[test]
    fn test_single_case_input_skips_checksum() {
        let lower = CHECKSUMMED[0].to_lowercase();
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_uppercase());
        assert_eq!(Address::parse(&lower).unwrap(), Address::parse(&upper).unwrap());
    }

    #[test]
    fn test_bad_checksum_rejected() {
        // flip the case of the first letter
        let bad = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let err = Address::parse(bad).unwrap_err();
        assert!(matches!(
            err,
            VaultError::InvalidAddress { ref reason, .. } if reason == "checksum mismatch"
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(Address::parse("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(Address::parse("0x0000000000000000000000000000000000000000").unwrap().is_zero());
        assert!(!Address::from_low_u64(1).is_zero());
    }

    #[test]
    fn test_serde_uses_checksummed_text() {
        let address = Address::parse(CHECKSUMMED[1]).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED[1]));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
