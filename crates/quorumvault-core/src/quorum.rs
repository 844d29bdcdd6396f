//! Owner set and confirmation threshold
//!
//! Built once, validated at construction, and never mutated afterwards.
//! The owner list keeps construction order; quorum evaluation walks it in
//! that order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use quorumvault_types::{Address, Result, VaultError};

/// Immutable owner set and threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuorumConfig", into = "RawQuorumConfig")]
pub struct QuorumConfig {
    owners: Vec<Address>,
    index: HashSet<Address>,
    threshold: usize,
}

/// Unvalidated wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawQuorumConfig {
    owners: Vec<Address>,
    threshold: usize,
}

impl QuorumConfig {
    /// Validate and build a configuration
    ///
    /// Fails with `InvalidRequirement` for an empty owner list, a zero
    /// threshold, a threshold above the owner count, or a null owner, and
    /// with `DuplicateOwner` when an owner appears twice.
    pub fn new(owners: Vec<Address>, threshold: usize) -> Result<Self> {
        if owners.is_empty() {
            return Err(VaultError::InvalidRequirement {
                reason: "owner list is empty".to_string(),
            });
        }
        if threshold == 0 || threshold > owners.len() {
            return Err(VaultError::InvalidRequirement {
                reason: format!(
                    "threshold {} outside 1..={} owners",
                    threshold,
                    owners.len()
                ),
            });
        }

        let mut index = HashSet::with_capacity(owners.len());
        for owner in &owners {
            if owner.is_zero() {
                return Err(VaultError::InvalidRequirement {
                    reason: "owner is the null address".to_string(),
                });
            }
            if !index.insert(*owner) {
                return Err(VaultError::DuplicateOwner {
                    owner: owner.to_string(),
                });
            }
        }

        Ok(Self {
            owners,
            index,
            threshold,
        })
    }

    pub fn is_owner(&self, principal: &Address) -> bool {
        self.index.contains(principal)
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Owners in construction order
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl TryFrom<RawQuorumConfig> for QuorumConfig {
    type Error = VaultError;

    fn try_from(raw: RawQuorumConfig) -> Result<Self> {
        Self::new(raw.owners, raw.threshold)
    }
}

impl From<QuorumConfig> for RawQuorumConfig {
    fn from(config: QuorumConfig) -> Self {
        Self {
            owners: config.owners,
            threshold: config.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners(n: u64) -> Vec<Address> {
        (1..=n).map(Address::from_low_u64).collect()
    }

    #[test]
    fn test_valid_configurations() {
        for n in 1..=5u64 {
            for threshold in 1..=n as usize {
                let config = QuorumConfig::new(owners(n), threshold).unwrap();
                assert_eq!(config.threshold(), threshold);
                assert_eq!(config.len(), n as usize);
            }
        }
    }

    #[test]
    fn test_empty_owner_list() {
        let err = QuorumConfig::new(Vec::new(), 1).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRequirement { .. }));
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(matches!(
            QuorumConfig::new(owners(3), 0),
            Err(VaultError::InvalidRequirement { .. })
        ));
        assert!(matches!(
            QuorumConfig::new(owners(3), 4),
            Err(VaultError::InvalidRequirement { .. })
        ));
    }

    #[test]
    fn test_duplicate_owner() {
        let mut list = owners(3);
        list.push(Address::from_low_u64(2));
        let err = QuorumConfig::new(list, 2).unwrap_err();
        assert!(matches!(err, VaultError::DuplicateOwner { .. }));
    }

    #[test]
    fn test_null_owner() {
        let list = vec![Address::from_low_u64(1), Address::ZERO];
        let err = QuorumConfig::new(list, 1).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRequirement { .. }));
    }

    #[test]
    fn test_owner_lookup_and_order() {
        let list = vec![
            Address::from_low_u64(3),
            Address::from_low_u64(1),
            Address::from_low_u64(2),
        ];
        let config = QuorumConfig::new(list.clone(), 2).unwrap();
        assert_eq!(config.owners(), list.as_slice());
        assert!(config.is_owner(&Address::from_low_u64(1)));
        assert!(!config.is_owner(&Address::from_low_u64(9)));
    }

    #[test]
    fn test_deserialize_validates() {
        let json = serde_json::json!({
            "owners": [
                "0x0000000000000000000000000000000000000001",
                "0x0000000000000000000000000000000000000001"
            ],
            "threshold": 1
        });
        assert!(serde_json::from_value::<QuorumConfig>(json).is_err());

        let config = QuorumConfig::new(owners(2), 2).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["threshold"], 2);
        let back: QuorumConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
