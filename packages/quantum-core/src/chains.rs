//! Supported chains and their per-chain configuration
//!
//! The set of chains is closed: adding one means adding a [`SupportedChain`]
//! variant, its defaults here, and catalog entries in [`crate::catalog`].
//!
//! # Environment Variable Schema
//!
//! ```text
//! ETH_SEPOLIA_RPC_URL=https://...       # optional override
//! ARBITRUM_SEPOLIA_RPC_URL=https://...  # optional override
//! BASE_SEPOLIA_RPC_URL=https://...      # optional override
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// URL Validation
// ============================================================================

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed = url::Url::parse(url_str)
        .map_err(|e| Error::InvalidSelection(format!("{} must be a valid URL: {}", name, e)))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::InvalidSelection(format!(
            "{} must use http:// or https:// scheme, got {}",
            name, scheme
        )));
    }

    if parsed.host_str().is_none() {
        return Err(Error::InvalidSelection(format!(
            "{} must have a host component",
            name
        )));
    }

    if scheme == "http" {
        tracing::warn!(
            "{} uses unencrypted http://, use https:// in production",
            name
        );
    }

    Ok(())
}

// ============================================================================
// Supported Chains
// ============================================================================

/// A chain the bridge is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportedChain {
    EthSepolia,
    ArbitrumSepolia,
    BaseSepolia,
}

impl SupportedChain {
    /// Every supported chain, in display order
    pub const ALL: [SupportedChain; 3] = [
        SupportedChain::EthSepolia,
        SupportedChain::ArbitrumSepolia,
        SupportedChain::BaseSepolia,
    ];

    /// Canonical identifier, e.g. `eth-sepolia`
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedChain::EthSepolia => "eth-sepolia",
            SupportedChain::ArbitrumSepolia => "arbitrum-sepolia",
            SupportedChain::BaseSepolia => "base-sepolia",
        }
    }

    /// Short network name passed to the bridge as the destination chain name
    pub fn network_name(&self) -> &'static str {
        match self {
            SupportedChain::EthSepolia => "ETH",
            SupportedChain::ArbitrumSepolia => "ARB",
            SupportedChain::BaseSepolia => "BASE",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            SupportedChain::EthSepolia => "Ethereum",
            SupportedChain::ArbitrumSepolia => "Arbitrum",
            SupportedChain::BaseSepolia => "Base",
        }
    }

    /// Symbol used when pricing this chain's native currency
    pub fn native_symbol(&self) -> &'static str {
        match self {
            SupportedChain::ArbitrumSepolia => "ARB",
            _ => "ETH",
        }
    }

    /// Environment variable that overrides the default RPC endpoint
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            SupportedChain::EthSepolia => "ETH_SEPOLIA_RPC_URL",
            SupportedChain::ArbitrumSepolia => "ARBITRUM_SEPOLIA_RPC_URL",
            SupportedChain::BaseSepolia => "BASE_SEPOLIA_RPC_URL",
        }
    }

    fn default_config(&self) -> ChainConfig {
        match self {
            SupportedChain::EthSepolia => ChainConfig {
                rpc_endpoint: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                chain_id: 11_155_111,
                destination_protocol_id: 40161,
            },
            SupportedChain::ArbitrumSepolia => ChainConfig {
                rpc_endpoint: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
                chain_id: 421_614,
                destination_protocol_id: 40231,
            },
            SupportedChain::BaseSepolia => ChainConfig {
                rpc_endpoint: "https://sepolia.base.org".to_string(),
                chain_id: 84_532,
                destination_protocol_id: 40245,
            },
        }
    }
}

impl fmt::Display for SupportedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SupportedChain {
    type Err = Error;

    /// Accepts the canonical id (`base-sepolia`) or the network name (`BASE`)
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        SupportedChain::ALL
            .into_iter()
            .find(|c| c.as_str() == needle || c.network_name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::InvalidSelection(format!("unknown chain: {}", needle)))
    }
}

// ============================================================================
// Chain Configuration
// ============================================================================

/// Connection and protocol parameters for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// RPC endpoint URL
    pub rpc_endpoint: String,
    /// Native EVM chain ID (e.g. 11155111)
    pub chain_id: u64,
    /// Relay-protocol endpoint id addressing this chain (NOT the native chain ID)
    pub destination_protocol_id: u32,
}

/// Immutable lookup from [`SupportedChain`] to [`ChainConfig`]
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<SupportedChain, ChainConfig>,
}

impl ChainRegistry {
    /// Registry with the public testnet endpoints
    pub fn testnet() -> Self {
        let chains = SupportedChain::ALL
            .into_iter()
            .map(|c| (c, c.default_config()))
            .collect();
        Self { chains }
    }

    /// Registry with RPC endpoints replaced where an override is given
    pub fn with_rpc_overrides(overrides: &HashMap<SupportedChain, String>) -> Result<Self> {
        let mut registry = Self::testnet();
        for (chain, url) in overrides {
            validate_rpc_url(url, chain.rpc_env_var())?;
            if let Some(config) = registry.chains.get_mut(chain) {
                config.rpc_endpoint = url.clone();
            }
        }
        Ok(registry)
    }

    /// Look up a chain's configuration
    pub fn resolve(&self, chain: SupportedChain) -> Result<&ChainConfig> {
        self.chains
            .get(&chain)
            .ok_or_else(|| Error::InvalidSelection(format!("chain not configured: {}", chain)))
    }

    /// Look up a chain by its string id
    pub fn resolve_id(&self, id: &str) -> Result<(SupportedChain, &ChainConfig)> {
        let chain: SupportedChain = id.parse()?;
        Ok((chain, self.resolve(chain)?))
    }

    /// Find the chain that owns a relay-protocol endpoint id
    pub fn by_destination_id(&self, destination_protocol_id: u32) -> Option<SupportedChain> {
        self.chains
            .iter()
            .find(|(_, c)| c.destination_protocol_id == destination_protocol_id)
            .map(|(chain, _)| *chain)
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        Self::testnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_chain_resolves() {
        let registry = ChainRegistry::testnet();
        for chain in SupportedChain::ALL {
            let config = registry.resolve(chain).unwrap();
            assert!(config.rpc_endpoint.starts_with("https://"));
        }
        assert_eq!(
            registry
                .resolve(SupportedChain::BaseSepolia)
                .unwrap()
                .destination_protocol_id,
            40245
        );
    }

    #[test]
    fn test_parse_chain_ids() {
        assert_eq!(
            "arbitrum-sepolia".parse::<SupportedChain>().unwrap(),
            SupportedChain::ArbitrumSepolia
        );
        assert_eq!(
            "eth".parse::<SupportedChain>().unwrap(),
            SupportedChain::EthSepolia
        );
        assert!(matches!(
            "polygon-amoy".parse::<SupportedChain>(),
            Err(Error::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_unknown_id_is_recoverable() {
        let registry = ChainRegistry::testnet();
        let err = registry.resolve_id("celo").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_native_symbols() {
        assert_eq!(SupportedChain::ArbitrumSepolia.native_symbol(), "ARB");
        assert_eq!(SupportedChain::EthSepolia.native_symbol(), "ETH");
        assert_eq!(SupportedChain::BaseSepolia.native_symbol(), "ETH");
    }

    #[test]
    fn test_rpc_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(
            SupportedChain::BaseSepolia,
            "http://localhost:8545".to_string(),
        );
        let registry = ChainRegistry::with_rpc_overrides(&overrides).unwrap();
        assert_eq!(
            registry.resolve(SupportedChain::BaseSepolia).unwrap().rpc_endpoint,
            "http://localhost:8545"
        );

        overrides.insert(SupportedChain::EthSepolia, "ws://node".to_string());
        assert!(ChainRegistry::with_rpc_overrides(&overrides).is_err());
    }

    #[test]
    fn test_destination_lookup() {
        let registry = ChainRegistry::testnet();
        assert_eq!(
            registry.by_destination_id(40231),
            Some(SupportedChain::ArbitrumSepolia)
        );
        assert_eq!(registry.by_destination_id(1), None);
    }
}
