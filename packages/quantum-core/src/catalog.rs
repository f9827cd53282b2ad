//! Static token catalog
//!
//! Several descriptors share a symbol across chains; `id` is the unique key.
//! The zero address marks the chain's native asset.

use alloy::primitives::{address, Address};

use crate::chains::SupportedChain;
use crate::error::{Error, Result};

/// A bridgeable token on one origin chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDescriptor {
    /// Unique key, e.g. `USDT-ETH`
    pub id: &'static str,
    pub symbol: &'static str,
    pub name: &'static str,
    /// Token contract (zero for the native asset)
    pub contract_address: Address,
    /// Chain the canonical contract and the user's balance live on
    pub origin_chain: SupportedChain,
    /// Bridge contract deployed on the origin chain
    pub bridge_contract_address: Address,
    /// Relay-protocol endpoint id of the origin chain
    pub destination_protocol_id: u32,
}

impl TokenDescriptor {
    const fn new(
        id: &'static str,
        symbol: &'static str,
        name: &'static str,
        contract_address: Address,
        origin_chain: SupportedChain,
        bridge_contract_address: Address,
        destination_protocol_id: u32,
    ) -> Self {
        Self {
            id,
            symbol,
            name,
            contract_address,
            origin_chain,
            bridge_contract_address,
            destination_protocol_id,
        }
    }

    /// True for the chain's native asset (no ERC20 contract)
    pub fn is_native(&self) -> bool {
        self.contract_address == Address::ZERO
    }
}

const ETH_SEPOLIA_BRIDGE: Address = address!("67e0B3f4069e59812EecC65DF127811A43AF5Eb9");
const ARBITRUM_SEPOLIA_BRIDGE: Address = address!("74FCAE483Cd97791078B8E6073757e04356C20bd");
const BASE_SEPOLIA_BRIDGE: Address = address!("f762f004a30CB141d139C900f2Aa3631Db7FD2E7");

const TESTNET_TOKENS: [TokenDescriptor; 6] = [
    TokenDescriptor::new(
        "USDT-ETH",
        "USDT",
        "Tether",
        address!("84cba2A35398B42127B3148744DB3Cd30981fCDf"),
        SupportedChain::EthSepolia,
        ETH_SEPOLIA_BRIDGE,
        40161,
    ),
    TokenDescriptor::new(
        "ETH-SEPOLIA",
        "ETH",
        "Ethereum",
        Address::ZERO,
        SupportedChain::EthSepolia,
        ETH_SEPOLIA_BRIDGE,
        40161,
    ),
    TokenDescriptor::new(
        "USDT-ARB",
        "USDT",
        "Tether",
        address!("43535C041AF9d270Bd7aaA9ce5313d960BBEABAD"),
        SupportedChain::ArbitrumSepolia,
        ARBITRUM_SEPOLIA_BRIDGE,
        40231,
    ),
    TokenDescriptor::new(
        "ETH-ARB",
        "ETH",
        "Arbitrum",
        Address::ZERO,
        SupportedChain::ArbitrumSepolia,
        ARBITRUM_SEPOLIA_BRIDGE,
        40231,
    ),
    TokenDescriptor::new(
        "ETH-BASE",
        "ETH",
        "Base",
        Address::ZERO,
        SupportedChain::BaseSepolia,
        BASE_SEPOLIA_BRIDGE,
        40245,
    ),
    TokenDescriptor::new(
        "USDT-BASE",
        "USDT",
        "Tether",
        address!("2816a02000B9845C464796b8c36B2D5D199525d5"),
        SupportedChain::BaseSepolia,
        BASE_SEPOLIA_BRIDGE,
        40245,
    ),
];

/// Lookup table of every bridgeable token
#[derive(Debug, Clone)]
pub struct TokenCatalog {
    tokens: Vec<TokenDescriptor>,
}

impl TokenCatalog {
    /// Catalog of the testnet deployment
    pub fn testnet() -> Self {
        Self {
            tokens: TESTNET_TOKENS.to_vec(),
        }
    }

    /// Catalog from an explicit token list
    pub fn from_tokens(tokens: Vec<TokenDescriptor>) -> Self {
        Self { tokens }
    }

    /// Look up a token by id
    pub fn resolve(&self, id: &str) -> Result<&TokenDescriptor> {
        self.tokens
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::InvalidSelection(format!("unknown token: {}", id)))
    }

    /// All tokens in display order
    pub fn all(&self) -> &[TokenDescriptor] {
        &self.tokens
    }

    /// Tokens whose origin is `chain`
    pub fn on_chain(&self, chain: SupportedChain) -> impl Iterator<Item = &TokenDescriptor> {
        self.tokens.iter().filter(move |t| t.origin_chain == chain)
    }

    /// The descriptor with the same symbol on another chain
    pub fn counterpart(&self, symbol: &str, chain: SupportedChain) -> Option<&TokenDescriptor> {
        self.on_chain(chain).find(|t| t.symbol == symbol)
    }

    /// Find a token by its contract address on a chain
    pub fn by_address(&self, chain: SupportedChain, address: Address) -> Option<&TokenDescriptor> {
        self.on_chain(chain).find(|t| t.contract_address == address)
    }
}

impl Default for TokenCatalog {
    fn default() -> Self {
        Self::testnet()
    }
}
