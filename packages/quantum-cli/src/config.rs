//! CLI configuration

use std::collections::HashMap;
use std::env;

use alloy::primitives::Address;
use eyre::{eyre, Result};
use quantum_core::pricing::DEFAULT_EXCHANGE_RATE_URL;
use quantum_core::redact::Redacted;
use quantum_core::throttle::DEFAULT_COOLDOWN_SECS;
use quantum_core::{faucet::DEFAULT_MINT_AMOUNT, ChainRegistry, SupportedChain};

/// Quantum CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chain endpoints, with any `*_RPC_URL` overrides applied
    pub registry: ChainRegistry,

    /// Signing key; read-only commands work without it
    pub wallet_private_key: Option<Redacted<String>>,

    /// Lending pool contract, required for lending commands
    pub lending_pool_address: Option<Address>,

    /// Exchange-rate service base URL
    pub exchange_rate_url: String,

    /// Minimum seconds between passive lending refreshes
    pub market_refresh_cooldown_secs: u64,

    /// Amount minted per faucet claim
    pub faucet_mint_amount: String,
}

impl Config {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    fn from_env() -> Result<Self> {
        let mut overrides = HashMap::new();
        for chain in SupportedChain::ALL {
            if let Ok(url) = env::var(chain.rpc_env_var()) {
                overrides.insert(chain, url);
            }
        }
        let registry = ChainRegistry::with_rpc_overrides(&overrides)
            .map_err(|e| eyre!("Invalid RPC override: {}", e))?;

        let wallet_private_key = env::var("WALLET_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Redacted);

        let lending_pool_address = match env::var("LENDING_POOL_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| eyre!("Invalid LENDING_POOL_ADDRESS"))?,
            ),
            _ => None,
        };

        Ok(Self {
            registry,
            wallet_private_key,
            lending_pool_address,

            exchange_rate_url: env::var("EXCHANGE_RATE_URL")
                .unwrap_or_else(|_| DEFAULT_EXCHANGE_RATE_URL.to_string()),

            market_refresh_cooldown_secs: env::var("MARKET_REFRESH_COOLDOWN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_COOLDOWN_SECS),

            faucet_mint_amount: env::var("FAUCET_MINT_AMOUNT")
                .unwrap_or_else(|_| DEFAULT_MINT_AMOUNT.to_string()),
        })
    }

    /// Lending pool address or a clear error for lending commands
    pub fn require_pool(&self) -> Result<Address> {
        self.lending_pool_address
            .ok_or_else(|| eyre!("LENDING_POOL_ADDRESS required for lending commands"))
    }
}
