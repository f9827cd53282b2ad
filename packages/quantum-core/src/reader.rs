//! Read-only chain state: balances, gas price, lending pool figures
//!
//! Reads here degrade instead of failing where the result is display-only:
//! a token balance that cannot be read shows as zero, and each pool figure is
//! fetched independently so one failed call never hides the others.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog::TokenDescriptor;
use crate::chains::SupportedChain;
use crate::error::{Error, Result};
use crate::interfaces::ChainBackend;
use crate::pricing::CurrencyConverter;
use crate::units::{from_base_units, wei_to_gwei, NATIVE_DECIMALS};

/// Pool dollar figures are 18-decimal fixed point
pub const USD_DECIMALS: u8 = 18;

/// Formatted token balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenBalance {
    pub balance: String,
    /// `None` when the token's `decimals()` could not be read
    pub decimals: Option<u8>,
}

impl TokenBalance {
    fn zero(decimals: Option<u8>) -> Self {
        Self {
            balance: "0".to_string(),
            decimals,
        }
    }

    /// True if the balance is exactly zero (possibly a degraded read)
    pub fn is_zero(&self) -> bool {
        self.balance == "0"
    }
}

/// Gas price per unit, natively and in USD
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasPrice {
    /// Native amount per gas unit, e.g. `"0.0000000015"`
    pub native_per_unit: String,
    pub gwei: String,
    /// `None` when the exchange rate could not be fetched
    pub usd_per_unit: Option<String>,
}

/// A user's position in the lending pool, in USD
///
/// Each field is `None` when its read failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolBalances {
    pub supplied: Option<String>,
    /// Borrowed against the selected token
    pub borrowed: Option<String>,
    pub credit_limit: Option<String>,
}

/// Pool-wide totals in USD
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketTotals {
    pub total_supplied: Option<String>,
    pub total_borrowed: Option<String>,
}

fn format_usd(raw: U256) -> String {
    from_base_units(raw, USD_DECIMALS)
}

/// Log and drop a failed display read
fn degrade<T>(what: &str, result: eyre::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(read = what, error = %e, "Read failed, showing as unavailable");
            None
        }
    }
}

/// Read-only view over the chain backend
#[derive(Clone)]
pub struct ChainReader {
    backend: Arc<dyn ChainBackend>,
    converter: CurrencyConverter,
    pool: Option<Address>,
}

impl ChainReader {
    pub fn new(backend: Arc<dyn ChainBackend>, converter: CurrencyConverter) -> Self {
        Self {
            backend,
            converter,
            pool: None,
        }
    }

    /// Enable the lending pool reads
    pub fn with_pool(mut self, pool: Address) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn converter(&self) -> &CurrencyConverter {
        &self.converter
    }

    fn pool(&self) -> Result<Address> {
        self.pool
            .ok_or_else(|| Error::InvalidSelection("lending pool address not configured".into()))
    }

    /// Balance of `token` held by `owner`, formatted with the token's own decimals.
    ///
    /// Never fails: an unreachable endpoint yields a zero balance.
    pub async fn get_token_balance(
        &self,
        owner: Address,
        token: &TokenDescriptor,
    ) -> TokenBalance {
        let chain = token.origin_chain;

        if token.is_native() {
            return match self.backend.native_balance(chain, owner).await {
                Ok(raw) => TokenBalance {
                    balance: from_base_units(raw, NATIVE_DECIMALS),
                    decimals: Some(NATIVE_DECIMALS),
                },
                Err(e) => {
                    warn!(chain = %chain, owner = %owner, error = %e, "Native balance read failed, showing zero");
                    TokenBalance::zero(Some(NATIVE_DECIMALS))
                }
            };
        }

        let decimals = match self.backend.decimals(chain, token.contract_address).await {
            Ok(d) => d,
            Err(e) => {
                warn!(token = token.id, error = %e, "Decimals read failed, showing zero balance");
                return TokenBalance::zero(None);
            }
        };

        match self
            .backend
            .balance_of(chain, token.contract_address, owner)
            .await
        {
            Ok(raw) => TokenBalance {
                balance: from_base_units(raw, decimals),
                decimals: Some(decimals),
            },
            Err(e) => {
                warn!(token = token.id, owner = %owner, error = %e, "Balance read failed, showing zero");
                TokenBalance::zero(Some(decimals))
            }
        }
    }

    /// Gas price on `chain`, converted with the chain's native symbol
    pub async fn get_gas_price(&self, chain: SupportedChain) -> Result<GasPrice> {
        let wei = self
            .backend
            .gas_price(chain)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?;

        let native_per_unit = from_base_units(U256::from(wei), NATIVE_DECIMALS);
        let usd_per_unit = match self
            .converter
            .to_usd(&native_per_unit, chain.native_symbol())
            .await
        {
            Ok(usd) => Some(usd),
            Err(e) => {
                warn!(chain = %chain, error = %e, "Gas price shown without USD value");
                None
            }
        };

        debug!(chain = %chain, wei, "Fetched gas price");
        Ok(GasPrice {
            native_per_unit,
            gwei: wei_to_gwei(wei),
            usd_per_unit,
        })
    }

    /// Supplied, borrowed and credit-limit figures for `user`.
    ///
    /// The three reads run concurrently and fail independently.
    pub async fn get_pool_balances(
        &self,
        user: Address,
        chain: SupportedChain,
        token: &TokenDescriptor,
    ) -> Result<PoolBalances> {
        let pool = self.pool()?;
        let (supplied, borrowed, credit) = tokio::join!(
            self.backend.total_lent_usd(chain, pool, user),
            self.backend
                .borrowed_for_token_usd(chain, pool, user, token.contract_address),
            self.backend.available_to_borrow_usd(chain, pool, user),
        );

        Ok(PoolBalances {
            supplied: degrade("supplied", supplied).map(format_usd),
            borrowed: degrade("borrowed", borrowed).map(format_usd),
            credit_limit: degrade("credit limit", credit).map(format_usd),
        })
    }

    /// Pool-wide supplied and borrowed totals
    pub async fn get_market_totals(&self, chain: SupportedChain) -> Result<MarketTotals> {
        let pool = self.pool()?;
        let (supplied, borrowed) = tokio::join!(
            self.backend.total_supply_usd(chain, pool),
            self.backend.total_borrowed_usd(chain, pool),
        );

        Ok(MarketTotals {
            total_supplied: degrade("total supplied", supplied).map(format_usd),
            total_borrowed: degrade("total borrowed", borrowed).map(format_usd),
        })
    }

    /// Names of the tokens the pool accepts
    pub async fn whitelisted_tokens(&self, chain: SupportedChain) -> Result<Vec<String>> {
        let pool = self.pool()?;
        self.backend
            .whitelisted_token_names(chain, pool)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TokenCatalog;
    use crate::testing::{MockChain, MOCK_POOL, MOCK_WALLET};

    fn reader(chain: &Arc<MockChain>) -> ChainReader {
        ChainReader::new(chain.clone(), CurrencyConverter::new(chain.clone())).with_pool(MOCK_POOL)
    }

    fn usd(whole: u64) -> U256 {
        U256::from(whole) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[tokio::test]
    async fn test_balance_uses_token_decimals() {
        let chain = Arc::new(MockChain::new());
        let catalog = TokenCatalog::testnet();
        let usdt = catalog.resolve("USDT-ETH").unwrap();
        chain.set_balance(
            usdt.origin_chain,
            usdt.contract_address,
            MOCK_WALLET,
            U256::from(25_500_000u64),
        );

        let balance = reader(&chain).get_token_balance(MOCK_WALLET, usdt).await;
        assert_eq!(balance.balance, "25.5");
        assert_eq!(balance.decimals, Some(6));
        assert_eq!(chain.count("decimals"), 1);
    }

    #[tokio::test]
    async fn test_native_balance() {
        let chain = Arc::new(MockChain::new());
        let catalog = TokenCatalog::testnet();
        let eth = catalog.resolve("ETH-SEPOLIA").unwrap();
        chain.set_native_balance(
            SupportedChain::EthSepolia,
            MOCK_WALLET,
            U256::from(2_000_000_000_000_000_000u128),
        );

        let balance = reader(&chain).get_token_balance(MOCK_WALLET, eth).await;
        assert_eq!(balance.balance, "2");
        assert_eq!(balance.decimals, Some(18));
        assert_eq!(chain.count("decimals"), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_zero_every_time() {
        let chain = Arc::new(MockChain::new());
        let catalog = TokenCatalog::testnet();
        let usdt = catalog.resolve("USDT-ARB").unwrap();
        chain.set_balance(
            usdt.origin_chain,
            usdt.contract_address,
            MOCK_WALLET,
            U256::from(1_000_000u64),
        );
        chain.fail_on("balanceOf");

        let reader = reader(&chain);
        for _ in 0..3 {
            let balance = reader.get_token_balance(MOCK_WALLET, usdt).await;
            assert_eq!(
                balance,
                TokenBalance {
                    balance: "0".into(),
                    decimals: Some(6)
                }
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_decimals_not_guessed() {
        let chain = Arc::new(MockChain::new());
        let catalog = TokenCatalog::testnet();
        let usdt = catalog.resolve("USDT-ETH").unwrap();
        chain.fail_on("decimals");

        let balance = reader(&chain).get_token_balance(MOCK_WALLET, usdt).await;
        assert_eq!(balance.balance, "0");
        assert_eq!(balance.decimals, None);
        assert_eq!(chain.count("balanceOf"), 0);
    }

    #[tokio::test]
    async fn test_gas_price_uses_native_symbol() {
        let chain = Arc::new(MockChain::new());
        chain.set_gas_price(2_000_000_000);

        let reader = reader(&chain);
        let eth = reader.get_gas_price(SupportedChain::EthSepolia).await.unwrap();
        assert_eq!(eth.gwei, "2");
        assert_eq!(eth.native_per_unit, "0.000000002");
        // 2e-9 ETH * 2500 rounds to 0.00
        assert_eq!(eth.usd_per_unit.as_deref(), Some("0.00"));

        reader
            .get_gas_price(SupportedChain::ArbitrumSepolia)
            .await
            .unwrap();
        let symbols: Vec<String> = chain
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                crate::testing::MockCall::Rate { symbol } => Some(symbol),
                _ => None,
            })
            .collect();
        assert_eq!(symbols, vec!["ETH".to_string(), "ARB".to_string()]);
    }

    #[tokio::test]
    async fn test_gas_price_without_rate() {
        let chain = Arc::new(MockChain::new());
        chain.fail_on("rate");
        let price = reader(&chain)
            .get_gas_price(SupportedChain::BaseSepolia)
            .await
            .unwrap();
        assert!(price.usd_per_unit.is_none());
        assert_eq!(price.gwei, "1.5");
    }

    #[tokio::test]
    async fn test_pool_reads_fail_independently() {
        let chain = Arc::new(MockChain::new());
        let catalog = TokenCatalog::testnet();
        let usdt = catalog.resolve("USDT-BASE").unwrap();
        chain.set_lent_usd(MOCK_WALLET, usd(200));
        chain.set_borrowed_usd(MOCK_WALLET, usdt.contract_address, usd(50));
        chain.fail_on("getUserTotalAmountBorrowedForTokenInDollars");

        let balances = reader(&chain)
            .get_pool_balances(MOCK_WALLET, SupportedChain::BaseSepolia, usdt)
            .await
            .unwrap();
        assert_eq!(balances.supplied.as_deref(), Some("200"));
        assert_eq!(balances.borrowed, None);
        // 80% of 200 minus 50 borrowed
        assert_eq!(balances.credit_limit.as_deref(), Some("110"));
    }

    #[tokio::test]
    async fn test_market_totals_and_whitelist() {
        let chain = Arc::new(MockChain::new());
        chain.set_lent_usd(MOCK_WALLET, usd(300));
        chain.set_whitelisted(&["USDT", "WETH"]);

        let reader = reader(&chain);
        let totals = reader
            .get_market_totals(SupportedChain::BaseSepolia)
            .await
            .unwrap();
        assert_eq!(totals.total_supplied.as_deref(), Some("300"));
        assert_eq!(totals.total_borrowed.as_deref(), Some("0"));

        let names = reader
            .whitelisted_tokens(SupportedChain::BaseSepolia)
            .await
            .unwrap();
        assert_eq!(names, vec!["USDT", "WETH"]);
    }

    #[tokio::test]
    async fn test_pool_reads_need_pool_address() {
        let chain = Arc::new(MockChain::new());
        let reader = ChainReader::new(chain.clone(), CurrencyConverter::new(chain));
        assert!(matches!(
            reader.get_market_totals(SupportedChain::BaseSepolia).await,
            Err(Error::InvalidSelection(_))
        ));
    }
}
