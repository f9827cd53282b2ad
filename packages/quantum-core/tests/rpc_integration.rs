//! Live RPC Integration Test
//!
//! Reads balances, gas price and a relay fee quote from the public testnets.
//!
//! ## Setup
//!
//! Needs network access. Set:
//!
//! - `QUANTUM_TEST_RPC` - set to `1` to enable
//! - `ETH_SEPOLIA_RPC_URL` (optional) - overrides the public Sepolia endpoint
//! - `QUANTUM_TEST_RECIPIENT` (optional) - address used for the quote
//!
//! ## Running
//!
//! ```bash
//! QUANTUM_TEST_RPC=1 cargo test -p quantum-core --test rpc_integration -- --ignored --nocapture
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use quantum_core::{
    BridgeTransactor, ChainReader, ChainRegistry, CoinbaseRates, CurrencyConverter, EvmGateway,
    SupportedChain, TokenCatalog, TransferIntent,
};
use tokio_test::{assert_err, assert_ok};

const DEFAULT_RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

struct TestContext {
    registry: Arc<ChainRegistry>,
    catalog: Arc<TokenCatalog>,
    gateway: Arc<EvmGateway>,
    converter: CurrencyConverter,
}

impl TestContext {
    fn setup() -> Result<Self, String> {
        if std::env::var("QUANTUM_TEST_RPC").as_deref() != Ok("1") {
            return Err("QUANTUM_TEST_RPC not set".to_string());
        }

        let mut overrides = HashMap::new();
        for chain in SupportedChain::ALL {
            if let Ok(url) = std::env::var(chain.rpc_env_var()) {
                overrides.insert(chain, url);
            }
        }
        let registry = Arc::new(
            ChainRegistry::with_rpc_overrides(&overrides).map_err(|e| e.to_string())?,
        );
        let gateway =
            Arc::new(EvmGateway::new_readonly(registry.clone()).map_err(|e| e.to_string())?);
        let rates = CoinbaseRates::new(quantum_core::pricing::DEFAULT_EXCHANGE_RATE_URL)
            .map_err(|e| e.to_string())?;

        Ok(Self {
            registry,
            catalog: Arc::new(TokenCatalog::testnet()),
            gateway,
            converter: CurrencyConverter::new(Arc::new(rates)),
        })
    }

    fn reader(&self) -> ChainReader {
        ChainReader::new(self.gateway.clone(), self.converter.clone())
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,quantum_core=debug")),
        )
        .try_init()
        .ok();
}

#[tokio::test]
#[ignore = "requires network access: QUANTUM_TEST_RPC=1"]
async fn test_read_balances_and_gas() {
    init_logging();
    let ctx = match TestContext::setup() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let reader = ctx.reader();
    let owner: Address = DEFAULT_RECIPIENT.parse().unwrap();
    for token in ctx.catalog.all() {
        let balance = reader.get_token_balance(owner, token).await;
        tracing::info!(token = token.id, balance = %balance.balance, decimals = ?balance.decimals, "Balance");
    }

    for chain in SupportedChain::ALL {
        let gas = assert_ok!(reader.get_gas_price(chain).await);
        tracing::info!(chain = %chain, gwei = %gas.gwei, usd = ?gas.usd_per_unit, "Gas price");
    }
}

#[tokio::test]
#[ignore = "requires network access: QUANTUM_TEST_RPC=1"]
async fn test_quote_usdt_transfer() {
    init_logging();
    let ctx = match TestContext::setup() {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Skipping: {}", e);
            return;
        }
    };

    let recipient =
        std::env::var("QUANTUM_TEST_RECIPIENT").unwrap_or_else(|_| DEFAULT_RECIPIENT.to_string());
    let transactor = BridgeTransactor::new(
        ctx.gateway.clone(),
        ctx.catalog.clone(),
        ctx.registry.clone(),
        ctx.converter.clone(),
    );
    let intent = TransferIntent {
        amount: "10".to_string(),
        recipient_address: recipient,
        ..TransferIntent::default()
    };

    let quote = assert_ok!(transactor.quote(&intent).await).expect("complete intent has a quote");
    tracing::info!(fee = %quote.native_fee_amount, usd = ?quote.fee_in_usd, "Relay fee");
    assert!(!quote.payload.is_empty());

    // unchanged intent yields the same message
    let again = assert_ok!(transactor.quote(&intent).await).expect("quote");
    assert_eq!(quote.payload, again.payload);
    assert_eq!(quote.relay_options, again.relay_options);
}

#[tokio::test]
async fn test_unreachable_endpoint_degrades_to_zero() {
    let mut overrides = HashMap::new();
    overrides.insert(SupportedChain::EthSepolia, "http://127.0.0.1:1".to_string());
    let registry = Arc::new(ChainRegistry::with_rpc_overrides(&overrides).unwrap());
    let gateway = Arc::new(EvmGateway::new_readonly(registry).unwrap());
    let rates = CoinbaseRates::new("http://127.0.0.1:1").unwrap();
    let reader = ChainReader::new(gateway, CurrencyConverter::new(Arc::new(rates)));

    let catalog = TokenCatalog::testnet();
    let usdt = catalog.resolve("USDT-ETH").unwrap();
    let owner: Address = DEFAULT_RECIPIENT.parse().unwrap();
    for _ in 0..2 {
        let balance = reader.get_token_balance(owner, usdt).await;
        assert_eq!(balance.balance, "0");
    }
    assert_err!(reader.get_gas_price(SupportedChain::EthSepolia).await);
}
