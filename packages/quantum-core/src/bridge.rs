//! Cross-chain transfer orchestration
//!
//! Quote the relay fee, approve the bridge to pull the token, deposit. Amounts
//! are converted to base units with the token's own `decimals()` right before
//! each contract call, from the same human-readable string every time, so
//! the approved and deposited amounts always match.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::approval::{approve_spend, base_units, confirmed};
use crate::catalog::{TokenCatalog, TokenDescriptor};
use crate::chains::{ChainRegistry, SupportedChain};
use crate::error::{Error, Result, ValidationFailure};
use crate::interfaces::{ChainBackend, DepositCall, TxOutcome};
use crate::pricing::CurrencyConverter;
use crate::state::TransferIntent;
use crate::units::{canonical_amount, from_base_units, NATIVE_DECIMALS};
use crate::validation::parse_recipient;

/// Gas limit requested for execution on the destination chain
pub const RELAY_GAS_LIMIT: u64 = 500_000;

/// Native value forwarded to the destination with the message
pub const RELAY_VALUE: u64 = 0;

/// Relay fee and the message it was computed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    /// Serialized cross-chain message
    pub payload: Bytes,
    pub relay_options: Bytes,
    /// Fee in wei, sent as the deposit's value
    pub native_fee: U256,
    /// Fee in native units, e.g. `"0.001"`
    pub native_fee_amount: String,
    /// `None` when the exchange rate was unavailable
    pub fee_in_usd: Option<String>,
}

/// A transfer intent with every id resolved
#[derive(Debug, Clone)]
struct ResolvedTransfer<'a> {
    token: &'a TokenDescriptor,
    destination: SupportedChain,
    destination_protocol_id: u32,
    amount: String,
    recipient: Address,
}

/// Runs quote, approve and deposit for the bridge flow
#[derive(Clone)]
pub struct BridgeTransactor {
    backend: Arc<dyn ChainBackend>,
    catalog: Arc<TokenCatalog>,
    registry: Arc<ChainRegistry>,
    converter: CurrencyConverter,
}

impl BridgeTransactor {
    pub fn new(
        backend: Arc<dyn ChainBackend>,
        catalog: Arc<TokenCatalog>,
        registry: Arc<ChainRegistry>,
        converter: CurrencyConverter,
    ) -> Self {
        Self {
            backend,
            catalog,
            registry,
            converter,
        }
    }

    /// Source token of `intent`
    pub fn source_token(&self, intent: &TransferIntent) -> Result<&TokenDescriptor> {
        let id = intent
            .from_token
            .as_deref()
            .ok_or(ValidationFailure::TokenNotSelected)?;
        self.catalog.resolve(id)
    }

    /// True unless the source token is the chain's native asset
    pub fn needs_approval(&self, intent: &TransferIntent) -> Result<bool> {
        Ok(!self.source_token(intent)?.is_native())
    }

    fn resolve(&self, intent: &TransferIntent) -> Result<ResolvedTransfer<'_>> {
        let token = self.source_token(intent)?;
        if let Some(from) = intent.from_chain {
            if from != token.origin_chain {
                return Err(Error::InvalidSelection(format!(
                    "{} is not on {}",
                    token.id, from
                )));
            }
        }
        let destination = intent
            .to_chain
            .ok_or(ValidationFailure::NetworkNotSelected)?;
        let destination_protocol_id = self.registry.resolve(destination)?.destination_protocol_id;
        let amount = canonical_amount(&intent.amount).ok_or(ValidationFailure::InvalidAmount)?;
        let recipient = parse_recipient(&intent.recipient_address)?;

        Ok(ResolvedTransfer {
            token,
            destination,
            destination_protocol_id,
            amount,
            recipient,
        })
    }

    /// Relay fee for `intent`.
    ///
    /// Returns `Ok(None)` while the intent is incomplete (no recipient, no
    /// origin or destination chain, no token).
    pub async fn quote(&self, intent: &TransferIntent) -> Result<Option<FeeQuote>> {
        if intent.recipient_address.trim().is_empty()
            || intent.from_chain.is_none()
            || intent.to_chain.is_none()
            || intent.from_token.is_none()
        {
            return Ok(None);
        }

        let transfer = self.resolve(intent)?;
        let token = transfer.token;
        let chain = token.origin_chain;
        let bridge = token.bridge_contract_address;
        let unavailable = |what: &str, e: eyre::Report| {
            Error::QuoteUnavailable(format!("{} for {}: {}", what, token.id, e))
        };

        let (amount, _) = base_units(self.backend.as_ref(), token, &transfer.amount)
            .await
            .map_err(|e| match e {
                Error::Rpc(reason) => Error::QuoteUnavailable(reason),
                other => other,
            })?;

        let payload = self
            .backend
            .get_message(chain, bridge, amount, token.contract_address, transfer.recipient)
            .await
            .map_err(|e| unavailable("message", e))?;

        let relay_options = self
            .backend
            .get_receive_option(
                chain,
                bridge,
                U256::from(RELAY_GAS_LIMIT),
                U256::from(RELAY_VALUE),
            )
            .await
            .map_err(|e| unavailable("relay options", e))?;

        let native_fee = self
            .backend
            .get_fee(
                chain,
                bridge,
                transfer.destination_protocol_id,
                payload.clone(),
                relay_options.clone(),
            )
            .await
            .map_err(|e| unavailable("relay fee", e))?;

        let native_fee_amount = from_base_units(native_fee, NATIVE_DECIMALS);
        let fee_in_usd = match self
            .converter
            .to_usd(&native_fee_amount, chain.native_symbol())
            .await
        {
            Ok(usd) => Some(usd),
            Err(e) => {
                warn!(token = token.id, error = %e, "Relay fee shown without USD value");
                None
            }
        };

        debug!(
            token = token.id,
            destination = %transfer.destination,
            dst_eid = transfer.destination_protocol_id,
            payload_len = payload.len(),
            fee = %native_fee_amount,
            "Computed relay fee quote"
        );

        Ok(Some(FeeQuote {
            payload,
            relay_options,
            native_fee,
            native_fee_amount,
            fee_in_usd,
        }))
    }

    /// Approve the origin chain's bridge to pull the transfer amount
    pub async fn approve(&self, intent: &TransferIntent) -> Result<TxOutcome> {
        let transfer = self.resolve(intent)?;
        approve_spend(
            self.backend.as_ref(),
            transfer.token,
            transfer.token.bridge_contract_address,
            &transfer.amount,
        )
        .await
    }

    /// Submit the deposit, paying `quote.native_fee` as the relay fee
    pub async fn deposit(&self, intent: &TransferIntent, quote: &FeeQuote) -> Result<TxOutcome> {
        let transfer = self.resolve(intent)?;
        let token = transfer.token;
        let chain = token.origin_chain;
        let bridge = token.bridge_contract_address;
        let (amount, _) = base_units(self.backend.as_ref(), token, &transfer.amount).await?;
        let destination_chain_name = transfer.destination.network_name();

        info!(
            token = token.id,
            amount = %transfer.amount,
            destination = %transfer.destination,
            recipient = %transfer.recipient,
            fee = %quote.native_fee_amount,
            "Submitting deposit"
        );

        let result = if token.is_native() {
            self.backend
                .deposit_native(
                    chain,
                    bridge,
                    transfer.destination_protocol_id,
                    amount,
                    destination_chain_name,
                    amount + quote.native_fee,
                )
                .await
        } else {
            self.backend
                .deposit(
                    chain,
                    bridge,
                    DepositCall {
                        destination_protocol_id: transfer.destination_protocol_id,
                        amount,
                        token: token.contract_address,
                        destination_chain_name: destination_chain_name.to_string(),
                        recipient: transfer.recipient,
                    },
                    quote.native_fee,
                )
                .await
        };

        let outcome = confirmed(result, Error::TransferFailed);
        match &outcome {
            Ok(o) => info!(tx = %o.transaction_hash, token = token.id, "Deposit confirmed"),
            Err(e) => warn!(token = token.id, error = %e, "Deposit failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCall, MockChain, DEFAULT_RELAY_FEE, MOCK_WALLET};

    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn transactor(chain: &Arc<MockChain>) -> BridgeTransactor {
        BridgeTransactor::new(
            chain.clone(),
            Arc::new(TokenCatalog::testnet()),
            Arc::new(ChainRegistry::testnet()),
            CurrencyConverter::new(chain.clone()),
        )
    }

    fn intent(amount: &str) -> TransferIntent {
        TransferIntent {
            amount: amount.to_string(),
            recipient_address: RECIPIENT.to_string(),
            ..TransferIntent::default()
        }
    }

    #[tokio::test]
    async fn test_quote_for_usdt_transfer() {
        let chain = Arc::new(MockChain::new());
        let quote = transactor(&chain)
            .quote(&intent("10"))
            .await
            .unwrap()
            .unwrap();

        assert!(!quote.payload.is_empty());
        assert_eq!(quote.native_fee, U256::from(DEFAULT_RELAY_FEE));
        assert_eq!(quote.native_fee_amount, "0.001");
        assert_eq!(quote.fee_in_usd.as_deref(), Some("2.50"));

        let calls = chain.calls();
        assert!(calls.contains(&MockCall::GetMessage {
            chain: SupportedChain::EthSepolia,
            amount: U256::from(10_000_000u64),
            token: TokenCatalog::testnet()
                .resolve("USDT-ETH")
                .unwrap()
                .contract_address,
            recipient: RECIPIENT.parse().unwrap(),
        }));
        assert!(calls.contains(&MockCall::GetReceiveOption {
            chain: SupportedChain::EthSepolia,
            gas_limit: U256::from(RELAY_GAS_LIMIT),
            value: U256::ZERO,
        }));
        // destination id comes from the destination chain
        assert!(calls.contains(&MockCall::GetFee {
            chain: SupportedChain::EthSepolia,
            destination_protocol_id: 40231,
        }));
    }

    #[tokio::test]
    async fn test_partial_intent_has_no_quote() {
        let chain = Arc::new(MockChain::new());
        let transactor = transactor(&chain);

        let mut no_recipient = intent("10");
        no_recipient.recipient_address = String::new();
        assert!(transactor.quote(&no_recipient).await.unwrap().is_none());

        let mut no_origin = intent("10");
        no_origin.from_chain = None;
        assert!(transactor.quote(&no_origin).await.unwrap().is_none());

        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quote_is_deterministic_for_same_intent() {
        let chain = Arc::new(MockChain::new());
        let transactor = transactor(&chain);
        let first = transactor.quote(&intent("10")).await.unwrap().unwrap();

        chain.set_relay_fee(U256::from(2 * DEFAULT_RELAY_FEE));
        let second = transactor.quote(&intent("10")).await.unwrap().unwrap();

        assert_eq!(first.payload, second.payload);
        assert_eq!(first.relay_options, second.relay_options);
        assert_ne!(first.native_fee, second.native_fee);
    }

    #[tokio::test]
    async fn test_quote_survives_missing_rate() {
        let chain = Arc::new(MockChain::new());
        chain.fail_on("rate");
        let quote = transactor(&chain)
            .quote(&intent("10"))
            .await
            .unwrap()
            .unwrap();
        assert!(quote.fee_in_usd.is_none());
        assert_eq!(quote.native_fee_amount, "0.001");
    }

    #[tokio::test]
    async fn test_quote_unavailable_on_fee_error() {
        let chain = Arc::new(MockChain::new());
        chain.fail_on("getFee");
        let err = transactor(&chain).quote(&intent("10")).await.unwrap_err();
        assert!(matches!(err, Error::QuoteUnavailable(_)));
    }

    #[tokio::test]
    async fn test_malformed_recipient_makes_no_call() {
        let chain = Arc::new(MockChain::new());
        let transactor = transactor(&chain);
        let mut bad = intent("10");
        bad.recipient_address = "0xnot-an-address".to_string();

        assert!(matches!(
            transactor.quote(&bad).await,
            Err(Error::Validation(ValidationFailure::MalformedRecipient))
        ));
        assert!(transactor.approve(&bad).await.is_err());
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_approve_and_deposit_use_same_base_units() {
        let chain = Arc::new(MockChain::new());
        let usdt = *TokenCatalog::testnet().resolve("USDT-ETH").unwrap();
        chain.set_balance(
            usdt.origin_chain,
            usdt.contract_address,
            MOCK_WALLET,
            U256::from(50_000_000u64),
        );
        let transactor = transactor(&chain);
        let intent = intent("12.345678");

        let quote = transactor.quote(&intent).await.unwrap().unwrap();
        transactor.approve(&intent).await.unwrap();
        transactor.deposit(&intent, &quote).await.unwrap();

        let writes = chain.writes();
        let approved = match &writes[0] {
            MockCall::Approve {
                spender, amount, ..
            } => {
                assert_eq!(*spender, usdt.bridge_contract_address);
                *amount
            }
            other => panic!("expected approve, got {:?}", other),
        };
        match &writes[1] {
            MockCall::Deposit { call, value, .. } => {
                assert_eq!(call.amount, approved);
                assert_eq!(call.amount, U256::from(12_345_678u64));
                assert_eq!(call.destination_chain_name, "ARB");
                assert_eq!(call.destination_protocol_id, 40231);
                assert_eq!(*value, quote.native_fee);
            }
            other => panic!("expected deposit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reverted_approval_is_reported() {
        let chain = Arc::new(MockChain::new());
        chain.revert_on("approve");
        let err = transactor(&chain).approve(&intent("10")).await.unwrap_err();
        assert!(matches!(err, Error::ApprovalFailed(_)));
    }

    #[tokio::test]
    async fn test_native_deposit_pays_amount_plus_fee() {
        let chain = Arc::new(MockChain::new());
        chain.set_native_balance(
            SupportedChain::EthSepolia,
            MOCK_WALLET,
            U256::from(5_000_000_000_000_000_000u128),
        );
        let transactor = transactor(&chain);
        let intent = TransferIntent {
            from_token: Some("ETH-SEPOLIA".into()),
            to_token: Some("ETH-BASE".into()),
            to_chain: Some(SupportedChain::BaseSepolia),
            ..intent("1")
        };
        assert!(!transactor.needs_approval(&intent).unwrap());

        let quote = transactor.quote(&intent).await.unwrap().unwrap();
        transactor.deposit(&intent, &quote).await.unwrap();

        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert!(chain.writes().contains(&MockCall::DepositNative {
            chain: SupportedChain::EthSepolia,
            destination_protocol_id: 40245,
            amount: one_eth,
            destination_chain_name: "BASE".to_string(),
            value: one_eth + quote.native_fee,
        }));
    }

    #[tokio::test]
    async fn test_token_on_wrong_chain_is_invalid_selection() {
        let chain = Arc::new(MockChain::new());
        let intent = TransferIntent {
            from_token: Some("USDT-BASE".into()),
            ..intent("1")
        };
        assert!(matches!(
            transactor(&chain).quote(&intent).await,
            Err(Error::InvalidSelection(_))
        ));
    }
}
