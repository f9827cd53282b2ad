//! Command handlers
//!
//! Each handler wires the core sessions over one [`App`] and prints the
//! result, either as text or as JSON with `--json`.

use std::sync::Arc;

use alloy::primitives::Address;
use eyre::{eyre, Result};
use quantum_core::units::is_positive_amount;
use quantum_core::validation::parse_recipient;
use quantum_core::{
    BridgeSession, BridgeTransactor, ChainBackend, ChainReader, ChainRegistry, CoinbaseRates,
    CurrencyConverter, Cooldown, EvmGateway, Faucet, LendingAction, LendingSession,
    LendingTransactor, NodeInterface, Selection, SelectionState, SupportedChain, TokenCatalog,
    TransferIntent, TxOutcome, ValidationFailure,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::config::Config;

/// Shared wiring for every command
pub struct App {
    config: Config,
    registry: Arc<ChainRegistry>,
    catalog: Arc<TokenCatalog>,
    gateway: Arc<EvmGateway>,
    converter: CurrencyConverter,
    json: bool,
}

impl App {
    pub fn new(config: Config, json: bool) -> Result<Self> {
        let registry = Arc::new(config.registry.clone());
        let gateway = match &config.wallet_private_key {
            Some(key) => EvmGateway::new_with_signer(registry.clone(), key.expose())?,
            None => EvmGateway::new_readonly(registry.clone())?,
        };
        let rates = CoinbaseRates::new(config.exchange_rate_url.clone())?;

        Ok(Self {
            config,
            registry,
            catalog: Arc::new(TokenCatalog::testnet()),
            gateway: Arc::new(gateway),
            converter: CurrencyConverter::new(Arc::new(rates)),
            json,
        })
    }

    fn backend(&self) -> Arc<dyn ChainBackend> {
        self.gateway.clone()
    }

    fn reader(&self) -> ChainReader {
        let reader = ChainReader::new(self.backend(), self.converter.clone());
        match self.config.lending_pool_address {
            Some(pool) => reader.with_pool(pool),
            None => reader,
        }
    }

    fn wallet(&self) -> Result<Address> {
        self.gateway
            .signer_address()
            .ok_or_else(|| eyre!("WALLET_PRIVATE_KEY required for this command"))
    }

    /// Fresh selection with the connected wallet (if any)
    fn state(&self) -> Arc<SelectionState> {
        let state = SelectionState::new(Selection::default());
        state.set_wallet(self.gateway.signer_address());
        Arc::new(state)
    }

    fn bridge_session(&self, state: Arc<SelectionState>) -> BridgeSession {
        let transactor = BridgeTransactor::new(
            self.backend(),
            self.catalog.clone(),
            self.registry.clone(),
            self.converter.clone(),
        );
        BridgeSession::new(state, self.catalog.clone(), self.reader(), transactor)
    }

    fn lending_session(&self, state: Arc<SelectionState>) -> Result<LendingSession> {
        let pool = self.config.require_pool()?;
        Ok(LendingSession::new(
            state,
            self.catalog.clone(),
            self.reader(),
            LendingTransactor::new(self.backend(), pool),
            Cooldown::from_secs(self.config.market_refresh_cooldown_secs),
        ))
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            text();
        }
        Ok(())
    }

    /// Progress line for text mode; `--json` keeps stdout to one document
    fn progress(&self, line: String) -> Option<String> {
        (!self.json).then_some(line)
    }

    fn note(&self, line: String) {
        if let Some(line) = self.progress(line) {
            println!("{}", line);
        }
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    pub fn chains(&self) -> Result<()> {
        let mut rows = Vec::new();
        for chain in SupportedChain::ALL {
            let config = self.registry.resolve(chain)?;
            rows.push(json!({
                "id": chain.as_str(),
                "name": chain.display_name(),
                "network": chain.network_name(),
                "chain_id": config.chain_id,
                "destination_protocol_id": config.destination_protocol_id,
                "rpc_endpoint": config.rpc_endpoint,
            }));
        }
        self.emit(&rows, || {
            for chain in SupportedChain::ALL {
                if let Ok(config) = self.registry.resolve(chain) {
                    println!(
                        "{:<18} {:<10} chain_id={:<10} eid={:<6} {}",
                        chain.as_str(),
                        chain.display_name(),
                        config.chain_id,
                        config.destination_protocol_id,
                        config.rpc_endpoint
                    );
                }
            }
        })
    }

    pub fn tokens(&self, chain: Option<SupportedChain>) -> Result<()> {
        let tokens: Vec<_> = self
            .catalog
            .all()
            .iter()
            .filter(|t| chain.map_or(true, |c| t.origin_chain == c))
            .collect();
        let rows: Vec<_> = tokens
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "symbol": t.symbol,
                    "name": t.name,
                    "chain": t.origin_chain,
                    "contract_address": t.contract_address,
                    "bridge_contract_address": t.bridge_contract_address,
                    "native": t.is_native(),
                })
            })
            .collect();
        self.emit(&rows, || {
            for t in &tokens {
                let kind = if t.is_native() { "native" } else { "erc20" };
                println!(
                    "{:<10} {:<6} {:<18} {:<6} {}",
                    t.id, t.symbol, t.origin_chain, kind, t.contract_address
                );
            }
        })
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn balance(&self, token_id: &str, owner: Option<Address>) -> Result<()> {
        let token = self.catalog.resolve(token_id)?;
        let owner = match owner {
            Some(owner) => owner,
            None => self.wallet()?,
        };
        let balance = self.reader().get_token_balance(owner, token).await;
        self.emit(&balance, || {
            println!("{} {} ({})", balance.balance, token.symbol, token.origin_chain)
        })
    }

    pub async fn gas(&self, chain: SupportedChain) -> Result<()> {
        let price = self.reader().get_gas_price(chain).await?;
        self.emit(&price, || {
            let usd = price.usd_per_unit.as_deref().unwrap_or("n/a");
            println!(
                "{}: {} gwei ({} {} per gas, ${} per gas)",
                chain,
                price.gwei,
                price.native_per_unit,
                chain.native_symbol(),
                usd
            )
        })
    }

    // ------------------------------------------------------------------------
    // Bridge
    // ------------------------------------------------------------------------

    fn intent(
        &self,
        from_token: &str,
        to_token: &str,
        amount: &str,
        recipient: Option<String>,
    ) -> Result<TransferIntent> {
        let from = self.catalog.resolve(from_token)?;
        let to = self.catalog.resolve(to_token)?;
        let recipient_address = match recipient {
            Some(r) => r,
            None => self.wallet()?.to_string(),
        };
        Ok(TransferIntent {
            from_chain: Some(from.origin_chain),
            to_chain: Some(to.origin_chain),
            from_token: Some(from.id.to_string()),
            to_token: Some(to.id.to_string()),
            amount: amount.to_string(),
            recipient_address,
        })
    }

    pub async fn quote(
        &self,
        from_token: &str,
        to_token: &str,
        amount: &str,
        recipient: Option<String>,
    ) -> Result<()> {
        let intent = self.intent(from_token, to_token, amount, recipient)?;
        parse_recipient(&intent.recipient_address).map_err(quantum_core::Error::from)?;
        if !is_positive_amount(&intent.amount) {
            return Err(quantum_core::Error::from(ValidationFailure::InvalidAmount).into());
        }
        let state = self.state();
        state.set_intent(intent);
        let session = self.bridge_session(state.clone());
        session.refresh().await;

        let selection = state.snapshot();
        let quote = selection
            .current_quote()
            .ok_or_else(|| eyre!("Relay fee quote unavailable, check the selection and RPC"))?;
        let native = selection
            .intent
            .from_chain
            .map_or("ETH", |c| c.native_symbol());
        self.emit(
            &json!({
                "intent": selection.intent,
                "quote": quote,
                "balance": selection.balance,
                "gas_price": selection.gas_price,
            }),
            || {
                println!(
                    "Relay fee: {} {} (${})",
                    quote.native_fee_amount,
                    native,
                    quote.fee_in_usd.as_deref().unwrap_or("n/a")
                );
                if let Some(balance) = &selection.balance {
                    println!("Balance:   {}", balance.formatted_amount);
                }
                if let Some(gas) = &selection.gas_price {
                    println!("Gas:       {} gwei", gas.gwei);
                }
            },
        )
    }

    pub async fn bridge(
        &self,
        from_token: &str,
        to_token: &str,
        amount: &str,
        recipient: Option<String>,
    ) -> Result<()> {
        self.wallet()?;
        let state = self.state();
        state.set_intent(self.intent(from_token, to_token, amount, recipient)?);
        let session = self.bridge_session(state.clone());
        session.check()?;
        session.refresh().await;

        match session.approve().await? {
            Some(outcome) => self.report_tx("Approval", &outcome),
            None => self.note("Approval not needed".to_string()),
        }
        let outcome = session.transfer().await?;
        self.report_tx("Transfer", &outcome);
        let selection = state.snapshot();
        session.done();

        self.emit(
            &json!({
                "transaction_hash": outcome.transaction_hash,
                "intent": selection.intent,
                "balance": selection.balance,
            }),
            || {
                if let Some(balance) = &selection.balance {
                    println!("Remaining balance: {}", balance.formatted_amount);
                }
            },
        )
    }

    fn report_tx(&self, label: &str, outcome: &TxOutcome) {
        info!(tx = %outcome.transaction_hash, "{} confirmed", label);
        self.note(format!("{} confirmed: {}", label, outcome.transaction_hash));
    }

    // ------------------------------------------------------------------------
    // Faucet
    // ------------------------------------------------------------------------

    pub async fn faucet(&self, token_id: &str, recipient: Option<String>) -> Result<()> {
        let recipient = match recipient {
            Some(r) => r,
            None => self.wallet()?.to_string(),
        };
        let faucet = Faucet::new(self.backend(), self.catalog.clone(), self.reader())
            .with_mint_amount(self.config.faucet_mint_amount.clone());
        let minted = faucet.claim(token_id, &recipient).await?;
        self.emit(&minted, || {
            println!(
                "Minted {} {} to {} on {} ({})",
                self.config.faucet_mint_amount,
                token_id,
                minted.recipient_address,
                minted.chain,
                minted.transaction_hash
            );
            println!("New balance: {}", minted.token_balance);
        })
    }

    // ------------------------------------------------------------------------
    // Lending
    // ------------------------------------------------------------------------

    pub async fn lend(
        &self,
        action: LendingAction,
        token_id: &str,
        amount: Option<String>,
    ) -> Result<()> {
        self.wallet()?;
        let state = self.state();
        state.set_lending_token(Some(self.catalog.resolve(token_id)?.id.to_string()));
        state.set_lending_action(action);
        if let Some(amount) = amount {
            state.set_lending_amount(amount);
        }
        let session = self.lending_session(state.clone())?;
        session.force_refresh().await?;

        match session.approve().await? {
            Some(outcome) => self.report_tx("Approval", &outcome),
            None => self.note(format!("Approval not needed for {}", action)),
        }
        let outcome = session.act().await?;
        self.report_tx(&capitalize(action.as_str()), &outcome);
        let selection = state.snapshot();
        session.done();

        self.emit(
            &json!({
                "transaction_hash": outcome.transaction_hash,
                "action": action,
                "repay_quote": selection.lending.repay_quote,
                "balances": selection.lending.balances,
            }),
            || {
                if let Some(quote) = &selection.lending.repay_quote {
                    println!(
                        "Repaid principal {} + interest {} = {}",
                        quote.principal, quote.interest, quote.total_repay_amount
                    );
                }
                print_position(&selection);
            },
        )
    }

    pub async fn market(&self, token_id: &str) -> Result<()> {
        let state = self.state();
        state.set_lending_token(Some(self.catalog.resolve(token_id)?.id.to_string()));
        let session = self.lending_session(state.clone())?;
        session.refresh().await?;

        let selection = state.snapshot();
        let lending = &selection.lending;
        self.emit(
            &json!({
                "market": lending.market,
                "whitelisted": lending.whitelisted,
            }),
            || {
                if let Some(market) = &lending.market {
                    println!(
                        "Total supplied: ${}",
                        market.total_supplied.as_deref().unwrap_or("n/a")
                    );
                    println!(
                        "Total borrowed: ${}",
                        market.total_borrowed.as_deref().unwrap_or("n/a")
                    );
                }
                println!("Markets: {}", lending.whitelisted.join(", "));
            },
        )
    }

    pub async fn position(&self, token_id: &str) -> Result<()> {
        self.wallet()?;
        let state = self.state();
        state.set_lending_token(Some(self.catalog.resolve(token_id)?.id.to_string()));
        let session = self.lending_session(state.clone())?;
        session.refresh().await?;

        let selection = state.snapshot();
        self.emit(
            &json!({
                "balances": selection.lending.balances,
                "token_balance": selection.lending.token_balance,
            }),
            || print_position(&selection),
        )
    }
}

fn print_position(selection: &Selection) {
    let lending = &selection.lending;
    if let Some(balances) = &lending.balances {
        println!(
            "Supplied:     ${}",
            balances.supplied.as_deref().unwrap_or("n/a")
        );
        println!(
            "Borrowed:     ${}",
            balances.borrowed.as_deref().unwrap_or("n/a")
        );
        println!(
            "Credit limit: ${}",
            balances.credit_limit.as_deref().unwrap_or("n/a")
        );
    }
    if let Some(balance) = &lending.token_balance {
        println!("Wallet:       {}", balance);
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantum_core::pricing::DEFAULT_EXCHANGE_RATE_URL;
    use quantum_core::redact::Redacted;
    use std::collections::HashMap;

    // first anvil dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    /// App whose endpoints all point at a closed local port
    fn offline_app(json: bool, wallet: bool) -> App {
        let overrides: HashMap<_, _> = SupportedChain::ALL
            .into_iter()
            .map(|chain| (chain, "http://127.0.0.1:9".to_string()))
            .collect();
        let config = Config {
            registry: ChainRegistry::with_rpc_overrides(&overrides).unwrap(),
            wallet_private_key: wallet.then(|| Redacted(DEV_KEY.to_string())),
            lending_pool_address: None,
            exchange_rate_url: DEFAULT_EXCHANGE_RATE_URL.to_string(),
            market_refresh_cooldown_secs: 60,
            faucet_mint_amount: "1000".to_string(),
        };
        App::new(config, json).unwrap()
    }

    fn validation_failure(result: Result<()>) -> ValidationFailure {
        match result.unwrap_err().downcast::<quantum_core::Error>().unwrap() {
            quantum_core::Error::Validation(failure) => failure,
            other => panic!("expected a validation error, got {other}"),
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("repay"), "Repay");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_json_mode_prints_no_progress_lines() {
        let app = offline_app(true, false);
        assert_eq!(app.progress("Approval not needed".to_string()), None);

        let app = offline_app(false, false);
        assert_eq!(
            app.progress("Approval not needed".to_string()).as_deref(),
            Some("Approval not needed")
        );
    }

    #[tokio::test]
    async fn test_quote_rejects_input_before_reading_chain() {
        let app = offline_app(true, false);
        let failure = validation_failure(
            app.quote("USDT-ETH", "USDT-ARB", "10", Some("0x1234".into()))
                .await,
        );
        assert_eq!(failure, ValidationFailure::MalformedRecipient);

        let recipient = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
        let failure =
            validation_failure(app.quote("USDT-ETH", "USDT-ARB", "0", Some(recipient.into())).await);
        assert_eq!(failure, ValidationFailure::InvalidAmount);
    }

    #[tokio::test]
    async fn test_bridge_rejects_zero_amount() {
        let app = offline_app(true, true);
        let failure = validation_failure(app.bridge("USDT-ETH", "USDT-ARB", "0", None).await);
        assert_eq!(failure, ValidationFailure::InvalidAmount);
    }
}
