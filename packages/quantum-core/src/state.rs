//! Selection state shared by the bridge and lending screens
//!
//! A single [`SelectionState`] owns the user's working set and the live query
//! results derived from it. Readers subscribe through a `tokio::sync::watch`
//! channel and always see the latest [`Selection`].
//!
//! Every change to an input that a derived value depends on bumps a revision
//! counter. Query results are applied together with the revision they were
//! computed for and are dropped if the inputs moved on in the meantime, so
//! refreshes may complete in any order.

use alloy::primitives::Address;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::bridge::FeeQuote;
use crate::chains::SupportedChain;
use crate::error::{LendingAction, ValidationFailure};
use crate::flow::{FlowStage, TwoPhaseFlow};
use crate::lending::RepayQuote;
use crate::reader::{GasPrice, MarketTotals, PoolBalances};

/// The user-driven bridge working set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferIntent {
    pub from_chain: Option<SupportedChain>,
    pub to_chain: Option<SupportedChain>,
    /// Token id, e.g. `USDT-ETH`
    pub from_token: Option<String>,
    pub to_token: Option<String>,
    /// Human-readable decimal amount
    pub amount: String,
    pub recipient_address: String,
}

impl Default for TransferIntent {
    fn default() -> Self {
        Self {
            from_chain: Some(SupportedChain::EthSepolia),
            to_chain: Some(SupportedChain::ArbitrumSepolia),
            from_token: Some("USDT-ETH".to_string()),
            to_token: Some("USDT-ARB".to_string()),
            amount: "0".to_string(),
            recipient_address: String::new(),
        }
    }
}

impl TransferIntent {
    /// Reverse the direction: chains and tokens swap together
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from_chain, &mut self.to_chain);
        std::mem::swap(&mut self.from_token, &mut self.to_token);
    }
}

/// Balance read for the current wallet/token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    pub wallet_address: Address,
    pub chain: SupportedChain,
    pub formatted_amount: String,
    /// `None` when the token's decimals are unknown
    pub decimals: Option<u8>,
}

/// A fee quote and the intent revision it was computed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionedQuote {
    pub revision: u64,
    pub quote: FeeQuote,
}

/// Lending screen working set and results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingView {
    pub action: LendingAction,
    pub token: Option<String>,
    pub amount: String,
    pub flow: TwoPhaseFlow,
    pub balances: Option<PoolBalances>,
    /// Wallet balance of the selected token
    pub token_balance: Option<String>,
    pub market: Option<MarketTotals>,
    pub whitelisted: Vec<String>,
    /// Repay quote the pending approval was sized from
    pub repay_quote: Option<RepayQuote>,
    pub revision: u64,
}

impl Default for LendingView {
    fn default() -> Self {
        Self {
            action: LendingAction::Supply,
            token: Some("USDT-BASE".to_string()),
            amount: "0".to_string(),
            flow: TwoPhaseFlow::default(),
            balances: None,
            token_balance: None,
            market: None,
            whitelisted: Vec::new(),
            repay_quote: None,
            revision: 0,
        }
    }
}

/// Everything a view renders from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub intent: TransferIntent,
    /// Bumped on every change to the intent or the wallet
    pub revision: u64,
    pub wallet: Option<Address>,
    pub balance: Option<BalanceSnapshot>,
    pub quote: Option<RevisionedQuote>,
    pub gas_price: Option<GasPrice>,
    pub bridge_flow: TwoPhaseFlow,
    pub lending: LendingView,
}

impl Selection {
    /// The fee quote, only if it was computed for the current intent
    pub fn current_quote(&self) -> Option<&FeeQuote> {
        self.quote
            .as_ref()
            .filter(|q| q.revision == self.revision)
            .map(|q| &q.quote)
    }
}

/// What changed in an intent mutation
#[derive(Clone, Copy, PartialEq, Eq)]
enum Change {
    /// Derived values are stale
    Inputs,
    /// Derived values are stale and a finished flow no longer applies
    Transaction,
}

/// Owner of the [`Selection`]; hand out clones of the `Arc` to views
pub struct SelectionState {
    tx: watch::Sender<Selection>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(Selection::default())
    }
}

impl SelectionState {
    pub fn new(initial: Selection) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Selection> {
        self.tx.subscribe()
    }

    /// Clone of the current selection
    pub fn snapshot(&self) -> Selection {
        self.tx.borrow().clone()
    }

    pub fn revision(&self) -> u64 {
        self.tx.borrow().revision
    }

    fn update_intent(&self, change: Change, mutate: impl FnOnce(&mut TransferIntent)) {
        self.tx.send_if_modified(|s| {
            let before = s.intent.clone();
            mutate(&mut s.intent);
            if s.intent == before {
                return false;
            }
            s.revision += 1;
            s.quote = None;
            if change == Change::Transaction {
                s.bridge_flow.reset();
            }
            debug!(revision = s.revision, "Selection changed");
            true
        });
    }

    // ------------------------------------------------------------------
    // Bridge mutators
    // ------------------------------------------------------------------

    pub fn set_from_chain(&self, chain: Option<SupportedChain>) {
        self.update_intent(Change::Transaction, |i| i.from_chain = chain);
    }

    pub fn set_to_chain(&self, chain: Option<SupportedChain>) {
        self.update_intent(Change::Inputs, |i| i.to_chain = chain);
    }

    pub fn set_from_token(&self, token: Option<String>) {
        self.update_intent(Change::Transaction, |i| i.from_token = token);
    }

    pub fn set_to_token(&self, token: Option<String>) {
        self.update_intent(Change::Transaction, |i| i.to_token = token);
    }

    pub fn set_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.update_intent(Change::Transaction, |i| i.amount = amount);
    }

    pub fn set_recipient(&self, recipient: impl Into<String>) {
        let recipient = recipient.into();
        self.update_intent(Change::Inputs, |i| i.recipient_address = recipient);
    }

    /// Swap direction (chains and tokens together)
    pub fn swap(&self) {
        self.update_intent(Change::Transaction, TransferIntent::swap);
    }

    /// Replace the whole intent
    pub fn set_intent(&self, intent: TransferIntent) {
        self.update_intent(Change::Transaction, |i| *i = intent);
    }

    /// Connect, switch or disconnect the wallet
    pub fn set_wallet(&self, wallet: Option<Address>) {
        self.tx.send_if_modified(|s| {
            if s.wallet == wallet {
                return false;
            }
            s.wallet = wallet;
            s.revision += 1;
            s.balance = None;
            s.quote = None;
            s.lending.balances = None;
            s.lending.token_balance = None;
            s.lending.revision += 1;
            s.bridge_flow.reset();
            s.lending.flow.reset();
            true
        });
    }

    // ------------------------------------------------------------------
    // Query results
    // ------------------------------------------------------------------

    /// Store a result computed for `revision`; dropped if the inputs moved on
    fn apply<F>(&self, revision: u64, what: &str, apply: F) -> bool
    where
        F: FnOnce(&mut Selection),
    {
        self.tx.send_if_modified(|s| {
            if s.revision != revision {
                debug!(
                    result = what,
                    computed_for = revision,
                    current = s.revision,
                    "Dropping stale result"
                );
                return false;
            }
            apply(s);
            true
        })
    }

    pub fn apply_balance(&self, revision: u64, balance: Option<BalanceSnapshot>) -> bool {
        self.apply(revision, "balance", |s| s.balance = balance)
    }

    pub fn apply_quote(&self, revision: u64, quote: Option<FeeQuote>) -> bool {
        self.apply(revision, "quote", |s| {
            s.quote = quote.map(|quote| RevisionedQuote { revision, quote })
        })
    }

    pub fn apply_gas_price(&self, revision: u64, gas_price: Option<GasPrice>) -> bool {
        self.apply(revision, "gas price", |s| s.gas_price = gas_price)
    }

    /// Run a flow transition against the bridge flow and publish the change
    pub fn with_bridge_flow(
        &self,
        f: impl FnOnce(&mut TwoPhaseFlow) -> Result<(), ValidationFailure>,
    ) -> Result<(), ValidationFailure> {
        let mut outcome = Ok(());
        self.tx.send_modify(|s| outcome = f(&mut s.bridge_flow));
        outcome
    }

    /// Clear a finished bridge flow (the "Done" action). Returns false if the
    /// flow was not finished.
    pub fn acknowledge_bridge_done(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.bridge_flow.stage() != FlowStage::Done {
                return false;
            }
            s.bridge_flow = TwoPhaseFlow::default();
            s.intent.amount = "0".to_string();
            s.revision += 1;
            s.quote = None;
            true
        })
    }

    // ------------------------------------------------------------------
    // Lending
    // ------------------------------------------------------------------

    fn update_lending(&self, mutate: impl FnOnce(&mut LendingView)) {
        self.tx.send_if_modified(|s| {
            let before = (s.lending.action, s.lending.token.clone(), s.lending.amount.clone());
            mutate(&mut s.lending);
            let after = (s.lending.action, s.lending.token.clone(), s.lending.amount.clone());
            if before == after {
                return false;
            }
            s.lending.revision += 1;
            s.lending.repay_quote = None;
            s.lending.flow.reset();
            true
        });
    }

    pub fn set_lending_action(&self, action: LendingAction) {
        self.update_lending(|l| l.action = action);
    }

    pub fn set_lending_token(&self, token: Option<String>) {
        self.update_lending(|l| l.token = token);
    }

    pub fn set_lending_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.update_lending(|l| l.amount = amount);
    }

    pub fn lending_revision(&self) -> u64 {
        self.tx.borrow().lending.revision
    }

    fn apply_lending<F>(&self, revision: u64, what: &str, apply: F) -> bool
    where
        F: FnOnce(&mut LendingView),
    {
        self.tx.send_if_modified(|s| {
            if s.lending.revision != revision {
                debug!(result = what, "Dropping stale lending result");
                return false;
            }
            apply(&mut s.lending);
            true
        })
    }

    pub fn apply_pool_balances(
        &self,
        revision: u64,
        balances: Option<PoolBalances>,
        token_balance: Option<String>,
    ) -> bool {
        self.apply_lending(revision, "pool balances", |l| {
            l.balances = balances;
            l.token_balance = token_balance;
        })
    }

    /// Market figures do not depend on the lending selection
    pub fn apply_market(&self, market: MarketTotals, whitelisted: Option<Vec<String>>) {
        self.tx.send_modify(|s| {
            s.lending.market = Some(market);
            if let Some(names) = whitelisted {
                s.lending.whitelisted = names;
            }
        });
    }

    pub fn apply_repay_quote(&self, revision: u64, quote: RepayQuote) -> bool {
        self.apply_lending(revision, "repay quote", |l| l.repay_quote = Some(quote))
    }

    /// Run a flow transition against the lending flow and publish the change
    pub fn with_lending_flow(
        &self,
        f: impl FnOnce(&mut TwoPhaseFlow) -> Result<(), ValidationFailure>,
    ) -> Result<(), ValidationFailure> {
        let mut outcome = Ok(());
        self.tx.send_modify(|s| outcome = f(&mut s.lending.flow));
        outcome
    }

    /// Clear a finished lending flow
    pub fn acknowledge_lending_done(&self) -> bool {
        self.tx.send_if_modified(|s| {
            if s.lending.flow.stage() != FlowStage::Done {
                return false;
            }
            s.lending.flow = TwoPhaseFlow::default();
            s.lending.amount = "0".to_string();
            s.lending.repay_quote = None;
            s.lending.revision += 1;
            true
        })
    }
}
