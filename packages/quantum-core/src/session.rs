//! Screen drivers sitting between the user and the transactors
//!
//! A session validates input, guards each phase against resubmission, drives
//! the approve/act flow stored in [`SelectionState`], and refreshes balances
//! after every confirmed transaction.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::BridgeTransactor;
use crate::catalog::{TokenCatalog, TokenDescriptor};
use crate::error::{Error, LendingAction, Result, ValidationFailure};
use crate::flow::TwoPhaseFlow;
use crate::interfaces::TxOutcome;
use crate::lending::LendingTransactor;
use crate::reader::{ChainReader, GasPrice};
use crate::state::{BalanceSnapshot, Selection, SelectionState};
use crate::throttle::Cooldown;
use crate::units::is_positive_amount;
use crate::validation::{validate_lending, validate_transfer};

// ============================================================================
// Bridge
// ============================================================================

/// Drives the bridge screen
pub struct BridgeSession {
    state: Arc<SelectionState>,
    catalog: Arc<TokenCatalog>,
    reader: ChainReader,
    transactor: BridgeTransactor,
}

impl BridgeSession {
    pub fn new(
        state: Arc<SelectionState>,
        catalog: Arc<TokenCatalog>,
        reader: ChainReader,
        transactor: BridgeTransactor,
    ) -> Self {
        Self {
            state,
            catalog,
            reader,
            transactor,
        }
    }

    pub fn state(&self) -> &Arc<SelectionState> {
        &self.state
    }

    async fn read_balance(&self, selection: &Selection) -> Option<BalanceSnapshot> {
        let wallet = selection.wallet?;
        let token = self
            .catalog
            .resolve(selection.intent.from_token.as_deref()?)
            .ok()?;
        let balance = self.reader.get_token_balance(wallet, token).await;
        Some(BalanceSnapshot {
            wallet_address: wallet,
            chain: token.origin_chain,
            formatted_amount: balance.balance,
            decimals: balance.decimals,
        })
    }

    async fn read_gas_price(&self, selection: &Selection) -> Option<GasPrice> {
        let chain = selection.intent.from_chain?;
        match self.reader.get_gas_price(chain).await {
            Ok(price) => Some(price),
            Err(e) => {
                warn!(chain = %chain, error = %e, "Gas price unavailable");
                None
            }
        }
    }

    /// Recompute balance, fee quote and gas price for the current selection
    pub async fn refresh(&self) {
        let selection = self.state.snapshot();
        let revision = selection.revision;

        let (balance, quote, gas_price) = tokio::join!(
            self.read_balance(&selection),
            self.transactor.quote(&selection.intent),
            self.read_gas_price(&selection),
        );

        self.state.apply_balance(revision, balance);
        let quote = match quote {
            Ok(quote) => quote,
            Err(e) => {
                debug!(revision, error = %e, "No fee quote for current selection");
                None
            }
        };
        self.state.apply_quote(revision, quote);
        self.state.apply_gas_price(revision, gas_price);
    }

    /// Reject an incomplete or invalid selection without touching the network
    pub fn check(&self) -> Result<()> {
        let selection = self.state.snapshot();
        validate_transfer(&selection.intent, selection.wallet)?;
        Ok(())
    }

    /// Approve the bridge to pull the transfer amount.
    ///
    /// Returns `Ok(None)` for native assets, which need no approval.
    pub async fn approve(&self) -> Result<Option<TxOutcome>> {
        let selection = self.state.snapshot();
        validate_transfer(&selection.intent, selection.wallet)?;

        if !self.transactor.needs_approval(&selection.intent)? {
            self.state.with_bridge_flow(|f| {
                f.skip_approval();
                Ok(())
            })?;
            return Ok(None);
        }

        self.state.with_bridge_flow(TwoPhaseFlow::begin_approval)?;
        let result = self.transactor.approve(&selection.intent).await;
        self.state.with_bridge_flow(|f| {
            f.finish_approval(result.is_ok());
            Ok(())
        })?;
        result.map(Some)
    }

    /// Submit the deposit. Requires a successful approval.
    pub async fn transfer(&self) -> Result<TxOutcome> {
        let selection = self.state.snapshot();
        validate_transfer(&selection.intent, selection.wallet)?;
        self.state.with_bridge_flow(TwoPhaseFlow::begin_action)?;

        let result = self.submit(&selection).await;
        self.state.with_bridge_flow(|f| {
            f.finish_action(result.is_ok());
            Ok(())
        })?;

        if result.is_ok() {
            self.refresh().await;
        }
        result
    }

    async fn submit(&self, selection: &Selection) -> Result<TxOutcome> {
        // re-quote right before submitting; the fee may have moved
        let quote = self
            .transactor
            .quote(&selection.intent)
            .await?
            .ok_or(ValidationFailure::QuoteMissing)?;
        self.state
            .apply_quote(selection.revision, Some(quote.clone()));
        self.transactor.deposit(&selection.intent, &quote).await
    }

    /// The "Done" action: clear a finished flow
    pub fn done(&self) -> bool {
        self.state.acknowledge_bridge_done()
    }

    /// Refresh whenever the selection's inputs change.
    ///
    /// Each refresh runs as its own task; results for superseded inputs are
    /// dropped by the state.
    pub fn spawn_auto_refresh(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut rx = self.state.subscribe();
            let mut last_revision = None;
            loop {
                let revision = rx.borrow_and_update().revision;
                if last_revision != Some(revision) {
                    last_revision = Some(revision);
                    let session = Arc::clone(&self);
                    tokio::spawn(async move { session.refresh().await });
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

// ============================================================================
// Lending
// ============================================================================

/// Drives the lending screens (supply, borrow, repay, withdraw)
pub struct LendingSession {
    state: Arc<SelectionState>,
    catalog: Arc<TokenCatalog>,
    reader: ChainReader,
    transactor: LendingTransactor,
    cooldown: Mutex<Cooldown>,
}

impl LendingSession {
    pub fn new(
        state: Arc<SelectionState>,
        catalog: Arc<TokenCatalog>,
        reader: ChainReader,
        transactor: LendingTransactor,
        cooldown: Cooldown,
    ) -> Self {
        Self {
            state,
            catalog,
            reader,
            transactor,
            cooldown: Mutex::new(cooldown),
        }
    }

    pub fn state(&self) -> &Arc<SelectionState> {
        &self.state
    }

    fn selected_token(&self, selection: &Selection) -> Result<&TokenDescriptor> {
        let id = selection
            .lending
            .token
            .as_deref()
            .ok_or(ValidationFailure::TokenNotSelected)?;
        self.catalog.resolve(id)
    }

    /// Market totals, whitelist and the user's position.
    ///
    /// Rate limited: returns `Ok(false)` without any RPC while the cooldown
    /// window from the previous refresh is still open.
    /// A failed fetch hands the slot back so the next call can retry.
    pub async fn refresh(&self) -> Result<bool> {
        if !self.cooldown().try_acquire() {
            debug!("Lending refresh throttled");
            return Ok(false);
        }
        if let Err(e) = self.fetch().await {
            self.cooldown().release();
            return Err(e);
        }
        Ok(true)
    }

    /// Refresh past the cooldown (after a confirmed transaction)
    pub async fn force_refresh(&self) -> Result<()> {
        self.cooldown().force();
        self.fetch().await
    }

    fn cooldown(&self) -> MutexGuard<'_, Cooldown> {
        self.cooldown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(&self) -> Result<()> {
        let selection = self.state.snapshot();
        let revision = selection.lending.revision;
        let token = self.selected_token(&selection)?;
        let chain = token.origin_chain;

        let position = async {
            match selection.wallet {
                Some(wallet) => {
                    let (balances, wallet_balance) = tokio::join!(
                        self.reader.get_pool_balances(wallet, chain, token),
                        self.reader.get_token_balance(wallet, token),
                    );
                    (balances.ok(), Some(wallet_balance.balance))
                }
                None => (None, None),
            }
        };

        let (market, whitelisted, (balances, token_balance)) = tokio::join!(
            self.reader.get_market_totals(chain),
            self.reader.whitelisted_tokens(chain),
            position,
        );

        let whitelisted = match whitelisted {
            Ok(names) => Some(names),
            Err(e) => {
                warn!(error = %e, "Whitelisted tokens unavailable");
                None
            }
        };
        self.state.apply_market(market?, whitelisted);
        self.state
            .apply_pool_balances(revision, balances, token_balance);
        Ok(())
    }

    /// Amount the current action moves; repay always covers the whole debt
    fn action_amount(selection: &Selection) -> Result<String> {
        if selection.lending.action == LendingAction::Repay {
            let borrowed = selection
                .lending
                .balances
                .as_ref()
                .and_then(|b| b.borrowed.clone())
                .filter(|b| is_positive_amount(b))
                .ok_or(ValidationFailure::NothingToRepay)?;
            return Ok(borrowed);
        }
        Ok(selection.lending.amount.clone())
    }

    fn validate(&self, selection: &Selection) -> Result<(String, &TokenDescriptor)> {
        if selection.wallet.is_none() {
            return Err(ValidationFailure::WalletNotConnected.into());
        }
        let amount = Self::action_amount(selection)?;
        validate_lending(
            selection.lending.token.as_deref(),
            &amount,
            selection.wallet,
        )?;
        Ok((amount, self.selected_token(selection)?))
    }

    /// Validated amount and token; a repay principal is rounded up to the
    /// token's decimals
    async fn prepare(&self, selection: &Selection) -> Result<(String, &TokenDescriptor)> {
        let (amount, token) = self.validate(selection)?;
        if selection.lending.action == LendingAction::Repay {
            let principal = self.transactor.repay_principal(token, &amount).await?;
            return Ok((principal, token));
        }
        Ok((amount, token))
    }

    /// Approve the pool for supply/repay; borrow and withdraw skip straight
    /// to the action. For repay the allowance is sized from a fresh
    /// interest quote.
    pub async fn approve(&self) -> Result<Option<TxOutcome>> {
        let selection = self.state.snapshot();
        let action = selection.lending.action;
        let (amount, token) = self.prepare(&selection).await?;

        if !action.requires_approval() {
            self.state.with_lending_flow(|f| {
                f.skip_approval();
                Ok(())
            })?;
            return Ok(None);
        }

        self.state.with_lending_flow(TwoPhaseFlow::begin_approval)?;
        let result = self
            .approve_amount(action, token, &amount, selection.lending.revision)
            .await;
        self.state.with_lending_flow(|f| {
            f.finish_approval(result.is_ok());
            Ok(())
        })?;
        result.map(Some)
    }

    async fn approve_amount(
        &self,
        action: LendingAction,
        token: &TokenDescriptor,
        amount: &str,
        revision: u64,
    ) -> Result<TxOutcome> {
        let allowance = if action == LendingAction::Repay {
            let quote = self
                .transactor
                .interest_and_repay_amount(token, amount)
                .await?;
            info!(
                principal = %quote.principal,
                interest = %quote.interest,
                total = %quote.total_repay_amount,
                "Sizing repay approval"
            );
            let total = quote.total_repay_amount.clone();
            self.state.apply_repay_quote(revision, quote);
            total
        } else {
            amount.to_string()
        };
        self.transactor.approve(token, &allowance).await
    }

    /// Run the selected action. Requires the approval phase to be complete.
    pub async fn act(&self) -> Result<TxOutcome> {
        let selection = self.state.snapshot();
        let action = selection.lending.action;
        let (amount, token) = self.prepare(&selection).await?;
        self.state.with_lending_flow(TwoPhaseFlow::begin_action)?;

        let result = self.transactor.execute(action, token, &amount).await;
        self.state.with_lending_flow(|f| {
            f.finish_action(result.is_ok());
            Ok(())
        })?;

        if result.is_ok() {
            if let Err(e) = self.force_refresh().await {
                warn!(error = %e, "Post-transaction refresh failed");
            }
        }
        result
    }

    pub fn done(&self) -> bool {
        self.state.acknowledge_lending_done()
    }
}

/// Error that a front end shows once and then lets the user retry
pub fn is_retryable(error: &Error) -> bool {
    !matches!(error, Error::InvalidSelection(_))
}
