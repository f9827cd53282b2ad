//! Lending pool writes and the repay quote
//!
//! Each operation resolves the token's decimals, converts the amount, sends
//! the wallet-signed call and waits for one confirmation. Approve/act staging
//! lives in [`crate::session::LendingSession`], not here.

use std::sync::Arc;

use alloy::primitives::Address;
use serde::Serialize;
use tracing::{info, warn};

use crate::approval::{approve_spend, base_units, confirmed, token_decimals};
use crate::catalog::TokenDescriptor;
use crate::error::{Error, LendingAction, Result};
use crate::interfaces::{ChainBackend, TxOutcome};
use crate::units::{from_base_units, round_up_to_decimals};

/// Interest owed on a principal and the total needed to repay it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepayQuote {
    pub principal: String,
    pub interest: String,
    /// `principal + interest`
    pub total_repay_amount: String,
}

#[derive(Clone)]
pub struct LendingTransactor {
    backend: Arc<dyn ChainBackend>,
    pool: Address,
}

impl LendingTransactor {
    pub fn new(backend: Arc<dyn ChainBackend>, pool: Address) -> Self {
        Self { backend, pool }
    }

    pub fn pool(&self) -> Address {
        self.pool
    }

    fn erc20(token: &TokenDescriptor) -> Result<&TokenDescriptor> {
        if token.is_native() {
            return Err(Error::InvalidSelection(format!(
                "{} is a native asset; the pool only accepts ERC20 tokens",
                token.id
            )));
        }
        Ok(token)
    }

    /// Allow the pool to pull `amount` of `token`
    pub async fn approve(&self, token: &TokenDescriptor, amount: &str) -> Result<TxOutcome> {
        approve_spend(self.backend.as_ref(), Self::erc20(token)?, self.pool, amount).await
    }

    pub async fn supply(&self, token: &TokenDescriptor, amount: &str) -> Result<TxOutcome> {
        let token = Self::erc20(token)?;
        let (raw, _) = base_units(self.backend.as_ref(), token, amount).await?;
        info!(token = token.id, amount = %amount, "Submitting supply");
        let result = self
            .backend
            .supply(token.origin_chain, self.pool, token.contract_address, raw)
            .await;
        Self::finish(LendingAction::Supply, token, result)
    }

    /// Amount comes first, matching the pool's `borrow(amount, token)`
    pub async fn borrow(&self, amount: &str, token: &TokenDescriptor) -> Result<TxOutcome> {
        let token = Self::erc20(token)?;
        let (raw, _) = base_units(self.backend.as_ref(), token, amount).await?;
        info!(token = token.id, amount = %amount, "Submitting borrow");
        let result = self
            .backend
            .borrow(token.origin_chain, self.pool, raw, token.contract_address)
            .await;
        Self::finish(LendingAction::Borrow, token, result)
    }

    /// Repay `amount` of principal through the pool's `payDebt`
    pub async fn repay(&self, token: &TokenDescriptor, amount: &str) -> Result<TxOutcome> {
        let token = Self::erc20(token)?;
        let (raw, _) = base_units(self.backend.as_ref(), token, amount).await?;
        info!(token = token.id, amount = %amount, "Submitting payDebt");
        let result = self
            .backend
            .pay_debt(token.origin_chain, self.pool, token.contract_address, raw)
            .await;
        Self::finish(LendingAction::Repay, token, result)
    }

    pub async fn withdraw(&self, token: &TokenDescriptor, amount: &str) -> Result<TxOutcome> {
        let token = Self::erc20(token)?;
        let (raw, _) = base_units(self.backend.as_ref(), token, amount).await?;
        info!(token = token.id, amount = %amount, "Submitting withdraw");
        let result = self
            .backend
            .withdraw(token.origin_chain, self.pool, token.contract_address, raw)
            .await;
        Self::finish(LendingAction::Withdraw, token, result)
    }

    /// Run `action` with `amount` of `token`
    pub async fn execute(
        &self,
        action: LendingAction,
        token: &TokenDescriptor,
        amount: &str,
    ) -> Result<TxOutcome> {
        match action {
            LendingAction::Supply => self.supply(token, amount).await,
            LendingAction::Borrow => self.borrow(amount, token).await,
            LendingAction::Repay => self.repay(token, amount).await,
            LendingAction::Withdraw => self.withdraw(token, amount).await,
        }
    }

    /// Outstanding debt as a `token` amount.
    ///
    /// The pool reports debt in 18-decimal dollars; anything finer than the
    /// token's decimals is rounded up so the whole debt is covered.
    pub async fn repay_principal(&self, token: &TokenDescriptor, borrowed: &str) -> Result<String> {
        let token = Self::erc20(token)?;
        let decimals = token_decimals(self.backend.as_ref(), token)
            .await
            .map_err(|e| Error::Rpc(format!("decimals of {}: {}", token.id, e)))?;
        round_up_to_decimals(borrowed, decimals)
    }

    /// Accrued interest on `principal` and the total repay amount.
    ///
    /// Interest accrues continuously; fetch this right before approving a repay.
    pub async fn interest_and_repay_amount(
        &self,
        token: &TokenDescriptor,
        principal: &str,
    ) -> Result<RepayQuote> {
        let token = Self::erc20(token)?;
        let (principal_raw, decimals) = base_units(self.backend.as_ref(), token, principal).await?;
        let interest_raw = self
            .backend
            .interest(
                token.origin_chain,
                self.pool,
                token.contract_address,
                principal_raw,
            )
            .await
            .map_err(|e| Error::QuoteUnavailable(format!("interest for {}: {}", token.id, e)))?;

        Ok(RepayQuote {
            principal: from_base_units(principal_raw, decimals),
            interest: from_base_units(interest_raw, decimals),
            total_repay_amount: from_base_units(principal_raw + interest_raw, decimals),
        })
    }

    fn finish(
        action: LendingAction,
        token: &TokenDescriptor,
        result: eyre::Result<TxOutcome>,
    ) -> Result<TxOutcome> {
        let outcome = confirmed(result, |reason| Error::LendingFailed { action, reason });
        match &outcome {
            Ok(o) => info!(tx = %o.transaction_hash, token = token.id, %action, "Lending transaction confirmed"),
            Err(e) => warn!(token = token.id, %action, error = %e, "Lending transaction failed"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TokenCatalog;
    use crate::testing::{MockCall, MockChain, MOCK_POOL, MOCK_WALLET};
    use alloy::primitives::U256;

    fn usdt() -> TokenDescriptor {
        *TokenCatalog::testnet().resolve("USDT-BASE").unwrap()
    }

    fn setup() -> (Arc<MockChain>, LendingTransactor) {
        let chain = Arc::new(MockChain::new());
        let token = usdt();
        chain.set_balance(
            token.origin_chain,
            token.contract_address,
            MOCK_WALLET,
            U256::from(1_000_000_000u64),
        );
        let transactor = LendingTransactor::new(chain.clone(), MOCK_POOL);
        (chain, transactor)
    }

    #[tokio::test]
    async fn test_supply_after_pool_approval() {
        let (chain, lending) = setup();
        let token = usdt();

        lending.approve(&token, "250").await.unwrap();
        lending.supply(&token, "250").await.unwrap();

        let writes = chain.writes();
        assert!(matches!(
            &writes[0],
            MockCall::Approve { spender, amount, .. }
                if *spender == MOCK_POOL && *amount == U256::from(250_000_000u64)
        ));
        assert_eq!(
            writes[1],
            MockCall::Supply {
                token: token.contract_address,
                amount: U256::from(250_000_000u64)
            }
        );
    }

    #[tokio::test]
    async fn test_borrow_argument_order() {
        let (chain, lending) = setup();
        let token = usdt();
        lending.borrow("10", &token).await.unwrap();
        assert_eq!(
            chain.writes(),
            vec![MockCall::Borrow {
                amount: U256::from(10_000_000u64),
                token: token.contract_address
            }]
        );
    }

    #[tokio::test]
    async fn test_interest_and_repay_amount() {
        let (_, lending) = setup();
        let quote = lending
            .interest_and_repay_amount(&usdt(), "100")
            .await
            .unwrap();
        assert_eq!(quote.principal, "100");
        assert_eq!(quote.interest, "5");
        assert_eq!(quote.total_repay_amount, "105");
    }

    #[tokio::test]
    async fn test_repay_principal_rounds_dollar_debt_up() {
        let (_, lending) = setup();
        let token = usdt();
        // 18-decimal dollar figure on a 6-decimal token
        let principal = lending
            .repay_principal(&token, "100.0000004")
            .await
            .unwrap();
        assert_eq!(principal, "100.000001");
        assert_eq!(
            lending.repay_principal(&token, "100").await.unwrap(),
            "100"
        );
    }

    #[tokio::test]
    async fn test_reverted_withdraw_maps_to_lending_failure() {
        let (chain, lending) = setup();
        chain.revert_on("withdraw");
        let err = lending.withdraw(&usdt(), "1").await.unwrap_err();
        assert!(matches!(
            err,
            Error::LendingFailed {
                action: LendingAction::Withdraw,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_thrown_supply_maps_to_lending_failure() {
        let (_, lending) = setup();
        // no allowance granted, so the pool's transferFrom fails
        let err = lending.supply(&usdt(), "1").await.unwrap_err();
        assert!(err.to_string().starts_with("supply failed"));
    }

    #[tokio::test]
    async fn test_native_asset_rejected() {
        let (chain, lending) = setup();
        let eth = *TokenCatalog::testnet().resolve("ETH-BASE").unwrap();
        assert!(matches!(
            lending.supply(&eth, "1").await,
            Err(Error::InvalidSelection(_))
        ));
        assert!(chain.calls().is_empty());
    }
}
