//! Test-token faucet

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use serde::Serialize;
use tracing::info;

use crate::approval::{base_units, confirmed};
use crate::catalog::TokenCatalog;
use crate::chains::SupportedChain;
use crate::error::{Error, Result};
use crate::interfaces::ChainBackend;
use crate::reader::ChainReader;
use crate::validation::parse_recipient;

/// Tokens minted per claim unless configured otherwise
pub const DEFAULT_MINT_AMOUNT: &str = "1000";

/// Result of a confirmed faucet mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintResult {
    /// Recipient's balance re-read after the mint
    pub token_balance: String,
    pub recipient_address: Address,
    pub chain: SupportedChain,
    pub transaction_hash: B256,
}

pub struct Faucet {
    backend: Arc<dyn ChainBackend>,
    catalog: Arc<TokenCatalog>,
    reader: ChainReader,
    mint_amount: String,
}

impl Faucet {
    pub fn new(
        backend: Arc<dyn ChainBackend>,
        catalog: Arc<TokenCatalog>,
        reader: ChainReader,
    ) -> Self {
        Self {
            backend,
            catalog,
            reader,
            mint_amount: DEFAULT_MINT_AMOUNT.to_string(),
        }
    }

    pub fn with_mint_amount(mut self, amount: impl Into<String>) -> Self {
        self.mint_amount = amount.into();
        self
    }

    /// Mint the configured amount of `token_id` to `recipient`
    pub async fn claim(&self, token_id: &str, recipient: &str) -> Result<MintResult> {
        let recipient = parse_recipient(recipient)?;
        let token = self.catalog.resolve(token_id)?;
        if token.is_native() {
            return Err(Error::InvalidSelection(format!(
                "{} is a native asset and cannot be minted",
                token.id
            )));
        }

        let (raw, _) = base_units(self.backend.as_ref(), token, &self.mint_amount).await?;
        info!(token = token.id, recipient = %recipient, amount = %self.mint_amount, "Submitting faucet mint");

        let result = self
            .backend
            .mint(token.origin_chain, token.contract_address, recipient, raw)
            .await;
        let outcome = confirmed(result, Error::MintFailed)?;
        info!(tx = %outcome.transaction_hash, token = token.id, "Faucet mint confirmed");

        let balance = self.reader.get_token_balance(recipient, token).await;
        Ok(MintResult {
            token_balance: balance.balance,
            recipient_address: recipient,
            chain: token.origin_chain,
            transaction_hash: outcome.transaction_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;
    use crate::pricing::CurrencyConverter;
    use crate::testing::MockChain;

    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn faucet(chain: &Arc<MockChain>) -> Faucet {
        let reader = ChainReader::new(chain.clone(), CurrencyConverter::new(chain.clone()));
        Faucet::new(chain.clone(), Arc::new(TokenCatalog::testnet()), reader)
    }

    #[tokio::test]
    async fn test_claim_mints_and_rereads_balance() {
        let chain = Arc::new(MockChain::new());
        let result = faucet(&chain).claim("USDT-ARB", RECIPIENT).await.unwrap();

        assert_eq!(result.token_balance, "1000");
        assert_eq!(result.chain, SupportedChain::ArbitrumSepolia);
        assert_eq!(result.recipient_address, RECIPIENT.parse::<Address>().unwrap());
        assert_eq!(chain.count("mint"), 1);
        assert_eq!(chain.count("balanceOf"), 1);
    }

    #[tokio::test]
    async fn test_custom_amount() {
        let chain = Arc::new(MockChain::new());
        let result = faucet(&chain)
            .with_mint_amount("2.5")
            .claim("USDT-ETH", RECIPIENT)
            .await
            .unwrap();
        assert_eq!(result.token_balance, "2.5");
    }

    #[tokio::test]
    async fn test_bad_recipient_makes_no_call() {
        let chain = Arc::new(MockChain::new());
        let err = faucet(&chain).claim("USDT-ETH", "0x12").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationFailure::MalformedRecipient)
        ));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_native_and_unknown_tokens() {
        let chain = Arc::new(MockChain::new());
        let faucet = faucet(&chain);
        assert!(matches!(
            faucet.claim("ETH-ARB", RECIPIENT).await,
            Err(Error::InvalidSelection(_))
        ));
        assert!(matches!(
            faucet.claim("DOGE-ETH", RECIPIENT).await,
            Err(Error::InvalidSelection(_))
        ));
    }

    #[tokio::test]
    async fn test_reverted_mint() {
        let chain = Arc::new(MockChain::new());
        chain.revert_on("mint");
        assert!(matches!(
            faucet(&chain).claim("USDT-BASE", RECIPIENT).await,
            Err(Error::MintFailed(_))
        ));
    }
}
