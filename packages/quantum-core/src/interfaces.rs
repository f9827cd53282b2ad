//! Contract and service interfaces consumed by the core
//!
//! Every chain interaction goes through one of these traits. The production
//! implementation is [`crate::evm::EvmGateway`]; tests use
//! `testing::MockChain`.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionReceipt;
use async_trait::async_trait;
use eyre::Result;

use crate::chains::SupportedChain;

/// Outcome of a state-changing call after one confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub transaction_hash: B256,
    /// Receipt status: true iff the transaction did not revert
    pub success: bool,
}

impl TxOutcome {
    pub fn from_receipt(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            success: receipt.status(),
        }
    }
}

/// Arguments of the bridge's ERC20 `deposit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositCall {
    pub destination_protocol_id: u32,
    pub amount: U256,
    pub token: Address,
    pub destination_chain_name: String,
    pub recipient: Address,
}

/// ERC20 token contract
#[async_trait]
pub trait TokenInterface: Send + Sync {
    async fn decimals(&self, chain: SupportedChain, token: Address) -> Result<u8>;

    async fn balance_of(&self, chain: SupportedChain, token: Address, owner: Address)
        -> Result<U256>;

    /// Signed by the connected wallet
    async fn approve(
        &self,
        chain: SupportedChain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome>;

    /// Test-token faucet mint, signed by the connected wallet
    async fn mint(
        &self,
        chain: SupportedChain,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxOutcome>;
}

/// Cross-chain bridge contract on an origin chain
#[async_trait]
pub trait BridgeInterface: Send + Sync {
    /// Serialized cross-chain message for a transfer
    async fn get_message(
        &self,
        chain: SupportedChain,
        bridge: Address,
        amount: U256,
        token: Address,
        recipient: Address,
    ) -> Result<Bytes>;

    /// Relay execution options for a gas-limit/value pair
    async fn get_receive_option(
        &self,
        chain: SupportedChain,
        bridge: Address,
        gas_limit: U256,
        value: U256,
    ) -> Result<Bytes>;

    /// Native relay fee required to deliver `payload`
    async fn get_fee(
        &self,
        chain: SupportedChain,
        bridge: Address,
        destination_protocol_id: u32,
        payload: Bytes,
        options: Bytes,
    ) -> Result<U256>;

    /// ERC20 deposit, paying `relay_fee` as the transaction value
    async fn deposit(
        &self,
        chain: SupportedChain,
        bridge: Address,
        call: DepositCall,
        relay_fee: U256,
    ) -> Result<TxOutcome>;

    /// Native-asset deposit, paying `value` (amount plus relay fee)
    async fn deposit_native(
        &self,
        chain: SupportedChain,
        bridge: Address,
        destination_protocol_id: u32,
        amount: U256,
        destination_chain_name: &str,
        value: U256,
    ) -> Result<TxOutcome>;
}

/// Lending pool contract. Dollar-denominated reads are 18-decimal fixed point.
#[async_trait]
pub trait LendingPoolInterface: Send + Sync {
    async fn supply(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome>;

    /// Note the argument order: amount first, unlike every other pool write
    async fn borrow(
        &self,
        chain: SupportedChain,
        pool: Address,
        amount: U256,
        token: Address,
    ) -> Result<TxOutcome>;

    async fn pay_debt(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome>;

    async fn withdraw(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome>;

    /// Interest accrued on `principal`, in token base units
    async fn interest(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        principal: U256,
    ) -> Result<U256>;

    async fn total_lent_usd(&self, chain: SupportedChain, pool: Address, user: Address)
        -> Result<U256>;

    async fn borrowed_for_token_usd(
        &self,
        chain: SupportedChain,
        pool: Address,
        user: Address,
        token: Address,
    ) -> Result<U256>;

    async fn available_to_borrow_usd(
        &self,
        chain: SupportedChain,
        pool: Address,
        user: Address,
    ) -> Result<U256>;

    async fn total_supply_usd(&self, chain: SupportedChain, pool: Address) -> Result<U256>;

    async fn total_borrowed_usd(&self, chain: SupportedChain, pool: Address) -> Result<U256>;

    async fn whitelisted_token_names(
        &self,
        chain: SupportedChain,
        pool: Address,
    ) -> Result<Vec<String>>;
}

/// Node-level reads that are not tied to a contract
#[async_trait]
pub trait NodeInterface: Send + Sync {
    /// Current gas price in wei
    async fn gas_price(&self, chain: SupportedChain) -> Result<u128>;

    /// Native-asset balance in wei
    async fn native_balance(&self, chain: SupportedChain, owner: Address) -> Result<U256>;

    /// Address of the connected signer, if any
    fn signer_address(&self) -> Option<Address>;
}

/// External exchange-rate service
#[async_trait]
pub trait RateSource: Send + Sync {
    /// USD value of one unit of `symbol`
    async fn usd_rate(&self, symbol: &str) -> Result<f64>;
}

/// Everything a transactor or reader needs from the chain side
pub trait ChainBackend:
    TokenInterface + BridgeInterface + LendingPoolInterface + NodeInterface
{
}

impl<T> ChainBackend for T where
    T: TokenInterface + BridgeInterface + LendingPoolInterface + NodeInterface
{
}
