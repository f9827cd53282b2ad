//! alloy-backed implementation of the contract interfaces
//!
//! Holds one read-only HTTP provider per supported chain. Writes build a
//! wallet-filled provider for the target chain on demand, send, and wait for a
//! single confirmation.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::{debug, info};

use crate::chains::{ChainRegistry, SupportedChain};
use crate::evm::contracts::{LendingPool, QuantumBridge, ERC20};
use crate::interfaces::{
    BridgeInterface, DepositCall, LendingPoolInterface, NodeInterface, TokenInterface, TxOutcome,
};
use crate::redact::Redacted;

/// Send a contract call and wait for one confirmation
macro_rules! send_and_confirm {
    ($call:expr, $label:literal) => {{
        let pending = $call
            .send()
            .await
            .map_err(|e| eyre!("Failed to send {}: {}", $label, e))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| eyre!("Failed to get {} receipt: {}", $label, e))?;
        let outcome = TxOutcome::from_receipt(&receipt);
        info!(
            tx = %outcome.transaction_hash,
            success = outcome.success,
            "{} confirmed",
            $label
        );
        outcome
    }};
}

/// EVM gateway over every supported chain
pub struct EvmGateway {
    registry: Arc<ChainRegistry>,
    readers: HashMap<SupportedChain, RootProvider<Http<Client>>>,
    wallet: Option<EthereumWallet>,
    signer_address: Option<Address>,
}

impl EvmGateway {
    /// Read-only gateway (no connected wallet)
    pub fn new_readonly(registry: Arc<ChainRegistry>) -> Result<Self> {
        let mut readers = HashMap::new();
        for chain in SupportedChain::ALL {
            let config = registry.resolve(chain)?;
            let provider = ProviderBuilder::new().on_http(
                config
                    .rpc_endpoint
                    .parse()
                    .map_err(|e| eyre!("Invalid RPC URL for {}: {}", chain, e))?,
            );
            readers.insert(chain, provider);
        }

        info!(chains = readers.len(), "Created read-only EVM gateway");

        Ok(Self {
            registry,
            readers,
            wallet: None,
            signer_address: None,
        })
    }

    /// Gateway with a connected wallet for write operations
    pub fn new_with_signer(registry: Arc<ChainRegistry>, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key {}: {}", Redacted(private_key), e))?;
        let address = signer.address();

        let mut gateway = Self::new_readonly(registry)?;
        gateway.wallet = Some(EthereumWallet::from(signer));
        gateway.signer_address = Some(address);

        info!(address = %address, "EVM gateway wallet connected");
        Ok(gateway)
    }

    fn reader(&self, chain: SupportedChain) -> Result<&RootProvider<Http<Client>>> {
        self.readers
            .get(&chain)
            .ok_or_else(|| eyre!("No provider for chain {}", chain))
    }

    /// Wallet-filled provider for `chain`
    fn writer(&self, chain: SupportedChain) -> Result<impl Provider<Http<Client>>> {
        let wallet = self
            .wallet
            .clone()
            .ok_or_else(|| eyre!("No wallet connected"))?;
        let config = self.registry.resolve(chain)?;
        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(
                config
                    .rpc_endpoint
                    .parse()
                    .map_err(|e| eyre!("Invalid RPC URL for {}: {}", chain, e))?,
            ))
    }
}

#[async_trait]
impl TokenInterface for EvmGateway {
    async fn decimals(&self, chain: SupportedChain, token: Address) -> Result<u8> {
        let contract = ERC20::new(token, self.reader(chain)?);
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get decimals: {}", e))?;
        Ok(decimals._0)
    }

    async fn balance_of(
        &self,
        chain: SupportedChain,
        token: Address,
        owner: Address,
    ) -> Result<U256> {
        let contract = ERC20::new(token, self.reader(chain)?);
        let balance = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance: {}", e))?;
        Ok(balance._0)
    }

    async fn approve(
        &self,
        chain: SupportedChain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = ERC20::new(token, &provider);
        debug!(%chain, %token, %spender, %amount, "Sending approve");
        Ok(send_and_confirm!(contract.approve(spender, amount), "approve"))
    }

    async fn mint(
        &self,
        chain: SupportedChain,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = ERC20::new(token, &provider);
        debug!(%chain, %token, %to, %amount, "Sending mint");
        Ok(send_and_confirm!(contract.mint(to, amount), "mint"))
    }
}

#[async_trait]
impl BridgeInterface for EvmGateway {
    async fn get_message(
        &self,
        chain: SupportedChain,
        bridge: Address,
        amount: U256,
        token: Address,
        recipient: Address,
    ) -> Result<Bytes> {
        let contract = QuantumBridge::new(bridge, self.reader(chain)?);
        let result = contract
            .getMessage(amount, token, recipient)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get message: {}", e))?;
        Ok(result._0)
    }

    async fn get_receive_option(
        &self,
        chain: SupportedChain,
        bridge: Address,
        gas_limit: U256,
        value: U256,
    ) -> Result<Bytes> {
        let contract = QuantumBridge::new(bridge, self.reader(chain)?);
        let result = contract
            .getLzReceiveOption(gas_limit, value)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get receive option: {}", e))?;
        Ok(result._0)
    }

    async fn get_fee(
        &self,
        chain: SupportedChain,
        bridge: Address,
        destination_protocol_id: u32,
        payload: Bytes,
        options: Bytes,
    ) -> Result<U256> {
        let contract = QuantumBridge::new(bridge, self.reader(chain)?);
        let result = contract
            .getFee(destination_protocol_id, payload, options)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get fee: {}", e))?;
        Ok(result.fee.nativeFee)
    }

    async fn deposit(
        &self,
        chain: SupportedChain,
        bridge: Address,
        call: DepositCall,
        relay_fee: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = QuantumBridge::new(bridge, &provider);
        debug!(
            %chain,
            dst_eid = call.destination_protocol_id,
            amount = %call.amount,
            token = %call.token,
            dest_chain = %call.destination_chain_name,
            receiver = %call.recipient,
            fee = %relay_fee,
            "Sending deposit"
        );
        Ok(send_and_confirm!(
            contract
                .deposit(
                    call.destination_protocol_id,
                    call.amount,
                    call.token,
                    call.destination_chain_name,
                    call.recipient,
                )
                .value(relay_fee),
            "deposit"
        ))
    }

    async fn deposit_native(
        &self,
        chain: SupportedChain,
        bridge: Address,
        destination_protocol_id: u32,
        amount: U256,
        destination_chain_name: &str,
        value: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = QuantumBridge::new(bridge, &provider);
        debug!(%chain, dst_eid = destination_protocol_id, %amount, %value, "Sending depositNative");
        Ok(send_and_confirm!(
            contract
                .depositNative(
                    destination_protocol_id,
                    amount,
                    destination_chain_name.to_string(),
                )
                .value(value),
            "depositNative"
        ))
    }
}

#[async_trait]
impl LendingPoolInterface for EvmGateway {
    async fn supply(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = LendingPool::new(pool, &provider);
        Ok(send_and_confirm!(contract.supply(token, amount), "supply"))
    }

    async fn borrow(
        &self,
        chain: SupportedChain,
        pool: Address,
        amount: U256,
        token: Address,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = LendingPool::new(pool, &provider);
        Ok(send_and_confirm!(contract.borrow(amount, token), "borrow"))
    }

    async fn pay_debt(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = LendingPool::new(pool, &provider);
        Ok(send_and_confirm!(contract.payDebt(token, amount), "payDebt"))
    }

    async fn withdraw(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        let provider = self.writer(chain)?;
        let contract = LendingPool::new(pool, &provider);
        Ok(send_and_confirm!(contract.withdraw(token, amount), "withdraw"))
    }

    async fn interest(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        principal: U256,
    ) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .interest(token, principal)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get interest: {}", e))?;
        Ok(result._0)
    }

    async fn total_lent_usd(
        &self,
        chain: SupportedChain,
        pool: Address,
        user: Address,
    ) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getTotalAmountLentInDollars(user)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get supplied balance: {}", e))?;
        Ok(result._0)
    }

    async fn borrowed_for_token_usd(
        &self,
        chain: SupportedChain,
        pool: Address,
        user: Address,
        token: Address,
    ) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getUserTotalAmountBorrowedForTokenInDollars(user, token)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get borrowed balance: {}", e))?;
        Ok(result._0)
    }

    async fn available_to_borrow_usd(
        &self,
        chain: SupportedChain,
        pool: Address,
        user: Address,
    ) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getUserTotalAmountAvailableForBorrowInDollars(user)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get credit limit: {}", e))?;
        Ok(result._0)
    }

    async fn total_supply_usd(&self, chain: SupportedChain, pool: Address) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getTotalSupplyInDollars()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get total supply: {}", e))?;
        Ok(result._0)
    }

    async fn total_borrowed_usd(&self, chain: SupportedChain, pool: Address) -> Result<U256> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getTotalBorrowedInDollars()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get total borrowed: {}", e))?;
        Ok(result._0)
    }

    async fn whitelisted_token_names(
        &self,
        chain: SupportedChain,
        pool: Address,
    ) -> Result<Vec<String>> {
        let contract = LendingPool::new(pool, self.reader(chain)?);
        let result = contract
            .getAllWhitelistedTokenNames()
            .call()
            .await
            .map_err(|e| eyre!("Failed to get whitelisted tokens: {}", e))?;
        Ok(result._0)
    }
}

#[async_trait]
impl NodeInterface for EvmGateway {
    async fn gas_price(&self, chain: SupportedChain) -> Result<u128> {
        let price = self
            .reader(chain)?
            .get_gas_price()
            .await
            .map_err(|e| eyre!("Failed to get gas price: {}", e))?;
        Ok(price)
    }

    async fn native_balance(&self, chain: SupportedChain, owner: Address) -> Result<U256> {
        let balance = self
            .reader(chain)?
            .get_balance(owner)
            .await
            .map_err(|e| eyre!("Failed to get native balance: {}", e))?;
        Ok(balance)
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Anvil's first dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_readonly_gateway_has_no_signer() {
        let gateway = EvmGateway::new_readonly(Arc::new(ChainRegistry::testnet())).unwrap();
        assert!(gateway.signer_address().is_none());
        assert!(gateway.writer(SupportedChain::EthSepolia).is_err());
    }

    #[test]
    fn test_signer_address_derived_from_key() {
        let gateway =
            EvmGateway::new_with_signer(Arc::new(ChainRegistry::testnet()), DEV_KEY).unwrap();
        assert_eq!(
            gateway.signer_address().unwrap(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let result = EvmGateway::new_with_signer(Arc::new(ChainRegistry::testnet()), "0x1234");
        let err = result.err().unwrap().to_string();
        assert!(!err.contains("0x1234"));
    }
}
