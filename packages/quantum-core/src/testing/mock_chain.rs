//! In-memory chain for exercising the transactors without a node
//!
//! `MockChain` implements every contract interface against a small ledger:
//! ERC20 balances and allowances, native balances, and one lending pool whose
//! dollar reads price every token at $1. Each call is recorded so tests can
//! assert on exactly which contract calls were (or were not) made.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};

use crate::catalog::TokenCatalog;
use crate::chains::SupportedChain;
use crate::interfaces::{
    BridgeInterface, DepositCall, LendingPoolInterface, NodeInterface, RateSource, TokenInterface,
    TxOutcome,
};

/// Anvil's first dev account, used as the connected wallet
pub const MOCK_WALLET: Address = Address::new([
    0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79, 0xcf,
    0xff, 0xb9, 0x22, 0x66,
]);

/// Relay fee returned by `getFee` unless overridden (0.001 native)
pub const DEFAULT_RELAY_FEE: u128 = 1_000_000_000_000_000;

/// Gas price returned unless overridden (1.5 gwei)
pub const DEFAULT_GAS_PRICE: u128 = 1_500_000_000;

/// Interest charged by the mock pool, in basis points of the principal
pub const DEFAULT_INTEREST_BPS: u64 = 500;

/// A contract call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Decimals {
        chain: SupportedChain,
        token: Address,
    },
    BalanceOf {
        chain: SupportedChain,
        token: Address,
        owner: Address,
    },
    Approve {
        chain: SupportedChain,
        token: Address,
        spender: Address,
        amount: U256,
    },
    Mint {
        chain: SupportedChain,
        token: Address,
        to: Address,
        amount: U256,
    },
    GetMessage {
        chain: SupportedChain,
        amount: U256,
        token: Address,
        recipient: Address,
    },
    GetReceiveOption {
        chain: SupportedChain,
        gas_limit: U256,
        value: U256,
    },
    GetFee {
        chain: SupportedChain,
        destination_protocol_id: u32,
    },
    Deposit {
        chain: SupportedChain,
        bridge: Address,
        call: DepositCall,
        value: U256,
    },
    DepositNative {
        chain: SupportedChain,
        destination_protocol_id: u32,
        amount: U256,
        destination_chain_name: String,
        value: U256,
    },
    Supply {
        token: Address,
        amount: U256,
    },
    Borrow {
        amount: U256,
        token: Address,
    },
    PayDebt {
        token: Address,
        amount: U256,
    },
    Withdraw {
        token: Address,
        amount: U256,
    },
    Interest {
        token: Address,
        principal: U256,
    },
    PoolRead(&'static str),
    GasPrice {
        chain: SupportedChain,
    },
    NativeBalance {
        chain: SupportedChain,
        owner: Address,
    },
    Rate {
        symbol: String,
    },
}

impl MockCall {
    /// Contract-level method name of the call
    pub fn method(&self) -> &'static str {
        match self {
            MockCall::Decimals { .. } => "decimals",
            MockCall::BalanceOf { .. } => "balanceOf",
            MockCall::Approve { .. } => "approve",
            MockCall::Mint { .. } => "mint",
            MockCall::GetMessage { .. } => "getMessage",
            MockCall::GetReceiveOption { .. } => "getLzReceiveOption",
            MockCall::GetFee { .. } => "getFee",
            MockCall::Deposit { .. } => "deposit",
            MockCall::DepositNative { .. } => "depositNative",
            MockCall::Supply { .. } => "supply",
            MockCall::Borrow { .. } => "borrow",
            MockCall::PayDebt { .. } => "payDebt",
            MockCall::Withdraw { .. } => "withdraw",
            MockCall::Interest { .. } => "interest",
            MockCall::PoolRead(name) => *name,
            MockCall::GasPrice { .. } => "gasPrice",
            MockCall::NativeBalance { .. } => "nativeBalance",
            MockCall::Rate { .. } => "rate",
        }
    }

    /// True for calls that would be signed and broadcast
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockCall::Approve { .. }
                | MockCall::Mint { .. }
                | MockCall::Deposit { .. }
                | MockCall::DepositNative { .. }
                | MockCall::Supply { .. }
                | MockCall::Borrow { .. }
                | MockCall::PayDebt { .. }
                | MockCall::Withdraw { .. }
        )
    }
}

#[derive(Default)]
struct Ledger {
    decimals: HashMap<Address, u8>,
    balances: HashMap<(SupportedChain, Address, Address), U256>,
    allowances: HashMap<(SupportedChain, Address, Address, Address), U256>,
    native: HashMap<(SupportedChain, Address), U256>,
    lent_usd: HashMap<Address, U256>,
    borrowed_usd: HashMap<(Address, Address), U256>,
    whitelisted: Vec<String>,
    rates: HashMap<String, f64>,
    relay_fee: U256,
    gas_price: u128,
    interest_bps: u64,
    calls: Vec<MockCall>,
    reverting: HashSet<&'static str>,
    failing: HashSet<&'static str>,
    offline: bool,
    tx_count: u64,
}

/// In-memory implementation of every chain interface
pub struct MockChain {
    ledger: Mutex<Ledger>,
    signer: Option<Address>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChain {
    /// Mock with [`MOCK_WALLET`] connected and catalog decimals preloaded
    /// (6 for USDT, 18 otherwise)
    pub fn new() -> Self {
        let mut ledger = Ledger {
            relay_fee: U256::from(DEFAULT_RELAY_FEE),
            gas_price: DEFAULT_GAS_PRICE,
            interest_bps: DEFAULT_INTEREST_BPS,
            whitelisted: vec!["USDT".to_string()],
            ..Default::default()
        };
        for token in TokenCatalog::testnet().all() {
            if !token.is_native() {
                let decimals = if token.symbol == "USDT" { 6 } else { 18 };
                ledger.decimals.insert(token.contract_address, decimals);
            }
        }
        ledger.rates.insert("ETH".to_string(), 2500.0);
        ledger.rates.insert("ARB".to_string(), 0.5);

        Self {
            ledger: Mutex::new(ledger),
            signer: Some(MOCK_WALLET),
        }
    }

    /// Mock without a connected wallet
    pub fn disconnected() -> Self {
        Self {
            signer: None,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    pub fn set_decimals(&self, token: Address, decimals: u8) {
        self.lock().decimals.insert(token, decimals);
    }

    pub fn set_balance(&self, chain: SupportedChain, token: Address, owner: Address, raw: U256) {
        self.lock().balances.insert((chain, token, owner), raw);
    }

    pub fn set_native_balance(&self, chain: SupportedChain, owner: Address, raw: U256) {
        self.lock().native.insert((chain, owner), raw);
    }

    pub fn set_relay_fee(&self, raw: U256) {
        self.lock().relay_fee = raw;
    }

    pub fn set_gas_price(&self, wei: u128) {
        self.lock().gas_price = wei;
    }

    pub fn set_rate(&self, symbol: &str, rate: f64) {
        self.lock().rates.insert(symbol.to_string(), rate);
    }

    pub fn set_lent_usd(&self, user: Address, usd: U256) {
        self.lock().lent_usd.insert(user, usd);
    }

    pub fn set_borrowed_usd(&self, user: Address, token: Address, usd: U256) {
        self.lock().borrowed_usd.insert((user, token), usd);
    }

    pub fn set_whitelisted(&self, names: &[&str]) {
        self.lock().whitelisted = names.iter().map(|n| n.to_string()).collect();
    }

    /// Make every future call to `method` confirm with a failed receipt
    pub fn revert_on(&self, method: &'static str) {
        self.lock().reverting.insert(method);
    }

    /// Make every future call to `method` return an RPC error
    pub fn fail_on(&self, method: &'static str) {
        self.lock().failing.insert(method);
    }

    /// Undo `revert_on`/`fail_on` for `method`
    pub fn heal(&self, method: &'static str) {
        let mut ledger = self.lock();
        ledger.reverting.remove(method);
        ledger.failing.remove(method);
    }

    /// Make every call fail as if the endpoint were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls to `method`
    pub fn count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    pub fn writes(&self) -> Vec<MockCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn balance(&self, chain: SupportedChain, token: Address, owner: Address) -> U256 {
        self.lock()
            .balances
            .get(&(chain, token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn allowance(
        &self,
        chain: SupportedChain,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> U256 {
        self.lock()
            .allowances
            .get(&(chain, token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn borrowed_usd(&self, user: Address, token: Address) -> U256 {
        self.lock()
            .borrowed_usd
            .get(&(user, token))
            .copied()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Record a read and apply offline/failure toggles
    fn read(&self, call: MockCall) -> Result<MutexGuard<'_, Ledger>> {
        let mut ledger = self.lock();
        let method = call.method();
        ledger.calls.push(call);
        if ledger.offline {
            return Err(eyre!("error sending request: connection refused"));
        }
        if ledger.failing.contains(method) {
            return Err(eyre!("{} failed: server returned an error", method));
        }
        Ok(ledger)
    }

    /// Record a write, then run `apply` against the ledger unless it reverts
    fn write<F>(&self, call: MockCall, apply: F) -> Result<TxOutcome>
    where
        F: FnOnce(&mut Ledger, Address) -> Result<()>,
    {
        let signer = self.signer.ok_or_else(|| eyre!("No wallet connected"))?;
        let method = call.method();
        let mut ledger = self.read(call)?;

        ledger.tx_count += 1;
        let transaction_hash = B256::from(U256::from(ledger.tx_count).to_be_bytes::<32>());

        if ledger.reverting.contains(method) {
            return Ok(TxOutcome {
                transaction_hash,
                success: false,
            });
        }

        apply(&mut *ledger, signer)?;
        Ok(TxOutcome {
            transaction_hash,
            success: true,
        })
    }

    fn decimals_of(ledger: &Ledger, token: Address) -> u8 {
        ledger.decimals.get(&token).copied().unwrap_or(18)
    }

    /// Dollar value of `amount` raw units at $1 per token, 18-decimal fixed point
    fn to_usd(ledger: &Ledger, token: Address, amount: U256) -> U256 {
        let decimals = Self::decimals_of(ledger, token);
        if decimals <= 18 {
            amount * U256::from(10u64).pow(U256::from(18 - decimals))
        } else {
            amount / U256::from(10u64).pow(U256::from(decimals - 18))
        }
    }

    fn debit(
        ledger: &mut Ledger,
        key: (SupportedChain, Address, Address),
        amount: U256,
    ) -> Result<()> {
        let balance = ledger.balances.entry(key).or_default();
        *balance = balance
            .checked_sub(amount)
            .ok_or_else(|| eyre!("execution reverted: ERC20: transfer amount exceeds balance"))?;
        Ok(())
    }

    fn spend_allowance(
        ledger: &mut Ledger,
        key: (SupportedChain, Address, Address, Address),
        amount: U256,
    ) -> Result<()> {
        let allowance = ledger.allowances.entry(key).or_default();
        *allowance = allowance
            .checked_sub(amount)
            .ok_or_else(|| eyre!("execution reverted: ERC20: insufficient allowance"))?;
        Ok(())
    }

    fn pad(address: Address) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(address.as_slice());
        word
    }
}

/// Pool address used by tests
pub const MOCK_POOL: Address = Address::new([0x99; 20]);

#[async_trait]
impl TokenInterface for MockChain {
    async fn decimals(&self, chain: SupportedChain, token: Address) -> Result<u8> {
        let ledger = self.read(MockCall::Decimals { chain, token })?;
        Ok(Self::decimals_of(&ledger, token))
    }

    async fn balance_of(
        &self,
        chain: SupportedChain,
        token: Address,
        owner: Address,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::BalanceOf {
            chain,
            token,
            owner,
        })?;
        Ok(ledger
            .balances
            .get(&(chain, token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn approve(
        &self,
        chain: SupportedChain,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        self.write(
            MockCall::Approve {
                chain,
                token,
                spender,
                amount,
            },
            |ledger, owner| {
                ledger
                    .allowances
                    .insert((chain, token, owner, spender), amount);
                Ok(())
            },
        )
    }

    async fn mint(
        &self,
        chain: SupportedChain,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        self.write(
            MockCall::Mint {
                chain,
                token,
                to,
                amount,
            },
            |ledger, _| {
                *ledger.balances.entry((chain, token, to)).or_default() += amount;
                Ok(())
            },
        )
    }
}

#[async_trait]
impl BridgeInterface for MockChain {
    async fn get_message(
        &self,
        chain: SupportedChain,
        _bridge: Address,
        amount: U256,
        token: Address,
        recipient: Address,
    ) -> Result<Bytes> {
        self.read(MockCall::GetMessage {
            chain,
            amount,
            token,
            recipient,
        })?;
        let mut payload = Vec::with_capacity(96);
        payload.extend_from_slice(&amount.to_be_bytes::<32>());
        payload.extend_from_slice(&Self::pad(token));
        payload.extend_from_slice(&Self::pad(recipient));
        Ok(Bytes::from(payload))
    }

    async fn get_receive_option(
        &self,
        chain: SupportedChain,
        _bridge: Address,
        gas_limit: U256,
        value: U256,
    ) -> Result<Bytes> {
        self.read(MockCall::GetReceiveOption {
            chain,
            gas_limit,
            value,
        })?;
        // type-3 options header followed by the executor gas/value words
        let mut options = vec![0x00, 0x03];
        options.extend_from_slice(&gas_limit.to_be_bytes::<32>()[16..]);
        options.extend_from_slice(&value.to_be_bytes::<32>()[16..]);
        Ok(Bytes::from(options))
    }

    async fn get_fee(
        &self,
        chain: SupportedChain,
        _bridge: Address,
        destination_protocol_id: u32,
        _payload: Bytes,
        _options: Bytes,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::GetFee {
            chain,
            destination_protocol_id,
        })?;
        Ok(ledger.relay_fee)
    }

    async fn deposit(
        &self,
        chain: SupportedChain,
        bridge: Address,
        call: DepositCall,
        relay_fee: U256,
    ) -> Result<TxOutcome> {
        let (token, amount) = (call.token, call.amount);
        self.write(
            MockCall::Deposit {
                chain,
                bridge,
                call,
                value: relay_fee,
            },
            |ledger, owner| {
                if relay_fee < ledger.relay_fee {
                    return Err(eyre!("execution reverted: insufficient relay fee"));
                }
                Self::spend_allowance(ledger, (chain, token, owner, bridge), amount)?;
                Self::debit(ledger, (chain, token, owner), amount)?;
                let native = ledger.native.entry((chain, owner)).or_default();
                *native = native.saturating_sub(relay_fee);
                Ok(())
            },
        )
    }

    async fn deposit_native(
        &self,
        chain: SupportedChain,
        _bridge: Address,
        destination_protocol_id: u32,
        amount: U256,
        destination_chain_name: &str,
        value: U256,
    ) -> Result<TxOutcome> {
        self.write(
            MockCall::DepositNative {
                chain,
                destination_protocol_id,
                amount,
                destination_chain_name: destination_chain_name.to_string(),
                value,
            },
            |ledger, owner| {
                let native = ledger.native.entry((chain, owner)).or_default();
                *native = native
                    .checked_sub(value)
                    .ok_or_else(|| eyre!("insufficient funds for gas * price + value"))?;
                Ok(())
            },
        )
    }
}

#[async_trait]
impl LendingPoolInterface for MockChain {
    async fn supply(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        self.write(MockCall::Supply { token, amount }, |ledger, owner| {
            Self::spend_allowance(ledger, (chain, token, owner, pool), amount)?;
            Self::debit(ledger, (chain, token, owner), amount)?;
            let usd = Self::to_usd(ledger, token, amount);
            *ledger.lent_usd.entry(owner).or_default() += usd;
            Ok(())
        })
    }

    async fn borrow(
        &self,
        chain: SupportedChain,
        _pool: Address,
        amount: U256,
        token: Address,
    ) -> Result<TxOutcome> {
        self.write(MockCall::Borrow { amount, token }, |ledger, owner| {
            let usd = Self::to_usd(ledger, token, amount);
            *ledger.borrowed_usd.entry((owner, token)).or_default() += usd;
            *ledger.balances.entry((chain, token, owner)).or_default() += amount;
            Ok(())
        })
    }

    async fn pay_debt(
        &self,
        chain: SupportedChain,
        pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        self.write(MockCall::PayDebt { token, amount }, |ledger, owner| {
            let interest = amount * U256::from(ledger.interest_bps) / U256::from(10_000u64);
            let total = amount + interest;
            Self::spend_allowance(ledger, (chain, token, owner, pool), total)?;
            Self::debit(ledger, (chain, token, owner), total)?;
            let usd = Self::to_usd(ledger, token, amount);
            let debt = ledger.borrowed_usd.entry((owner, token)).or_default();
            *debt = debt.saturating_sub(usd);
            Ok(())
        })
    }

    async fn withdraw(
        &self,
        chain: SupportedChain,
        _pool: Address,
        token: Address,
        amount: U256,
    ) -> Result<TxOutcome> {
        self.write(MockCall::Withdraw { token, amount }, |ledger, owner| {
            let usd = Self::to_usd(ledger, token, amount);
            let lent = ledger.lent_usd.entry(owner).or_default();
            *lent = lent
                .checked_sub(usd)
                .ok_or_else(|| eyre!("execution reverted: withdraw exceeds supplied amount"))?;
            *ledger.balances.entry((chain, token, owner)).or_default() += amount;
            Ok(())
        })
    }

    async fn interest(
        &self,
        _chain: SupportedChain,
        _pool: Address,
        token: Address,
        principal: U256,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::Interest { token, principal })?;
        Ok(principal * U256::from(ledger.interest_bps) / U256::from(10_000u64))
    }

    async fn total_lent_usd(
        &self,
        _chain: SupportedChain,
        _pool: Address,
        user: Address,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::PoolRead("getTotalAmountLentInDollars"))?;
        Ok(ledger.lent_usd.get(&user).copied().unwrap_or_default())
    }

    async fn borrowed_for_token_usd(
        &self,
        _chain: SupportedChain,
        _pool: Address,
        user: Address,
        token: Address,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::PoolRead(
            "getUserTotalAmountBorrowedForTokenInDollars",
        ))?;
        Ok(ledger
            .borrowed_usd
            .get(&(user, token))
            .copied()
            .unwrap_or_default())
    }

    async fn available_to_borrow_usd(
        &self,
        _chain: SupportedChain,
        _pool: Address,
        user: Address,
    ) -> Result<U256> {
        let ledger = self.read(MockCall::PoolRead(
            "getUserTotalAmountAvailableForBorrowInDollars",
        ))?;
        let lent = ledger.lent_usd.get(&user).copied().unwrap_or_default();
        let borrowed: U256 = ledger
            .borrowed_usd
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|(_, v)| *v)
            .fold(U256::ZERO, |acc, v| acc + v);
        let limit = lent * U256::from(80u64) / U256::from(100u64);
        Ok(limit.saturating_sub(borrowed))
    }

    async fn total_supply_usd(&self, _chain: SupportedChain, _pool: Address) -> Result<U256> {
        let ledger = self.read(MockCall::PoolRead("getTotalSupplyInDollars"))?;
        Ok(ledger
            .lent_usd
            .values()
            .fold(U256::ZERO, |acc, v| acc + *v))
    }

    async fn total_borrowed_usd(&self, _chain: SupportedChain, _pool: Address) -> Result<U256> {
        let ledger = self.read(MockCall::PoolRead("getTotalBorrowedInDollars"))?;
        Ok(ledger
            .borrowed_usd
            .values()
            .fold(U256::ZERO, |acc, v| acc + *v))
    }

    async fn whitelisted_token_names(
        &self,
        _chain: SupportedChain,
        _pool: Address,
    ) -> Result<Vec<String>> {
        let ledger = self.read(MockCall::PoolRead("getAllWhitelistedTokenNames"))?;
        Ok(ledger.whitelisted.clone())
    }
}

#[async_trait]
impl NodeInterface for MockChain {
    async fn gas_price(&self, chain: SupportedChain) -> Result<u128> {
        let ledger = self.read(MockCall::GasPrice { chain })?;
        Ok(ledger.gas_price)
    }

    async fn native_balance(&self, chain: SupportedChain, owner: Address) -> Result<U256> {
        let ledger = self.read(MockCall::NativeBalance { chain, owner })?;
        Ok(ledger.native.get(&(chain, owner)).copied().unwrap_or_default())
    }

    fn signer_address(&self) -> Option<Address> {
        self.signer
    }
}

#[async_trait]
impl RateSource for MockChain {
    async fn usd_rate(&self, symbol: &str) -> Result<f64> {
        let ledger = self.read(MockCall::Rate {
            symbol: symbol.to_string(),
        })?;
        ledger
            .rates
            .get(symbol)
            .copied()
            .ok_or_else(|| eyre!("No USDT rate for {}", symbol))
    }
}
