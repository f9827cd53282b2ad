//! Quantum Core: cross-chain bridge, faucet and lending client library
//!
//! This crate holds everything behind the Quantum Bridge screens:
//!
//! - **Registry / Catalog** - supported chains and bridgeable tokens
//! - **Pricing** - native amount to USD conversion for fee display
//! - **Reader** - balances, gas price, lending pool figures
//! - **Bridge** - relay fee quote, approve, deposit
//! - **Lending** - supply, borrow, repay, withdraw and the repay quote
//! - **Faucet** - test-token mint
//! - **State / Session** - the reactive selection and the approve-then-act
//!   drivers the front end calls into
//! - **EVM** - alloy contract bindings and the gateway implementing the
//!   contract interfaces
//!
//! ## Feature Flags
//!
//! - `testing` - export [`testing::MockChain`], an in-memory chain

mod approval;
pub mod bridge;
pub mod catalog;
pub mod chains;
pub mod error;
pub mod evm;
pub mod faucet;
pub mod flow;
pub mod interfaces;
pub mod lending;
pub mod pricing;
pub mod reader;
pub mod redact;
pub mod session;
pub mod state;
pub mod throttle;
pub mod units;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::{BridgeTransactor, FeeQuote, RELAY_GAS_LIMIT, RELAY_VALUE};
pub use catalog::{TokenCatalog, TokenDescriptor};
pub use chains::{ChainConfig, ChainRegistry, SupportedChain};
pub use error::{Error, LendingAction, Phase, Result, ValidationFailure};
pub use evm::EvmGateway;
pub use faucet::{Faucet, MintResult};
pub use flow::{FlowStage, NextStep, PhaseState, TwoPhaseFlow};
pub use interfaces::{
    BridgeInterface, ChainBackend, LendingPoolInterface, NodeInterface, RateSource,
    TokenInterface, TxOutcome,
};
pub use lending::{LendingTransactor, RepayQuote};
pub use pricing::{CoinbaseRates, CurrencyConverter};
pub use reader::{ChainReader, GasPrice, MarketTotals, PoolBalances, TokenBalance};
pub use session::{BridgeSession, LendingSession};
pub use state::{Selection, SelectionState, TransferIntent};
pub use throttle::Cooldown;
