//! EVM chain support
//!
//! - `contracts` - bridge, lending pool and ERC20 bindings (alloy `sol!`)
//! - `gateway` - [`EvmGateway`], the alloy implementation of the contract interfaces

pub mod contracts;
pub mod gateway;

pub use contracts::{LendingPool, QuantumBridge, ERC20};
pub use gateway::EvmGateway;
