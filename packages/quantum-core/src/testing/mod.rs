//! Testing utilities
//!
//! - `mock_chain` - in-memory implementation of every contract interface,
//!   with call recording and revert/RPC-failure injection

pub mod mock_chain;

pub use mock_chain::*;
