//! Error taxonomy for bridge, faucet and lending operations
//!
//! Contract adapters speak `eyre::Result`; the transactors translate those
//! failures into the variants below so callers can tell a rejected input
//! apart from a reverted transaction or a quote that is not ready yet.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for every core operation
#[derive(Debug, Error)]
pub enum Error {
    /// A chain or token id that is not in the registry/catalog
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// User input failed a precondition; no contract call was made
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The ERC20 approve call threw or its receipt reported failure
    #[error("approval failed: {0}")]
    ApprovalFailed(String),

    /// The bridge deposit threw or its receipt reported failure
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// A lending pool write threw or its receipt reported failure
    #[error("{action} failed: {reason}")]
    LendingFailed {
        action: LendingAction,
        reason: String,
    },

    /// The faucet mint threw or its receipt reported failure
    #[error("mint failed: {0}")]
    MintFailed(String),

    /// Payload/options/fee could not be computed yet
    #[error("fee quote unavailable: {0}")]
    QuoteUnavailable(String),

    /// The exchange-rate service could not be reached or parsed
    #[error("exchange rate unavailable: {0}")]
    PriceUnavailable(String),

    /// A read-only RPC call failed
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl Error {
    /// True for failures that happened before anything was sent to a chain
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InvalidSelection(_))
    }
}

/// One variant per user-facing precondition.
///
/// Each variant renders its own message; the UI boundary shows exactly the
/// violated one instead of a generic "invalid input".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("connect your wallet")]
    WalletNotConnected,

    #[error("select both tokens")]
    TokenNotSelected,

    #[error("enter a valid amount")]
    InvalidAmount,

    #[error("select both networks")]
    NetworkNotSelected,

    #[error("source and destination must differ")]
    SameNetwork,

    #[error("enter a recipient address")]
    MissingRecipient,

    #[error("recipient must be a 0x-prefixed 40 character hex address")]
    MalformedRecipient,

    #[error("complete the approval step first")]
    ApprovalRequired,

    #[error("approval already granted")]
    AlreadyApproved,

    #[error("transaction already completed")]
    AlreadyCompleted,

    #[error("a {0} is already in progress")]
    Pending(Phase),

    #[error("no fee quote is available for the current selection")]
    QuoteMissing,

    #[error("no outstanding borrow balance to repay")]
    NothingToRepay,
}

/// The two phases of every approve-then-act flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Approval,
    Action,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Approval => write!(f, "approval"),
            Phase::Action => write!(f, "transaction"),
        }
    }
}

/// Lending pool write operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingAction {
    Supply,
    Borrow,
    Repay,
    Withdraw,
}

impl LendingAction {
    /// Get the action as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            LendingAction::Supply => "supply",
            LendingAction::Borrow => "borrow",
            LendingAction::Repay => "repay",
            LendingAction::Withdraw => "withdraw",
        }
    }

    /// Supply and repay move tokens into the pool and need an allowance first
    pub fn requires_approval(&self) -> bool {
        matches!(self, LendingAction::Supply | LendingAction::Repay)
    }
}

impl fmt::Display for LendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_distinct() {
        let all = [
            ValidationFailure::WalletNotConnected,
            ValidationFailure::TokenNotSelected,
            ValidationFailure::InvalidAmount,
            ValidationFailure::NetworkNotSelected,
            ValidationFailure::SameNetwork,
            ValidationFailure::MissingRecipient,
            ValidationFailure::MalformedRecipient,
        ];
        let messages: std::collections::HashSet<String> =
            all.iter().map(|v| v.to_string()).collect();
        assert_eq!(messages.len(), all.len());
    }

    #[test]
    fn test_scenario_messages() {
        assert_eq!(
            ValidationFailure::InvalidAmount.to_string(),
            "enter a valid amount"
        );
        assert_eq!(
            ValidationFailure::SameNetwork.to_string(),
            "source and destination must differ"
        );
        assert_eq!(
            Error::LendingFailed {
                action: LendingAction::Repay,
                reason: "reverted".into()
            }
            .to_string(),
            "repay failed: reverted"
        );
    }

    #[test]
    fn test_validation_classification() {
        let err: Error = ValidationFailure::SameNetwork.into();
        assert!(err.is_validation());
        assert!(!Error::TransferFailed("x".into()).is_validation());
    }
}
