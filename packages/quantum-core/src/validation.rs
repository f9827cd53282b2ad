//! Submission preconditions
//!
//! Checked at the UI boundary before any RPC is issued. The address check is
//! shape-only (`^0x[a-fA-F0-9]{40}$`): no checksum, no name resolution.

use alloy::primitives::Address;

use crate::error::ValidationFailure;
use crate::state::TransferIntent;
use crate::units::is_positive_amount;

/// Shape check for a 20-byte hex address
pub fn is_valid_address(candidate: &str) -> bool {
    candidate.len() == 42
        && candidate.starts_with("0x")
        && candidate[2..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse a recipient, reporting empty and malformed input separately
pub fn parse_recipient(candidate: &str) -> Result<Address, ValidationFailure> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Err(ValidationFailure::MissingRecipient);
    }
    if !is_valid_address(candidate) {
        return Err(ValidationFailure::MalformedRecipient);
    }
    candidate
        .parse()
        .map_err(|_| ValidationFailure::MalformedRecipient)
}

/// Check every precondition for a bridge submission, in UI order
pub fn validate_transfer(
    intent: &TransferIntent,
    wallet: Option<Address>,
) -> Result<Address, ValidationFailure> {
    if wallet.is_none() {
        return Err(ValidationFailure::WalletNotConnected);
    }
    if intent.from_token.is_none() || intent.to_token.is_none() {
        return Err(ValidationFailure::TokenNotSelected);
    }
    if !is_positive_amount(&intent.amount) {
        return Err(ValidationFailure::InvalidAmount);
    }
    match (intent.from_chain, intent.to_chain) {
        (Some(from), Some(to)) if from == to => return Err(ValidationFailure::SameNetwork),
        (Some(_), Some(_)) => {}
        _ => return Err(ValidationFailure::NetworkNotSelected),
    }
    parse_recipient(&intent.recipient_address)
}

/// Check the preconditions of a lending action
pub fn validate_lending(
    token: Option<&str>,
    amount: &str,
    wallet: Option<Address>,
) -> Result<(), ValidationFailure> {
    if wallet.is_none() {
        return Err(ValidationFailure::WalletNotConnected);
    }
    if token.is_none() {
        return Err(ValidationFailure::TokenNotSelected);
    }
    if !is_positive_amount(amount) {
        return Err(ValidationFailure::InvalidAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::SupportedChain;

    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn valid_intent() -> TransferIntent {
        TransferIntent {
            amount: "10".to_string(),
            recipient_address: RECIPIENT.to_string(),
            ..TransferIntent::default()
        }
    }

    fn wallet() -> Option<Address> {
        Some(Address::repeat_byte(0x11))
    }

    #[test]
    fn test_address_shape() {
        assert!(is_valid_address(RECIPIENT));
        assert!(is_valid_address(&RECIPIENT.to_lowercase()));
        assert!(!is_valid_address("70997970C51812dc3A010C7d01b50e0d17dc79C8"));
        assert!(!is_valid_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C"));
        assert!(!is_valid_address("0x70997970C51812dc3A010C7d01b50e0d17dc79CZ"));
        assert!(!is_valid_address("0X70997970C51812dc3A010C7d01b50e0d17dc79C8"));
    }

    #[test]
    fn test_valid_intent_passes() {
        let recipient = validate_transfer(&valid_intent(), wallet()).unwrap();
        assert_eq!(recipient, RECIPIENT.parse::<Address>().unwrap());
    }

    #[test]
    fn test_each_precondition_reported_separately() {
        assert_eq!(
            validate_transfer(&valid_intent(), None),
            Err(ValidationFailure::WalletNotConnected)
        );

        let mut intent = valid_intent();
        intent.to_token = None;
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::TokenNotSelected)
        );

        let mut intent = valid_intent();
        intent.amount = "0".to_string();
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::InvalidAmount)
        );

        let mut intent = valid_intent();
        intent.from_chain = None;
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::NetworkNotSelected)
        );

        let mut intent = valid_intent();
        intent.to_chain = Some(SupportedChain::EthSepolia);
        intent.from_chain = Some(SupportedChain::EthSepolia);
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::SameNetwork)
        );

        let mut intent = valid_intent();
        intent.recipient_address = String::new();
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::MissingRecipient)
        );

        let mut intent = valid_intent();
        intent.recipient_address = "0x1234".to_string();
        assert_eq!(
            validate_transfer(&intent, wallet()),
            Err(ValidationFailure::MalformedRecipient)
        );
    }

    #[test]
    fn test_lending_preconditions() {
        assert_eq!(
            validate_lending(Some("USDT-BASE"), "5", None),
            Err(ValidationFailure::WalletNotConnected)
        );
        assert_eq!(
            validate_lending(None, "5", wallet()),
            Err(ValidationFailure::TokenNotSelected)
        );
        assert_eq!(
            validate_lending(Some("USDT-BASE"), "", wallet()),
            Err(ValidationFailure::InvalidAmount)
        );
        assert!(validate_lending(Some("USDT-BASE"), "5", wallet()).is_ok());
    }
}
