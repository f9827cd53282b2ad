//! Token helpers shared by the bridge, lending and faucet transactors

use alloy::primitives::{Address, U256};
use tracing::{info, warn};

use crate::catalog::TokenDescriptor;
use crate::error::{Error, Result};
use crate::interfaces::{ChainBackend, TxOutcome};
use crate::units::{to_base_units, NATIVE_DECIMALS};

/// Decimals of `token`, read from the contract (18 for the native asset)
pub(crate) async fn token_decimals(
    backend: &dyn ChainBackend,
    token: &TokenDescriptor,
) -> eyre::Result<u8> {
    if token.is_native() {
        return Ok(NATIVE_DECIMALS);
    }
    backend
        .decimals(token.origin_chain, token.contract_address)
        .await
}

/// Human-readable `amount` of `token` in base units, using the token's decimals
pub(crate) async fn base_units(
    backend: &dyn ChainBackend,
    token: &TokenDescriptor,
    amount: &str,
) -> Result<(U256, u8)> {
    let decimals = token_decimals(backend, token)
        .await
        .map_err(|e| Error::Rpc(format!("decimals of {}: {}", token.id, e)))?;
    Ok((to_base_units(amount, decimals)?, decimals))
}

/// Map a confirmed write to `Ok` only if its receipt reports success
pub(crate) fn confirmed(
    result: eyre::Result<TxOutcome>,
    on_failure: impl FnOnce(String) -> Error,
) -> Result<TxOutcome> {
    match result {
        Ok(outcome) if outcome.success => Ok(outcome),
        Ok(outcome) => Err(on_failure(format!(
            "transaction {} reverted",
            outcome.transaction_hash
        ))),
        Err(e) => Err(on_failure(e.to_string())),
    }
}

/// Approve `spender` to pull `amount` (human-readable) of `token`
pub(crate) async fn approve_spend(
    backend: &dyn ChainBackend,
    token: &TokenDescriptor,
    spender: Address,
    amount: &str,
) -> Result<TxOutcome> {
    if token.is_native() {
        return Err(Error::InvalidSelection(format!(
            "{} is a native asset and cannot be approved",
            token.id
        )));
    }

    let (raw, _) = base_units(backend, token, amount).await?;
    info!(
        token = token.id,
        spender = %spender,
        amount = %raw,
        "Submitting approval"
    );

    let result = backend
        .approve(token.origin_chain, token.contract_address, spender, raw)
        .await;
    let outcome = confirmed(result, Error::ApprovalFailed);
    match &outcome {
        Ok(o) => info!(tx = %o.transaction_hash, token = token.id, "Approval confirmed"),
        Err(e) => warn!(token = token.id, error = %e, "Approval failed"),
    }
    outcome
}
