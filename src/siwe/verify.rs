use alloy_core::{
    sol,
    sol_types::{SolCall, SolValue},
};
use alloy_primitives::{Address, Bytes, FixedBytes, Signature, eip191_hash_message};
use serde::{Deserialize, Serialize};

use crate::{
    concepts::ContractReader,
    siwe::{SiweError, SiweMessage, parse, validate},
    types::{WalletAuthSuccess, WalletAuthVersion},
};

sol! {
    /// Safe owner check used for owner-signed (v1) messages.
    function isOwner(address owner) external view returns (bool);

    /// EIP-1271 contract signature check used for Safe-signed (v2) messages.
    function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
}

/// Return value of `isValidSignature` for a valid signature.
pub const EIP1271_MAGIC_VALUE: FixedBytes<4> = FixedBytes([0x16, 0x26, 0xba, 0x7e]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAuthVerification {
    pub is_valid: bool,
    pub siwe_message_data: SiweMessage,
}

/// Verify a wallet auth response on the backend.
///
/// The message is parsed and validated against the issued `nonce` (and optionally
/// `statement` and `request_id`), then the signature is checked on-chain according to the
/// response version:
///
/// - v1: the signer is recovered from the EIP-191 signature and must own the Safe at
///   `address`. A signer equal to `address` itself is accepted without a chain call.
/// - v2: the Safe at `address` must accept the signature through EIP-1271.
pub async fn verify_siwe_message<R: ContractReader>(
    payload: &WalletAuthSuccess,
    nonce: &str,
    statement: Option<&str>,
    request_id: Option<&str>,
    reader: &R,
) -> Result<WalletAuthVerification, SiweError> {
    if cfg!(all(target_arch = "wasm32", target_os = "unknown")) {
        return Err(SiweError::ClientSideVerification);
    }

    let message = parse(&payload.message)?;
    validate(&message, nonce, statement, request_id)?;

    let address: Address = payload
        .address
        .parse()
        .map_err(|_| SiweError::InvalidAddress(payload.address.clone()))?;
    let signature = hex::decode(payload.signature.trim_start_matches("0x"))?;

    match payload.version {
        WalletAuthVersion::V1 => {
            verify_owner_signature(&payload.message, address, &signature, reader).await?
        }
        WalletAuthVersion::V2 => {
            verify_contract_signature(&payload.message, address, signature, reader).await?
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("Verified v{} SIWE message for {}", payload.version, address);

    Ok(WalletAuthVerification {
        is_valid: true,
        siwe_message_data: message,
    })
}

async fn verify_owner_signature<R: ContractReader>(
    message: &str,
    address: Address,
    signature: &[u8],
    reader: &R,
) -> Result<(), SiweError> {
    let signature = Signature::try_from(signature)?;
    let signer = signature.recover_address_from_msg(message)?;
    if signer == address {
        return Ok(());
    }

    let data = isOwnerCall { owner: signer }.abi_encode();
    let output = reader
        .call(address, Bytes::from(data))
        .await
        .map_err(|e| SiweError::ContractCall(e.to_string()))?;
    let is_owner =
        bool::abi_decode(&output).map_err(|e| SiweError::ContractCall(e.to_string()))?;

    if !is_owner {
        return Err(SiweError::InvalidOwner);
    }
    Ok(())
}

async fn verify_contract_signature<R: ContractReader>(
    message: &str,
    address: Address,
    signature: Vec<u8>,
    reader: &R,
) -> Result<(), SiweError> {
    let data = isValidSignatureCall {
        hash: eip191_hash_message(message),
        signature: Bytes::from(signature),
    }
    .abi_encode();
    let output = reader
        .call(address, Bytes::from(data))
        .await
        .map_err(|e| SiweError::ContractCall(e.to_string()))?;
    let magic = FixedBytes::<4>::abi_decode(&output)
        .map_err(|e| SiweError::ContractCall(e.to_string()))?;

    if magic != EIP1271_MAGIC_VALUE {
        return Err(SiweError::VerificationFailed);
    }
    Ok(())
}
