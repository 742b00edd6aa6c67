use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use utoipa::ToSchema;

use super::canonical;
use super::crypto::{verify_signature, Address, CryptoError, DigitalSignature, Wallet};

/// Errors that can occur during transaction operations
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

/// A signed value transfer
///
/// The signature covers the canonical encoding of `{sender, value}` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Sender's public key
    pub sender: Address,

    /// Opaque payload
    pub value: String,

    /// Signature over the sender and value
    pub signature: DigitalSignature,
}

impl Transaction {
    /// Wraps an externally signed transaction, no verification is performed
    pub fn new(sender: Address, value: impl Into<String>, signature: DigitalSignature) -> Self {
        Transaction {
            sender,
            value: value.into(),
            signature,
        }
    }

    /// Builds and signs a transaction on behalf of the wallet owner
    pub fn signed(wallet: &Wallet, value: impl Into<String>) -> Self {
        let sender = wallet.address().clone();
        let value = value.into();
        let signature = wallet.sign(&Self::signing_message(&sender, &value));

        Transaction {
            sender,
            value,
            signature,
        }
    }

    /// The exact bytes a sender signs
    pub fn signing_message(sender: &Address, value: &str) -> Vec<u8> {
        canonical::encode(&json!({
            "sender": sender.0,
            "value": value,
        }))
        .into_bytes()
    }

    /// Verifies the signature against the sender's public key
    ///
    /// # Returns
    ///
    /// `Ok(false)` for a well-formed signature that does not match, an error
    /// when the key or signature cannot be decoded
    pub fn verify_signature(&self) -> Result<bool, TransactionError> {
        let public_key = self.sender.to_public_key()?;
        let message = Self::signing_message(&self.sender, &self.value);

        Ok(verify_signature(&message, &self.signature, &public_key)?)
    }

    /// Checks the signature, treating malformed keys and signatures as a failed check
    pub fn check(&self) -> Result<(), TransactionError> {
        if self.verify_signature()? {
            Ok(())
        } else {
            Err(TransactionError::InvalidSignature)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }

    /// Canonical JSON form used for block hashing and the proof-of-work guess
    pub fn to_canonical_value(&self) -> Value {
        json!({
            "sender": self.sender.0,
            "value": self.value,
            "signature": self.signature.0,
        })
    }
}
