use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::canonical;
use super::transaction::Transaction;

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "00";

/// Represents a block in the blockchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Position of the block in the chain, starting at 1
    pub index: u64,

    /// Timestamp when the block was sealed
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// Transactions sealed in this block
    pub transactions: Vec<Transaction>,

    /// Proof of work
    pub nonce: u64,

    /// Digest of the previous block
    pub previous_hash: String,
}

impl Block {
    /// Creates the fixed first block every node starts from
    ///
    /// The timestamp is pinned to the Unix epoch so all nodes agree on the
    /// genesis digest.
    pub fn genesis() -> Self {
        Block {
            index: 1,
            timestamp: DateTime::<Utc>::default(),
            transactions: Vec::new(),
            nonce: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Creates a sealed block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `index` - The index of the block in the chain
    /// * `transactions` - The transactions to seal
    /// * `nonce` - A nonce satisfying the proof-of-work predicate
    /// * `previous_hash` - The digest of the previous block
    pub fn new(index: u64, transactions: Vec<Transaction>, nonce: u64, previous_hash: String) -> Self {
        Block {
            index,
            timestamp: Utc::now(),
            transactions,
            nonce,
            previous_hash,
        }
    }

    /// Calculates the canonical SHA-256 digest of the block
    pub fn hash(&self) -> String {
        canonical::digest(&json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions_value(&self.transactions),
            "nonce": self.nonce,
            "previous_hash": self.previous_hash,
        }))
    }
}

/// Canonical JSON array of transactions
pub fn transactions_value(transactions: &[Transaction]) -> Value {
    Value::Array(transactions.iter().map(Transaction::to_canonical_value).collect())
}
