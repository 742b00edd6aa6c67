// Blockchain module
//
// This module contains the consensus core:
// - Canonical encoding and hashing
// - Transaction and block structures
// - Cryptography utilities
// - Proof of work algorithm
// - Chain and chain validation

pub mod block;
pub mod canonical;
pub mod chain;
pub mod crypto;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{is_valid_chain, Chain};
pub use crypto::{Address, DigitalSignature, Wallet};
pub use pow::ProofOfWork;
pub use transaction::Transaction;
