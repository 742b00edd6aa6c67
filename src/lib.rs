//! A minimal proof-of-work ledger node
//!
//! Accepts signed transactions, seals each into a block with a proof of work
//! and keeps its chain in line with peers using the longest-valid-chain rule.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod node;
