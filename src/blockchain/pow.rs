use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use thiserror::Error;

use super::block::transactions_value;
use super::canonical;
use super::transaction::Transaction;

/// Leading hex zeros required when nothing else is configured
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Nonces each worker scans before the pool compares results
const CHUNK_SIZE: u64 = 4096;

const LAST_CHUNK: u64 = u64::MAX / CHUNK_SIZE;

/// Errors that can occur while setting up the miner
#[derive(Debug, Error)]
pub enum PowError {
    #[error("Difficulty must be between 1 and 64, got {0}")]
    InvalidDifficulty(usize),

    #[error("Failed to build mining thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Proof-of-work predicate and nonce search
#[derive(Clone)]
pub struct ProofOfWork {
    difficulty: usize,
    target: String,
    pool: Option<Arc<ThreadPool>>,
}

impl fmt::Debug for ProofOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofOfWork")
            .field("difficulty", &self.difficulty)
            .field("workers", &self.workers())
            .finish()
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::sequential(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    /// Creates a miner
    ///
    /// # Arguments
    ///
    /// * `difficulty` - Number of leading `'0'` hex digits a guess must have
    /// * `workers` - Search threads; `0` or `1` searches on the calling thread
    pub fn new(difficulty: usize, workers: usize) -> Result<Self, PowError> {
        if difficulty == 0 || difficulty > 64 {
            return Err(PowError::InvalidDifficulty(difficulty));
        }

        let pool = if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("miner-{}", i))
                .build()?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(ProofOfWork {
            difficulty,
            target: "0".repeat(difficulty),
            pool,
        })
    }

    fn sequential(difficulty: usize) -> Self {
        ProofOfWork {
            difficulty,
            target: "0".repeat(difficulty),
            pool: None,
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, |pool| pool.current_num_threads())
    }

    /// Checks whether `nonce` solves the puzzle for the given batch and parent
    pub fn is_valid_proof(&self, transactions: &[Transaction], previous_hash: &str, nonce: u64) -> bool {
        let prefix = guess_prefix(transactions, previous_hash);
        self.check(&prefix, nonce)
    }

    fn check(&self, prefix: &str, nonce: u64) -> bool {
        let guess = format!("{}{}", prefix, nonce);
        canonical::digest_bytes(guess.as_bytes()).starts_with(&self.target)
    }

    /// Finds the smallest nonce satisfying the predicate
    ///
    /// The parallel search returns the same nonce as the sequential one.
    ///
    /// # Returns
    ///
    /// `None` only if no nonce below `u64::MAX` solves the puzzle
    pub fn seal(&self, transactions: &[Transaction], previous_hash: &str) -> Option<u64> {
        self.seal_until(transactions, previous_hash, &AtomicBool::new(false))
    }

    /// Like [`ProofOfWork::seal`], but gives up with `None` once `cancel` is set
    ///
    /// The flag is polled between chunks of `CHUNK_SIZE` nonces.
    pub fn seal_until(&self, transactions: &[Transaction], previous_hash: &str, cancel: &AtomicBool) -> Option<u64> {
        let prefix = guess_prefix(transactions, previous_hash);

        match &self.pool {
            Some(pool) => pool.install(|| self.parallel_search(&prefix, pool.current_num_threads() as u64, cancel)),
            None => {
                for chunk in 0..=LAST_CHUNK {
                    if cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    if let Some(nonce) = self.scan_chunk(&prefix, chunk) {
                        return Some(nonce);
                    }
                }
                None
            }
        }
    }

    fn scan_chunk(&self, prefix: &str, chunk: u64) -> Option<u64> {
        let start = chunk.checked_mul(CHUNK_SIZE)?;
        (start..start.saturating_add(CHUNK_SIZE)).find(|nonce| self.check(prefix, *nonce))
    }

    fn parallel_search(&self, prefix: &str, workers: u64, cancel: &AtomicBool) -> Option<u64> {
        let mut first_chunk = 0u64;
        while first_chunk <= LAST_CHUNK {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }

            // Every chunk of a round is scanned to its first hit, so the
            // minimum over the round is the smallest nonce overall.
            let last = first_chunk.saturating_add(workers).min(LAST_CHUNK + 1);
            let found = (first_chunk..last)
                .into_par_iter()
                .filter_map(|chunk| self.scan_chunk(prefix, chunk))
                .min();

            if found.is_some() {
                return found;
            }
            first_chunk = last;
        }
        None
    }
}

/// Everything in the guess that precedes the nonce
fn guess_prefix(transactions: &[Transaction], previous_hash: &str) -> String {
    format!("{}{}", canonical::encode(&transactions_value(transactions)), previous_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Wallet;

    fn sample_transactions() -> Vec<Transaction> {
        let wallet = Wallet::new();
        vec![
            Transaction::signed(&wallet, "42"),
            Transaction::signed(&wallet, "43"),
        ]
    }

    #[test]
    fn test_sealed_nonce_is_valid_and_smallest() {
        let pow = ProofOfWork::default();
        let transactions = sample_transactions();

        let nonce = pow.seal(&transactions, "abc").unwrap();

        assert!(pow.is_valid_proof(&transactions, "abc", nonce));
        assert!((0..nonce).all(|n| !pow.is_valid_proof(&transactions, "abc", n)));
    }

    #[test]
    fn test_proof_bound_to_inputs() {
        let pow = ProofOfWork::default();
        let transactions = sample_transactions();
        let nonce = pow.seal(&transactions, "abc").unwrap();

        let other = pow.seal(&transactions, "abd").unwrap();
        assert!(pow.is_valid_proof(&transactions, "abd", other));
        if nonce != other {
            assert!(!pow.is_valid_proof(&transactions, "abd", nonce));
        }
    }

    #[test]
    fn test_empty_batch_can_be_sealed() {
        let pow = ProofOfWork::default();
        let nonce = pow.seal(&[], "00").unwrap();
        assert!(pow.is_valid_proof(&[], "00", nonce));
    }

    #[test]
    fn test_parallel_search_matches_sequential() {
        let sequential = ProofOfWork::new(3, 1).unwrap();
        let parallel = ProofOfWork::new(3, 4).unwrap();
        let transactions = sample_transactions();

        assert_eq!(parallel.workers(), 4);
        assert_eq!(
            sequential.seal(&transactions, "ff"),
            parallel.seal(&transactions, "ff")
        );
    }

    #[test]
    fn test_cancelled_search_gives_up() {
        let cancel = AtomicBool::new(true);
        let transactions = sample_transactions();

        // Difficulty 64 is never met in practice, only the flag ends the search
        let sequential = ProofOfWork::new(64, 1).unwrap();
        assert_eq!(sequential.seal_until(&transactions, "ff", &cancel), None);

        let parallel = ProofOfWork::new(64, 2).unwrap();
        assert_eq!(parallel.seal_until(&transactions, "ff", &cancel), None);
    }

    #[test]
    fn test_invalid_difficulty_rejected() {
        assert!(matches!(
            ProofOfWork::new(0, 1),
            Err(PowError::InvalidDifficulty(0))
        ));
        assert!(ProofOfWork::new(65, 1).is_err());
    }
}
