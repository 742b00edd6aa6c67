// Node module
//
// Owns the chain, the pending pool and the peer set, and orchestrates
// submission, sealing and reconciliation with peers.

pub mod peer;
pub mod reconcile;

use std::iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::blockchain::pow::PowError;
use crate::blockchain::{Block, Chain, ProofOfWork, Transaction};
use crate::config::Config;

pub use peer::{ChainSnapshot, HttpPeerClient, PeerClient, PeerError, PeerSet};

/// Errors that can occur during node operations
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Proof of work error: {0}")]
    Pow(#[from] PowError),

    #[error("Peer error: {0}")]
    Peer(#[from] PeerError),

    #[error("Mining task failed: {0}")]
    Mining(#[from] tokio::task::JoinError),

    #[error("No nonce satisfies the proof of work")]
    NoProof,
}

/// Stops the blocking nonce search when the submitting future goes away
#[derive(Default)]
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// State guarded by a single lock so sealing and reconciliation never interleave
#[derive(Debug, Default)]
struct Ledger {
    chain: Chain,
    pending: Vec<Transaction>,
}

/// A ledger node
pub struct Node {
    id: String,
    ledger: RwLock<Ledger>,
    peers: RwLock<PeerSet>,
    pow: ProofOfWork,
    client: Arc<dyn PeerClient>,
}

impl Node {
    /// Creates a node holding only the genesis block
    ///
    /// # Arguments
    ///
    /// * `pow` - The proof-of-work parameters shared with every peer
    /// * `peers` - The initial peer set
    /// * `client` - Transport used to reach peers
    pub fn new(pow: ProofOfWork, peers: PeerSet, client: Arc<dyn PeerClient>) -> Self {
        Node {
            id: Uuid::new_v4().simple().to_string(),
            ledger: RwLock::new(Ledger::default()),
            peers: RwLock::new(peers),
            pow,
            client,
        }
    }

    /// Creates a node talking HTTP to the peers named in the configuration
    pub fn from_config(config: &Config) -> Result<Self, NodeError> {
        let pow = ProofOfWork::new(config.mining.difficulty, config.mining.workers)?;
        let client = HttpPeerClient::new(Duration::from_secs(config.sync.request_timeout_secs))?;

        Ok(Self::new(pow, PeerSet::new(config.peers.iter().cloned()), Arc::new(client)))
    }

    /// Random identifier, not used in consensus
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    /// Submits a signed transaction and seals it into a new block
    ///
    /// Reconciles with peers first, then verifies the signature. A rejected
    /// transaction leaves the pool and chain untouched.
    ///
    /// # Returns
    ///
    /// `Ok(false)` when verification fails, `Ok(true)` once the block is appended
    pub async fn submit_transaction(&self, transaction: Transaction) -> Result<bool, NodeError> {
        self.reconcile().await;

        if let Err(err) = transaction.check() {
            warn!("Rejected transaction from {}: {}", transaction.sender, err);
            return Ok(false);
        }

        let block = {
            let mut ledger = self.ledger.write().await;

            // The pool is only touched once the block is sealed, so a submit
            // dropped mid-search leaves no trace
            let transactions: Vec<Transaction> = ledger
                .pending
                .iter()
                .cloned()
                .chain(iter::once(transaction))
                .collect();
            let previous_hash = ledger.chain.last_block().hash();
            let index = ledger.chain.next_index();

            // The write lock stays held while mining so no other seal can race for `index`
            let pow = self.pow.clone();
            let cancel = CancelOnDrop::default();
            let flag = Arc::clone(&cancel.0);
            let (transactions, previous_hash, nonce) = tokio::task::spawn_blocking(move || {
                let nonce = pow.seal_until(&transactions, &previous_hash, &flag);
                (transactions, previous_hash, nonce)
            })
            .await?;
            let nonce = nonce.ok_or(NodeError::NoProof)?;

            let block = ledger
                .chain
                .append(Block::new(index, transactions, nonce, previous_hash))
                .clone();
            ledger.pending.clear();
            block
        };

        info!(
            "Sealed block {} with {} transaction(s), nonce {}",
            block.index,
            block.transactions.len(),
            block.nonce
        );

        self.notify_peers().await;
        Ok(true)
    }

    /// Asks every peer to reconcile, without waiting for the outcome
    async fn notify_peers(&self) {
        for peer in self.peers.read().await.to_vec() {
            let client = Arc::clone(&self.client);
            tokio::spawn(async move {
                if let Err(err) = client.notify_update(&peer).await {
                    warn!("Failed to notify peer {}: {}", peer, err);
                }
            });
        }
    }

    /// Replaces the local chain with the longest valid chain among peers
    ///
    /// Never fails: unreachable peers and invalid chains are skipped.
    pub async fn reconcile(&self) -> bool {
        let peers = self.peers.read().await.to_vec();
        if peers.is_empty() {
            return true;
        }

        let current_len = self.ledger.read().await.chain.len();
        let candidates = reconcile::fetch_chains(self.client.as_ref(), &peers).await;

        if let Some((peer, chain)) = reconcile::longest_valid(current_len, candidates, &self.pow) {
            let mut ledger = self.ledger.write().await;
            // The local chain may have grown while peers were queried
            if chain.len() > ledger.chain.len() {
                info!(
                    "Replacing local chain of {} blocks with {} blocks from {}",
                    ledger.chain.len(),
                    chain.len(),
                    peer
                );
                ledger.chain = chain;
            }
        }

        true
    }

    /// Snapshot of the chain and its length
    pub async fn get_chain(&self) -> (Vec<Block>, usize) {
        let ledger = self.ledger.read().await;
        (ledger.chain.blocks().to_vec(), ledger.chain.len())
    }

    /// Snapshot of the transactions waiting to be sealed
    pub async fn get_pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending.clone()
    }

    /// Re-validates the local chain
    pub async fn is_valid(&self) -> bool {
        let valid = self.ledger.read().await.chain.is_valid(&self.pow);
        if !valid {
            error!("Local chain failed validation");
        }
        valid
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.to_vec()
    }

    /// Adds peers to the peer set
    ///
    /// # Returns
    ///
    /// The full peer set after registration
    pub async fn register_peers<I, S>(&self, addresses: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut peers = self.peers.write().await;
        let before = peers.len();
        peers.extend(addresses);
        if peers.len() > before {
            info!("Registered {} new peer(s)", peers.len() - before);
        }
        peers.to_vec()
    }
}

/// Reconciles with peers every `interval` until the node is dropped elsewhere
pub fn spawn_periodic_reconciliation(node: Arc<Node>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            node.reconcile().await;
        }
    })
}
