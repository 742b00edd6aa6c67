use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::blockchain::Block;

/// Errors that can occur while talking to a peer
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// A node's chain as served on `GET /chain`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChainSnapshot {
    /// The blocks in the chain
    pub chain: Vec<Block>,

    /// The length of the chain
    pub length: usize,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        ChainSnapshot {
            length: chain.len(),
            chain,
        }
    }

    /// Rejects snapshots whose advertised length disagrees with their content
    pub fn into_checked(self) -> Result<Vec<Block>, PeerError> {
        if self.length != self.chain.len() {
            return Err(PeerError::Malformed(format!(
                "advertised length {} but sent {} blocks",
                self.length,
                self.chain.len()
            )));
        }
        Ok(self.chain)
    }
}

/// Ordered set of peer addresses; iteration order decides reconciliation ties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSet {
    addresses: Vec<String>,
}

impl PeerSet {
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = PeerSet::default();
        set.extend(addresses);
        set
    }

    /// Adds an address unless it is already known or blank
    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        let address: String = address.into();
        let address = address.trim().trim_end_matches('/').to_string();
        if address.is_empty() || self.addresses.contains(&address) {
            return false;
        }
        self.addresses.push(address);
        true
    }

    pub fn extend<I, S>(&mut self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for address in addresses {
            self.insert(address);
        }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.addresses.clone()
    }
}

/// Outbound calls a node makes to its peers
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Fetches the peer's full chain
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError>;

    /// Asks the peer to reconcile against its own peers
    async fn notify_update(&self, peer: &str) -> Result<(), PeerError>;
}

/// `PeerClient` speaking the node's HTTP interface
#[derive(Debug, Clone)]
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Creates a client whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, PeerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpPeerClient { client })
    }

    fn url(peer: &str, path: &str) -> String {
        if peer.starts_with("http://") || peer.starts_with("https://") {
            format!("{}{}", peer, path)
        } else {
            format!("http://{}{}", peer, path)
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>, PeerError> {
        let response = self
            .client
            .get(Self::url(peer, "/chain"))
            .send()
            .await?
            .error_for_status()?;

        let snapshot: ChainSnapshot = response
            .json()
            .await
            .map_err(|e| PeerError::Malformed(e.to_string()))?;

        snapshot.into_checked()
    }

    async fn notify_update(&self, peer: &str) -> Result<(), PeerError> {
        self.client
            .get(Self::url(peer, "/update"))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_set_keeps_order_and_dedups() {
        let mut peers = PeerSet::new(["127.0.0.1:5001", "127.0.0.1:5002/"]);
        assert!(!peers.insert("127.0.0.1:5001"));
        assert!(!peers.insert("127.0.0.1:5002"));
        assert!(!peers.insert("  "));
        assert!(peers.insert("127.0.0.1:5003"));

        assert_eq!(
            peers.to_vec(),
            vec!["127.0.0.1:5001", "127.0.0.1:5002", "127.0.0.1:5003"]
        );
    }

    #[test]
    fn test_snapshot_length_mismatch_is_malformed() {
        let mut snapshot = ChainSnapshot::new(vec![Block::genesis()]);
        assert!(snapshot.clone().into_checked().is_ok());

        snapshot.length = 5;
        assert!(matches!(
            snapshot.into_checked(),
            Err(PeerError::Malformed(_))
        ));
    }

    #[test]
    fn test_url_building() {
        assert_eq!(HttpPeerClient::url("10.0.0.1:5000", "/chain"), "http://10.0.0.1:5000/chain");
        assert_eq!(HttpPeerClient::url("https://peer", "/update"), "https://peer/update");
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_an_error() {
        let client = HttpPeerClient::new(Duration::from_millis(200)).unwrap();
        // Port 1 on loopback is not served
        assert!(client.fetch_chain("127.0.0.1:1").await.is_err());
    }
}
