use futures::future::join_all;
use log::{debug, warn};

use crate::blockchain::{Block, Chain, ProofOfWork};

use super::peer::PeerClient;

/// Fetches every peer's chain concurrently
///
/// Results keep the order of `peers`. Unreachable peers and malformed
/// responses are logged and dropped.
pub async fn fetch_chains(client: &dyn PeerClient, peers: &[String]) -> Vec<(String, Vec<Block>)> {
    let responses = join_all(peers.iter().map(|peer| client.fetch_chain(peer))).await;

    peers
        .iter()
        .zip(responses)
        .filter_map(|(peer, response)| match response {
            Ok(chain) => Some((peer.clone(), chain)),
            Err(err) => {
                warn!("Skipping peer {}: {}", peer, err);
                None
            }
        })
        .collect()
}

/// Applies the longest-valid-chain rule
///
/// A candidate wins when it is strictly longer than the best seen so far
/// (starting at `current_len`) and passes validation. On equal lengths the
/// earlier candidate is kept.
pub fn longest_valid(
    current_len: usize,
    candidates: Vec<(String, Vec<Block>)>,
    pow: &ProofOfWork,
) -> Option<(String, Chain)> {
    let mut best: Option<(String, Chain)> = None;
    let mut max_length = current_len;

    for (peer, blocks) in candidates {
        let length = blocks.len();
        if length <= max_length {
            debug!("Peer {} has {} blocks, not longer than {}", peer, length, max_length);
            continue;
        }

        match Chain::from_blocks(blocks, pow) {
            Some(chain) => {
                max_length = length;
                best = Some((peer, chain));
            }
            None => warn!("Discarding invalid chain of {} blocks from {}", length, peer),
        }
    }

    best
}
