use log::debug;

use super::block::Block;
use super::pow::ProofOfWork;
use super::transaction::Transaction;

/// Append-only, hash-linked sequence of blocks, always starting at genesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    /// Creates a chain holding only the genesis block
    pub fn new() -> Self {
        Chain {
            blocks: vec![Block::genesis()],
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> &Block {
        // Never empty: constructed with genesis and only replaced by validated chains
        &self.blocks[self.blocks.len() - 1]
    }

    /// Seals `transactions` on top of the current tip and appends the block
    ///
    /// # Returns
    ///
    /// The newly appended block, or `None` when no proof was found
    pub fn seal(&mut self, pow: &ProofOfWork, transactions: Vec<Transaction>) -> Option<&Block> {
        let previous_hash = self.last_block().hash();
        let nonce = pow.seal(&transactions, &previous_hash)?;
        Some(self.append(Block::new(self.next_index(), transactions, nonce, previous_hash)))
    }

    pub fn next_index(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    /// Appends an already sealed block
    pub fn append(&mut self, block: Block) -> &Block {
        debug_assert_eq!(block.previous_hash, self.last_block().hash());
        self.blocks.push(block);
        self.last_block()
    }

    /// Builds a chain from a candidate received from elsewhere
    ///
    /// # Returns
    ///
    /// `None` when the candidate fails validation
    pub fn from_blocks(candidate: Vec<Block>, pow: &ProofOfWork) -> Option<Self> {
        if is_valid_chain(&candidate, pow) {
            Some(Chain { blocks: candidate })
        } else {
            None
        }
    }

    pub fn is_valid(&self, pow: &ProofOfWork) -> bool {
        is_valid_chain(&self.blocks, pow)
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}

/// Validates an arbitrary candidate chain
///
/// The first block is trusted as genesis. Every later block must point at the
/// digest of its predecessor, carry a nonce solving the puzzle for its
/// transactions, and contain only correctly signed transactions. Blocks are
/// re-hashed from their typed fields, never from the bytes a peer sent.
pub fn is_valid_chain(chain: &[Block], pow: &ProofOfWork) -> bool {
    let Some(mut previous) = chain.first() else {
        return false;
    };

    for block in &chain[1..] {
        if block.previous_hash != previous.hash() {
            debug!("Block {} does not link to its predecessor", block.index);
            return false;
        }

        if !pow.is_valid_proof(&block.transactions, &block.previous_hash, block.nonce) {
            debug!("Block {} carries an invalid proof of work", block.index);
            return false;
        }

        if let Some(tx) = block.transactions.iter().find(|tx| !tx.is_valid()) {
            debug!("Block {} contains a badly signed transaction from {}", block.index, tx.sender);
            return false;
        }

        previous = block;
    }

    true
}
