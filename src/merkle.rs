//! Merkle tree over arbitrary data blocks
//!
//! Leaves are SHA-256 of each datum; internal nodes hash the concatenation
//! of their children. A level with an odd node count duplicates its last
//! element. Inclusion proofs carry one sibling hash per level plus a flag
//! telling whether that sibling sits to the right of the running hash.

use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};
use crate::types::Hash;

/// A node in the tree; leaves own no children
#[derive(Debug, Clone)]
struct MerkleNode {
    hash: Hash,
    left: Option<Box<MerkleNode>>,
    right: Option<Box<MerkleNode>>,
}

impl MerkleNode {
    fn leaf(datum: &[u8]) -> Self {
        MerkleNode {
            hash: Sha256::digest(datum).into(),
            left: None,
            right: None,
        }
    }

    fn parent(left: MerkleNode, right: MerkleNode) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(left.hash);
        hasher.update(right.hash);
        MerkleNode {
            hash: hasher.finalize().into(),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Merkle tree with owned nodes and a single root
#[derive(Debug, Clone)]
pub struct MerkleTree {
    root: MerkleNode,
}

/// One proof step: the sibling hash and whether it lies to the right
pub type ProofStep = (Hash, bool);

impl MerkleTree {
    /// Build a tree over the given data blocks; fails on empty input
    pub fn build(data: &[Vec<u8>]) -> Result<Self> {
        if data.is_empty() {
            return Err(LedgerError::InvalidStructure(
                "cannot build a merkle tree with no data".into(),
            ));
        }

        let mut nodes: Vec<MerkleNode> = data.iter().map(|d| MerkleNode::leaf(d)).collect();
        if nodes.len() % 2 != 0 {
            nodes.push(nodes[nodes.len() - 1].clone());
        }

        while nodes.len() > 1 {
            if nodes.len() % 2 != 0 {
                nodes.push(nodes[nodes.len() - 1].clone());
            }
            let mut level = Vec::with_capacity(nodes.len() / 2);
            let mut iter = nodes.into_iter();
            while let (Some(left), Some(right)) = (iter.next(), iter.next()) {
                level.push(MerkleNode::parent(left, right));
            }
            nodes = level;
        }

        Ok(MerkleTree {
            root: nodes.remove(0),
        })
    }

    /// The root hash
    pub fn root(&self) -> Hash {
        self.root.hash
    }

    /// Whether SHA-256(datum) appears in any leaf
    pub fn verify_data(&self, datum: &[u8]) -> bool {
        let hash: Hash = Sha256::digest(datum).into();
        Self::contains(&self.root, &hash)
    }

    fn contains(node: &MerkleNode, hash: &Hash) -> bool {
        if node.is_leaf() {
            return node.hash == *hash;
        }
        node.left.as_deref().is_some_and(|n| Self::contains(n, hash))
            || node.right.as_deref().is_some_and(|n| Self::contains(n, hash))
    }

    /// Generate an inclusion proof for a datum; fails if it is not present
    pub fn generate_proof(&self, datum: &[u8]) -> Result<Vec<ProofStep>> {
        let target: Hash = Sha256::digest(datum).into();
        let mut proof = Vec::new();
        if !Self::collect_proof(&self.root, &target, &mut proof) {
            return Err(LedgerError::NotFound(
                "data not found in the merkle tree".into(),
            ));
        }
        Ok(proof)
    }

    fn collect_proof(node: &MerkleNode, target: &Hash, proof: &mut Vec<ProofStep>) -> bool {
        if node.is_leaf() {
            return node.hash == *target;
        }
        // Internal nodes always carry both children.
        let (left, right) = match (&node.left, &node.right) {
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };
        if Self::collect_proof(left, target, proof) {
            proof.push((right.hash, true));
            return true;
        }
        if Self::collect_proof(right, target, proof) {
            proof.push((left.hash, false));
            return true;
        }
        false
    }

    /// Fold a proof into `data_hash` and compare against the root
    pub fn verify_proof(&self, data_hash: &Hash, proof: &[ProofStep]) -> bool {
        let mut running = *data_hash;
        for (sibling, sibling_is_right) in proof {
            let mut hasher = Sha256::new();
            if *sibling_is_right {
                hasher.update(running);
                hasher.update(sibling);
            } else {
                hasher.update(sibling);
                hasher.update(running);
            }
            running = hasher.finalize().into();
        }
        running == self.root.hash
    }
}
