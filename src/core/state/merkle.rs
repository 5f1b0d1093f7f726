// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Binary Merkle tree over the sorted application state.
//!
//! leaf = H( "Amunchain-App-Leaf-v1" || H(key) || H(value) )
//! node = H( "Amunchain-App-Node-v1" || left || right )
//!
//! An odd node at the end of a level is paired with itself.

use ring::digest;

/// Hash32 type.
pub type Hash32 = [u8; 32];

const LEAF_DOMAIN: &[u8] = b"Amunchain-App-Leaf-v1";
const NODE_DOMAIN: &[u8] = b"Amunchain-App-Node-v1";

/// Which side the sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Sibling is left.
    Left,
    /// Sibling is right.
    Right,
}

/// One proof step.
#[derive(Clone, Debug)]
pub struct ProofItem {
    /// Sibling side.
    pub side: Side,
    /// Sibling hash.
    pub sibling: Hash32,
}

/// Merkle inclusion proof.
#[derive(Clone, Debug)]
pub struct MerkleProof {
    /// Leaf hash.
    pub leaf: Hash32,
    /// Path items from leaf to root.
    pub path: Vec<ProofItem>,
}

fn h(parts: &[&[u8]]) -> Hash32 {
    let mut ctx = digest::Context::new(&digest::SHA256);
    for p in parts {
        ctx.update(p);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// Leaf hash for one pair.
pub fn hash_leaf(key: &[u8], value: &[u8]) -> Hash32 {
    h(&[LEAF_DOMAIN, &h(&[key]), &h(&[value])])
}

fn hash_node(left: &Hash32, right: &Hash32) -> Hash32 {
    h(&[NODE_DOMAIN, left, right])
}

/// Every level of the tree, leaves first.
pub struct MerkleTree {
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build from pairs already sorted by key.
    pub fn from_sorted(pairs: &[(Vec<u8>, Vec<u8>)]) -> Self {
        let mut levels = vec![pairs
            .iter()
            .map(|(k, v)| hash_leaf(k, v))
            .collect::<Vec<_>>()];
        while levels.last().map_or(0, |l| l.len()) > 1 {
            let prev = &levels[levels.len() - 1];
            let next = prev
                .chunks(2)
                .map(|c| hash_node(&c[0], c.get(1).unwrap_or(&c[0])))
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    /// Root; all zeroes for an empty tree.
    pub fn root(&self) -> Hash32 {
        self.levels
            .last()
            .and_then(|l| l.first().copied())
            .unwrap_or([0u8; 32])
    }

    /// Proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        let leaf = *self.levels.first()?.get(index)?;
        let mut idx = index;
        let mut path = Vec::with_capacity(self.levels.len());
        for level in &self.levels[..self.levels.len() - 1] {
            let (side, sib) = if idx % 2 == 1 {
                (Side::Left, idx - 1)
            } else {
                (Side::Right, idx + 1)
            };
            let sibling = *level.get(sib).unwrap_or(&level[idx]);
            path.push(ProofItem { side, sibling });
            idx /= 2;
        }
        Some(MerkleProof { leaf, path })
    }
}

/// Root over sorted pairs.
pub fn merkle_root_sorted(pairs: &[(Vec<u8>, Vec<u8>)]) -> Hash32 {
    MerkleTree::from_sorted(pairs).root()
}

/// Verify proof against root.
pub fn verify_proof(root: Hash32, proof: &MerkleProof) -> bool {
    let cur = proof.path.iter().fold(proof.leaf, |cur, item| match item.side {
        Side::Left => hash_node(&item.sibling, &cur),
        Side::Right => hash_node(&cur, &item.sibling),
    });
    cur == root
}
