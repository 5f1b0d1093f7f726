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

//! Durable application state on sled. Blocks execute against a `MemStore`
//! loaded from here; their journals come back as one atomic commit.

use crate::core::state::merkle::{verify_proof, Hash32, MerkleProof, MerkleTree};
use crate::core::state::store::MemStore;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use thiserror::Error;

/// State errors.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("db open: {0}")]
    DbOpen(String),
    #[error("db io: {0}")]
    DbIo(String),
    #[error("tx conflict")]
    TxConflict,
}

/// State operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOp {
    /// Put key/value.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete key.
    Del { key: Vec<u8> },
}

/// Inclusion proof for one stored pair.
#[derive(Clone, Debug)]
pub struct KeyProof {
    /// Key.
    pub key: Vec<u8>,
    /// Value.
    pub value: Vec<u8>,
    /// Root the proof was built against.
    pub root: Hash32,
    /// Path.
    pub proof: MerkleProof,
}

/// Persistent state wrapper.
#[derive(Clone)]
pub struct PersistentState {
    db: sled::Db,
}

impl PersistentState {
    /// Open sled DB at path (directory).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let db = sled::open(path).map_err(|e| StateError::DbOpen(e.to_string()))?;
        Ok(Self { db })
    }

    /// Get value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        let v = self
            .db
            .get(key)
            .map_err(|e| StateError::DbIo(e.to_string()))?;
        Ok(v.map(|iv| iv.to_vec()))
    }

    fn sorted_pairs(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StateError> {
        // sled iterates in key order.
        self.db
            .iter()
            .map(|item| {
                item.map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(|e| StateError::DbIo(e.to_string()))
            })
            .collect()
    }

    /// Load every pair into a fresh working store.
    pub fn load(&self) -> Result<MemStore, StateError> {
        Ok(MemStore::from_pairs(self.sorted_pairs()?))
    }

    /// Atomic commit using sled transactions.
    pub fn commit_atomic(&self, ops: &[KvOp]) -> Result<(), StateError> {
        let res = self.db.transaction(|t| {
            for op in ops {
                match op {
                    KvOp::Put { key, value } => {
                        t.insert(key.as_slice(), value.as_slice())?;
                    }
                    KvOp::Del { key } => {
                        t.remove(key.as_slice())?;
                    }
                }
            }
            Ok::<(), ConflictableTransactionError<StateError>>(())
        });
        match res {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => return Err(StateError::DbIo(e.to_string())),
        }
        self.db
            .flush()
            .map_err(|e| StateError::DbIo(e.to_string()))?;
        Ok(())
    }

    /// Drain the working store's journal into the DB and return the new root.
    pub fn commit_changes(&self, working: &mut MemStore) -> Result<Hash32, StateError> {
        let ops = working.take_changes();
        if !ops.is_empty() {
            self.commit_atomic(&ops)?;
        }
        self.state_root()
    }

    /// Deterministic Merkle root over all KV pairs in DB.
    pub fn state_root(&self) -> Result<Hash32, StateError> {
        Ok(MerkleTree::from_sorted(&self.sorted_pairs()?).root())
    }

    /// Inclusion proof for a key, if present.
    pub fn prove_key(&self, key: &[u8]) -> Result<Option<KeyProof>, StateError> {
        let pairs = self.sorted_pairs()?;
        let Ok(i) = pairs.binary_search_by(|p| p.0.as_slice().cmp(key)) else {
            return Ok(None);
        };
        let tree = MerkleTree::from_sorted(&pairs);
        Ok(tree.proof(i).map(|proof| KeyProof {
            key: pairs[i].0.clone(),
            value: pairs[i].1.clone(),
            root: tree.root(),
            proof,
        }))
    }

    /// Verify a Merkle proof.
    pub fn verify_proof(root: Hash32, proof: &MerkleProof) -> bool {
        verify_proof(root, proof)
    }
}
