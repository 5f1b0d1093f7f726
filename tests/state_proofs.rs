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

use amunchain_modules::core::state::persistent_state::{KvOp, PersistentState};
use amunchain_modules::core::state::store::{KvStore, MemStore};

fn put(k: &[u8], v: &[u8]) -> KvOp {
    KvOp::Put {
        key: k.to_vec(),
        value: v.to_vec(),
    }
}

#[test]
fn state_root_and_proof() {
    let dir = tempfile::tempdir().unwrap();
    let st = PersistentState::open(dir.path()).unwrap();

    st.commit_atomic(&[put(b"a", b"1"), put(b"b", b"2"), put(b"c", b"3")])
        .unwrap();

    let root = st.state_root().unwrap();
    let got = st.prove_key(b"b").unwrap().unwrap();
    assert_eq!(got.value, b"2");
    assert_eq!(root, got.root);
    assert!(PersistentState::verify_proof(root, &got.proof));
    assert!(st.prove_key(b"zz").unwrap().is_none());
}

#[test]
fn deletes_change_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let st = PersistentState::open(dir.path()).unwrap();
    st.commit_atomic(&[put(b"a", b"1"), put(b"b", b"2")]).unwrap();
    let before = st.state_root().unwrap();

    st.commit_atomic(&[KvOp::Del { key: b"b".to_vec() }]).unwrap();
    assert_ne!(before, st.state_root().unwrap());
    assert_eq!(st.get(b"b").unwrap(), None);
}

#[test]
fn working_set_changes_commit_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let st = PersistentState::open(dir.path()).unwrap();

    let mut working = MemStore::new();
    working.set(b"staking/x".to_vec(), b"1".to_vec());
    working.set(b"bank/y".to_vec(), b"2".to_vec());
    let root = st.commit_changes(&mut working).unwrap();
    assert_eq!(root, st.state_root().unwrap());
    drop(st);

    let reopened = PersistentState::open(dir.path()).unwrap();
    assert_eq!(reopened.state_root().unwrap(), root);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.get(b"bank/y"), Some(b"2".to_vec()));
    assert_eq!(loaded.len(), 2);
}
