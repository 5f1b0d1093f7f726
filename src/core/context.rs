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

//! Execution context handed to every keeper call.
//!
//! A `Context` owns a write overlay over its parent store plus an event buffer.
//! `cache_context` forks a child; the child's writes and events reach the parent
//! only through `write`. Dropping a child, including while unwinding, discards it.

use crate::core::state::store::{prefix_end, CacheStore, KvStore};
use crate::core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Flat gas charged per read.
pub const GAS_READ_FLAT: u64 = 1000;
/// Gas per byte read.
pub const GAS_READ_PER_BYTE: u64 = 3;
/// Flat gas charged per write.
pub const GAS_WRITE_FLAT: u64 = 2000;
/// Gas per byte written.
pub const GAS_WRITE_PER_BYTE: u64 = 30;
/// Gas charged per delete.
pub const GAS_DELETE: u64 = 1000;
/// Gas charged per iterated entry.
pub const GAS_ITER_NEXT: u64 = 30;

/// Block header fields visible to modules.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain identifier.
    pub chain_id: String,
    /// Height.
    pub height: i64,
    /// Block time.
    pub time: Timestamp,
}

/// Consensus parameters relevant to modules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Permitted validator public key types.
    pub validator_pub_key_types: Vec<String>,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            validator_pub_key_types: vec!["ed25519".to_string()],
        }
    }
}

/// Panic payload raised when a gas meter is exhausted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutOfGas {
    /// Operation that crossed the limit.
    pub descriptor: &'static str,
    /// Limit.
    pub limit: u64,
    /// Consumed after the charge.
    pub consumed: u64,
}

impl fmt::Display for OutOfGas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "out of gas in location: {}; gasWanted: {}, gasUsed: {}",
            self.descriptor, self.limit, self.consumed
        )
    }
}

/// Panic payload that stops the chain. It is never turned into a failed
/// transaction or a recovered hook error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainHalt(pub String);

impl fmt::Display for ChainHalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unwind with a [`ChainHalt`] carrying `msg`.
pub fn halt(msg: impl Into<String>) -> ! {
    panic::panic_any(ChainHalt(msg.into()))
}

/// Gas meter. Clones share one counter.
#[derive(Clone, Debug)]
pub struct GasMeter {
    limit: Option<u64>,
    consumed: Rc<Cell<u64>>,
}

impl GasMeter {
    /// Meter that never runs out.
    pub fn infinite() -> Self {
        Self {
            limit: None,
            consumed: Rc::new(Cell::new(0)),
        }
    }

    /// Meter with a hard limit.
    pub fn with_limit(limit: u64) -> Self {
        Self {
            limit: Some(limit),
            consumed: Rc::new(Cell::new(0)),
        }
    }

    /// Gas consumed so far.
    pub fn consumed(&self) -> u64 {
        self.consumed.get()
    }

    /// Limit, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Charge gas; panics with `OutOfGas` past the limit.
    pub fn consume(&self, amount: u64, descriptor: &'static str) {
        let total = self.consumed.get().saturating_add(amount);
        self.consumed.set(total);
        if let Some(limit) = self.limit {
            if total > limit {
                panic::panic_any(OutOfGas {
                    descriptor,
                    limit,
                    consumed: total,
                });
            }
        }
    }
}

/// Typed event with string attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type.
    pub kind: String,
    /// Ordered attributes.
    pub attributes: Vec<(String, String)>,
}

impl Event {
    /// New event without attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Module namespace inside the shared store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreKey {
    prefix: Vec<u8>,
}

impl StoreKey {
    /// Namespace `name/`.
    pub fn new(name: &str) -> Self {
        let mut prefix = name.as_bytes().to_vec();
        prefix.push(b'/');
        Self { prefix }
    }

    fn full(&self, key: &[u8]) -> Vec<u8> {
        let mut k = Vec::with_capacity(self.prefix.len() + key.len());
        k.extend_from_slice(&self.prefix);
        k.extend_from_slice(key);
        k
    }

    /// Namespace prefix bytes.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

/// Execution context.
pub struct Context<'a> {
    header: BlockHeader,
    consensus: ConsensusParams,
    store: CacheStore<'a>,
    events: Vec<Event>,
    parent_events: Option<&'a mut Vec<Event>>,
    gas: GasMeter,
}

impl<'a> Context<'a> {
    /// Root context over `store` with an infinite gas meter.
    pub fn new(
        header: BlockHeader,
        consensus: ConsensusParams,
        store: &'a mut dyn KvStore,
    ) -> Self {
        Self {
            header,
            consensus,
            store: CacheStore::new(store),
            events: Vec::new(),
            parent_events: None,
            gas: GasMeter::infinite(),
        }
    }

    /// Block header.
    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// Block height.
    pub fn block_height(&self) -> i64 {
        self.header.height
    }

    /// Block time.
    pub fn block_time(&self) -> Timestamp {
        self.header.time
    }

    /// Chain id.
    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    /// Consensus params.
    pub fn consensus_params(&self) -> &ConsensusParams {
        &self.consensus
    }

    /// Replace the header (used by the block loop between blocks).
    pub fn set_header(&mut self, header: BlockHeader) {
        self.header = header;
    }

    /// Replace the gas meter.
    pub fn with_gas_meter(mut self, gas: GasMeter) -> Self {
        self.gas = gas;
        self
    }

    /// Gas meter.
    pub fn gas_meter(&self) -> &GasMeter {
        &self.gas
    }

    /// Fork a discardable child sharing this context's gas meter.
    pub fn cache_context(&mut self) -> Context<'_> {
        Context {
            header: self.header.clone(),
            consensus: self.consensus.clone(),
            store: CacheStore::new(&mut self.store),
            events: Vec::new(),
            parent_events: Some(&mut self.events),
            gas: self.gas.clone(),
        }
    }

    /// Commit buffered writes and events into the parent.
    pub fn write(mut self) {
        self.store.flush();
        if let Some(parent) = self.parent_events.take() {
            parent.append(&mut self.events);
        }
    }

    /// Commit writes and hand back the events (root contexts).
    pub fn finish(mut self) -> Vec<Event> {
        self.store.flush();
        let mut events = std::mem::take(&mut self.events);
        if let Some(parent) = self.parent_events.take() {
            parent.append(&mut events);
            return Vec::new();
        }
        events
    }

    /// Emit an event.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events emitted on this context so far.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get `key` from the module namespace.
    pub fn kv_get(&self, sk: &StoreKey, key: &[u8]) -> Option<Vec<u8>> {
        self.gas.consume(GAS_READ_FLAT, "ReadFlat");
        let v = self.store.get(&sk.full(key));
        if let Some(bytes) = &v {
            self.gas
                .consume(GAS_READ_PER_BYTE * bytes.len() as u64, "ReadPerByte");
        }
        v
    }

    /// True if `key` exists in the module namespace.
    pub fn kv_has(&self, sk: &StoreKey, key: &[u8]) -> bool {
        self.gas.consume(GAS_READ_FLAT, "HasFlat");
        self.store.get(&sk.full(key)).is_some()
    }

    /// Set `key` in the module namespace.
    pub fn kv_set(&mut self, sk: &StoreKey, key: &[u8], value: Vec<u8>) {
        self.gas.consume(GAS_WRITE_FLAT, "WriteFlat");
        self.gas.consume(
            GAS_WRITE_PER_BYTE * (key.len() + value.len()) as u64,
            "WritePerByte",
        );
        self.store.set(sk.full(key), value);
    }

    /// Delete `key` from the module namespace.
    pub fn kv_delete(&mut self, sk: &StoreKey, key: &[u8]) {
        self.gas.consume(GAS_DELETE, "Delete");
        self.store.delete(&sk.full(key));
    }

    /// Pairs under `prefix` in ascending order; returned keys exclude the namespace.
    pub fn kv_prefix(&self, sk: &StoreKey, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let start = sk.full(prefix);
        let end = prefix_end(&start);
        self.kv_scan(sk, &start, end.as_deref())
    }

    /// Pairs with `start <= key < end` inside the namespace; keys exclude the namespace.
    pub fn kv_range(&self, sk: &StoreKey, start: &[u8], end: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let s = sk.full(start);
        let e = sk.full(end);
        self.kv_scan(sk, &s, Some(&e))
    }

    fn kv_scan(
        &self,
        sk: &StoreKey,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let strip = sk.prefix.len();
        let pairs = self.store.range(start, end);
        self.gas
            .consume(GAS_ITER_NEXT * pairs.len() as u64, "IterNextFlat");
        pairs
            .into_iter()
            .map(|(mut k, v)| (k.split_off(strip), v))
            .collect()
    }
}

/// Render a panic payload for logs and errors.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(oog) = payload.downcast_ref::<OutOfGas>() {
        return oog.to_string();
    }
    if let Some(h) = payload.downcast_ref::<ChainHalt>() {
        return h.to_string();
    }
    "unknown panic".to_string()
}

/// Run `f` in a cache context. The child is written back only if `f` returns `Ok`.
///
/// A panic inside `f` is converted into an error, except `OutOfGas` and
/// `ChainHalt`, which keep unwinding to the transaction boundary.
pub fn apply_func_if_no_error<F>(ctx: &mut Context<'_>, f: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut Context<'_>) -> anyhow::Result<()>,
{
    let mut cache = ctx.cache_context();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut cache)));
    match outcome {
        Ok(Ok(())) => {
            cache.write();
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(payload) => {
            if payload.is::<OutOfGas>() || payload.is::<ChainHalt>() {
                panic::resume_unwind(payload);
            }
            Err(anyhow::anyhow!("recovered panic: {}", panic_message(payload.as_ref())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::store::MemStore;

    fn header() -> BlockHeader {
        BlockHeader {
            chain_id: "test".into(),
            height: 1,
            time: Timestamp::from_secs(1),
        }
    }

    #[test]
    fn child_writes_reach_parent_only_on_write() {
        let sk = StoreKey::new("m");
        let mut base = MemStore::new();
        let mut ctx = Context::new(header(), ConsensusParams::default(), &mut base);
        {
            let mut child = ctx.cache_context();
            child.kv_set(&sk, b"a", vec![1]);
            child.emit(Event::new("dropped"));
        }
        assert!(ctx.kv_get(&sk, b"a").is_none());
        {
            let mut child = ctx.cache_context();
            child.kv_set(&sk, b"a", vec![2]);
            child.emit(Event::new("kept"));
            child.write();
        }
        assert_eq!(ctx.kv_get(&sk, b"a"), Some(vec![2]));
        assert_eq!(ctx.events().len(), 1);
        let events = ctx.finish();
        assert_eq!(events[0].kind, "kept");
        assert_eq!(base.get(b"m/a"), Some(vec![2]));
    }

    #[test]
    fn isolated_panic_is_discarded() {
        let sk = StoreKey::new("m");
        let mut base = MemStore::new();
        let mut ctx = Context::new(header(), ConsensusParams::default(), &mut base);
        let res = apply_func_if_no_error(&mut ctx, |c| {
            c.kv_set(&sk, b"x", vec![9]);
            panic!("boom");
        });
        assert!(res.unwrap_err().to_string().contains("boom"));
        assert!(ctx.kv_get(&sk, b"x").is_none());
    }

    #[test]
    fn out_of_gas_keeps_unwinding() {
        let sk = StoreKey::new("m");
        let mut base = MemStore::new();
        let mut ctx = Context::new(header(), ConsensusParams::default(), &mut base)
            .with_gas_meter(GasMeter::with_limit(10));
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = apply_func_if_no_error(&mut ctx, |c| {
                c.kv_set(&sk, b"x", vec![9]);
                Ok(())
            });
        }));
        let payload = caught.unwrap_err();
        assert!(payload.is::<OutOfGas>());
    }

    #[test]
    fn chain_halt_keeps_unwinding() {
        let mut base = MemStore::new();
        let mut ctx = Context::new(header(), ConsensusParams::default(), &mut base);
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = apply_func_if_no_error(&mut ctx, |_| halt("supply mismatch"));
        }));
        let payload = caught.unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "supply mismatch");
        assert!(payload.is::<ChainHalt>());
    }
}
