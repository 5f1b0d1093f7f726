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

//! Epoch boundary listeners.
//!
//! Unlike staking hooks, a failing epoch listener never fails the block: each
//! call runs in its own cache context, a failure is logged and counted, and the
//! remaining listeners still run.

use crate::core::context::{apply_func_if_no_error, Context};
use prometheus::IntCounter;
use std::sync::Arc;
use tracing::error;

/// Epoch boundary listener. Both methods default to no-ops.
#[allow(unused_variables)]
pub trait EpochHooks: Send + Sync {
    /// Epoch `epoch_number` of `identifier` just ended.
    fn after_epoch_end(
        &self,
        ctx: &mut Context<'_>,
        identifier: &str,
        epoch_number: i64,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// Epoch `epoch_number` of `identifier` is starting.
    fn before_epoch_start(
        &self,
        ctx: &mut Context<'_>,
        identifier: &str,
        epoch_number: i64,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered, isolated fan-out over listeners.
#[derive(Clone, Default)]
pub struct MultiEpochHooks {
    hooks: Vec<Arc<dyn EpochHooks>>,
    errors: Option<IntCounter>,
}

impl MultiEpochHooks {
    /// Listeners in call order.
    pub fn new(hooks: Vec<Arc<dyn EpochHooks>>) -> Self {
        Self { hooks, errors: None }
    }

    /// Count listener failures on `counter`.
    pub fn with_error_counter(mut self, counter: IntCounter) -> Self {
        self.errors = Some(counter);
        self
    }

    fn run<F>(&self, ctx: &mut Context<'_>, which: &str, identifier: &str, f: F)
    where
        F: Fn(&dyn EpochHooks, &mut Context<'_>) -> anyhow::Result<()>,
    {
        for h in &self.hooks {
            if let Err(e) = apply_func_if_no_error(ctx, |c| f(h.as_ref(), c)) {
                if let Some(c) = &self.errors {
                    c.inc();
                }
                error!(
                    module = "x/epochs",
                    hook = which,
                    epoch = identifier,
                    error = %e,
                    "error in proceeding epoch hook"
                );
            }
        }
    }

    /// Fan `after_epoch_end` out to every listener.
    pub fn after_epoch_end(&self, ctx: &mut Context<'_>, identifier: &str, epoch_number: i64) {
        self.run(ctx, "after_epoch_end", identifier, |h, c| {
            h.after_epoch_end(c, identifier, epoch_number)
        });
    }

    /// Fan `before_epoch_start` out to every listener.
    pub fn before_epoch_start(&self, ctx: &mut Context<'_>, identifier: &str, epoch_number: i64) {
        self.run(ctx, "before_epoch_start", identifier, |h, c| {
            h.before_epoch_start(c, identifier, epoch_number)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{BlockHeader, ConsensusParams, StoreKey};
    use crate::core::state::store::MemStore;
    use crate::core::types::Timestamp;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct Refuses;

    impl EpochHooks for Refuses {
        fn after_epoch_end(&self, ctx: &mut Context<'_>, _: &str, n: i64) -> anyhow::Result<()> {
            ctx.kv_set(&StoreKey::new("epochs"), b"refused", n.to_be_bytes().to_vec());
            anyhow::bail!("refused epoch {n}")
        }
    }

    struct Seen(Arc<AtomicI64>);

    impl EpochHooks for Seen {
        fn after_epoch_end(&self, _: &mut Context<'_>, _: &str, n: i64) -> anyhow::Result<()> {
            self.0.store(n, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn failed_listener_is_counted_and_the_rest_still_run() {
        let seen = Arc::new(AtomicI64::new(0));
        let counter = IntCounter::new("hook_errors", "errors").unwrap();
        let hooks = MultiEpochHooks::new(vec![Arc::new(Refuses), Arc::new(Seen(seen.clone()))])
            .with_error_counter(counter.clone());

        let mut base = MemStore::new();
        let header = BlockHeader {
            chain_id: "test".into(),
            height: 1,
            time: Timestamp::from_secs(1),
        };
        let mut ctx = Context::new(header, ConsensusParams::default(), &mut base);
        hooks.after_epoch_end(&mut ctx, "day", 4);

        assert_eq!(counter.get(), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert!(ctx.kv_get(&StoreKey::new("epochs"), b"refused").is_none());
    }
}
