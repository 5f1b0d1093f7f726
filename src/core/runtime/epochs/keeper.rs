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

use super::hooks::MultiEpochHooks;
use super::types::{EpochInfo, EpochsError};
use crate::core::context::{Context, StoreKey};
use crate::core::types::{must_decode, must_encode};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Store namespace.
pub const MODULE_NAME: &str = "epochs";

const EPOCH_INFO_PREFIX: u8 = 0x01;

static NO_HOOKS: OnceLock<MultiEpochHooks> = OnceLock::new();

fn epoch_key(identifier: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(1 + identifier.len());
    k.push(EPOCH_INFO_PREFIX);
    k.extend_from_slice(identifier.as_bytes());
    k
}

/// Epochs keeper.
#[derive(Clone)]
pub struct Keeper {
    store_key: StoreKey,
    hooks: Arc<OnceLock<MultiEpochHooks>>,
}

impl Default for Keeper {
    fn default() -> Self {
        Self::new()
    }
}

impl Keeper {
    /// Keeper over `epochs/`.
    pub fn new() -> Self {
        Self {
            store_key: StoreKey::new(MODULE_NAME),
            hooks: Arc::new(OnceLock::new()),
        }
    }

    /// Register listeners once.
    pub fn set_hooks(&self, hooks: MultiEpochHooks) {
        if self.hooks.set(hooks).is_err() {
            panic!("cannot set epochs hooks twice");
        }
    }

    pub(super) fn hooks(&self) -> &MultiEpochHooks {
        self.hooks
            .get()
            .unwrap_or_else(|| NO_HOOKS.get_or_init(MultiEpochHooks::default))
    }

    /// Timer by identifier.
    pub fn get_epoch_info(&self, ctx: &Context<'_>, identifier: &str) -> Option<EpochInfo> {
        ctx.kv_get(&self.store_key, &epoch_key(identifier))
            .map(|b| must_decode(&b, "epoch info"))
    }

    pub(super) fn set_epoch_info(&self, ctx: &mut Context<'_>, info: &EpochInfo) {
        ctx.kv_set(&self.store_key, &epoch_key(&info.identifier), must_encode(info));
    }

    /// Add a new timer. A zero `start_time` or start height is filled from the block.
    pub fn add_epoch_info(
        &self,
        ctx: &mut Context<'_>,
        mut info: EpochInfo,
    ) -> Result<(), EpochsError> {
        info.validate()?;
        if ctx.kv_has(&self.store_key, &epoch_key(&info.identifier)) {
            return Err(EpochsError::DuplicateIdentifier(info.identifier));
        }
        if info.start_time.is_zero() {
            info.start_time = ctx.block_time();
        }
        if info.current_epoch_start_height == 0 {
            info.current_epoch_start_height = ctx.block_height();
        }
        debug!(
            module = "x/epochs",
            epoch = %info.identifier,
            start_time = %info.start_time,
            "epoch added"
        );
        self.set_epoch_info(ctx, &info);
        Ok(())
    }

    /// Every timer, ordered by identifier.
    pub fn all_epoch_infos(&self, ctx: &Context<'_>) -> Vec<EpochInfo> {
        ctx.kv_prefix(&self.store_key, &[EPOCH_INFO_PREFIX])
            .into_iter()
            .map(|(_, v)| must_decode(&v, "epoch info"))
            .collect()
    }

    /// Blocks since the running epoch of `identifier` started.
    pub fn num_blocks_since_epoch_start(
        &self,
        ctx: &Context<'_>,
        identifier: &str,
    ) -> Result<i64, EpochsError> {
        let Some(info) = self.get_epoch_info(ctx, identifier) else {
            return Err(EpochsError::EpochNotFound(identifier.to_string()));
        };
        Ok(ctx.block_height() - info.current_epoch_start_height)
    }
}
