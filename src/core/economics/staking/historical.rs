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

use super::keeper::Keeper;
use super::keys;
use super::types::HistoricalInfo;
use crate::core::context::Context;
use crate::core::types::{must_decode, must_encode};

impl Keeper {
    /// Snapshot stored for `height`.
    pub fn get_historical_info(&self, ctx: &Context<'_>, height: i64) -> Option<HistoricalInfo> {
        ctx.kv_get(&self.store_key, &keys::historical_info_key(height))
            .map(|b| must_decode(&b, "historical info"))
    }

    /// Store a snapshot.
    pub fn set_historical_info(&self, ctx: &mut Context<'_>, height: i64, info: &HistoricalInfo) {
        ctx.kv_set(&self.store_key, &keys::historical_info_key(height), must_encode(info));
    }

    /// Delete a snapshot.
    pub fn delete_historical_info(&self, ctx: &mut Context<'_>, height: i64) {
        ctx.kv_delete(&self.store_key, &keys::historical_info_key(height));
    }

    /// Prune snapshots older than `historical_entries` and record the current height.
    pub fn track_historical_info(&self, ctx: &mut Context<'_>) {
        let entries = i64::from(self.params(ctx).historical_entries);
        let height = ctx.block_height();

        // walk down from the newest prunable height until a gap
        let mut h = height - entries;
        while h >= 0 {
            if self.get_historical_info(ctx, h).is_none() {
                break;
            }
            self.delete_historical_info(ctx, h);
            h -= 1;
        }

        if entries == 0 {
            return;
        }
        let info = HistoricalInfo {
            header: ctx.header().clone(),
            valset: self.get_bonded_validators_by_power(ctx),
        };
        self.set_historical_info(ctx, height, &info);
    }
}
