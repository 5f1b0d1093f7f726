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
use crate::core::context::{Context, Event};
use tracing::info;

/// Tick every timer whose epoch has run out.
///
/// A tick advances exactly one epoch and moves the nominal start time by one
/// duration, so after downtime each block catches up by one epoch.
pub fn begin_blocker(ctx: &mut Context<'_>, k: &Keeper) {
    let now = ctx.block_time();
    for mut info in k.all_epoch_infos(ctx) {
        if now < info.start_time {
            continue;
        }
        let initial = !info.epoch_counting_started;
        if !initial && now <= info.current_epoch_end() {
            continue;
        }

        info.current_epoch_start_height = ctx.block_height();
        if initial {
            info.epoch_counting_started = true;
            info.current_epoch = 1;
            info.current_epoch_start_time = info.start_time;
        } else {
            ctx.emit(Event::new("epoch_end").attr("epoch_number", info.current_epoch));
            // listener failures are contained and counted by the multiplexer
            k.hooks().after_epoch_end(ctx, &info.identifier, info.current_epoch);
            info.current_epoch += 1;
            info.current_epoch_start_time = info.current_epoch_end();
        }
        info!(
            module = "x/epochs",
            epoch = %info.identifier,
            number = info.current_epoch,
            height = info.current_epoch_start_height,
            "starting new epoch"
        );

        ctx.emit(
            Event::new("epoch_start")
                .attr("epoch_number", info.current_epoch)
                .attr("start_time", info.current_epoch_start_time.unix_secs()),
        );
        k.set_epoch_info(ctx, &info);
        k.hooks().before_epoch_start(ctx, &info.identifier, info.current_epoch);
    }
}
