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

use super::keeper::CrisisKeeper;
use crate::core::context::Context;

/// Assert invariants when the height is a multiple of the period.
/// Returns whether the assertion ran.
pub fn end_blocker(ctx: &mut Context<'_>, k: &CrisisKeeper) -> bool {
    let period = k.inv_check_period();
    if period == 0 {
        return false;
    }
    match u64::try_from(ctx.block_height()) {
        Ok(h) if h % period == 0 => {
            k.assert_invariants(ctx);
            true
        }
        _ => false,
    }
}
