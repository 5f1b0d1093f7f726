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

use super::errors::StakingError;
use super::keeper::Keeper;
use super::types::ValidatorUpdate;
use crate::core::context::Context;

/// Record the bonded set for this height.
pub fn begin_blocker(ctx: &mut Context<'_>, k: &Keeper) {
    k.track_historical_info(ctx);
}

/// Validator set changes for consensus, plus matured unbondings and redelegations.
pub fn end_blocker(
    ctx: &mut Context<'_>,
    k: &Keeper,
) -> Result<Vec<ValidatorUpdate>, StakingError> {
    k.block_validator_updates(ctx)
}
