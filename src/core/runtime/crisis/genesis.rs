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

use super::keeper::CrisisKeeper;
use super::types::CrisisError;
use crate::core::context::Context;
use crate::core::math::Int;
use crate::core::types::Coin;
use serde::{Deserialize, Serialize};

/// Crisis genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Fee for `MsgVerifyInvariant`.
    pub constant_fee: Coin,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            constant_fee: Coin::new("stake", Int::from_u64(1000)),
        }
    }
}

impl GenesisState {
    /// Fee must be a valid coin.
    pub fn validate(&self) -> Result<(), CrisisError> {
        if !self.constant_fee.is_valid() {
            return Err(CrisisError::InvalidCoins(self.constant_fee.to_string()));
        }
        Ok(())
    }
}

impl CrisisKeeper {
    /// Store the fee, then assert every invariant unless skipped.
    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        gs: &GenesisState,
    ) -> Result<(), CrisisError> {
        self.set_constant_fee(ctx, &gs.constant_fee)?;
        if !self.skip_genesis_invariants() {
            self.assert_invariants(ctx);
        }
        Ok(())
    }

    /// Current fee.
    pub fn export_genesis(&self, ctx: &Context<'_>) -> GenesisState {
        GenesisState {
            constant_fee: self.get_constant_fee(ctx),
        }
    }
}
