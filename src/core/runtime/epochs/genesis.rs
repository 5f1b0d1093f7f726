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

use super::keeper::Keeper;
use super::types::{EpochInfo, EpochsError};
use crate::core::context::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Epochs genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Timers.
    pub epochs: Vec<EpochInfo>,
}

impl Default for GenesisState {
    /// `day`, `hour` and `week`, all starting at the genesis block.
    fn default() -> Self {
        Self {
            epochs: vec![
                EpochInfo::new("day", HOUR * 24),
                EpochInfo::new("hour", HOUR),
                EpochInfo::new("week", HOUR * 24 * 7),
            ],
        }
    }
}

impl GenesisState {
    /// Every timer valid and identifiers unique.
    pub fn validate(&self) -> Result<(), EpochsError> {
        let mut seen = BTreeSet::new();
        for e in &self.epochs {
            e.validate()?;
            if !seen.insert(e.identifier.as_str()) {
                return Err(EpochsError::DuplicateIdentifier(e.identifier.clone()));
            }
        }
        Ok(())
    }
}

impl Keeper {
    /// Add every genesis timer.
    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        gs: &GenesisState,
    ) -> Result<(), EpochsError> {
        for e in &gs.epochs {
            self.add_epoch_info(ctx, e.clone())?;
        }
        Ok(())
    }

    /// Current timers.
    pub fn export_genesis(&self, ctx: &Context<'_>) -> GenesisState {
        GenesisState {
            epochs: self.all_epoch_infos(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_genesis_is_valid() {
        let gs = GenesisState::default();
        gs.validate().unwrap();
        assert_eq!(gs.epochs[2].duration, Duration::from_secs(604_800));
    }

    #[test]
    fn duplicate_identifiers_rejected() {
        let mut gs = GenesisState::default();
        gs.epochs.push(EpochInfo::new("day", HOUR));
        assert_eq!(gs.validate(), Err(EpochsError::DuplicateIdentifier("day".into())));
    }
}
