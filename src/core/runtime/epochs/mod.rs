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

//! Named periodic timers ticked at the start of each block.

/// Begin-block tick.
pub mod abci;
/// Genesis import/export.
pub mod genesis;
/// Listener interface.
pub mod hooks;
/// Keeper.
pub mod keeper;
/// Timer record and errors.
pub mod types;

pub use abci::begin_blocker;
pub use genesis::GenesisState;
pub use hooks::{EpochHooks, MultiEpochHooks};
pub use keeper::{Keeper, MODULE_NAME};
pub use types::{EpochInfo, EpochsError};
