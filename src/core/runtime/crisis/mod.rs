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

//! Invariant registry.
//!
//! Modules register invariants over their own state. The registry asserts them
//! every `inv_check_period` blocks and on demand through `MsgVerifyInvariant`.
//! A broken invariant halts the chain by unwinding out of the block with a
//! `ChainHalt` payload.

/// End-block assertion.
pub mod abci;
/// Genesis import/export.
pub mod genesis;
/// Keeper.
pub mod keeper;
/// Transaction messages.
pub mod msgs;
/// Check types and errors.
#[allow(missing_docs)]
pub mod types;

pub use abci::end_blocker;
pub use genesis::GenesisState;
pub use keeper::{CrisisKeeper, MODULE_NAME};
pub use msgs::{MsgUpdateParams, MsgVerifyInvariant};
pub use types::{format_invariant, CrisisError, InvarRoute, Invariant, InvariantBroken};
