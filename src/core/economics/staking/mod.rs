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

//! Proof-of-stake staking engine.
//!
//! Validators, delegations, the bonded / not-bonded pools, the power index that
//! selects the active set, and the slashing and jailing primitives. State lives
//! under the `staking/` namespace; coins move only through the bank.

/// Begin/end block entry points.
pub mod abci;
mod delegation;
/// Error type.
#[allow(missing_docs)]
pub mod errors;
/// Genesis import/export.
pub mod genesis;
mod historical;
/// Listener interface.
pub mod hooks;
/// Crisis invariants.
pub mod invariants;
/// Keeper.
pub mod keeper;
/// Store layout.
#[allow(missing_docs)]
pub mod keys;
/// Transaction handlers.
pub mod msg_server;
/// Transaction messages.
pub mod msgs;
mod pool;
mod slash;
/// Records and params.
pub mod types;
mod val_state_change;
mod validator;

pub use errors::StakingError;
pub use genesis::{GenesisState, LastValidatorPower};
pub use hooks::{MultiStakingHooks, StakingHooks};
pub use invariants::register_invariants;
pub use keeper::{
    Keeper, BONDED_POOL_NAME, DEFAULT_POWER_REDUCTION, MODULE_NAME, NOT_BONDED_POOL_NAME,
};
pub use msg_server::MsgServer;
pub use msgs::{
    MsgBeginRedelegate, MsgCancelUnbondingDelegation, MsgCreateValidator, MsgDelegate,
    MsgEditValidator, MsgUndelegate, MsgUpdateParams,
};
pub use types::{
    BondStatus, Commission, CommissionRates, Delegation, Description, HistoricalInfo, Params,
    Redelegation, RedelegationEntry, UnbondingDelegation, UnbondingDelegationEntry, Validator,
    ValidatorUpdate, DO_NOT_MODIFY_DESC,
};
