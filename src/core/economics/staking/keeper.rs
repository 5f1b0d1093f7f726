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

//! Staking keeper: the engine value holding its collaborators.

use super::errors::StakingError;
use super::hooks::{MultiStakingHooks, StakingHooks};
use super::keys;
use super::types::Params;
use crate::core::bank::{AccountKeeper, BankKeeper};
use crate::core::context::{apply_func_if_no_error, Context, StoreKey};
use crate::core::math::Int;
use crate::core::types::{must_decode, must_encode, AccAddress};
use std::sync::{Arc, OnceLock};

/// Store namespace and module name.
pub const MODULE_NAME: &str = "staking";
/// Pool holding bonded validators' tokens.
pub const BONDED_POOL_NAME: &str = "bonded_tokens_pool";
/// Pool holding unbonded and unbonding validators' tokens.
pub const NOT_BONDED_POOL_NAME: &str = "not_bonded_tokens_pool";
/// Default tokens per unit of consensus power.
pub const DEFAULT_POWER_REDUCTION: u64 = 1_000_000;

static NO_HOOKS: OnceLock<MultiStakingHooks> = OnceLock::new();

/// Staking keeper. Cheap to clone; clones share the hook registration.
#[derive(Clone)]
pub struct Keeper {
    pub(super) store_key: StoreKey,
    pub(super) bank: Arc<dyn BankKeeper>,
    pub(super) accounts: Arc<dyn AccountKeeper>,
    authority: AccAddress,
    power_reduction: Int,
    hooks: Arc<OnceLock<MultiStakingHooks>>,
}

impl Keeper {
    /// New keeper. `power_reduction` must be non-zero.
    pub fn new(
        bank: Arc<dyn BankKeeper>,
        accounts: Arc<dyn AccountKeeper>,
        authority: AccAddress,
        power_reduction: Int,
    ) -> Self {
        assert!(!power_reduction.is_zero(), "power reduction must be positive");
        Self {
            store_key: StoreKey::new(MODULE_NAME),
            bank,
            accounts,
            authority,
            power_reduction,
            hooks: Arc::new(OnceLock::new()),
        }
    }

    /// Register listeners. Panics on a second call; hooks are wiring-time only.
    pub fn set_hooks(&self, hooks: MultiStakingHooks) {
        if self.hooks.set(hooks).is_err() {
            panic!("cannot set validator hooks twice");
        }
    }

    pub(super) fn hooks(&self) -> &MultiStakingHooks {
        match self.hooks.get() {
            Some(h) => h,
            None => NO_HOOKS.get_or_init(MultiStakingHooks::default),
        }
    }

    /// Run one listener callback in a cache context; failures become `StakingError::Hook`.
    pub(super) fn call_hook<F>(&self, ctx: &mut Context<'_>, f: F) -> Result<(), StakingError>
    where
        F: FnOnce(&MultiStakingHooks, &mut Context<'_>) -> anyhow::Result<()>,
    {
        let hooks = self.hooks();
        if hooks.is_empty() {
            return Ok(());
        }
        apply_func_if_no_error(ctx, |c| f(hooks, c)).map_err(StakingError::Hook)
    }

    /// Governance authority.
    pub fn authority(&self) -> &AccAddress {
        &self.authority
    }

    /// Tokens per unit of consensus power.
    pub fn power_reduction(&self) -> Int {
        self.power_reduction
    }

    /// `power * power_reduction`.
    pub fn tokens_from_consensus_power(&self, power: i64) -> Int {
        Int::from_u64(power.max(0) as u64) * self.power_reduction
    }

    /// Consensus power of `tokens`.
    pub fn tokens_to_consensus_power(&self, tokens: Int) -> i64 {
        (tokens / self.power_reduction).to_i64_saturating()
    }

    /// Current params. Panics if params were never set (genesis not run).
    pub fn params(&self, ctx: &Context<'_>) -> Params {
        match ctx.kv_get(&self.store_key, &keys::params_key()) {
            Some(b) => must_decode(&b, "staking params"),
            None => panic!("staking params not set"),
        }
    }

    /// Store params after validation.
    pub fn set_params(&self, ctx: &mut Context<'_>, params: &Params) -> Result<(), StakingError> {
        params.validate()?;
        ctx.kv_set(&self.store_key, &keys::params_key(), must_encode(params));
        Ok(())
    }

    /// Bondable denomination.
    pub fn bond_denom(&self, ctx: &Context<'_>) -> String {
        self.params(ctx).bond_denom
    }

    /// Module account address for a pool.
    pub fn pool_address(&self, pool: &str) -> AccAddress {
        self.accounts.module_address(pool)
    }

    /// The hooks as a trait object, for callers outside the module.
    pub fn staking_hooks(&self) -> &dyn StakingHooks {
        self.hooks()
    }
}
