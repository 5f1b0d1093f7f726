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

//! Listener interface fired at fixed points of the staking state machine.
//!
//! Other modules (distribution, slashing, ...) implement `StakingHooks` and are
//! registered once at wiring time through `Keeper::set_hooks`. Every callback
//! runs inside a cache context: a listener that fails or panics leaves no writes.

use crate::core::context::Context;
use crate::core::math::Dec;
use crate::core::types::{AccAddress, ConsAddress, ValAddress};
use std::sync::Arc;

/// Staking lifecycle listener. All methods default to no-ops.
#[allow(unused_variables)]
pub trait StakingHooks: Send + Sync {
    /// A validator record was created.
    fn after_validator_created(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A validator's commission or tokens are about to change.
    fn before_validator_modified(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A validator record was deleted.
    fn after_validator_removed(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A validator entered the bonded set.
    fn after_validator_bonded(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A validator left the bonded set.
    fn after_validator_begin_unbonding(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A delegation is about to be created.
    fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// An existing delegation's shares are about to change.
    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A delegation is about to be removed.
    fn before_delegation_removed(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A delegation was created or modified.
    fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    /// A validator is about to be slashed by `fraction` of its tokens.
    fn before_validator_slashed(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        fraction: Dec,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Ordered fan-out over registered listeners. Stops at the first error.
#[derive(Clone, Default)]
pub struct MultiStakingHooks(Vec<Arc<dyn StakingHooks>>);

impl MultiStakingHooks {
    /// Listeners in call order.
    pub fn new(hooks: Vec<Arc<dyn StakingHooks>>) -> Self {
        Self(hooks)
    }

    /// True if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

macro_rules! fan_out {
    ($self:ident, $ctx:ident, $method:ident ( $($arg:expr),* )) => {{
        for h in &$self.0 {
            h.$method($ctx, $($arg),*)?;
        }
        Ok(())
    }};
}

impl StakingHooks for MultiStakingHooks {
    fn after_validator_created(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, after_validator_created(val))
    }

    fn before_validator_modified(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, before_validator_modified(val))
    }

    fn after_validator_removed(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, after_validator_removed(cons, val))
    }

    fn after_validator_bonded(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, after_validator_bonded(cons, val))
    }

    fn after_validator_begin_unbonding(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, after_validator_begin_unbonding(cons, val))
    }

    fn before_delegation_created(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, before_delegation_created(del, val))
    }

    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, before_delegation_shares_modified(del, val))
    }

    fn before_delegation_removed(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, before_delegation_removed(del, val))
    }

    fn after_delegation_modified(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, after_delegation_modified(del, val))
    }

    fn before_validator_slashed(
        &self,
        ctx: &mut Context<'_>,
        val: &ValAddress,
        fraction: Dec,
    ) -> anyhow::Result<()> {
        fan_out!(self, ctx, before_validator_slashed(val, fraction))
    }
}
