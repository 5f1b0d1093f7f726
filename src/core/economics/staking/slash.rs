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

//! Slashing and jailing.
//!
//! Both run in a child context with an infinite gas meter so a fault penalty
//! cannot be cut short halfway; the child is written only on success.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::Keeper;
use super::types::{BondStatus, Redelegation, UnbondingDelegation, Validator};
use crate::core::context::{Context, GasMeter};
use crate::core::math::{Dec, Int};
use crate::core::types::ConsAddress;
use tracing::{error, info, warn};

impl Keeper {
    /// Burn `slash_factor` of the stake `power` represented at `infraction_height`.
    ///
    /// Returns the tokens burned from the validator itself. A missing validator
    /// is not an error: it may already have been slashed out and removed.
    pub fn slash(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        infraction_height: i64,
        power: i64,
        slash_factor: Dec,
    ) -> Result<Int, StakingError> {
        let mut child = ctx.cache_context().with_gas_meter(GasMeter::infinite());
        let burned = self.slash_inner(&mut child, cons, infraction_height, power, slash_factor)?;
        child.write();
        Ok(burned)
    }

    fn slash_inner(
        &self,
        ctx: &mut Context<'_>,
        cons: &ConsAddress,
        infraction_height: i64,
        power: i64,
        slash_factor: Dec,
    ) -> Result<Int, StakingError> {
        let amount = self.tokens_from_consensus_power(power);
        let slash_amount = Dec::from_int(amount).mul(slash_factor).truncate_int();

        let Some(validator) = self.get_validator_by_cons_addr(ctx, cons) else {
            warn!(
                module = "x/staking",
                validator = %cons,
                "ignored attempt to slash a nonexistent validator"
            );
            return Ok(Int::zero());
        };
        if validator.is_unbonded() {
            return Err(StakingError::SlashUnbondedValidator);
        }
        let current = ctx.block_height();
        let mut remaining = slash_amount;
        if infraction_height > current {
            return Err(StakingError::FutureInfraction {
                infraction: infraction_height,
                current,
            });
        } else if infraction_height == current {
            info!(
                module = "x/staking",
                height = infraction_height,
                "slashing at current height; not scanning unbonding delegations and redelegations"
            );
        } else {
            let op = validator.operator_address.clone();
            for ubd in self.get_unbonding_delegations_from_validator(ctx, &op) {
                let slashed =
                    self.slash_unbonding_delegation(ctx, ubd, infraction_height, slash_factor)?;
                remaining = remaining.saturating_sub(slashed);
            }
            for red in self.get_redelegations_from_src_validator(ctx, &op) {
                let slashed = self.slash_redelegation(ctx, red, infraction_height, slash_factor)?;
                remaining = remaining.saturating_sub(slashed);
            }
        }

        let tokens_to_burn = remaining.min(validator.tokens);
        if tokens_to_burn.is_zero() {
            info!(
                module = "x/staking",
                validator = %validator.operator_address,
                "slash burns nothing"
            );
            return Ok(Int::zero());
        }

        let op = validator.operator_address.clone();
        if let Err(e) = self.call_hook(ctx, |h, c| h.before_validator_modified(c, &op)) {
            error!(
                module = "x/staking",
                validator = %op,
                error = %e,
                "before validator modified hook failed"
            );
        }

        let mut effective =
            Dec::from_int(tokens_to_burn).quo_round_up(Dec::from_int(validator.tokens));
        if effective > Dec::one() {
            effective = Dec::one();
        }
        self.call_hook(ctx, |h, c| h.before_validator_slashed(c, &op, effective))?;

        let validator = self.remove_validator_tokens(ctx, validator, tokens_to_burn);
        match validator.status {
            BondStatus::Bonded => self.burn_bonded_tokens(ctx, tokens_to_burn)?,
            BondStatus::Unbonding | BondStatus::Unbonded => {
                self.burn_not_bonded_tokens(ctx, tokens_to_burn)?
            }
        }

        info!(
            module = "x/staking",
            validator = %op,
            slash_factor = %slash_factor,
            burned = %tokens_to_burn,
            "validator slashed"
        );
        Ok(tokens_to_burn)
    }

    /// Slash the still-slashable entries of an unbonding delegation.
    ///
    /// Returns the amount that *should* have been slashed, which may exceed
    /// what was actually burned when entries were already paid down.
    pub fn slash_unbonding_delegation(
        &self,
        ctx: &mut Context<'_>,
        mut ubd: UnbondingDelegation,
        infraction_height: i64,
        slash_factor: Dec,
    ) -> Result<Int, StakingError> {
        let now = ctx.block_time();
        let mut total = Int::zero();
        let mut burned = Int::zero();
        let mut touched = false;
        for entry in ubd.entries.iter_mut() {
            // entries created before the infraction never backed the faulty stake
            if entry.creation_height < infraction_height || entry.is_mature(now) {
                continue;
            }
            let slash_amount = slash_factor.mul_int(entry.initial_balance).truncate_int();
            total += slash_amount;
            let taken = slash_amount.min(entry.balance);
            if taken.is_zero() {
                continue;
            }
            burned += taken;
            entry.balance -= taken;
            touched = true;
        }
        if touched {
            self.set_unbonding_delegation(ctx, &ubd);
        }
        self.burn_not_bonded_tokens(ctx, burned)?;
        Ok(total)
    }

    /// Slash the still-slashable entries of a redelegation by unbonding at the destination.
    pub fn slash_redelegation(
        &self,
        ctx: &mut Context<'_>,
        red: Redelegation,
        infraction_height: i64,
        slash_factor: Dec,
    ) -> Result<Int, StakingError> {
        let now = ctx.block_time();
        let del = &red.delegator_address;
        let dst = &red.validator_dst_address;
        let mut total = Int::zero();
        let mut bonded_burned = Int::zero();
        let mut not_bonded_burned = Int::zero();
        for entry in &red.entries {
            if entry.creation_height < infraction_height || entry.is_mature(now) {
                continue;
            }
            total += slash_factor.mul_int(entry.initial_balance).truncate_int();
            let mut shares = slash_factor.mul(entry.shares_dst);
            if shares.is_zero() {
                continue;
            }
            let Some(delegation) = self.get_delegation(ctx, del, dst) else {
                continue;
            };
            if shares > delegation.shares {
                shares = delegation.shares;
            }
            let tokens = self.unbond(ctx, del, dst, shares)?;
            match self.get_validator(ctx, dst).map(|v| v.status) {
                Some(BondStatus::Bonded) => bonded_burned += tokens,
                Some(_) => not_bonded_burned += tokens,
                // destination emptied and removed: its tokens went to the not-bonded pool
                None => not_bonded_burned += tokens,
            }
        }
        self.burn_bonded_tokens(ctx, bonded_burned)?;
        self.burn_not_bonded_tokens(ctx, not_bonded_burned)?;
        Ok(total)
    }

    pub(super) fn jail_validator(
        &self,
        ctx: &mut Context<'_>,
        v: &Validator,
    ) -> Result<(), StakingError> {
        if v.jailed {
            return Err(StakingError::ValidatorAlreadyJailed);
        }
        let mut v = v.clone();
        v.jailed = true;
        self.set_validator(ctx, &v);
        self.delete_validator_by_power_index(ctx, &v);
        Ok(())
    }

    fn unjail_validator(&self, ctx: &mut Context<'_>, v: &Validator) -> Result<(), StakingError> {
        if !v.jailed {
            return Err(StakingError::ValidatorNotJailed);
        }
        let mut v = v.clone();
        v.jailed = false;
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);
        Ok(())
    }

    /// Remove the validator behind `cons` from the power index.
    pub fn jail(&self, ctx: &mut Context<'_>, cons: &ConsAddress) -> Result<(), StakingError> {
        let mut child = ctx.cache_context().with_gas_meter(GasMeter::infinite());
        let Some(v) = self.get_validator_by_cons_addr(&child, cons) else {
            return Err(StakingError::NoValidatorFound);
        };
        self.jail_validator(&mut child, &v)?;
        child.write();
        info!(module = "x/staking", validator = %v.operator_address, "validator jailed");
        Ok(())
    }

    /// Put the validator behind `cons` back into the power index.
    pub fn unjail(&self, ctx: &mut Context<'_>, cons: &ConsAddress) -> Result<(), StakingError> {
        let mut child = ctx.cache_context().with_gas_meter(GasMeter::infinite());
        let Some(v) = self.get_validator_by_cons_addr(&child, cons) else {
            return Err(StakingError::NoValidatorFound);
        };
        self.unjail_validator(&mut child, &v)?;
        child.write();
        info!(module = "x/staking", validator = %v.operator_address, "validator un-jailed");
        Ok(())
    }
}
