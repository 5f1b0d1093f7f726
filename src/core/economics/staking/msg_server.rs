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

//! Staking transaction handlers.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::Keeper;
use super::msgs::{
    MsgBeginRedelegate, MsgCancelUnbondingDelegation, MsgCreateValidator, MsgDelegate,
    MsgEditValidator, MsgUndelegate, MsgUpdateParams,
};
use super::types::{BondStatus, Commission, Validator};
use crate::core::context::{Context, Event};
use crate::core::math::Int;
use crate::core::types::{AccAddress, Coin, Timestamp};
use tracing::info;

/// Handlers over a keeper.
#[derive(Clone)]
pub struct MsgServer {
    keeper: Keeper,
}

impl MsgServer {
    /// Wrap a keeper.
    pub fn new(keeper: Keeper) -> Self {
        Self { keeper }
    }

    fn check_denom(&self, ctx: &Context<'_>, coin: &Coin) -> Result<(), StakingError> {
        let expected = self.keeper.bond_denom(ctx);
        if coin.denom != expected {
            return Err(StakingError::InvalidDenom {
                got: coin.denom.clone(),
                expected,
            });
        }
        Ok(())
    }

    /// Create a validator and self-delegate its initial stake.
    pub fn create_validator(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCreateValidator,
    ) -> Result<(), StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;

        if msg.commission.rate < k.params(ctx).min_commission_rate {
            return Err(StakingError::CommissionLtMinRate);
        }
        if k.get_validator(ctx, &msg.validator_address).is_some() {
            return Err(StakingError::ValidatorOwnerExists);
        }
        if k.get_validator_by_cons_addr(ctx, &msg.pubkey.cons_address()).is_some() {
            return Err(StakingError::ValidatorPubKeyExists);
        }
        self.check_denom(ctx, &msg.value)?;
        msg.description.ensure_length()?;

        let supported = &ctx.consensus_params().validator_pub_key_types;
        let key_type = msg.pubkey.key_type();
        if !supported.iter().any(|t| t == key_type) {
            return Err(StakingError::ValidatorPubKeyTypeNotSupported {
                got: key_type.to_string(),
                supported: supported.join(","),
            });
        }
        if !msg.pubkey.is_well_formed() {
            return Err(StakingError::InvalidRequest(format!(
                "malformed {key_type} public key"
            )));
        }

        let mut validator = Validator::new(
            msg.validator_address.clone(),
            msg.pubkey.clone(),
            msg.description.clone(),
        );
        msg.commission.validate()?;
        validator.commission = Commission::new(msg.commission.clone(), ctx.block_time());
        validator.min_self_delegation = msg.min_self_delegation;

        k.set_validator(ctx, &validator);
        k.set_validator_by_cons_addr(ctx, &validator);
        k.set_new_validator_by_power_index(ctx, &validator);

        let op = validator.operator_address.clone();
        k.call_hook(ctx, |h, c| h.after_validator_created(c, &op))?;

        k.delegate(
            ctx,
            &msg.signer(),
            msg.value.amount,
            BondStatus::Unbonded,
            validator,
            true,
        )?;

        ctx.emit(
            Event::new("create_validator")
                .attr("validator", &msg.validator_address)
                .attr("amount", &msg.value),
        );
        info!(module = "x/staking", validator = %op, amount = %msg.value, "validator created");
        Ok(())
    }

    /// Edit description, commission rate or minimum self-delegation.
    pub fn edit_validator(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgEditValidator,
    ) -> Result<(), StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;
        let Some(mut validator) = k.get_validator(ctx, &msg.validator_address) else {
            return Err(StakingError::NoValidatorFound);
        };

        validator.description = validator.description.update(&msg.description)?;

        if let Some(rate) = msg.commission_rate {
            let commission = k.update_validator_commission(ctx, &validator, rate)?;
            let op = validator.operator_address.clone();
            k.call_hook(ctx, |h, c| h.before_validator_modified(c, &op))?;
            validator.commission = commission;
        }

        if let Some(min) = msg.min_self_delegation {
            if min <= validator.min_self_delegation {
                return Err(StakingError::MinSelfDelegationDecreased);
            }
            if min > validator.tokens {
                return Err(StakingError::SelfDelegationBelowMinimum);
            }
            validator.min_self_delegation = min;
        }

        k.set_validator(ctx, &validator);
        ctx.emit(
            Event::new("edit_validator")
                .attr("commission_rate", validator.commission.rates.rate)
                .attr("min_self_delegation", validator.min_self_delegation),
        );
        Ok(())
    }

    /// Delegate from the signer's account.
    pub fn delegate(&self, ctx: &mut Context<'_>, msg: &MsgDelegate) -> Result<(), StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;
        let Some(validator) = k.get_validator(ctx, &msg.validator_address) else {
            return Err(StakingError::NoValidatorFound);
        };
        self.check_denom(ctx, &msg.amount)?;
        let shares = k.delegate(
            ctx,
            &msg.delegator_address,
            msg.amount.amount,
            BondStatus::Unbonded,
            validator,
            true,
        )?;
        ctx.emit(
            Event::new("delegate")
                .attr("validator", &msg.validator_address)
                .attr("delegator", &msg.delegator_address)
                .attr("amount", &msg.amount)
                .attr("new_shares", shares),
        );
        Ok(())
    }

    /// Redelegate; returns the completion time.
    pub fn begin_redelegate(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgBeginRedelegate,
    ) -> Result<Timestamp, StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;
        let shares = k.validate_unbond_amount(
            ctx,
            &msg.delegator_address,
            &msg.validator_src_address,
            msg.amount.amount,
        )?;
        self.check_denom(ctx, &msg.amount)?;
        let completion = k.begin_redelegation(
            ctx,
            &msg.delegator_address,
            &msg.validator_src_address,
            &msg.validator_dst_address,
            shares,
        )?;
        ctx.emit(
            Event::new("redelegate")
                .attr("source_validator", &msg.validator_src_address)
                .attr("destination_validator", &msg.validator_dst_address)
                .attr("amount", &msg.amount)
                .attr("completion_time", completion),
        );
        Ok(completion)
    }

    /// Undelegate; returns (completion time, tokens unbonded).
    pub fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUndelegate,
    ) -> Result<(Timestamp, Int), StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;
        let shares = k.validate_unbond_amount(
            ctx,
            &msg.delegator_address,
            &msg.validator_address,
            msg.amount.amount,
        )?;
        self.check_denom(ctx, &msg.amount)?;
        let (completion, amount) =
            k.undelegate(ctx, &msg.delegator_address, &msg.validator_address, shares)?;
        ctx.emit(
            Event::new("unbond")
                .attr("validator", &msg.validator_address)
                .attr("amount", Coin::new(msg.amount.denom.clone(), amount))
                .attr("completion_time", completion),
        );
        Ok((completion, amount))
    }

    /// Return tokens of one unbonding entry to the validator.
    pub fn cancel_unbonding_delegation(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgCancelUnbondingDelegation,
    ) -> Result<(), StakingError> {
        msg.validate_basic()?;
        let k = &self.keeper;
        self.check_denom(ctx, &msg.amount)?;
        let Some(validator) = k.get_validator(ctx, &msg.validator_address) else {
            return Err(StakingError::NoValidatorFound);
        };
        if validator.jailed {
            return Err(StakingError::ValidatorJailed);
        }
        let Some(mut ubd) =
            k.get_unbonding_delegation(ctx, &msg.delegator_address, &msg.validator_address)
        else {
            return Err(StakingError::NoUnbondingDelegation);
        };
        let Some(idx) = ubd
            .entries
            .iter()
            .position(|e| e.creation_height == msg.creation_height)
        else {
            return Err(StakingError::NoUnbondingDelegation);
        };
        let entry = ubd.entries[idx].clone();
        if entry.balance < msg.amount.amount {
            return Err(StakingError::InvalidRequest(
                "amount is greater than the unbonding delegation entry balance".into(),
            ));
        }
        if entry.completion_time < ctx.block_time() {
            return Err(StakingError::InvalidRequest(
                "unbonding delegation is already processed".into(),
            ));
        }

        // tokens of an unbonding entry sit in the not-bonded pool
        k.delegate(
            ctx,
            &msg.delegator_address,
            msg.amount.amount,
            BondStatus::Unbonding,
            validator,
            false,
        )?;

        let left = entry.balance - msg.amount.amount;
        if left.is_zero() {
            ubd.entries.remove(idx);
        } else {
            let e = &mut ubd.entries[idx];
            e.balance = left;
            e.initial_balance = e.initial_balance.saturating_sub(msg.amount.amount);
        }
        if ubd.entries.is_empty() {
            k.remove_unbonding_delegation(ctx, &ubd);
        } else {
            k.set_unbonding_delegation(ctx, &ubd);
        }

        ctx.emit(
            Event::new("cancel_unbonding_delegation")
                .attr("amount", &msg.amount)
                .attr("validator", &msg.validator_address)
                .attr("delegator", &msg.delegator_address)
                .attr("creation_height", msg.creation_height),
        );
        Ok(())
    }

    /// Replace params; only the authority may.
    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUpdateParams,
    ) -> Result<(), StakingError> {
        msg.validate_basic()?;
        let authority: &AccAddress = self.keeper.authority();
        if &msg.authority != authority {
            return Err(StakingError::InvalidSigner {
                expected: authority.to_string(),
                got: msg.authority.to_string(),
            });
        }
        self.keeper.set_params(ctx, &msg.params)
    }
}
