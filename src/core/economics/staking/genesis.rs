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

//! Staking genesis import and export.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::Keeper;
use super::types::{
    BondStatus, Delegation, Params, Redelegation, UnbondingDelegation, Validator, ValidatorUpdate,
};
use crate::core::context::Context;
use crate::core::math::Int;
use crate::core::types::ValAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Last-set power of one validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastValidatorPower {
    /// Operator.
    pub address: ValAddress,
    /// Power.
    pub power: i64,
}

/// Staking genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Params.
    pub params: Params,
    /// Total power of the last set.
    pub last_total_power: Int,
    /// Powers of the last set; only read when `exported`.
    pub last_validator_powers: Vec<LastValidatorPower>,
    /// Validators.
    pub validators: Vec<Validator>,
    /// Delegations.
    pub delegations: Vec<Delegation>,
    /// Pending undelegations.
    pub unbonding_delegations: Vec<UnbondingDelegation>,
    /// Pending redelegations.
    pub redelegations: Vec<Redelegation>,
    /// True for state exported from a running chain: hooks are skipped and the
    /// last set is taken as-is instead of being recomputed.
    pub exported: bool,
}

impl GenesisState {
    /// Stateless checks.
    pub fn validate(&self) -> Result<(), StakingError> {
        self.params.validate()?;
        let mut seen = BTreeSet::new();
        for v in &self.validators {
            if !seen.insert(v.cons_address()) {
                return Err(StakingError::InvalidGenesis(format!(
                    "duplicate validator in genesis state: moniker {}, address {}",
                    v.description.moniker,
                    v.cons_address()
                )));
            }
            if v.jailed && v.is_bonded() {
                return Err(StakingError::InvalidGenesis(format!(
                    "validator is bonded and jailed in genesis state: moniker {}, address {}",
                    v.description.moniker,
                    v.cons_address()
                )));
            }
            if v.delegator_shares.is_zero() && !v.is_unbonding() {
                return Err(StakingError::InvalidGenesis(format!(
                    "bonded/unbonded genesis validator cannot have zero delegator shares, validator: {}",
                    v.operator_address
                )));
            }
        }
        Ok(())
    }
}

impl Keeper {
    /// Load genesis; returns the initial validator updates for consensus.
    pub fn init_genesis(
        &self,
        ctx: &mut Context<'_>,
        gs: &GenesisState,
    ) -> Result<Vec<ValidatorUpdate>, StakingError> {
        gs.validate()?;
        self.set_params(ctx, &gs.params)?;
        self.set_last_total_power(ctx, gs.last_total_power);

        let mut bonded = Int::zero();
        let mut not_bonded = Int::zero();

        for v in &gs.validators {
            self.set_validator(ctx, v);
            self.set_validator_by_cons_addr(ctx, v);
            if !gs.exported {
                let op = v.operator_address.clone();
                self.call_hook(ctx, |h, c| h.after_validator_created(c, &op))?;
            }
            self.set_validator_by_power_index(ctx, v);
            if v.is_unbonding() {
                self.insert_unbonding_validator_queue(ctx, v);
            }
            match v.status {
                BondStatus::Bonded => bonded += v.tokens,
                BondStatus::Unbonding | BondStatus::Unbonded => not_bonded += v.tokens,
            }
        }

        for d in &gs.delegations {
            let (del, val) = (&d.delegator_address, &d.validator_address);
            if !gs.exported {
                self.call_hook(ctx, |h, c| h.before_delegation_created(c, del, val))?;
            }
            self.set_delegation(ctx, d);
            if !gs.exported {
                self.call_hook(ctx, |h, c| h.after_delegation_modified(c, del, val))?;
            }
        }

        for ubd in &gs.unbonding_delegations {
            self.set_unbonding_delegation(ctx, ubd);
            for e in &ubd.entries {
                self.insert_ubd_queue(ctx, ubd, e.completion_time);
                not_bonded += e.balance;
            }
        }

        for red in &gs.redelegations {
            self.set_redelegation(ctx, red);
            for e in &red.entries {
                self.insert_redelegation_queue(ctx, red, e.completion_time);
            }
        }

        let pool_bonded = self.total_bonded_tokens(ctx);
        if pool_bonded != bonded {
            return Err(StakingError::InvalidGenesis(format!(
                "bonded pool balance is different from bonded coins: {pool_bonded} <-> {bonded}"
            )));
        }
        let pool_not_bonded = self.total_not_bonded_tokens(ctx);
        if pool_not_bonded != not_bonded {
            return Err(StakingError::InvalidGenesis(format!(
                "not bonded pool balance is different from not bonded coins: {pool_not_bonded} <-> {not_bonded}"
            )));
        }

        if !gs.exported {
            return self.apply_and_return_validator_set_updates(ctx);
        }
        let pr = self.power_reduction();
        let mut updates = Vec::with_capacity(gs.last_validator_powers.len());
        for lv in &gs.last_validator_powers {
            self.set_last_validator_power(ctx, &lv.address, lv.power);
            let Some(v) = self.get_validator(ctx, &lv.address) else {
                return Err(StakingError::InvalidGenesis(format!(
                    "last validator power for unknown validator {}",
                    lv.address
                )));
            };
            let mut update = v.abci_validator_update(pr);
            update.power = lv.power;
            updates.push(update);
        }
        Ok(updates)
    }

    /// Export everything `init_genesis` reads.
    pub fn export_genesis(&self, ctx: &Context<'_>) -> GenesisState {
        GenesisState {
            params: self.params(ctx),
            last_total_power: self.get_last_total_power(ctx),
            last_validator_powers: self
                .get_last_validator_powers(ctx)
                .into_iter()
                .map(|(address, power)| LastValidatorPower { address, power })
                .collect(),
            validators: self.get_all_validators(ctx),
            delegations: self.get_all_delegations(ctx),
            unbonding_delegations: self.get_all_unbonding_delegations(ctx),
            redelegations: self.get_all_redelegations(ctx),
            exported: true,
        }
    }
}
