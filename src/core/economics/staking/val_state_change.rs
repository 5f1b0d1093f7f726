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

//! End-of-block validator set maintenance.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::Keeper;
use super::types::{BondStatus, Validator, ValidatorUpdate};
use crate::core::context::{Context, Event};
use crate::core::math::Int;
use crate::core::types::{Coin, ValAddress};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl Keeper {
    /// Recompute the bonded set from the power index and return the changes for consensus.
    ///
    /// Walks the index from the highest power down, at most `max_validators`
    /// entries, stopping at the first zero-power validator. Validators that
    /// were in the last set but are no longer selected begin unbonding and get
    /// a zero-power update. The net token movement between pools is applied once.
    pub fn apply_and_return_validator_set_updates(
        &self,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<ValidatorUpdate>, StakingError> {
        let max = self.params(ctx).max_validators as usize;
        let pr = self.power_reduction();
        let mut total_power = Int::zero();
        let mut to_bonded = Int::zero();
        let mut to_not_bonded = Int::zero();
        let mut updates = Vec::new();

        let mut last: BTreeMap<ValAddress, i64> =
            self.get_last_validator_powers(ctx).into_iter().collect();

        let mut count = 0usize;
        for (_, addr) in self.power_index_desc(ctx) {
            if count >= max {
                break;
            }
            let mut validator = self.must_get_validator(ctx, &addr);
            if validator.jailed {
                panic!("should never retrieve a jailed validator from the power store");
            }
            if validator.potential_consensus_power(pr) == 0 {
                break;
            }
            match validator.status {
                BondStatus::Unbonded | BondStatus::Unbonding => {
                    validator = self.bond_validator(ctx, validator)?;
                    to_bonded += validator.tokens;
                }
                BondStatus::Bonded => {}
            }

            let new_power = validator.consensus_power(pr);
            if last.get(&addr) != Some(&new_power) {
                updates.push(validator.abci_validator_update(pr));
                self.set_last_validator_power(ctx, &addr, new_power);
            }
            last.remove(&addr);
            count += 1;
            total_power += Int::from_u64(new_power as u64);
        }

        // BTreeMap iteration keeps the removal order deterministic
        for addr in last.into_keys() {
            let validator = self.must_get_validator(ctx, &addr);
            if !validator.is_bonded() {
                panic!("bad state transition bondedToUnbonding, validator: {addr}");
            }
            let validator = self.begin_unbonding_validator(ctx, validator)?;
            to_not_bonded += validator.tokens;
            self.delete_last_validator_power(ctx, &addr);
            updates.push(validator.abci_validator_update_zero());
        }

        if to_bonded > to_not_bonded {
            self.not_bonded_tokens_to_bonded(ctx, to_bonded - to_not_bonded);
        } else if to_not_bonded > to_bonded {
            self.bonded_tokens_to_not_bonded(ctx, to_not_bonded - to_bonded);
        }

        if !updates.is_empty() {
            self.set_last_total_power(ctx, total_power);
        }
        debug!(module = "x/staking", updates = updates.len(), "validator set updated");
        Ok(updates)
    }

    fn bond_validator(
        &self,
        ctx: &mut Context<'_>,
        mut v: Validator,
    ) -> Result<Validator, StakingError> {
        self.delete_validator_by_power_index(ctx, &v);
        // drop any pending unbonding slot before the status overwrites its coordinates
        self.delete_validator_queue(ctx, &v);
        v.update_status(BondStatus::Bonded);
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);

        let cons = v.cons_address();
        let op = v.operator_address.clone();
        self.call_hook(ctx, |h, c| h.after_validator_bonded(c, &cons, &op))?;
        info!(module = "x/staking", validator = %op, "validator bonded");
        Ok(v)
    }

    fn begin_unbonding_validator(
        &self,
        ctx: &mut Context<'_>,
        mut v: Validator,
    ) -> Result<Validator, StakingError> {
        self.delete_validator_by_power_index(ctx, &v);
        v.update_status(BondStatus::Unbonding);
        v.unbonding_time = ctx.block_time() + self.params(ctx).unbonding_time;
        v.unbonding_height = ctx.block_height();
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);
        self.insert_unbonding_validator_queue(ctx, &v);

        let cons = v.cons_address();
        let op = v.operator_address.clone();
        self.call_hook(ctx, |h, c| h.after_validator_begin_unbonding(c, &cons, &op))?;
        info!(
            module = "x/staking",
            validator = %op,
            unbonding_time = %v.unbonding_time,
            "validator began unbonding"
        );
        Ok(v)
    }

    /// End-of-block work: set updates, matured validators, unbondings and redelegations.
    pub fn block_validator_updates(
        &self,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<ValidatorUpdate>, StakingError> {
        let updates = self.apply_and_return_validator_set_updates(ctx)?;
        self.unbond_all_mature_validators(ctx)?;

        let now = ctx.block_time();
        let denom = self.bond_denom(ctx);
        for pair in self.dequeue_all_mature_ubd_queue(ctx, now) {
            let (del, val) = (&pair.delegator_address, &pair.validator_address);
            // already completed through an earlier queue slot
            let Ok(amount) = self.complete_unbonding(ctx, del, val) else {
                continue;
            };
            ctx.emit(
                Event::new("complete_unbonding")
                    .attr("amount", Coin::new(denom.clone(), amount))
                    .attr("validator", val)
                    .attr("delegator", del),
            );
        }
        for t in self.dequeue_all_mature_redelegation_queue(ctx, now) {
            let (del, src, dst) = (
                &t.delegator_address,
                &t.validator_src_address,
                &t.validator_dst_address,
            );
            let Ok(amount) = self.complete_redelegation(ctx, del, src, dst) else {
                continue;
            };
            ctx.emit(
                Event::new("complete_redelegation")
                    .attr("amount", Coin::new(denom.clone(), amount))
                    .attr("delegator", del)
                    .attr("source_validator", src)
                    .attr("destination_validator", dst),
            );
        }
        Ok(updates)
    }
}
