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

//! Validator records, the power index, last-power bookkeeping and the unbonding queue.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::Keeper;
use super::keys;
use super::types::{BondStatus, Commission, Validator};
use crate::core::context::Context;
use crate::core::math::{Dec, Int};
use crate::core::types::{must_decode, must_encode, ConsAddress, Timestamp, ValAddress};
use tracing::info;

impl Keeper {
    /// Validator by operator address.
    pub fn get_validator(&self, ctx: &Context<'_>, addr: &ValAddress) -> Option<Validator> {
        ctx.kv_get(&self.store_key, &keys::validator_key(addr))
            .map(|b| must_decode(&b, "validator"))
    }

    pub(super) fn must_get_validator(&self, ctx: &Context<'_>, addr: &ValAddress) -> Validator {
        match self.get_validator(ctx, addr) {
            Some(v) => v,
            None => panic!("validator record not found for address: {addr}"),
        }
    }

    /// Validator by consensus address.
    pub fn get_validator_by_cons_addr(
        &self,
        ctx: &Context<'_>,
        cons: &ConsAddress,
    ) -> Option<Validator> {
        let op = ctx.kv_get(&self.store_key, &keys::validator_by_cons_addr_key(cons))?;
        self.get_validator(ctx, &ValAddress(op))
    }

    /// Write a validator record.
    pub fn set_validator(&self, ctx: &mut Context<'_>, v: &Validator) {
        ctx.kv_set(
            &self.store_key,
            &keys::validator_key(&v.operator_address),
            must_encode(v),
        );
    }

    /// Map the consensus address to the operator.
    pub fn set_validator_by_cons_addr(&self, ctx: &mut Context<'_>, v: &Validator) {
        ctx.kv_set(
            &self.store_key,
            &keys::validator_by_cons_addr_key(&v.cons_address()),
            v.operator_address.0.clone(),
        );
    }

    /// Index by power. Jailed validators are never indexed.
    pub fn set_validator_by_power_index(&self, ctx: &mut Context<'_>, v: &Validator) {
        if v.jailed {
            return;
        }
        ctx.kv_set(
            &self.store_key,
            &keys::validators_by_power_index_key(v, self.power_reduction()),
            v.operator_address.0.clone(),
        );
    }

    /// Drop the power index entry computed from `v`'s current tokens.
    pub fn delete_validator_by_power_index(&self, ctx: &mut Context<'_>, v: &Validator) {
        ctx.kv_delete(
            &self.store_key,
            &keys::validators_by_power_index_key(v, self.power_reduction()),
        );
    }

    /// Index a freshly created validator.
    pub fn set_new_validator_by_power_index(&self, ctx: &mut Context<'_>, v: &Validator) {
        self.set_validator_by_power_index(ctx, v);
    }

    /// Add delegated tokens, keeping the power index in step. Returns the shares issued.
    pub fn add_validator_tokens_and_shares(
        &self,
        ctx: &mut Context<'_>,
        mut v: Validator,
        tokens: Int,
    ) -> (Validator, Dec) {
        self.delete_validator_by_power_index(ctx, &v);
        let added = v.add_tokens_from_del(tokens);
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);
        (v, added)
    }

    /// Burn delegator shares, keeping the power index in step. Returns the tokens released.
    pub fn remove_validator_tokens_and_shares(
        &self,
        ctx: &mut Context<'_>,
        mut v: Validator,
        shares: Dec,
    ) -> (Validator, Int) {
        self.delete_validator_by_power_index(ctx, &v);
        let removed = v.remove_del_shares(shares);
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);
        (v, removed)
    }

    /// Remove tokens without touching shares, keeping the power index in step.
    pub fn remove_validator_tokens(
        &self,
        ctx: &mut Context<'_>,
        mut v: Validator,
        tokens: Int,
    ) -> Validator {
        self.delete_validator_by_power_index(ctx, &v);
        v.remove_tokens(tokens);
        self.set_validator(ctx, &v);
        self.set_validator_by_power_index(ctx, &v);
        v
    }

    /// Commission after a rate change at the current block time.
    pub fn update_validator_commission(
        &self,
        ctx: &Context<'_>,
        v: &Validator,
        new_rate: Dec,
    ) -> Result<Commission, StakingError> {
        let mut commission = v.commission.clone();
        let now = ctx.block_time();
        commission.validate_new_rate(new_rate, now)?;
        if new_rate < self.params(ctx).min_commission_rate {
            return Err(StakingError::CommissionLtMinRate);
        }
        commission.rates.rate = new_rate;
        commission.update_time = now;
        Ok(commission)
    }

    /// Delete an unbonded, empty validator and its indices.
    pub fn remove_validator(
        &self,
        ctx: &mut Context<'_>,
        addr: &ValAddress,
    ) -> Result<(), StakingError> {
        let Some(v) = self.get_validator(ctx, addr) else {
            return Ok(());
        };
        if !v.is_unbonded() {
            return Err(StakingError::BadRemoveValidator(
                "cannot call RemoveValidator on bonded or unbonding validators".into(),
            ));
        }
        if !v.tokens.is_zero() {
            return Err(StakingError::BadRemoveValidator(
                "attempting to remove a validator which still contains tokens".into(),
            ));
        }
        let cons = v.cons_address();
        ctx.kv_delete(&self.store_key, &keys::validator_key(addr));
        ctx.kv_delete(&self.store_key, &keys::validator_by_cons_addr_key(&cons));
        self.delete_validator_by_power_index(ctx, &v);
        info!(module = "x/staking", validator = %addr, "validator removed");
        self.call_hook(ctx, |h, c| h.after_validator_removed(c, &cons, addr))
    }

    /// Every validator, ordered by operator address.
    pub fn get_all_validators(&self, ctx: &Context<'_>) -> Vec<Validator> {
        ctx.kv_prefix(&self.store_key, &[keys::VALIDATORS_KEY])
            .into_iter()
            .map(|(_, v)| must_decode(&v, "validator"))
            .collect()
    }

    /// Visit validators in operator order until `f` returns true.
    pub fn iterate_validators(
        &self,
        ctx: &Context<'_>,
        mut f: impl FnMut(usize, &Validator) -> bool,
    ) {
        for (i, v) in self.get_all_validators(ctx).iter().enumerate() {
            if f(i, v) {
                break;
            }
        }
    }

    /// Power index entries, highest power first (raw keys, namespace stripped).
    pub(super) fn power_index_desc(&self, ctx: &Context<'_>) -> Vec<(Vec<u8>, ValAddress)> {
        ctx.kv_prefix(&self.store_key, &[keys::VALIDATORS_BY_POWER_INDEX_KEY])
            .into_iter()
            .rev()
            .map(|(k, v)| (k, ValAddress(v)))
            .collect()
    }

    /// Visit bonded validators by descending power, at most `max_validators`,
    /// until `f` returns true.
    pub fn iterate_bonded_validators_by_power(
        &self,
        ctx: &Context<'_>,
        mut f: impl FnMut(usize, &Validator) -> bool,
    ) {
        let max = self.params(ctx).max_validators as usize;
        let mut i = 0usize;
        for (_, addr) in self.power_index_desc(ctx) {
            if i >= max {
                break;
            }
            let v = self.must_get_validator(ctx, &addr);
            if v.is_bonded() {
                if f(i, &v) {
                    break;
                }
                i += 1;
            }
        }
    }

    /// Bonded validators by descending power, at most `max_validators`.
    pub fn get_bonded_validators_by_power(&self, ctx: &Context<'_>) -> Vec<Validator> {
        let mut out = Vec::new();
        self.iterate_bonded_validators_by_power(ctx, |_, v| {
            out.push(v.clone());
            false
        });
        out
    }

    /// Power recorded for the last validator set, if the validator was in it.
    pub fn get_last_validator_power(&self, ctx: &Context<'_>, op: &ValAddress) -> Option<i64> {
        ctx.kv_get(&self.store_key, &keys::last_validator_power_key(op))
            .map(|b| must_decode(&b, "last validator power"))
    }

    pub(super) fn set_last_validator_power(
        &self,
        ctx: &mut Context<'_>,
        op: &ValAddress,
        power: i64,
    ) {
        ctx.kv_set(
            &self.store_key,
            &keys::last_validator_power_key(op),
            must_encode(&power),
        );
    }

    pub(super) fn delete_last_validator_power(&self, ctx: &mut Context<'_>, op: &ValAddress) {
        ctx.kv_delete(&self.store_key, &keys::last_validator_power_key(op));
    }

    /// Every (operator, power) of the last validator set.
    pub fn get_last_validator_powers(&self, ctx: &Context<'_>) -> Vec<(ValAddress, i64)> {
        ctx.kv_prefix(&self.store_key, &[keys::LAST_VALIDATOR_POWER_KEY])
            .into_iter()
            .filter_map(|(k, v)| {
                let addr = keys::address_from_last_validator_power_key(&k)?;
                Some((addr, must_decode::<i64>(&v, "last validator power")))
            })
            .collect()
    }

    /// Validators of the last set.
    pub fn get_last_validators(&self, ctx: &Context<'_>) -> Vec<Validator> {
        self.get_last_validator_powers(ctx)
            .into_iter()
            .map(|(addr, _)| self.must_get_validator(ctx, &addr))
            .collect()
    }

    /// Total power of the last set.
    pub fn get_last_total_power(&self, ctx: &Context<'_>) -> Int {
        ctx.kv_get(&self.store_key, &[keys::LAST_TOTAL_POWER_KEY])
            .map(|b| must_decode(&b, "last total power"))
            .unwrap_or_default()
    }

    pub(super) fn set_last_total_power(&self, ctx: &mut Context<'_>, power: Int) {
        ctx.kv_set(&self.store_key, &[keys::LAST_TOTAL_POWER_KEY], must_encode(&power));
    }

    fn get_unbonding_validators(&self, ctx: &Context<'_>, t: Timestamp, h: i64) -> Vec<ValAddress> {
        ctx.kv_get(&self.store_key, &keys::validator_queue_key(t, h))
            .map(|b| must_decode(&b, "validator queue"))
            .unwrap_or_default()
    }

    fn set_unbonding_validators_queue(
        &self,
        ctx: &mut Context<'_>,
        t: Timestamp,
        h: i64,
        addrs: &[ValAddress],
    ) {
        let key = keys::validator_queue_key(t, h);
        if addrs.is_empty() {
            ctx.kv_delete(&self.store_key, &key);
        } else {
            ctx.kv_set(&self.store_key, &key, must_encode(&addrs.to_vec()));
        }
    }

    /// Append to the unbonding queue slot for the validator's unbonding time and height.
    pub fn insert_unbonding_validator_queue(&self, ctx: &mut Context<'_>, v: &Validator) {
        let mut addrs = self.get_unbonding_validators(ctx, v.unbonding_time, v.unbonding_height);
        addrs.push(v.operator_address.clone());
        self.set_unbonding_validators_queue(ctx, v.unbonding_time, v.unbonding_height, &addrs);
    }

    /// Remove from the unbonding queue slot for the validator's unbonding time and height.
    pub fn delete_validator_queue(&self, ctx: &mut Context<'_>, v: &Validator) {
        let mut addrs = self.get_unbonding_validators(ctx, v.unbonding_time, v.unbonding_height);
        addrs.retain(|a| a != &v.operator_address);
        self.set_unbonding_validators_queue(ctx, v.unbonding_time, v.unbonding_height, &addrs);
    }

    /// Move every matured unbonding validator to Unbonded; remove those left without shares.
    pub fn unbond_all_mature_validators(&self, ctx: &mut Context<'_>) -> Result<(), StakingError> {
        let now = ctx.block_time();
        let height = ctx.block_height();
        let end = keys::validator_queue_key(now, i64::MAX);
        let start = [keys::VALIDATOR_QUEUE_KEY];
        let mut end_excl = end.clone();
        end_excl.push(0);
        for (key, value) in ctx.kv_range(&self.store_key, &start, &end_excl) {
            let Some((t, h)) = keys::parse_validator_queue_key(&key) else {
                continue;
            };
            if t > now || h > height {
                continue;
            }
            let addrs: Vec<ValAddress> = must_decode(&value, "validator queue");
            for addr in addrs {
                let v = self.must_get_validator(ctx, &addr);
                if !v.is_unbonding() {
                    panic!("unexpected validator in unbonding queue; status was not unbonding");
                }
                let v = self.unbonding_to_unbonded(ctx, v);
                if v.delegator_shares.is_zero() {
                    self.remove_validator(ctx, &v.operator_address)?;
                }
            }
            ctx.kv_delete(&self.store_key, &key);
        }
        Ok(())
    }

    /// Unbonding -> Unbonded.
    pub(super) fn unbonding_to_unbonded(&self, ctx: &mut Context<'_>, v: Validator) -> Validator {
        if !v.is_unbonding() {
            panic!("bad state transition unbondingToUnbonded, validator: {}", v.operator_address);
        }
        self.complete_unbonding_validator(ctx, v)
    }

    fn complete_unbonding_validator(&self, ctx: &mut Context<'_>, mut v: Validator) -> Validator {
        v.update_status(BondStatus::Unbonded);
        self.set_validator(ctx, &v);
        info!(module = "x/staking", validator = %v.operator_address, "validator unbonded");
        v
    }
}
