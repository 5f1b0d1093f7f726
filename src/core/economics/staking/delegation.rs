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

//! Delegations, unbonding delegations and redelegations.
//!
//! Token flow between the delegator account and the two pools follows the
//! validator's status: tokens behind a bonded validator sit in the bonded
//! pool, everything else in the not-bonded pool.

use super::errors::StakingError;
use super::hooks::StakingHooks;
use super::keeper::{Keeper, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use super::keys;
use super::types::{
    BondStatus, Delegation, DvPair, DvvTriplet, Redelegation, RedelegationEntry,
    UnbondingDelegation, Validator,
};
use crate::core::context::Context;
use crate::core::math::{Dec, Int};
use crate::core::types::{must_decode, must_encode, AccAddress, Coin, Timestamp, ValAddress};
use tracing::debug;

/// Key just above `key` in byte order; bounds an inclusive scan.
fn inclusive_end(key: Vec<u8>) -> Vec<u8> {
    let mut k = key;
    k.push(0);
    k
}

impl Keeper {
    // --- delegation records ---

    /// Delegation of `del` to `val`.
    pub fn get_delegation(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Option<Delegation> {
        ctx.kv_get(&self.store_key, &keys::delegation_key(del, val))
            .map(|b| must_decode(&b, "delegation"))
    }

    /// Write a delegation record.
    pub fn set_delegation(&self, ctx: &mut Context<'_>, d: &Delegation) {
        ctx.kv_set(
            &self.store_key,
            &keys::delegation_key(&d.delegator_address, &d.validator_address),
            must_encode(d),
        );
    }

    /// Delete a delegation record after the removal hook accepts it.
    pub fn remove_delegation(
        &self,
        ctx: &mut Context<'_>,
        d: &Delegation,
    ) -> Result<(), StakingError> {
        let (del, val) = (&d.delegator_address, &d.validator_address);
        self.call_hook(ctx, |h, c| h.before_delegation_removed(c, del, val))?;
        ctx.kv_delete(&self.store_key, &keys::delegation_key(del, val));
        Ok(())
    }

    /// Every delegation, ordered by (delegator, validator).
    pub fn get_all_delegations(&self, ctx: &Context<'_>) -> Vec<Delegation> {
        ctx.kv_prefix(&self.store_key, &[keys::DELEGATION_KEY])
            .into_iter()
            .map(|(_, v)| must_decode(&v, "delegation"))
            .collect()
    }

    /// Delegations to one validator.
    pub fn get_validator_delegations(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Vec<Delegation> {
        self.get_all_delegations(ctx)
            .into_iter()
            .filter(|d| &d.validator_address == val)
            .collect()
    }

    /// Delegations of one delegator, at most `max`.
    pub fn get_delegator_delegations(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        max: usize,
    ) -> Vec<Delegation> {
        ctx.kv_prefix(&self.store_key, &keys::delegations_key(del))
            .into_iter()
            .take(max)
            .map(|(_, v)| must_decode(&v, "delegation"))
            .collect()
    }

    // --- unbonding delegation records ---

    /// Unbonding delegation of `del` from `val`.
    pub fn get_unbonding_delegation(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Option<UnbondingDelegation> {
        ctx.kv_get(&self.store_key, &keys::ubd_key(del, val))
            .map(|b| must_decode(&b, "unbonding delegation"))
    }

    /// Write an unbonding delegation and its by-validator index.
    pub fn set_unbonding_delegation(&self, ctx: &mut Context<'_>, ubd: &UnbondingDelegation) {
        let (del, val) = (&ubd.delegator_address, &ubd.validator_address);
        ctx.kv_set(&self.store_key, &keys::ubd_key(del, val), must_encode(ubd));
        ctx.kv_set(&self.store_key, &keys::ubd_by_val_index_key(del, val), Vec::new());
    }

    /// Delete an unbonding delegation and its index.
    pub fn remove_unbonding_delegation(&self, ctx: &mut Context<'_>, ubd: &UnbondingDelegation) {
        let (del, val) = (&ubd.delegator_address, &ubd.validator_address);
        ctx.kv_delete(&self.store_key, &keys::ubd_key(del, val));
        ctx.kv_delete(&self.store_key, &keys::ubd_by_val_index_key(del, val));
    }

    /// Add (or merge) an entry, creating the record if needed.
    pub fn set_unbonding_delegation_entry(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
        creation_height: i64,
        completion_time: Timestamp,
        balance: Int,
    ) -> UnbondingDelegation {
        let mut ubd = self
            .get_unbonding_delegation(ctx, del, val)
            .unwrap_or_else(|| UnbondingDelegation::new(del.clone(), val.clone()));
        ubd.add_entry(creation_height, completion_time, balance);
        self.set_unbonding_delegation(ctx, &ubd);
        ubd
    }

    /// Every unbonding delegation.
    pub fn get_all_unbonding_delegations(&self, ctx: &Context<'_>) -> Vec<UnbondingDelegation> {
        ctx.kv_prefix(&self.store_key, &[keys::UNBONDING_DELEGATION_KEY])
            .into_iter()
            .map(|(_, v)| must_decode(&v, "unbonding delegation"))
            .collect()
    }

    /// Unbonding delegations from one validator.
    pub fn get_unbonding_delegations_from_validator(
        &self,
        ctx: &Context<'_>,
        val: &ValAddress,
    ) -> Vec<UnbondingDelegation> {
        ctx.kv_prefix(&self.store_key, &keys::ubds_by_val_key(val))
            .into_iter()
            .filter_map(|(k, _)| keys::parse_ubd_by_val_index_key(&k))
            .filter_map(|(del, val)| self.get_unbonding_delegation(ctx, &del, &val))
            .collect()
    }

    /// True if the pair already holds `max_entries` unbonding entries.
    pub fn has_max_unbonding_delegation_entries(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> bool {
        let max = self.params(ctx).max_entries as usize;
        self.get_unbonding_delegation(ctx, del, val)
            .is_some_and(|u| u.entries.len() >= max)
    }

    // --- redelegation records ---

    /// Redelegation of `del` from `src` to `dst`.
    pub fn get_redelegation(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Option<Redelegation> {
        ctx.kv_get(&self.store_key, &keys::red_key(del, src, dst))
            .map(|b| must_decode(&b, "redelegation"))
    }

    /// Write a redelegation and both its indices.
    pub fn set_redelegation(&self, ctx: &mut Context<'_>, red: &Redelegation) {
        let (del, src, dst) = (
            &red.delegator_address,
            &red.validator_src_address,
            &red.validator_dst_address,
        );
        ctx.kv_set(&self.store_key, &keys::red_key(del, src, dst), must_encode(red));
        ctx.kv_set(&self.store_key, &keys::red_by_val_src_index_key(del, src, dst), Vec::new());
        ctx.kv_set(&self.store_key, &keys::red_by_val_dst_index_key(del, src, dst), Vec::new());
    }

    /// Delete a redelegation and both its indices.
    pub fn remove_redelegation(&self, ctx: &mut Context<'_>, red: &Redelegation) {
        let (del, src, dst) = (
            &red.delegator_address,
            &red.validator_src_address,
            &red.validator_dst_address,
        );
        ctx.kv_delete(&self.store_key, &keys::red_key(del, src, dst));
        ctx.kv_delete(&self.store_key, &keys::red_by_val_src_index_key(del, src, dst));
        ctx.kv_delete(&self.store_key, &keys::red_by_val_dst_index_key(del, src, dst));
    }

    /// Append an entry, creating the record if needed.
    #[allow(clippy::too_many_arguments)]
    pub fn set_redelegation_entry(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        creation_height: i64,
        completion_time: Timestamp,
        balance: Int,
        shares_dst: Dec,
    ) -> Redelegation {
        let mut red = self
            .get_redelegation(ctx, del, src, dst)
            .unwrap_or_else(|| Redelegation::new(del.clone(), src.clone(), dst.clone()));
        red.entries.push(RedelegationEntry {
            creation_height,
            completion_time,
            initial_balance: balance,
            shares_dst,
        });
        self.set_redelegation(ctx, &red);
        red
    }

    /// Every redelegation.
    pub fn get_all_redelegations(&self, ctx: &Context<'_>) -> Vec<Redelegation> {
        ctx.kv_prefix(&self.store_key, &[keys::REDELEGATION_KEY])
            .into_iter()
            .map(|(_, v)| must_decode(&v, "redelegation"))
            .collect()
    }

    /// Redelegations out of one source validator.
    pub fn get_redelegations_from_src_validator(
        &self,
        ctx: &Context<'_>,
        src: &ValAddress,
    ) -> Vec<Redelegation> {
        ctx.kv_prefix(&self.store_key, &keys::reds_from_val_src_index_key(src))
            .into_iter()
            .filter_map(|(k, _)| keys::parse_red_by_val_src_index_key(&k))
            .filter_map(|(del, src, dst)| self.get_redelegation(ctx, &del, &src, &dst))
            .collect()
    }

    /// True if `del` has a pending redelegation whose destination is `dst`.
    pub fn has_receiving_redelegation(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        dst: &ValAddress,
    ) -> bool {
        !ctx.kv_prefix(&self.store_key, &keys::reds_to_val_dst_by_delegator_key(dst, del))
            .is_empty()
    }

    /// True if the triple already holds `max_entries` redelegation entries.
    pub fn has_max_redelegation_entries(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> bool {
        let max = self.params(ctx).max_entries as usize;
        self.get_redelegation(ctx, del, src, dst)
            .is_some_and(|r| r.entries.len() >= max)
    }

    // --- time queues ---

    /// Queue an unbonding delegation pair for `completion_time`.
    pub fn insert_ubd_queue(
        &self,
        ctx: &mut Context<'_>,
        ubd: &UnbondingDelegation,
        completion_time: Timestamp,
    ) {
        let key = keys::ubd_queue_key(completion_time);
        let mut pairs: Vec<DvPair> = ctx
            .kv_get(&self.store_key, &key)
            .map(|b| must_decode(&b, "unbonding queue"))
            .unwrap_or_default();
        pairs.push(DvPair {
            delegator_address: ubd.delegator_address.clone(),
            validator_address: ubd.validator_address.clone(),
        });
        ctx.kv_set(&self.store_key, &key, must_encode(&pairs));
    }

    /// Pop every pair queued at or before `now`.
    pub fn dequeue_all_mature_ubd_queue(
        &self,
        ctx: &mut Context<'_>,
        now: Timestamp,
    ) -> Vec<DvPair> {
        let end = inclusive_end(keys::ubd_queue_key(now));
        let mut out = Vec::new();
        for (k, v) in ctx.kv_range(&self.store_key, &[keys::UNBONDING_QUEUE_KEY], &end) {
            out.extend(must_decode::<Vec<DvPair>>(&v, "unbonding queue"));
            ctx.kv_delete(&self.store_key, &k);
        }
        out
    }

    /// Queue a redelegation triple for `completion_time`.
    pub fn insert_redelegation_queue(
        &self,
        ctx: &mut Context<'_>,
        red: &Redelegation,
        completion_time: Timestamp,
    ) {
        let key = keys::red_queue_key(completion_time);
        let mut triplets: Vec<DvvTriplet> = ctx
            .kv_get(&self.store_key, &key)
            .map(|b| must_decode(&b, "redelegation queue"))
            .unwrap_or_default();
        triplets.push(DvvTriplet {
            delegator_address: red.delegator_address.clone(),
            validator_src_address: red.validator_src_address.clone(),
            validator_dst_address: red.validator_dst_address.clone(),
        });
        ctx.kv_set(&self.store_key, &key, must_encode(&triplets));
    }

    /// Pop every triple queued at or before `now`.
    pub fn dequeue_all_mature_redelegation_queue(
        &self,
        ctx: &mut Context<'_>,
        now: Timestamp,
    ) -> Vec<DvvTriplet> {
        let end = inclusive_end(keys::red_queue_key(now));
        let mut out = Vec::new();
        for (k, v) in ctx.kv_range(&self.store_key, &[keys::REDELEGATION_QUEUE_KEY], &end) {
            out.extend(must_decode::<Vec<DvvTriplet>>(&v, "redelegation queue"));
            ctx.kv_delete(&self.store_key, &k);
        }
        out
    }

    // --- state transitions ---

    /// Delegate `bond_amt` tokens from `del` to `validator`; returns the shares issued.
    ///
    /// With `subtract_account` the tokens leave the delegator's account and
    /// `token_src` must not be `Bonded`. Without it the tokens already sit in the
    /// pool matching `token_src` and only move if the validator's pool differs.
    pub fn delegate(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        bond_amt: Int,
        token_src: BondStatus,
        validator: Validator,
        subtract_account: bool,
    ) -> Result<Dec, StakingError> {
        if validator.invalid_ex_rate() {
            return Err(StakingError::DelegatorShareExRateInvalid);
        }
        let val_addr = validator.operator_address.clone();
        let mut delegation = match self.get_delegation(ctx, del, &val_addr) {
            Some(d) => {
                self.call_hook(ctx, |h, c| h.before_delegation_shares_modified(c, del, &val_addr))?;
                d
            }
            None => {
                self.call_hook(ctx, |h, c| h.before_delegation_created(c, del, &val_addr))?;
                Delegation::new(del.clone(), val_addr.clone(), Dec::zero())
            }
        };

        if subtract_account {
            if token_src == BondStatus::Bonded {
                panic!("delegation token source cannot be bonded");
            }
            let pool = if validator.is_bonded() {
                BONDED_POOL_NAME
            } else {
                NOT_BONDED_POOL_NAME
            };
            let coin = Coin::new(self.bond_denom(ctx), bond_amt);
            self.bank
                .delegate_coins_from_account_to_module(ctx, del, pool, &coin)?;
        } else {
            match (token_src == BondStatus::Bonded, validator.is_bonded()) {
                (true, true) | (false, false) => {}
                (false, true) => self.not_bonded_tokens_to_bonded(ctx, bond_amt),
                (true, false) => self.bonded_tokens_to_not_bonded(ctx, bond_amt),
            }
        }

        let (_, new_shares) = self.add_validator_tokens_and_shares(ctx, validator, bond_amt);
        delegation.shares += new_shares;
        self.set_delegation(ctx, &delegation);
        self.call_hook(ctx, |h, c| h.after_delegation_modified(c, del, &val_addr))?;
        debug!(
            module = "x/staking",
            delegator = %del,
            validator = %val_addr,
            shares = %new_shares,
            "delegated"
        );
        Ok(new_shares)
    }

    /// Burn `shares` of `del`'s delegation to `val`; returns the tokens released.
    pub fn unbond(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
        shares: Dec,
    ) -> Result<Int, StakingError> {
        let Some(mut delegation) = self.get_delegation(ctx, del, val) else {
            return Err(StakingError::NoDelegatorForAddress);
        };
        self.call_hook(ctx, |h, c| h.before_delegation_shares_modified(c, del, val))?;
        if delegation.shares < shares {
            return Err(StakingError::NotEnoughDelegationShares);
        }
        let Some(mut validator) = self.get_validator(ctx, val) else {
            return Err(StakingError::NoValidatorFound);
        };

        delegation.shares -= shares;

        let is_operator = AccAddress::from(&validator.operator_address) == *del;
        if is_operator
            && !validator.jailed
            && validator.tokens_from_shares(delegation.shares).truncate_int()
                < validator.min_self_delegation
        {
            self.jail_validator(ctx, &validator)?;
            validator = self.must_get_validator(ctx, val);
        }

        if delegation.shares.is_zero() {
            self.remove_delegation(ctx, &delegation)?;
        } else {
            self.set_delegation(ctx, &delegation);
            self.call_hook(ctx, |h, c| h.after_delegation_modified(c, del, val))?;
        }

        let (validator, amount) = self.remove_validator_tokens_and_shares(ctx, validator, shares);
        if validator.delegator_shares.is_zero() && validator.is_unbonded() {
            self.remove_validator(ctx, val)?;
        }
        Ok(amount)
    }

    /// Start unbonding `shares`; returns (completion time, tokens).
    pub fn undelegate(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
        shares: Dec,
    ) -> Result<(Timestamp, Int), StakingError> {
        let Some(validator) = self.get_validator(ctx, val) else {
            return Err(StakingError::NoDelegatorForAddress);
        };
        if self.has_max_unbonding_delegation_entries(ctx, del, val) {
            return Err(StakingError::MaxUnbondingDelegationEntries);
        }
        let amount = self.unbond(ctx, del, val, shares)?;
        if validator.is_bonded() {
            self.bonded_tokens_to_not_bonded(ctx, amount);
        }
        let completion = ctx.block_time() + self.params(ctx).unbonding_time;
        let height = ctx.block_height();
        let ubd = self.set_unbonding_delegation_entry(ctx, del, val, height, completion, amount);
        self.insert_ubd_queue(ctx, &ubd, completion);
        Ok((completion, amount))
    }

    /// Pay out mature entries from the not-bonded pool; returns the amount paid.
    pub fn complete_unbonding(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Result<Int, StakingError> {
        let Some(mut ubd) = self.get_unbonding_delegation(ctx, del, val) else {
            return Err(StakingError::NoUnbondingDelegation);
        };
        let denom = self.bond_denom(ctx);
        let now = ctx.block_time();
        let mut paid = Int::zero();
        let mut kept = Vec::with_capacity(ubd.entries.len());
        for entry in std::mem::take(&mut ubd.entries) {
            if !entry.is_mature(now) {
                kept.push(entry);
                continue;
            }
            if !entry.balance.is_zero() {
                let coin = Coin::new(denom.clone(), entry.balance);
                self.bank.undelegate_coins_from_module_to_account(
                    ctx,
                    NOT_BONDED_POOL_NAME,
                    del,
                    &coin,
                )?;
                paid += entry.balance;
            }
        }
        ubd.entries = kept;
        if ubd.entries.is_empty() {
            self.remove_unbonding_delegation(ctx, &ubd);
        } else {
            self.set_unbonding_delegation(ctx, &ubd);
        }
        Ok(paid)
    }

    /// Completion time and height for a redelegation out of `src`; `true` if it completes now.
    fn get_begin_info(&self, ctx: &Context<'_>, src: &ValAddress) -> (Timestamp, i64, bool) {
        match self.get_validator(ctx, src) {
            None => (
                ctx.block_time() + self.params(ctx).unbonding_time,
                ctx.block_height(),
                false,
            ),
            Some(v) => match v.status {
                BondStatus::Bonded => (
                    ctx.block_time() + self.params(ctx).unbonding_time,
                    ctx.block_height(),
                    false,
                ),
                BondStatus::Unbonded => (Timestamp::ZERO, 0, true),
                BondStatus::Unbonding => (v.unbonding_time, v.unbonding_height, false),
            },
        }
    }

    /// Move `shares` from `src` to `dst`; returns the completion time.
    pub fn begin_redelegation(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
        shares: Dec,
    ) -> Result<Timestamp, StakingError> {
        if src == dst {
            return Err(StakingError::SelfRedelegation);
        }
        let Some(dst_validator) = self.get_validator(ctx, dst) else {
            return Err(StakingError::BadRedelegationDst);
        };
        let Some(src_validator) = self.get_validator(ctx, src) else {
            return Err(StakingError::BadRedelegationSrc);
        };
        // a redelegation whose tokens are still slashable at `src` cannot hop again
        if self.has_receiving_redelegation(ctx, del, src) {
            return Err(StakingError::TransitiveRedelegation);
        }
        if self.has_max_redelegation_entries(ctx, del, src, dst) {
            return Err(StakingError::MaxRedelegationEntries);
        }

        let returned = self.unbond(ctx, del, src, shares)?;
        if returned.is_zero() {
            return Err(StakingError::TinyRedelegationAmount);
        }
        let shares_created = self.delegate(
            ctx,
            del,
            returned,
            src_validator.status,
            dst_validator,
            false,
        )?;

        let (completion, height, complete_now) = self.get_begin_info(ctx, src);
        if complete_now {
            return Ok(completion);
        }
        let red = self.set_redelegation_entry(
            ctx,
            del,
            src,
            dst,
            height,
            completion,
            returned,
            shares_created,
        );
        self.insert_redelegation_queue(ctx, &red, completion);
        Ok(completion)
    }

    /// Drop mature redelegation entries; returns the initial balance they carried.
    pub fn complete_redelegation(
        &self,
        ctx: &mut Context<'_>,
        del: &AccAddress,
        src: &ValAddress,
        dst: &ValAddress,
    ) -> Result<Int, StakingError> {
        let Some(mut red) = self.get_redelegation(ctx, del, src, dst) else {
            return Err(StakingError::NoRedelegation);
        };
        let now = ctx.block_time();
        let mut moved = Int::zero();
        red.entries.retain(|e| {
            if e.is_mature(now) {
                moved += e.initial_balance;
                false
            } else {
                true
            }
        });
        if red.entries.is_empty() {
            self.remove_redelegation(ctx, &red);
        } else {
            self.set_redelegation(ctx, &red);
        }
        Ok(moved)
    }

    /// Shares corresponding to `amt` tokens of `del`'s delegation to `val`,
    /// capped at the delegation.
    pub fn validate_unbond_amount(
        &self,
        ctx: &Context<'_>,
        del: &AccAddress,
        val: &ValAddress,
        amt: Int,
    ) -> Result<Dec, StakingError> {
        let Some(validator) = self.get_validator(ctx, val) else {
            return Err(StakingError::NoValidatorFound);
        };
        let Some(delegation) = self.get_delegation(ctx, del, val) else {
            return Err(StakingError::NoDelegation);
        };
        if amt > validator.tokens {
            return Err(StakingError::InsufficientShares);
        }
        let shares = validator.shares_from_tokens(amt)?;
        let truncated = validator.shares_from_tokens_truncated(amt)?;
        if truncated > delegation.shares {
            return Err(StakingError::InsufficientShares);
        }
        Ok(if shares > delegation.shares {
            delegation.shares
        } else {
            shares
        })
    }
}
