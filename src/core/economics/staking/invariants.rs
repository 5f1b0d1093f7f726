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

//! Staking invariants registered with the crisis engine.

use super::keeper::{Keeper, MODULE_NAME};
use super::keys;
use super::types::BondStatus;
use crate::core::context::Context;
use crate::core::math::{Dec, Int};
use crate::core::runtime::crisis::{format_invariant, CrisisError, CrisisKeeper, Invariant};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Register every staking invariant under module `staking`.
pub fn register_invariants(crisis: &mut CrisisKeeper, k: &Keeper) -> Result<(), CrisisError> {
    let routes: [(&str, fn(&Keeper, &mut Context<'_>) -> (String, bool)); 4] = [
        ("module-accounts", module_accounts_invariant),
        ("nonnegative-power", non_negative_power_invariant),
        ("positive-delegation", positive_delegation_invariant),
        ("delegator-shares", delegator_shares_invariant),
    ];
    for (route, check) in routes {
        let k = k.clone();
        let invar: Invariant = Arc::new(move |ctx: &mut Context<'_>| check(&k, ctx));
        crisis.register_route(MODULE_NAME, route, invar)?;
    }
    Ok(())
}

/// Pool balances equal the tokens the records say they hold.
pub fn module_accounts_invariant(k: &Keeper, ctx: &mut Context<'_>) -> (String, bool) {
    let mut bonded = Int::zero();
    let mut not_bonded = Int::zero();
    for v in k.get_all_validators(ctx) {
        match v.status {
            BondStatus::Bonded => bonded += v.tokens,
            BondStatus::Unbonding | BondStatus::Unbonded => not_bonded += v.tokens,
        }
    }
    for ubd in k.get_all_unbonding_delegations(ctx) {
        for e in &ubd.entries {
            not_bonded += e.balance;
        }
    }

    let pool_bonded = k.total_bonded_tokens(ctx);
    let pool_not_bonded = k.total_not_bonded_tokens(ctx);
    let broken = pool_bonded != bonded || pool_not_bonded != not_bonded;

    let msg = format!(
        "\tPool's bonded tokens: {pool_bonded}\n\
         \tsum of bonded tokens: {bonded}\n\
         not bonded token invariance:\n\
         \tPool's not bonded tokens: {pool_not_bonded}\n\
         \tsum of not bonded tokens: {not_bonded}\n\
         module accounts total (bonded + not bonded):\n\
         \tModule Accounts' tokens: {}\n\
         \tsum tokens:              {}\n",
        pool_bonded + pool_not_bonded,
        bonded + not_bonded,
    );
    (
        format_invariant(
            MODULE_NAME,
            "bonded and not bonded module account coins",
            &msg,
        ),
        broken,
    )
}

/// Every power index entry matches its validator's current power, and no jailed
/// validator is indexed while every other one is.
pub fn non_negative_power_invariant(k: &Keeper, ctx: &mut Context<'_>) -> (String, bool) {
    let pr = k.power_reduction();
    let mut msg = String::new();
    let mut broken = false;

    let index = k.power_index_desc(ctx);
    for (key, addr) in &index {
        let Some(v) = k.get_validator(ctx, addr) else {
            broken = true;
            let _ = writeln!(msg, "\tpower index entry for missing validator: {addr}");
            continue;
        };
        let expected = keys::validators_by_power_index_key(&v, pr);
        if key != &expected {
            broken = true;
            let _ = write!(
                msg,
                "power store invariance:\n\tvalidator.Power: {}\n\tkey should be: {}\n\tkey in store: {}\n",
                v.potential_consensus_power(pr),
                hex::encode(&expected),
                hex::encode(key),
            );
        }
        if v.jailed {
            broken = true;
            let _ = writeln!(msg, "\tjailed validator in power index: {addr}");
        }
    }

    let indexed: Vec<_> = index.iter().map(|(_, a)| a.clone()).collect();
    for v in k.get_all_validators(ctx) {
        if !v.jailed && !indexed.contains(&v.operator_address) {
            broken = true;
            let _ = writeln!(msg, "\tvalidator missing from power index: {}", v.operator_address);
        }
    }

    (
        format_invariant(
            MODULE_NAME,
            "nonnegative power",
            &format!("found invalid validator powers\n{msg}"),
        ),
        broken,
    )
}

/// No delegation holds zero shares.
pub fn positive_delegation_invariant(k: &Keeper, ctx: &mut Context<'_>) -> (String, bool) {
    let mut msg = String::new();
    let mut count = 0usize;
    for d in k.get_all_delegations(ctx) {
        if d.shares.is_zero() {
            count += 1;
            let _ = writeln!(msg, "\tdelegation with zero shares: {d:?}");
        }
    }
    (
        format_invariant(
            MODULE_NAME,
            "positive delegations",
            &format!("{count} invalid delegations found\n{msg}"),
        ),
        count != 0,
    )
}

/// Delegations to a validator sum to its `delegator_shares`.
pub fn delegator_shares_invariant(k: &Keeper, ctx: &mut Context<'_>) -> (String, bool) {
    let mut sums: BTreeMap<_, Dec> = BTreeMap::new();
    for d in k.get_all_delegations(ctx) {
        *sums.entry(d.validator_address).or_default() += d.shares;
    }
    let mut msg = String::new();
    let mut broken = false;
    for v in k.get_all_validators(ctx) {
        let calc = sums.get(&v.operator_address).copied().unwrap_or_default();
        if calc != v.delegator_shares {
            broken = true;
            let _ = write!(
                msg,
                "broken delegator shares invariance:\n\tvalidator.DelegatorShares: {}\n\tsum of Delegator.Shares: {calc}\n",
                v.delegator_shares,
            );
        }
    }
    (format_invariant(MODULE_NAME, "delegator shares", &msg), broken)
}
