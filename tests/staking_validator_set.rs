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

mod common;

use std::time::Duration;

use amunchain_modules::core::bank::module_address;
use amunchain_modules::core::economics::staking::{
    BondStatus, CommissionRates, Description, MsgCreateValidator, MsgEditValidator,
    MsgUndelegate, MsgUpdateParams, StakingError, DO_NOT_MODIFY_DESC,
};
use amunchain_modules::core::math::{Dec, Int};
use amunchain_modules::core::runtime::app::{Msg, TxError};
use amunchain_modules::core::types::ConsAddress;
use common::*;

fn two_validators(max_validators: u32) -> TestChain {
    let mut gs = funded(&[(acc(1), 100), (acc(2), 300)]);
    gs.staking.params.max_validators = max_validators;
    let mut chain = TestChain::new(config(), &gs);
    chain
        .deliver(vec![create_validator_msg(1, 100), create_validator_msg(2, 300)])
        .unwrap();
    chain
}

#[test]
fn active_set_follows_power_after_slash() {
    let mut chain = two_validators(1);
    let updates = chain.next_block();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].pub_key, pubkey(2));
    assert_eq!(updates[0].power, 300);

    chain.with_ctx(|app, ctx| {
        let bonded = app.staking().get_last_validators(ctx);
        assert_eq!(bonded.len(), 1);
        assert_eq!(bonded[0].operator_address, val(2));
        let height = ctx.block_height();
        let burned = app
            .staking()
            .slash(ctx, &pubkey(2).cons_address(), height, 300, Dec::percent(75))
            .unwrap();
        assert_eq!(burned, Int::from_u64(225));
    });

    let updates = chain.next_block();
    assert_eq!(updates.len(), 2);
    chain.with_ctx(|app, ctx| {
        let bonded = app.staking().get_last_validators(ctx);
        assert_eq!(bonded.len(), 1);
        assert_eq!(bonded[0].operator_address, val(1));
        let v2 = app.staking().get_validator(ctx, &val(2)).unwrap();
        assert_eq!(v2.status, BondStatus::Unbonding);
        assert_eq!(v2.tokens, Int::from_u64(75));
        app.crisis().check_invariants(ctx).unwrap();
    });
    assert_eq!(chain.metrics.bonded_validators.get(), 1);
    assert_eq!(chain.metrics.validators_slashed_total.get(), 1);
}

#[test]
fn commission_below_minimum_is_rejected_without_writes() {
    let mut gs = funded(&[(acc(1), 100)]);
    gs.staking.params.min_commission_rate = Dec::percent(5);
    let mut chain = TestChain::new(config(), &gs);

    let msg = Msg::CreateValidator(MsgCreateValidator {
        description: Description::with_moniker("cheap"),
        commission: CommissionRates::new(Dec::percent(1), Dec::percent(20), Dec::percent(1)),
        min_self_delegation: Int::from_u64(1),
        validator_address: val(1),
        pubkey: pubkey(1),
        value: coin(100),
    });
    let err = chain.deliver(vec![msg]).unwrap_err();
    assert!(matches!(err, TxError::Staking(StakingError::CommissionLtMinRate)));

    assert_eq!(chain.balance(&acc(1)), Int::from_u64(100));
    chain.with_ctx(|app, ctx| {
        assert!(app.staking().get_validator(ctx, &val(1)).is_none());
        assert!(app.staking().get_all_validators(ctx).is_empty());
        assert!(app
            .staking()
            .get_validator_by_cons_addr(ctx, &pubkey(1).cons_address())
            .is_none());
    });
}

#[test]
fn create_validator_emits_event_and_rejects_duplicates() {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 200)]));
    let res = chain.deliver(vec![create_validator_msg(1, 100)]).unwrap();
    let ev = res
        .events
        .iter()
        .find(|e| e.kind == "create_validator")
        .unwrap();
    assert_eq!(ev.get("validator"), Some(val(1).to_string().as_str()));
    assert_eq!(ev.get("amount"), Some("100stake"));

    let err = chain.deliver(vec![create_validator_msg(1, 100)]).unwrap_err();
    assert!(matches!(err, TxError::Staking(StakingError::ValidatorOwnerExists)));
}

#[test]
fn jail_and_unjail_restore_the_record() {
    let mut chain = two_validators(10);
    chain.next_block();

    chain.with_ctx(|app, ctx| {
        let cons = pubkey(1).cons_address();
        let before = app.staking().get_validator(ctx, &val(1)).unwrap();
        let order_before: Vec<_> = app
            .staking()
            .get_bonded_validators_by_power(ctx)
            .into_iter()
            .map(|v| v.operator_address)
            .collect();

        app.staking().jail(ctx, &cons).unwrap();
        assert!(app.staking().get_validator(ctx, &val(1)).unwrap().jailed);
        assert!(matches!(
            app.staking().jail(ctx, &cons),
            Err(StakingError::ValidatorAlreadyJailed)
        ));

        app.staking().unjail(ctx, &cons).unwrap();
        assert_eq!(app.staking().get_validator(ctx, &val(1)).unwrap(), before);
        let order_after: Vec<_> = app
            .staking()
            .get_bonded_validators_by_power(ctx)
            .into_iter()
            .map(|v| v.operator_address)
            .collect();
        assert_eq!(order_after, order_before);

        assert!(matches!(
            app.staking().unjail(ctx, &cons),
            Err(StakingError::ValidatorNotJailed)
        ));
        assert!(matches!(
            app.staking().jail(ctx, &ConsAddress(vec![7; 20])),
            Err(StakingError::NoValidatorFound)
        ));
    });
}

#[test]
fn jailed_validator_leaves_the_active_set() {
    let mut chain = two_validators(10);
    chain.next_block();
    chain.with_ctx(|app, ctx| app.staking().jail(ctx, &pubkey(2).cons_address()).unwrap());
    let updates = chain.next_block();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].pub_key, pubkey(2));
    assert_eq!(updates[0].power, 0);
    assert_eq!(chain.metrics.validators_jailed.get(), 1);
}

#[test]
fn slash_edge_cases() {
    let mut chain = two_validators(10);
    chain.next_block();
    chain.with_ctx(|app, ctx| {
        let height = ctx.block_height();
        let k = app.staking();

        // unknown validator: nothing burned, no hook
        let burned = k
            .slash(ctx, &ConsAddress(vec![7; 20]), height, 100, Dec::percent(50))
            .unwrap();
        assert!(burned.is_zero());

        // zero fraction is a no-op
        let burned = k
            .slash(ctx, &pubkey(1).cons_address(), height, 100, Dec::zero())
            .unwrap();
        assert!(burned.is_zero());
        assert_eq!(k.get_validator(ctx, &val(1)).unwrap().tokens, Int::from_u64(100));

        // future infraction
        assert!(matches!(
            k.slash(ctx, &pubkey(1).cons_address(), height + 1, 100, Dec::percent(10)),
            Err(StakingError::FutureInfraction { .. })
        ));

        // fraction above one clamps to the validator's tokens
        let burned = k
            .slash(ctx, &pubkey(1).cons_address(), height, 100, Dec::from_u64(2))
            .unwrap();
        assert_eq!(burned, Int::from_u64(100));
        assert!(k.get_validator(ctx, &val(1)).unwrap().tokens.is_zero());
    });
    assert_eq!(chain.metrics.validators_slashed_total.get(), 1);
}

#[test]
fn slashing_an_unbonded_validator_is_an_error() {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 100)]));
    chain.deliver(vec![create_validator_msg(1, 100)]).unwrap();
    chain.with_ctx(|app, ctx| {
        let height = ctx.block_height();
        assert!(matches!(
            app.staking()
                .slash(ctx, &pubkey(1).cons_address(), height, 100, Dec::percent(10)),
            Err(StakingError::SlashUnbondedValidator)
        ));
    });
}

fn edit_rate_msg(i: u8, rate: Dec) -> Msg {
    Msg::EditValidator(MsgEditValidator {
        description: Description::with_moniker(DO_NOT_MODIFY_DESC),
        validator_address: val(i),
        commission_rate: Some(rate),
        min_self_delegation: None,
    })
}

fn staking_err(res: Result<impl std::fmt::Debug, TxError>) -> StakingError {
    match res {
        Err(TxError::Staking(e)) => e,
        other => panic!("expected a staking error, got {other:?}"),
    }
}

#[test]
fn commission_edits_follow_rate_limits() {
    let mut chain = two_validators(2);
    chain.next_block();

    let err = staking_err(chain.deliver(vec![edit_rate_msg(1, Dec::percent(11))]));
    assert!(matches!(err, StakingError::CommissionUpdateTime));

    // skip past the one day change window
    chain.end_block();
    chain.header.height += 1;
    chain.header.time = chain.header.time + Duration::from_secs(25 * 60 * 60);
    chain.begin_block();

    let err = staking_err(chain.deliver(vec![edit_rate_msg(1, Dec::percent(25))]));
    assert!(matches!(err, StakingError::CommissionGtMaxRate));
    let err = staking_err(chain.deliver(vec![edit_rate_msg(1, Dec::percent(12))]));
    assert!(matches!(err, StakingError::CommissionGtMaxChangeRate));

    let mut params = chain.with_ctx(|app, ctx| app.staking().params(ctx));
    params.min_commission_rate = Dec::percent(11);
    chain
        .deliver(vec![Msg::UpdateStakingParams(MsgUpdateParams {
            authority: module_address("gov"),
            params,
        })])
        .unwrap();
    let err = staking_err(chain.deliver(vec![edit_rate_msg(1, Dec::with_prec(105, 3))]));
    assert!(matches!(err, StakingError::CommissionLtMinRate));

    chain.deliver(vec![edit_rate_msg(1, Dec::percent(11))]).unwrap();
    let now = chain.header.time;
    chain.with_ctx(|app, ctx| {
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.commission.rates.rate, Dec::percent(11));
        assert_eq!(v.commission.update_time, now);
        assert_eq!(v.description.moniker, "val-1");
    });

    let err = staking_err(chain.deliver(vec![edit_rate_msg(1, Dec::percent(12))]));
    assert!(matches!(err, StakingError::CommissionUpdateTime));
}

#[test]
fn emptied_validator_is_removed_after_unbonding() {
    let mut gs = funded(&[(acc(1), 100), (acc(2), 300)]);
    gs.staking.params.unbonding_time = Duration::from_secs(60);
    let mut chain = TestChain::new(config(), &gs);
    chain
        .deliver(vec![create_validator_msg(1, 100), create_validator_msg(2, 300)])
        .unwrap();
    chain.next_block();

    chain
        .deliver(vec![Msg::Undelegate(MsgUndelegate {
            delegator_address: acc(1),
            validator_address: val(1),
            amount: coin(100),
        })])
        .unwrap();
    let updates = chain.next_block();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].pub_key, pubkey(1));
    assert_eq!(updates[0].power, 0);

    chain.with_ctx(|app, ctx| {
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.status, BondStatus::Unbonding);
        assert!(v.tokens.is_zero());
        assert!(v.delegator_shares.is_zero());
    });

    for _ in 0..13 {
        chain.next_block();
    }
    chain.with_ctx(|app, ctx| {
        let s = app.staking();
        assert!(s.get_validator(ctx, &val(1)).is_none());
        assert!(s
            .get_validator_by_cons_addr(ctx, &pubkey(1).cons_address())
            .is_none());
        assert_eq!(s.get_validator(ctx, &val(2)).unwrap().status, BondStatus::Bonded);
        app.crisis().check_invariants(ctx).unwrap();
    });
    assert_eq!(chain.balance(&acc(1)), Int::from_u64(100));
}
