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

use amunchain_modules::core::bank::{module_address, Balance};
use amunchain_modules::core::economics::staking::{
    BondStatus, MsgBeginRedelegate, MsgCancelUnbondingDelegation, MsgDelegate, MsgUndelegate,
    MsgUpdateParams, StakingError,
};
use amunchain_modules::core::math::{Dec, Int};
use amunchain_modules::core::runtime::app::{GenesisState, Msg, TxError};
use amunchain_modules::core::types::{AccAddress, Coin, ValAddress};
use common::*;

fn chain_with_bonded_validator() -> TestChain {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 1000), (acc(9), 500)]));
    chain.deliver(vec![create_validator_msg(1, 1000)]).unwrap();
    chain.next_block();
    chain
}

#[test]
fn delegate_slash_unbond_exchange_rate() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 500)]).unwrap();

    chain.with_ctx(|app, ctx| {
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.status, BondStatus::Bonded);
        assert_eq!(v.tokens, Int::from_u64(1500));
        assert_eq!(v.delegator_shares, Dec::from_u64(1500));
        let d = app.staking().get_delegation(ctx, &del, &val(1)).unwrap();
        assert_eq!(d.shares, Dec::from_u64(500));
    });

    let burned = chain.with_ctx(|app, ctx| {
        let height = ctx.block_height();
        app.staking()
            .slash(ctx, &pubkey(1).cons_address(), height, 1500, Dec::percent(20))
            .unwrap()
    });
    assert_eq!(burned, Int::from_u64(300));

    chain.with_ctx(|app, ctx| {
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.tokens, Int::from_u64(1200));
        assert_eq!(v.delegator_shares, Dec::from_u64(1500));

        let (_, returned) = app
            .staking()
            .undelegate(ctx, &del, &val(1), Dec::from_u64(500))
            .unwrap();
        assert_eq!(returned, Int::from_u64(400));

        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.tokens, Int::from_u64(800));
        assert_eq!(v.delegator_shares, Dec::from_u64(1000));
        assert!(app.staking().get_delegation(ctx, &del, &val(1)).is_none());
        app.crisis().check_invariants(ctx).unwrap();
    });
}

#[test]
fn delegate_then_unbond_all_returns_funds_after_unbonding_time() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 500)]).unwrap();
    assert_eq!(chain.balance(&del), Int::zero());

    let completion = chain.with_ctx(|app, ctx| {
        let (t, amount) = app
            .staking()
            .undelegate(ctx, &del, &val(1), Dec::from_u64(500))
            .unwrap();
        assert_eq!(amount, Int::from_u64(500));
        t
    });
    chain.next_block();
    assert_eq!(chain.balance(&del), Int::zero());

    chain.header.time = completion + Duration::from_secs(1);
    chain.next_block();
    assert_eq!(chain.balance(&del), Int::from_u64(500));
    chain.with_ctx(|app, ctx| {
        assert!(app.staking().get_unbonding_delegation(ctx, &del, &val(1)).is_none());
        app.crisis().check_invariants(ctx).unwrap();
    });
}

#[test]
fn historical_slash_reaches_unbonding_entries() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 500)]).unwrap();
    let infraction_height = chain.header.height;
    chain.next_block();

    chain.with_ctx(|app, ctx| {
        app.staking()
            .undelegate(ctx, &del, &val(1), Dec::from_u64(200))
            .unwrap();
    });
    chain.next_block();
    chain.next_block();

    let burned = chain.with_ctx(|app, ctx| {
        app.staking()
            .slash(ctx, &pubkey(1).cons_address(), infraction_height, 1500, Dec::percent(10))
            .unwrap()
    });
    // 150 due: 20 from the unbonding entry, 130 from the validator
    assert_eq!(burned, Int::from_u64(130));

    chain.with_ctx(|app, ctx| {
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.tokens, Int::from_u64(1170));
        let ubd = app
            .staking()
            .get_unbonding_delegation(ctx, &del, &val(1))
            .unwrap();
        assert_eq!(ubd.entries[0].balance, Int::from_u64(180));
        assert_eq!(ubd.entries[0].initial_balance, Int::from_u64(200));
        app.crisis().check_invariants(ctx).unwrap();
    });
}

#[test]
fn undelegate_more_than_delegated_fails() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 100)]).unwrap();
    let err = chain.with_ctx(|app, ctx| {
        app.staking()
            .undelegate(ctx, &del, &val(1), Dec::from_u64(101))
            .unwrap_err()
    });
    assert!(matches!(err, StakingError::NotEnoughDelegationShares));
}

#[test]
fn operator_unbonding_below_min_self_delegation_jails() {
    let mut chain = chain_with_bonded_validator();
    chain.with_ctx(|app, ctx| {
        app.staking()
            .undelegate(ctx, &acc(1), &val(1), Dec::from_u64(1000))
            .unwrap();
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert!(v.jailed);
    });
    let updates = chain.next_block();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].power, 0);
}

#[test]
fn failed_tx_leaves_no_trace() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    // second message overdraws, so the first delegation is rolled back too
    let res = chain.deliver(vec![
        delegate_msg(&del, &val(1), 300),
        delegate_msg(&del, &val(1), 300),
    ]);
    assert!(res.is_err());
    assert_eq!(chain.balance(&del), Int::from_u64(500));
    chain.with_ctx(|app, ctx| {
        assert!(app.staking().get_delegation(ctx, &del, &val(1)).is_none());
    });
    assert_eq!(chain.metrics.tx_failures_total.get(), 1);
}

fn undelegate_msg(del: &AccAddress, v: &ValAddress, amount: Coin) -> Msg {
    Msg::Undelegate(MsgUndelegate {
        delegator_address: del.clone(),
        validator_address: v.clone(),
        amount,
    })
}

fn redelegate_msg(del: &AccAddress, src: u8, dst: u8, amount: u64) -> Msg {
    Msg::BeginRedelegate(MsgBeginRedelegate {
        delegator_address: del.clone(),
        validator_src_address: val(src),
        validator_dst_address: val(dst),
        amount: coin(amount),
    })
}

fn cancel_msg(del: &AccAddress, amount: u64, creation_height: i64) -> Msg {
    Msg::CancelUnbondingDelegation(MsgCancelUnbondingDelegation {
        delegator_address: del.clone(),
        validator_address: val(1),
        amount: coin(amount),
        creation_height,
    })
}

#[test]
fn oversized_unbond_amount_fails_the_tx_only() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 100)]).unwrap();
    let huge = Coin::new(DENOM, Int::from_be_bytes(&[0xff; 25]).unwrap());

    let res = chain.deliver(vec![undelegate_msg(&del, &val(1), huge.clone())]);
    assert!(matches!(res, Err(TxError::Staking(StakingError::InsufficientShares))));

    let res = chain.deliver(vec![Msg::BeginRedelegate(MsgBeginRedelegate {
        delegator_address: del.clone(),
        validator_src_address: val(1),
        validator_dst_address: val(2),
        amount: huge,
    })]);
    assert!(matches!(res, Err(TxError::Staking(StakingError::InsufficientShares))));
    assert_eq!(chain.metrics.tx_failures_total.get(), 2);

    // the chain keeps producing blocks and the delegation is untouched
    chain.next_block();
    chain.with_ctx(|app, ctx| {
        let d = app.staking().get_delegation(ctx, &del, &val(1)).unwrap();
        assert_eq!(d.shares, Dec::from_u64(100));
        app.crisis().check_invariants(ctx).unwrap();
    });
}

#[test]
fn large_balances_unbond_without_overflow() {
    let big = Int::from_u128(10u128.pow(30));
    let half = Int::from_u128(5 * 10u128.pow(29));
    let mut gs = GenesisState::default();
    gs.epochs.epochs.clear();
    gs.bank.balances = vec![
        Balance {
            address: acc(1),
            coin: Coin::new(DENOM, big),
        },
        Balance {
            address: acc(9),
            coin: Coin::new(DENOM, half),
        },
    ];
    let mut cfg = config();
    cfg.staking.power_reduction = 1_000_000_000_000_000_000;
    let mut chain = TestChain::new(cfg, &gs);

    let mut create = create_validator_msg(1, 1);
    if let Msg::CreateValidator(m) = &mut create {
        m.value = Coin::new(DENOM, big);
    }
    chain.deliver(vec![create]).unwrap();
    chain.next_block();

    let del = acc(9);
    chain
        .deliver(vec![Msg::Delegate(MsgDelegate {
            delegator_address: del.clone(),
            validator_address: val(1),
            amount: Coin::new(DENOM, half),
        })])
        .unwrap();
    chain
        .deliver(vec![undelegate_msg(&del, &val(1), Coin::new(DENOM, half))])
        .unwrap();

    chain.with_ctx(|app, ctx| {
        assert!(app.staking().get_delegation(ctx, &del, &val(1)).is_none());
        let ubd = app
            .staking()
            .get_unbonding_delegation(ctx, &del, &val(1))
            .unwrap();
        assert_eq!(ubd.entries.len(), 1);
        assert_eq!(ubd.entries[0].balance, half);
        let v = app.staking().get_validator(ctx, &val(1)).unwrap();
        assert_eq!(v.tokens, big);
        app.crisis().check_invariants(ctx).unwrap();
    });
}

#[test]
fn redelegation_rejects_hops_and_completes_at_maturity() {
    let mut gs = funded(&[(acc(1), 1000), (acc(2), 1000), (acc(3), 1000), (acc(9), 500)]);
    gs.staking.params.unbonding_time = Duration::from_secs(60);
    let mut chain = TestChain::new(config(), &gs);
    chain
        .deliver(vec![
            create_validator_msg(1, 1000),
            create_validator_msg(2, 1000),
            create_validator_msg(3, 1000),
        ])
        .unwrap();
    chain.next_block();

    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 300)]).unwrap();
    chain.deliver(vec![redelegate_msg(&del, 1, 2, 100)]).unwrap();

    let res = chain.deliver(vec![redelegate_msg(&del, 2, 3, 50)]);
    assert!(matches!(
        res,
        Err(TxError::Staking(StakingError::TransitiveRedelegation))
    ));
    let res = chain.deliver(vec![redelegate_msg(&del, 1, 1, 50)]);
    assert!(matches!(res, Err(TxError::Staking(StakingError::SelfRedelegation))));

    chain.with_ctx(|app, ctx| {
        let s = app.staking();
        assert_eq!(s.get_delegation(ctx, &del, &val(1)).unwrap().shares, Dec::from_u64(200));
        assert_eq!(s.get_delegation(ctx, &del, &val(2)).unwrap().shares, Dec::from_u64(100));
        let red = s.get_redelegation(ctx, &del, &val(1), &val(2)).unwrap();
        assert_eq!(red.entries.len(), 1);
        assert_eq!(red.entries[0].initial_balance, Int::from_u64(100));
        app.crisis().check_invariants(ctx).unwrap();
    });

    // 60s of 5s blocks, plus the block that reaches the completion time
    for _ in 0..13 {
        chain.next_block();
    }
    chain.with_ctx(|app, ctx| {
        assert!(app
            .staking()
            .get_redelegation(ctx, &del, &val(1), &val(2))
            .is_none());
    });
    chain.deliver(vec![redelegate_msg(&del, 2, 3, 50)]).unwrap();
    assert_eq!(chain.balance(&del), Int::from_u64(200));
}

#[test]
fn cancel_unbonding_returns_tokens_to_the_validator() {
    let mut chain = chain_with_bonded_validator();
    let del = acc(9);
    chain.deliver(vec![delegate_msg(&del, &val(1), 300)]).unwrap();
    chain
        .deliver(vec![undelegate_msg(&del, &val(1), coin(100))])
        .unwrap();
    let height = chain.header.height;

    let res = chain.deliver(vec![cancel_msg(&del, 150, height)]);
    assert!(matches!(res, Err(TxError::Staking(StakingError::InvalidRequest(_)))));
    let res = chain.deliver(vec![cancel_msg(&del, 10, height + 7)]);
    assert!(matches!(
        res,
        Err(TxError::Staking(StakingError::NoUnbondingDelegation))
    ));

    chain.deliver(vec![cancel_msg(&del, 60, height)]).unwrap();
    chain.with_ctx(|app, ctx| {
        let s = app.staking();
        let ubd = s.get_unbonding_delegation(ctx, &del, &val(1)).unwrap();
        assert_eq!(ubd.entries[0].balance, Int::from_u64(40));
        assert_eq!(ubd.entries[0].initial_balance, Int::from_u64(40));
        assert_eq!(s.get_delegation(ctx, &del, &val(1)).unwrap().shares, Dec::from_u64(260));
        assert_eq!(s.get_validator(ctx, &val(1)).unwrap().tokens, Int::from_u64(1260));
        app.crisis().check_invariants(ctx).unwrap();
    });

    chain.deliver(vec![cancel_msg(&del, 40, height)]).unwrap();
    chain.with_ctx(|app, ctx| {
        assert!(app
            .staking()
            .get_unbonding_delegation(ctx, &del, &val(1))
            .is_none());
        app.crisis().check_invariants(ctx).unwrap();
    });
    assert_eq!(chain.balance(&del), Int::from_u64(200));
}

#[test]
fn update_params_requires_authority() {
    let mut chain = chain_with_bonded_validator();
    let mut params = chain.with_ctx(|app, ctx| app.staking().params(ctx));
    params.max_validators = 7;

    let res = chain.deliver(vec![Msg::UpdateStakingParams(MsgUpdateParams {
        authority: acc(9),
        params: params.clone(),
    })]);
    assert!(matches!(
        res,
        Err(TxError::Staking(StakingError::InvalidSigner { .. }))
    ));
    assert_ne!(chain.with_ctx(|app, ctx| app.staking().params(ctx)).max_validators, 7);

    chain
        .deliver(vec![Msg::UpdateStakingParams(MsgUpdateParams {
            authority: module_address("gov"),
            params,
        })])
        .unwrap();
    assert_eq!(chain.with_ctx(|app, ctx| app.staking().params(ctx)).max_validators, 7);
}
