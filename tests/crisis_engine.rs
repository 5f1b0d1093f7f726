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

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amunchain_modules::core::bank::{
    self, module_address, BankError, BankKeeper, ModuleAccounts, StoreBank,
};
use amunchain_modules::core::context::{
    panic_message, BlockHeader, ChainHalt, ConsensusParams, Context, StoreKey,
};
use amunchain_modules::core::math::Int;
use amunchain_modules::core::runtime::app::{Msg, TxError};
use amunchain_modules::core::runtime::crisis::{
    self, end_blocker, CrisisError, CrisisKeeper, Invariant, MsgUpdateParams, MsgVerifyInvariant,
};
use amunchain_modules::core::state::store::MemStore;
use amunchain_modules::core::types::AccAddress;
use common::*;

const FEE: u64 = 1000;

fn keeper(period: u64) -> CrisisKeeper {
    let bank = Arc::new(StoreBank::new(Arc::new(ModuleAccounts), &[]));
    CrisisKeeper::new(period, bank, "fee_collector", module_address("gov"))
}

fn header(height: i64) -> BlockHeader {
    BlockHeader {
        chain_id: "crisis".into(),
        height,
        time: GENESIS_TIME,
    }
}

fn counting(calls: &Arc<AtomicUsize>, msg: &'static str, broken: bool) -> Invariant {
    let calls = calls.clone();
    Arc::new(move |_ctx: &mut Context<'_>| {
        calls.fetch_add(1, Ordering::SeqCst);
        (msg.to_string(), broken)
    })
}

fn setup(k: &CrisisKeeper, store: &mut MemStore, sender_balance: u64) {
    let mut ctx = Context::new(header(1), ConsensusParams::default(), store);
    let bank = StoreBank::new(Arc::new(ModuleAccounts), &[]);
    bank.init_genesis(
        &mut ctx,
        &bank::GenesisState {
            balances: vec![bank::Balance {
                address: acc(1),
                coin: coin(sender_balance),
            }],
        },
    )
    .unwrap();
    k.clone()
        .with_skip_genesis_invariants(true)
        .init_genesis(&mut ctx, &crisis::GenesisState { constant_fee: coin(FEE) })
        .unwrap();
    ctx.finish();
}

/// Run `f`, which must halt the chain, and return the halt message.
fn halted<R>(f: impl FnOnce() -> R) -> String {
    let payload = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(_) => panic!("chain did not halt"),
        Err(p) => p,
    };
    match payload.downcast_ref::<ChainHalt>() {
        Some(h) => h.0.clone(),
        None => panic!("unexpected panic: {}", panic_message(payload.as_ref())),
    }
}

fn verify_msg(module: &str, route: &str) -> MsgVerifyInvariant {
    MsgVerifyInvariant {
        sender: acc(1),
        invariant_module_name: module.into(),
        invariant_route: route.into(),
    }
}

#[test]
fn periodic_assertion_halts_on_broken_invariant() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut k = keeper(5);
    k.register_route("bank", "supply", counting(&calls, "", false))
        .unwrap();
    let mut store = MemStore::new();

    let mut ran = Vec::new();
    for h in 1..=10 {
        let mut ctx = Context::new(header(h), ConsensusParams::default(), &mut store);
        if end_blocker(&mut ctx, &k) {
            ran.push(h);
        }
    }
    assert_eq!(ran, [5, 10]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    k.register_route("bank", "balances", counting(&calls, "mismatch", true))
        .unwrap();
    for h in 11..=14 {
        let mut ctx = Context::new(header(h), ConsensusParams::default(), &mut store);
        assert!(!end_blocker(&mut ctx, &k));
    }
    let msg = halted(|| {
        let mut ctx = Context::new(header(15), ConsensusParams::default(), &mut store);
        end_blocker(&mut ctx, &k)
    });
    assert!(msg.contains("mismatch"));
    assert!(msg.contains("bank balances"));
}

#[test]
fn zero_period_never_asserts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut k = keeper(0);
    k.register_route("bank", "supply", counting(&calls, "boom", true))
        .unwrap();
    let mut store = MemStore::new();
    for h in 1..=20 {
        let mut ctx = Context::new(header(h), ConsensusParams::default(), &mut store);
        assert!(!end_blocker(&mut ctx, &k));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn verify_without_fee_funds_fails_before_check() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut k = keeper(0);
    k.register_route("bank", "supply", counting(&calls, "", false))
        .unwrap();
    let mut store = MemStore::new();
    setup(&k, &mut store, FEE - 1);

    let mut ctx = Context::new(header(2), ConsensusParams::default(), &mut store);
    let err = k.verify_invariant(&mut ctx, &verify_msg("bank", "supply")).unwrap_err();
    assert!(matches!(err, CrisisError::Bank(BankError::InsufficientFunds { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn verify_charges_fee_and_emits_event() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut k = keeper(0);
    k.register_route("bank", "supply", counting(&calls, "", false))
        .unwrap();
    let mut store = MemStore::new();
    setup(&k, &mut store, 5 * FEE);

    let mut ctx = Context::new(header(2), ConsensusParams::default(), &mut store);
    k.verify_invariant(&mut ctx, &verify_msg("bank", "supply")).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let ev = ctx.events().iter().find(|e| e.kind == "invariant").unwrap();
    assert_eq!(ev.get("route"), Some("supply"));

    let bank = StoreBank::new(Arc::new(ModuleAccounts), &[]);
    assert_eq!(bank.get_balance(&ctx, &acc(1), DENOM).amount, Int::from_u64(4 * FEE));
    assert_eq!(
        bank.get_balance(&ctx, &module_address("fee_collector"), DENOM).amount,
        Int::from_u64(FEE)
    );
}

#[test]
fn unknown_route_still_takes_the_fee() {
    let mut k = keeper(0);
    k.register_route("bank", "supply", counting(&Arc::default(), "", false))
        .unwrap();
    let mut store = MemStore::new();
    setup(&k, &mut store, 5 * FEE);

    let mut ctx = Context::new(header(2), ConsensusParams::default(), &mut store);
    let err = k.verify_invariant(&mut ctx, &verify_msg("bank", "nope")).unwrap_err();
    assert_eq!(err, CrisisError::UnknownInvariant);
    let bank = StoreBank::new(Arc::new(ModuleAccounts), &[]);
    assert_eq!(bank.get_balance(&ctx, &acc(1), DENOM).amount, Int::from_u64(4 * FEE));
}

#[test]
fn verify_broken_invariant_halts() {
    let mut k = keeper(0);
    k.register_route("bank", "supply", counting(&Arc::default(), "supply drift", true))
        .unwrap();
    let mut store = MemStore::new();
    setup(&k, &mut store, 5 * FEE);

    let msg = halted(|| {
        let mut ctx = Context::new(header(2), ConsensusParams::default(), &mut store);
        k.verify_invariant(&mut ctx, &verify_msg("bank", "supply"))
    });
    assert_eq!(msg, "supply drift");
}

#[test]
fn check_writes_are_discarded() {
    let mut k = keeper(0);
    let sk = StoreKey::new("scratch");
    let check_sk = sk.clone();
    k.register_route(
        "bank",
        "writer",
        Arc::new(move |ctx: &mut Context<'_>| {
            ctx.kv_set(&check_sk, b"k", b"v".to_vec());
            (String::new(), false)
        }),
    )
    .unwrap();
    let mut store = MemStore::new();
    let mut ctx = Context::new(header(1), ConsensusParams::default(), &mut store);
    k.check_invariants(&mut ctx).unwrap();
    assert!(ctx.kv_get(&sk, b"k").is_none());
}

#[test]
fn registration_rejects_duplicates_and_keeps_order() {
    let mut k = keeper(0);
    let calls = Arc::new(AtomicUsize::new(0));
    k.register_route("staking", "a", counting(&calls, "", false)).unwrap();
    k.register_route("bank", "b", counting(&calls, "", false)).unwrap();
    assert_eq!(
        k.register_route("staking", "a", counting(&calls, "", false)),
        Err(CrisisError::DuplicateRoute("staking/a".into()))
    );
    assert_eq!(
        k.register_route("", "a", counting(&calls, "", false)),
        Err(CrisisError::EmptyModule)
    );
    let routes: Vec<_> = k.routes().iter().map(|r| r.full_route()).collect();
    assert_eq!(routes, ["staking/a", "bank/b"]);
    assert_eq!(k.invariants().len(), 2);
}

#[test]
fn check_invariants_reports_first_broken_route() {
    let mut k = keeper(0);
    let calls = Arc::new(AtomicUsize::new(0));
    k.register_route("bank", "ok", counting(&calls, "", false)).unwrap();
    k.register_route("bank", "bad", counting(&calls, "off by one", true)).unwrap();
    let mut store = MemStore::new();
    let mut ctx = Context::new(header(1), ConsensusParams::default(), &mut store);
    let broken = k.check_invariants(&mut ctx).unwrap_err();
    assert_eq!(broken.route, "bad");
    assert_eq!(broken.message, "off by one");
}

#[test]
fn update_params_requires_authority() {
    let k = keeper(0);
    let mut store = MemStore::new();
    setup(&k, &mut store, 0);
    let mut ctx = Context::new(header(2), ConsensusParams::default(), &mut store);

    let err = k
        .update_params(
            &mut ctx,
            &MsgUpdateParams {
                authority: acc(1),
                constant_fee: coin(5),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CrisisError::InvalidSigner { .. }));

    let bad_fee = MsgUpdateParams {
        authority: module_address("gov"),
        constant_fee: amunchain_modules::core::types::Coin::new("x", Int::from_u64(5)),
    };
    assert!(matches!(
        k.update_params(&mut ctx, &bad_fee),
        Err(CrisisError::InvalidCoins(_))
    ));

    k.update_params(
        &mut ctx,
        &MsgUpdateParams {
            authority: module_address("gov"),
            constant_fee: coin(5),
        },
    )
    .unwrap();
    assert_eq!(k.get_constant_fee(&ctx), coin(5));
}

#[test]
fn unknown_route_fee_is_rolled_back_with_the_tx() {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 5 * FEE)]));
    let err = chain
        .deliver(vec![Msg::VerifyInvariant(verify_msg("staking", "nope"))])
        .unwrap_err();
    assert!(matches!(err, TxError::Crisis(CrisisError::UnknownInvariant)));
    assert_eq!(chain.balance(&acc(1)), Int::from_u64(5 * FEE));

    chain
        .deliver(vec![Msg::VerifyInvariant(verify_msg("staking", "module-accounts"))])
        .unwrap();
    assert_eq!(chain.balance(&acc(1)), Int::from_u64(4 * FEE));
}

#[test]
fn verify_message_basic_checks() {
    let mut m = verify_msg("bank", "supply");
    m.sender = AccAddress(Vec::new());
    assert_eq!(m.validate_basic(), Err(CrisisError::NoSender));
    let m = verify_msg("bank", "");
    assert_eq!(m.validate_basic(), Err(CrisisError::EmptyRoute));
    assert_eq!(verify_msg("bank", "supply").full_invariant_route(), "bank/supply");
}

#[test]
fn broken_invariant_in_a_tx_halts_instead_of_failing_the_tx() {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 5 * FEE)]));
    chain
        .app
        .crisis_mut()
        .register_route("bank", "drift", counting(&Arc::default(), "supply drift", true))
        .unwrap();

    let msg = halted(|| chain.deliver(vec![Msg::VerifyInvariant(verify_msg("bank", "drift"))]));
    assert_eq!(msg, "supply drift");
    assert_eq!(chain.metrics.tx_failures_total.get(), 0);
}

#[test]
fn crashing_check_fails_only_its_tx() {
    let mut chain = TestChain::new(config(), &funded(&[(acc(1), 5 * FEE)]));
    let crash: Invariant = Arc::new(|_: &mut Context<'_>| -> (String, bool) {
        panic!("index out of range")
    });
    chain
        .app
        .crisis_mut()
        .register_route("bank", "crash", crash)
        .unwrap();

    let res = chain.deliver(vec![Msg::VerifyInvariant(verify_msg("bank", "crash"))]);
    match res {
        Err(e @ TxError::Panic(_)) => {
            assert!(e.to_string().contains("index out of range"));
            assert_eq!(e.codespace(), "sdk");
        }
        other => panic!("expected a recovered panic, got {other:?}"),
    }
    // the fee is rolled back with the tx
    assert_eq!(chain.balance(&acc(1)), Int::from_u64(5 * FEE));
    assert_eq!(chain.metrics.tx_failures_total.get(), 1);
}
