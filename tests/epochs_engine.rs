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

use std::sync::{Arc, Mutex};
use std::time::Duration;

use amunchain_modules::core::config::AppConfig;
use amunchain_modules::core::context::{Context, StoreKey};
use amunchain_modules::core::runtime::app::App;
use amunchain_modules::core::runtime::epochs::{EpochHooks, EpochInfo, EpochsError};
use amunchain_modules::core::types::Timestamp;
use amunchain_modules::monitoring::metrics::Metrics;
use common::*;

const HOUR: Duration = Duration::from_secs(3600);

fn hour_epoch(start: Timestamp) -> EpochInfo {
    let mut e = EpochInfo::new("hour", HOUR);
    e.start_time = start;
    e
}

fn chain_with_epochs(epochs: Vec<EpochInfo>, hooks: Vec<Arc<dyn EpochHooks>>) -> TestChain {
    let metrics = Arc::new(Metrics::new().unwrap());
    let app = App::with_hooks(config(), metrics.clone(), Vec::new(), hooks).unwrap();
    let mut gs = funded(&[]);
    gs.epochs.epochs = epochs;
    TestChain::with_app(app, metrics, &gs)
}

fn at(chain: &mut TestChain, time: Timestamp) {
    chain.header.height += 1;
    chain.header.time = time;
    chain.begin_block();
}

fn hour(chain: &mut TestChain) -> EpochInfo {
    chain.with_ctx(|app, ctx| app.epochs().get_epoch_info(ctx, "hour").unwrap())
}

#[test]
fn hourly_epoch_ticks_on_nominal_boundaries() {
    let t0 = GENESIS_TIME + HOUR;
    let mut chain = chain_with_epochs(vec![hour_epoch(t0)], Vec::new());

    // before start_time nothing happens
    chain.begin_block();
    assert!(!hour(&mut chain).epoch_counting_started);

    at(&mut chain, t0);
    let e = hour(&mut chain);
    assert_eq!(e.current_epoch, 1);
    assert_eq!(e.current_epoch_start_time, t0);
    assert_eq!(e.current_epoch_start_height, chain.header.height);

    at(&mut chain, t0 + Duration::from_secs(3599));
    assert_eq!(hour(&mut chain).current_epoch, 1);

    at(&mut chain, t0 + Duration::from_secs(3601));
    let e = hour(&mut chain);
    assert_eq!(e.current_epoch, 2);
    assert_eq!(e.current_epoch_start_time, t0 + HOUR);
}

#[test]
fn tick_emits_end_and_start_events() {
    let t0 = GENESIS_TIME;
    let mut chain = chain_with_epochs(vec![hour_epoch(t0)], Vec::new());
    chain.begin_block();

    chain.header.height += 1;
    chain.header.time = t0 + HOUR + Duration::from_secs(1);
    let events = chain.with_ctx(|app, ctx| {
        app.begin_block(ctx);
        ctx.events().to_vec()
    });
    let end = events.iter().find(|e| e.kind == "epoch_end").unwrap();
    assert_eq!(end.get("epoch_number"), Some("1"));
    let start = events.iter().find(|e| e.kind == "epoch_start").unwrap();
    assert_eq!(start.get("epoch_number"), Some("2"));
    assert_eq!(
        start.get("start_time"),
        Some((t0 + HOUR).unix_secs().to_string().as_str())
    );
}

#[test]
fn downtime_is_caught_up_one_epoch_per_block() {
    let t0 = GENESIS_TIME;
    let mut chain = chain_with_epochs(vec![hour_epoch(t0)], Vec::new());
    chain.begin_block();

    let late = t0 + HOUR * 10 + Duration::from_secs(1);
    for expected in 2..=11 {
        at(&mut chain, late);
        let e = hour(&mut chain);
        assert_eq!(e.current_epoch, expected);
        assert_eq!(e.current_epoch_start_time, t0 + HOUR * (expected as u32 - 1));
    }
    at(&mut chain, late);
    assert_eq!(hour(&mut chain).current_epoch, 11);
}

#[test]
fn add_epoch_info_fills_start_and_rejects_duplicates() {
    let mut chain = chain_with_epochs(Vec::new(), Vec::new());
    chain.with_ctx(|app, ctx| {
        app.epochs()
            .add_epoch_info(ctx, EpochInfo::new("minute", Duration::from_secs(60)))
            .unwrap();
        let e = app.epochs().get_epoch_info(ctx, "minute").unwrap();
        assert_eq!(e.start_time, ctx.block_time());
        assert_eq!(e.current_epoch_start_height, ctx.block_height());
        assert_eq!(e.current_epoch, 0);

        assert_eq!(
            app.epochs()
                .add_epoch_info(ctx, EpochInfo::new("minute", Duration::from_secs(60))),
            Err(EpochsError::DuplicateIdentifier("minute".into()))
        );
        assert_eq!(
            app.epochs()
                .add_epoch_info(ctx, EpochInfo::new("zero", Duration::ZERO)),
            Err(EpochsError::ZeroDuration)
        );
        assert_eq!(
            app.epochs().num_blocks_since_epoch_start(ctx, "nope"),
            Err(EpochsError::EpochNotFound("nope".into()))
        );
    });
}

#[test]
fn epochs_iterate_alphabetically() {
    let mut chain = chain_with_epochs(Vec::new(), Vec::new());
    chain.with_ctx(|app, ctx| {
        for id in ["week", "day", "hour"] {
            app.epochs()
                .add_epoch_info(ctx, EpochInfo::new(id, HOUR))
                .unwrap();
        }
        let ids: Vec<_> = app
            .epochs()
            .all_epoch_infos(ctx)
            .into_iter()
            .map(|e| e.identifier)
            .collect();
        assert_eq!(ids, ["day", "hour", "week"]);
    });
}

#[test]
fn num_blocks_since_epoch_start_counts_heights() {
    let mut chain = chain_with_epochs(vec![hour_epoch(GENESIS_TIME)], Vec::new());
    chain.begin_block();
    let start = chain.header.height;
    for _ in 0..3 {
        chain.next_block();
    }
    let n = chain.with_ctx(|app, ctx| app.epochs().num_blocks_since_epoch_start(ctx, "hour"));
    assert_eq!(n, Ok(chain.header.height - start));
    assert_eq!(n, Ok(3));
}

type Calls = Arc<Mutex<Vec<(&'static str, String, i64)>>>;

struct Recorder(Calls);

impl EpochHooks for Recorder {
    fn after_epoch_end(
        &self,
        _ctx: &mut Context<'_>,
        identifier: &str,
        n: i64,
    ) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(("end", identifier.to_string(), n));
        Ok(())
    }

    fn before_epoch_start(
        &self,
        _ctx: &mut Context<'_>,
        identifier: &str,
        n: i64,
    ) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(("start", identifier.to_string(), n));
        Ok(())
    }
}

// Writes a marker, then fails: the write must not survive.
struct Failing;

impl EpochHooks for Failing {
    fn before_epoch_start(
        &self,
        ctx: &mut Context<'_>,
        _identifier: &str,
        n: i64,
    ) -> anyhow::Result<()> {
        ctx.kv_set(&StoreKey::new("marker"), b"failing", n.to_be_bytes().to_vec());
        anyhow::bail!("listener refused epoch {n}")
    }
}

struct Panicking;

impl EpochHooks for Panicking {
    fn after_epoch_end(
        &self,
        _ctx: &mut Context<'_>,
        _identifier: &str,
        _n: i64,
    ) -> anyhow::Result<()> {
        panic!("listener blew up")
    }
}

#[test]
fn failing_listeners_are_isolated_and_counted() {
    let calls: Calls = Arc::default();
    let hooks: Vec<Arc<dyn EpochHooks>> = vec![
        Arc::new(Failing),
        Arc::new(Panicking),
        Arc::new(Recorder(calls.clone())),
    ];
    let t0 = GENESIS_TIME;
    let mut chain = chain_with_epochs(vec![hour_epoch(t0)], hooks);

    chain.begin_block();
    at(&mut chain, t0 + HOUR + Duration::from_secs(1));

    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            ("start", "hour".to_string(), 1),
            ("end", "hour".to_string(), 1),
            ("start", "hour".to_string(), 2),
        ]
    );
    // Failing fails on both starts, Panicking on the one end
    assert_eq!(chain.metrics.epoch_hook_errors_total.get(), 3);
    chain.with_ctx(|_, ctx| {
        assert!(ctx.kv_get(&StoreKey::new("marker"), b"failing").is_none());
    });
    assert_eq!(hour(&mut chain).current_epoch, 2);
}

#[test]
fn default_genesis_epochs_start_at_genesis() {
    let mut chain = TestChain::new(AppConfig::default(), &{
        let mut gs = funded(&[]);
        gs.epochs = Default::default();
        gs
    });
    chain.begin_block();
    chain.with_ctx(|app, ctx| {
        let all = app.epochs().all_epoch_infos(ctx);
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.current_epoch == 1 && e.start_time == GENESIS_TIME));
    });
}
