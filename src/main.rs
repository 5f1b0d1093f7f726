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

//! Offline state inspector.
//! Opens the committed state, prints a summary and checks every invariant.

use std::sync::Arc;

use amunchain_modules::core::config::AppConfig;
use amunchain_modules::core::context::{BlockHeader, ConsensusParams, Context};
use amunchain_modules::core::runtime::app::App;
use amunchain_modules::core::state::persistent_state::PersistentState;
use amunchain_modules::monitoring::logging::init_tracing;
use amunchain_modules::monitoring::metrics::Metrics;
use anyhow::Context as _;
use tracing::{error, info};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn run() -> anyhow::Result<bool> {
    let cfg_path = env("AMUN_CONFIG", "./config.toml");
    let cfg = if std::path::Path::new(&cfg_path).exists() {
        AppConfig::load(&cfg_path).with_context(|| format!("loading {cfg_path}"))?
    } else {
        AppConfig::default()
    };
    init_tracing(&cfg.logging);
    info!(config = %cfg_path, data_dir = %cfg.node.data_dir, "amunchain inspector starting");

    let state = PersistentState::open(&cfg.node.data_dir).context("opening state")?;
    let root = state.state_root()?;
    let mut working = state.load()?;

    let consensus = ConsensusParams {
        validator_pub_key_types: cfg.consensus.pub_key_types.clone(),
    };
    let app = App::new(cfg.clone(), Arc::new(Metrics::new()?))?;
    let mut ctx = Context::new(BlockHeader::default(), consensus, &mut working);

    println!("state root: {}", hex::encode(root));
    let Some(last) = app.last_block(&ctx) else {
        println!("no committed blocks");
        return Ok(true);
    };
    println!("chain: {} height: {} time: {}", last.chain_id, last.height, last.time);
    ctx.set_header(last);

    for e in app.epochs().all_epoch_infos(&ctx) {
        println!(
            "epoch {}: #{} started {} (height {})",
            e.identifier, e.current_epoch, e.current_epoch_start_time, e.current_epoch_start_height
        );
    }

    let pr = app.staking().power_reduction();
    let bonded = app.staking().get_bonded_validators_by_power(&ctx);
    println!(
        "bonded validators: {} (last total power {})",
        bonded.len(),
        app.staking().get_last_total_power(&ctx)
    );
    for v in &bonded {
        println!("  {} tokens={} power={}", v.operator_address, v.tokens, v.consensus_power(pr));
    }

    match app.crisis().check_invariants(&mut ctx) {
        Ok(()) => {
            println!("invariants: {} ok", app.crisis().routes().len());
            Ok(true)
        }
        Err(broken) => {
            error!(module = %broken.module_name, route = %broken.route, "invariant broken");
            println!("{broken}");
            Ok(false)
        }
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("inspector failed: {e:#}");
            std::process::exit(2);
        }
    }
}
