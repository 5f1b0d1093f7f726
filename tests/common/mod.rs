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

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use amunchain_modules::core::bank::{Balance, BankKeeper};
use amunchain_modules::core::config::AppConfig;
use amunchain_modules::core::context::{BlockHeader, ConsensusParams, Context};
use amunchain_modules::core::economics::staking::{
    CommissionRates, Description, MsgCreateValidator, MsgDelegate, ValidatorUpdate,
};
use amunchain_modules::core::math::{Dec, Int};
use amunchain_modules::core::runtime::app::{App, GenesisState, Msg, Tx, TxError, TxResult};
use amunchain_modules::core::state::store::MemStore;
use amunchain_modules::core::types::{AccAddress, Coin, PubKey, Timestamp, ValAddress};
use amunchain_modules::monitoring::metrics::Metrics;

pub const DENOM: &str = "stake";
pub const GENESIS_TIME: Timestamp = Timestamp::from_secs(1_700_000_000);
pub const BLOCK_TIME: Duration = Duration::from_secs(5);
pub const GAS: u64 = 50_000_000;

pub fn val(i: u8) -> ValAddress {
    ValAddress(vec![i; 20])
}

pub fn acc(i: u8) -> AccAddress {
    AccAddress::from(&val(i))
}

pub fn pubkey(i: u8) -> PubKey {
    PubKey::Ed25519(vec![i; 32])
}

pub fn coin(amount: u64) -> Coin {
    Coin::new(DENOM, Int::from_u64(amount))
}

pub fn funded(accounts: &[(AccAddress, u64)]) -> GenesisState {
    let mut gs = GenesisState::default();
    gs.epochs.epochs.clear();
    gs.bank.balances = accounts
        .iter()
        .map(|(a, amt)| Balance {
            address: a.clone(),
            coin: coin(*amt),
        })
        .collect();
    gs
}

/// One unit of consensus power per token, so powers read as token counts.
pub fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.staking.power_reduction = 1;
    cfg
}

pub fn create_validator_msg(i: u8, amount: u64) -> Msg {
    Msg::CreateValidator(MsgCreateValidator {
        description: Description::with_moniker(format!("val-{i}")),
        commission: CommissionRates::new(Dec::percent(10), Dec::percent(20), Dec::percent(1)),
        min_self_delegation: Int::from_u64(1),
        validator_address: val(i),
        pubkey: pubkey(i),
        value: coin(amount),
    })
}

pub fn delegate_msg(del: &AccAddress, v: &ValAddress, amount: u64) -> Msg {
    Msg::Delegate(MsgDelegate {
        delegator_address: del.clone(),
        validator_address: v.clone(),
        amount: coin(amount),
    })
}

pub fn tx(msgs: Vec<Msg>) -> Tx {
    Tx {
        msgs,
        gas_limit: GAS,
    }
}

/// In-memory chain driven block by block.
pub struct TestChain {
    pub app: App,
    pub store: MemStore,
    pub header: BlockHeader,
    pub metrics: Arc<Metrics>,
}

impl TestChain {
    pub fn new(cfg: AppConfig, genesis: &GenesisState) -> Self {
        let metrics = Arc::new(Metrics::new().unwrap());
        let app = App::new(cfg, metrics.clone()).unwrap();
        Self::with_app(app, metrics, genesis)
    }

    pub fn with_app(app: App, metrics: Arc<Metrics>, genesis: &GenesisState) -> Self {
        let mut chain = Self {
            app,
            store: MemStore::new(),
            header: BlockHeader {
                chain_id: "test-chain".into(),
                height: 1,
                time: GENESIS_TIME,
            },
            metrics,
        };
        chain.with_ctx(|app, ctx| app.init_chain(ctx, genesis).unwrap());
        chain
    }

    /// Run `f` on a root context at the current header and keep its writes.
    pub fn with_ctx<R>(&mut self, f: impl FnOnce(&App, &mut Context<'_>) -> R) -> R {
        let mut ctx = Context::new(
            self.header.clone(),
            ConsensusParams::default(),
            &mut self.store,
        );
        let out = f(&self.app, &mut ctx);
        ctx.finish();
        out
    }

    pub fn deliver(&mut self, msgs: Vec<Msg>) -> Result<TxResult, TxError> {
        let t = tx(msgs);
        self.with_ctx(|app, ctx| app.deliver_tx(ctx, &t))
    }

    pub fn begin_block(&mut self) {
        self.with_ctx(|app, ctx| app.begin_block(ctx));
    }

    pub fn end_block(&mut self) -> Vec<ValidatorUpdate> {
        self.with_ctx(|app, ctx| app.end_block(ctx).unwrap())
    }

    /// End the current block and begin the next one `BLOCK_TIME` later.
    pub fn next_block(&mut self) -> Vec<ValidatorUpdate> {
        let updates = self.end_block();
        self.header.height += 1;
        self.header.time = self.header.time + BLOCK_TIME;
        self.begin_block();
        updates
    }

    pub fn balance(&mut self, addr: &AccAddress) -> Int {
        self.with_ctx(|app, ctx| app.bank().get_balance(ctx, addr, DENOM).amount)
    }
}
