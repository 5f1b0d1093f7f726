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

//! Block loop wiring the bank, staking, epochs and crisis engines together.
//!
//! The host drives one block as `begin_block`, any number of `deliver_tx`,
//! `end_block`, then finishes the root context and calls `commit`.

use crate::core::bank::{self, BankError, ModuleAccounts, StoreBank};
use crate::core::config::{AppConfig, ConfigError};
use crate::core::context::{
    panic_message, BlockHeader, ChainHalt, Context, Event, GasMeter, OutOfGas, StoreKey,
};
use crate::core::economics::staking::{
    self, register_invariants, BondStatus, MsgServer, MultiStakingHooks, StakingError,
    StakingHooks, ValidatorUpdate, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME,
};
use crate::core::math::{Dec, Int};
use crate::core::runtime::crisis::{self, CrisisError, CrisisKeeper};
use crate::core::runtime::epochs::{self, EpochHooks, EpochsError, MultiEpochHooks};
use crate::core::state::merkle::Hash32;
use crate::core::state::persistent_state::{PersistentState, StateError};
use crate::core::state::store::MemStore;
use crate::core::types::{must_decode, must_encode, ValAddress};
use crate::monitoring::metrics::Metrics;
use prometheus::IntCounter;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const APP_STORE: &str = "app";
const LAST_BLOCK_KEY: &[u8] = b"last_block";

/// Application errors outside a transaction.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Staking(#[from] StakingError),
    #[error(transparent)]
    Epochs(#[from] EpochsError),
    #[error(transparent)]
    Crisis(#[from] CrisisError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// Why a transaction was rolled back.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum TxError {
    #[error("tx has no messages")]
    Empty,
    #[error("{0}")]
    OutOfGas(String),
    #[error("panic in message handler: {0}")]
    Panic(String),
    #[error(transparent)]
    Staking(#[from] StakingError),
    #[error(transparent)]
    Crisis(#[from] CrisisError),
}

impl TxError {
    /// Error codespace.
    pub fn codespace(&self) -> &'static str {
        match self {
            TxError::Empty | TxError::OutOfGas(_) | TxError::Panic(_) => "sdk",
            TxError::Staking(e) => e.codespace(),
            TxError::Crisis(e) => e.codespace(),
        }
    }

    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            TxError::Empty => 12,
            TxError::OutOfGas(_) => 11,
            TxError::Panic(_) => 111222,
            TxError::Staking(e) => e.code(),
            TxError::Crisis(e) => e.code(),
        }
    }
}

/// Any routable message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    /// Staking: new validator.
    CreateValidator(staking::MsgCreateValidator),
    /// Staking: edit validator.
    EditValidator(staking::MsgEditValidator),
    /// Staking: delegate.
    Delegate(staking::MsgDelegate),
    /// Staking: redelegate.
    BeginRedelegate(staking::MsgBeginRedelegate),
    /// Staking: undelegate.
    Undelegate(staking::MsgUndelegate),
    /// Staking: cancel an unbonding entry.
    CancelUnbondingDelegation(staking::MsgCancelUnbondingDelegation),
    /// Staking: governance params.
    UpdateStakingParams(staking::MsgUpdateParams),
    /// Crisis: verify one invariant.
    VerifyInvariant(crisis::MsgVerifyInvariant),
    /// Crisis: governance fee update.
    UpdateCrisisParams(crisis::MsgUpdateParams),
}

/// Messages executed atomically under one gas limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    /// In order.
    pub msgs: Vec<Msg>,
    /// Hard gas limit.
    pub gas_limit: u64,
}

/// Outcome of a committed transaction.
#[derive(Clone, Debug)]
pub struct TxResult {
    /// Gas consumed.
    pub gas_used: u64,
    /// Events emitted by the messages.
    pub events: Vec<Event>,
}

/// Whole-chain genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Balances.
    pub bank: bank::GenesisState,
    /// Staking state.
    pub staking: staking::GenesisState,
    /// Timers.
    pub epochs: epochs::GenesisState,
    /// Invariant fee.
    pub crisis: crisis::GenesisState,
}

// Counts slashes that reach the burn step.
struct SlashCounter(IntCounter);

impl StakingHooks for SlashCounter {
    fn before_validator_slashed(
        &self,
        _ctx: &mut Context<'_>,
        _val: &ValAddress,
        _fraction: Dec,
    ) -> anyhow::Result<()> {
        self.0.inc();
        Ok(())
    }
}

/// The application.
pub struct App {
    config: AppConfig,
    bank: Arc<StoreBank>,
    staking: staking::Keeper,
    staking_msgs: MsgServer,
    epochs: epochs::Keeper,
    crisis: CrisisKeeper,
    metrics: Arc<Metrics>,
}

impl App {
    /// App with no external listeners.
    pub fn new(config: AppConfig, metrics: Arc<Metrics>) -> Result<Self, AppError> {
        Self::with_hooks(config, metrics, Vec::new(), Vec::new())
    }

    /// App with extra staking and epoch listeners, called in the given order.
    pub fn with_hooks(
        config: AppConfig,
        metrics: Arc<Metrics>,
        mut staking_hooks: Vec<Arc<dyn StakingHooks>>,
        epoch_hooks: Vec<Arc<dyn EpochHooks>>,
    ) -> Result<Self, AppError> {
        config.validate()?;
        let authority = config.authority()?;
        let accounts = Arc::new(ModuleAccounts);
        let bank = Arc::new(StoreBank::new(
            accounts.clone(),
            &[BONDED_POOL_NAME, NOT_BONDED_POOL_NAME],
        ));

        let staking = staking::Keeper::new(
            bank.clone(),
            accounts,
            authority.clone(),
            Int::from_u64(config.staking.power_reduction),
        );
        staking_hooks.push(Arc::new(SlashCounter(
            metrics.validators_slashed_total.clone(),
        )));
        staking.set_hooks(MultiStakingHooks::new(staking_hooks));

        let epochs = epochs::Keeper::new();
        epochs.set_hooks(
            MultiEpochHooks::new(epoch_hooks)
                .with_error_counter(metrics.epoch_hook_errors_total.clone()),
        );

        let mut crisis = CrisisKeeper::new(
            config.crisis.inv_check_period,
            bank.clone(),
            config.crisis.fee_collector_name.clone(),
            authority,
        )
        .with_skip_genesis_invariants(config.crisis.skip_genesis_invariants)
        .with_check_counter(metrics.invariant_checks_total.clone());
        register_invariants(&mut crisis, &staking)?;

        Ok(Self {
            config,
            staking_msgs: MsgServer::new(staking.clone()),
            bank,
            staking,
            epochs,
            crisis,
            metrics,
        })
    }

    /// Configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Bank.
    pub fn bank(&self) -> &StoreBank {
        &self.bank
    }

    /// Staking keeper.
    pub fn staking(&self) -> &staking::Keeper {
        &self.staking
    }

    /// Epochs keeper.
    pub fn epochs(&self) -> &epochs::Keeper {
        &self.epochs
    }

    /// Crisis keeper.
    pub fn crisis(&self) -> &CrisisKeeper {
        &self.crisis
    }

    /// Crisis keeper, for registering further invariants before genesis.
    pub fn crisis_mut(&mut self) -> &mut CrisisKeeper {
        &mut self.crisis
    }

    /// Metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run module genesis: bank, staking, epochs, then crisis.
    pub fn init_chain(
        &self,
        ctx: &mut Context<'_>,
        genesis: &GenesisState,
    ) -> Result<Vec<ValidatorUpdate>, AppError> {
        self.bank.init_genesis(ctx, &genesis.bank)?;
        let updates = self.staking.init_genesis(ctx, &genesis.staking)?;
        genesis.epochs.validate()?;
        self.epochs.init_genesis(ctx, &genesis.epochs)?;
        genesis.crisis.validate()?;
        self.crisis.init_genesis(ctx, &genesis.crisis)?;
        info!(
            chain_id = %ctx.chain_id(),
            validators = updates.len(),
            "genesis initialised"
        );
        Ok(updates)
    }

    /// Epoch ticks, then staking bookkeeping.
    pub fn begin_block(&self, ctx: &mut Context<'_>) {
        epochs::begin_blocker(ctx, &self.epochs);
        staking::abci::begin_blocker(ctx, &self.staking);
    }

    /// Execute `tx` atomically. Any error, out-of-gas or handler panic discards
    /// all of its writes.
    ///
    /// A chain halt (broken invariant) keeps unwinding to the host.
    pub fn deliver_tx(&self, ctx: &mut Context<'_>, tx: &Tx) -> Result<TxResult, TxError> {
        self.metrics.transactions_total.inc();
        let res = self.run_tx(ctx, tx);
        if let Err(e) = &res {
            self.metrics.tx_failures_total.inc();
            debug!(height = ctx.block_height(), code = e.code(), error = %e, "tx rolled back");
        }
        res
    }

    fn run_tx(&self, ctx: &mut Context<'_>, tx: &Tx) -> Result<TxResult, TxError> {
        if tx.msgs.is_empty() {
            return Err(TxError::Empty);
        }
        let mut tx_ctx = ctx
            .cache_context()
            .with_gas_meter(GasMeter::with_limit(tx.gas_limit));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            tx.msgs
                .iter()
                .try_for_each(|m| self.route(&mut tx_ctx, m))
        }));
        match outcome {
            Ok(Ok(())) => {
                let result = TxResult {
                    gas_used: tx_ctx.gas_meter().consumed(),
                    events: tx_ctx.events().to_vec(),
                };
                tx_ctx.write();
                Ok(result)
            }
            Ok(Err(e)) => Err(e),
            Err(payload) if payload.is::<ChainHalt>() => panic::resume_unwind(payload),
            Err(payload) if payload.is::<OutOfGas>() => {
                Err(TxError::OutOfGas(panic_message(payload.as_ref())))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                warn!(height = ctx.block_height(), panic = %msg, "recovered panic in tx");
                Err(TxError::Panic(msg))
            }
        }
    }

    fn route(&self, ctx: &mut Context<'_>, msg: &Msg) -> Result<(), TxError> {
        match msg {
            Msg::CreateValidator(m) => self.staking_msgs.create_validator(ctx, m)?,
            Msg::EditValidator(m) => self.staking_msgs.edit_validator(ctx, m)?,
            Msg::Delegate(m) => self.staking_msgs.delegate(ctx, m)?,
            Msg::BeginRedelegate(m) => {
                self.staking_msgs.begin_redelegate(ctx, m)?;
            }
            Msg::Undelegate(m) => {
                self.staking_msgs.undelegate(ctx, m)?;
            }
            Msg::CancelUnbondingDelegation(m) => {
                self.staking_msgs.cancel_unbonding_delegation(ctx, m)?
            }
            Msg::UpdateStakingParams(m) => self.staking_msgs.update_params(ctx, m)?,
            Msg::VerifyInvariant(m) => self.crisis.verify_invariant(ctx, m)?,
            Msg::UpdateCrisisParams(m) => self.crisis.update_params(ctx, m)?,
        }
        Ok(())
    }

    /// Staking set changes, periodic invariant assertion, and the last-block record.
    pub fn end_block(&self, ctx: &mut Context<'_>) -> Result<Vec<ValidatorUpdate>, AppError> {
        let updates = staking::abci::end_blocker(ctx, &self.staking)?;
        crisis::end_blocker(ctx, &self.crisis);

        ctx.kv_set(
            &StoreKey::new(APP_STORE),
            LAST_BLOCK_KEY,
            must_encode(ctx.header()),
        );

        let validators = self.staking.get_all_validators(ctx);
        let bonded = validators
            .iter()
            .filter(|v| v.status == BondStatus::Bonded)
            .count();
        let jailed = validators.iter().filter(|v| v.jailed).count();
        self.metrics.block_height.set(ctx.block_height());
        self.metrics.bonded_validators.set(bonded as i64);
        self.metrics.validators_jailed.set(jailed as i64);
        if !updates.is_empty() {
            info!(height = ctx.block_height(), updates = updates.len(), "validator set changed");
        }
        Ok(updates)
    }

    /// Header of the last block that reached `end_block`.
    pub fn last_block(&self, ctx: &Context<'_>) -> Option<BlockHeader> {
        ctx.kv_get(&StoreKey::new(APP_STORE), LAST_BLOCK_KEY)
            .map(|b| must_decode(&b, "last block header"))
    }

    /// Full state as genesis.
    pub fn export_genesis(&self, ctx: &Context<'_>) -> GenesisState {
        GenesisState {
            bank: self.bank.export_genesis(ctx),
            staking: self.staking.export_genesis(ctx),
            epochs: self.epochs.export_genesis(ctx),
            crisis: self.crisis.export_genesis(ctx),
        }
    }

    /// Persist the block's change set. Call after the root context is finished.
    pub fn commit(
        &self,
        state: &PersistentState,
        working: &mut MemStore,
    ) -> Result<Hash32, AppError> {
        let root = state.commit_changes(working).map_err(|e| {
            warn!(error = %e, "commit failed");
            e
        })?;
        info!(root = %hex::encode(root), "state committed");
        Ok(root)
    }
}
