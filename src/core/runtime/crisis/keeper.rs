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

use super::msgs::{MsgUpdateParams, MsgVerifyInvariant};
use super::types::{full_route, CrisisError, InvarRoute, Invariant, InvariantBroken};
use crate::core::bank::BankKeeper;
use crate::core::context::{halt, Context, Event, GasMeter, StoreKey};
use crate::core::types::{must_decode, must_encode, AccAddress, Coin};
use prometheus::IntCounter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Store namespace and module name.
pub const MODULE_NAME: &str = "crisis";

const CONSTANT_FEE_KEY: [u8; 1] = [0x01];

/// Invariant registry and checker.
#[derive(Clone)]
pub struct CrisisKeeper {
    store_key: StoreKey,
    routes: Vec<InvarRoute>,
    inv_check_period: u64,
    skip_genesis_invariants: bool,
    bank: Arc<dyn BankKeeper>,
    fee_collector_name: String,
    authority: AccAddress,
    checks: Option<IntCounter>,
}

impl CrisisKeeper {
    /// Keeper asserting every `inv_check_period` blocks (0 disables).
    pub fn new(
        inv_check_period: u64,
        bank: Arc<dyn BankKeeper>,
        fee_collector_name: impl Into<String>,
        authority: AccAddress,
    ) -> Self {
        Self {
            store_key: StoreKey::new(MODULE_NAME),
            routes: Vec::new(),
            inv_check_period,
            skip_genesis_invariants: false,
            bank,
            fee_collector_name: fee_collector_name.into(),
            authority,
            checks: None,
        }
    }

    /// Do not assert at genesis.
    pub fn with_skip_genesis_invariants(mut self, skip: bool) -> Self {
        self.skip_genesis_invariants = skip;
        self
    }

    /// Count full assertion passes on `counter`.
    pub fn with_check_counter(mut self, counter: IntCounter) -> Self {
        self.checks = Some(counter);
        self
    }

    /// Append a check. `module/route` must be unique.
    pub fn register_route(
        &mut self,
        module: &str,
        route: &str,
        invar: Invariant,
    ) -> Result<(), CrisisError> {
        if module.is_empty() {
            return Err(CrisisError::EmptyModule);
        }
        if route.is_empty() {
            return Err(CrisisError::EmptyRoute);
        }
        let full = full_route(module, route);
        if self.routes.iter().any(|r| r.full_route() == full) {
            return Err(CrisisError::DuplicateRoute(full));
        }
        self.routes.push(InvarRoute {
            module_name: module.to_string(),
            route: route.to_string(),
            invar,
        });
        Ok(())
    }

    /// Registered invariants in registration order.
    pub fn routes(&self) -> &[InvarRoute] {
        &self.routes
    }

    /// Check functions in registration order.
    pub fn invariants(&self) -> Vec<Invariant> {
        self.routes.iter().map(|r| Arc::clone(&r.invar)).collect()
    }

    /// Assertion period in blocks.
    pub fn inv_check_period(&self) -> u64 {
        self.inv_check_period
    }

    /// Whether genesis skips the assertion.
    pub fn skip_genesis_invariants(&self) -> bool {
        self.skip_genesis_invariants
    }

    /// Governance authority.
    pub fn authority(&self) -> &AccAddress {
        &self.authority
    }

    /// Fee charged by `verify_invariant`. Panics before genesis.
    pub fn get_constant_fee(&self, ctx: &Context<'_>) -> Coin {
        match ctx.kv_get(&self.store_key, &CONSTANT_FEE_KEY) {
            Some(b) => must_decode(&b, "constant fee"),
            None => panic!("crisis constant fee not set"),
        }
    }

    /// Store a new fee.
    pub fn set_constant_fee(&self, ctx: &mut Context<'_>, fee: &Coin) -> Result<(), CrisisError> {
        if !fee.is_valid() {
            return Err(CrisisError::InvalidCoins(fee.to_string()));
        }
        ctx.kv_set(&self.store_key, &CONSTANT_FEE_KEY, must_encode(fee));
        Ok(())
    }

    fn run_route(&self, ctx: &mut Context<'_>, ir: &InvarRoute) -> Option<InvariantBroken> {
        // writes and gas of the check are discarded with the child
        let mut check_ctx = ctx.cache_context().with_gas_meter(GasMeter::infinite());
        let (message, stop) = (ir.invar)(&mut check_ctx);
        stop.then(|| InvariantBroken {
            module_name: ir.module_name.clone(),
            route: ir.route.clone(),
            message,
        })
    }

    /// Run every check without halting; the first broken one is returned.
    pub fn check_invariants(&self, ctx: &mut Context<'_>) -> Result<(), InvariantBroken> {
        if let Some(c) = &self.checks {
            c.inc();
        }
        for ir in &self.routes {
            if let Some(broken) = self.run_route(ctx, ir) {
                return Err(broken);
            }
        }
        Ok(())
    }

    /// Run every check in order; halts on the first broken invariant.
    pub fn assert_invariants(&self, ctx: &mut Context<'_>) {
        if let Some(c) = &self.checks {
            c.inc();
        }
        let start = Instant::now();
        let n = self.routes.len();
        for (i, ir) in self.routes.iter().enumerate() {
            info!(
                module = "x/crisis",
                inv = %format_args!("{}/{}", i + 1, n),
                name = %ir.full_route(),
                "asserting crisis invariants"
            );
            if let Some(broken) = self.run_route(ctx, ir) {
                error!(
                    module = "x/crisis",
                    route = %ir.full_route(),
                    height = ctx.block_height(),
                    "invariant broken"
                );
                halt(broken.to_string());
            }
        }
        info!(
            module = "x/crisis",
            duration_ms = start.elapsed().as_millis() as u64,
            height = ctx.block_height(),
            "asserted all invariants"
        );
    }

    /// Charge the fee, then run one check; halts if it is broken.
    ///
    /// The fee is taken before the route lookup, so an unknown route still
    /// costs the fee within this context.
    pub fn verify_invariant(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgVerifyInvariant,
    ) -> Result<(), CrisisError> {
        msg.validate_basic()?;
        let fee = self.get_constant_fee(ctx);
        if !fee.is_zero() {
            self.bank.send_coins_from_account_to_module(
                ctx,
                &msg.sender,
                &self.fee_collector_name,
                &fee,
            )?;
        }

        let full = msg.full_invariant_route();
        let Some(ir) = self.routes.iter().find(|r| r.full_route() == full) else {
            return Err(CrisisError::UnknownInvariant);
        };
        if let Some(broken) = self.run_route(ctx, ir) {
            error!(
                module = "x/crisis",
                route = %full,
                sender = %msg.sender,
                "invariant broken by verification"
            );
            halt(broken.message);
        }

        info!(module = "x/crisis", route = %full, sender = %msg.sender, "invariant verified");
        ctx.emit(Event::new("invariant").attr("route", &msg.invariant_route));
        Ok(())
    }

    /// Replace the fee; authority only.
    pub fn update_params(
        &self,
        ctx: &mut Context<'_>,
        msg: &MsgUpdateParams,
    ) -> Result<(), CrisisError> {
        if msg.authority != self.authority {
            return Err(CrisisError::InvalidSigner {
                expected: self.authority.to_string(),
                got: msg.authority.to_string(),
            });
        }
        msg.validate_basic()?;
        self.set_constant_fee(ctx, &msg.constant_fee)
    }
}
