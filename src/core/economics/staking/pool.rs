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

use super::errors::StakingError;
use super::keeper::{Keeper, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME};
use crate::core::context::Context;
use crate::core::math::{Dec, Int};
use crate::core::types::Coin;

impl Keeper {
    fn move_between_pools(&self, ctx: &mut Context<'_>, from: &str, to: &str, tokens: Int) {
        if tokens.is_zero() {
            return;
        }
        let coin = Coin::new(self.bond_denom(ctx), tokens);
        // pools are only ever debited by amounts the validator records account for
        if let Err(e) = self.bank.send_coins_from_module_to_module(ctx, from, to, &coin) {
            panic!("pool transfer {from} -> {to} of {coin} failed: {e}");
        }
    }

    /// Bonded pool -> not-bonded pool.
    pub fn bonded_tokens_to_not_bonded(&self, ctx: &mut Context<'_>, tokens: Int) {
        self.move_between_pools(ctx, BONDED_POOL_NAME, NOT_BONDED_POOL_NAME, tokens);
    }

    /// Not-bonded pool -> bonded pool.
    pub fn not_bonded_tokens_to_bonded(&self, ctx: &mut Context<'_>, tokens: Int) {
        self.move_between_pools(ctx, NOT_BONDED_POOL_NAME, BONDED_POOL_NAME, tokens);
    }

    fn burn_from(&self, ctx: &mut Context<'_>, pool: &str, amt: Int) -> Result<(), StakingError> {
        if amt.is_zero() {
            return Ok(());
        }
        let coin = Coin::new(self.bond_denom(ctx), amt);
        self.bank.burn_coins(ctx, pool, &coin)?;
        Ok(())
    }

    /// Burn from the bonded pool.
    pub fn burn_bonded_tokens(&self, ctx: &mut Context<'_>, amt: Int) -> Result<(), StakingError> {
        self.burn_from(ctx, BONDED_POOL_NAME, amt)
    }

    /// Burn from the not-bonded pool.
    pub fn burn_not_bonded_tokens(
        &self,
        ctx: &mut Context<'_>,
        amt: Int,
    ) -> Result<(), StakingError> {
        self.burn_from(ctx, NOT_BONDED_POOL_NAME, amt)
    }

    /// Bond-denom balance of the bonded pool.
    pub fn total_bonded_tokens(&self, ctx: &Context<'_>) -> Int {
        let denom = self.bond_denom(ctx);
        self.bank
            .get_balance(ctx, &self.pool_address(BONDED_POOL_NAME), &denom)
            .amount
    }

    /// Bond-denom balance of the not-bonded pool.
    pub fn total_not_bonded_tokens(&self, ctx: &Context<'_>) -> Int {
        let denom = self.bond_denom(ctx);
        self.bank
            .get_balance(ctx, &self.pool_address(NOT_BONDED_POOL_NAME), &denom)
            .amount
    }

    /// Total supply of the bond denom.
    pub fn staking_token_supply(&self, ctx: &Context<'_>) -> Int {
        let denom = self.bond_denom(ctx);
        self.bank.get_supply(ctx, &denom).amount
    }

    /// Bonded tokens over total supply; zero when nothing is staked.
    pub fn bonded_ratio(&self, ctx: &Context<'_>) -> Dec {
        let supply = self.staking_token_supply(ctx);
        if supply.is_zero() {
            return Dec::zero();
        }
        Dec::from_int(self.total_bonded_tokens(ctx)).quo(Dec::from_int(supply))
    }
}
