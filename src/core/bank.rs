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

//! Account and balance collaborators consumed by the staking and crisis engines.
//!
//! The engines only see the `AccountKeeper` and `BankKeeper` traits. `StoreBank` is
//! a minimal single-store implementation used by the application and tests.

use crate::core::context::{Context, Event, StoreKey};
use crate::core::math::Int;
use crate::core::types::{must_decode, must_encode, sha256_20, AccAddress, Coin};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Bank store namespace.
pub const STORE_KEY: &str = "bank";

const BALANCES_PREFIX: u8 = 0x02;
const SUPPLY_PREFIX: u8 = 0x00;

/// Bank errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error("insufficient funds: {available} is smaller than {required}")]
    InsufficientFunds { available: Coin, required: Coin },
    #[error("invalid coins: {0}")]
    InvalidCoins(String),
    #[error("module account {0} does not have permission to burn tokens")]
    NoBurnPermission(String),
    #[error("unknown module account {0}")]
    UnknownModule(String),
}

impl BankError {
    /// Error codespace.
    pub fn codespace(&self) -> &'static str {
        "sdk"
    }

    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            BankError::InsufficientFunds { .. } => 5,
            BankError::InvalidCoins(_) => 10,
            BankError::NoBurnPermission(_) => 4,
            BankError::UnknownModule(_) => 9,
        }
    }
}

/// Address derivation for accounts owned by modules.
pub trait AccountKeeper: Send + Sync {
    /// Module account address.
    fn module_address(&self, name: &str) -> AccAddress;
}

/// Coin movements, burning and minting.
pub trait BankKeeper: Send + Sync {
    /// Balance of `addr` in `denom`.
    fn get_balance(&self, ctx: &Context<'_>, addr: &AccAddress, denom: &str) -> Coin;

    /// Account to account.
    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError>;

    /// Account to module account.
    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        module: &str,
        amt: &Coin,
    ) -> Result<(), BankError>;

    /// Module account to account.
    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError>;

    /// Module account to module account.
    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        amt: &Coin,
    ) -> Result<(), BankError>;

    /// Delegation transfer into a staking pool.
    fn delegate_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        module: &str,
        amt: &Coin,
    ) -> Result<(), BankError> {
        self.send_coins_from_account_to_module(ctx, from, module, amt)
    }

    /// Undelegation transfer out of a staking pool.
    fn undelegate_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError> {
        self.send_coins_from_module_to_account(ctx, module, to, amt)
    }

    /// Destroy coins held by a module account.
    fn burn_coins(&self, ctx: &mut Context<'_>, module: &str, amt: &Coin) -> Result<(), BankError>;

    /// Create coins in a module account.
    fn mint_coins(&self, ctx: &mut Context<'_>, module: &str, amt: &Coin) -> Result<(), BankError>;

    /// Total supply of `denom`.
    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> Coin;
}

/// Module accounts derived as `sha256(name)[..20]`.
#[derive(Clone, Debug, Default)]
pub struct ModuleAccounts;

impl AccountKeeper for ModuleAccounts {
    fn module_address(&self, name: &str) -> AccAddress {
        module_address(name)
    }
}

/// Module account address for `name`.
pub fn module_address(name: &str) -> AccAddress {
    AccAddress(sha256_20(name.as_bytes()))
}

/// One genesis balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Owner.
    pub address: AccAddress,
    /// Amount.
    pub coin: Coin,
}

/// Bank genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Initial balances; supply is derived from them.
    pub balances: Vec<Balance>,
}

/// Store-backed bank.
#[derive(Clone)]
pub struct StoreBank {
    store_key: StoreKey,
    accounts: Arc<dyn AccountKeeper>,
    burners: BTreeSet<String>,
}

impl StoreBank {
    /// Bank over the `bank/` namespace. Only `burners` may burn.
    pub fn new(accounts: Arc<dyn AccountKeeper>, burners: &[&str]) -> Self {
        Self {
            store_key: StoreKey::new(STORE_KEY),
            accounts,
            burners: burners.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn balance_key(addr: &AccAddress, denom: &str) -> Vec<u8> {
        let mut k = vec![BALANCES_PREFIX, addr.0.len() as u8];
        k.extend_from_slice(&addr.0);
        k.extend_from_slice(denom.as_bytes());
        k
    }

    fn supply_key(denom: &str) -> Vec<u8> {
        let mut k = vec![SUPPLY_PREFIX];
        k.extend_from_slice(denom.as_bytes());
        k
    }

    fn read_amount(&self, ctx: &Context<'_>, key: &[u8]) -> Int {
        ctx.kv_get(&self.store_key, key)
            .map(|b| must_decode::<Int>(&b, "balance"))
            .unwrap_or_default()
    }

    fn write_amount(&self, ctx: &mut Context<'_>, key: &[u8], amt: Int) {
        if amt.is_zero() {
            ctx.kv_delete(&self.store_key, key);
        } else {
            ctx.kv_set(&self.store_key, key, must_encode(&amt));
        }
    }

    fn check(amt: &Coin) -> Result<(), BankError> {
        if !amt.is_valid() {
            return Err(BankError::InvalidCoins(amt.to_string()));
        }
        Ok(())
    }

    fn sub_balance(
        &self,
        ctx: &mut Context<'_>,
        addr: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError> {
        let key = Self::balance_key(addr, &amt.denom);
        let have = self.read_amount(ctx, &key);
        let Some(left) = have.checked_sub(amt.amount) else {
            return Err(BankError::InsufficientFunds {
                available: Coin::new(amt.denom.clone(), have),
                required: amt.clone(),
            });
        };
        self.write_amount(ctx, &key, left);
        Ok(())
    }

    fn add_balance(&self, ctx: &mut Context<'_>, addr: &AccAddress, amt: &Coin) {
        let key = Self::balance_key(addr, &amt.denom);
        let have = self.read_amount(ctx, &key);
        self.write_amount(ctx, &key, have + amt.amount);
    }

    fn transfer(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError> {
        Self::check(amt)?;
        self.sub_balance(ctx, from, amt)?;
        self.add_balance(ctx, to, amt);
        ctx.emit(
            Event::new("transfer")
                .attr("recipient", to)
                .attr("sender", from)
                .attr("amount", amt),
        );
        Ok(())
    }

    /// Credit genesis balances and derive supply.
    pub fn init_genesis(&self, ctx: &mut Context<'_>, gs: &GenesisState) -> Result<(), BankError> {
        for b in &gs.balances {
            Self::check(&b.coin)?;
            self.add_balance(ctx, &b.address, &b.coin);
            let sk = Self::supply_key(&b.coin.denom);
            let supply = self.read_amount(ctx, &sk);
            self.write_amount(ctx, &sk, supply + b.coin.amount);
        }
        Ok(())
    }

    /// Every non-zero balance.
    pub fn export_genesis(&self, ctx: &Context<'_>) -> GenesisState {
        let balances = ctx
            .kv_prefix(&self.store_key, &[BALANCES_PREFIX])
            .into_iter()
            .filter_map(|(k, v)| {
                let len = *k.get(1)? as usize;
                let addr = AccAddress(k.get(2..2 + len)?.to_vec());
                let denom = String::from_utf8(k.get(2 + len..)?.to_vec()).ok()?;
                Some(Balance {
                    address: addr,
                    coin: Coin::new(denom, must_decode::<Int>(&v, "balance")),
                })
            })
            .collect();
        GenesisState { balances }
    }
}

impl BankKeeper for StoreBank {
    fn get_balance(&self, ctx: &Context<'_>, addr: &AccAddress, denom: &str) -> Coin {
        Coin::new(denom, self.read_amount(ctx, &Self::balance_key(addr, denom)))
    }

    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError> {
        self.transfer(ctx, from, to, amt)
    }

    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &AccAddress,
        module: &str,
        amt: &Coin,
    ) -> Result<(), BankError> {
        let to = self.accounts.module_address(module);
        self.transfer(ctx, from, &to, amt)
    }

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context<'_>,
        module: &str,
        to: &AccAddress,
        amt: &Coin,
    ) -> Result<(), BankError> {
        let from = self.accounts.module_address(module);
        self.transfer(ctx, &from, to, amt)
    }

    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut Context<'_>,
        from: &str,
        to: &str,
        amt: &Coin,
    ) -> Result<(), BankError> {
        let from = self.accounts.module_address(from);
        let to = self.accounts.module_address(to);
        self.transfer(ctx, &from, &to, amt)
    }

    fn burn_coins(&self, ctx: &mut Context<'_>, module: &str, amt: &Coin) -> Result<(), BankError> {
        if !self.burners.contains(module) {
            return Err(BankError::NoBurnPermission(module.to_string()));
        }
        Self::check(amt)?;
        let addr = self.accounts.module_address(module);
        self.sub_balance(ctx, &addr, amt)?;
        let sk = Self::supply_key(&amt.denom);
        let supply = self.read_amount(ctx, &sk);
        self.write_amount(ctx, &sk, supply.saturating_sub(amt.amount));
        ctx.emit(
            Event::new("burn")
                .attr("burner", &addr)
                .attr("amount", amt),
        );
        Ok(())
    }

    fn mint_coins(&self, ctx: &mut Context<'_>, module: &str, amt: &Coin) -> Result<(), BankError> {
        Self::check(amt)?;
        let addr = self.accounts.module_address(module);
        self.add_balance(ctx, &addr, amt);
        let sk = Self::supply_key(&amt.denom);
        let supply = self.read_amount(ctx, &sk);
        self.write_amount(ctx, &sk, supply + amt.amount);
        ctx.emit(
            Event::new("coinbase")
                .attr("minter", &addr)
                .attr("amount", amt),
        );
        Ok(())
    }

    fn get_supply(&self, ctx: &Context<'_>, denom: &str) -> Coin {
        Coin::new(denom, self.read_amount(ctx, &Self::supply_key(denom)))
    }
}
