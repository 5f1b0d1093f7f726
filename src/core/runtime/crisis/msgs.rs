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

//! Crisis transaction messages.

use super::types::CrisisError;
use crate::core::types::{AccAddress, Coin};
use serde::{Deserialize, Serialize};

/// Ask the chain to check one invariant; halts it if broken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgVerifyInvariant {
    /// Pays the constant fee.
    pub sender: AccAddress,
    /// Module owning the check.
    pub invariant_module_name: String,
    /// Route inside the module.
    pub invariant_route: String,
}

impl MsgVerifyInvariant {
    /// Account that signs and pays.
    pub fn signer(&self) -> AccAddress {
        self.sender.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), CrisisError> {
        if self.sender.is_empty() {
            return Err(CrisisError::NoSender);
        }
        if self.invariant_module_name.is_empty() {
            return Err(CrisisError::EmptyModule);
        }
        if self.invariant_route.is_empty() {
            return Err(CrisisError::EmptyRoute);
        }
        Ok(())
    }

    /// `module/route`.
    pub fn full_invariant_route(&self) -> String {
        super::types::full_route(&self.invariant_module_name, &self.invariant_route)
    }
}

/// Governance update of the verification fee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    /// Must equal the configured authority.
    pub authority: AccAddress,
    /// New fee.
    pub constant_fee: Coin,
}

impl MsgUpdateParams {
    /// Account that signs.
    pub fn signer(&self) -> AccAddress {
        self.authority.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), CrisisError> {
        if self.authority.is_empty() {
            return Err(CrisisError::NoSender);
        }
        if !self.constant_fee.is_valid() {
            return Err(CrisisError::InvalidCoins(self.constant_fee.to_string()));
        }
        Ok(())
    }
}
