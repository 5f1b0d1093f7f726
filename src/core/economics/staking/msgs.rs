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

//! Staking transaction messages and their stateless checks.

use super::errors::StakingError;
use super::types::{CommissionRates, Description, Params};
use crate::core::math::{Dec, Int};
use crate::core::types::{AccAddress, Coin, PubKey, ValAddress};
use serde::{Deserialize, Serialize};

fn check_amount(c: &Coin, what: &str) -> Result<(), StakingError> {
    if !c.is_valid() || c.is_zero() {
        return Err(StakingError::InvalidRequest(format!("invalid {what} amount")));
    }
    Ok(())
}

fn check_del_val(del: &AccAddress, val: &ValAddress) -> Result<(), StakingError> {
    if del.is_empty() {
        return Err(StakingError::EmptyDelegatorAddr);
    }
    if val.is_empty() {
        return Err(StakingError::EmptyValidatorAddr);
    }
    Ok(())
}

/// Create a validator and self-delegate `value`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateValidator {
    /// Description.
    pub description: Description,
    /// Initial commission rates.
    pub commission: CommissionRates,
    /// Required self-delegation.
    pub min_self_delegation: Int,
    /// Operator; the self-delegation is drawn from the matching account.
    pub validator_address: ValAddress,
    /// Consensus key.
    pub pubkey: PubKey,
    /// Self-delegation.
    pub value: Coin,
}

impl MsgCreateValidator {
    /// Account that signs and pays.
    pub fn signer(&self) -> AccAddress {
        AccAddress::from(&self.validator_address)
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        if self.validator_address.is_empty() {
            return Err(StakingError::EmptyValidatorAddr);
        }
        if self.pubkey.bytes().is_empty() {
            return Err(StakingError::EmptyValidatorPubKey);
        }
        if !self.value.is_valid() || self.value.is_zero() {
            return Err(StakingError::InvalidDelegationAmount);
        }
        if self.description == Description::default() {
            return Err(StakingError::InvalidRequest("empty description".into()));
        }
        if self.commission == CommissionRates::default() {
            return Err(StakingError::InvalidRequest("empty commission".into()));
        }
        self.commission.validate()?;
        if self.min_self_delegation.is_zero() {
            return Err(StakingError::InvalidRequest(
                "minimum self delegation must be a positive integer".into(),
            ));
        }
        if self.value.amount < self.min_self_delegation {
            return Err(StakingError::SelfDelegationBelowMinimum);
        }
        Ok(())
    }
}

/// Edit description, commission rate or minimum self-delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgEditValidator {
    /// Replacement description; `[do-not-modify]` fields are kept.
    pub description: Description,
    /// Operator.
    pub validator_address: ValAddress,
    /// New commission rate.
    pub commission_rate: Option<Dec>,
    /// New (higher) minimum self-delegation.
    pub min_self_delegation: Option<Int>,
}

impl MsgEditValidator {
    /// Operator account.
    pub fn signer(&self) -> AccAddress {
        AccAddress::from(&self.validator_address)
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        if self.validator_address.is_empty() {
            return Err(StakingError::EmptyValidatorAddr);
        }
        if self.description == Description::default() {
            return Err(StakingError::InvalidRequest("empty description".into()));
        }
        if self.min_self_delegation.is_some_and(|m| m.is_zero()) {
            return Err(StakingError::InvalidRequest(
                "minimum self delegation must be a positive integer".into(),
            ));
        }
        if self.commission_rate.is_some_and(|r| r > Dec::one()) {
            return Err(StakingError::CommissionHuge);
        }
        Ok(())
    }
}

/// Delegate from an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDelegate {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
    /// Tokens.
    pub amount: Coin,
}

impl MsgDelegate {
    /// Delegator.
    pub fn signer(&self) -> AccAddress {
        self.delegator_address.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        check_del_val(&self.delegator_address, &self.validator_address)?;
        if !self.amount.is_valid() || self.amount.is_zero() {
            return Err(StakingError::InvalidDelegationAmount);
        }
        Ok(())
    }
}

/// Move a delegation between validators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBeginRedelegate {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Source.
    pub validator_src_address: ValAddress,
    /// Destination.
    pub validator_dst_address: ValAddress,
    /// Tokens.
    pub amount: Coin,
}

impl MsgBeginRedelegate {
    /// Delegator.
    pub fn signer(&self) -> AccAddress {
        self.delegator_address.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        check_del_val(&self.delegator_address, &self.validator_src_address)?;
        if self.validator_dst_address.is_empty() {
            return Err(StakingError::EmptyValidatorAddr);
        }
        check_amount(&self.amount, "shares")
    }
}

/// Start unbonding a delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUndelegate {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
    /// Tokens.
    pub amount: Coin,
}

impl MsgUndelegate {
    /// Delegator.
    pub fn signer(&self) -> AccAddress {
        self.delegator_address.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        check_del_val(&self.delegator_address, &self.validator_address)?;
        check_amount(&self.amount, "shares")
    }
}

/// Return (part of) a pending unbonding entry to the validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelUnbondingDelegation {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
    /// Tokens to return.
    pub amount: Coin,
    /// Height identifying the entry.
    pub creation_height: i64,
}

impl MsgCancelUnbondingDelegation {
    /// Delegator.
    pub fn signer(&self) -> AccAddress {
        self.delegator_address.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        check_del_val(&self.delegator_address, &self.validator_address)?;
        check_amount(&self.amount, "unbonding")?;
        if self.creation_height <= 0 {
            return Err(StakingError::InvalidRequest("invalid height".into()));
        }
        Ok(())
    }
}

/// Governance parameter change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    /// Must equal the keeper's authority.
    pub authority: AccAddress,
    /// Full replacement.
    pub params: Params,
}

impl MsgUpdateParams {
    /// Authority.
    pub fn signer(&self) -> AccAddress {
        self.authority.clone()
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> Result<(), StakingError> {
        if self.authority.is_empty() {
            return Err(StakingError::InvalidRequest("empty authority".into()));
        }
        self.params.validate()
    }
}
