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

use crate::core::bank::BankError;
use thiserror::Error;

/// Staking errors. `code()` values are stable and part of the tx result.
#[derive(Debug, Error)]
pub enum StakingError {
    #[error("empty validator address")]
    EmptyValidatorAddr,
    #[error("validator does not exist")]
    NoValidatorFound,
    #[error("validator already exist for this operator address; must use new validator operator address")]
    ValidatorOwnerExists,
    #[error("validator already exist for this pubkey; must use new validator pubkey")]
    ValidatorPubKeyExists,
    #[error("validator pubkey type {got} is not supported; supported types: {supported}")]
    ValidatorPubKeyTypeNotSupported { got: String, supported: String },
    #[error("validator for this address is currently jailed")]
    ValidatorJailed,
    #[error("failed to remove validator: {0}")]
    BadRemoveValidator(String),
    #[error("commission cannot be more than 100%")]
    CommissionHuge,
    #[error("commission cannot be more than the max rate")]
    CommissionGtMaxRate,
    #[error("commission cannot be changed more than once in 24h")]
    CommissionUpdateTime,
    #[error("commission change rate cannot be more than the max rate")]
    CommissionChangeRateGtMaxRate,
    #[error("commission cannot be changed more than max change rate")]
    CommissionGtMaxChangeRate,
    #[error("validator's self delegation must be greater than their minimum self delegation")]
    SelfDelegationBelowMinimum,
    #[error("minimum self delegation cannot be decrease")]
    MinSelfDelegationDecreased,
    #[error("empty delegator address")]
    EmptyDelegatorAddr,
    #[error("no delegation for (address, validator) tuple")]
    NoDelegation,
    #[error("delegator does not contain delegation")]
    NoDelegatorForAddress,
    #[error("insufficient delegation shares")]
    InsufficientShares,
    #[error("not enough delegation shares")]
    NotEnoughDelegationShares,
    #[error("no unbonding delegation found")]
    NoUnbondingDelegation,
    #[error("too many unbonding delegation entries for (delegator, validator) tuple")]
    MaxUnbondingDelegationEntries,
    #[error("no redelegation found")]
    NoRedelegation,
    #[error("cannot redelegate to the same validator")]
    SelfRedelegation,
    #[error("too few tokens to redelegate (truncates to zero tokens)")]
    TinyRedelegationAmount,
    #[error("redelegation destination validator not found")]
    BadRedelegationDst,
    #[error("redelegation to this validator already in progress; first redelegation to this validator must complete before next redelegation")]
    TransitiveRedelegation,
    #[error("too many redelegation entries for (delegator, src-validator, dst-validator) tuple")]
    MaxRedelegationEntries,
    #[error("cannot delegate to validators with invalid (zero) ex-rate")]
    DelegatorShareExRateInvalid,
    #[error("no historical info found")]
    NoHistoricalInfo,
    #[error("empty validator public key")]
    EmptyValidatorPubKey,
    #[error("commission cannot be less than min rate")]
    CommissionLtMinRate,
    #[error("expected {expected} as the only signer, got {got}")]
    InvalidSigner { expected: String, got: String },
    #[error("redelegation source validator not found")]
    BadRedelegationSrc,
    #[error("validator already jailed")]
    ValidatorAlreadyJailed,
    #[error("validator not jailed; cannot be unjailed")]
    ValidatorNotJailed,
    #[error("should not be slashing unbonded validator")]
    SlashUnbondedValidator,
    #[error("cannot slash infractions in the future: infraction height {infraction}, current height {current}")]
    FutureInfraction { infraction: i64, current: i64 },
    #[error("invalid coin denomination: got {got}, expected {expected}")]
    InvalidDenom { got: String, expected: String },
    #[error("invalid delegation amount")]
    InvalidDelegationAmount,
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("hook failed: {0}")]
    Hook(anyhow::Error),
}

impl StakingError {
    /// Error codespace.
    pub fn codespace(&self) -> &'static str {
        match self {
            StakingError::InvalidDelegationAmount
            | StakingError::InvalidRequest(_)
            | StakingError::InvalidDenom { .. }
            | StakingError::InvalidGenesis(_) => "sdk",
            StakingError::Bank(e) => e.codespace(),
            _ => "staking",
        }
    }

    /// Stable numeric code within the codespace.
    pub fn code(&self) -> u32 {
        use StakingError::*;
        match self {
            EmptyValidatorAddr => 2,
            NoValidatorFound => 3,
            ValidatorOwnerExists => 4,
            ValidatorPubKeyExists => 5,
            ValidatorPubKeyTypeNotSupported { .. } => 6,
            ValidatorJailed => 7,
            BadRemoveValidator(_) => 8,
            CommissionHuge => 10,
            CommissionGtMaxRate => 11,
            CommissionUpdateTime => 12,
            CommissionChangeRateGtMaxRate => 14,
            CommissionGtMaxChangeRate => 15,
            SelfDelegationBelowMinimum => 16,
            MinSelfDelegationDecreased => 17,
            EmptyDelegatorAddr => 18,
            NoDelegation => 19,
            NoDelegatorForAddress => 21,
            InsufficientShares => 22,
            NotEnoughDelegationShares => 24,
            NoUnbondingDelegation => 26,
            MaxUnbondingDelegationEntries => 27,
            NoRedelegation => 28,
            SelfRedelegation => 29,
            TinyRedelegationAmount => 30,
            BadRedelegationDst => 31,
            TransitiveRedelegation => 32,
            MaxRedelegationEntries => 33,
            DelegatorShareExRateInvalid => 34,
            NoHistoricalInfo => 38,
            EmptyValidatorPubKey => 39,
            CommissionLtMinRate => 40,
            InvalidSigner { .. } => 43,
            BadRedelegationSrc => 44,
            ValidatorAlreadyJailed => 46,
            ValidatorNotJailed => 47,
            SlashUnbondedValidator => 48,
            FutureInfraction { .. } => 49,
            InvalidParams(_) => 50,
            Hook(_) => 51,
            InvalidDelegationAmount => 11,
            InvalidRequest(_) | InvalidDenom { .. } | InvalidGenesis(_) => 18,
            Bank(e) => e.code(),
        }
    }
}
