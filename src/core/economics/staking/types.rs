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

//! Staking records: validators, delegations, unbonding and redelegation entries, params.

use super::errors::StakingError;
use crate::core::context::BlockHeader;
use crate::core::math::{Dec, Int};
use crate::core::types::{AccAddress, ConsAddress, PubKey, Timestamp, ValAddress};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Minimum time between two commission rate changes.
pub const COMMISSION_UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Description field sentinel meaning "keep the current value".
pub const DO_NOT_MODIFY_DESC: &str = "[do-not-modify]";

/// Maximum moniker length.
pub const MAX_MONIKER_LENGTH: usize = 70;
/// Maximum identity length.
pub const MAX_IDENTITY_LENGTH: usize = 3000;
/// Maximum website length.
pub const MAX_WEBSITE_LENGTH: usize = 140;
/// Maximum security contact length.
pub const MAX_SECURITY_CONTACT_LENGTH: usize = 140;
/// Maximum details length.
pub const MAX_DETAILS_LENGTH: usize = 280;

/// Validator bond status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BondStatus {
    /// Not in the active set; tokens in the not-bonded pool.
    Unbonded,
    /// Left the active set; waiting out the unbonding period.
    Unbonding,
    /// In the active set; tokens in the bonded pool.
    Bonded,
}

impl std::fmt::Display for BondStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BondStatus::Unbonded => "BOND_STATUS_UNBONDED",
            BondStatus::Unbonding => "BOND_STATUS_UNBONDING",
            BondStatus::Bonded => "BOND_STATUS_BONDED",
        })
    }
}

/// Free-form validator description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    /// Name.
    pub moniker: String,
    /// Optional identity signature.
    pub identity: String,
    /// Website.
    pub website: String,
    /// Security contact.
    pub security_contact: String,
    /// Details.
    pub details: String,
}

impl Description {
    /// Description with only a moniker.
    pub fn with_moniker(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
            ..Self::default()
        }
    }

    /// Merge an edit: fields equal to `[do-not-modify]` keep the current value.
    pub fn update(&self, d: &Description) -> Result<Description, StakingError> {
        let pick = |new: &str, old: &str| {
            if new == DO_NOT_MODIFY_DESC {
                old.to_string()
            } else {
                new.to_string()
            }
        };
        let merged = Description {
            moniker: pick(&d.moniker, &self.moniker),
            identity: pick(&d.identity, &self.identity),
            website: pick(&d.website, &self.website),
            security_contact: pick(&d.security_contact, &self.security_contact),
            details: pick(&d.details, &self.details),
        };
        merged.ensure_length()?;
        Ok(merged)
    }

    /// Enforce the per-field length limits.
    pub fn ensure_length(&self) -> Result<(), StakingError> {
        let checks = [
            ("moniker", self.moniker.len(), MAX_MONIKER_LENGTH),
            ("identity", self.identity.len(), MAX_IDENTITY_LENGTH),
            ("website", self.website.len(), MAX_WEBSITE_LENGTH),
            (
                "security contact",
                self.security_contact.len(),
                MAX_SECURITY_CONTACT_LENGTH,
            ),
            ("details", self.details.len(), MAX_DETAILS_LENGTH),
        ];
        for (field, got, max) in checks {
            if got > max {
                return Err(StakingError::InvalidRequest(format!(
                    "invalid {field} length; got: {got}, max: {max}"
                )));
            }
        }
        Ok(())
    }
}

/// Commission rate bounds chosen at creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    /// Current rate.
    pub rate: Dec,
    /// Ceiling for `rate`, fixed forever.
    pub max_rate: Dec,
    /// Largest change of `rate` per update, fixed forever.
    pub max_change_rate: Dec,
}

impl CommissionRates {
    /// Construct.
    pub fn new(rate: Dec, max_rate: Dec, max_change_rate: Dec) -> Self {
        Self {
            rate,
            max_rate,
            max_change_rate,
        }
    }

    /// Ordering rules between the three rates.
    pub fn validate(&self) -> Result<(), StakingError> {
        if self.max_rate > Dec::one() {
            return Err(StakingError::CommissionHuge);
        }
        if self.rate > self.max_rate {
            return Err(StakingError::CommissionGtMaxRate);
        }
        if self.max_change_rate > self.max_rate {
            return Err(StakingError::CommissionChangeRateGtMaxRate);
        }
        Ok(())
    }
}

/// Commission with its last update time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Rates.
    pub rates: CommissionRates,
    /// Last time `rates.rate` changed.
    pub update_time: Timestamp,
}

impl Commission {
    /// Construct.
    pub fn new(rates: CommissionRates, update_time: Timestamp) -> Self {
        Self { rates, update_time }
    }

    /// Check a proposed rate change at `block_time`.
    pub fn validate_new_rate(
        &self,
        new_rate: Dec,
        block_time: Timestamp,
    ) -> Result<(), StakingError> {
        if block_time.since(self.update_time) < COMMISSION_UPDATE_INTERVAL {
            return Err(StakingError::CommissionUpdateTime);
        }
        if new_rate > self.rates.max_rate {
            return Err(StakingError::CommissionGtMaxRate);
        }
        if new_rate.abs_diff(self.rates.rate) > self.rates.max_change_rate {
            return Err(StakingError::CommissionGtMaxChangeRate);
        }
        Ok(())
    }
}

/// Validator record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// Operator address.
    pub operator_address: ValAddress,
    /// Consensus key.
    pub consensus_pubkey: PubKey,
    /// Excluded from the power index while true.
    pub jailed: bool,
    /// Bond status.
    pub status: BondStatus,
    /// Delegated tokens.
    pub tokens: Int,
    /// Total shares issued to delegators.
    pub delegator_shares: Dec,
    /// Description.
    pub description: Description,
    /// Height at which unbonding started.
    pub unbonding_height: i64,
    /// Time at which unbonding completes.
    pub unbonding_time: Timestamp,
    /// Commission.
    pub commission: Commission,
    /// Operator's required self-delegation.
    pub min_self_delegation: Int,
}

impl Validator {
    /// Fresh unbonded validator with no tokens.
    pub fn new(operator: ValAddress, pubkey: PubKey, description: Description) -> Self {
        Self {
            operator_address: operator,
            consensus_pubkey: pubkey,
            jailed: false,
            status: BondStatus::Unbonded,
            tokens: Int::zero(),
            delegator_shares: Dec::zero(),
            description,
            unbonding_height: 0,
            unbonding_time: Timestamp::ZERO,
            commission: Commission::default(),
            min_self_delegation: Int::from_u64(1),
        }
    }

    /// Consensus address.
    pub fn cons_address(&self) -> ConsAddress {
        self.consensus_pubkey.cons_address()
    }

    /// Bonded?
    pub fn is_bonded(&self) -> bool {
        self.status == BondStatus::Bonded
    }

    /// Unbonded?
    pub fn is_unbonded(&self) -> bool {
        self.status == BondStatus::Unbonded
    }

    /// Unbonding?
    pub fn is_unbonding(&self) -> bool {
        self.status == BondStatus::Unbonding
    }

    /// Shares outstanding against zero tokens: the exchange rate is undefined.
    pub fn invalid_ex_rate(&self) -> bool {
        self.tokens.is_zero() && !self.delegator_shares.is_zero()
    }

    /// Token value of `shares`, full precision.
    pub fn tokens_from_shares(&self, shares: Dec) -> Dec {
        match shares.checked_mul_int_quo(self.tokens, self.delegator_shares) {
            Some(t) => t,
            None => panic!("Dec overflow: {shares} shares of validator {}", self.operator_address),
        }
    }

    /// Token value of `shares`, truncated.
    pub fn tokens_from_shares_truncated(&self, shares: Dec) -> Dec {
        match shares.checked_mul_int_quo_truncate(self.tokens, self.delegator_shares) {
            Some(t) => t,
            None => panic!("Dec overflow: {shares} shares of validator {}", self.operator_address),
        }
    }

    /// Shares worth `amt` tokens.
    pub fn shares_from_tokens(&self, amt: Int) -> Result<Dec, StakingError> {
        if self.tokens.is_zero() {
            return Err(StakingError::InsufficientShares);
        }
        self.delegator_shares
            .checked_mul_int_quo_int(amt, self.tokens)
            .ok_or(StakingError::InvalidDelegationAmount)
    }

    /// Shares worth `amt` tokens, truncated.
    pub fn shares_from_tokens_truncated(&self, amt: Int) -> Result<Dec, StakingError> {
        if self.tokens.is_zero() {
            return Err(StakingError::InsufficientShares);
        }
        self.delegator_shares
            .checked_mul_int_quo_int(amt, self.tokens)
            .ok_or(StakingError::InvalidDelegationAmount)
    }

    /// Tokens counted toward the bonded set.
    pub fn bonded_tokens(&self) -> Int {
        if self.is_bonded() {
            self.tokens
        } else {
            Int::zero()
        }
    }

    /// Power if bonded, zero otherwise.
    pub fn consensus_power(&self, power_reduction: Int) -> i64 {
        if self.is_bonded() {
            self.potential_consensus_power(power_reduction)
        } else {
            0
        }
    }

    /// `tokens / power_reduction`, whatever the status.
    pub fn potential_consensus_power(&self, power_reduction: Int) -> i64 {
        (self.tokens / power_reduction).to_i64_saturating()
    }

    /// Change status. Token pool movements are the caller's job.
    pub fn update_status(&mut self, status: BondStatus) {
        self.status = status;
    }

    /// Add tokens from a delegation; returns the shares issued.
    pub fn add_tokens_from_del(&mut self, amount: Int) -> Dec {
        let issued = if self.delegator_shares.is_zero() {
            // first delegation (or after a full exit) sets a 1:1 rate
            Dec::from_int(amount)
        } else {
            match self.shares_from_tokens(amount) {
                Ok(s) => s,
                Err(e) => panic!("delegation to validator {}: {e}", self.operator_address),
            }
        };
        self.tokens += amount;
        self.delegator_shares += issued;
        issued
    }

    /// Remove tokens without touching shares (slashing).
    pub fn remove_tokens(&mut self, tokens: Int) {
        match self.tokens.checked_sub(tokens) {
            Some(t) => self.tokens = t,
            None => panic!(
                "attempting to remove {tokens} tokens from validator {} holding {}",
                self.operator_address, self.tokens
            ),
        }
    }

    /// Burn `del_shares`; returns the tokens released. Fractional tokens stay with the validator.
    pub fn remove_del_shares(&mut self, del_shares: Dec) -> Int {
        let remaining = self.delegator_shares - del_shares;
        let issued = if remaining.is_zero() {
            // last delegator takes everything left, including rounding residue
            let all = self.tokens;
            self.tokens = Int::zero();
            all
        } else {
            let t = self.tokens_from_shares(del_shares).truncate_int();
            self.remove_tokens(t);
            t
        };
        self.delegator_shares = remaining;
        issued
    }

    /// Update for the consensus engine.
    pub fn abci_validator_update(&self, power_reduction: Int) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.consensus_pubkey.clone(),
            power: self.consensus_power(power_reduction),
        }
    }

    /// Removal update for the consensus engine.
    pub fn abci_validator_update_zero(&self) -> ValidatorUpdate {
        ValidatorUpdate {
            pub_key: self.consensus_pubkey.clone(),
            power: 0,
        }
    }
}

/// Power change for the consensus engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorUpdate {
    /// Consensus key.
    pub pub_key: PubKey,
    /// New power; zero removes the validator.
    pub power: i64,
}

/// Delegation record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
    /// Shares held.
    pub shares: Dec,
}

impl Delegation {
    /// Construct.
    pub fn new(delegator: AccAddress, validator: ValAddress, shares: Dec) -> Self {
        Self {
            delegator_address: delegator,
            validator_address: validator,
            shares,
        }
    }
}

/// One pending undelegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegationEntry {
    /// Height the undelegation happened at.
    pub creation_height: i64,
    /// Payout time.
    pub completion_time: Timestamp,
    /// Tokens at creation.
    pub initial_balance: Int,
    /// Tokens to pay out (reduced by slashing).
    pub balance: Int,
}

impl UnbondingDelegationEntry {
    /// True once `completion_time` has passed.
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

/// All pending undelegations for one (delegator, validator) pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
    /// Entries in creation order.
    pub entries: Vec<UnbondingDelegationEntry>,
}

impl UnbondingDelegation {
    /// Empty record for a pair.
    pub fn new(delegator: AccAddress, validator: ValAddress) -> Self {
        Self {
            delegator_address: delegator,
            validator_address: validator,
            entries: Vec::new(),
        }
    }

    /// Append, or merge with an entry sharing height and completion time.
    pub fn add_entry(&mut self, creation_height: i64, completion_time: Timestamp, balance: Int) {
        if let Some(e) = self
            .entries
            .iter_mut()
            .find(|e| e.creation_height == creation_height && e.completion_time == completion_time)
        {
            e.initial_balance += balance;
            e.balance += balance;
            return;
        }
        self.entries.push(UnbondingDelegationEntry {
            creation_height,
            completion_time,
            initial_balance: balance,
            balance,
        });
    }
}

/// One pending redelegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedelegationEntry {
    /// Height the redelegation happened at.
    pub creation_height: i64,
    /// Time the source validator stops being liable.
    pub completion_time: Timestamp,
    /// Tokens moved.
    pub initial_balance: Int,
    /// Shares created at the destination.
    pub shares_dst: Dec,
}

impl RedelegationEntry {
    /// True once `completion_time` has passed.
    pub fn is_mature(&self, now: Timestamp) -> bool {
        self.completion_time <= now
    }
}

/// All pending redelegations for one (delegator, source, destination) triple.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redelegation {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Source validator.
    pub validator_src_address: ValAddress,
    /// Destination validator.
    pub validator_dst_address: ValAddress,
    /// Entries in creation order.
    pub entries: Vec<RedelegationEntry>,
}

impl Redelegation {
    /// Empty record for a triple.
    pub fn new(delegator: AccAddress, src: ValAddress, dst: ValAddress) -> Self {
        Self {
            delegator_address: delegator,
            validator_src_address: src,
            validator_dst_address: dst,
            entries: Vec::new(),
        }
    }
}

/// (delegator, validator) pair stored in the unbonding queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvPair {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Validator.
    pub validator_address: ValAddress,
}

/// (delegator, src, dst) triple stored in the redelegation queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DvvTriplet {
    /// Delegator.
    pub delegator_address: AccAddress,
    /// Source validator.
    pub validator_src_address: ValAddress,
    /// Destination validator.
    pub validator_dst_address: ValAddress,
}

/// Snapshot of the bonded set at a height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalInfo {
    /// Header of the block.
    pub header: BlockHeader,
    /// Bonded validators by power.
    pub valset: Vec<Validator>,
}

/// Module parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Time a bond stays slashable after unbonding starts.
    pub unbonding_time: Duration,
    /// Size of the active set.
    pub max_validators: u32,
    /// Max entries per unbonding delegation or redelegation.
    pub max_entries: u32,
    /// Heights of historical info kept.
    pub historical_entries: u32,
    /// Bondable denomination.
    pub bond_denom: String,
    /// Floor for every validator's commission rate.
    pub min_commission_rate: Dec,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            unbonding_time: Duration::from_secs(60 * 60 * 24 * 21),
            max_validators: 100,
            max_entries: 7,
            historical_entries: 10_000,
            bond_denom: "stake".to_string(),
            min_commission_rate: Dec::zero(),
        }
    }
}

impl Params {
    /// Validate.
    pub fn validate(&self) -> Result<(), StakingError> {
        let bad = |m: &str| Err(StakingError::InvalidParams(m.to_string()));
        if self.unbonding_time.is_zero() {
            return bad("unbonding time must be positive");
        }
        if self.max_validators == 0 {
            return bad("max validators must be positive");
        }
        if self.max_entries == 0 {
            return bad("max entries must be positive");
        }
        if self.bond_denom.trim().is_empty() {
            return bad("bond denom cannot be blank");
        }
        if !crate::core::types::Coin::validate_denom(&self.bond_denom) {
            return bad("invalid bond denom");
        }
        if self.min_commission_rate > Dec::one() {
            return bad("minimum commission rate cannot be greater than 100%");
        }
        Ok(())
    }
}
