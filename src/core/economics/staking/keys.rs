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

//! Staking store layout. Every address segment is length-prefixed (one byte).

use super::types::Validator;
use crate::core::math::Int;
use crate::core::types::{AccAddress, ConsAddress, Timestamp, ValAddress};

pub const LAST_VALIDATOR_POWER_KEY: u8 = 0x11;
pub const LAST_TOTAL_POWER_KEY: u8 = 0x12;

pub const VALIDATORS_KEY: u8 = 0x21;
pub const VALIDATORS_BY_CONS_ADDR_KEY: u8 = 0x22;
pub const VALIDATORS_BY_POWER_INDEX_KEY: u8 = 0x23;

pub const DELEGATION_KEY: u8 = 0x31;
pub const UNBONDING_DELEGATION_KEY: u8 = 0x32;
pub const UNBONDING_DELEGATION_BY_VAL_INDEX_KEY: u8 = 0x33;
pub const REDELEGATION_KEY: u8 = 0x34;
pub const REDELEGATION_BY_VAL_SRC_INDEX_KEY: u8 = 0x35;
pub const REDELEGATION_BY_VAL_DST_INDEX_KEY: u8 = 0x36;

pub const UNBONDING_QUEUE_KEY: u8 = 0x41;
pub const REDELEGATION_QUEUE_KEY: u8 = 0x42;
pub const VALIDATOR_QUEUE_KEY: u8 = 0x43;

pub const HISTORICAL_INFO_KEY: u8 = 0x50;
pub const PARAMS_KEY: u8 = 0x51;

fn push_len_prefixed(out: &mut Vec<u8>, b: &[u8]) {
    // Addresses are at most 255 bytes; longer input would corrupt the layout.
    assert!(b.len() <= u8::MAX as usize, "address too long for key");
    out.push(b.len() as u8);
    out.extend_from_slice(b);
}

/// Split one length-prefixed segment off the front.
fn take_len_prefixed(b: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = b.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

fn key1(prefix: u8, a: &[u8]) -> Vec<u8> {
    let mut k = Vec::with_capacity(2 + a.len());
    k.push(prefix);
    push_len_prefixed(&mut k, a);
    k
}

fn key2(prefix: u8, a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut k = key1(prefix, a);
    push_len_prefixed(&mut k, b);
    k
}

fn key3(prefix: u8, a: &[u8], b: &[u8], c: &[u8]) -> Vec<u8> {
    let mut k = key2(prefix, a, b);
    push_len_prefixed(&mut k, c);
    k
}

pub fn validator_key(op: &ValAddress) -> Vec<u8> {
    key1(VALIDATORS_KEY, op.as_bytes())
}

pub fn validator_by_cons_addr_key(cons: &ConsAddress) -> Vec<u8> {
    key1(VALIDATORS_BY_CONS_ADDR_KEY, cons.as_bytes())
}

pub fn last_validator_power_key(op: &ValAddress) -> Vec<u8> {
    key1(LAST_VALIDATOR_POWER_KEY, op.as_bytes())
}

pub fn address_from_last_validator_power_key(key: &[u8]) -> Option<ValAddress> {
    let (addr, _) = take_len_prefixed(key.get(1..)?)?;
    Some(ValAddress(addr.to_vec()))
}

/// `0x23 ‖ power (8 bytes BE) ‖ len ‖ ^operator`.
///
/// Reverse iteration yields highest power first and, for equal power, the
/// lexicographically smaller operator address first.
pub fn validators_by_power_index_key(v: &Validator, power_reduction: Int) -> Vec<u8> {
    let power = v.potential_consensus_power(power_reduction) as u64;
    let inverted: Vec<u8> = v.operator_address.as_bytes().iter().map(|b| !b).collect();
    let mut k = Vec::with_capacity(10 + inverted.len());
    k.push(VALIDATORS_BY_POWER_INDEX_KEY);
    k.extend_from_slice(&power.to_be_bytes());
    push_len_prefixed(&mut k, &inverted);
    k
}

/// Recover the operator address from a power index key.
pub fn parse_validator_power_rank_key(key: &[u8]) -> Option<ValAddress> {
    let (inverted, rest) = take_len_prefixed(key.get(9..)?)?;
    if !rest.is_empty() {
        return None;
    }
    Some(ValAddress(inverted.iter().map(|b| !b).collect()))
}

pub fn delegation_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key2(DELEGATION_KEY, del.as_bytes(), val.as_bytes())
}

pub fn delegations_key(del: &AccAddress) -> Vec<u8> {
    key1(DELEGATION_KEY, del.as_bytes())
}

pub fn ubd_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key2(UNBONDING_DELEGATION_KEY, del.as_bytes(), val.as_bytes())
}

pub fn ubd_by_val_index_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    key2(
        UNBONDING_DELEGATION_BY_VAL_INDEX_KEY,
        val.as_bytes(),
        del.as_bytes(),
    )
}

pub fn ubds_by_val_key(val: &ValAddress) -> Vec<u8> {
    key1(UNBONDING_DELEGATION_BY_VAL_INDEX_KEY, val.as_bytes())
}

/// (delegator, validator) from a by-validator unbonding index key.
pub fn parse_ubd_by_val_index_key(key: &[u8]) -> Option<(AccAddress, ValAddress)> {
    let (val, rest) = take_len_prefixed(key.get(1..)?)?;
    let (del, _) = take_len_prefixed(rest)?;
    Some((AccAddress(del.to_vec()), ValAddress(val.to_vec())))
}

pub fn red_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key3(
        REDELEGATION_KEY,
        del.as_bytes(),
        src.as_bytes(),
        dst.as_bytes(),
    )
}

pub fn red_by_val_src_index_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key3(
        REDELEGATION_BY_VAL_SRC_INDEX_KEY,
        src.as_bytes(),
        del.as_bytes(),
        dst.as_bytes(),
    )
}

pub fn red_by_val_dst_index_key(del: &AccAddress, src: &ValAddress, dst: &ValAddress) -> Vec<u8> {
    key3(
        REDELEGATION_BY_VAL_DST_INDEX_KEY,
        dst.as_bytes(),
        del.as_bytes(),
        src.as_bytes(),
    )
}

pub fn reds_from_val_src_index_key(src: &ValAddress) -> Vec<u8> {
    key1(REDELEGATION_BY_VAL_SRC_INDEX_KEY, src.as_bytes())
}

pub fn reds_to_val_dst_by_delegator_key(dst: &ValAddress, del: &AccAddress) -> Vec<u8> {
    key2(
        REDELEGATION_BY_VAL_DST_INDEX_KEY,
        dst.as_bytes(),
        del.as_bytes(),
    )
}

/// (delegator, src, dst) from a by-source redelegation index key.
pub fn parse_red_by_val_src_index_key(
    key: &[u8],
) -> Option<(AccAddress, ValAddress, ValAddress)> {
    let (src, rest) = take_len_prefixed(key.get(1..)?)?;
    let (del, rest) = take_len_prefixed(rest)?;
    let (dst, _) = take_len_prefixed(rest)?;
    Some((
        AccAddress(del.to_vec()),
        ValAddress(src.to_vec()),
        ValAddress(dst.to_vec()),
    ))
}

fn time_key(prefix: u8, t: Timestamp) -> Vec<u8> {
    key1(prefix, &t.sortable_bytes())
}

pub fn ubd_queue_key(t: Timestamp) -> Vec<u8> {
    time_key(UNBONDING_QUEUE_KEY, t)
}

pub fn red_queue_key(t: Timestamp) -> Vec<u8> {
    time_key(REDELEGATION_QUEUE_KEY, t)
}

/// `0x43 ‖ len ‖ time ‖ height (8 bytes BE)`.
pub fn validator_queue_key(t: Timestamp, height: i64) -> Vec<u8> {
    let mut k = time_key(VALIDATOR_QUEUE_KEY, t);
    k.extend_from_slice(&(height.max(0) as u64).to_be_bytes());
    k
}

/// (time, height) from a validator queue key.
pub fn parse_validator_queue_key(key: &[u8]) -> Option<(Timestamp, i64)> {
    let (time, rest) = take_len_prefixed(key.get(1..)?)?;
    let t = Timestamp::from_sortable_bytes(time)?;
    let h: [u8; 8] = rest.try_into().ok()?;
    Some((t, u64::from_be_bytes(h) as i64))
}

pub fn historical_info_key(height: i64) -> Vec<u8> {
    let mut k = vec![HISTORICAL_INFO_KEY];
    k.extend_from_slice(&(height.max(0) as u64).to_be_bytes());
    k
}

pub fn params_key() -> Vec<u8> {
    vec![PARAMS_KEY]
}
