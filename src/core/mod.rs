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

/// Coin movements between accounts and module pools.
pub mod bank;
/// TOML configuration.
pub mod config;
/// Execution context, gas and events.
pub mod context;
/// Staking.
pub mod economics;
/// Fixed-point and big-integer arithmetic.
pub mod math;
/// Block loop, epochs and crisis.
pub mod runtime;
/// Key-value stores and Merkle commitments.
pub mod state;
/// Addresses, coins, timestamps and canonical encoding.
pub mod types;
