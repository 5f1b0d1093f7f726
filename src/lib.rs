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

//! Amunchain application modules.
//!
//! This crate provides:
//! - A proof-of-stake staking engine (validators, delegations, slashing, jailing)
//! - Named periodic epoch timers with isolated listeners
//! - A crisis registry that asserts state invariants and halts on violation
//! - Persistent key-value state with deterministic Merkle roots and proofs
//! - Monitoring via Prometheus metrics and structured JSON logging

/// Core primitives and engines.
pub mod core;
/// Observability (metrics, structured logging).
pub mod monitoring;
