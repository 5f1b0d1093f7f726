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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prom(#[from] prometheus::Error),
}

/// Metrics container.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Last finished block height.
    pub block_height: IntGauge,
    /// Transactions delivered.
    pub transactions_total: IntCounter,
    /// Transactions rolled back (error or out of gas).
    pub tx_failures_total: IntCounter,

    /// Epoch listener failures (contained).
    pub epoch_hook_errors_total: IntCounter,
    /// Full invariant assertion passes.
    pub invariant_checks_total: IntCounter,
    /// Slashes that burned tokens.
    pub validators_slashed_total: IntCounter,
    /// Jailed validators after the last block.
    pub validators_jailed: IntGauge,
    /// Bonded validators after the last block.
    pub bonded_validators: IntGauge,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let block_height = IntGauge::new("amunchain_block_height", "Current block height")?;
        let transactions_total =
            IntCounter::new("amunchain_transactions_total", "Total tx processed")?;
        let tx_failures_total =
            IntCounter::new("amunchain_tx_failures_total", "Transactions rolled back")?;

        let epoch_hook_errors_total = IntCounter::new(
            "amunchain_epoch_hook_errors_total",
            "Failed epoch hook calls",
        )?;
        let invariant_checks_total = IntCounter::new(
            "amunchain_invariant_checks_total",
            "Invariant assertion passes",
        )?;
        let validators_slashed_total =
            IntCounter::new("amunchain_validators_slashed_total", "Validator slashes")?;
        let validators_jailed =
            IntGauge::new("amunchain_validators_jailed", "Currently jailed validators")?;
        let bonded_validators =
            IntGauge::new("amunchain_bonded_validators", "Validators in the active set")?;

        registry.register(Box::new(block_height.clone()))?;
        registry.register(Box::new(transactions_total.clone()))?;
        registry.register(Box::new(tx_failures_total.clone()))?;
        registry.register(Box::new(epoch_hook_errors_total.clone()))?;
        registry.register(Box::new(invariant_checks_total.clone()))?;
        registry.register(Box::new(validators_slashed_total.clone()))?;
        registry.register(Box::new(validators_jailed.clone()))?;
        registry.register(Box::new(bonded_validators.clone()))?;

        Ok(Self {
            registry,
            block_height,
            transactions_total,
            tx_failures_total,
            epoch_hook_errors_total,
            invariant_checks_total,
            validators_slashed_total,
            validators_jailed,
            bonded_validators,
        })
    }

    /// Prometheus text exposition of every metric.
    pub fn render(&self) -> Result<String, MetricsError> {
        use prometheus::Encoder;
        let mut buf = Vec::new();
        prometheus::TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
