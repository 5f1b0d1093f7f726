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

use crate::core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Epochs errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpochsError {
    /// Identifier is empty.
    #[error("epoch identifier should NOT be empty")]
    EmptyIdentifier,
    /// Duration is zero.
    #[error("epoch duration should NOT be 0")]
    ZeroDuration,
    /// Epoch counter below zero.
    #[error("current epoch cannot be negative")]
    NegativeEpoch,
    /// Start height below zero.
    #[error("current epoch start height cannot be negative")]
    NegativeStartHeight,
    /// Identifier already registered.
    #[error("epoch with identifier {0} already exists")]
    DuplicateIdentifier(String),
    /// Identifier not registered.
    #[error("epoch with identifier {0} not found")]
    EpochNotFound(String),
}

impl EpochsError {
    /// Error codespace.
    pub fn codespace(&self) -> &'static str {
        "epochs"
    }

    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            EpochsError::EmptyIdentifier => 2,
            EpochsError::ZeroDuration => 3,
            EpochsError::NegativeEpoch => 4,
            EpochsError::NegativeStartHeight => 5,
            EpochsError::DuplicateIdentifier(_) => 6,
            EpochsError::EpochNotFound(_) => 7,
        }
    }
}

/// A named periodic timer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochInfo {
    /// Unique name.
    pub identifier: String,
    /// First epoch may not start before this time.
    pub start_time: Timestamp,
    /// Length of one epoch.
    pub duration: Duration,
    /// Number of the running epoch; zero before the first tick.
    pub current_epoch: i64,
    /// Nominal start of the running epoch (advances by exactly `duration`).
    pub current_epoch_start_time: Timestamp,
    /// True once the first tick happened.
    pub epoch_counting_started: bool,
    /// Height of the block that started the running epoch.
    pub current_epoch_start_height: i64,
}

impl EpochInfo {
    /// Fresh timer that starts at the block it is added in.
    pub fn new(identifier: impl Into<String>, duration: Duration) -> Self {
        Self {
            identifier: identifier.into(),
            start_time: Timestamp::ZERO,
            duration,
            current_epoch: 0,
            current_epoch_start_time: Timestamp::ZERO,
            epoch_counting_started: false,
            current_epoch_start_height: 0,
        }
    }

    /// Stateless checks.
    pub fn validate(&self) -> Result<(), EpochsError> {
        if self.identifier.trim().is_empty() {
            return Err(EpochsError::EmptyIdentifier);
        }
        if self.duration.is_zero() {
            return Err(EpochsError::ZeroDuration);
        }
        if self.current_epoch < 0 {
            return Err(EpochsError::NegativeEpoch);
        }
        if self.current_epoch_start_height < 0 {
            return Err(EpochsError::NegativeStartHeight);
        }
        Ok(())
    }

    /// End of the running epoch.
    pub fn current_epoch_end(&self) -> Timestamp {
        self.current_epoch_start_time + self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_bad_timers() {
        assert_eq!(
            EpochInfo::new("", Duration::from_secs(1)).validate(),
            Err(EpochsError::EmptyIdentifier)
        );
        assert_eq!(
            EpochInfo::new("day", Duration::ZERO).validate(),
            Err(EpochsError::ZeroDuration)
        );
        let mut e = EpochInfo::new("day", Duration::from_secs(1));
        e.current_epoch = -1;
        assert_eq!(e.validate(), Err(EpochsError::NegativeEpoch));
        e.current_epoch = 0;
        e.current_epoch_start_height = -3;
        assert_eq!(e.validate(), Err(EpochsError::NegativeStartHeight));
    }
}
