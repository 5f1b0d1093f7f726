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
use crate::core::context::Context;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Crisis errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrisisError {
    #[error("sender address is empty")]
    NoSender,
    #[error("unknown invariant")]
    UnknownInvariant,
    #[error("invalid authority; expected {expected}, got {got}")]
    InvalidSigner { expected: String, got: String },
    #[error("invalid constant fee: {0}")]
    InvalidCoins(String),
    #[error("invariant module name is empty")]
    EmptyModule,
    #[error("invariant route is empty")]
    EmptyRoute,
    #[error("invariant route {0} already registered")]
    DuplicateRoute(String),
    #[error(transparent)]
    Bank(#[from] BankError),
}

impl CrisisError {
    /// Error codespace; bank failures keep the bank's.
    pub fn codespace(&self) -> &'static str {
        match self {
            CrisisError::Bank(e) => e.codespace(),
            _ => "crisis",
        }
    }

    /// Stable numeric code.
    pub fn code(&self) -> u32 {
        match self {
            CrisisError::NoSender => 2,
            CrisisError::UnknownInvariant => 3,
            CrisisError::InvalidSigner { .. } => 4,
            CrisisError::InvalidCoins(_) => 5,
            CrisisError::EmptyModule => 6,
            CrisisError::EmptyRoute => 7,
            CrisisError::DuplicateRoute(_) => 8,
            CrisisError::Bank(e) => e.code(),
        }
    }
}

/// Check over the current state: `(message, broken)`.
///
/// Invariants run in a discarded cache context; any write they make is dropped.
pub type Invariant = Arc<dyn Fn(&mut Context<'_>) -> (String, bool) + Send + Sync>;

/// Standard check message layout.
pub fn format_invariant(module: &str, name: &str, msg: &str) -> String {
    format!("{module}: {name} invariant\n{msg}\n")
}

/// A registered check.
#[derive(Clone)]
pub struct InvarRoute {
    /// Owning module.
    pub module_name: String,
    /// Route inside the module.
    pub route: String,
    /// Check.
    pub invar: Invariant,
}

impl InvarRoute {
    /// `module/route`.
    pub fn full_route(&self) -> String {
        full_route(&self.module_name, &self.route)
    }
}

impl fmt::Debug for InvarRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvarRoute")
            .field("module_name", &self.module_name)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

pub(crate) fn full_route(module: &str, route: &str) -> String {
    format!("{module}/{route}")
}

/// A check that reported a broken invariant.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error(
    "invariant broken: {message}\n\tCRITICAL please submit the following transaction:\n\t\t tx crisis invariant-broken {module_name} {route}"
)]
pub struct InvariantBroken {
    /// Owning module.
    pub module_name: String,
    /// Route inside the module.
    pub route: String,
    /// Check output.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_matches_layout() {
        assert_eq!(
            format_invariant("bank", "total supply", "a != b"),
            "bank: total supply invariant\na != b\n"
        );
    }

    #[test]
    fn broken_display_names_route() {
        let b = InvariantBroken {
            module_name: "bank".into(),
            route: "supply".into(),
            message: "mismatch".into(),
        };
        let s = b.to_string();
        assert!(s.starts_with("invariant broken: mismatch"));
        assert!(s.ends_with("invariant-broken bank supply"));
    }
}
