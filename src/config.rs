//! Action inputs
//!
//! The action runner exports every input as an environment variable named
//! `INPUT_<NAME>` (spaces become underscores, letters are upper-cased). Inputs
//! are read once at the binary edge; the library only sees the resulting
//! structs.

use crate::types::{ParseError, RouteStrategy, TrafficSplitMethod};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

pub const STRATEGY_INPUT: &str = "strategy";
pub const MANIFESTS_INPUT: &str = "manifests";
pub const NAMESPACE_INPUT: &str = "namespace";
pub const TIMEOUT_INPUT: &str = "timeout";
pub const TRAFFIC_SPLIT_METHOD_INPUT: &str = "traffic-split-method";
pub const ROUTE_METHOD_INPUT: &str = "route-method";

/// Namespace used for manifests that do not set one
pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Input required and not supplied: {0}")]
    MissingInput(String),

    #[error("Invalid value for input {input}: {source}")]
    InvalidInput {
        input: String,
        #[source]
        source: ParseError,
    },
}

/// Environment variable the runner uses for an input
pub fn input_env_name(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Read an input from the environment; blank values count as unset
pub fn get_input(name: &str) -> Option<String> {
    std::env::var(input_env_name(name))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Options the reject workflows resolve their sub-mode from
///
/// Values are kept raw so that a missing option only fails the workflow that
/// actually needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectInputs {
    pub traffic_split_method: Option<String>,
    pub route_method: Option<String>,
}

impl RejectInputs {
    /// Build inputs from a lookup function (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        RejectInputs {
            traffic_split_method: lookup(TRAFFIC_SPLIT_METHOD_INPUT),
            route_method: lookup(ROUTE_METHOD_INPUT),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(get_input)
    }

    /// Resolve the canary traffic split method (required, strict)
    pub fn traffic_split_method(&self) -> Result<TrafficSplitMethod, ConfigError> {
        let raw = required(TRAFFIC_SPLIT_METHOD_INPUT, self.traffic_split_method.as_deref())?;
        raw.parse().map_err(|source| ConfigError::InvalidInput {
            input: TRAFFIC_SPLIT_METHOD_INPUT.to_string(),
            source,
        })
    }

    /// Resolve the blue-green route strategy
    ///
    /// The input is required, but any present value that is not `ingress` or
    /// `smi` resolves to `Service`.
    pub fn route_strategy(&self) -> Result<RouteStrategy, ConfigError> {
        let raw = required(ROUTE_METHOD_INPUT, self.route_method.as_deref())?;
        match raw.parse::<RouteStrategy>() {
            Ok(strategy) => Ok(strategy),
            Err(_) => {
                warn!(
                    route_method = raw,
                    "Unrecognized route method - falling back to service routing"
                );
                Ok(RouteStrategy::Service)
            }
        }
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingInput(name.to_string()))
}

/// Everything the binary needs to run a rejection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    /// Raw strategy text; parsed by the caller so bad values surface as
    /// unsupported strategies
    pub strategy: Option<String>,
    pub manifests: Vec<PathBuf>,
    pub namespace: String,
    pub timeout: Option<String>,
    pub reject: RejectInputs,
}

impl ActionConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let manifests = lookup(MANIFESTS_INPUT)
            .map(|raw| split_manifest_paths(&raw))
            .unwrap_or_default();
        if manifests.is_empty() {
            return Err(ConfigError::MissingInput(MANIFESTS_INPUT.to_string()));
        }

        Ok(ActionConfig {
            strategy: lookup(STRATEGY_INPUT),
            manifests,
            namespace: lookup(NAMESPACE_INPUT).unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            timeout: lookup(TIMEOUT_INPUT),
            reject: RejectInputs::from_lookup(&lookup),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(get_input)
    }
}

/// Split the manifests input on newlines, commas and semicolons
pub fn split_manifest_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(['\n', ',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
