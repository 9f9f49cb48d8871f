use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing strategy inputs
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unsupported deployment strategy: {0:?}")]
    DeploymentStrategy(String),

    #[error("Unrecognized traffic split method: {0:?}")]
    TrafficSplitMethod(String),

    #[error("Unrecognized route method: {0:?}")]
    RouteStrategy(String),
}

/// Rollout mechanism that produced the release being rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentStrategy {
    /// Canary and baseline workloads running next to the stable one
    Canary,
    /// Two full environments, routing flipped between them
    BlueGreen,
}

impl DeploymentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentStrategy::Canary => "canary",
            DeploymentStrategy::BlueGreen => "blue-green",
        }
    }
}

impl fmt::Display for DeploymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentStrategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canary" => Ok(DeploymentStrategy::Canary),
            "blue-green" => Ok(DeploymentStrategy::BlueGreen),
            _ => Err(ParseError::DeploymentStrategy(s.to_string())),
        }
    }
}

/// How canary traffic was split between stable, baseline and canary
///
/// `Pod` means no mesh integration: traffic follows replica counts behind a
/// single Service, so there is nothing to redirect on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficSplitMethod {
    Pod,
    Smi,
}

impl TrafficSplitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrafficSplitMethod::Pod => "pod",
            TrafficSplitMethod::Smi => "smi",
        }
    }
}

impl fmt::Display for TrafficSplitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrafficSplitMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smi" => Ok(TrafficSplitMethod::Smi),
            // "none" is accepted as an alias for the no-mesh method
            "pod" | "none" => Ok(TrafficSplitMethod::Pod),
            _ => Err(ParseError::TrafficSplitMethod(s.to_string())),
        }
    }
}

/// Mechanism that directs live traffic in a blue-green rollout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStrategy {
    /// Ingress rules point at the active Services
    Ingress,
    /// An SMI TrafficSplit weights stable against green
    Smi,
    /// The Service selector picks the active workload
    Service,
}

impl RouteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStrategy::Ingress => "ingress",
            RouteStrategy::Smi => "smi",
            RouteStrategy::Service => "service",
        }
    }
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStrategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ingress" => Ok(RouteStrategy::Ingress),
            "smi" => Ok(RouteStrategy::Smi),
            "service" => Ok(RouteStrategy::Service),
            _ => Err(ParseError::RouteStrategy(s.to_string())),
        }
    }
}
