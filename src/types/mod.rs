//! Closed vocabularies that drive rollback selection
//!
//! Every value here is parsed from external text (action inputs) and then
//! matched exhaustively by the dispatcher.

pub mod strategy;

pub use strategy::{DeploymentStrategy, ParseError, RouteStrategy, TrafficSplitMethod};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
#[path = "strategy_test.rs"]
mod strategy_tests;
