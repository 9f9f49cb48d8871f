//! Rejection (rollback) of progressive-delivery rollouts on Kubernetes
//!
//! - `controller`: the reject dispatcher, its canary and blue-green workflows,
//!   and the rollback helpers they sequence
//! - `cluster`: the cluster handle the helpers mutate objects through
//! - `manifest`: manifest parsing and blue-green grouping
//! - `types`: strategy vocabularies parsed from action inputs
//! - `config`: action inputs

pub mod cluster;
pub mod config;
pub mod controller;
pub mod manifest;
pub mod types;
