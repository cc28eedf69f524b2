//! vpc-sweep - default network teardown
//!
//! This crate provides the binary that discovers a cloud account's default
//! VPCs region by region, verifies nothing workload-level still depends on
//! them, and deletes them together with their attached resources in strict
//! dependency order.

pub mod aws;
pub mod config;
pub mod driver;
pub mod plan;
pub mod report;
