//! AWS client modules
//!
//! Wrappers around the AWS SDK clients the sweep touches:
//! - EC2: default VPC and its attached resources
//! - RDS / Redshift / ELB / ELBv2 / Lambda: tenant occupancy scanning
//! - STS: account validation at startup

pub mod account;
pub mod context;
pub mod ec2;
pub mod error;
pub mod tags;
pub mod tenants;

pub use account::{validate_credentials, AccountId};
pub use context::AwsContext;
pub use ec2::{Ec2Client, NetworkOps};
pub use error::{classify_aws_error, classify_sdk, AwsError};
pub use tenants::{TenantKind, TenantOps, TenantResource, TenantScanner};
