//! AWS error classification
//!
//! Classifies AWS SDK operation errors using the `.code()` metadata instead of
//! string matching on Debug output. The categories map directly to how the
//! sweep reacts: capability gaps become empty results, expected rejections are
//! swallowed per resource, everything else aborts the region.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use thiserror::Error;

/// AWS error categories for the sweep.
#[derive(Debug, Error)]
pub enum AwsError {
    /// More than one default network in a single region. This should never
    /// happen on a healthy account and there is no safe way to pick one.
    #[error("found {count} default networks in {region}, expected at most one")]
    MultipleDefaultNetworks { region: String, count: usize },

    /// The service is not available in the current region.
    #[error("service unavailable in this region: {message}")]
    UnsupportedInRegion { message: String },

    /// The provider refused the delete, e.g. for the default route table,
    /// default network ACL, or default security group of a VPC.
    #[error("{message}")]
    CannotDeleteDefault { message: String },

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Generic AWS SDK error with code and message.
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// True for rejections that are expected when the target is a
    /// provider-managed default object.
    pub fn is_expected_rejection(&self) -> bool {
        matches!(self, AwsError::CannotDeleteDefault { .. })
    }

    /// True when the error means the service does not exist in this region.
    pub fn is_capability_gap(&self) -> bool {
        matches!(self, AwsError::UnsupportedInRegion { .. })
    }
}

/// Error codes the provider raises when deleting a VPC's default objects.
///
/// `DependencyViolation` is the main route table, `CannotDelete` the default
/// security group, `InvalidParameterValue`/`OperationNotPermitted` the default
/// network ACL depending on API vintage.
const EXPECTED_REJECTION_CODES: &[&str] = &[
    "CannotDelete",
    "DependencyViolation",
    "InvalidParameterValue",
    "OperationNotPermitted",
];

/// Error codes for a service that is not offered in the current region.
const CAPABILITY_GAP_CODES: &[&str] = &["UnsupportedOperation", "InvalidAction"];

/// Error codes for throttling/rate limiting.
const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// Classify an AWS error from its code and message.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("unknown error").to_string();

    match code {
        Some(c) if EXPECTED_REJECTION_CODES.contains(&c) => {
            AwsError::CannotDeleteDefault { message }
        }
        Some(c) if CAPABILITY_GAP_CODES.contains(&c) => AwsError::UnsupportedInRegion { message },
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled { message },
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}

/// Classify any SDK operation error via its `ProvideErrorMetadata` impl.
pub fn classify_sdk<E: ProvideErrorMetadata>(err: &E) -> AwsError {
    classify_aws_error(err.code(), err.message())
}
