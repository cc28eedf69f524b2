//! Configuration types for the sweep

/// Region used to bootstrap region discovery and account validation before
/// any per-region session exists.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Configuration for one invocation of the sweep.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// AWS credential profile name.
    pub profile: String,

    /// Single region override; `None` sweeps every region supporting EC2.
    pub region: Option<String>,

    /// Compute and print plans without deleting anything.
    pub dry_run: bool,

    /// Skip the interactive confirmation prompt.
    pub batch: bool,
}
