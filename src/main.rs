//! vpc-sweep: delete the default VPC and its attached resources
//!
//! Walks one or more regions, finds the default network, verifies no workload
//! resources still depend on it, then removes its gateways, subnets, route
//! tables, network ACLs, and security groups before the network itself. The
//! occupancy check is a hard gate: an occupied network is reported and left
//! alone.

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use vpc_sweep::aws::{validate_credentials, AwsContext, Ec2Client, TenantScanner};
use vpc_sweep::config::{RunConfig, DEFAULT_REGION};
use vpc_sweep::driver::{self, RegionStatus};
use vpc_sweep::report::{self, Reporter};

#[derive(Parser, Debug)]
#[command(name = "vpc-sweep")]
#[command(about = "Delete a cloud account's default VPCs and their attached resources")]
#[command(version)]
struct Args {
    /// AWS credential profile name
    #[arg(short, long, default_value = "default")]
    profile: String,

    /// Single region to sweep (default: every region supporting EC2)
    #[arg(short, long)]
    region: Option<String>,

    /// Compute and print the deletion plan without deleting anything
    #[arg(short, long)]
    dry_run: bool,

    /// Skip the interactive confirmation prompt and execute immediately
    #[arg(short, long)]
    batch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let config = RunConfig {
        profile: args.profile,
        region: args.region,
        dry_run: args.dry_run,
        batch: args.batch,
    };

    match run(config).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Sweep aborted");
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run the sweep over every target region; returns the number of regions
/// that reported a fault.
async fn run(config: RunConfig) -> Result<usize> {
    let reporter = Reporter::stdout();

    let bootstrap_region = config.region.as_deref().unwrap_or(DEFAULT_REGION);
    let bootstrap = AwsContext::new(&config.profile, bootstrap_region).await;

    let account = validate_credentials(bootstrap.sdk_config()).await?;
    reporter.line(format!("Sweeping account {account}"));

    let regions = match &config.region {
        Some(region) => vec![region.clone()],
        None => {
            Ec2Client::from_context(&bootstrap)
                .list_region_names()
                .await?
        }
    };

    report::warning_banner(&reporter);

    let mut faults = 0usize;
    for region in &regions {
        reporter.line(format!(
            "----------------------- {region} ------------------------"
        ));

        let ctx = AwsContext::new(&config.profile, region).await;
        let network = Ec2Client::from_context(&ctx);
        let tenants = TenantScanner::from_context(&ctx, reporter.clone());

        match driver::sweep_region(&network, &tenants, &config, &reporter, region).await {
            Ok(RegionStatus::Swept { report }) => {
                if report.has_failures() {
                    reporter.line(format!(
                        "{} resource deletion(s) failed in {region}",
                        report.failed
                    ));
                    faults += 1;
                }
            }
            Ok(RegionStatus::Occupied { tenants }) => {
                debug!(region = %region, count = tenants.len(), "Network occupied, skipped");
            }
            Ok(RegionStatus::PlanOnly { attached }) => {
                debug!(region = %region, attached, "Dry run, plan only");
            }
            Ok(RegionStatus::NoDefaultNetwork | RegionStatus::Refused) => {}
            Err(err) => {
                error!(region = %region, error = %format!("{err:#}"), "Region sweep aborted");
                reporter.line(format!("Aborting {region}: {err:#}"));
                faults += 1;
            }
        }
    }

    if faults > 0 {
        reporter.line(format!("{faults} region(s) reported faults"));
    }
    Ok(faults)
}
