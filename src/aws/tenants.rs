//! Tenant resource scanning for the occupancy check
//!
//! A network is only deletable when nothing workload-level still lives in it.
//! The scanner queries every tenant class in a fixed order and reports what it
//! finds; it never mutates anything.

use crate::aws::context::AwsContext;
use crate::aws::error::classify_sdk;
use crate::report::Reporter;
use anyhow::{Context, Result};
use aws_sdk_ec2::types::Filter;
use aws_sdk_lambda::error::SdkError;
use tracing::{debug, warn};

/// Workload classes that block deletion of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantKind {
    Instance,
    Database,
    Cluster,
    LoadBalancer,
    LoadBalancerV2,
    Function,
}

impl TenantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TenantKind::Instance => "instance",
            TenantKind::Database => "rds",
            TenantKind::Cluster => "redshift",
            TenantKind::LoadBalancer => "elb",
            TenantKind::LoadBalancerV2 => "elbv2",
            TenantKind::Function => "lambda",
        }
    }

    /// The provider's identifying field name for this class, shown to the
    /// operator so the blocking resource can be found in the console.
    pub fn id_field(self) -> &'static str {
        match self {
            TenantKind::Instance => "InstanceId",
            TenantKind::Database => "DBInstanceIdentifier",
            TenantKind::Cluster => "ClusterIdentifier",
            TenantKind::LoadBalancer => "LoadBalancerName",
            TenantKind::LoadBalancerV2 => "LoadBalancerName",
            TenantKind::Function => "FunctionName",
        }
    }
}

/// A workload resource found inside the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantResource {
    pub kind: TenantKind,
    pub id: String,
}

impl TenantResource {
    fn new(kind: TenantKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Scanner over every tenant class, scoped to one region's clients.
pub struct TenantScanner {
    ec2: aws_sdk_ec2::Client,
    rds: aws_sdk_rds::Client,
    redshift: aws_sdk_redshift::Client,
    elb: aws_sdk_elasticloadbalancing::Client,
    elbv2: aws_sdk_elasticloadbalancingv2::Client,
    lambda: aws_sdk_lambda::Client,
    reporter: Reporter,
}

impl TenantScanner {
    /// Create a scanner from a pre-loaded AWS context.
    pub fn from_context(ctx: &AwsContext, reporter: Reporter) -> Self {
        Self {
            ec2: ctx.ec2_client(),
            rds: ctx.rds_client(),
            redshift: ctx.redshift_client(),
            elb: ctx.elb_client(),
            elbv2: ctx.elbv2_client(),
            lambda: ctx.lambda_client(),
            reporter,
        }
    }

    /// Query every tenant class and return the combined inventory.
    ///
    /// The order is fixed: instances, RDS, Redshift, classic load balancers,
    /// v2 load balancers, Lambda functions. An empty result means the network
    /// is safe to delete.
    pub async fn scan(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut tenants = Vec::new();

        self.reporter
            .line("...checking for EC2 instances on this network...");
        tenants.extend(self.instances(vpc_id).await?);

        self.reporter
            .line("...checking for RDS DB instances on this network...");
        tenants.extend(self.databases(vpc_id).await?);

        self.reporter
            .line("...checking for Redshift clusters on this network...");
        tenants.extend(self.clusters(vpc_id).await?);

        self.reporter
            .line("...checking for load balancers on this network...");
        tenants.extend(self.load_balancers(vpc_id).await?);

        self.reporter
            .line("...checking for load balancers (v2) on this network...");
        tenants.extend(self.load_balancers_v2(vpc_id).await?);

        self.reporter
            .line("...checking for Lambda functions on this network...");
        tenants.extend(self.functions(vpc_id).await?);

        debug!(vpc_id = %vpc_id, count = tenants.len(), "Occupancy scan complete");
        Ok(tenants)
    }

    /// EC2 instances in the VPC that are not already terminated.
    async fn instances(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let filters = vec![
            Filter::builder().name("vpc-id").values(vpc_id).build(),
            Filter::builder()
                .name("instance-state-name")
                .values("pending")
                .values("running")
                .values("stopping")
                .values("stopped")
                .build(),
        ];

        let mut matches = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .ec2
                .describe_instances()
                .set_filters(Some(filters.clone()));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe EC2 instances")?;

            for reservation in response.reservations() {
                for instance in reservation.instances() {
                    if let Some(id) = instance.instance_id() {
                        matches.push(TenantResource::new(TenantKind::Instance, id));
                    }
                }
            }

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(matches)
    }

    /// RDS DB instances whose subnet group lives in the VPC.
    async fn databases(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut matches = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.rds.describe_db_instances();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe RDS DB instances")?;

            for db in response.db_instances() {
                let in_vpc = db.db_subnet_group().and_then(|g| g.vpc_id()) == Some(vpc_id);
                if in_vpc {
                    if let Some(id) = db.db_instance_identifier() {
                        matches.push(TenantResource::new(TenantKind::Database, id));
                    }
                }
            }

            match response.marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(matches)
    }

    /// Redshift clusters in the VPC.
    async fn clusters(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut matches = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.redshift.describe_clusters();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe Redshift clusters")?;

            for cluster in response.clusters() {
                if cluster.vpc_id() == Some(vpc_id) {
                    if let Some(id) = cluster.cluster_identifier() {
                        matches.push(TenantResource::new(TenantKind::Cluster, id));
                    }
                }
            }

            match response.marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(matches)
    }

    /// Classic load balancers in the VPC.
    async fn load_balancers(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut matches = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.elb.describe_load_balancers();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe classic load balancers")?;

            for lb in response.load_balancer_descriptions() {
                if lb.vpc_id() == Some(vpc_id) {
                    if let Some(name) = lb.load_balancer_name() {
                        matches.push(TenantResource::new(TenantKind::LoadBalancer, name));
                    }
                }
            }

            match response.next_marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        Ok(matches)
    }

    /// Application/network load balancers in the VPC.
    async fn load_balancers_v2(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut matches = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.elbv2.describe_load_balancers();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe v2 load balancers")?;

            for lb in response.load_balancers() {
                if lb.vpc_id() == Some(vpc_id) {
                    if let Some(name) = lb.load_balancer_name() {
                        matches.push(TenantResource::new(TenantKind::LoadBalancerV2, name));
                    }
                }
            }

            match response.next_marker() {
                Some(m) if !m.is_empty() => marker = Some(m.to_string()),
                _ => break,
            }
        }

        Ok(matches)
    }

    /// Lambda functions configured into the VPC.
    ///
    /// Lambda is not offered in every region; a capability-gap error counts
    /// as zero tenants of this class rather than a region fault.
    async fn functions(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        let mut matches = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.lambda.list_functions();
            if let Some(m) = &marker {
                request = request.marker(m);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) if lambda_unavailable(&err) => {
                    warn!(error = %classify_sdk(&err), "Lambda not available in this region");
                    self.reporter
                        .line("   (Lambda is not supported in this region, skipping)");
                    return Ok(matches);
                }
                Err(err) => return Err(err).context("Failed to list Lambda functions"),
            };

            for function in response.functions() {
                let in_vpc = function.vpc_config().and_then(|v| v.vpc_id()) == Some(vpc_id);
                if in_vpc {
                    if let Some(name) = function.function_name() {
                        matches.push(TenantResource::new(TenantKind::Function, name));
                    }
                }
            }

            match response.next_marker() {
                Some(m) => marker = Some(m.to_string()),
                None => break,
            }
        }

        Ok(matches)
    }
}

/// True when the error means Lambda has no endpoint or operation in this
/// region, as opposed to a credentials or throttling fault.
fn lambda_unavailable<E, R>(err: &SdkError<E, R>) -> bool
where
    E: aws_sdk_ec2::error::ProvideErrorMetadata,
{
    matches!(err, SdkError::DispatchFailure(_)) || classify_sdk(err).is_capability_gap()
}

/// Tenant scanning seam for the region driver, mockable in tests.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait TenantOps: Send + Sync {
    async fn scan(&self, vpc_id: &str) -> Result<Vec<TenantResource>>;
}

impl TenantOps for TenantScanner {
    async fn scan(&self, vpc_id: &str) -> Result<Vec<TenantResource>> {
        TenantScanner::scan(self, vpc_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_field_names_match_the_provider() {
        assert_eq!(TenantKind::Instance.id_field(), "InstanceId");
        assert_eq!(TenantKind::Database.id_field(), "DBInstanceIdentifier");
        assert_eq!(TenantKind::Cluster.id_field(), "ClusterIdentifier");
        assert_eq!(TenantKind::LoadBalancer.id_field(), "LoadBalancerName");
        assert_eq!(TenantKind::LoadBalancerV2.id_field(), "LoadBalancerName");
        assert_eq!(TenantKind::Function.id_field(), "FunctionName");
    }

    #[test]
    fn kind_labels_are_stable() {
        for (kind, label) in [
            (TenantKind::Instance, "instance"),
            (TenantKind::Database, "rds"),
            (TenantKind::Cluster, "redshift"),
            (TenantKind::LoadBalancer, "elb"),
            (TenantKind::LoadBalancerV2, "elbv2"),
            (TenantKind::Function, "lambda"),
        ] {
            assert_eq!(kind.as_str(), label);
        }
    }
}
