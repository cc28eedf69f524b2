//! Default network discovery and teardown operations
//!
//! Wraps the EC2 client with the enumerations and deletions the sweep needs,
//! all scoped to a single VPC id. Enumerations page through every result and
//! treat absence as an empty set; deletions return a tagged outcome instead of
//! an error so the executor can distinguish expected rejections from faults.

use crate::aws::context::AwsContext;
use crate::aws::error::{classify_sdk, AwsError};
use crate::aws::tags::HasTags;
use crate::plan::{
    DeleteOutcome, Gateway, Network, NetworkAclInfo, RouteTableInfo, SecurityGroupInfo, SubnetInfo,
};
use anyhow::{Context, Result};
use aws_sdk_ec2::types::{self, Filter};
use aws_sdk_ec2::Client;
use tracing::{debug, warn};

/// EC2 client for the default network and its attached resources.
pub struct Ec2Client {
    client: Client,
}

impl Ec2Client {
    /// Create an EC2 client from a pre-loaded AWS context.
    pub fn from_context(ctx: &AwsContext) -> Self {
        Self {
            client: ctx.ec2_client(),
        }
    }

    fn scope(filter_name: &str, vpc_id: &str) -> Filter {
        Filter::builder().name(filter_name).values(vpc_id).build()
    }

    /// All region names that support EC2, for the no-`--region` case.
    pub async fn list_region_names(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .describe_regions()
            .send()
            .await
            .context("Failed to describe regions")?;

        Ok(response
            .regions()
            .iter()
            .filter_map(|r| r.region_name())
            .map(str::to_string)
            .collect())
    }

    /// Find the region's default VPC, if it still exists.
    ///
    /// More than one default VPC is a provider-side inconsistency the sweep
    /// refuses to guess about.
    pub async fn find_default_vpc(&self, region: &str) -> Result<Option<Network>> {
        let response = self
            .client
            .describe_vpcs()
            .filters(Filter::builder().name("is-default").values("true").build())
            .send()
            .await
            .context("Failed to describe VPCs")?;

        let vpcs = response.vpcs();
        if vpcs.len() > 1 {
            return Err(AwsError::MultipleDefaultNetworks {
                region: region.to_string(),
                count: vpcs.len(),
            }
            .into());
        }

        Ok(vpcs.first().map(network_info))
    }

    /// Internet gateways attached to the VPC.
    pub async fn internet_gateways(&self, vpc_id: &str) -> Result<Vec<Gateway>> {
        let mut gateways = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_internet_gateways()
                .filters(Self::scope("attachment.vpc-id", vpc_id));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe internet gateways")?;

            gateways.extend(response.internet_gateways().iter().map(gateway_info));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(vpc_id = %vpc_id, count = gateways.len(), "Found internet gateways");
        Ok(gateways)
    }

    /// Subnets of the VPC.
    pub async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>> {
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_subnets()
                .filters(Self::scope("vpc-id", vpc_id));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request.send().await.context("Failed to describe subnets")?;

            subnets.extend(response.subnets().iter().map(subnet_info));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(vpc_id = %vpc_id, count = subnets.len(), "Found subnets");
        Ok(subnets)
    }

    /// Route tables of the VPC, including the undeletable main table.
    pub async fn route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>> {
        let mut tables = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_route_tables()
                .filters(Self::scope("vpc-id", vpc_id));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe route tables")?;

            tables.extend(response.route_tables().iter().map(route_table_info));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(vpc_id = %vpc_id, count = tables.len(), "Found route tables");
        Ok(tables)
    }

    /// Network ACLs of the VPC, including the undeletable default ACL.
    pub async fn network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>> {
        let mut acls = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_network_acls()
                .filters(Self::scope("vpc-id", vpc_id));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe network ACLs")?;

            acls.extend(response.network_acls().iter().map(network_acl_info));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(vpc_id = %vpc_id, count = acls.len(), "Found network ACLs");
        Ok(acls)
    }

    /// Security groups of the VPC, including the undeletable `default` group.
    pub async fn security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>> {
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_security_groups()
                .filters(Self::scope("vpc-id", vpc_id));
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe security groups")?;

            groups.extend(response.security_groups().iter().map(security_group_info));

            match response.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        debug!(vpc_id = %vpc_id, count = groups.len(), "Found security groups");
        Ok(groups)
    }

    /// Detach a gateway from the VPC, then delete it.
    ///
    /// A detach failure (e.g. already detached) is logged and the delete still
    /// runs.
    pub async fn delete_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> DeleteOutcome {
        if let Err(err) = self
            .client
            .detach_internet_gateway()
            .internet_gateway_id(igw_id)
            .vpc_id(vpc_id)
            .send()
            .await
        {
            warn!(
                igw_id = %igw_id,
                error = %classify_sdk(&err),
                "Detach failed, deleting the gateway anyway"
            );
        }

        match self
            .client
            .delete_internet_gateway()
            .internet_gateway_id(igw_id)
            .send()
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(err) => DeleteOutcome::from_fault(classify_sdk(&err)),
        }
    }

    pub async fn delete_subnet(&self, subnet_id: &str) -> DeleteOutcome {
        match self
            .client
            .delete_subnet()
            .subnet_id(subnet_id)
            .send()
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(err) => DeleteOutcome::from_fault(classify_sdk(&err)),
        }
    }

    /// Delete a route table. The main route table is rejected by the provider
    /// and reported as `Rejected`.
    pub async fn delete_route_table(&self, route_table_id: &str) -> DeleteOutcome {
        match self
            .client
            .delete_route_table()
            .route_table_id(route_table_id)
            .send()
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(err) => DeleteOutcome::from_rejectable(classify_sdk(&err)),
        }
    }

    /// Delete a network ACL. The default ACL is rejected by the provider and
    /// reported as `Rejected`.
    pub async fn delete_network_acl(&self, network_acl_id: &str) -> DeleteOutcome {
        match self
            .client
            .delete_network_acl()
            .network_acl_id(network_acl_id)
            .send()
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(err) => DeleteOutcome::from_rejectable(classify_sdk(&err)),
        }
    }

    /// Delete a security group. The `default` group is rejected by the
    /// provider and reported as `Rejected`.
    pub async fn delete_security_group(&self, group_id: &str) -> DeleteOutcome {
        match self
            .client
            .delete_security_group()
            .group_id(group_id)
            .send()
            .await
        {
            Ok(_) => DeleteOutcome::Deleted,
            Err(err) => DeleteOutcome::from_rejectable(classify_sdk(&err)),
        }
    }

    /// Delete the VPC itself. This is the final step; a failure here means
    /// something attached is still alive and aborts the region.
    pub async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        self.client
            .delete_vpc()
            .vpc_id(vpc_id)
            .send()
            .await
            .with_context(|| format!("Failed to delete VPC {vpc_id}"))?;
        Ok(())
    }
}

fn network_info(vpc: &types::Vpc) -> Network {
    Network {
        vpc_id: vpc.vpc_id().unwrap_or_default().to_string(),
        cidr_block: vpc.cidr_block().unwrap_or_default().to_string(),
        name: vpc.name_tag(),
    }
}

fn gateway_info(igw: &types::InternetGateway) -> Gateway {
    Gateway {
        igw_id: igw.internet_gateway_id().unwrap_or_default().to_string(),
        name: igw.name_tag(),
    }
}

fn subnet_info(subnet: &types::Subnet) -> SubnetInfo {
    SubnetInfo {
        subnet_id: subnet.subnet_id().unwrap_or_default().to_string(),
        cidr_block: subnet.cidr_block().unwrap_or_default().to_string(),
        name: subnet.name_tag(),
    }
}

fn route_table_info(table: &types::RouteTable) -> RouteTableInfo {
    RouteTableInfo {
        route_table_id: table.route_table_id().unwrap_or_default().to_string(),
        name: table.name_tag(),
        is_main: table
            .associations()
            .iter()
            .any(|assoc| assoc.main() == Some(true)),
    }
}

fn network_acl_info(acl: &types::NetworkAcl) -> NetworkAclInfo {
    NetworkAclInfo {
        acl_id: acl.network_acl_id().unwrap_or_default().to_string(),
        name: acl.name_tag(),
        is_default: acl.is_default() == Some(true),
    }
}

fn security_group_info(group: &types::SecurityGroup) -> SecurityGroupInfo {
    SecurityGroupInfo {
        group_id: group.group_id().unwrap_or_default().to_string(),
        group_name: group.group_name().unwrap_or_default().to_string(),
        description: group.description().unwrap_or_default().to_string(),
        name: group.name_tag(),
    }
}

/// Network operations the region driver needs, abstracted for testing.
///
/// This trait mirrors `Ec2Client` so driver logic can be unit tested against
/// a mock without hitting real AWS.
#[allow(async_fn_in_trait)]
#[cfg_attr(test, mockall::automock)]
pub trait NetworkOps: Send + Sync {
    async fn find_default_vpc(&self, region: &str) -> Result<Option<Network>>;
    async fn internet_gateways(&self, vpc_id: &str) -> Result<Vec<Gateway>>;
    async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>>;
    async fn route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>>;
    async fn network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>>;
    async fn security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>>;
    async fn delete_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> DeleteOutcome;
    async fn delete_subnet(&self, subnet_id: &str) -> DeleteOutcome;
    async fn delete_route_table(&self, route_table_id: &str) -> DeleteOutcome;
    async fn delete_network_acl(&self, network_acl_id: &str) -> DeleteOutcome;
    async fn delete_security_group(&self, group_id: &str) -> DeleteOutcome;
    async fn delete_vpc(&self, vpc_id: &str) -> Result<()>;
}

impl NetworkOps for Ec2Client {
    async fn find_default_vpc(&self, region: &str) -> Result<Option<Network>> {
        Ec2Client::find_default_vpc(self, region).await
    }

    async fn internet_gateways(&self, vpc_id: &str) -> Result<Vec<Gateway>> {
        Ec2Client::internet_gateways(self, vpc_id).await
    }

    async fn subnets(&self, vpc_id: &str) -> Result<Vec<SubnetInfo>> {
        Ec2Client::subnets(self, vpc_id).await
    }

    async fn route_tables(&self, vpc_id: &str) -> Result<Vec<RouteTableInfo>> {
        Ec2Client::route_tables(self, vpc_id).await
    }

    async fn network_acls(&self, vpc_id: &str) -> Result<Vec<NetworkAclInfo>> {
        Ec2Client::network_acls(self, vpc_id).await
    }

    async fn security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroupInfo>> {
        Ec2Client::security_groups(self, vpc_id).await
    }

    async fn delete_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> DeleteOutcome {
        Ec2Client::delete_internet_gateway(self, igw_id, vpc_id).await
    }

    async fn delete_subnet(&self, subnet_id: &str) -> DeleteOutcome {
        Ec2Client::delete_subnet(self, subnet_id).await
    }

    async fn delete_route_table(&self, route_table_id: &str) -> DeleteOutcome {
        Ec2Client::delete_route_table(self, route_table_id).await
    }

    async fn delete_network_acl(&self, network_acl_id: &str) -> DeleteOutcome {
        Ec2Client::delete_network_acl(self, network_acl_id).await
    }

    async fn delete_security_group(&self, group_id: &str) -> DeleteOutcome {
        Ec2Client::delete_security_group(self, group_id).await
    }

    async fn delete_vpc(&self, vpc_id: &str) -> Result<()> {
        Ec2Client::delete_vpc(self, vpc_id).await
    }
}
