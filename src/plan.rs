//! Deletion plan model
//!
//! Domain types for the default network and its attached resources, the fixed
//! deletion ordering, and the tagged outcome of individual delete calls.
//! Attached resources must be removed before the network itself or the
//! provider rejects the final delete with a dependency error.

use crate::aws::error::AwsError;
use crate::report::Reporter;

/// A region's default network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    pub vpc_id: String,
    pub cidr_block: String,
    pub name: String,
}

/// Internet gateway attached to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gateway {
    pub igw_id: String,
    pub name: String,
}

/// Subnet of the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub subnet_id: String,
    pub cidr_block: String,
    pub name: String,
}

/// Route table of the network. The main route table cannot be deleted and is
/// removed together with the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTableInfo {
    pub route_table_id: String,
    pub name: String,
    pub is_main: bool,
}

/// Network ACL of the network. The default ACL cannot be deleted separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAclInfo {
    pub acl_id: String,
    pub name: String,
    pub is_default: bool,
}

/// Security group of the network. The group named `default` cannot be deleted
/// separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroupInfo {
    pub group_id: String,
    pub group_name: String,
    pub description: String,
    pub name: String,
}

impl SecurityGroupInfo {
    pub fn is_default(&self) -> bool {
        self.group_name == "default"
    }
}

/// Attached-resource classes in the order they must be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachedKind {
    InternetGateway,
    Subnet,
    RouteTable,
    NetworkAcl,
    SecurityGroup,
}

impl AttachedKind {
    /// Deletion priority (lower number = delete first).
    ///
    /// The provider refuses to delete a VPC while any of these still
    /// reference it, and refuses some cross-class orders outright, so the
    /// executor walks classes strictly by this priority.
    pub fn delete_priority(self) -> u8 {
        match self {
            AttachedKind::InternetGateway => 0,
            AttachedKind::Subnet => 1,
            AttachedKind::RouteTable => 2,
            AttachedKind::NetworkAcl => 3,
            AttachedKind::SecurityGroup => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttachedKind::InternetGateway => "internet gateway",
            AttachedKind::Subnet => "subnet",
            AttachedKind::RouteTable => "route table",
            AttachedKind::NetworkAcl => "network ACL",
            AttachedKind::SecurityGroup => "security group",
        }
    }
}

/// Outcome of a single delete call.
///
/// Expected provider rejections (default route table, default ACL, default
/// security group) are values, not errors; the executor prints a note and
/// keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Resource deleted.
    Deleted,
    /// The provider kept the resource; expected for provider-managed
    /// defaults, which disappear with the network itself.
    Rejected { message: String },
    /// Delete failed for an unexpected reason. Logged and counted, the plan
    /// continues.
    Failed { message: String },
}

impl DeleteOutcome {
    /// Outcome for classes where the provider-managed default object makes
    /// rejections expected (route tables, network ACLs, security groups).
    pub fn from_rejectable(err: AwsError) -> Self {
        if err.is_expected_rejection() {
            DeleteOutcome::Rejected {
                message: err.to_string(),
            }
        } else {
            DeleteOutcome::Failed {
                message: err.to_string(),
            }
        }
    }

    /// Outcome for classes with no undeletable default object.
    pub fn from_fault(err: AwsError) -> Self {
        DeleteOutcome::Failed {
            message: err.to_string(),
        }
    }
}

/// The immutable, ordered set of deletions for one network.
///
/// Computed after the occupancy check passes and consumed exactly once by the
/// executor.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    pub network: Network,
    pub gateways: Vec<Gateway>,
    pub subnets: Vec<SubnetInfo>,
    pub route_tables: Vec<RouteTableInfo>,
    pub network_acls: Vec<NetworkAclInfo>,
    pub security_groups: Vec<SecurityGroupInfo>,
}

impl DeletionPlan {
    /// Number of attached resources in the plan, excluding the network.
    pub fn attached_count(&self) -> usize {
        self.gateways.len()
            + self.subnets.len()
            + self.route_tables.len()
            + self.network_acls.len()
            + self.security_groups.len()
    }

    /// Render the full plan for the operator.
    pub fn render(&self, reporter: &Reporter) {
        let net = &self.network;
        reporter.line(format!(
            "VPC: {} ({} - {})",
            net.vpc_id, net.name, net.cidr_block
        ));
        for igw in &self.gateways {
            reporter.line(format!("Internet Gateway: {} ({})", igw.igw_id, igw.name));
        }
        for subnet in &self.subnets {
            reporter.line(format!(
                "Subnet: {} ({} - Cidr: {})",
                subnet.subnet_id, subnet.name, subnet.cidr_block
            ));
        }
        for rt in &self.route_tables {
            let main = if rt.is_main { ", main" } else { "" };
            reporter.line(format!(
                "Route Table: {} ({}{main})",
                rt.route_table_id, rt.name
            ));
        }
        for acl in &self.network_acls {
            let default = if acl.is_default { ", default" } else { "" };
            reporter.line(format!(
                "Network ACL: {} ({}{default})",
                acl.acl_id, acl.name
            ));
        }
        for sg in &self.security_groups {
            reporter.line(format!(
                "Security Group: {} (GroupName: {}, Description: {})",
                sg.group_id, sg.group_name, sg.description
            ));
        }
    }
}

/// Tally of one plan execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub retained: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn record(&mut self, outcome: &DeleteOutcome) {
        match outcome {
            DeleteOutcome::Deleted => self.deleted += 1,
            DeleteOutcome::Rejected { .. } => self.retained += 1,
            DeleteOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
