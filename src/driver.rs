//! Region driver
//!
//! Runs the per-region state machine: discover the default network, check
//! occupancy, enumerate attached resources, render the plan, gate on operator
//! consent, execute. Regions are strictly sequential and a fault in one never
//! touches the next.

use crate::aws::ec2::NetworkOps;
use crate::aws::tenants::{TenantOps, TenantResource};
use crate::config::RunConfig;
use crate::plan::{AttachedKind, DeleteOutcome, DeletionPlan, SweepReport};
use crate::report::Reporter;
use anyhow::{Context, Result};
use tracing::debug;

/// Terminal state of one region's sweep.
#[derive(Debug)]
pub enum RegionStatus {
    /// The region has no default network; nothing to do.
    NoDefaultNetwork,
    /// Workload resources still depend on the network; deletion skipped.
    Occupied { tenants: Vec<TenantResource> },
    /// Dry run: plan rendered, nothing deleted.
    PlanOnly { attached: usize },
    /// The operator declined the confirmation prompt.
    Refused,
    /// The plan was executed.
    Swept { report: SweepReport },
}

/// Drive one region from discovery to completion.
///
/// Provider faults propagate to the caller, which records them and moves on
/// to the next region.
pub async fn sweep_region<N, T>(
    network: &N,
    tenants: &T,
    config: &RunConfig,
    reporter: &Reporter,
    region: &str,
) -> Result<RegionStatus>
where
    N: NetworkOps,
    T: TenantOps,
{
    let Some(vpc) = network.find_default_vpc(region).await? else {
        reporter.line("No default network was found");
        return Ok(RegionStatus::NoDefaultNetwork);
    };

    let occupants = tenants.scan(&vpc.vpc_id).await?;
    if !occupants.is_empty() {
        reporter.line("This network has tenant resources and will not be deleted:");
        for tenant in &occupants {
            reporter.line(format!(
                "[{}]  {}: {}",
                tenant.kind.as_str(),
                tenant.kind.id_field(),
                tenant.id
            ));
        }
        return Ok(RegionStatus::Occupied { tenants: occupants });
    }

    let plan = DeletionPlan {
        gateways: network.internet_gateways(&vpc.vpc_id).await?,
        subnets: network.subnets(&vpc.vpc_id).await?,
        route_tables: network.route_tables(&vpc.vpc_id).await?,
        network_acls: network.network_acls(&vpc.vpc_id).await?,
        security_groups: network.security_groups(&vpc.vpc_id).await?,
        network: vpc,
    };

    reporter.blank();
    reporter.line("The following resources will be deleted:");
    plan.render(reporter);

    if config.dry_run {
        reporter.line("Taking no action because --dry-run was passed");
        return Ok(RegionStatus::PlanOnly {
            attached: plan.attached_count(),
        });
    }

    if !config.batch && !confirm_teardown()? {
        reporter.line("Stopping at operator request, nothing was deleted");
        return Ok(RegionStatus::Refused);
    }

    reporter.line("Deleting...");
    let report = execute_plan(network, &plan, reporter).await?;
    Ok(RegionStatus::Swept { report })
}

/// Block for explicit operator consent.
///
/// Only the literal token `yes` proceeds; everything else discards the plan.
fn confirm_teardown() -> Result<bool> {
    let answer: String = dialoguer::Input::new()
        .with_prompt(
            "Continuing will PERMANENTLY DESTROY all the resources listed above. \
             Type 'yes' to continue",
        )
        .allow_empty(true)
        .interact_text()
        .context("reading confirmation")?;

    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

/// Execute a plan in the fixed class order, then delete the network.
///
/// Per-resource failures are recorded and never stop the remaining steps;
/// only the final network delete can abort.
async fn execute_plan<N: NetworkOps>(
    network: &N,
    plan: &DeletionPlan,
    reporter: &Reporter,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    let vpc_id = &plan.network.vpc_id;

    let mut classes = [
        AttachedKind::SecurityGroup,
        AttachedKind::NetworkAcl,
        AttachedKind::RouteTable,
        AttachedKind::Subnet,
        AttachedKind::InternetGateway,
    ];
    classes.sort_by_key(|kind| kind.delete_priority());

    for kind in classes {
        match kind {
            AttachedKind::InternetGateway => {
                for igw in &plan.gateways {
                    reporter.line(format!(
                        "Detaching and deleting internet gateway: {}",
                        igw.igw_id
                    ));
                    let outcome = network.delete_internet_gateway(&igw.igw_id, vpc_id).await;
                    record(&mut report, reporter, kind, &igw.igw_id, outcome);
                }
            }
            AttachedKind::Subnet => {
                for subnet in &plan.subnets {
                    reporter.line(format!("Deleting subnet: {}", subnet.subnet_id));
                    let outcome = network.delete_subnet(&subnet.subnet_id).await;
                    record(&mut report, reporter, kind, &subnet.subnet_id, outcome);
                }
            }
            AttachedKind::RouteTable => {
                for table in &plan.route_tables {
                    reporter.line(format!("Deleting route table: {}", table.route_table_id));
                    let outcome = network.delete_route_table(&table.route_table_id).await;
                    record(&mut report, reporter, kind, &table.route_table_id, outcome);
                }
            }
            AttachedKind::NetworkAcl => {
                for acl in &plan.network_acls {
                    reporter.line(format!("Deleting network ACL: {}", acl.acl_id));
                    let outcome = network.delete_network_acl(&acl.acl_id).await;
                    record(&mut report, reporter, kind, &acl.acl_id, outcome);
                }
            }
            AttachedKind::SecurityGroup => {
                for group in &plan.security_groups {
                    reporter.line(format!(
                        "Deleting security group: {} ({})",
                        group.group_name, group.group_id
                    ));
                    let outcome = network.delete_security_group(&group.group_id).await;
                    record(&mut report, reporter, kind, &group.group_id, outcome);
                }
            }
        }
    }

    reporter.line(format!("Deleting the network: {vpc_id}"));
    network.delete_vpc(vpc_id).await?;

    debug!(
        deleted = report.deleted,
        retained = report.retained,
        failed = report.failed,
        "Plan executed"
    );
    Ok(report)
}

fn record(
    report: &mut SweepReport,
    reporter: &Reporter,
    kind: AttachedKind,
    id: &str,
    outcome: DeleteOutcome,
) {
    match &outcome {
        DeleteOutcome::Deleted => {}
        DeleteOutcome::Rejected { message } => {
            reporter.line(format!("  {message}"));
            reporter.line(format!(
                "  (expected when {id} is the network's default {})",
                kind.label()
            ));
        }
        DeleteOutcome::Failed { message } => {
            reporter.line(format!("  failed to delete {} {id}: {message}", kind.label()));
        }
    }
    report.record(&outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::ec2::MockNetworkOps;
    use crate::aws::tenants::{MockTenantOps, TenantKind};
    use crate::plan::{Gateway, Network, NetworkAclInfo, RouteTableInfo, SecurityGroupInfo, SubnetInfo};
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn net() -> Network {
        Network {
            vpc_id: "vpc-1".into(),
            cidr_block: "10.0.0.0/16".into(),
            name: "".into(),
        }
    }

    fn batch_config() -> RunConfig {
        RunConfig {
            profile: "default".into(),
            region: Some("us-east-1".into()),
            dry_run: false,
            batch: true,
        }
    }

    fn dry_run_config() -> RunConfig {
        RunConfig {
            dry_run: true,
            ..batch_config()
        }
    }

    fn unoccupied() -> MockTenantOps {
        let mut tenants = MockTenantOps::new();
        tenants
            .expect_scan()
            .with(eq("vpc-1"))
            .times(1)
            .returning(|_| Ok(Vec::new()));
        tenants
    }

    fn expect_empty_enumerations(network: &mut MockNetworkOps) {
        network
            .expect_internet_gateways()
            .returning(|_| Ok(Vec::new()));
        network.expect_subnets().returning(|_| Ok(Vec::new()));
        network.expect_route_tables().returning(|_| Ok(Vec::new()));
        network.expect_network_acls().returning(|_| Ok(Vec::new()));
        network.expect_security_groups().returning(|_| Ok(Vec::new()));
    }

    #[tokio::test]
    async fn reports_when_no_default_network_exists() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(None));
        // No tenant scan, no enumeration, no delete may happen.
        let tenants = MockTenantOps::new();
        let reporter = Reporter::capture();

        let status = sweep_region(&network, &tenants, &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        assert!(matches!(status, RegionStatus::NoDefaultNetwork));
        assert!(reporter.saw("No default network was found"));
    }

    #[tokio::test]
    async fn occupied_network_is_never_deleted() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));

        let mut tenants = MockTenantOps::new();
        tenants.expect_scan().with(eq("vpc-1")).times(1).returning(|_| {
            Ok(vec![TenantResource {
                kind: TenantKind::Instance,
                id: "i-1".into(),
            }])
        });

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &tenants, &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        // MockNetworkOps panics on any unexpected enumeration or delete call,
        // so reaching here proves none were issued.
        assert!(matches!(status, RegionStatus::Occupied { .. }));
        assert!(reporter.saw("will not be deleted"));
        assert!(reporter.saw("[instance]  InstanceId: i-1"));
    }

    #[tokio::test]
    async fn deletion_follows_the_fixed_class_order() {
        let mut seq = Sequence::new();
        let mut network = MockNetworkOps::new();

        network
            .expect_find_default_vpc()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(net())));

        let mut tenants = MockTenantOps::new();
        tenants
            .expect_scan()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Vec::new()));

        // All five enumerations complete before the first delete call.
        network
            .expect_internet_gateways()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![Gateway {
                    igw_id: "igw-1".into(),
                    name: "".into(),
                }])
            });
        network
            .expect_subnets()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![SubnetInfo {
                    subnet_id: "subnet-1".into(),
                    cidr_block: "10.0.0.0/20".into(),
                    name: "".into(),
                }])
            });
        network
            .expect_route_tables()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![RouteTableInfo {
                    route_table_id: "rtb-1".into(),
                    name: "".into(),
                    is_main: false,
                }])
            });
        network
            .expect_network_acls()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![NetworkAclInfo {
                    acl_id: "acl-1".into(),
                    name: "".into(),
                    is_default: false,
                }])
            });
        network
            .expect_security_groups()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(vec![SecurityGroupInfo {
                    group_id: "sg-1".into(),
                    group_name: "web".into(),
                    description: "".into(),
                    name: "".into(),
                }])
            });

        network
            .expect_delete_internet_gateway()
            .with(eq("igw-1"), eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| DeleteOutcome::Deleted);
        network
            .expect_delete_subnet()
            .with(eq("subnet-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DeleteOutcome::Deleted);
        network
            .expect_delete_route_table()
            .with(eq("rtb-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DeleteOutcome::Deleted);
        network
            .expect_delete_network_acl()
            .with(eq("acl-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DeleteOutcome::Deleted);
        network
            .expect_delete_security_group()
            .with(eq("sg-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DeleteOutcome::Deleted);
        network
            .expect_delete_vpc()
            .with(eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &tenants, &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        match status {
            RegionStatus::Swept { report } => {
                assert_eq!(report.deleted, 5);
                assert_eq!(report.failed, 0);
            }
            other => panic!("expected Swept, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dry_run_renders_the_plan_without_deleting() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));
        network.expect_internet_gateways().returning(|_| Ok(Vec::new()));
        network.expect_subnets().returning(|_| {
            Ok(vec![SubnetInfo {
                subnet_id: "subnet-1".into(),
                cidr_block: "10.0.0.0/20".into(),
                name: "".into(),
            }])
        });
        network.expect_route_tables().returning(|_| Ok(Vec::new()));
        network.expect_network_acls().returning(|_| Ok(Vec::new()));
        network.expect_security_groups().returning(|_| Ok(Vec::new()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &unoccupied(), &dry_run_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        assert!(matches!(status, RegionStatus::PlanOnly { attached: 1 }));
        assert!(reporter.saw("VPC: vpc-1"));
        assert!(reporter.saw("Subnet: subnet-1"));
        assert!(reporter.saw("--dry-run"));
    }

    #[tokio::test]
    async fn batch_mode_executes_network_with_one_subnet() {
        let mut seq = Sequence::new();
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));
        network.expect_internet_gateways().returning(|_| Ok(Vec::new()));
        network.expect_subnets().returning(|_| {
            Ok(vec![SubnetInfo {
                subnet_id: "subnet-1".into(),
                cidr_block: "10.0.0.0/20".into(),
                name: "".into(),
            }])
        });
        network.expect_route_tables().returning(|_| Ok(Vec::new()));
        network.expect_network_acls().returning(|_| Ok(Vec::new()));
        network.expect_security_groups().returning(|_| Ok(Vec::new()));
        network
            .expect_delete_subnet()
            .with(eq("subnet-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| DeleteOutcome::Deleted);
        network
            .expect_delete_vpc()
            .with(eq("vpc-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &unoccupied(), &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        match status {
            RegionStatus::Swept { report } => {
                assert_eq!(report.deleted, 1);
                assert!(!report.has_failures());
            }
            other => panic!("expected Swept, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn default_route_table_rejection_does_not_stop_the_plan() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));
        network.expect_internet_gateways().returning(|_| Ok(Vec::new()));
        network.expect_subnets().returning(|_| Ok(Vec::new()));
        network.expect_route_tables().returning(|_| {
            Ok(vec![RouteTableInfo {
                route_table_id: "rtb-main".into(),
                name: "".into(),
                is_main: true,
            }])
        });
        network.expect_network_acls().returning(|_| {
            Ok(vec![NetworkAclInfo {
                acl_id: "acl-1".into(),
                name: "".into(),
                is_default: true,
            }])
        });
        network.expect_security_groups().returning(|_| Ok(Vec::new()));
        network
            .expect_delete_route_table()
            .with(eq("rtb-main"))
            .times(1)
            .returning(|_| DeleteOutcome::Rejected {
                message: "route table has a main association".into(),
            });
        // The ACL step still runs after the rejection.
        network
            .expect_delete_network_acl()
            .with(eq("acl-1"))
            .times(1)
            .returning(|_| DeleteOutcome::Rejected {
                message: "cannot delete the default network ACL".into(),
            });
        network
            .expect_delete_vpc()
            .with(eq("vpc-1"))
            .times(1)
            .returning(|_| Ok(()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &unoccupied(), &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        match status {
            RegionStatus::Swept { report } => {
                assert_eq!(report.retained, 2);
                assert_eq!(report.failed, 0);
            }
            other => panic!("expected Swept, got {other:?}"),
        }
        assert!(reporter.saw("expected when rtb-main"));
    }

    #[tokio::test]
    async fn failed_child_delete_is_counted_but_not_fatal() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));
        network.expect_internet_gateways().returning(|_| {
            Ok(vec![Gateway {
                igw_id: "igw-1".into(),
                name: "".into(),
            }])
        });
        network.expect_subnets().returning(|_| Ok(Vec::new()));
        network.expect_route_tables().returning(|_| Ok(Vec::new()));
        network.expect_network_acls().returning(|_| Ok(Vec::new()));
        network.expect_security_groups().returning(|_| Ok(Vec::new()));
        network
            .expect_delete_internet_gateway()
            .times(1)
            .returning(|_, _| DeleteOutcome::Failed {
                message: "gateway is busy".into(),
            });
        network
            .expect_delete_vpc()
            .times(1)
            .returning(|_| Ok(()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &unoccupied(), &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        match status {
            RegionStatus::Swept { report } => {
                assert_eq!(report.failed, 1);
                assert!(report.has_failures());
            }
            other => panic!("expected Swept, got {other:?}"),
        }
        assert!(reporter.saw("failed to delete internet gateway igw-1"));
    }

    #[tokio::test]
    async fn occupancy_scan_fault_aborts_the_region() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));

        let mut tenants = MockTenantOps::new();
        tenants
            .expect_scan()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("AccessDenied when calling DescribeInstances")));

        let reporter = Reporter::capture();
        let result = sweep_region(&network, &tenants, &batch_config(), &reporter, "us-east-1").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_network_still_deletes_the_vpc() {
        let mut network = MockNetworkOps::new();
        network
            .expect_find_default_vpc()
            .times(1)
            .returning(|_| Ok(Some(net())));
        expect_empty_enumerations(&mut network);
        network
            .expect_delete_vpc()
            .with(eq("vpc-1"))
            .times(1)
            .returning(|_| Ok(()));

        let reporter = Reporter::capture();
        let status = sweep_region(&network, &unoccupied(), &batch_config(), &reporter, "us-east-1")
            .await
            .unwrap();

        match status {
            RegionStatus::Swept { report } => assert_eq!(report, SweepReport::default()),
            other => panic!("expected Swept, got {other:?}"),
        }
    }
}
