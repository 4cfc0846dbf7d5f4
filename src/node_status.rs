//! The state of this node and of the cluster it belongs to, as reported by
//! `mmgetstate -LY`

use tracing::{info, warn};

use crate::check::{Check, CheckResult};
use crate::mmfs::table::Table;
use crate::mmfs::Mmfs;
use crate::perfdata::PerfData;
use crate::{Error, Status};

/// `mmgetstate -LY` without `-a` only reports the local node
const LOCAL_NODE_ROW: usize = 1;

/// The only state in which a node serves the filesystem
pub const ACTIVE: &str = "active";

/// One record from `mmgetstate -LY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub node_name: String,
    pub node_number: i64,
    /// `active`, `arbitrating`, `down`, ...
    pub state: String,
    /// Quorum nodes that are up
    pub quorum: i64,
    pub nodes_up: i64,
    pub total_nodes: i64,
}

impl NodeState {
    /// Node numbers and counts must fit a `u32`, which keeps the derived
    /// values below from overflowing.
    pub fn from_table(table: &Table) -> Result<NodeState, Error> {
        let row = LOCAL_NODE_ROW;
        let count = |column: &str| table.lookup_int::<u32>(column, row).map(i64::from);
        Ok(NodeState {
            node_name: table.lookup("nodeName", row)?.to_owned(),
            node_number: count("nodeNumber")?,
            state: table.lookup("state", row)?.to_owned(),
            quorum: count("quorum")?,
            nodes_up: count("nodesUp")?,
            total_nodes: count("totalNodes")?,
        })
    }

    pub fn nodes_down(&self) -> i64 {
        self.total_nodes - self.nodes_up
    }

    /// A strict majority of the cluster
    pub fn quorum_needed(&self) -> i64 {
        self.total_nodes / 2 + 1
    }

    pub fn is_active(&self) -> bool {
        self.state == ACTIVE
    }
}

/// Which aspect of the node state to judge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Enough quorum nodes are up for the filesystem to stay writeable
    Quorum,
    /// Enough nodes are up, according to `Thresholds`
    Nodes,
    /// This node is active
    Status,
}

/// Go warning/critical when fewer than this many nodes are up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub warning: i64,
    pub critical: i64,
}

impl Default for Thresholds {
    fn default() -> Thresholds {
        Thresholds {
            warning: 5,
            critical: 3,
        }
    }
}

/// Judge `node` according to `mode`
pub fn evaluate(node: &NodeState, thresholds: Thresholds, mode: Mode) -> CheckResult {
    match mode {
        Mode::Quorum => check_quorum(node),
        Mode::Nodes => check_nodes(node, thresholds),
        Mode::Status => check_state(node, thresholds),
    }
}

fn check_quorum(node: &NodeState) -> CheckResult {
    let needed = node.quorum_needed();
    let result = if node.quorum < needed {
        CheckResult::new(
            Status::Critical,
            format!(
                "CRITICAL - GPFS is read-only, not enough quorum nodes ({}/{}) are online!",
                node.quorum, needed
            ),
        )
    } else {
        CheckResult::new(
            Status::Ok,
            format!("OK - ({}/{}) quorum nodes are online", node.quorum, needed),
        )
    };
    result.with_perfdata(PerfData::new("quorumUp", node.quorum).with_thresholds(needed, needed))
}

fn node_counts(result: CheckResult, node: &NodeState, thresholds: Thresholds) -> CheckResult {
    result
        .with_perfdata(
            PerfData::new("nodesUp", node.nodes_up)
                .with_thresholds(thresholds.warning, thresholds.critical),
        )
        .with_perfdata(PerfData::new("totalNodes", node.total_nodes))
        .with_perfdata(PerfData::new("nodesDown", node.nodes_down()))
}

fn check_nodes(node: &NodeState, thresholds: Thresholds) -> CheckResult {
    let up = node.nodes_up;
    // critical first: when both thresholds are crossed the worse one wins
    let result = if up < thresholds.critical {
        CheckResult::new(
            Status::Critical,
            format!(
                "CRITICAL - only {} of {} nodes are up (critical below {})",
                up, node.total_nodes, thresholds.critical
            ),
        )
    } else if up < thresholds.warning {
        CheckResult::new(
            Status::Warning,
            format!(
                "WARNING - only {} of {} nodes are up (warning below {})",
                up, node.total_nodes, thresholds.warning
            ),
        )
    } else {
        CheckResult::new(
            Status::Ok,
            format!("OK - {} of {} nodes are up", up, node.total_nodes),
        )
    };
    node_counts(result, node, thresholds)
}

fn check_state(node: &NodeState, thresholds: Thresholds) -> CheckResult {
    let status = if node.is_active() {
        Status::Ok
    } else {
        Status::Critical
    };
    let result = CheckResult::new(
        status,
        format!(
            "{} - node {} is in state: {}",
            status, node.node_name, node.state
        ),
    );
    node_counts(result, node, thresholds)
        .with_perfdata(PerfData::new("quorumUp", node.quorum).with_warn(node.quorum_needed()))
}

/// The `status` subcommand: one mode judged against one `mmgetstate` run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStatusCheck {
    pub mode: Mode,
    pub thresholds: Thresholds,
    /// What to report if `mmgetstate` fails, hangs or prints garbage
    pub command_error: Status,
}

impl NodeStatusCheck {
    fn node_state(&self, mmfs: &Mmfs) -> Result<NodeState, Error> {
        let table = mmfs.getstate()?;
        NodeState::from_table(&table)
    }
}

impl Check for NodeStatusCheck {
    fn run(&self, mmfs: &Mmfs) -> Option<CheckResult> {
        let result = match self.node_state(mmfs) {
            Ok(node) => {
                info!(
                    node = %node.node_name,
                    state = %node.state,
                    quorum = node.quorum,
                    nodes_up = node.nodes_up,
                    total_nodes = node.total_nodes,
                    "node state"
                );
                evaluate(&node, self.thresholds, self.mode)
            }
            Err(err) => {
                warn!(error = %err, "unable to read node state");
                CheckResult::from_error(err.status(self.command_error), &err)
            }
        };
        Some(result)
    }
}
