//! Check the state of an IBM Spectrum Scale (GPFS) node
//!
//! Runs `mmgetstate -LY` on the local node and judges quorum, the number of
//! nodes that are up, or the state of this node.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use structopt::clap::{AppSettings, ArgGroup, ErrorKind};
use structopt::StructOpt;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use check_spectrum_scale::mmfs::Mmfs;
use check_spectrum_scale::node_status::{Mode, NodeStatusCheck, Thresholds};
use check_spectrum_scale::{report, Check, CheckResult, Error, Status};

/// Check the state of an IBM Spectrum Scale (GPFS) cluster from one of its
/// nodes.
#[derive(Deserialize, StructOpt, Debug)]
#[structopt(
    name = "check-spectrum-scale",
    version_short = "v",
    setting = AppSettings::ColoredHelp,
    setting = AppSettings::SubcommandRequiredElseHelp
)]
struct Args {
    #[structopt(
        long = "verbose",
        parse(from_occurrences),
        help = "Log more to stderr. Repeat for more detail. RUST_LOG overrides this."
    )]
    verbose: u8,
    #[structopt(
        long = "timeout",
        name = "SECONDS",
        env = "CHECK_SPECTRUM_SCALE_TIMEOUT",
        default_value = "10",
        help = "How long to wait for Spectrum Scale commands"
    )]
    timeout: u64,
    #[structopt(
        long = "mmfs-bin-dir",
        name = "DIR",
        env = "MMFS_BIN_DIR",
        default_value = "/usr/lpp/mmfs/bin",
        parse(from_os_str),
        help = "Where the Spectrum Scale administration commands are installed"
    )]
    mmfs_bin_dir: PathBuf,
    #[structopt(
        long = "command-error",
        name = "STATUS",
        default_value = "unknown",
        possible_values = &Status::str_values(),
        help = "What to say if a Spectrum Scale command fails, times out or \
                prints something unreadable"
    )]
    command_error: Status,
    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Deserialize, StructOpt, Debug)]
enum Cmd {
    /// Check the gpfs status on this node
    Status(StatusArgs),
    /// Check filesystems (not implemented)
    Filesystems,
    /// Check the filesets (not implemented)
    Filesets,
    /// Check the pools (not implemented)
    Pools,
    /// Check the quota (not implemented)
    Quota(QuotaArgs),
}

#[derive(Deserialize, StructOpt, Debug)]
#[structopt(group = ArgGroup::with_name("mode").required(true))]
struct StatusArgs {
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "5",
        help = "Warning if online nodes below this value"
    )]
    warning: i64,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "3",
        help = "Critical if online nodes below this value"
    )]
    critical: i64,
    #[structopt(
        short = "q",
        long = "quorum",
        group = "mode",
        help = "Check the quorum status, critical if fewer than totalNodes/2+1 \
                quorum nodes are up"
    )]
    quorum: bool,
    #[structopt(
        short = "n",
        long = "nodes",
        group = "mode",
        help = "Check how many nodes are up"
    )]
    nodes: bool,
    #[structopt(
        short = "s",
        long = "status",
        group = "mode",
        help = "Check the state of this node"
    )]
    status: bool,
}

impl StatusArgs {
    fn mode(&self) -> Mode {
        if self.quorum {
            Mode::Quorum
        } else if self.nodes {
            Mode::Nodes
        } else {
            Mode::Status
        }
    }

    fn check(&self, command_error: Status) -> NodeStatusCheck {
        NodeStatusCheck {
            mode: self.mode(),
            thresholds: Thresholds {
                warning: self.warning,
                critical: self.critical,
            },
            command_error,
        }
    }
}

#[allow(dead_code)]
#[derive(Deserialize, StructOpt, Debug)]
#[structopt(group = ArgGroup::with_name("target").required(true))]
struct QuotaArgs {
    #[structopt(
        short = "w",
        long = "warning",
        default_value = "90",
        help = "Warning if quota usage is over this percentage"
    )]
    warning: i64,
    #[structopt(
        short = "c",
        long = "critical",
        default_value = "95",
        help = "Critical if quota usage is over this percentage"
    )]
    critical: i64,
    #[structopt(short = "d", long = "device", help = "Device to check")]
    device: Option<String>,
    #[structopt(
        short = "f",
        long = "fileset",
        group = "target",
        help = "Check quota conditions of a fileset"
    )]
    fileset: Option<String>,
    #[structopt(
        short = "C",
        long = "cluster",
        group = "target",
        help = "Check quota conditions of a cluster"
    )]
    cluster: Option<String>,
    #[structopt(
        short = "u",
        long = "user",
        group = "target",
        help = "Check quota conditions of a user"
    )]
    user: Option<String>,
}

/// Parse the command line. Usage errors are reported as UNKNOWN rather than
/// clap's exit code 1, which monitoring systems would read as WARNING.
fn parse_args() -> Args {
    match Args::from_iter_safe(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                eprintln!("{}", e.message);
                CheckResult::new(
                    Status::Unknown,
                    format!("UNKNOWN - {}", usage_summary(&e.message)),
                )
                .exit()
            }
        },
    }
}

/// The first line of a clap error, without colours or the `error:` prefix
fn usage_summary(message: &str) -> String {
    let plain = strip_ansi_escapes::strip(message);
    let plain = String::from_utf8_lossy(&plain);
    plain
        .lines()
        .next()
        .map(|line| line.trim_start_matches("error:").trim())
        .filter(|line| !line.is_empty())
        .unwrap_or("invalid arguments")
        .to_owned()
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout belongs to the check result
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Run the selected check. A check that produces a result exits the process.
fn dispatch(args: &Args, mmfs: &Mmfs) {
    match args.cmd {
        Cmd::Status(ref status) => report(status.check(args.command_error).run(mmfs)),
        Cmd::Filesystems | Cmd::Filesets | Cmd::Pools | Cmd::Quota(_) => {
            debug!(cmd = ?args.cmd, "check is not implemented")
        }
    }
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args = parse_args();
    init_logging(args.verbose);
    debug!(?args, "starting");

    let mmfs = Mmfs::new(&args.mmfs_bin_dir, Duration::from_secs(args.timeout));
    if let Err(e) = mmfs.ensure_installed() {
        let err = Error::from(e);
        warn!(error = %err, "pre-flight failed");
        report(Some(CheckResult::from_error(Status::Critical, &err)));
    }

    dispatch(&args, &mmfs);

    CheckResult::new(Status::Unknown, "UNKNOWN - No check was run").exit();
}

#[cfg(test)]
mod unit {
    use std::path::PathBuf;

    use structopt::StructOpt;

    use check_spectrum_scale::node_status::{Mode, Thresholds};
    use check_spectrum_scale::Status;

    use structopt::clap::ErrorKind;

    use super::{usage_summary, Args, Cmd};

    fn build_args(argv: Vec<&str>) -> Args {
        Args::from_iter(argv.into_iter())
    }

    #[test]
    fn status_defaults() {
        let args = build_args(vec!["check-spectrum-scale", "status", "-n"]);
        assert_eq!(args.timeout, 10);
        assert_eq!(args.mmfs_bin_dir, PathBuf::from("/usr/lpp/mmfs/bin"));
        assert_eq!(args.command_error, Status::Unknown);
        match args.cmd {
            Cmd::Status(ref status) => {
                let check = status.check(args.command_error);
                assert_eq!(check.mode, Mode::Nodes);
                assert_eq!(check.thresholds, Thresholds::default());
            }
            ref other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn status_thresholds_and_modes() {
        let args = build_args(vec![
            "check-spectrum-scale",
            "--timeout",
            "3",
            "--command-error",
            "critical",
            "status",
            "-w",
            "7",
            "--critical",
            "4",
            "--quorum",
        ]);
        assert_eq!(args.timeout, 3);
        assert_eq!(args.command_error, Status::Critical);
        match args.cmd {
            Cmd::Status(ref status) => {
                assert_eq!(status.warning, 7);
                assert_eq!(status.critical, 4);
                assert_eq!(status.mode(), Mode::Quorum);
            }
            ref other => panic!("expected status, got {:?}", other),
        }

        let args = build_args(vec!["check-spectrum-scale", "status", "-s"]);
        match args.cmd {
            Cmd::Status(ref status) => assert_eq!(status.mode(), Mode::Status),
            ref other => panic!("expected status, got {:?}", other),
        }
    }

    #[test]
    fn exactly_one_mode_is_required() {
        assert!(Args::from_iter_safe(vec!["check-spectrum-scale", "status"]).is_err());
        assert!(Args::from_iter_safe(vec!["check-spectrum-scale", "status", "-q", "-n"]).is_err());
        assert!(Args::from_iter_safe(vec!["check-spectrum-scale", "status", "-n", "-s"]).is_err());
    }

    #[test]
    fn thresholds_must_be_integers() {
        assert!(
            Args::from_iter_safe(vec!["check-spectrum-scale", "status", "-n", "-w", "five"])
                .is_err()
        );
    }

    #[test]
    fn unknown_command_error_status_is_rejected() {
        assert!(Args::from_iter_safe(vec![
            "check-spectrum-scale",
            "--command-error",
            "fine",
            "status",
            "-n"
        ])
        .is_err());
    }

    #[test]
    fn verbose_is_long_only() {
        let args = build_args(vec!["check-spectrum-scale", "--verbose", "--verbose", "pools"]);
        assert_eq!(args.verbose, 2);
        match Args::from_iter_safe(vec!["check-spectrum-scale", "-v"]) {
            Err(e) => assert_eq!(e.kind, ErrorKind::VersionDisplayed),
            Ok(args) => panic!("expected the version, got {:?}", args),
        }
    }

    #[test]
    fn usage_summary_is_plain_text() {
        let coloured = "\u{1b}[1;31merror:\u{1b}[0m The following required arguments were not provided:\n    \u{1b}[1;31m<--quorum|--nodes|--status>\u{1b}[0m\n";
        assert_eq!(
            usage_summary(coloured),
            "The following required arguments were not provided:"
        );
        assert_eq!(
            usage_summary("error: Found argument '-x' which wasn't expected"),
            "Found argument '-x' which wasn't expected"
        );
        assert_eq!(usage_summary(""), "invalid arguments");
    }

    #[test]
    fn stub_subcommands_parse() {
        for sub in ["filesystems", "filesets", "pools"].iter() {
            build_args(vec!["check-spectrum-scale", *sub]);
        }
        let args = build_args(vec!["check-spectrum-scale", "quota", "-C", "gpfs", "-d", "fs1"]);
        match args.cmd {
            Cmd::Quota(ref quota) => {
                assert_eq!(quota.warning, 90);
                assert_eq!(quota.critical, 95);
                assert_eq!(quota.cluster.as_deref(), Some("gpfs"));
                assert_eq!(quota.device.as_deref(), Some("fs1"));
            }
            ref other => panic!("expected quota, got {:?}", other),
        }
    }
}
