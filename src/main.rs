// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use clap::{Parser, ValueEnum};
use kube::Client;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use applywait::config::{ApplyMode, Config};
use applywait::constants::{wait, FIELD_MANAGER};
use applywait::error::ApplyWaitError;
use applywait::kubernetes::KubeCluster;
use applywait::manifest::ManifestResolver;
use applywait::pipeline;
use applywait::report::Report;
use applywait::workload::{parse_tracking_list, TrackingEntry};

#[derive(Parser, Debug)]
#[command(
    name = "applywait",
    version,
    about = "Apply built manifests and wait for exactly their workloads to become ready"
)]
struct Cli {
    /// Overlay or plain manifest directory
    #[arg(env = "APPLYWAIT_OVERLAY")]
    overlay: PathBuf,

    /// Target namespace
    #[arg(short, long, env = "APPLYWAIT_NAMESPACE")]
    namespace: String,

    /// Workload to track, as Kind/namespace/name or Kind/name (repeatable)
    #[arg(long = "track", value_name = "KIND/NAMESPACE/NAME")]
    track: Vec<TrackingEntry>,

    /// YAML or JSON file with a list of {kind, namespace, name} to track
    #[arg(long, env = "APPLYWAIT_WORKLOADS")]
    workloads: Option<PathBuf>,

    /// Server-side dry run, nothing is persisted and nothing is awaited
    #[arg(long, env = "APPLYWAIT_DRY_RUN")]
    dry_run: bool,

    /// Use server-side apply
    #[arg(long, env = "APPLYWAIT_SERVER_SIDE")]
    server_side: bool,

    /// Reject unknown or duplicate fields
    #[arg(long, env = "APPLYWAIT_VALIDATE")]
    validate: bool,

    /// Do not wait for workloads to become ready
    #[arg(long, env = "APPLYWAIT_NO_WAIT")]
    no_wait: bool,

    /// Readiness wait budget in seconds
    #[arg(
        long,
        env = "APPLYWAIT_WAIT_TIMEOUT",
        default_value_t = wait::DEFAULT_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    wait_timeout: u64,

    /// Seconds between readiness poll cycles
    #[arg(
        long,
        env = "APPLYWAIT_POLL_INTERVAL",
        default_value_t = wait::POLL_INTERVAL_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval: u64,

    /// Deadline in seconds for each apply request
    #[arg(
        long,
        env = "APPLYWAIT_REQUEST_TIMEOUT",
        default_value_t = wait::REQUEST_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    request_timeout: u64,

    /// Field manager name for server-side apply
    #[arg(long, env = "APPLYWAIT_FIELD_MANAGER", default_value = FIELD_MANAGER)]
    field_manager: String,

    /// Command that builds an overlay directory, the directory is appended
    #[arg(
        long,
        env = "APPLYWAIT_BUILD_COMMAND",
        value_delimiter = ' ',
        default_value = "kubectl kustomize"
    )]
    build_command: Vec<String>,

    /// Report format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = Output::Human)]
    output: Output,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

impl Cli {
    fn to_config(&self) -> Config {
        let mut config = Config::new(self.overlay.clone(), self.namespace.clone());
        config.mode = ApplyMode {
            dry_run: self.dry_run,
            server_side: self.server_side,
            validate: self.validate,
        };
        config.wait = !self.no_wait;
        config.wait_timeout = Duration::from_secs(self.wait_timeout);
        config.poll_interval = Duration::from_secs(self.poll_interval);
        config.request_timeout = Duration::from_secs(self.request_timeout);
        config.field_manager = self.field_manager.clone();
        config.build_command = self
            .build_command
            .iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();
        config
    }

    /// Merge the tracking file and `--track` entries
    fn tracking(&self) -> applywait::error::Result<Vec<TrackingEntry>> {
        let mut entries = match &self.workloads {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ApplyWaitError::InvalidTrackingEntry(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                parse_tracking_list(&text)?
            }
            None => Vec::new(),
        };
        entries.extend(self.track.iter().cloned());
        Ok(entries)
    }
}

/// Logs go to stderr, stdout carries only the report
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("applywait=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit(report: &Report, output: Output) -> Result<ExitCode> {
    match output {
        Output::Human => print!("{}", report.render_human()),
        Output::Json => println!("{}", report.render_json()?),
    }
    Ok(ExitCode::from(report.exit_code()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.to_config();
    info!(
        "Applying {} to namespace {} (dry_run={}, server_side={}, wait={})",
        config.overlay_dir.display(),
        config.namespace,
        config.mode.dry_run,
        config.mode.server_side,
        config.should_wait()
    );

    let tracking = match cli.tracking() {
        Ok(t) => t,
        Err(e) => {
            error!("{}", e);
            return emit(&Report::fatal(&e, config.mode.dry_run), cli.output);
        }
    };

    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            let e = ApplyWaitError::from(e);
            error!("Failed to create Kubernetes client: {}", e);
            return emit(&Report::fatal(&e, config.mode.dry_run), cli.output);
        }
    };
    let cluster = KubeCluster::new(client);
    let resolver = ManifestResolver::from_config(&config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current poll cycle");
            on_signal.cancel();
        }
    });

    let report = match pipeline::run(&config, &resolver, &cluster, &tracking, &cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            Report::fatal(&e, config.mode.dry_run)
        }
    };

    emit(&report, cli.output)
}
