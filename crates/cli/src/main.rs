// crates/cli/src/main.rs
//! corb-dash binary.
//!
//! `watch` runs the poller against a set of targets and logs every registry
//! change until interrupted (or until every target is gone). `pause-resume`
//! and `threads` are one-shot control commands against a single target.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use corb_dash_poller::{
    target, Dialect, Poller, PollerConfig, RegistryEvent, Target,
};

#[derive(Parser)]
#[command(name = "corb-dash", about = "Monitor and control CORB batch jobs")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 5000, global = true)]
    interval_ms: u64,

    /// Path of the status endpoint on each target.
    #[arg(long, default_value = "/metrics", global = true)]
    metrics_path: String,

    /// Control-command dialect: command-query, paused-query, or concise-form.
    #[arg(long, default_value = "command-query", global = true)]
    dialect: String,
}

#[derive(Subcommand)]
enum Command {
    /// Poll one or more targets and log registry changes.
    Watch {
        /// Default host for port-only tokens. Accepts a bare hostname or a
        /// URL-ish string.
        #[arg(long, default_value = "localhost")]
        host: String,
        /// Port specification: comma-separated ports, inclusive ranges
        /// (8000-8010), and host:port tokens.
        #[arg(long)]
        ports: String,
        /// Request the reduced payload once a job's totals are known.
        #[arg(long)]
        concise: bool,
    },
    /// Toggle the paused state of the job on one target.
    PauseResume {
        /// The target, as host:port.
        target: String,
    },
    /// Change the active thread count of the job on one target.
    Threads {
        /// The target, as host:port.
        target: String,
        /// New thread count.
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(dialect) = Dialect::parse(&cli.dialect) else {
        bail!(
            "unknown dialect {:?} (expected one of: {})",
            cli.dialect,
            Dialect::NAMES.join(", ")
        );
    };

    let mut config = PollerConfig {
        poll_interval: Duration::from_millis(cli.interval_ms),
        metrics_path: cli.metrics_path.clone(),
        dialect,
        ..PollerConfig::default()
    };

    match cli.command {
        Command::Watch {
            host,
            ports,
            concise,
        } => {
            config.concise = concise;
            run_watch(config, &host, &ports).await
        }
        Command::PauseResume { target } => {
            let snap = with_job(config, &target, |poller, key| async move {
                Ok(poller.pause_resume(&key).await?)
            })
            .await?;
            println!(
                "{}: paused={} ({}% ok, {}% failed, {})",
                snap.key,
                snap.doc.paused,
                snap.success_percent(),
                snap.failed_percent(),
                snap.duration(),
            );
            Ok(())
        }
        Command::Threads { target, count } => {
            let snap = with_job(config, &target, move |poller, key| async move {
                Ok(poller.update_thread_count(&key, count).await?)
            })
            .await?;
            println!(
                "{}: threads={}",
                snap.key,
                snap.doc.current_thread_count.unwrap_or(count),
            );
            Ok(())
        }
    }
}

/// Poll targets and log every registry change until Ctrl-C, or until the last
/// subscription stops.
async fn run_watch(config: PollerConfig, host: &str, ports: &str) -> Result<()> {
    let default_host = target::extract_host(host)
        .with_context(|| format!("no hostname in {host:?}"))?;
    let targets = target::expand_spec(&default_host, ports);
    if targets.is_empty() {
        bail!("port specification {ports:?} yields no targets");
    }

    let poller = Poller::new(config)?;
    let mut events = poller.subscribe();
    poller.watch_all(targets).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                return Ok(());
            }
            event = events.recv() => {
                match event {
                    Ok(RegistryEvent::JobUpdated { snapshot }) => {
                        tracing::info!(
                            job = %snapshot.key,
                            origin = %snapshot.origin,
                            paused = snapshot.doc.paused,
                            success_percent = snapshot.success_percent(),
                            failed_percent = snapshot.failed_percent(),
                            duration = %snapshot.duration(),
                            complete = snapshot.is_complete(),
                            "job updated"
                        );
                    }
                    Ok(RegistryEvent::TargetGone { target }) => {
                        tracing::info!(peer = %target, "target gone (job completed or unreachable)");
                        if poller.watched_targets().await.is_empty() {
                            tracing::info!("no targets left to watch, exiting");
                            return Ok(());
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

/// Start a short-lived subscription against one target, wait for its job to
/// appear, run the command, and stop.
async fn with_job<F, Fut>(
    config: PollerConfig,
    target_spec: &str,
    run: F,
) -> Result<corb_dash_poller::JobSnapshot>
where
    F: FnOnce(Poller, String) -> Fut,
    Fut: std::future::Future<Output = Result<corb_dash_poller::JobSnapshot>>,
{
    let target = parse_target(target_spec)?;
    let poller = Poller::new(config)?;
    poller.watch(target.clone()).await;

    let key = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Some(snap) = poller
                .snapshots()
                .await
                .into_iter()
                .find(|s| s.origin == target)
            {
                return snap.key;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    })
    .await
    .with_context(|| format!("no job answered at {target}"))?;

    let snapshot = run(poller, key).await?;
    Ok(snapshot)
}

fn parse_target(spec: &str) -> Result<Target> {
    let Some((host, port)) = spec.rsplit_once(':') else {
        bail!("target {spec:?} is not host:port");
    };
    let port: u16 = port
        .parse()
        .with_context(|| format!("bad port in target {spec:?}"))?;
    let host =
        target::extract_host(host).with_context(|| format!("no hostname in target {spec:?}"))?;
    Ok(Target::new(host, port))
}
