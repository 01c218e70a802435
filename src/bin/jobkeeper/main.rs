mod args;

use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use jobkeeper::clock::{Clock, MonotonicClock};
use jobkeeper::constraints::{evaluate, Eligibility};
use jobkeeper::record::JobRecord;
use jobkeeper::types::connectivity::Connectivity;
use jobkeeper::types::states::JobState;
use jobkeeper::types::time::{Nanos, TimeBound};
use jobkeeper::util::relative_to;
use serde::Serialize;
use tokio::{select, signal, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn, Level};

use crate::args::{Args, Command};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .init();
    } else {
        tracing_subscriber::fmt().json().init();
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    if let Err(error) = begin(args, cancel).await {
        error!(%error, "encountered runtime error");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn begin(args: Args, cancel: CancellationToken) -> Result<()> {
    let connectivity = Connectivity::from_flags(args.network, args.unmetered);

    match args.command {
        Command::Check { file } => {
            let records = load(&file).await?;
            let report = check(&records, args.now_ns, connectivity);
            print!(
                "{}",
                serde_yaml::to_string(&report).context("encoding report")?
            );
            Ok(())
        },
        Command::Watch { file, interval_ms } => {
            let records = load(&file).await?;
            let clock = MonotonicClock::starting_at(args.now_ns);
            watch(
                &records,
                &clock,
                connectivity,
                Duration::from_millis(interval_ms.max(1)),
                cancel,
            )
            .await
        },
    }
}

#[instrument(err)]
async fn load(file: &Path) -> Result<Vec<JobRecord>> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let records: Vec<JobRecord> =
        serde_yaml::from_str(&raw).context("parsing job records")?;
    debug!(count = records.len(), "loaded job records");
    Ok(records)
}

#[derive(Debug, Serialize)]
struct Verdict<'a> {
    id: &'a str,
    state: JobState,
    eligibility: Eligibility,
    /// When the verdict may next change on its own.
    next_wake: Option<String>,
}

fn check(
    records: &[JobRecord],
    now: Nanos,
    connectivity: Connectivity,
) -> Vec<Verdict<'_>> {
    records
        .iter()
        .map(|record| {
            let state = record.state();
            let constraints = record.constraints();
            let eligibility = match state {
                JobState::Pending => {
                    evaluate(&constraints, false, now, connectivity)
                },
                JobState::Cancelled { .. } => Eligibility::Cancelled,
                JobState::Successful => Eligibility::Completed,
            };
            Verdict {
                id: &record.id,
                state,
                eligibility,
                next_wake: constraints
                    .next_wake(now)
                    .map(|at| relative_to(TimeBound::At(at), now)),
            }
        })
        .collect()
}

async fn watch(
    records: &[JobRecord],
    clock: &dyn Clock,
    connectivity: Connectivity,
    every: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let mut last: HashMap<&str, Eligibility> = HashMap::new();
    let mut ticker = time::interval(every);
    info!(
        count = records.len(),
        every_ms = every.as_millis() as u64,
        "watching job records"
    );

    loop {
        select! {
            _ = ticker.tick() => {},
            _ = cancel.cancelled() => break,
        };

        let now = clock.nano_time();
        for verdict in check(records, now, connectivity) {
            if last.get(verdict.id) == Some(&verdict.eligibility) {
                continue;
            }
            info!(
                id = verdict.id,
                now,
                eligibility = %verdict.eligibility,
                next_wake = verdict.next_wake.as_deref().unwrap_or("-"),
                "verdict changed"
            );
            last.insert(verdict.id, verdict.eligibility);
        }
    }

    Ok(())
}
