mod cli;

use anyhow::Result;
use bamstats_rs::{
    FlagMode, QcConfig, RecordPolicy, StatsConfig, TrimConfig, run_flag_modifier,
    run_mismatch_qc, run_stats,
};
use clap::Parser;
use cli::Command;
use mimalloc::MiMalloc;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let command_line = std::env::args().collect::<Vec<_>>().join(" ");

    match args.command {
        Command::Stats(stats) => {
            let config = StatsConfig {
                rna: stats.rna,
                trim: TrimConfig {
                    multiplier: stats.rna_sd,
                    max_iterations: stats.rna_max_iter,
                },
                threads: stats.threads.max(1),
                policy: if stats.skip_malformed {
                    RecordPolicy::SkipAndWarn
                } else {
                    RecordPolicy::Abort
                },
                ..StatsConfig::default()
            };
            run_stats(&stats.input, stats.output.as_deref(), &config)?;
        }
        Command::MismatchQc(qc) => {
            let config = QcConfig {
                threshold: qc.threshold,
            };
            run_mismatch_qc(&qc.input, &qc.output, &config, &command_line)?;
        }
        Command::FlagModifier(fm) => {
            let mode = if fm.remove {
                FlagMode::Remove
            } else {
                FlagMode::Replace
            };
            run_flag_modifier(&fm.input, &fm.output, mode, &command_line)?;
        }
    }
    Ok(())
}
