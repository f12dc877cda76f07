use crate::bam_io::AlignmentInput;
use crate::classify::{AlignmentClassifier, StatsEngine};
use crate::error::RecordError;
use crate::insert_size::{EstimationMode, TrimConfig};
use crate::read_group::ReadGroupCatalog;
use crate::report::StatsReport;
use crate::stats::StatsAccumulator;
use anyhow::{Context, Result};
use crossfire::mpmc;
use noodles::sam;
use noodles::sam::alignment::RecordBuf;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const DEFAULT_BATCH_SIZE: usize = 4096;

/// What to do with a record the classifier rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordPolicy {
    /// Fail the run. No report is written.
    #[default]
    Abort,
    /// Log and leave the record out of every counter.
    SkipAndWarn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsConfig {
    pub rna: bool,
    pub trim: TrimConfig,
    /// Classification threads. 1 runs everything on the reading thread.
    pub threads: usize,
    /// Records per batch handed to a worker.
    pub batch_size: usize,
    pub policy: RecordPolicy,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            rna: false,
            trim: TrimConfig::default(),
            threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            policy: RecordPolicy::Abort,
        }
    }
}

impl StatsConfig {
    pub fn estimation_mode(&self) -> EstimationMode {
        if self.rna {
            EstimationMode::Rna(self.trim)
        } else {
            EstimationMode::Standard
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Records read from the input.
    pub records: u64,
    /// Records left out under `RecordPolicy::SkipAndWarn`.
    pub skipped: u64,
}

struct Batch {
    idx: usize,
    records: Vec<RecordBuf>,
}

struct ShardResult {
    idx: usize,
    result: Result<(StatsAccumulator, u64), RecordError>,
}

/// Run every record through the classifier and return the filled engine.
///
/// With `threads > 1` the input is cut into contiguous batches that are
/// classified in parallel and merged back in input order, giving the same
/// table as a sequential pass.
pub fn collect_stats<I>(
    header: &sam::Header,
    records: I,
    config: &StatsConfig,
) -> crate::Result<(StatsEngine, RunStats)>
where
    I: IntoIterator<Item = io::Result<RecordBuf>>,
{
    let mut engine = StatsEngine::from_header(header)?;
    let run = if config.threads > 1 {
        let (stats, run) = collect_sharded(&engine.catalog, records, config)?;
        engine.stats = stats;
        run
    } else {
        collect_sequential(&mut engine, records, config.policy)?
    };
    Ok((engine, run))
}

fn collect_sequential<I>(
    engine: &mut StatsEngine,
    records: I,
    policy: RecordPolicy,
) -> crate::Result<RunStats>
where
    I: IntoIterator<Item = io::Result<RecordBuf>>,
{
    let mut run = RunStats::default();
    let mut classifier = engine.classifier();
    for result in records {
        let record = result?;
        run.records += 1;
        run.skipped += classify_one(&mut classifier, &record, policy)?;
    }
    Ok(run)
}

/// Classify one record under `policy`. Returns 1 if the record was skipped.
fn classify_one(
    classifier: &mut AlignmentClassifier<'_>,
    record: &RecordBuf,
    policy: RecordPolicy,
) -> Result<u64, RecordError> {
    match classifier.classify(record) {
        Ok(_) => Ok(0),
        Err(e) if policy == RecordPolicy::SkipAndWarn => {
            tracing::warn!(error = %e, "skipping record");
            Ok(1)
        }
        Err(e) => Err(e),
    }
}

fn classify_batch(
    catalog: &ReadGroupCatalog,
    records: &[RecordBuf],
    policy: RecordPolicy,
) -> Result<(StatsAccumulator, u64), RecordError> {
    let mut stats = StatsAccumulator::new(catalog.len());
    let mut skipped = 0;
    let mut classifier = AlignmentClassifier::new(catalog, &mut stats);
    for record in records {
        skipped += classify_one(&mut classifier, record, policy)?;
    }
    Ok((stats, skipped))
}

fn collect_sharded<I>(
    catalog: &ReadGroupCatalog,
    records: I,
    config: &StatsConfig,
) -> crate::Result<(StatsAccumulator, RunStats)>
where
    I: IntoIterator<Item = io::Result<RecordBuf>>,
{
    crossfire::detect_backoff_cfg();
    let worker_count = config.threads;
    let batch_size = config.batch_size.max(1);
    let policy = config.policy;
    let cap = worker_count.saturating_mul(4).max(8);
    let failed = AtomicBool::new(false);

    thread::scope(|scope| -> crate::Result<(StatsAccumulator, RunStats)> {
        let (tx_work, rx_work) = mpmc::bounded_blocking::<Batch>(cap);
        let (tx_res, rx_res) = mpmc::unbounded_blocking::<ShardResult>();

        for _ in 0..worker_count {
            let rx_work = rx_work.clone();
            let tx_res = tx_res.clone();
            let failed = &failed;
            scope.spawn(move || {
                while let Ok(batch) = rx_work.recv() {
                    let result = classify_batch(catalog, &batch.records, policy);
                    if result.is_err() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    let _ = tx_res.send(ShardResult {
                        idx: batch.idx,
                        result,
                    });
                }
            });
        }
        drop(tx_res);
        drop(rx_work);

        let dispatch = |idx: usize, records: Vec<RecordBuf>| {
            tx_work
                .send(Batch { idx, records })
                .map_err(|_| io::Error::other("worker channel closed"))
        };

        let mut run = RunStats::default();
        let mut total_batches = 0usize;
        let mut batch = Vec::with_capacity(batch_size);

        for result in records {
            batch.push(result?);
            run.records += 1;
            if batch.len() == batch_size {
                let records = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                dispatch(total_batches, records)?;
                total_batches += 1;
                // A worker already failed the run; the merge below reports it.
                if failed.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
        if !batch.is_empty() && !failed.load(Ordering::Relaxed) {
            dispatch(total_batches, batch)?;
            total_batches += 1;
        }

        drop(tx_work);

        let mut merged = StatsAccumulator::new(catalog.len());
        let mut pending: BTreeMap<usize, Result<(StatsAccumulator, u64), RecordError>> =
            BTreeMap::new();
        let mut next_idx = 0usize;

        while next_idx < total_batches {
            let res = rx_res
                .recv()
                .map_err(|_| io::Error::other("worker result channel closed"))?;
            pending.insert(res.idx, res.result);
            while let Some(result) = pending.remove(&next_idx) {
                let (stats, skipped) = result?;
                merged.merge(stats);
                run.skipped += skipped;
                next_idx += 1;
            }
        }

        tracing::debug!(batches = total_batches, workers = worker_count, "merged shards");
        Ok((merged, run))
    })
}

/// Statistics mode: read `input`, write the `.bas` report to `output`
/// (standard output when `None`).
///
/// Nothing is written unless the whole input was processed.
pub fn run_stats(input: &Path, output: Option<&Path>, config: &StatsConfig) -> Result<RunStats> {
    let mut reader = AlignmentInput::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let header = reader.header().clone();
    let (engine, run) = collect_stats(&header, reader.records(), config)
        .with_context(|| format!("failed to collect statistics from {}", input.display()))?;

    let report = StatsReport::build(&report_file_name(input), engine, config.estimation_mode());

    match output {
        Some(path) if !crate::bam_io::is_stdio(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            report.write_bas(&mut out)?;
            out.flush()?;
        }
        _ => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            report.write_bas(&mut out)?;
            out.flush()?;
        }
    }

    tracing::info!(
        records = run.records,
        skipped = run.skipped,
        read_groups = report.rows.len(),
        "statistics complete"
    );
    Ok(run)
}

fn report_file_name(input: &Path) -> String {
    if crate::bam_io::is_stdio(input) {
        return String::from("-");
    }
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string())
}
