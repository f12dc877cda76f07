//! Insert size mean, standard deviation and median over a bucket's samples.
//!
//! RNA mode repeatedly drops samples outside `mean ± k·sd` before
//! summarising, which keeps spliced or chimeric pairs from inflating the
//! estimate. Trimming needs the full sample set, so it only ever runs after
//! shards have been merged.

/// Outlier trimming parameters for RNA mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimConfig {
    /// Samples further than `multiplier` standard deviations from the mean are dropped.
    pub multiplier: f64,
    /// Upper bound on trimming passes.
    pub max_iterations: usize,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            max_iterations: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimationMode {
    Standard,
    Rna(TrimConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InsertSizeSummary {
    pub samples: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    /// Present in RNA mode only.
    pub trimmed: Option<TrimmedEstimate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrimmedEstimate {
    pub mean: f64,
    pub std_dev: f64,
    pub median: f64,
    /// Samples left once trimming converged.
    pub retained: usize,
    /// Passes run, including the final pass that removed nothing.
    pub iterations: usize,
}

impl InsertSizeSummary {
    /// `(mean, std_dev, median)` to report: trimmed values when available.
    pub fn reported(&self) -> (f64, f64, f64) {
        match &self.trimmed {
            Some(t) => (t.mean, t.std_dev, t.median),
            None => (self.mean, self.std_dev, self.median),
        }
    }
}

/// Population mean and standard deviation. Both zero for an empty slice.
pub fn mean_sd(samples: &[u32]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
    let var = samples
        .iter()
        .map(|&v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

pub fn median(samples: &[u32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (f64::from(sorted[mid - 1]) + f64::from(sorted[mid])) / 2.0
    } else {
        f64::from(sorted[mid])
    }
}

/// Drop samples outside `mean ± k·sd` until a pass removes nothing or the
/// iteration cap is hit. Returns the surviving samples and the passes run.
///
/// A pass that would remove every sample is discarded and trimming stops.
pub fn trim_outliers(samples: &[u32], config: &TrimConfig) -> (Vec<u32>, usize) {
    let mut current = samples.to_vec();
    let mut iterations = 0;

    while iterations < config.max_iterations && !current.is_empty() {
        iterations += 1;
        let (mean, sd) = mean_sd(&current);
        let lo = mean - config.multiplier * sd;
        let hi = mean + config.multiplier * sd;
        let kept: Vec<u32> = current
            .iter()
            .copied()
            .filter(|&v| (lo..=hi).contains(&f64::from(v)))
            .collect();

        if kept.len() == current.len() || kept.is_empty() {
            break;
        }
        tracing::trace!(
            pass = iterations,
            removed = current.len() - kept.len(),
            "trimmed insert size outliers"
        );
        current = kept;
    }

    (current, iterations)
}

pub fn estimate(samples: &[u32], mode: EstimationMode) -> InsertSizeSummary {
    let (mean, std_dev) = mean_sd(samples);
    let trimmed = match mode {
        EstimationMode::Standard => None,
        EstimationMode::Rna(config) => {
            let (kept, iterations) = trim_outliers(samples, &config);
            let (mean, std_dev) = mean_sd(&kept);
            Some(TrimmedEstimate {
                mean,
                std_dev,
                median: median(&kept),
                retained: kept.len(),
                iterations,
            })
        }
    };

    InsertSizeSummary {
        samples: samples.len(),
        mean,
        std_dev,
        median: median(samples),
        trimmed,
    }
}
