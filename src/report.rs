//! Per read group summary rows and the tab separated `.bas` rendering.

use crate::classify::StatsEngine;
use crate::insert_size::{self, EstimationMode, InsertSizeSummary};
use crate::read_group::ReadGroupEntry;
use crate::stats::PerBucketStats;
use std::io::{self, Write};

/// Read group ID printed for records without a recognised `RG` tag.
pub const CATCH_ALL_ID: &str = ".";

const BAS_COLUMNS: [&str; 31] = [
    "bam_filename",
    "sample",
    "platform",
    "platform_unit",
    "library",
    "readgroup",
    "read_length_r1",
    "read_length_r2",
    "#_mapped_bases",
    "#_mapped_bases_r1",
    "#_mapped_bases_r2",
    "#_divergent_bases",
    "#_divergent_bases_r1",
    "#_divergent_bases_r2",
    "#_total_reads",
    "#_total_reads_r1",
    "#_total_reads_r2",
    "#_mapped_reads",
    "#_mapped_reads_r1",
    "#_mapped_reads_r2",
    "#_mapped_reads_properly_paired",
    "%_mapped_reads",
    "%_mapped_reads_properly_paired",
    "#_duplicate_reads",
    "%_duplicate_reads",
    "mean_insert_size",
    "insert_size_sd",
    "median_insert_size",
    "#_gc_bases_r1",
    "#_gc_bases_r2",
    "#_qc_fail_reads",
];

#[derive(Debug, Clone)]
pub struct ReadGroupReport {
    pub entry: ReadGroupEntry,
    pub r1: PerBucketStats,
    pub r2: PerBucketStats,
    /// Built from the samples of both mates.
    pub insert_size: InsertSizeSummary,
}

impl ReadGroupReport {
    pub fn total_reads(&self) -> u64 {
        self.r1.count + self.r2.count
    }

    pub fn mapped_reads(&self) -> u64 {
        self.r1.mapped() + self.r2.mapped()
    }

    pub fn mapped_bases(&self) -> u64 {
        self.r1.mapped_bases + self.r2.mapped_bases
    }

    pub fn divergent_bases(&self) -> u64 {
        self.r1.divergent + self.r2.divergent
    }

    pub fn properly_paired(&self) -> u64 {
        self.r1.proper + self.r2.proper
    }

    pub fn duplicates(&self) -> u64 {
        self.r1.dups + self.r2.dups
    }

    pub fn qc_failed(&self) -> u64 {
        self.r1.qc_fail + self.r2.qc_fail
    }

    fn write_row<W: Write>(&self, out: &mut W, bam_filename: &str) -> io::Result<()> {
        let total = self.total_reads();
        let mapped = self.mapped_reads();
        let (mean, sd, median) = self.insert_size.reported();
        let e = &self.entry;

        write!(
            out,
            "{bam_filename}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            e.sample, e.platform, e.platform_unit, e.library, e.id, self.r1.read_length, self.r2.read_length
        )?;
        write!(
            out,
            "\t{}\t{}\t{}\t{}\t{}\t{}",
            self.mapped_bases(),
            self.r1.mapped_bases,
            self.r2.mapped_bases,
            self.divergent_bases(),
            self.r1.divergent,
            self.r2.divergent
        )?;
        write!(
            out,
            "\t{total}\t{}\t{}\t{mapped}\t{}\t{}\t{}",
            self.r1.count,
            self.r2.count,
            self.r1.mapped(),
            self.r2.mapped(),
            self.properly_paired()
        )?;
        write!(
            out,
            "\t{:.2}\t{:.2}\t{}\t{:.2}",
            percent(mapped, total),
            percent(self.properly_paired(), mapped),
            self.duplicates(),
            percent(self.duplicates(), total)
        )?;
        writeln!(
            out,
            "\t{mean:.2}\t{sd:.2}\t{median:.2}\t{}\t{}\t{}",
            self.r1.gc,
            self.r2.gc,
            self.qc_failed()
        )
    }
}

#[derive(Debug, Clone)]
pub struct StatsReport {
    pub bam_filename: String,
    pub rows: Vec<ReadGroupReport>,
}

impl StatsReport {
    /// One row per header read group, in header order, then the catch-all
    /// group if any record landed in it.
    pub fn build(bam_filename: &str, mut engine: StatsEngine, mode: EstimationMode) -> Self {
        let catch_all = engine.catalog.catch_all();
        let mut rows = Vec::with_capacity(engine.catalog.len());

        for group in 0..engine.catalog.len() {
            let [r1, r2] = engine.stats.take_group(group);
            if group == catch_all && r1.is_none() && r2.is_none() {
                continue;
            }
            let r1 = r1.unwrap_or_default();
            let r2 = r2.unwrap_or_default();

            let mut samples = Vec::with_capacity(r1.insert_sizes.len() + r2.insert_sizes.len());
            samples.extend_from_slice(&r1.insert_sizes);
            samples.extend_from_slice(&r2.insert_sizes);

            let entry = engine
                .catalog
                .entry(group)
                .cloned()
                .unwrap_or_else(|| ReadGroupEntry::new(CATCH_ALL_ID));

            rows.push(ReadGroupReport {
                entry,
                insert_size: insert_size::estimate(&samples, mode),
                r1,
                r2,
            });
        }

        Self {
            bam_filename: bam_filename.to_string(),
            rows,
        }
    }

    pub fn write_bas<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", BAS_COLUMNS.join("\t"))?;
        for row in &self.rows {
            row.write_row(out, &self.bam_filename)?;
        }
        Ok(())
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert_size::TrimConfig;
    use crate::read_group::ReadGroupCatalog;
    use crate::stats::StatsAccumulator;

    fn engine() -> StatsEngine {
        let mut entry = ReadGroupEntry::new("29976");
        entry.sample = String::from("PD1234a");
        entry.platform = String::from("GAII");
        entry.platform_unit = String::from("5178_6");
        entry.library = String::from("PD1234a 140546_1054");
        let catalog = ReadGroupCatalog::build(vec![entry, ReadGroupEntry::new("29978")]).unwrap();
        let mut stats = StatsAccumulator::new(catalog.len());

        let r1 = stats.bucket_mut(0, 0, 20);
        r1.count = 4;
        r1.umap = 1;
        r1.dups = 1;
        r1.proper = 2;
        r1.mapped_bases = 60;
        r1.divergent = 3;
        r1.gc = 30;
        r1.insert_sizes = vec![200, 220];
        let r2 = stats.bucket_mut(0, 1, 20);
        r2.count = 4;
        r2.mapped_bases = 80;
        r2.gc = 41;
        r2.insert_sizes = vec![240];

        StatsEngine { catalog, stats }
    }

    #[test]
    fn rows_follow_header_order_and_skip_empty_catch_all() {
        let report = StatsReport::build("test.bam", engine(), EstimationMode::Standard);
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].entry.id, "29976");
        assert_eq!(report.rows[1].entry.id, "29978");
        assert_eq!(report.rows[1].total_reads(), 0);

        let row = &report.rows[0];
        assert_eq!(row.total_reads(), 8);
        assert_eq!(row.mapped_reads(), 7);
        assert_eq!(row.mapped_bases(), 140);
        assert_eq!(row.insert_size.samples, 3);
        assert!((row.insert_size.mean - 220.0).abs() < 1e-9);
    }

    #[test]
    fn catch_all_row_appears_when_used() {
        let mut engine = engine();
        engine.stats.bucket_mut(2, 0, 20).count = 1;
        let report = StatsReport::build("test.bam", engine, EstimationMode::Standard);
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[2].entry.id, CATCH_ALL_ID);
    }

    #[test]
    fn bas_layout() {
        let report = StatsReport::build(
            "test.bam",
            engine(),
            EstimationMode::Rna(TrimConfig::default()),
        );
        let mut out = Vec::new();
        report.write_bas(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let header: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(header.len(), BAS_COLUMNS.len());
        assert_eq!(header[0], "bam_filename");

        let row: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(row.len(), BAS_COLUMNS.len());
        assert_eq!(
            &row[..8],
            &["test.bam", "PD1234a", "GAII", "5178_6", "PD1234a 140546_1054", "29976", "20", "20"]
        );
        assert_eq!(row[8], "140");
        assert_eq!(row[14], "8");
        assert_eq!(row[17], "7");
        assert_eq!(row[21], "87.50");
        assert_eq!(row[22], "28.57");
        assert_eq!(row[24], "12.50");
        assert_eq!(row[25], "220.00");
        assert_eq!(row[27], "220.00");
        assert_eq!(&row[28..], &["30", "41", "0"]);

        let empty: Vec<&str> = lines[2].split('\t').collect();
        assert_eq!(empty[6], "0");
        assert_eq!(empty[21], "0.00");
    }
}
