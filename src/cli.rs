use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bamstats-rs",
    about = "Per read group alignment statistics and mismatch based QC marking",
    version
)]
pub struct Args {
    /// Set logging level to WARN
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write per read group statistics in .bas format
    Stats(StatsArgs),
    /// Mark reads above a mismatch threshold as QC failed
    MismatchQc(MismatchQcArgs),
    /// Remove or reinstate QC fail flags on reads marked by mismatch-qc
    FlagModifier(FlagModifierArgs),
}

#[derive(ClapArgs, Debug)]
pub struct StatsArgs {
    /// Input SAM/BAM ('-' for BAM on stdin)
    #[arg(short = 'i', long = "input", default_value = "-")]
    pub input: PathBuf,

    /// Output .bas path (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Trim insert size outliers before summarising (spliced data)
    #[arg(short = 'a', long)]
    pub rna: bool,

    /// RNA mode: keep samples within this many standard deviations of the mean
    #[arg(long = "rna-sd", default_value_t = 2.0)]
    pub rna_sd: f64,

    /// RNA mode: maximum trimming passes
    #[arg(long = "rna-max-iter", default_value_t = 10)]
    pub rna_max_iter: usize,

    /// Number of classification threads
    #[arg(short = '@', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Skip malformed records with a warning instead of failing
    #[arg(long)]
    pub skip_malformed: bool,
}

#[derive(ClapArgs, Debug)]
pub struct MismatchQcArgs {
    /// Input SAM/BAM ('-' for BAM on stdin)
    #[arg(short = 'i', long = "input", default_value = "-")]
    pub input: PathBuf,

    /// Output SAM/BAM ('-' for BAM on stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,

    /// Divergence fraction above which a read is marked QC failed
    #[arg(short = 't', long = "mismatch-threshold", default_value_t = 0.05)]
    pub threshold: f32,
}

#[derive(ClapArgs, Debug)]
#[command(group(ArgGroup::new("mode").required(true).args(["remove", "replace"])))]
pub struct FlagModifierArgs {
    /// Input SAM/BAM ('-' for BAM on stdin)
    #[arg(short = 'i', long = "input", default_value = "-")]
    pub input: PathBuf,

    /// Output SAM/BAM ('-' for BAM on stdout)
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,

    /// Clear the QC fail flag where the mismatch tag is present
    #[arg(short = 'm', long)]
    pub remove: bool,

    /// Reinstate the QC fail flag where the mismatch tag is present
    #[arg(short = 'p', long)]
    pub replace: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_modifier_requires_exactly_one_mode() {
        assert!(Args::try_parse_from(["bamstats-rs", "flag-modifier", "-i", "in.bam"]).is_err());
        assert!(
            Args::try_parse_from(["bamstats-rs", "flag-modifier", "--remove", "--replace"]).is_err()
        );
        let args = Args::try_parse_from(["bamstats-rs", "flag-modifier", "--remove"]).unwrap();
        assert!(matches!(args.command, Command::FlagModifier(ref a) if a.remove && !a.replace));
    }

    #[test]
    fn stats_defaults() {
        let args = Args::try_parse_from(["bamstats-rs", "-q", "stats", "--rna"]).unwrap();
        assert!(args.quiet);
        let Command::Stats(stats) = args.command else {
            panic!("expected stats subcommand");
        };
        assert_eq!(stats.input, PathBuf::from("-"));
        assert!(stats.output.is_none());
        assert!(stats.rna);
        assert_eq!(stats.rna_sd, 2.0);
        assert_eq!(stats.rna_max_iter, 10);
        assert_eq!(stats.threads, 1);
    }
}
