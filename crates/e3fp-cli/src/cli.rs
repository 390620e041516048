use clap::{Parser, ValueEnum};
use e3fp::core::store::OutputFormat;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Seth Axen",
    version,
    about = "Generate multi-level 3D molecular fingerprints from conformer ensemble files.",
    help_template = HELP_TEMPLATE,
)]
pub struct Cli {
    /// Paths to conformer ensemble files (one molecule with multiple
    /// conformers each), or a single directory expanded non-recursively.
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Basename for the output directories; the iteration level is appended
    /// to it (level 2 of basename 'E3FP' lands in 'E3FP2/').
    #[arg(short = 'o', long, default_value = "E3FP", value_name = "PATH")]
    pub out_dir_base: PathBuf,

    /// On-disk form of the fingerprint files.
    #[arg(long, value_enum, default_value_t = FormatArg::Gz)]
    pub format: FormatArg,

    /// Fingerprint only the first N conformers of each molecule.
    #[arg(long, value_name = "INT")]
    pub first: Option<usize>,

    /// Maximum iteration level; omit to run until shell growth stabilizes.
    #[arg(short = 'm', long, value_name = "INT")]
    pub max_level: Option<usize>,

    /// Distance to increment each atom's shell radius by per level,
    /// starting at 0.0.
    #[arg(short = 'r', long, default_value_t = 2.0, value_name = "FLOAT")]
    pub shell_radius: f64,

    /// Store count-based fingerprints instead of the default bit-based ones.
    #[arg(long)]
    pub counts: bool,

    /// Differentiate by stereochemistry.
    #[arg(long)]
    pub stereo: bool,

    /// Retain the identifier-to-substructure map inside each fingerprint.
    /// Drastically increases output size.
    #[arg(long)]
    pub substructures: bool,

    /// Exclude atoms that are not bond-connected to the shell center when
    /// hashing. Debugging knob.
    #[arg(long)]
    pub exclude_disconnected: bool,

    /// Overwrite existing fingerprint files instead of skipping complete
    /// molecules.
    #[arg(short = 'O', long)]
    pub overwrite: bool,

    /// Write logs to a file in addition to the console output.
    #[arg(short = 'l', long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Number of worker threads. Defaults to the number of logical cores.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Process input files one at a time instead of in parallel.
    #[arg(long, conflicts_with = "threads")]
    pub sequential: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    /// Uncompressed.
    Fps,
    /// LZ4 block compression (fastest).
    Lz4,
    /// Gzip at best ratio (smallest).
    Gz,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Fps => OutputFormat::Plain,
            FormatArg::Lz4 => OutputFormat::Lz4,
            FormatArg::Gz => OutputFormat::Gzip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("e3fp").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_mirror_the_configuration_surface() {
        let cli = parse(&["conformers/"]).unwrap();
        assert_eq!(cli.inputs, vec![PathBuf::from("conformers/")]);
        assert_eq!(cli.out_dir_base, PathBuf::from("E3FP"));
        assert_eq!(cli.format, FormatArg::Gz);
        assert_eq!(cli.first, None);
        assert_eq!(cli.max_level, None);
        assert_eq!(cli.shell_radius, 2.0);
        assert!(!cli.counts && !cli.stereo && !cli.substructures);
        assert!(!cli.exclude_disconnected && !cli.overwrite);
        assert!(!cli.sequential);
    }

    #[test]
    fn inputs_are_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn recognizes_every_flag() {
        let cli = parse(&[
            "a.xyz",
            "b.xyz",
            "-o",
            "out/FP",
            "--format",
            "lz4",
            "--first",
            "3",
            "-m",
            "5",
            "-r",
            "1.5",
            "--counts",
            "--stereo",
            "--substructures",
            "--exclude-disconnected",
            "-O",
            "-vv",
            "-j",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Lz4);
        assert_eq!(cli.first, Some(3));
        assert_eq!(cli.max_level, Some(5));
        assert_eq!(cli.shell_radius, 1.5);
        assert!(cli.counts && cli.stereo && cli.substructures);
        assert!(cli.exclude_disconnected && cli.overwrite);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(4));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(parse(&["a.xyz", "-q", "-v"]).is_err());
        assert!(parse(&["a.xyz", "--sequential", "-j", "2"]).is_err());
    }
}
