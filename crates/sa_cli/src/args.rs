// crates/sa_cli/src/args.rs
//
// Offline CLI argument surface.
// - Inputs are local files only (any scheme:// is rejected)
// - Seeds accept decimal u64 or 0x-hex
// - `--set key=value` overrides one ruleset key for this run

use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sa",
    disable_help_subcommand = true,
    about = "Seat apportionment: constituency and adjustment seats, plus Monte-Carlo comparison of rulesets"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Only log warnings and errors.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Allocate every seat for one ruleset (or all rulesets in the file).
    Apportion(ApportionArgs),
    /// Run a simulation over every ruleset in the file.
    Simulate(SimulateArgs),
    /// Load and validate an election file without computing anything.
    Validate(ValidateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutFormat {
    Text,
    Json,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct ApportionArgs {
    /// Election file (JSON).
    #[arg(long)]
    pub input: PathBuf,
    /// Ruleset name; default: every ruleset in the file.
    #[arg(long)]
    pub ruleset: Option<String>,
    #[arg(long, value_enum, default_value_t = OutFormat::Text)]
    pub format: OutFormat,
    /// Write one canonical JSON result per ruleset into this directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Tie-break seed override.
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,
    /// Ruleset override, e.g. `--set adjustment_method=monge`. Repeatable.
    #[arg(long = "set", value_parser = parse_setting)]
    pub settings: Vec<(String, String)>,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct SimulateArgs {
    #[arg(long)]
    pub input: PathBuf,
    /// Number of perturbed vote tables; 0 runs the reference once.
    #[arg(long)]
    pub count: Option<u64>,
    /// Beta concentration (> 1); larger stays closer to the reference votes.
    #[arg(long)]
    pub stability: Option<f64>,
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,
    /// Worker threads; 0 uses all cores.
    #[arg(long)]
    pub threads: Option<usize>,
    /// Stop after this many seconds, keeping the iterations finished so far.
    #[arg(long)]
    pub time_limit: Option<u64>,
    #[arg(long, value_enum, default_value_t = OutFormat::Text)]
    pub format: OutFormat,
    /// Write the report as canonical JSON into this directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, ClapArgs, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub input: PathBuf,
}

#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

/// `key=value`; the key is checked later, against the ruleset.
pub fn parse_setting(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected key=value, got {s:?}")),
    }
}

fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

impl Command {
    pub fn input(&self) -> &Path {
        match self {
            Command::Apportion(a) => &a.input,
            Command::Simulate(a) => &a.input,
            Command::Validate(a) => &a.input,
        }
    }

    fn out(&self) -> Option<&Path> {
        match self {
            Command::Apportion(a) => a.out.as_deref(),
            Command::Simulate(a) => a.out.as_deref(),
            Command::Validate(_) => None,
        }
    }
}

/// Parse argv, then check paths: local only, input must exist.
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    check_paths(&args)?;
    Ok(args)
}

fn check_paths(args: &Args) -> Result<(), CliError> {
    for p in std::iter::once(args.command.input()).chain(args.command.out()) {
        if let Some(s) = p.to_str() {
            if has_scheme(s) {
                return Err(CliError::NonLocalPath(s.to_string()));
            }
        }
    }
    let input = args.command.input();
    if !input.is_file() {
        return Err(CliError::NotFound(input.display().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds() {
        assert_eq!(parse_seed("42"), Ok(42));
        assert_eq!(parse_seed("0xff"), Ok(255));
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("-1").is_err());
        assert!(parse_seed("0x11112222333344445").is_err());
    }

    #[test]
    fn settings() {
        assert_eq!(parse_setting(" tie_seed = 9 "), Ok(("tie_seed".into(), "9".into())));
        assert!(parse_setting("=3").is_err());
        assert!(parse_setting("novalue").is_err());
    }

    #[test]
    fn urls_are_rejected() {
        let args = Args::parse_from(["sa", "validate", "--input", "https://example.org/e.json"]);
        assert!(matches!(check_paths(&args), Err(CliError::NonLocalPath(_))));
    }

    #[test]
    fn subcommand_flags() {
        let args = Args::parse_from([
            "sa", "apportion", "--input", "e.json", "--format", "json", "--set", "adjustment_method=monge",
            "--quiet",
        ]);
        assert!(args.quiet);
        match args.command {
            Command::Apportion(a) => {
                assert_eq!(a.format, OutFormat::Json);
                assert_eq!(a.settings, vec![("adjustment_method".to_string(), "monge".to_string())]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
