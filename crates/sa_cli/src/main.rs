// crates/sa_cli/src/main.rs
//
// Exit codes, error mapping, logging setup and the three subcommands.

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const INFEASIBLE: i32 = 3;
    pub const IO: i32 = 4;
}

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sa_algo::AdjustError;
use sa_core::Rules;
use sa_io::{canonical_json, load_election_file, ElectionFile, IoError};
use sa_pipeline::{simulate, validate, Election, ElectionError, PipelineError, Severity};
use sa_report::{build_election_report, render_election_text, render_json, render_simulation_text};

use args::{parse_and_validate as parse_cli, ApportionArgs, CliError, Command, OutFormat, SimulateArgs, ValidateArgs};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Malformed input, unknown ruleset or key, failed validation.
    Validation(String),
    /// Seat targets that cannot be met, or a scaling run that does not settle.
    Infeasible(String),
    /// Read/write/render failures.
    Io(String),
}

impl MainError {
    fn code(&self) -> i32 {
        match self {
            MainError::Validation(_) => exitcodes::VALIDATION,
            MainError::Infeasible(_) => exitcodes::INFEASIBLE,
            MainError::Io(_) => exitcodes::IO,
        }
    }

    fn message(&self) -> &str {
        match self {
            MainError::Validation(m) | MainError::Infeasible(m) | MainError::Io(m) => m,
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            let e = map_cli_err(e);
            eprintln!("sa: error: {}", e.message());
            return ExitCode::from(e.code() as u8);
        }
    };

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match &args.command {
        Command::Validate(a) => validate_only(a),
        Command::Apportion(a) => apportion(a),
        Command::Simulate(a) => run_simulation(a),
    };
    let rc = match outcome {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("sa: error: {}", e.message());
            e.code()
        }
    };
    ExitCode::from(rc as u8)
}

// ---------------------------- error mapping ----------------------------

fn map_cli_err(e: CliError) -> MainError {
    match e {
        CliError::NonLocalPath(_) => MainError::Validation(e.to_string()),
        CliError::NotFound(_) => MainError::Io(e.to_string()),
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Json { .. } | IoError::Invalid(_) => MainError::Validation(e.to_string()),
        IoError::Path(_) => MainError::Io(e.to_string()),
    }
}

fn map_election_err(e: ElectionError) -> MainError {
    match e {
        ElectionError::Validation(_) | ElectionError::Rules(_) => MainError::Validation(e.to_string()),
        ElectionError::Adjust(AdjustError::OptimizerUnavailable | AdjustError::InvalidInput(_)) => {
            MainError::Validation(e.to_string())
        }
        _ => MainError::Infeasible(e.to_string()),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Config(_) => MainError::Validation(e.to_string()),
        PipelineError::Election(inner) => map_election_err(inner),
        PipelineError::Generate(_) => MainError::Infeasible(e.to_string()),
        PipelineError::Threads(_) => MainError::Io(e.to_string()),
    }
}

// ---------------------------- helpers ----------------------------

fn load(path: &Path) -> Result<ElectionFile, MainError> {
    let file = load_election_file(path).map_err(map_io_err)?;
    info!(
        parties = file.input.parties.len(),
        districts = file.input.districts.len(),
        rulesets = file.rulesets.len(),
        sha256 = %file.digest,
        "loaded {}",
        path.display()
    );
    Ok(file)
}

fn pick_rulesets(file: &ElectionFile, name: Option<&str>) -> Result<Vec<Rules>, MainError> {
    match name {
        None => Ok(file.rulesets.clone()),
        Some(n) => file
            .ruleset(n)
            .cloned()
            .map(|r| vec![r])
            .ok_or_else(|| MainError::Validation(format!("unknown ruleset {n:?}"))),
    }
}

fn print(text: &str) -> Result<(), MainError> {
    let mut out = std::io::stdout().lock();
    out.write_all(text.as_bytes())
        .and_then(|_| if text.ends_with('\n') { Ok(()) } else { out.write_all(b"\n") })
        .map_err(|e| MainError::Io(format!("stdout: {e}")))
}

// ---------------------------- subcommands ----------------------------

fn validate_only(a: &ValidateArgs) -> Result<(), MainError> {
    let file = load(&a.input)?;
    let mut first_error = None;
    for rules in &file.rulesets {
        let report = validate(&file.input, rules);
        for issue in &report.issues {
            match issue.severity {
                Severity::Warning => warn!(ruleset = %rules.name(), code = issue.code, "{}", issue.message),
                Severity::Error => eprintln!("{}: {}: {}", rules.name(), issue.code, issue.message),
            }
        }
        if !report.pass && first_error.is_none() {
            first_error = Some(format!("ruleset {}: {report}", rules.name()));
        }
    }
    if let Some(msg) = first_error {
        return Err(MainError::Validation(msg));
    }
    print(&format!(
        "ok: {} parties, {} districts, {} ruleset(s), sha256 {}",
        file.input.parties.len(),
        file.input.districts.len(),
        file.rulesets.len(),
        file.digest
    ))
}

fn apportion(a: &ApportionArgs) -> Result<(), MainError> {
    let file = load(&a.input)?;
    let mut rulesets = pick_rulesets(&file, a.ruleset.as_deref())?;
    for rules in &mut rulesets {
        for (k, v) in &a.settings {
            *rules = rules.with_setting(k, v).map_err(|e| MainError::Validation(e.to_string()))?;
        }
        if let Some(seed) = a.seed {
            *rules = rules
                .with_setting("tie_seed", &seed.to_string())
                .map_err(|e| MainError::Validation(e.to_string()))?;
        }
    }

    let mut results = Vec::with_capacity(rulesets.len());
    for rules in &rulesets {
        let result = Election::new(&file.input, rules)
            .and_then(|e| e.run(0, None))
            .map_err(map_election_err)?;
        if result.violating {
            warn!(ruleset = %rules.name(), "party seat targets not met");
        }
        if let Some(dir) = &a.out {
            let path = dir.join(format!("{}.json", rules.name()));
            canonical_json::write_canonical_file(&path, &result).map_err(|e| MainError::Io(e.to_string()))?;
            info!("wrote {}", path.display());
        }
        results.push(build_election_report(&result, Some(&file.digest)));
    }

    match a.format {
        OutFormat::Text => {
            let texts: Vec<String> = results.iter().map(render_election_text).collect();
            print(&texts.join("\n"))
        }
        // Always an array, so the shape does not depend on how many rulesets ran.
        OutFormat::Json => print(&render_json(&results).map_err(|e| MainError::Io(e.to_string()))?),
    }
}

fn run_simulation(a: &SimulateArgs) -> Result<(), MainError> {
    let file = load(&a.input)?;
    let mut config = file.simulation.clone().unwrap_or_default();
    if let Some(n) = a.count {
        config.simulation_count = n;
    }
    if let Some(s) = a.stability {
        config.stability = s;
    }
    if let Some(s) = a.seed {
        config.seed = s;
    }
    if let Some(t) = a.threads {
        config.threads = t;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    if let Some(secs) = a.time_limit {
        let flag = Arc::clone(&cancel);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            flag.store(true, Ordering::Relaxed);
        });
    }

    let report = simulate(&file.input, &file.rulesets, &config, None, &cancel).map_err(map_pipeline_err)?;
    if let Some(dir) = &a.out {
        let path = dir.join("simulation.json");
        canonical_json::write_canonical_file(&path, &report).map_err(|e| MainError::Io(e.to_string()))?;
        info!("wrote {}", path.display());
    }
    let text = match a.format {
        OutFormat::Text => render_simulation_text(&report),
        OutFormat::Json => render_json(&report).map_err(|e| MainError::Io(e.to_string()))?,
    };
    print(&text)
}
