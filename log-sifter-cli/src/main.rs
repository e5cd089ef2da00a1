//! Log Sifter CLI Application
//!
//! Command-line front end for the log-sifter library. It adds:
//! - TOML rule files (event, group and criteria definitions)
//! - Tokenization of raw glog-style log files
//! - Text and JSON reports

use anyhow::Result;
use clap::Parser;
use log_sifter::SifterConfig;
use std::path::PathBuf;

mod config;
mod report;
mod tokenizer;

use report::Verbosity;
use tokenizer::LogTokenizer;

/// Log Sifter - Detect recurring problems in system logs
#[derive(Parser, Debug)]
#[command(name = "log-sifter-cli")]
#[command(about = "Detect recurring problems in system logs", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the log file to analyze
    #[arg(short, long, value_name = "FILE")]
    log: PathBuf,

    /// Path to the rule file (rules.toml)
    #[arg(short, long, visible_alias = "config", value_name = "FILE")]
    rules: PathBuf,

    /// Amount of detail in the text report
    #[arg(long, value_enum, default_value_t = Verbosity::Medium)]
    verbosity: Verbosity,

    /// Collect statistics on every detected signal
    #[arg(long)]
    collect_statistics: bool,

    /// Order symptoms by start time across criteria before forming bursts
    #[arg(long)]
    chronological_bursts: bool,

    /// Evaluate grouping rules and criteria on a single thread
    #[arg(long)]
    sequential: bool,

    /// Write a JSON report instead of printing text
    #[arg(
        long,
        value_name = "FILE",
        num_args = 0..=1,
        default_missing_value = report::json::DEFAULT_OUTPUT
    )]
    json: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("Log Sifter CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using sifter library v{}", log_sifter::VERSION);

    run(&args)
}

/// Load rules, tokenize the log, sift it and report
fn run(args: &Args) -> Result<()> {
    log::info!("Loading rules from: {:?}", args.rules);
    let mut rules = config::load_config(&args.rules)?;

    // Flags only switch features on; the rule file may already enable them
    let analysis = &rules.analysis;
    rules.analysis = SifterConfig::new()
        .with_statistics(analysis.collect_statistics || args.collect_statistics)
        .with_chronological_bursts(analysis.chronological_bursts || args.chronological_bursts)
        .with_parallel(analysis.parallel && !args.sequential);

    let tokenizer = LogTokenizer::new(rules.event_rules()?)?;
    let sifter = rules.sifter_builder().build()?;

    let events = tokenizer.tokenize_file(&args.log)?;
    let report = sifter.sift(&events);

    log::debug!("Sifted {} events into {} groups", events.len(), report.group_count);

    match &args.json {
        Some(path) => report::json::write_json(&report, path)?,
        None => print!("{}", report::txt::render(&report, args.verbosity)?),
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from([
            "log-sifter-cli",
            "--log",
            "syslog.INFO",
            "--rules",
            "rules.toml",
        ])
        .unwrap();

        assert_eq!(args.verbosity, Verbosity::Medium);
        assert!(args.json.is_none());
        assert!(!args.sequential);
    }

    #[test]
    fn test_json_flag_without_value() {
        let args = Args::try_parse_from([
            "log-sifter-cli",
            "-l",
            "syslog.INFO",
            "--config",
            "rules.toml",
            "--json",
        ])
        .unwrap();
        assert_eq!(args.json, Some(PathBuf::from(report::json::DEFAULT_OUTPUT)));
    }

    #[test]
    fn test_verbosity_numeric_alias() {
        let args = Args::try_parse_from([
            "log-sifter-cli",
            "--log",
            "syslog.INFO",
            "--rules",
            "rules.toml",
            "--verbosity",
            "0",
        ])
        .unwrap();
        assert_eq!(args.verbosity, Verbosity::Low);
    }

    #[test]
    fn test_run_demo_to_json() {
        let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos");
        let out = tempfile::tempdir().unwrap();
        let json = out.path().join(report::json::DEFAULT_OUTPUT);

        let argv: Vec<std::ffi::OsString> = vec![
            "log-sifter-cli".into(),
            "--log".into(),
            demos.join("syslog.INFO").into(),
            "--rules".into(),
            demos.join("rules.toml").into(),
            "--json".into(),
            json.clone().into(),
        ];
        let args = Args::try_parse_from(argv).unwrap();
        run(&args).unwrap();

        let content = std::fs::read_to_string(&json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let tags: Vec<&str> = value["symptom_bursts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b["tag"].as_str().unwrap())
            .collect();
        assert_eq!(tags, vec!["Rescan Loop Mode", "Rescan Loop Mode", "Slow Hotplug"]);
        assert!(value["statistics"]["hotplug_latency_signal"].is_object());
    }

    #[test]
    fn test_log_is_required() {
        assert!(Args::try_parse_from(["log-sifter-cli", "--rules", "rules.toml"]).is_err());
    }
}
