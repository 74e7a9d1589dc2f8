//! MACDET Console CLI - run text-provenance detection from the terminal
//!
//! Usage:
//!   macdet-console [--text <TEXT> | --text-file <FILE> | --testbed <NAME> [--subtype <NAME>]] [OPTIONS]
//!
//! Example:
//!   macdet-console --text "Was this written by a model?"
//!   macdet-console --testbed domain_specific --subtype "gpt (OOD)" --early-exit

use anyhow::{Context, Result};
use colored::Colorize;
use macdet::aggregate::Presentation;
use macdet::backend::{fetch_catalog, DetectorBackend, HttpBackend};
use macdet::catalog::Catalog;
use macdet::sample::SampleRecord;
use macdet::selection::InputMode;
use macdet::{Console, ConsoleConfig, PresentationSink};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn print_usage() {
    eprintln!(
        r#"
{} - Text-provenance detection from the terminal

{}
    macdet-console [INPUT] [OPTIONS]

{}
    -t, --text <TEXT>           Analyze the given text
    -f, --text-file <FILE>      Analyze the contents of a file
    --testbed <NAME>            Sample text from a testbed
    --subtype <NAME>            Subtype to sample (not needed for single-subtype testbeds)

{}
    -c, --config <FILE>         TOML config file
    -u, --url <URL>             Backend URL (default: http://localhost:8000)
    --catalog <FILE>            Grouped testbed catalog JSON (default: fetch from backend)
    --list                      List testbeds and subtypes, then exit
    --check                     Check backend health, then exit
    --min-duration <MS>         Minimum progress bar duration (default: 3000)
    --early-exit                End the progress bar as soon as inference settles
    -v, --verbose               Log progress of each step
    -vv                         Extra verbose (debug logging)
    -h, --help                  Print this help message

{}
    macdet-console --text "Was this written by a model?"
    macdet-console --testbed domain_specific --subtype "gpt (OOD)"
    macdet-console --list --catalog testbeds.json
"#,
        "MACDET Console".bold(),
        "USAGE:".bold(),
        "INPUT:".bold(),
        "OPTIONS:".bold(),
        "EXAMPLES:".bold(),
    );
}

struct CliArgs {
    text: Option<String>,
    text_file: Option<PathBuf>,
    testbed: Option<String>,
    subtype: Option<String>,
    config: Option<PathBuf>,
    url: Option<String>,
    catalog: Option<PathBuf>,
    list: bool,
    check: bool,
    min_duration_ms: Option<u64>,
    early_exit: bool,
    verbose: u8, // 0=warnings, 1=info, 2=debug
}

fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut cli = CliArgs {
        text: None,
        text_file: None,
        testbed: None,
        subtype: None,
        config: None,
        url: None,
        catalog: None,
        list: false,
        check: false,
        min_duration_ms: None,
        early_exit: false,
        verbose: 0,
    };

    let mut i = 1;
    while i < args.len() {
        let value = |i: usize| {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("Missing value for {}", args[i]))
        };

        match args[i].as_str() {
            "--text" | "-t" => {
                cli.text = Some(value(i)?);
                i += 1;
            }
            "--text-file" | "-f" => {
                cli.text_file = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            "--testbed" => {
                cli.testbed = Some(value(i)?);
                i += 1;
            }
            "--subtype" => {
                cli.subtype = Some(value(i)?);
                i += 1;
            }
            "--config" | "-c" => {
                cli.config = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            "--url" | "-u" => {
                cli.url = Some(value(i)?);
                i += 1;
            }
            "--catalog" => {
                cli.catalog = Some(PathBuf::from(value(i)?));
                i += 1;
            }
            "--min-duration" => {
                let raw = value(i)?;
                cli.min_duration_ms = Some(
                    raw.parse()
                        .with_context(|| format!("Invalid --min-duration: {}", raw))?,
                );
                i += 1;
            }
            "--list" => cli.list = true,
            "--check" => cli.check = true,
            "--early-exit" => cli.early_exit = true,
            "--verbose" | "-v" => cli.verbose = cli.verbose.max(1),
            "-vv" => cli.verbose = 2,
            other => {
                eprintln!("{} ignoring unknown argument {}", "Warning:".yellow(), other);
            }
        }
        i += 1;
    }

    Ok(cli)
}

fn load_config(args: &CliArgs) -> Result<ConsoleConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => ConsoleConfig::default(),
    };

    if let Some(url) = &args.url {
        config.backend_url = url.clone();
    }
    if let Some(catalog) = &args.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(ms) = args.min_duration_ms {
        config.progress.min_duration_ms = ms;
    }
    if args.early_exit {
        config.progress.early_exit_on_settle = true;
    }

    Ok(config)
}

/// Renders console output to the terminal: progress and notices on stderr,
/// results on stdout
struct TerminalSink;

impl TerminalSink {
    fn row(label: &str, value: &str) {
        if !value.is_empty() {
            println!("  {:<22} {}", label.dimmed(), value);
        }
    }

    fn classifier(title: &str, prediction: &str, confidence: &str) {
        println!("{}", title.bold());
        if prediction.is_empty() {
            println!("  {}", "no result".dimmed());
            return;
        }
        Self::row("Prediction:", prediction);
        Self::row("Confidence:", confidence);
    }
}

impl PresentationSink for TerminalSink {
    fn show_sample(&self, sample: &SampleRecord) {
        eprintln!("{} {}", "Sampled text".bold(), format!("({})", sample.decision).dimmed());
        eprintln!("{}", sample.text);
        eprintln!();
    }

    fn clear_results(&self) {}

    fn show_results(&self, presentation: &Presentation) {
        println!();
        Self::classifier(
            "Longformer",
            &presentation.longformer.prediction,
            &presentation.longformer.confidence,
        );
        Self::classifier(
            "Finetuned",
            &presentation.finetuned.prediction,
            &presentation.finetuned.confidence,
        );
        Self::classifier(
            "MACDET",
            &presentation.macdet.prediction,
            &presentation.macdet.confidence,
        );

        let wm = &presentation.watermark;
        println!("{}", "Watermark".bold());
        if wm.prediction.is_empty() {
            println!("  {}", "no result".dimmed());
            return;
        }
        Self::row("Prediction:", &wm.prediction);
        Self::row("Confidence:", &wm.confidence);
        Self::row("Tokens scored:", &wm.num_tokens_scored);
        Self::row("Green tokens:", &wm.num_green_tokens);
        Self::row("Green fraction:", &wm.green_fraction);
        Self::row("z-score:", &wm.z_score);
        Self::row("p-value:", &wm.p_value);
        Self::row("Detection threshold:", &wm.detection_threshold);
        if !wm.text.is_empty() {
            println!("  {}", "Watermarked text:".dimmed());
            for line in wm.text.lines() {
                println!("    {}", line);
            }
        }
    }

    fn show_progress(&self) {
        self.update_progress(0.0);
    }

    fn update_progress(&self, value: f64) {
        let width = 40;
        let filled = (((value / 100.0) * width as f64).round() as usize).min(width);
        eprint!(
            "\r{}{} {:>3}%",
            "█".repeat(filled).cyan(),
            "░".repeat(width - filled).dimmed(),
            value.round() as u64
        );
        let _ = std::io::stderr().flush();
    }

    fn hide_progress(&self) {
        eprint!("\r{}\r", " ".repeat(48));
        let _ = std::io::stderr().flush();
    }

    fn warn(&self, message: &str) {
        eprintln!("{} {}", "Warning:".yellow(), message);
    }

    fn alert(&self, message: &str) {
        eprintln!("{} {}", "Error:".red().bold(), message);
    }
}

fn print_catalog(catalog: &Catalog) {
    println!("{}", "Testbeds".bold());
    for testbed in catalog.testbeds() {
        println!("  {}", testbed.name.cyan());
        if testbed.subtypes.is_empty() {
            println!("    {}", "(no subtypes)".dimmed());
        }
        for subtype in &testbed.subtypes {
            println!("    {} {}", subtype.subtype, subtype.file_path.dimmed());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;

    let backend = Arc::new(
        HttpBackend::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .with_context(|| format!("Failed to create backend for {}", config.backend_url))?,
    );

    if args.check {
        let status = backend.health_check().await;
        if status.healthy {
            eprintln!(
                "{} {} ({}ms)",
                "Healthy:".green().bold(),
                config.backend_url,
                status.latency_ms.unwrap_or_default()
            );
            return Ok(());
        }
        eprintln!(
            "{} {} {}",
            "Unhealthy:".red().bold(),
            config.backend_url,
            status.error.unwrap_or_default()
        );
        std::process::exit(1);
    }

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog: {}", path.display()))?,
        None => fetch_catalog(backend.as_ref())
            .await
            .context("Failed to fetch testbed catalog from backend")?,
    };

    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    let mut console = Console::new(
        Arc::new(catalog),
        backend,
        Arc::new(TerminalSink),
        &config.progress,
    );

    let manual_text = match (&args.text, &args.text_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read file: {}", path.display()))?,
        ),
        (None, None) => None,
    };

    if let Some(text) = manual_text {
        console.set_mode(InputMode::Manual);
        console.set_manual_text(text);
    } else if let Some(testbed) = &args.testbed {
        console.set_mode(InputMode::Sampled);

        let choice = match console.select_testbed(testbed).await {
            Ok(choice) => choice,
            Err(_) => std::process::exit(1),
        };

        if choice.ready.is_none() {
            match &args.subtype {
                Some(subtype) => {
                    if console.select_subtype(subtype).await.is_err() {
                        std::process::exit(1);
                    }
                }
                None => {
                    eprintln!(
                        "{} testbed {} has several subtypes, pick one with --subtype:",
                        "Warning:".yellow(),
                        testbed
                    );
                    for name in &choice.subtypes {
                        eprintln!("  - {}", name);
                    }
                    std::process::exit(1);
                }
            }
        }
    } else {
        print_usage();
        std::process::exit(1);
    }

    if console.run_inference().await.is_err() {
        std::process::exit(1);
    }

    Ok(())
}
