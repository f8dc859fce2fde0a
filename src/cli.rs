//! CLI parsing and orchestration. Parses args (or prompts for the URL), merges config, sets up
//! logging and the HTTP session, then runs the download. Maps setup errors to exit codes.

use crate::config::{self, Config};
use crate::run::{run as run_download, RunOptions, RunReport};
use crate::site::index::fetch_index;
use crate::site::pages::DEFAULT_MAX_PAGES;
use crate::site::{FetchError, ProfileError, Session, SiteProfile, DEFAULT_ORIGIN};
use clap::Parser;
use env_logger::{Builder, Env};
use log::info;
use reqwest::Url;
use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Setup failure before any chapter is downloaded, with its exit code.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Profile(#[from] ProfileError),

    #[error("{0}")]
    Fetch(#[from] FetchError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) | CliRunError::Profile(_) => 1,
            CliRunError::Fetch(_) => 2,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "comic2epub")]
#[command(about = "Download a web comic and write one EPUB per chapter")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, request_delay_secs, timeout_secs, max_pages, origin, [selectors]) are read from ./comic2epub.toml or the user config directory. CLI flags override config."
)]
pub struct Args {
    /// Comic index page URL. Prompted for on stdin when omitted.
    pub url: Option<String>,

    /// Base directory for output. Default: current directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Site origin that relative links resolve against (overrides config).
    #[arg(long)]
    pub origin: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 0).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum pages followed per chapter (overrides config; default 500).
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Fetch the index page only and print title, author, and chapters as JSON.
    #[arg(long)]
    pub dry_run: bool,

    /// No progress bar; log warnings and errors only.
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error cause chain.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Initialise the process-wide logger. `RUST_LOG` wins over the flag-derived default.
pub fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    Builder::from_env(Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

/// Print the welcome line and read one URL from `input`.
fn prompt_for_url(
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<String, CliRunError> {
    let io_err = |e: std::io::Error| CliRunError::InvalidInput(format!("Cannot read URL: {}", e));
    writeln!(output, "Welcome to comic2epub!").map_err(io_err)?;
    write!(output, "Enter the comic index page URL: ").map_err(io_err)?;
    output.flush().map_err(io_err)?;
    let mut line = String::new();
    input.read_line(&mut line).map_err(io_err)?;
    let url = line.trim().to_string();
    if url.is_empty() {
        return Err(CliRunError::InvalidInput("No URL given.".to_string()));
    }
    Ok(url)
}

/// Require an absolute http(s) URL.
fn validate_index_url(url: &str) -> Result<(), CliRunError> {
    let parsed = Url::parse(url).map_err(|e| {
        CliRunError::InvalidInput(format!(
            "Expected an absolute index page URL, e.g. https://www.baozimh.com/comic/... Invalid: {}: {}",
            url, e
        ))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CliRunError::InvalidInput(format!(
            "Unsupported URL scheme '{}' in {}. Use http or https.",
            other, url
        ))),
    }
}

/// Locator table and origin: CLI flag, then config, then built-in defaults.
fn build_profile(args: &Args, config: Option<&Config>) -> Result<SiteProfile, ProfileError> {
    let origin = args
        .origin
        .clone()
        .or_else(|| config.and_then(|c| c.origin.clone()))
        .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
    let locators = config
        .and_then(|c| c.selectors.clone())
        .unwrap_or_default();
    SiteProfile::new(&origin, &locators)
}

fn build_session(args: &Args, config: Option<&Config>) -> Result<Session, CliRunError> {
    let mut builder = Session::builder();
    if let Some(delay) = args
        .delay
        .or_else(|| config.and_then(|c| c.request_delay_secs))
    {
        builder = builder.delay_secs(delay);
    }
    if let Some(timeout) = args.timeout.or_else(|| config.and_then(|c| c.timeout_secs)) {
        builder = builder.timeout_secs(timeout);
    }
    if let Some(ua) = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()))
    {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

/// One-line summary of a finished run.
fn summary_line(report: &RunReport) -> String {
    let mut line = format!(
        "Finished: {} of {} chapter(s) written, {} image(s)",
        report.archives_written, report.chapters_found, report.images_written
    );
    if report.chapters_failed > 0 {
        line.push_str(&format!(", {} failed", report.chapters_failed));
    }
    if let Some(dir) = &report.output_dir {
        line.push_str(&format!(", output in {}", dir.display()));
    }
    line
}

/// Entry point for the CLI. Chapter failures are logged, not returned; only setup errors are.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let config = config.as_ref();

    let url = match &args.url {
        Some(u) => u.trim().to_string(),
        None => prompt_for_url(&mut std::io::stdin().lock(), &mut std::io::stdout())?,
    };
    validate_index_url(&url)?;

    let profile = build_profile(args, config)?;
    let mut session = build_session(args, config)?;

    if args.dry_run {
        let listing = fetch_index(&mut session, &url, &profile)?;
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &listing)
            .map_err(|e| CliRunError::InvalidInput(format!("Failed to write listing: {}", e)))?;
        writeln!(stdout)
            .map_err(|e| CliRunError::InvalidInput(format!("Failed to write listing: {}", e)))?;
        return Ok(());
    }

    let output_base = args
        .output_dir
        .clone()
        .or_else(|| config.and_then(|c| c.output_dir.clone()))
        .unwrap_or_else(|| PathBuf::from("."));
    let max_pages = args
        .max_pages
        .or_else(|| config.and_then(|c| c.max_pages))
        .unwrap_or(DEFAULT_MAX_PAGES)
        .max(1);

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n.saturating_sub(1) as u64);
        pb.set_message(format!("Chapter {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u32, u32)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = RunOptions {
        output_base,
        max_pages,
        progress,
    };
    let report = run_download(&url, &mut session, &profile, &options);

    // Clear the bar before logging the summary.
    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }
    info!("{}", summary_line(&report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Locators;
    use std::io::Cursor;

    fn args(argv: &[&str]) -> Args {
        let mut full = vec!["comic2epub"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert()
    }

    #[test]
    fn url_is_optional() {
        let a = args(&[]);
        assert!(a.url.is_none());
        assert!(!a.dry_run);
        let a = args(&["https://www.baozimh.com/comic/x", "-o", "out", "--max-pages", "7"]);
        assert_eq!(a.url.as_deref(), Some("https://www.baozimh.com/comic/x"));
        assert_eq!(a.output_dir, Some(PathBuf::from("out")));
        assert_eq!(a.max_pages, Some(7));
    }

    #[test]
    fn prompt_reads_trimmed_url() {
        let mut input = Cursor::new("  https://www.baozimh.com/comic/x \n");
        let mut output = Vec::new();
        let url = prompt_for_url(&mut input, &mut output).unwrap();
        assert_eq!(url, "https://www.baozimh.com/comic/x");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Welcome"));
        assert!(shown.contains("index page URL"));
    }

    #[test]
    fn prompt_rejects_empty_input() {
        let mut input = Cursor::new("\n");
        let result = prompt_for_url(&mut input, &mut Vec::new());
        assert!(matches!(result, Err(CliRunError::InvalidInput(_))));
    }

    #[test]
    fn validate_index_url_accepts_http_and_https() {
        assert!(validate_index_url("https://www.baozimh.com/comic/x").is_ok());
        assert!(validate_index_url("http://localhost:8080/comic").is_ok());
    }

    #[test]
    fn validate_index_url_rejects_relative_and_other_schemes() {
        assert!(validate_index_url("/comic/x").is_err());
        assert!(validate_index_url("ftp://example.com/x").is_err());
    }

    #[test]
    fn profile_flag_overrides_config_origin() {
        let config = Config {
            origin: Some("https://config.example.org".to_string()),
            ..Config::default()
        };
        let a = args(&["--origin", "https://flag.example.org"]);
        let profile = build_profile(&a, Some(&config)).unwrap();
        assert_eq!(profile.resolve("/").as_deref(), Some("https://flag.example.org/"));

        let profile = build_profile(&args(&[]), Some(&config)).unwrap();
        assert_eq!(profile.resolve("/").as_deref(), Some("https://config.example.org/"));

        let profile = build_profile(&args(&[]), None).unwrap();
        assert_eq!(profile.resolve("/").as_deref(), Some("https://www.baozimh.com/"));
    }

    #[test]
    fn invalid_config_selector_is_profile_error() {
        let config = Config {
            selectors: Some(Locators {
                chapter_link: "a[".to_string(),
                ..Locators::default()
            }),
            ..Config::default()
        };
        let err = build_profile(&args(&[]), Some(&config)).unwrap_err();
        assert!(err.to_string().contains("chapter_link"));
        assert_eq!(CliRunError::from(err).exit_code(), 1);
    }

    #[test]
    fn summary_line_reports_counts_and_output() {
        let report = RunReport {
            output_dir: Some(PathBuf::from("out/Sample - Author")),
            chapters_found: 3,
            archives_written: 2,
            chapters_failed: 1,
            images_written: 9,
            ..RunReport::default()
        };
        assert_eq!(
            summary_line(&report),
            "Finished: 2 of 3 chapter(s) written, 9 image(s), 1 failed, output in out/Sample - Author"
        );
        assert_eq!(
            summary_line(&RunReport::default()),
            "Finished: 0 of 0 chapter(s) written, 0 image(s)"
        );
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Fetch(FetchError::HttpStatus {
                status: 404,
                url: "https://www.baozimh.com/x".into()
            })
            .exit_code(),
            2
        );
    }
}
