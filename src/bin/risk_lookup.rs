//! Risk Lookup CLI
//!
//! Interactive front end for the query coordinator. Every line typed that is
//! not a command is treated as the new content of the search box.
//!
//! Usage:
//!   cargo run --bin risk-lookup -- --config config/risk_lookup.yaml
//!   cargo run --bin risk-lookup -- --id 50117047
//!   cargo run --bin risk-lookup -- --link "https://app.example.com/risk?id=50117047"
//!
//! Commands:
//!   :n / :p      move highlight to next / previous candidate
//!   :c [i]       commit the highlighted candidate (or index i)
//!   :r           reset
//!   :v           dump the current view as JSON
//!   :q           quit

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use risk_lookup::config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use risk_lookup::{
    CommitTarget, Coordinator, CoordinatorHandle, CoordinatorView, Direction, HttpLookupClient,
    DeepLinkStore, HttpScoringClient, LookupConfig, MemoryDeepLink, Phase, RiskBand, UrlDeepLink,
};

#[derive(Parser, Debug)]
#[command(name = "risk-lookup")]
#[command(about = "Search for entities and retrieve their risk assessment")]
struct Args {
    /// Configuration file (YAML)
    #[arg(long, short = 'c', env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Candidate identifier to select at startup (deep link)
    #[arg(long)]
    id: Option<String>,

    /// Shareable URL carrying the deep-link parameter; rewritten on every selection
    #[arg(long, conflicts_with = "id")]
    link: Option<String>,

    /// Override the lookup endpoint
    #[arg(long)]
    lookup_url: Option<String>,

    /// Override the scoring endpoint
    #[arg(long)]
    scoring_url: Option<String>,
}

enum Command {
    Query(String),
    Move(Direction),
    Commit(CommitTarget),
    Reset,
    Dump,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(':') else {
        return Command::Query(line.to_string());
    };

    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("n"), None) => Command::Move(Direction::Next),
        (Some("p"), None) => Command::Move(Direction::Previous),
        (Some("c"), None) => Command::Commit(CommitTarget::Highlighted),
        (Some("c"), Some(index)) => match index.parse() {
            Ok(i) => Command::Commit(CommitTarget::Index(i)),
            Err(_) => Command::Unknown(trimmed.to_string()),
        },
        (Some("r"), None) => Command::Reset,
        (Some("v"), None) => Command::Dump,
        (Some("q"), None) => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

fn load_config(args: &Args) -> Result<LookupConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = if path.exists() {
        LookupConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        LookupConfig::default()
    };

    let mut config = config.apply_env_overrides()?;
    if let Some(url) = &args.lookup_url {
        config.lookup_url = url.clone();
    }
    if let Some(url) = &args.scoring_url {
        config.scoring_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn render(view: &CoordinatorView) {
    println!();
    if view.searching {
        println!("{}", "searching...".dimmed());
    }
    if let Some(err) = &view.search_error {
        println!("{} {}", "search failed:".red(), err);
    }
    if let Some(suggestion) = &view.fallback_suggestion {
        println!("{} {}", "showing results for".yellow(), suggestion.as_str().bold());
    }

    for (i, candidate) in view.candidates.iter().enumerate() {
        let marker = if view.highlighted_index == Some(i) { ">" } else { " " };
        let line = format!(
            "{marker} [{i}] {}  {} {}",
            candidate.label(),
            candidate.address_line,
            candidate.region
        );
        if view.highlighted_index == Some(i) {
            println!("{}", line.cyan());
        } else {
            println!("{line}");
        }
    }

    if let Some(selected) = &view.selected_candidate {
        println!("{} {} ({})", "selected:".bold(), selected.label(), selected.id);
    }

    match view.phase {
        Phase::Scoring => println!("{}", "scoring...".dimmed()),
        Phase::Scored => {
            if let Some(err) = &view.score_error {
                println!("{} {}", "scoring failed:".red(), err);
            }
            if let Some(a) = &view.assessment {
                let band = a.band().as_str();
                let band = match a.band() {
                    RiskBand::Low => band.green(),
                    RiskBand::Moderate => band.yellow(),
                    RiskBand::High => band.red(),
                };
                println!("  risk:             {} ({})", a.probability_percent(), band);
                println!("  predicted metric: {}", a.predicted_metric_display());
                println!("  top reasons:      {}", a.top_reasons_display());
                println!("  last observed:    {}", a.last_observed_date_display());
                println!("  last metric:      {}", a.last_observed_metric_display());
                println!("  last grade:       {}", a.last_observed_grade_display());
            }
        }
        Phase::Idle | Phase::Browsing => {}
    }
}

/// Print every published view until the coordinator stops, plus the
/// shareable link whenever a selection or reset rewrote it
async fn render_loop(
    mut views: watch::Receiver<CoordinatorView>,
    link: Option<Arc<UrlDeepLink>>,
) {
    let mut last_url = link.as_ref().map(|l| l.current_url());
    while views.changed().await.is_ok() {
        let view = views.borrow_and_update().clone();
        render(&view);

        if let Some(link) = &link {
            let url = link.current_url();
            if last_url.as_ref() != Some(&url) {
                println!("{} {}", "link:".bold(), url);
                last_url = Some(url);
            }
        }
    }
}

fn deep_link_store(
    args: &Args,
    config: &LookupConfig,
) -> Result<(Arc<dyn DeepLinkStore>, Option<Arc<UrlDeepLink>>)> {
    if let Some(link) = &args.link {
        let link = Arc::new(UrlDeepLink::from_config(link, config)?);
        let store: Arc<dyn DeepLinkStore> = link.clone();
        return Ok((store, Some(link)));
    }
    let store: Arc<dyn DeepLinkStore> = match &args.id {
        Some(id) => Arc::new(MemoryDeepLink::with_id(id.clone())),
        None => Arc::new(MemoryDeepLink::default()),
    };
    Ok((store, None))
}

/// Read lines on a blocking thread; the channel closes on EOF or Ctrl-C
fn spawn_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let mut editor = DefaultEditor::new().context("Failed to initialise line editor")?;
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || loop {
        match editor.readline("search> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Line editor failed");
                break;
            }
        }
    });

    Ok(rx)
}

fn dispatch(handle: &CoordinatorHandle, command: Command) -> Result<bool> {
    match command {
        Command::Query(text) => {
            handle.query_changed(text);
        }
        Command::Move(direction) => {
            handle.move_highlight(direction);
        }
        Command::Commit(target) => {
            handle.commit(target);
        }
        Command::Reset => {
            handle.reset();
        }
        Command::Dump => {
            let json = serde_json::to_string_pretty(&handle.view())?;
            println!("{json}");
        }
        Command::Quit => return Ok(false),
        Command::Unknown(cmd) => {
            println!("{} {}", "unknown command:".red(), cmd);
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("risk_lookup=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!(
        lookup_url = %config.lookup_url,
        scoring_url = %config.scoring_url,
        debounce_ms = config.debounce_ms,
        "Starting risk lookup"
    );

    let lookup = Arc::new(HttpLookupClient::new(&config)?);
    let scoring = Arc::new(HttpScoringClient::new(&config)?);
    let (deep_link, url_link) = deep_link_store(&args, &config)?;

    let handle = Coordinator::spawn(&config, lookup, scoring, deep_link);
    let renderer = tokio::spawn(render_loop(handle.subscribe(), url_link));

    println!(
        "{}",
        "Type to search. :n/:p move, :c [i] select, :r reset, :v view, :q quit".dimmed()
    );

    let mut lines = spawn_reader()?;
    while let Some(line) = lines.recv().await {
        if !dispatch(&handle, parse_command(&line))? {
            break;
        }
    }

    handle.shutdown().await;
    renderer.abort();
    Ok(())
}
