use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factlens_core::{AnalysisReport, AnalysisRequest, ScanMode};
use factlens_local::{store, Config, ContentScript, Document, FsStore, ScanSession, Tab};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "factlens")]
#[command(about = "Offline misinformation-risk heuristics for web pages", long_about = None)]
struct Cli {
    /// Directory for settings, history and feedback (default: the user data dir).
    #[arg(long, global = true, env = "FACTLENS_DATA_DIR")]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze plain text (json report).
    Analyze(AnalyzeCmd),
    /// Scan an HTML page, highlight risky spans, and report (json).
    Scan(ScanCmd),
    /// Show or clear scan history.
    History(HistoryCmd),
    /// Record agree/disagree feedback for a page.
    Feedback(FeedbackCmd),
    /// Show or update settings (json; no secrets).
    Settings(SettingsCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    /// Read text from this file.
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// Text to analyze. With neither --file nor --text, stdin is read.
    #[arg(long)]
    text: Option<String>,
    #[arg(long, default_value = "")]
    url: String,
    #[arg(long, default_value = "")]
    title: String,
    /// Scan mode: page|selection
    #[arg(long, default_value = "page")]
    mode: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ScanCmd {
    /// HTML file standing in for the open tab.
    #[arg(long)]
    html: PathBuf,
    /// Selected text on the page (enables selection scans).
    #[arg(long)]
    selection: Option<String>,
    /// Scan mode: page|selection (default: selection when --selection is given).
    #[arg(long)]
    mode: Option<String>,
    #[arg(long, default_value = "")]
    url: String,
    /// Tab title (default: the document's <title>).
    #[arg(long)]
    title: Option<String>,
    /// Write the highlighted document here.
    #[arg(long)]
    out_html: Option<PathBuf>,
    /// Leave highlights applied but hidden.
    #[arg(long, default_value_t = false)]
    hide_highlights: bool,
    /// Append the result to history.
    #[arg(long, default_value_t = false)]
    save_history: bool,
    /// Override the scan timeout (ms).
    #[arg(long, env = "FACTLENS_SCAN_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct HistoryCmd {
    #[arg(long, default_value_t = false)]
    clear: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct FeedbackCmd {
    #[arg(long)]
    url: String,
    #[arg(long, default_value = "")]
    title: String,
    /// Scan mode: page|selection
    #[arg(long, default_value = "page")]
    mode: String,
    #[arg(long, conflicts_with = "disagree", required_unless_present = "disagree")]
    agree: bool,
    #[arg(long)]
    disagree: bool,
}

#[derive(clap::Args, Debug)]
struct SettingsCmd {
    #[arg(long)]
    telemetry: Option<bool>,
    #[arg(long)]
    snopes_opt_in: Option<bool>,
    #[arg(long)]
    snopes_api_key: Option<String>,
    #[arg(long)]
    snopes_api_base: Option<String>,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn data_dir(cli_dir: Option<PathBuf>, cfg: &Config) -> PathBuf {
    cli_dir
        .or_else(|| dirs::data_dir().map(|d| d.join("factlens")))
        .unwrap_or_else(|| cfg.data_dir.clone())
}

fn read_input(file: Option<&PathBuf>, text: Option<String>) -> Result<String> {
    if let Some(t) = text {
        return Ok(t);
    }
    if let Some(p) = file {
        return std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("read stdin")?;
    Ok(buf)
}

fn print_report(kind: &str, report: &AnalysisReport, output: &str) {
    match output.to_ascii_lowercase().as_str() {
        "text" => {
            let band = serde_json::to_value(report.band())
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            println!(
                "score {} ({band}), initial {}",
                report.final_score, report.initial_score
            );
            let flags: Vec<&str> = report.flags.iter().map(|c| c.as_str()).collect();
            println!("flags: {}", flags.join(", "));
            println!(
                "bias: {} ({}, confidence {:.2})",
                report.bias.label, report.bias.score, report.bias.confidence
            );
            for h in &report.highlights {
                println!("- [{}] {:?} {}", h.category.as_str(), h.span, h.reason);
            }
            for s in &report.suggested_sources {
                println!("source: {} {}", s.title, s.url);
            }
            for n in &report.notices {
                println!("notice: {n}");
            }
        }
        _ => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": kind,
                "ok": true,
                "band": report.band(),
                "report": report,
            });
            println!("{v}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON payload.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    cfg.data_dir = data_dir(cli.data_dir, &cfg);

    match cli.command {
        Commands::Analyze(args) => {
            let mode: ScanMode = args.mode.parse()?;
            let text = read_input(args.file.as_ref(), args.text)?;
            let req = AnalysisRequest {
                text,
                url: args.url,
                title: args.title,
                mode,
                language: cfg.language.clone(),
            };
            let report = factlens_local::analyze(&req);
            print_report("analyze", &report, &args.output);
        }
        Commands::Scan(args) => {
            let html = std::fs::read_to_string(&args.html)
                .with_context(|| format!("read {}", args.html.display()))?;
            let mode: ScanMode = match args.mode.as_deref() {
                Some(m) => m.parse()?,
                None if args.selection.is_some() => ScanMode::Selection,
                None => ScanMode::Page,
            };
            if let Some(ms) = args.timeout_ms {
                cfg.scan_timeout = std::time::Duration::from_millis(ms.clamp(1, 600_000));
            }

            let mut script = ContentScript::from_html(&html);
            if let Some(sel) = args.selection {
                script.select(sel);
            }
            let title = args
                .title
                .unwrap_or_else(|| document_title(script.document()));
            let (handle, task) = script.spawn(8);

            let fs_store = FsStore::new(cfg.data_dir.clone());
            store::init_defaults(&fs_store)?;
            let session = ScanSession::new(
                handle,
                fs_store,
                Tab {
                    url: args.url,
                    title,
                },
                &cfg,
            );
            let report = session.run(mode).await?;
            if args.hide_highlights {
                session.toggle_highlights().await?;
            }
            if args.save_history {
                session.save_history(&report)?;
            }
            // Dropping the session closes the channel; the script task then returns the page.
            drop(session);
            let script = task.await.context("content script task")?;
            if let Some(out) = &args.out_html {
                std::fs::write(out, script.document().to_html())
                    .with_context(|| format!("write {}", out.display()))?;
                tracing::info!(path = %out.display(), markers = script.applier().marker_count(), "wrote highlighted page");
            }
            print_report("scan", &report, &args.output);
        }
        Commands::History(args) => {
            let fs_store = FsStore::new(cfg.data_dir.clone());
            if args.clear {
                store::clear_history(&fs_store)?;
            }
            let entries = store::load_history(&fs_store)?;
            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    for e in &entries {
                        println!("{}\t{}\t{}", e.score, e.timestamp_ms, e.url);
                    }
                }
                _ => {
                    let v = serde_json::json!({
                        "schema_version": 1,
                        "kind": "history",
                        "ok": true,
                        "entries": entries,
                    });
                    println!("{v}");
                }
            }
        }
        Commands::Feedback(args) => {
            let mode: ScanMode = args.mode.parse()?;
            let fs_store = FsStore::new(cfg.data_dir.clone());
            let tally =
                store::record_feedback(&fs_store, &args.url, &args.title, mode, args.agree)?;
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "feedback",
                "ok": true,
                "key": store::feedback_key(&args.url, &args.title, mode),
                "tally": tally,
            });
            println!("{v}");
        }
        Commands::Settings(args) => {
            let fs_store = FsStore::new(cfg.data_dir.clone());
            store::init_defaults(&fs_store)?;
            let mut settings = store::load_settings(&fs_store)?;
            let mut changed = false;
            if let Some(b) = args.telemetry {
                settings.telemetry = b;
                changed = true;
            }
            if let Some(b) = args.snopes_opt_in {
                settings.snopes_opt_in = b;
                changed = true;
            }
            if let Some(k) = args.snopes_api_key {
                settings.snopes_api_key = Some(k).filter(|k| !k.trim().is_empty());
                changed = true;
            }
            if let Some(u) = args.snopes_api_base {
                settings.snopes_api_base = u;
                changed = true;
            }
            if changed {
                settings = store::save_settings(&fs_store, &settings)?;
            }
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "settings",
                "ok": true,
                "data_dir": cfg.data_dir.display().to_string(),
                "telemetry": settings.telemetry,
                "snopes_opt_in": settings.snopes_opt_in,
                "snopes_api_key_configured": settings.snopes_api_key.is_some(),
                "snopes_api_base": settings.snopes_api_base,
            });
            println!("{v}");
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "factlens",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("factlens {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}

fn document_title(doc: &Document) -> String {
    doc.first_text("title").unwrap_or_default()
}
