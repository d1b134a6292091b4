use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use navigator::api::{Gateway, SchemaVariant};
use navigator::config::Config;
use navigator::notify::{ConsoleSink, NotificationSink};
use navigator::prefs::{
    DeliveryMethod, PreferenceDocument, PreferenceStore, ReportPreferences, ScheduleTime,
    TimezoneProvider, UserPreferences, PRESET_TIMEZONES,
};
use navigator::reports::ReportActions;
use navigator::sources::SourceBrowser;
use navigator::util::display_line;

/// Widest a single list cell is allowed to render.
const CELL_WIDTH: usize = 60;

/// Get the config directory path (~/.config/navigator/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("navigator"))
}

#[derive(Parser, Debug)]
#[command(
    name = "navigator",
    version,
    about = "Manage AI Navigator subscription preferences and reports"
)]
struct Cli {
    /// Config file (default: ~/.config/navigator/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Override the backend schema: versioned, subscription or legacy
    #[arg(long, value_name = "VARIANT", global = true)]
    variant: Option<SchemaVariant>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Subscription preferences: categories, keywords, schedule
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Report delivery settings
    #[command(subcommand)]
    ReportPrefs(ReportPrefsCommand),

    /// Generated reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Generate today's summary
    Summary {
        /// Account to summarize (default: user_id from config)
        #[arg(long)]
        user_id: Option<i64>,
    },

    /// Data sources per category
    #[command(subcommand)]
    Sources(SourcesCommand),

    /// List timezone identifiers
    Timezones {
        /// Every IANA zone instead of the common presets
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsCommand {
    /// Show the category catalog and current preferences
    Show,
    /// Add a keyword and save
    AddKeyword { keyword: String },
    /// Remove a keyword and save
    RemoveKeyword { keyword: String },
    /// Select or deselect a category and save
    ToggleCategory { id: i64 },
    /// Set the daily delivery time (HH:MM) and save
    SetSchedule { time: String },
    /// Set the IANA timezone and save
    SetTimezone { timezone: String },
}

#[derive(Subcommand, Debug)]
enum ReportPrefsCommand {
    /// Show report delivery settings
    Show,
    /// Change report delivery settings and save
    Set(ReportPrefsArgs),
}

#[derive(Args, Debug)]
struct ReportPrefsArgs {
    /// Delivery time (HH:MM)
    #[arg(long)]
    delivery_time: Option<String>,
    /// Generation schedule (HH:MM)
    #[arg(long)]
    schedule_time: Option<String>,
    #[arg(long)]
    email_enabled: Option<bool>,
    #[arg(long)]
    pdf_enabled: Option<bool>,
    /// Toggle a delivery method: email or in_app (repeatable)
    #[arg(long = "toggle-method", value_name = "METHOD")]
    toggle_methods: Vec<DeliveryMethod>,
    /// IANA timezone
    #[arg(long)]
    timezone: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ReportsCommand {
    /// List generated reports
    List,
    /// Request a new report
    Generate,
    /// Download a report as report-{id}.pdf
    Download {
        id: i64,
        /// Target directory (default: download_dir from config)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Open the file after downloading
        #[arg(long)]
        open: bool,
    },
    /// Send a report to the account's email address
    Email { id: i64 },
}

#[derive(Subcommand, Debug)]
enum SourcesCommand {
    /// List sources of a category (or the categories when none is given)
    List {
        #[arg(long)]
        category: Option<i64>,
    },
    /// Register a custom source in a category
    Add {
        #[arg(long)]
        category: i64,
        name: String,
        url: String,
    },
}

/// Shared handles every command builds on.
struct Session {
    config: Config,
    gateway: Arc<dyn Gateway>,
    sink: Arc<dyn NotificationSink>,
    timezones: Arc<dyn TimezoneProvider>,
}

impl Session {
    fn store<D: PreferenceDocument>(&self) -> PreferenceStore<D> {
        PreferenceStore::new(
            self.gateway.clone(),
            self.sink.clone(),
            self.timezones.clone(),
        )
    }

    fn reports(&self) -> ReportActions {
        ReportActions::new(self.gateway.clone(), self.sink.clone())
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!(config = ?config, "Effective configuration");

    let gateway = config
        .gateway()
        .context("Failed to set up the API client")?;
    let ctx = Session {
        timezones: config.timezones(),
        gateway: Arc::new(gateway),
        sink: Arc::new(ConsoleSink),
        config,
    };

    match cli.command {
        Command::Prefs(cmd) => run_prefs(&ctx, cmd).await,
        Command::ReportPrefs(cmd) => run_report_prefs(&ctx, cmd).await,
        Command::Reports(cmd) => run_reports(&ctx, cmd).await,
        Command::Summary { user_id } => {
            let user_id = user_id.unwrap_or(ctx.config.user_id);
            let summary = ctx
                .reports()
                .request_summary(user_id)
                .await
                .context("Summary request failed")?;
            if let Some(text) = summary {
                println!();
                println!("{}", navigator::util::strip_control_chars(&text));
            }
            Ok(())
        }
        Command::Sources(cmd) => run_sources(&ctx, cmd).await,
        Command::Timezones { all } => {
            if all {
                for tz in ctx.timezones.supported() {
                    println!("{tz}");
                }
            } else {
                for tz in PRESET_TIMEZONES {
                    println!("{tz}");
                }
            }
            Ok(())
        }
    }
}

async fn run_prefs(ctx: &Session, cmd: PrefsCommand) -> Result<()> {
    let store = ctx.store::<UserPreferences>();
    store.load().await.context("Failed to load preferences")?;

    match cmd {
        PrefsCommand::Show => {
            print_user_preferences(&store);
            return Ok(());
        }
        PrefsCommand::AddKeyword { keyword } => store.add_keyword(&keyword)?,
        PrefsCommand::RemoveKeyword { keyword } => {
            if !store.remove_keyword(&keyword)? {
                println!("Keyword '{keyword}' was not set, nothing to save");
                return Ok(());
            }
        }
        PrefsCommand::ToggleCategory { id } => {
            if !store.catalog().iter().any(|c| c.id == id) {
                tracing::warn!(category_id = id, "Category not in the catalog");
            }
            let selected = store.toggle_category(id)?;
            println!(
                "Category {id} {}",
                if selected { "selected" } else { "deselected" }
            );
        }
        PrefsCommand::SetSchedule { time } => {
            warn_schedule_ignored(ctx);
            store.set_schedule_time(&time)?
        }
        PrefsCommand::SetTimezone { timezone } => {
            warn_schedule_ignored(ctx);
            store.set_timezone(&timezone)?
        }
    }

    store.save().await.context("Failed to save preferences")?;
    Ok(())
}

fn warn_schedule_ignored(session: &Session) {
    if !session.config.variant.sends_schedule() {
        eprintln!(
            "Note: the {} backend stores only categories and keywords; schedule changes are not sent",
            session.config.variant
        );
    }
}

fn print_user_preferences(store: &PreferenceStore<UserPreferences>) {
    let prefs = store.snapshot();
    let catalog = store.catalog();

    println!("Categories:");
    for category in &catalog {
        let mark = if prefs.categories.contains(category.id) { "x" } else { " " };
        println!(
            "  [{mark}] {:>4}  {}",
            category.id,
            display_line(&category.name, CELL_WIDTH)
        );
    }
    let stale = store.stale_categories();
    if !stale.is_empty() {
        println!("  (selected but no longer offered: {stale:?})");
    }

    let keywords: Vec<&str> = prefs.keywords.iter().collect();
    println!("Keywords: {}", display_line(&keywords.join(", "), CELL_WIDTH * 2));
    println!("Schedule: {} ({})", prefs.schedule_time, prefs.timezone);
}

async fn run_report_prefs(ctx: &Session, cmd: ReportPrefsCommand) -> Result<()> {
    let store = ctx.store::<ReportPreferences>();
    store.load().await.context("Failed to load report settings")?;

    let args = match cmd {
        ReportPrefsCommand::Show => {
            print_report_preferences(&store.snapshot());
            return Ok(());
        }
        ReportPrefsCommand::Set(args) => args,
    };

    if let Some(time) = &args.delivery_time {
        store.set_delivery_time(time)?;
    }
    if let Some(time) = &args.schedule_time {
        let time: ScheduleTime = time.parse()?;
        store.edit(|doc| doc.schedule_time = time)?;
    }
    if let Some(enabled) = args.email_enabled {
        store.set_email_enabled(enabled)?;
    }
    if let Some(enabled) = args.pdf_enabled {
        store.set_pdf_enabled(enabled)?;
    }
    for method in args.toggle_methods {
        store.toggle_delivery_method(method)?;
    }
    if let Some(tz) = &args.timezone {
        store.set_timezone(tz)?;
    }

    store.save().await.context("Failed to save report settings")?;
    print_report_preferences(&store.snapshot());
    Ok(())
}

fn print_report_preferences(prefs: &ReportPreferences) {
    let methods: Vec<&str> = prefs
        .delivery_method
        .iter()
        .map(|m| match m {
            DeliveryMethod::Email => "email",
            DeliveryMethod::InApp => "in_app",
        })
        .collect();
    println!("Delivery time: {}", prefs.delivery_time);
    println!("Schedule:      {} ({})", prefs.schedule_time, prefs.timezone);
    println!("Email:         {}", on_off(prefs.email_enabled));
    println!("PDF:           {}", on_off(prefs.pdf_enabled));
    println!("Methods:       {}", methods.join(", "));
    if let Some(email) = &prefs.email {
        println!("Address:       {}", display_line(email, CELL_WIDTH));
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

async fn run_reports(ctx: &Session, cmd: ReportsCommand) -> Result<()> {
    let actions = ctx.reports();

    match cmd {
        ReportsCommand::List => {
            let reports = actions.list().await.context("Failed to list reports")?;
            if reports.is_empty() {
                println!("No reports yet");
            }
            for report in reports {
                println!(
                    "{:>6}  {:<10}  {:<4}  {}",
                    report.id,
                    display_line(report.date.as_deref().unwrap_or("-"), 10),
                    report.format,
                    display_line(report.label(), CELL_WIDTH)
                );
            }
        }
        ReportsCommand::Generate => {
            actions
                .generate()
                .await
                .context("Failed to request a report")?;
        }
        ReportsCommand::Download { id, dir, open } => {
            let settings = report_settings(ctx).await?;
            if !settings.pdf_enabled {
                anyhow::bail!("PDF reports are disabled in report settings");
            }
            let dir = dir.unwrap_or_else(|| ctx.config.download_dir());
            let path = actions
                .download(id, &dir)
                .await
                .with_context(|| format!("Failed to download report {id}"))?;
            println!("{}", path.display());
            if open {
                if let Err(e) = open::that(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to open report");
                    eprintln!("Could not open {}: {e}", path.display());
                }
            }
        }
        ReportsCommand::Email { id } => {
            let settings = report_settings(ctx).await?;
            if !settings.email_enabled {
                anyhow::bail!("Email delivery is disabled in report settings");
            }
            actions
                .email_report(id)
                .await
                .with_context(|| format!("Failed to email report {id}"))?;
        }
    }
    Ok(())
}

async fn report_settings(ctx: &Session) -> Result<ReportPreferences> {
    let store = ctx.store::<ReportPreferences>();
    store.load().await.context("Failed to load report settings")?;
    Ok(store.snapshot())
}

async fn run_sources(ctx: &Session, cmd: SourcesCommand) -> Result<()> {
    let mut browser = SourceBrowser::new(ctx.gateway.clone(), ctx.sink.clone());

    match cmd {
        SourcesCommand::List { category: None } => {
            browser
                .load_categories()
                .await
                .context("Failed to load categories")?;
            for category in browser.categories() {
                println!(
                    "{:>4}  {}",
                    category.id,
                    display_line(&category.name, CELL_WIDTH)
                );
            }
        }
        SourcesCommand::List {
            category: Some(id),
        } => {
            browser
                .select(id)
                .await
                .with_context(|| format!("Failed to load sources for category {id}"))?;
            println!("Preset:");
            for source in browser.preset_sources() {
                print_source(&source.name, &source.url);
            }
            println!("Custom:");
            for source in browser.custom_sources() {
                print_source(&source.name, &source.url);
            }
        }
        SourcesCommand::Add { category, name, url } => {
            browser
                .select(category)
                .await
                .with_context(|| format!("Failed to load sources for category {category}"))?;
            browser
                .add_custom(&name, &url)
                .await
                .context("Failed to add source")?;
        }
    }
    Ok(())
}

fn print_source(name: &str, url: &str) {
    println!(
        "  {}  {}",
        display_line(name, CELL_WIDTH / 2),
        display_line(url, CELL_WIDTH)
    );
}
