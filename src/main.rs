use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_sieve::{
    config::{Config, PipelineOptions},
    database::{Database, PersistentStore},
    models::{CountryCode, OutputFormat, SaveFavoriteRequest, Settings, TestMode},
    playlist::CountryClassifier,
    services::{
        BatchOrchestrator, LinkTester, LocalOutputDirectory, ManualSession, ProgressEvent,
        ProgressReporter,
    },
    utils::{HttpProbe, StandardHttpClient},
};

#[derive(Parser)]
#[command(name = "m3u-sieve")]
#[command(version)]
#[command(about = "Test IPTV playlist links and export channels filtered by country")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "m3u-sieve.toml")]
    config: String,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Output directory (overrides config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct RunOverrides {
    /// Test mode (quick, deep); defaults to the stored setting
    #[arg(long)]
    mode: Option<TestMode>,

    /// Output format (m3u, m3u8, txt); defaults to the stored setting
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Drop channels with repeated stream URLs
    #[arg(long)]
    dedupe: bool,

    /// Per-link test timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Test links, then export the selected countries of every working one
    Auto {
        /// Playlist links
        #[arg(required = true)]
        links: Vec<String>,

        /// Countries to keep, comma separated (e.g. turkey,germany)
        #[arg(long, value_delimiter = ',', required = true)]
        countries: Vec<CountryCode>,

        /// Links tested at the same time (overrides config file)
        #[arg(long)]
        concurrency: Option<usize>,

        #[command(flatten)]
        overrides: RunOverrides,
    },
    /// Load one playlist and export the chosen groups
    Manual {
        url: String,

        /// Group labels to export
        #[arg(short, long)]
        group: Vec<String>,

        /// Export every group
        #[arg(long, conflicts_with = "group")]
        all: bool,

        /// Only list the groups
        #[arg(long)]
        list: bool,

        #[command(flatten)]
        overrides: RunOverrides,
    },
    /// Test links without exporting anything
    Test {
        #[arg(required = true)]
        links: Vec<String>,

        #[command(flatten)]
        overrides: RunOverrides,
    },
    /// Manage favorite playlist links
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Show usage statistics
    Stats {
        /// Number of recent days to show
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Show or change stored settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    List,
    /// Load a playlist and save it as a favorite
    Add {
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
    Remove {
        url: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set { key: String, value: String },
}

struct App {
    config: Config,
    store: PersistentStore,
    settings: Settings,
    probe: Arc<dyn HttpProbe>,
    classifier: Arc<CountryClassifier>,
}

impl App {
    fn options(&self, overrides: &RunOverrides) -> PipelineOptions {
        let mut settings = self.settings.clone();
        if let Some(mode) = overrides.mode {
            settings.test_mode = mode;
        }
        if let Some(format) = overrides.format {
            settings.format = format;
        }
        if let Some(timeout) = overrides.timeout {
            settings.timeout_seconds = timeout;
        }
        settings.dedupe |= overrides.dedupe;
        PipelineOptions::from_parts(&self.config, &settings)
    }

    fn tester(&self) -> Arc<LinkTester> {
        Arc::new(LinkTester::new(
            self.probe.clone(),
            self.config.tester.clone(),
            self.config.http.fetch_timeout,
        ))
    }

    fn sink(&self) -> Arc<LocalOutputDirectory> {
        Arc::new(LocalOutputDirectory::new(&self.config.output.directory))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("m3u_sieve={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting m3u-sieve v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    if let Some(output) = cli.output {
        config.output.directory = output.into();
    }

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    let store = PersistentStore::new(&database);
    let settings = store
        .load_settings()
        .await
        .context("Failed to load stored settings")?;

    let probe: Arc<dyn HttpProbe> = Arc::new(StandardHttpClient::new(
        config.http.connect_timeout,
        config.http.max_redirects,
    )?);

    let app = App {
        config,
        store,
        settings,
        probe,
        classifier: Arc::new(CountryClassifier::new()),
    };

    match cli.command {
        Command::Auto {
            links,
            countries,
            concurrency,
            overrides,
        } => run_auto(&app, links, countries, concurrency, &overrides).await,
        Command::Manual {
            url,
            group,
            all,
            list,
            overrides,
        } => run_manual(&app, &url, group, all, list, &overrides).await,
        Command::Test { links, overrides } => run_test(&app, &links, &overrides).await,
        Command::Favorites { action } => run_favorites(&app, action).await,
        Command::Stats { days } => run_stats(&app, days).await,
        Command::Settings { action } => run_settings(&app, action).await,
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current link");
            token.cancel();
        }
    });
    cancel
}

/// Print progress events until every reporter is dropped
fn print_progress(
    mut receiver: tokio::sync::mpsc::UnboundedReceiver<ProgressEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            match event {
                ProgressEvent::LinkTested {
                    index,
                    total,
                    url,
                    result,
                    ..
                } => {
                    let mark = if result.success { "OK  " } else { "FAIL" };
                    println!("[{}/{}] {} {} ({})", index + 1, total, mark, url, result.detail);
                }
                ProgressEvent::Processing { label, percent, .. } => {
                    println!("[{percent:>5.1}%] Processing {label}");
                }
                ProgressEvent::FileWritten { filename, channels } => {
                    println!("Wrote {filename} ({channels} channels)");
                }
                ProgressEvent::Log(line) => println!("{line}"),
                ProgressEvent::Phase(_) | ProgressEvent::Completed { .. } => {}
            }
        }
    })
}

async fn run_auto(
    app: &App,
    links: Vec<String>,
    countries: Vec<CountryCode>,
    concurrency: Option<usize>,
    overrides: &RunOverrides,
) -> Result<()> {
    let mut options = app.options(overrides);
    if let Some(concurrency) = concurrency {
        options.test_concurrency = concurrency.max(1);
    }
    let countries: HashSet<CountryCode> = countries.into_iter().collect();

    let (progress, receiver) = ProgressReporter::channel();
    let printer = print_progress(receiver);

    let sink = app.sink();
    info!("Writing output files to {}", sink.root().display());
    let mut batch = BatchOrchestrator::new(app.probe.clone(), app.tester(), sink, options)
        .with_store(app.store.clone())
        .with_classifier(app.classifier.clone())
        .with_progress(progress);

    let report = batch.run(&links, &countries, &cancel_on_ctrl_c()).await?;
    drop(batch);
    let _ = printer.await;

    if report.tests.cancelled {
        println!("Cancelled during testing; no files were written");
        return Ok(());
    }
    if report.tests.working_count() == 0 {
        println!(
            "No working links among the {} tested; nothing to export",
            report.tests.outcomes.len()
        );
        return Ok(());
    }
    if report.processing_cancelled {
        println!("Cancelled during processing; files written so far are kept");
    }
    println!(
        "{} of {} links working; {} channels seen, {} written to {} files",
        report.tests.working_count(),
        report.tests.outcomes.len(),
        report.channels_seen,
        report.channels_written,
        report.files_written()
    );
    for file in &report.files {
        match (&file.path, &file.error) {
            (Some(path), _) => println!(
                "  {} [{} channels, expires {}]",
                path.display(),
                file.channels,
                file.expiry
            ),
            (None, Some(error)) => println!("  {} failed: {}", file.filename, error),
            (None, None) => {}
        }
    }
    Ok(())
}

async fn run_manual(
    app: &App,
    url: &str,
    groups: Vec<String>,
    all: bool,
    list: bool,
    overrides: &RunOverrides,
) -> Result<()> {
    let options = app.options(overrides);
    let mut session = ManualSession::load(
        app.probe.as_ref(),
        &app.classifier,
        url,
        options.fetch_timeout,
        options.dedupe,
    )
    .await?;

    println!(
        "{} channels in {} groups, expires {}",
        session.playlist().channel_count(),
        session.playlist().groups.len(),
        session.playlist().expiry
    );
    if list || (groups.is_empty() && !all) {
        for group in session.groups_sorted() {
            println!(
                "  {} {} ({} channels, {})",
                group.country.flag(),
                group.name,
                group.len(),
                group.country.display_name()
            );
        }
        return Ok(());
    }

    if all {
        session.select_all();
    }
    for group in &groups {
        session.select(group)?;
    }

    let entry = session
        .export(options.format, app.sink().as_ref(), Some(&app.store))
        .await?;
    if let Some(path) = entry.path {
        println!("Wrote {} channels to {}", entry.channels, path.display());
    }
    Ok(())
}

async fn run_test(app: &App, links: &[String], overrides: &RunOverrides) -> Result<()> {
    let options = app.options(overrides);
    let (progress, receiver) = ProgressReporter::channel();
    let printer = print_progress(receiver);

    let mut batch = BatchOrchestrator::new(app.probe.clone(), app.tester(), app.sink(), options)
        .with_store(app.store.clone())
        .with_progress(progress);
    let report = batch.run_tests(links, &cancel_on_ctrl_c()).await?;
    drop(batch);
    let _ = printer.await;

    println!(
        "{} of {} links working",
        report.working_count(),
        report.outcomes.len()
    );
    Ok(())
}

async fn run_favorites(app: &App, action: FavoriteAction) -> Result<()> {
    match action {
        FavoriteAction::List => {
            for favorite in app.store.list_favorites().await? {
                println!(
                    "{} | {} | {} channels | expires {}",
                    favorite.name, favorite.url, favorite.channel_count, favorite.expiry
                );
            }
        }
        FavoriteAction::Add { url, name } => {
            let session = ManualSession::load(
                app.probe.as_ref(),
                &app.classifier,
                &url,
                app.config.http.fetch_timeout,
                false,
            )
            .await?;
            let name = name.unwrap_or_else(|| m3u_sieve::utils::UrlUtils::short_domain(&url));
            let favorite = app
                .store
                .upsert_favorite(SaveFavoriteRequest {
                    url,
                    name,
                    expiry: session.playlist().expiry.to_string(),
                    channel_count: session.playlist().channel_count() as i64,
                })
                .await?;
            println!("Saved favorite '{}'", favorite.name);
        }
        FavoriteAction::Remove { url } => {
            app.store.delete_favorite(&url).await?;
            println!("Removed favorite {url}");
        }
    }
    Ok(())
}

async fn run_stats(app: &App, days: u32) -> Result<()> {
    for stat in app.store.recent_usage(days).await? {
        println!(
            "{}: {} tested, {} working, {} channels, {} files",
            stat.date, stat.tested, stat.working, stat.channels, stat.files
        );
    }
    let totals = app.store.usage_totals().await?;
    println!(
        "Total: {} tested, {} working, {} channels, {} files",
        totals.tested, totals.working, totals.channels, totals.files
    );
    Ok(())
}

async fn run_settings(app: &App, action: Option<SettingsAction>) -> Result<()> {
    match action.unwrap_or(SettingsAction::Show) {
        SettingsAction::Show => {
            for (key, value) in app.settings.to_pairs() {
                println!("{key} = {value}");
            }
        }
        SettingsAction::Set { key, value } => {
            if !app.settings.to_pairs().iter().any(|(known, _)| *known == key) {
                anyhow::bail!("Unknown setting: {}", key);
            }
            app.store.set(&key, &value).await?;
            // Reject values that would make the stored settings unreadable
            if let Err(e) = app.store.load_settings().await {
                app.store
                    .save_settings(&app.settings)
                    .await
                    .context("Failed to restore settings")?;
                anyhow::bail!("Invalid value for {}: {}", key, e);
            }
            println!("{key} = {value}");
        }
    }
    Ok(())
}
