//! Fishmap - county choropleth of fishery exchange values
//!
//! A CLI tool that joins a tabular dataset of fishery exchange values
//! onto county boundaries, filters and aggregates it, and classifies
//! each county into quantile color classes for rendering.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable source, bad config, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod geo;
mod ingest;
mod models;
mod report;
mod session;
mod source;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use models::{FacetDomains, FilterSelection};
use session::{MapView, Session, SessionView};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Fishmap v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {}", config_source);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Map generation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .fishmap.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_CONFIG_FILE
    );
    println!("   Edit it to set source paths, county aliases and colors.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete map workflow. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let dataset = config.dataset(args.dataset).clone();
    let geometry_path = PathBuf::from(&config.geometry.path);
    let data_path = PathBuf::from(&dataset.path);

    let mut session = Session::new(
        args.dataset,
        config.aliases(args.dataset),
        config.join_options(),
    );

    // Step 1: Load both sources; the session stays loading until both arrive
    println!("📥 Loading {} ({})", dataset.label, args.dataset);
    println!("   Geometry: {}", geometry_path.display());
    println!("   Data:     {}", data_path.display());

    let loaded = source::load_sources(geometry_path, data_path, &dataset.label, args.quiet)
        .await
        .context("Failed to load map sources")?;

    if loaded.geometry.is_empty() {
        warn!("Geometry source has no features; the map will be empty");
    }

    session.set_geometry(loaded.geometry);
    let dropped = session.load_rows(&loaded.rows);
    if dropped > 0 {
        println!("   ⚠️  Dropped {} rows with an invalid year", dropped);
    }

    // Handle --facets: list options and exit
    if args.facets {
        return handle_facets(&mut session, &config).await;
    }

    // Step 2: Apply the selection
    session.set_selection(args.selection());
    session.set_spotlight(args.spotlight.clone());

    if let Some(facets) = session.facets() {
        warn_unknown_selection(session.selection(), facets);
    }

    // Step 3: Run the pipeline
    if session.selection().is_any() {
        println!("\n🔬 Aggregating all records...");
    } else {
        println!("\n🔬 Aggregating [{}]...", session.selection());
    }
    let view = match session.view() {
        SessionView::Ready(view) => view,
        SessionView::Loading => anyhow::bail!("Sources were loaded but the session is not ready"),
    };

    // Step 4: Generate and save the output
    let palette = config.palette();
    let county_property = &config.geometry.county_property;
    let output_path = PathBuf::from(&config.general.output);

    let metadata = report::ReportMetadata {
        dataset: dataset.label.clone(),
        geometry_path: config.geometry.path.clone(),
        data_path: dataset.path.clone(),
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let summary = report::build_report(&view, metadata, &palette, county_property);

    let output = match config.general.format {
        OutputFormat::Geojson => report::generate_geojson(&view, &palette, county_property)?,
        OutputFormat::Json => report::generate_json_report(&summary)?,
        OutputFormat::Markdown => report::generate_markdown_report(&summary),
    };

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write output to {}", output_path.display()))?;

    print_summary(&view, &summary);
    println!(
        "\n✅ Map complete! {:?} output saved to: {}",
        config.general.format,
        output_path.display()
    );

    Ok(0)
}

/// Handle --facets: print every filter option of both datasets, exit.
///
/// The loaded dataset is listed first; the session then toggles to the
/// other dataset, which is skipped if its source cannot be read.
async fn handle_facets(session: &mut Session, config: &Config) -> Result<i32> {
    print_facets(session, &config.dataset(session.mode()).label);

    let other = session.mode().other();
    let dataset = config.dataset(other);
    session.switch_dataset(other, config.aliases(other));

    match source::load_rows(PathBuf::from(&dataset.path)).await {
        Ok(rows) => {
            session.load_rows(&rows);
            print_facets(session, &dataset.label);
        }
        Err(e) => {
            warn!("Skipping {}: {}", dataset.label, e);
            println!("\n🔍 {} is not available ({})", dataset.label, e);
        }
    }

    println!("\n✅ Done. No output was written.");
    Ok(0)
}

fn print_facets(session: &Session, label: &str) {
    println!("\n🔍 Filter options for {}:\n", label);

    match session.facets() {
        Some(facets) => print!("{}", report::format_facets(facets)),
        None => println!("   No records loaded."),
    }
}

/// Warn about selections that can never match.
fn warn_unknown_selection(selection: &FilterSelection, facets: &FacetDomains) {
    if let Some(year) = selection.year {
        if !facets.years.contains(&year) {
            warn!("Year {} does not occur in the dataset; every county will be 0", year);
        }
    }

    let checks = [
        ("County", &selection.county, &facets.counties),
        ("Species group", &selection.species_group, &facets.species_groups),
        ("Ecosystem type", &selection.ecosystem_type, &facets.ecosystem_types),
    ];
    for (name, selected, domain) in checks {
        if let Some(value) = selected {
            if !domain.contains(value) {
                warn!("{} '{}' does not occur in the dataset", name, value);
            }
        }
    }
}

/// Print the terminal summary.
fn print_summary(view: &MapView, summary: &report::MapReport) {
    let [q1, q2, q3, q4] = view.breakpoints.as_array();

    println!("\n📊 Map Summary:");
    println!("   Dataset: {}", view.mode);
    println!(
        "   Records: {} matched of {}",
        summary.stats.matched, summary.stats.records
    );
    println!(
        "   Counties: {} features, {} with value",
        summary.stats.features,
        view.aggregates.len()
    );
    println!("   Total value: {:.2}", summary.stats.total_value);
    println!(
        "   Breakpoints: {:.2} | {:.2} | {:.2} | {:.2}",
        q1, q2, q3, q4
    );
    if let Some(ref county) = view.spotlight {
        println!("   Spotlight: {}", county);
    }
    if !summary.unmatched_counties.is_empty() {
        println!(
            "   ⚠️  No boundary for: {}",
            summary.unmatched_counties.join(", ")
        );
    }
}

/// Load configuration from file or use defaults.
///
/// Returns the config and where it came from. A config file that exists
/// but is invalid is an error, whether given explicitly or found in the
/// working directory.
fn load_config(args: &Args) -> Result<(Config, String)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Ok((Config::load(config_path)?, config_path.display().to_string()));
    }

    // Try default location
    match Config::load_default()? {
        Some(loaded) => Ok((loaded, config::DEFAULT_CONFIG_FILE.to_string())),
        None => Ok((Config::default(), "built-in defaults".to_string())),
    }
}
