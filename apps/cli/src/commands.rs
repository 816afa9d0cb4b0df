//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use courselens_core::render::{GPA_BADGE_CLASS, RATING_BADGE_CLASS};
use courselens_core::{Enricher, TitlePhase};
use courselens_gateway::Gateway;
use courselens_page::{NodeId, Page, SharedPage};
use courselens_shared::{
    AppConfig, GatewayConfig, PageContract, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Built-in demo catalog, used when `enrich` is run without `--page`.
const SAMPLE_PAGE: &str = include_str!("../../../fixtures/html/catalog.html");

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseLens — grade and rating data for course catalog pages.
#[derive(Parser)]
#[command(
    name = "courselens",
    version,
    about = "Annotate course catalog pages with GPAs, instructor ratings, and grade charts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Course-data service to query (overrides the config file).
    #[arg(long, global = true, env = "COURSELENS_HOST")]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the enrichment pipeline over a catalog page and print a summary.
    Enrich {
        /// Catalog HTML file to enrich (defaults to a built-in demo page).
        #[arg(short, long)]
        page: Option<PathBuf>,

        /// Print the enriched page HTML after the run.
        #[arg(long)]
        show_html: bool,
    },

    /// Look up the average GPA for one course.
    Gpa {
        /// Course id, e.g. CMSC131.
        course: String,
    },

    /// Look up the average rating for one instructor.
    Rating {
        /// Instructor name as it appears in the catalog.
        professor: String,
    },

    /// Print a grade distribution as a table.
    Grades {
        /// Course id to fetch the distribution for.
        #[arg(long, conflicts_with = "professor", required_unless_present = "professor")]
        course: Option<String>,

        /// Instructor name to aggregate across their sections.
        #[arg(long, required_unless_present = "course")]
        professor: Option<String>,
    },

    /// Fetch an instructor's review payload and print it as JSON.
    Reviews {
        /// Instructor name as it appears in the catalog.
        professor: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "courselens=info",
        1 => "courselens=debug",
        _ => "courselens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let host = cli.host.as_deref();
    match &cli.command {
        Command::Enrich { page, show_html } => {
            cmd_enrich(page.as_deref(), host, *show_html).await
        }
        Command::Gpa { course } => cmd_gpa(course, host).await,
        Command::Rating { professor } => cmd_rating(professor, host).await,
        Command::Grades { course, professor } => {
            cmd_grades(course.as_deref(), professor.as_deref(), host).await
        }
        Command::Reviews { professor } => cmd_reviews(professor, host).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Resolve runtime config: file values with the `--host` override applied.
fn runtime_config(host: Option<&str>) -> Result<(GatewayConfig, PageContract)> {
    let config = load_config()?;
    let mut gateway = GatewayConfig::from(&config);
    if let Some(host) = host {
        gateway.base_url = host.to_string();
    }
    Ok((gateway, PageContract::from(&config)))
}

// ---------------------------------------------------------------------------
// Enrichment demo
// ---------------------------------------------------------------------------

async fn cmd_enrich(page_path: Option<&Path>, host: Option<&str>, show_html: bool) -> Result<()> {
    let (gateway_config, contract) = runtime_config(host)?;
    let gateway = Gateway::new(&gateway_config)?;

    let html = match page_path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read page '{}': {e}", path.display()))?,
        None => SAMPLE_PAGE.to_string(),
    };

    info!(
        host = %gateway_config.base_url,
        page = %page_path.map_or("<built-in demo>".into(), |p| p.display().to_string()),
        "enriching catalog page"
    );

    let page = SharedPage::new(Page::from_document(&html));
    let enricher = Enricher::new(page, gateway, contract.clone());

    let spinner = lookup_spinner("Scanning catalog".to_string());

    // Load pass: GPA placeholder and badge for every course on the page.
    enricher.enrich_on_load();

    // Expansion pass: watch the catalog container, then stand in for the
    // user by expanding every course into its section rows.
    let expanded = match enricher.observe_sections() {
        Some(mut batches) => {
            spinner.set_message("Expanding sections");
            let expanded = expand_all_courses(enricher.page(), &contract);
            while let Ok(records) = batches.try_recv() {
                enricher.process_batch(&records);
            }
            expanded
        }
        None => 0,
    };

    spinner.set_message("Fetching course data");
    enricher.quiesce().await;
    spinner.finish_and_clear();

    let session = enricher.session();
    let (gpa_badges, rating_badges) = enricher.page().with(|page| {
        let root = page.root();
        (
            page.elements_with_class(root, GPA_BADGE_CLASS).len(),
            page.elements_with_class(root, RATING_BADGE_CLASS).len(),
        )
    });

    println!();
    println!("  Catalog enriched!");
    println!("  Host:          {}", gateway_config.base_url);
    println!("  Courses:       {}", session.len());
    println!("  Expanded:      {expanded}");
    println!("  GPA badges:    {gpa_badges}");
    println!("  Rating badges: {rating_badges}");
    println!();
    for state in &session {
        println!(
            "    {:<12} gpa: {:<12} batches: {}  ratings: {}/{}",
            state.record.id,
            phase_label(state.title_phase),
            state.batches_seen,
            state.ratings_resolved,
            state.ratings_issued,
        );
    }
    println!();

    if show_html {
        let html = enricher.page().with(|page| page.outer_html(page.root()));
        println!("{html}");
    }

    Ok(())
}

fn phase_label(phase: TitlePhase) -> &'static str {
    match phase {
        TitlePhase::Discovered => "discovered",
        TitlePhase::Pending => "pending",
        TitlePhase::Complete => "complete",
        TitlePhase::Skipped => "skipped",
    }
}

/// Stand in for the user expanding every course: synthesize a block of
/// section rows from each course's `data-instructors` attribute (names
/// separated by `|`) and insert it, the way the live page does on click.
fn expand_all_courses(page: &SharedPage, contract: &PageContract) -> usize {
    page.with(|page| {
        let courses: Vec<(NodeId, String)> = page
            .elements_with_class(page.root(), &contract.course)
            .into_iter()
            .filter_map(|course| {
                page.attr(course, "data-instructors")
                    .map(|names| (course, names.to_string()))
            })
            .collect();

        for (course, names) in &courses {
            page.insert_fragment(*course, &sections_fragment(names, contract));
        }
        page.flush_mutations();
        courses.len()
    })
}

fn sections_fragment(instructors: &str, contract: &PageContract) -> String {
    let rows: String = instructors
        .split('|')
        .map(|name| {
            format!(
                r#"<div class="{row}"><div class="{anchor}"><span class="{instructor}">{name}</span></div></div>"#,
                row = contract.section_row,
                anchor = contract.instructor_anchor,
                instructor = contract.instructor,
                name = name.trim(),
            )
        })
        .collect();
    format!(
        r#"<div class="{container}"><div class="{info}">{rows}</div></div>"#,
        container = contract.sections_container,
        info = contract.section_info,
    )
}

// ---------------------------------------------------------------------------
// One-shot lookups
// ---------------------------------------------------------------------------

async fn cmd_gpa(course: &str, host: Option<&str>) -> Result<()> {
    let (gateway_config, _) = runtime_config(host)?;
    let gateway = Gateway::new(&gateway_config)?;

    let spinner = lookup_spinner(format!("Fetching grades for {course}"));
    let gpa = gateway.course_gpa(course).await;
    spinner.finish_and_clear();

    println!("{course}: Avg GPA: {gpa}");
    Ok(())
}

async fn cmd_rating(professor: &str, host: Option<&str>) -> Result<()> {
    let (gateway_config, _) = runtime_config(host)?;
    let gateway = Gateway::new(&gateway_config)?;

    let spinner = lookup_spinner(format!("Fetching ratings for {professor}"));
    let rating = gateway.instructor_rating(professor).await;
    spinner.finish_and_clear();

    if rating.is_no_data() {
        println!("{professor}: Rating: None");
    } else {
        println!("{professor}: Rating: {rating}/5");
    }
    Ok(())
}

/// Widest bar in the `grades` table, in characters.
const BAR_WIDTH: usize = 40;

async fn cmd_grades(
    course: Option<&str>,
    professor: Option<&str>,
    host: Option<&str>,
) -> Result<()> {
    let (gateway_config, _) = runtime_config(host)?;
    let gateway = Gateway::new(&gateway_config)?;

    let (subject, payload) = match (course, professor) {
        (Some(course), None) => {
            let spinner = lookup_spinner(format!("Fetching grades for {course}"));
            let payload = gateway.course_distribution(course).await;
            spinner.finish_and_clear();
            (course, payload)
        }
        (None, Some(name)) => {
            let spinner = lookup_spinner(format!("Fetching grades for {name}"));
            let payload = gateway.instructor_distribution(name).await;
            spinner.finish_and_clear();
            (name, payload)
        }
        _ => return Err(eyre!("pass exactly one of --course or --professor")),
    };

    let Some(payload) = payload else {
        return Err(eyre!("no grade data available for '{subject}'"));
    };

    println!();
    println!("  {subject}");
    println!(
        "  Total grades: {}   Avg GPA: {}",
        payload.total_grades(),
        payload.gpa_metric()
    );
    println!();

    let max = payload.counts.values().copied().max().unwrap_or(0) as usize;
    for (label, count) in &payload.counts {
        let width = if max == 0 {
            0
        } else {
            (*count as usize * BAR_WIDTH).div_ceil(max)
        };
        println!("  {label:<3} {count:>6}  {}", "█".repeat(width));
    }
    println!();

    Ok(())
}

async fn cmd_reviews(professor: &str, host: Option<&str>) -> Result<()> {
    let (gateway_config, _) = runtime_config(host)?;
    let gateway = Gateway::new(&gateway_config)?;

    let spinner = lookup_spinner(format!("Fetching reviews for {professor}"));
    let reviews = gateway.instructor_reviews(professor).await;
    spinner.finish_and_clear();

    match reviews {
        Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
        None => return Err(eyre!("no reviews available for '{professor}'")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Spinner
// ---------------------------------------------------------------------------

/// Steady-tick spinner shown while a lookup is in flight.
fn lookup_spinner(msg: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner.set_message(msg);
    spinner
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
