use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use roster_link::{
    get_season_stats, get_runs, insert_run, join_salaries, open_database, verify_count,
    write_joined, write_resolutions, ContestPolicy, LinkageConfig, LinkageEngine, LinkageInputs,
    MarginRule, OutcomeCategory, SimilarityMetric,
};

const DEFAULT_DB: &str = "roster_link.db";

#[derive(Debug, Parser)]
#[command(name = "roster-link")]
#[command(version, about = "Link salary rows to stable player ids")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the three CSV sources, link salaries, write results
    Resolve(ResolveArgs),

    /// Print stored runs and per-season statistics
    Report {
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },

    /// Browse stored resolutions in the terminal
    Ui {
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ResolveArgs {
    /// Player Season Info CSV
    #[arg(long)]
    season_info: PathBuf,

    /// Player Career Info CSV
    #[arg(long)]
    career_info: PathBuf,

    /// Salary CSV
    #[arg(long)]
    salaries: PathBuf,

    /// Resolutions CSV output
    #[arg(long, default_value = "resolutions.csv")]
    out: PathBuf,

    /// Also write player seasons joined with salaries
    #[arg(long)]
    joined: Option<PathBuf>,

    /// Store the run in this SQLite database
    #[arg(long)]
    db: Option<PathBuf>,

    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    cutoff_season: Option<i32>,

    #[arg(long)]
    fuzzy_threshold: Option<f64>,

    /// Fixed margin instead of the standard-deviation rule
    #[arg(long, conflicts_with = "sample_std_dev")]
    fixed_margin: Option<f64>,

    /// Use the sample standard deviation as the margin
    #[arg(long)]
    sample_std_dev: bool,

    #[arg(long, value_enum)]
    similarity: Option<SimilarityMetric>,

    #[arg(long, value_enum)]
    contest_policy: Option<ContestPolicy>,
}

impl ResolveArgs {
    fn config(&self) -> Result<LinkageConfig> {
        let mut config = match &self.config {
            Some(path) => LinkageConfig::from_file(path)?,
            None => LinkageConfig::default(),
        };

        if let Some(season) = self.cutoff_season {
            config = config.with_cutoff_season(season);
        }
        if let Some(threshold) = self.fuzzy_threshold {
            config = config.with_fuzzy_threshold(threshold);
        }
        if let Some(min_margin) = self.fixed_margin {
            config = config.with_margin_rule(MarginRule::Fixed { min_margin });
        } else if self.sample_std_dev {
            config = config.with_margin_rule(MarginRule::SampleStdDev);
        }
        if let Some(metric) = self.similarity {
            config = config.with_similarity(metric);
        }
        if let Some(policy) = self.contest_policy {
            config = config.with_contest_policy(policy);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    roster_link::logging::init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Ui { db: PathBuf::from(DEFAULT_DB) }) {
        Commands::Resolve(args) => run_resolve(&args),
        Commands::Report { db } => run_report(&db),
        Commands::Ui { db } => run_ui_mode(&db),
    }
}

fn run_resolve(args: &ResolveArgs) -> Result<()> {
    println!("🏀 Roster Link - Salary → Player ID");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = args.config()?;

    // 1. Load CSVs
    println!("\n📂 Loading CSV sources...");
    let inputs = LinkageInputs::load(&args.season_info, &args.career_info, &args.salaries)?;
    println!("✓ {} player-season rows", inputs.identities.len());
    println!("✓ {} career spans", inputs.spans.len());
    println!("✓ {} salary rows", inputs.salaries.len());

    // 2. Link
    println!("\n🔗 Linking (cutoff {}, threshold {})...", config.cutoff_season, config.fuzzy_threshold);
    let report = LinkageEngine::new(config.clone()).resolve(&inputs);
    println!("✓ {}", report.summary());

    // 3. Write outputs
    println!("\n💾 Writing outputs...");
    let written = write_resolutions(&args.out, &report.resolutions)?;
    println!("✓ {} resolutions → {}", written, args.out.display());

    if let Some(path) = &args.joined {
        let joined = join_salaries(&inputs.identities, &report.resolved_records());
        let written = write_joined(path, &joined)?;
        println!("✓ {} player seasons with salary → {}", written, path.display());
    }

    // 4. Store
    if let Some(path) = &args.db {
        println!("\n🗄️  Storing run...");
        let conn = open_database(path)?;
        let summary = insert_run(&conn, &report, &config)?;
        println!("✓ Run {}", summary.run_id);
        println!("✓ Inserted: {} resolutions", summary.inserted);
        println!("✓ Updated: {} resolutions with a changed outcome", summary.updated);
        println!("✓ Unchanged duplicates: {}", summary.duplicates);
        println!("✓ Database contains {} resolutions", verify_count(&conn)?);
    }

    // 5. Unresolved names worth a look
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for category in [OutcomeCategory::Ambiguous, OutcomeCategory::LowConfidence] {
        let names = report.names_in(category);
        if !names.is_empty() {
            println!("⚠️  {} {} names, e.g. {}", names.len(), category.as_str(), names.iter().take(5).cloned().collect::<Vec<_>>().join(", "));
        }
    }
    println!("✅ {:.1}% of salary rows linked", report.resolution_rate() * 100.0);

    Ok(())
}

fn run_report(db: &Path) -> Result<()> {
    if !db.exists() {
        anyhow::bail!("Database not found at {}. Run `roster-link resolve --db ...` first.", db.display());
    }
    let conn = open_database(db).with_context(|| format!("Failed to open {}", db.display()))?;

    println!("📊 Stored runs");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for run in get_runs(&conn)? {
        println!(
            "  {}  {}  {} records, {} resolved",
            run.resolved_at.format("%Y-%m-%d %H:%M"),
            run.run_id,
            run.counts.total(),
            run.counts.resolved()
        );
    }

    println!("\n📅 By season");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  {:>6} {:>8} {:>8} {:>7} {:>9} {:>8}", "season", "records", "resolved", "rate", "ambiguous", "low conf");
    for stat in get_season_stats(&conn)? {
        println!(
            "  {:>6} {:>8} {:>8} {:>6.1}% {:>9} {:>8}",
            stat.season,
            stat.records,
            stat.resolved,
            stat.resolution_rate() * 100.0,
            stat.ambiguous,
            stat.low_confidence
        );
    }

    println!("\n✓ Database contains {} resolutions", verify_count(&conn)?);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(db: &Path) -> Result<()> {
    use roster_link::{get_all_resolutions, ui};

    println!("🖥️  Loading Roster Link UI...\n");

    if !db.exists() {
        eprintln!("❌ Database not found!");
        eprintln!("   Run: roster-link resolve ... --db {}", db.display());
        eprintln!("   to store a run first.");
        std::process::exit(1);
    }

    let conn = open_database(db)?;

    println!("📊 Loading resolutions...");
    let resolutions = get_all_resolutions(&conn)?;
    let total_count = verify_count(&conn)?;

    println!("✓ Loaded {} resolutions\n", resolutions.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(resolutions, total_count);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_db: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin roster-link-server --features server");
    std::process::exit(1);
}
