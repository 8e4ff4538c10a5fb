use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use polars::prelude::DataFrame;
use tracing::info;

use carbon_policy_kit::analytics::correlation::{self, Aggregate};
use carbon_policy_kit::analytics::forecast::ForecastInput;
use carbon_policy_kit::analytics::{energy, ranking, trend, StatOutcome};
use carbon_policy_kit::config::Config;
use carbon_policy_kit::graph::{self, PolicyGraph};
use carbon_policy_kit::node::{NodeBuilder, PolicyRecord};
use carbon_policy_kit::schema::long;
use carbon_policy_kit::store::{NodeFilter, NodeStore};
use carbon_policy_kit::vectorizer::{self, Vectorizer};
use carbon_policy_kit::{classify, frames, logging, ActivityCatalog, CountryFactors};

/// Policy impact estimation and climate-data analytics.
#[derive(Parser, Debug)]
#[command(name = "carbon-policy")]
#[command(version)]
#[command(about = "Estimate policy emission impacts and explore climate datasets.", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, default_value = "carbon-policy.toml")]
    config: PathBuf,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format: pretty or json
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Match a policy description against the activity catalog
    Classify {
        text: String,
    },

    /// Build a policy node and append it to the node store
    AddNode {
        /// Free-text policy description
        text: String,

        #[arg(long)]
        country: String,

        /// Budget amount or number of units, depending on the activity
        #[arg(long)]
        input: f64,

        /// Policy date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Graph the node belongs to, e.g. "Net Zero 2050"
        #[arg(long)]
        intent: String,

        #[arg(long)]
        title: Option<String>,
    },

    /// List stored nodes, newest first
    ListNodes {
        /// Case-insensitive substring of the title
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        country: Vec<String>,

        #[arg(long)]
        intent: Vec<String>,

        /// Print full JSON instead of one line per node
        #[arg(long)]
        json: bool,
    },

    /// Remove a node by id
    DeleteNode {
        id: String,
    },

    /// Encode a policy metadata CSV into policy vectors
    Vectorize {
        /// Input CSV (default: configured policy metadata)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output CSV (default: configured policy vectors)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep rows without a jurisdiction or start year
        #[arg(long)]
        keep_incomplete: bool,
    },

    /// Renewable-vs-fossil displacement scores from an OWID energy CSV
    Displacement {
        energy_csv: PathBuf,

        /// ISO code; all countries (latest year each) when omitted
        #[arg(long)]
        iso_code: Option<String>,

        /// With no ISO code, every year instead of the latest
        #[arg(long)]
        all_years: bool,
    },

    /// Rank entities by the sum of a value column
    Rank {
        csv: PathBuf,

        #[arg(long, default_value = long::ENTITY)]
        entity_column: String,

        #[arg(long, default_value = long::VALUE)]
        value_column: String,

        /// Only print the first N ranks
        #[arg(long)]
        top: Option<usize>,
    },

    /// Correlate renewable share with emissions some years later
    LagCorrelation {
        emissions_csv: PathBuf,
        energy_csv: PathBuf,
        country_code: String,

        #[arg(long, default_value = "0")]
        lag: i64,

        /// Print the correlation for every lag up to the configured maximum
        #[arg(long)]
        profile: bool,
    },

    /// Trend of one entity in a long-format (entity, year, value) CSV
    Trend {
        csv: PathBuf,
        entity: String,

        /// Policy adoption year; looked up in the policy metadata when omitted
        #[arg(long)]
        adoption_year: Option<i64>,
    },

    /// Emissions forecast for one jurisdiction of the policy vectors table
    Forecast {
        jurisdiction: String,

        /// Base-year emissions in MtCO₂e
        #[arg(long)]
        initial_emissions: f64,

        /// Share of emissions covered, 0-100
        #[arg(long, default_value = "100")]
        coverage: f64,

        /// Vectors CSV (default: configured policy vectors)
        #[arg(long)]
        vectors: Option<PathBuf>,
    },

    /// Edge table of a policy graph
    Graph {
        /// Graph intent; lists available intents when omitted
        intent: Option<String>,

        #[arg(long)]
        country: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(Some(cli.config.as_path()))
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    logging::init_logging(
        cli.log_level.as_deref().unwrap_or(&config.logging.level),
        cli.log_format.as_deref().unwrap_or(&config.logging.format),
    );

    match cli.command {
        Commands::Classify { text } => {
            let catalog = load_catalog(&config)?;
            let result = classify(&text, &catalog);
            match result.activity_class() {
                Some(class) => println!(
                    "{class} (score {}, keywords: {})",
                    result.score,
                    result.keywords_matched.join(", ")
                ),
                None => println!("No matching activity"),
            }
            Ok(())
        }

        Commands::AddNode {
            text,
            country,
            input,
            date,
            intent,
            title,
        } => {
            let catalog = load_catalog(&config)?;
            let countries = CountryFactors::load(&config.paths.country_factors())
                .context("Failed to load country factors")?;
            let record = PolicyRecord {
                text,
                country,
                title: title.unwrap_or_default(),
                date,
                graph_intent: intent,
            };
            let node = NodeBuilder::new(&catalog, &countries, &config.sectors)
                .with_estimator(config.estimator.estimator())
                .with_size_bounds(config.nodes.size)
                .build(&record, input)?;
            println!(
                "{}  {}  {:+} tCO₂e ({})",
                node.id,
                node.display_name,
                node.impact_tons,
                node.alignment.as_str()
            );
            store(&config).append(node)?;
            Ok(())
        }

        Commands::ListNodes {
            title,
            country,
            intent,
            json,
        } => {
            let filter = NodeFilter {
                title_contains: title,
                countries: country,
                intents: intent,
                ..NodeFilter::default()
            };
            let nodes = store(&config).list(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&nodes)?);
            } else {
                for n in &nodes {
                    println!(
                        "{}  {}  {:<12} {:<24} {:>10} Mt  {}",
                        n.id,
                        n.date,
                        n.country,
                        n.display_name,
                        n.impact_mt,
                        n.graph_intent
                    );
                }
                info!(count = nodes.len(), "Listed nodes");
            }
            Ok(())
        }

        Commands::DeleteNode { id } => {
            if !store(&config).delete(&id)? {
                bail!("No node with id {id}");
            }
            println!("Deleted {id}");
            Ok(())
        }

        Commands::Vectorize {
            input,
            output,
            keep_incomplete,
        } => {
            let input = input.unwrap_or_else(|| config.paths.policy_metadata());
            let output = output.unwrap_or_else(|| config.paths.policy_vectors());
            let df = frames::read_csv_as_strings(&input, None)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let mut vectors = Vectorizer::default()
                .with_keywords(config.instruments.clone())
                .vectorize_frame(&df)?;
            if !keep_incomplete {
                vectors = vectorizer::clean_vectors(vectors);
            }
            vectorizer::write_vectors_csv(&output, &vectors)?;
            info!(rows = vectors.len(), output = %output.display(), "Wrote policy vectors");
            Ok(())
        }

        Commands::Displacement {
            energy_csv,
            iso_code,
            all_years,
        } => {
            let df = read_csv(&energy_csv)?;
            let scores = match iso_code {
                Some(iso) => energy::displacement_scores(&df, &iso)?,
                None => energy::compare_displacement_scores(&df, !all_years)?,
            };
            print_frame(scores)
        }

        Commands::Rank {
            csv,
            entity_column,
            value_column,
            top,
        } => {
            let df = read_csv(&csv)?;
            let mut ranked = ranking::rank_entities(&df, &entity_column, &value_column)?;
            if let Some(n) = top {
                ranked.retain(|r| r.rank as usize <= n);
            }
            print_frame(ranking::ranked_frame(&ranked)?)
        }

        Commands::LagCorrelation {
            emissions_csv,
            energy_csv,
            country_code,
            lag,
            profile,
        } => {
            let emissions = read_csv(&emissions_csv)?;
            let energy_df = read_csv(&energy_csv)?;
            let min_pairs = config.analytics.min_correlation_pairs;

            if profile {
                let emitted = correlation::emission_series(&emissions, &country_code)?;
                let renewable = correlation::renewable_share_series(&energy_df, &country_code)?;
                return print_frame(correlation::lag_profile_frame(
                    &emitted,
                    &renewable,
                    config.analytics.max_lag_years,
                    min_pairs,
                )?);
            }

            match correlation::lag_correlation(&emissions, &energy_df, &country_code, lag, min_pairs)? {
                StatOutcome::Value(r) => println!("r = {r:.4} (lag {lag})"),
                StatOutcome::InsufficientData { required, available } => {
                    println!("Insufficient data: {available} aligned years, need {required}");
                }
                StatOutcome::Degenerate => println!("Correlation undefined (constant series)"),
            }
            Ok(())
        }

        Commands::Trend {
            csv,
            entity,
            adoption_year,
        } => {
            let df = read_csv(&csv)?;
            let series =
                correlation::year_series(&df, long::ENTITY, &entity, long::YEAR, long::VALUE, Aggregate::Sum)?;
            if series.is_empty() {
                bail!("No values for {entity} in {}", csv.display());
            }
            if let Some(rate) = trend::rate_of_change_per_decade(&series) {
                println!("Rate of change: {rate:+.4} per decade");
            }

            let adoption_year = match adoption_year {
                Some(year) => Some(year),
                None => {
                    let meta_path = config.paths.policy_metadata();
                    if meta_path.exists() {
                        trend::policy_adoption_year(&read_csv(&meta_path)?, &entity)?
                    } else {
                        None
                    }
                }
            };
            if let Some(year) = adoption_year {
                match config.analytics.pre_post(&series, year) {
                    StatOutcome::Value(cmp) => {
                        println!(
                            "Adopted {year}: mean {:.4} -> {:.4} (delta {:+.4}), peak {}",
                            cmp.pre_mean, cmp.post_mean, cmp.delta, cmp.peak_year
                        );
                        if let Some(test) = cmp.t_test.as_value() {
                            println!("Welch t = {:.4}, p = {:.4}", test.t_statistic, test.p_value);
                        }
                    }
                    StatOutcome::InsufficientData { required, available } => {
                        println!("Insufficient data around {year}: {available} years, need {required}");
                    }
                    StatOutcome::Degenerate => println!("Pre/post comparison undefined"),
                }
            }

            print_frame(trend::series_frame(&config.analytics.rolling(&series))?)
        }

        Commands::Forecast {
            jurisdiction,
            initial_emissions,
            coverage,
            vectors,
        } => {
            let path = vectors.unwrap_or_else(|| config.paths.policy_vectors());
            let vectors = vectorizer::read_vectors_csv(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let Some(vector) = vectors
                .iter()
                .find(|v| v.jurisdiction.eq_ignore_ascii_case(jurisdiction.trim()))
            else {
                bail!("No policy vector for {jurisdiction}");
            };
            let forecast = config
                .analytics
                .forecast(&ForecastInput::from_vector(vector, initial_emissions, coverage));
            println!(
                "{}: {:.2}% reduction ({:.4} Mt) at {:.4}%/yr",
                vector.jurisdiction,
                forecast.percent_reduction,
                forecast.total_reduction,
                forecast.annual_reduction * 100.0
            );
            print_frame(forecast.to_frame()?)
        }

        Commands::Graph { intent, country } => {
            let nodes = store(&config).load()?;
            let Some(intent) = intent else {
                for intent in graph::graph_intents(&nodes) {
                    println!("{intent}");
                }
                return Ok(());
            };
            let policy_graph = PolicyGraph::build(&nodes, &intent, country.as_deref());
            info!(
                policies = policy_graph.policy_count(),
                total_impact_mt = policy_graph.total_impact_mt(),
                "Built policy graph"
            );
            print_frame(policy_graph.to_frame()?)
        }
    }
}

fn load_catalog(config: &Config) -> Result<ActivityCatalog> {
    let path = config.paths.activity_table();
    ActivityCatalog::load(&path).with_context(|| format!("Failed to load activity table {}", path.display()))
}

fn store(config: &Config) -> NodeStore {
    NodeStore::open(config.paths.node_store())
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    frames::read_csv_as_strings(path, None).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_frame(mut df: DataFrame) -> Result<()> {
    frames::write_csv_to(&mut df, std::io::stdout().lock())?;
    Ok(())
}
