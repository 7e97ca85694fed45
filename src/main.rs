//! App Fraud Analyzer - Main Entry Point
//!
//! Collects store listings, enriches them and runs the multi-stage fraud
//! analysis, either for a single app or a whole dataset.

use anyhow::{Context, Result};
use app_fraud_analyzer::{
    config::{AppConfig, LoggingConfig},
    consumer::DatasetReader,
    enrichment::Enricher,
    metrics::PipelineMetrics,
    models::{gemini::GeminiClient, inference::AnalysisEngine},
    pipeline::BatchRunner,
    producer::{dataset_name, ResultExporter},
    prompt_builder::PromptBuilder,
    store::{Collector, StoreApiClient},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "app-fraud-analyzer", version, about = "LLM-based Play Store app fraud analysis")]
struct Cli {
    /// Configuration file (optional, environment overrides apply)
    #[arg(long, global = true, default_value = app_fraud_analyzer::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the app ids matching a store search
    Search {
        #[arg(long)]
        query: String,
        #[arg(long)]
        country: Option<String>,
    },
    /// Fetch and normalize one listing into app_details.json
    Details { app_id: String },
    /// Collect the details of every search hit into a dataset file
    Collect {
        #[arg(long)]
        query: String,
        #[arg(long)]
        country: Option<String>,
    },
    /// Enrich every app of a dataset into `<dataset>_expanded.json`
    Enrich { dataset: PathBuf },
    /// Enrich and analyze a single app details file into results.json
    Analyze {
        app_details: PathBuf,
        /// Analyze the record as is, without enrichment
        #[arg(long)]
        skip_enrichment: bool,
    },
    /// Enrich, analyze and export predictions for a whole dataset
    Batch { dataset: PathBuf },
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("app_fraud_analyzer={}", logging.level).parse()?);

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

/// Shared services built from configuration
struct Services {
    collector: Collector,
    gemini: Arc<GeminiClient>,
    exporter: ResultExporter,
    metrics: Arc<PipelineMetrics>,
}

impl Services {
    fn store_only(config: &AppConfig) -> Result<(Collector, ResultExporter)> {
        let store = StoreApiClient::new(&config.store)?;
        let collector = Collector::new(Arc::new(store), config.store.search_hits);
        Ok((collector, ResultExporter::new(&config.output.output_dir)))
    }

    fn build(config: &AppConfig) -> Result<Self> {
        let (collector, exporter) = Self::store_only(config)?;
        let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
        Ok(Self {
            collector,
            gemini,
            exporter,
            metrics: Arc::new(PipelineMetrics::new()),
        })
    }

    fn enricher(&self, config: &AppConfig) -> Result<Enricher> {
        Enricher::from_config(self.collector.clone(), self.gemini.clone(), &config.enrichment)
    }

    fn engine(&self, config: &AppConfig) -> AnalysisEngine {
        let prompts = PromptBuilder::new(
            &config.analysis.tokenizer_model,
            config.analysis.prompt_token_limit,
        );
        AnalysisEngine::new(self.gemini.clone(), prompts, config.analysis.reason_char_limit)
            .with_metrics(self.metrics.clone())
    }

    fn runner(&self, config: &AppConfig) -> Result<BatchRunner> {
        Ok(BatchRunner::new(
            self.enricher(config)?,
            self.engine(config),
            self.exporter.clone(),
            self.metrics.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from_path(&cli.config)?;
    init_tracing(&config.logging)?;
    info!(config = %cli.config.display(), "Starting App Fraud Analyzer");

    match cli.command {
        Command::Search { query, country } => {
            let (collector, _) = Services::store_only(&config)?;
            let country = country.unwrap_or_else(|| config.store.country.clone());
            for app_id in collector.search_apps(&query, &country).await? {
                println!("{}", app_id);
            }
        }
        Command::Details { app_id } => {
            let (collector, exporter) = Services::store_only(&config)?;
            let app = collector.get_app_details(&app_id).await?;
            exporter.write_app_details(&app)?;
            println!("{}", serde_json::to_string_pretty(&app)?);
        }
        Command::Collect { query, country } => {
            let (collector, exporter) = Services::store_only(&config)?;
            let country = country.unwrap_or_else(|| config.store.country.clone());
            let apps = collector.create_dataset(&query, &country).await?;
            let path = exporter.write_dataset(&dataset_name(&query, &country), &apps)?;
            info!(path = %path.display(), apps = apps.len(), "Dataset written");
        }
        Command::Enrich { dataset } => {
            let services = Services::build(&config)?;
            let reader = DatasetReader::new(&dataset);
            let apps = reader.load_apps()?;

            let expanded = services.runner(&config)?.enrich_all(apps).await;
            services.exporter.write_expanded(&reader.name(), &expanded)?;
        }
        Command::Analyze {
            app_details,
            skip_enrichment,
        } => {
            let services = Services::build(&config)?;
            let app = DatasetReader::new(&app_details)
                .load_apps()?
                .into_iter()
                .next()
                .with_context(|| format!("No app record in {}", app_details.display()))?;

            let app = if skip_enrichment {
                app
            } else {
                services.enricher(&config)?.add_info(app).await?
            };

            let report = services.engine(&config).analyze(&app).await;
            services.exporter.write_report(&report)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            services.metrics.print_summary();
        }
        Command::Batch { dataset } => {
            let services = Services::build(&config)?;
            let reader = DatasetReader::new(&dataset);
            let apps = reader.load_apps()?;

            let summary = services.runner(&config)?.run(&reader.name(), apps).await?;
            info!(
                run_id = %summary.run_id,
                predicted = summary.predicted,
                failed = summary.failed,
                output = %services.exporter.output_dir().display(),
                "Batch complete"
            );
        }
    }

    Ok(())
}
