use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use attrmap_core::{AttributeCandidate, AttributeCatalog, CatalogLoader};
use attrmap_engine::{AttributeMapper, EmbeddingProvider, MapperConfig};

/// Resolve free-text property phrases to stable attribute keys
#[derive(Parser, Debug)]
#[command(name = "attrmap")]
#[command(about = "Resolve property phrases to attribute keys", long_about = None)]
struct Args {
    /// Path to the mapper configuration JSON
    #[arg(short, long, default_value = "config/settings.json")]
    config: PathBuf,

    /// Columnar attribute definitions file to build the catalog from
    #[arg(long)]
    definitions: Option<PathBuf>,

    /// JSON file holding an array of catalog candidates
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Similarity threshold override
    #[arg(long)]
    threshold: Option<f32>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Queries to resolve
    #[arg(required = true)]
    queries: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting attrmap v{}", env!("CARGO_PKG_VERSION"));

    let config = if args.config.exists() {
        MapperConfig::from_path(&args.config)?
    } else {
        warn!(
            path = %args.config.display(),
            "configuration file not found, using defaults"
        );
        MapperConfig::default()
    };

    let threshold = args.threshold.unwrap_or(config.embedding_threshold);
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("threshold {threshold} must be within 0.0..=1.0");
    }

    let catalog = build_catalog(&args)?;
    info!(
        model = %config.embedding_model,
        threshold,
        candidates = catalog.len(),
        "resolving {} queries",
        args.queries.len()
    );

    let provider = Arc::new(EmbeddingProvider::fastembed(config.embedding_model.as_str()));
    let mapper = AttributeMapper::new(provider);

    for query in &args.queries {
        let result = mapper.resolve(query, &catalog, threshold);
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(())
}

fn build_catalog(args: &Args) -> anyhow::Result<AttributeCatalog> {
    match (&args.definitions, &args.catalog) {
        (Some(path), None) => {
            let report = CatalogLoader::columnar().load_path(path)?;
            for diagnostic in &report.diagnostics {
                warn!(line = diagnostic.line, "skipped record: {}", diagnostic.message);
            }
            info!(
                candidates = report.catalog.len(),
                skipped = report.diagnostics.len(),
                "catalog loaded from definitions file"
            );
            Ok(report.catalog)
        }
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path)?;
            let candidates: Vec<AttributeCandidate> = serde_json::from_str(&text)?;
            let catalog = AttributeCatalog::new(candidates)?;
            info!(candidates = catalog.len(), "catalog loaded from candidate list");
            Ok(catalog)
        }
        _ => anyhow::bail!("supply exactly one of --definitions or --catalog"),
    }
}
