use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use catalog_enrich_lib::batch::{join_batch, spawn_batch, BatchJob};
use catalog_enrich_lib::db::{NewRecord, RecordField};
use catalog_enrich_lib::enrich::Enricher;
use catalog_enrich_lib::generation::ResponsesClient;
use catalog_enrich_lib::images::DuckDuckGoImages;
use catalog_enrich_lib::intent::Action;
use catalog_enrich_lib::session::ChatSession;
use catalog_enrich_lib::store::{RecordStore, SqliteStore};
use catalog_enrich_lib::types::load_config;

#[derive(Parser, Debug)]
#[command(
    name = "catalog-enrich",
    version,
    about = "Intent-driven AI enrichment for product catalog records"
)]
struct Cli {
    /// Config file (default: ~/.catalog-enrich/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a record to the catalog
    Add {
        /// External identifier (SKU)
        sku: String,
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        net_price: Option<f64>,
        #[arg(long)]
        gross_price: Option<f64>,
    },
    /// Print a record and its attributes as JSON
    Show {
        #[arg(required_unless_present = "sku")]
        id: Option<i64>,
        /// Look the record up by external identifier instead
        #[arg(long, conflicts_with = "id")]
        sku: Option<String>,
    },
    /// Run one request against one record
    Assist {
        id: i64,
        /// Free-text request, e.g. "write an SEO title"
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
        /// Skip classification and run this action
        #[arg(long)]
        action: Option<String>,
    },
    /// Run one request against many records
    Batch {
        /// Record ids, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "all")]
        ids: Vec<i64>,
        /// Every record in the catalog
        #[arg(long)]
        all: bool,
        /// Defaults to `batchRequest` from the config
        #[arg(long)]
        request: Option<String>,
        #[arg(long)]
        actor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).map_err(|e| anyhow!("Failed to load config: {e}"))?;
    let store = Arc::new(SqliteStore::open(&config).context("Failed to open catalog database")?);

    match cli.command {
        Command::Add {
            sku,
            name,
            category,
            description,
            net_price,
            gross_price,
        } => {
            let mut record = NewRecord::new(&sku, &name);
            if let Some(category) = category {
                record = record.with_field(RecordField::Category, &category);
            }
            if let Some(description) = description {
                record = record.with_field(RecordField::Description, &description);
            }
            record.net_price = net_price;
            record.gross_price = gross_price;

            let created = store.insert_record(&record)?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        Command::Show { id, sku } => {
            let record = match (id, sku) {
                (_, Some(sku)) => store
                    .find_by_external_id(&sku)?
                    .ok_or_else(|| anyhow!("No record with SKU {sku}"))?,
                (Some(id), None) => store
                    .find_by_id(id)?
                    .ok_or_else(|| anyhow!("Record {id} not found"))?,
                (None, None) => return Err(anyhow!("Pass a record id or --sku")),
            };
            let attributes = store.list_attributes(record.id)?;
            let doc = serde_json::json!({ "record": record, "attributes": attributes });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Command::Assist { id, request, action } => {
            let enricher = build_enricher(&config, store.clone());
            let request = request.join(" ");
            let outcome = match action {
                Some(label) => {
                    let action: Action = label.parse().map_err(|e: String| anyhow!(e))?;
                    enricher.process_action(id, action, &request).await?
                }
                None => {
                    let mut session = ChatSession::new(id);
                    session.ask(&enricher, &request).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Batch {
            ids,
            all,
            request,
            actor,
        } => {
            let ids = if all { store.list_record_ids()? } else { ids };
            if ids.is_empty() {
                return Err(anyhow!("No records selected; pass --ids or --all"));
            }
            let request = request.unwrap_or_else(|| config.batch_request.clone());
            let job = BatchJob::new(ids, actor, request);
            let job_id = job.job_id;

            let enricher = Arc::new(build_enricher(&config, store.clone()));
            let handle = spawn_batch(enricher, job);
            let summary = join_batch(handle, job_id)
                .await
                .ok_or_else(|| anyhow!("Batch job {job_id} did not complete"))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn build_enricher(config: &catalog_enrich_lib::types::EnrichConfig, store: Arc<SqliteStore>) -> Enricher {
    let client = Arc::new(ResponsesClient::new(config));
    let images = Arc::new(DuckDuckGoImages::new(config.short_timeout_secs));
    Enricher::new(client, images, store, config.clone())
}
