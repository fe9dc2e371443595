mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use organigram_core::{
    AirtableConfig, AirtableSource, ArtifactWriter, ClassificationConfig, JsonFileSource,
    Pipeline, RecordSource, ReferenceResolver, WikidataClient, WikidataConfig,
};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "organigram=info,organigram_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = build_pipeline(&cli)?;

    let stats = pipeline.run().await.context("organigram build failed")?;

    println!(
        "Wrote {} files to {} ({} organizations, {} location entries, {} with Wikidata)",
        stats.files_written,
        cli.output_dir.display(),
        stats.organizations,
        stats.location_entries,
        stats.enriched_entities
    );
    Ok(())
}

fn build_pipeline(cli: &Cli) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(record_source(cli)?, ArtifactWriter::new(&cli.output_dir));

    if let Some(path) = &cli.classification {
        let classification = ClassificationConfig::from_file(path)
            .with_context(|| format!("loading classification from {}", path.display()))?;
        pipeline = pipeline.with_classification(classification);
    }

    if !cli.skip_wikidata {
        let mut config = WikidataConfig::default().with_max_concurrent_requests(cli.max_concurrency);
        if let Some(user_agent) = &cli.user_agent {
            config = config.with_user_agent(user_agent);
        }
        let width = config.max_concurrent_requests;
        let client = WikidataClient::new(config)?;
        let resolver =
            ReferenceResolver::new(Box::new(client)).with_max_concurrent_requests(width);
        pipeline = pipeline.with_resolver(resolver);
    }

    Ok(pipeline)
}

fn record_source(cli: &Cli) -> Result<Box<dyn RecordSource>> {
    if let Some(path) = &cli.records_file {
        return Ok(Box::new(JsonFileSource::new(path)));
    }

    let config = AirtableConfig::new(
        cli.airtable_api_key.clone().unwrap_or_default(),
        cli.airtable_base_id.clone().unwrap_or_default(),
        cli.airtable_table_id.clone().unwrap_or_default(),
    )
    .context("Airtable credentials are required unless --records-file is given")?;
    Ok(Box::new(AirtableSource::new(config)?))
}
