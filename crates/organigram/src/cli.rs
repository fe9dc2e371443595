use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "organigram",
    about = "Build the German federal organigram directory with Wikidata enrichment",
    version
)]
pub struct Cli {
    /// Read records from a local JSON file instead of Airtable
    #[arg(long, env = "ORGANIGRAM_RECORDS_FILE")]
    pub records_file: Option<PathBuf>,

    /// Airtable personal access token
    #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
    pub airtable_api_key: Option<String>,

    #[arg(long, env = "AIRTABLE_BASE_ID")]
    pub airtable_base_id: Option<String>,

    #[arg(long, env = "AIRTABLE_TABLE_ID")]
    pub airtable_table_id: Option<String>,

    /// Directory receiving the generated JSON files
    #[arg(short, long, env = "ORGANIGRAM_OUTPUT_DIR", default_value = "public")]
    pub output_dir: PathBuf,

    /// Skip Wikidata enrichment
    #[arg(long, env = "ORGANIGRAM_SKIP_WIKIDATA")]
    pub skip_wikidata: bool,

    /// Maximum Wikidata requests in flight per wave (0 = unbounded)
    #[arg(long, env = "ORGANIGRAM_MAX_CONCURRENCY", default_value_t = 0)]
    pub max_concurrency: usize,

    /// JSON file overriding the Ressort classification lists
    #[arg(long, env = "ORGANIGRAM_CLASSIFICATION")]
    pub classification: Option<PathBuf>,

    /// User-Agent sent to Wikidata, naming the operator and a contact address;
    /// required unless --skip-wikidata is set
    #[arg(long, env = "WIKIDATA_USER_AGENT")]
    pub user_agent: Option<String>,
}
