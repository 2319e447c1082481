/// Command-line surface
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use zenodo_client::{
    ClientConfig, ContentType, DepositionAction, DepositionQuery, RecordQuery, ResourceKind,
    SearchSort, SearchStatus,
};

#[derive(Parser)]
#[command(name = "zenodo")]
#[command(about = "Manage Zenodo depositions, files and records", long_about = None)]
pub struct Cli {
    /// Use sandbox.zenodo.org and the SANDBOX credential section
    #[arg(long, global = true)]
    pub sandbox: bool,

    /// Access token; skips the credential file
    #[arg(long, global = true, env = "ZENODO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Credential file path (default: ~/.zenodorc)
    #[arg(long, global = true, env = "ZENODO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new().sandbox(self.sandbox);
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(path) = &self.config {
            config = config.with_config_path(path.clone());
        }
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect or edit the credential file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Work with depositions
    #[command(subcommand)]
    Deposit(DepositCommand),
    /// Work with the files of a deposition
    #[command(subcommand)]
    Files(FilesCommand),
    /// Search published records
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Browse licenses, communities, funders and grants
    #[command(subcommand)]
    Resources(ResourcesCommand),
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Create a credential file with a placeholder token
    Init,
    /// List credential sections
    Sections,
    /// List the tokens of a section
    Tokens { section: String },
    /// Store a token
    SetToken {
        section: String,
        key: String,
        value: String,
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum DepositCommand {
    /// Create an empty deposition
    Create,
    /// Search your depositions
    List(SearchArgs),
    /// Show one deposition
    Get { id: u64 },
    /// Apply metadata read from a JSON file
    Update { id: u64, metadata: PathBuf },
    /// Delete an unpublished deposition
    Delete { id: u64 },
    /// Run publish, edit, discard or newversion
    Action {
        id: u64,
        action: DepositionAction,
        /// Print the action's own answer instead of the new version's draft
        #[arg(long)]
        no_follow: bool,
    },
}

#[derive(Subcommand)]
pub enum FilesCommand {
    List {
        id: u64,
    },
    /// Upload a local file into the deposition's bucket
    Upload {
        id: u64,
        path: PathBuf,
    },
    Download {
        id: u64,
        file_id: String,
        dest: PathBuf,
        /// Treat DEST as the exact output file instead of a directory
        #[arg(long)]
        exact: bool,
    },
    /// Reorder files
    Sort {
        id: u64,
        #[arg(required = true)]
        file_ids: Vec<String>,
    },
    Rename {
        id: u64,
        file_id: String,
        name: String,
    },
    Delete {
        id: u64,
        file_id: String,
    },
}

#[derive(Subcommand)]
pub enum RecordsCommand {
    Search(RecordSearchArgs),
    Get { id: u64 },
}

#[derive(Subcommand)]
pub enum ResourcesCommand {
    List {
        kind: ResourceKind,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
    },
    Get {
        kind: ResourceKind,
        id: String,
    },
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query (Elasticsearch syntax)
    #[arg(short, long)]
    pub query: Option<String>,
    #[arg(long)]
    pub status: Option<SearchStatus>,
    /// bestmatch, mostrecent or -mostrecent
    #[arg(long, allow_hyphen_values = true)]
    pub sort: Option<SearchSort>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub size: Option<u32>,
    #[arg(long)]
    pub all_versions: bool,
}

impl SearchArgs {
    pub fn to_query(&self) -> DepositionQuery {
        DepositionQuery {
            query: self.query.clone(),
            status: self.status,
            sort: self.sort,
            page: self.page,
            size: self.size,
            all_versions: self.all_versions.then_some(true),
        }
    }
}

#[derive(Args)]
pub struct RecordSearchArgs {
    #[command(flatten)]
    pub search: SearchArgs,
    #[arg(long)]
    pub communities: Option<String>,
    #[arg(long = "type")]
    pub record_type: Option<String>,
    #[arg(long)]
    pub subtype: Option<String>,
    #[arg(long)]
    pub bounds: Option<String>,
    #[arg(long)]
    pub custom: Option<String>,
    /// Response encoding: json, bibtex, marcxml, ...
    #[arg(long)]
    pub content_type: Option<ContentType>,
}

impl RecordSearchArgs {
    pub fn to_query(&self) -> RecordQuery {
        let base = self.search.to_query();
        RecordQuery {
            query: base.query,
            status: base.status,
            sort: base.sort,
            page: base.page,
            size: base.size,
            all_versions: base.all_versions,
            communities: self.communities.clone(),
            record_type: self.record_type.clone(),
            subtype: self.subtype.clone(),
            bounds: self.bounds.clone(),
            custom: self.custom.clone(),
            content_type: self.content_type,
        }
    }
}
