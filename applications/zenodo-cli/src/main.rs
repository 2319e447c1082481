/// zenodo - command-line client for the Zenodo REST API
mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{
    Cli, Commands, ConfigCommand, DepositCommand, FilesCommand, RecordsCommand, ResourcesCommand,
};
use serde_json::Value;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zenodo_client::{
    default_config_path, BucketTarget, CredentialStore, Destination, Listing, MetadataUpdate,
    Record, ResourceQuery, ZenodoClient,
};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zenodo_client=info,zenodo_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Config(command) => config(&cli, command),
        Commands::Deposit(command) => deposit(&client(&cli)?, command),
        Commands::Files(command) => files(&client(&cli)?, command),
        Commands::Records(command) => records(&client(&cli)?, command),
        Commands::Resources(command) => resources(&client(&cli)?, command),
    }
}

fn client(cli: &Cli) -> anyhow::Result<ZenodoClient> {
    let client = ZenodoClient::new(cli.client_config()).context("Failed to set up the client")?;
    tracing::debug!("Using {}", client.base_url());
    Ok(client)
}

fn print(value: &Value) -> anyhow::Result<()> {
    match value {
        // BibTeX and XML encodings arrive as plain text
        Value::String(text) => println!("{text}"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}

fn print_record(record: Record) -> anyhow::Result<()> {
    print(&record.into_value())
}

fn print_listing(listing: &Listing) -> anyhow::Result<()> {
    print(&listing.to_value())
}

fn config(cli: &Cli, command: &ConfigCommand) -> anyhow::Result<()> {
    let path = cli.config.clone().unwrap_or_else(default_config_path);

    match command {
        ConfigCommand::Init => {
            let store = CredentialStore::create_default(&path, cli.sandbox)?;
            tracing::info!(
                "Created {}; replace the placeholder token before use",
                store.path().display()
            );
        }
        ConfigCommand::Sections => {
            let store = CredentialStore::load(&path)?;
            print(&serde_json::json!(store.list_sections()))?;
        }
        ConfigCommand::Tokens { section } => {
            let store = CredentialStore::load(&path)?;
            let tokens: serde_json::Map<String, Value> = store
                .list_tokens(section)?
                .into_iter()
                .map(|(key, token)| (key.to_string(), Value::from(token)))
                .collect();
            print(&Value::Object(tokens))?;
        }
        ConfigCommand::SetToken {
            section,
            key,
            value,
            force,
        } => {
            let mut store = CredentialStore::load(&path)?;
            store.write_token(section, key, value, *force)?;
            store.persist()?;
            tracing::info!("Token '{}' saved in [{}]", key, section.to_uppercase());
        }
    }

    Ok(())
}

fn deposit(client: &ZenodoClient, command: &DepositCommand) -> anyhow::Result<()> {
    let depositions = client.depositions();

    match command {
        DepositCommand::Create => print_record(depositions.create()?)?,
        DepositCommand::List(args) => print_listing(&depositions.list(&args.to_query())?)?,
        DepositCommand::Get { id } => print_record(depositions.retrieve(*id)?)?,
        DepositCommand::Update { id, metadata } => {
            let update = read_metadata(metadata)?;
            print_record(depositions.update(*id, &update)?)?;
        }
        DepositCommand::Delete { id } => depositions.delete(*id)?,
        DepositCommand::Action {
            id,
            action,
            no_follow,
        } => {
            let actions = client.deposition_actions();
            let record = if *no_follow {
                actions.action_response(*id, *action)?
            } else {
                actions.perform(*id, *action)?
            };
            print_record(record)?;
        }
    }

    Ok(())
}

fn read_metadata(path: &Path) -> anyhow::Result<MetadataUpdate> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid metadata in {}", path.display()))
}

fn files(client: &ZenodoClient, command: &FilesCommand) -> anyhow::Result<()> {
    let files = client.deposition_files();

    match command {
        FilesCommand::List { id } => print_listing(&files.list(*id)?)?,
        FilesCommand::Upload { id, path } => {
            let deposition = client.depositions().retrieve(*id)?;
            let uploaded = files.upload(path, BucketTarget::Record(&deposition))?;
            print_record(uploaded)?;
        }
        FilesCommand::Download {
            id,
            file_id,
            dest,
            exact,
        } => {
            let destination = if *exact {
                Destination::File(dest.clone())
            } else {
                Destination::Directory(dest.clone())
            };
            let written = files.download(*id, file_id, destination)?;
            println!("{}", written.display());
        }
        FilesCommand::Sort { id, file_ids } => {
            let ids: Vec<&str> = file_ids.iter().map(String::as_str).collect();
            print_listing(&files.sort(*id, &ids)?)?;
        }
        FilesCommand::Rename { id, file_id, name } => {
            print_record(files.rename(*id, file_id, name)?)?;
        }
        FilesCommand::Delete { id, file_id } => files.delete(*id, file_id)?,
    }

    Ok(())
}

fn records(client: &ZenodoClient, command: &RecordsCommand) -> anyhow::Result<()> {
    match command {
        RecordsCommand::Search(args) => print_listing(&client.records().list(&args.to_query())?),
        RecordsCommand::Get { id } => print_record(client.records().retrieve(*id)?),
    }
}

fn resources(client: &ZenodoClient, command: &ResourcesCommand) -> anyhow::Result<()> {
    match command {
        ResourcesCommand::List {
            kind,
            query,
            page,
            size,
        } => {
            let query = ResourceQuery {
                query: query.clone(),
                page: *page,
                size: *size,
            };
            print_listing(&client.resources(*kind).list(&query)?)
        }
        ResourcesCommand::Get { kind, id } => {
            print_record(client.resources(*kind).retrieve(id)?)
        }
    }
}
