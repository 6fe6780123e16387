use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use llm_api_cookbook_rs::{examples, Example};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static EXAMPLE_REGISTRY: LazyLock<HashMap<&'static str, Box<dyn Example>>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Box<dyn Example + 'static>> = HashMap::new();
    // basics
    m.insert("00.01", Box::new(examples::basics::EG01));
    // llm api
    m.insert("01.01", Box::new(examples::llm_api::EG01));
    m.insert("01.02", Box::new(examples::llm_api::EG02));
    m.insert("01.03", Box::new(examples::llm_api::EG03));
    m.insert("01.04", Box::new(examples::llm_api::EG04));
    m.insert("01.05", Box::new(examples::llm_api::EG05));
    // embeddings
    m.insert("02.01", Box::new(examples::embeddings::EG01));
    m.insert("02.02", Box::new(examples::embeddings::EG02));
    m.insert("02.03", Box::new(examples::embeddings::EG03));
    // vector database
    m.insert("03.01", Box::new(examples::vectordb::EG01));
    m.insert("03.02", Box::new(examples::vectordb::EG02));
    m.insert("03.03", Box::new(examples::vectordb::EG03));
    m.insert("03.04", Box::new(examples::vectordb::EG04));
    m.insert("03.05", Box::new(examples::vectordb::EG05));
    m
});

/// CLI
#[derive(Debug, Parser)]
#[command(name = "llm-api-cookbook-rs")]
#[command(about = "A CLI for running the examples.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run an example
    Example {
        /// The example to run
        id: String,
    },
    /// List all examples
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_api_cookbook_rs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Example { id } => {
            let Some(eg) = EXAMPLE_REGISTRY.get(&id[..]) else {
                bail!("unknown example id '{id}'; run `list` to see what is available");
            };
            eg.main()
        }
        Commands::List => {
            let mut entries: Vec<(&&str, &Box<dyn Example>)> = EXAMPLE_REGISTRY.iter().collect();
            entries.sort_by_key(|(id, _)| **id);

            let mut table = Table::new();
            table.set_header(vec!["Id", "Description"]);
            for (id, example) in entries {
                table.add_row(vec![String::from(*id), example.description()]);
            }
            println!("{table}");
            Ok(())
        }
    }
}
