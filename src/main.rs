use anyhow::Context;
use blob_router::client::{
    DeleteOptions, GetOptions, ListOptions, NodeResponse, PutOptions, SyncOptions,
};
use blob_router::routing::{Replicate, ResponseKind};
use blob_router::{BlobClient, Topology};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blob-router", about = "Route blob requests to storage replicas")]
struct Cli {
    /// Topology file (JSON).
    #[arg(long, env = "BLOB_ROUTER_CONFIG")]
    config: PathBuf,

    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch an object (raw bytes, or metadata with --info).
    Get {
        name: String,
        #[arg(long)]
        info: bool,
        /// Treat the name as not yet encoded.
        #[arg(long)]
        plain: bool,
    },
    /// Store the contents of a file.
    Put {
        name: String,
        file: PathBuf,
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long)]
        deleted: Option<f64>,
        #[arg(long)]
        replicate: Option<Replicate>,
        /// The name already carries its bucket prefix.
        #[arg(long)]
        encoded: bool,
    },
    /// Expire an object.
    Delete {
        name: String,
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long)]
        plain: bool,
    },
    /// Print the name that goes on the wire.
    Name { name: String },
    /// Print the resolved bucket per cluster.
    Buckets {
        name: String,
        #[arg(long)]
        plain: bool,
    },
    /// Print the replicas hosting a name.
    Replicas {
        name: String,
        #[arg(long)]
        plain: bool,
    },
    Status { replica: String },
    List {
        replica: String,
        #[arg(long)]
        modulo: Option<u32>,
        #[arg(long)]
        checksum: bool,
    },
    Purge { replica: String },
    Sync {
        replica: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        start: Option<f64>,
        #[arg(long)]
        end: Option<f64>,
    },
    Buffer { replica: String },
}

fn encoded_flag(plain: bool) -> Option<bool> {
    plain.then_some(false)
}

fn print_response(response: NodeResponse) -> anyhow::Result<()> {
    match response {
        NodeResponse::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        NodeResponse::Raw(bytes) => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let topology = Topology::load(&cli.config)
        .with_context(|| format!("loading topology from {}", cli.config.display()))?;
    let client = BlobClient::new(topology);

    match cli.command {
        Command::Get { name, info, plain } => {
            let options = GetOptions {
                response: if info {
                    ResponseKind::Info
                } else {
                    ResponseKind::Data
                },
                encoded: encoded_flag(plain),
            };
            print_response(client.get(&name, options).await?)?;
        }
        Command::Put {
            name,
            file,
            ttl,
            deleted,
            replicate,
            encoded,
        } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            tracing::info!("Uploading {} bytes as {:?}", data.len(), name);
            let options = PutOptions {
                ttl,
                deleted,
                replicate,
                encoded: Some(encoded),
                ..Default::default()
            };
            print_response(client.put(&name, data, options).await?)?;
        }
        Command::Delete { name, ttl, plain } => {
            let options = DeleteOptions {
                ttl,
                encoded: encoded_flag(plain),
                ..Default::default()
            };
            print_response(client.delete(&name, options).await?)?;
        }
        Command::Name { name } => println!("{}", client.name(&name, None)?),
        Command::Buckets { name, plain } => {
            print_json(&client.buckets(&name, encoded_flag(plain))?)?;
        }
        Command::Replicas { name, plain } => {
            print_json(&client.replicas(&name, encoded_flag(plain))?)?;
        }
        Command::Status { replica } => print_response(client.status(&replica).await?)?,
        Command::List {
            replica,
            modulo,
            checksum,
        } => {
            let options = ListOptions { modulo, checksum };
            print_response(client.list(&replica, options).await?)?;
        }
        Command::Purge { replica } => print_response(client.purge(&replica).await?)?,
        Command::Sync {
            replica,
            source,
            start,
            end,
        } => {
            let options = SyncOptions { source, start, end };
            print_response(client.sync(&replica, options).await?)?;
        }
        Command::Buffer { replica } => print_response(client.buffer(&replica).await?)?,
    }

    Ok(())
}
