//! CLI entry point for quill-rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quill")]
#[command(version)]
#[command(about = "Serve and pre-render a blog whose Markdown posts live in a data backend", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Pre-render the latest posts to static files
    #[command(alias = "g")]
    Generate {
        /// Number of posts to render (defaults to generate.limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Convert a Markdown file and print the result as JSON
    Convert {
        /// Markdown file with optional YAML front-matter
        file: PathBuf,
    },

    /// List stored content
    List {
        /// Type of content to list (posts, tags)
        #[arg(default_value = "posts")]
        r#type: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "quill_rs=debug,info"
    } else {
        "quill_rs=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match cli.command {
        Commands::Serve { port, ip } => {
            let blog = quill_rs::Blog::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| blog.config.server.ip.clone());
            let port = port.unwrap_or(blog.config.server.port);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            quill_rs::server::start(blog, &ip, port).await?;
        }

        Commands::Generate { limit } => {
            let blog = quill_rs::Blog::new(&base_dir)?;
            let limit = limit.unwrap_or(blog.config.generate.limit);
            tracing::info!("Generating static files...");

            let summary = blog.generate(limit)?;
            println!(
                "Generated {} posts into {:?} ({} skipped)",
                summary.written, blog.public_dir, summary.skipped
            );
        }

        Commands::Convert { file } => {
            let blog = quill_rs::Blog::new(&base_dir)?;
            let file = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            quill_rs::commands::convert::run(&blog, &file)?;
        }

        Commands::List { r#type } => {
            let blog = quill_rs::Blog::new(&base_dir)?;
            quill_rs::commands::list::run(&blog, &r#type)?;
        }

        Commands::Version => {
            println!("quill version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
