//! CLI entry point for notion-blog

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "notion-blog")]
#[command(version)]
#[command(about = "A static blog generator that reads posts from a Notion database", long_about = None)]
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
    /// Initialize a new blog site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Ignore the cache and rebuild everything
        #[arg(short, long)]
        force: bool,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Seconds between regenerations from Notion (0 disables)
        #[arg(short, long, default_value = "60")]
        revalidate: u64,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,
    },

    /// List posts or tags
    List {
        /// Type of content to list (post, tag)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Show one post's metadata and markdown
    Post {
        /// Slug of the post
        slug: String,
    },

    /// Clean the public folder and cache
    Clean,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "notion_blog=debug,info"
    } else {
        "notion_blog=info"
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
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            notion_blog::commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
            println!("Set NOTION_TOKEN and NOTION_DATABASE_ID, then run `notion-blog generate`.");
        }

        Commands::Generate { force } => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            if blog.generate(force).await? {
                println!("Generated successfully!");
            } else {
                println!("Already up to date.");
            }
        }

        Commands::Server {
            port,
            ip,
            revalidate,
            open,
        } => {
            let blog = notion_blog::Blog::new(&base_dir)?;

            // Generate first
            tracing::info!("Generating static files...");
            blog.generate(false).await?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            notion_blog::server::start(&blog, &ip, port, revalidate, open).await?;
        }

        Commands::List { r#type } => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            notion_blog::commands::list::run(&blog, &r#type).await?;
        }

        Commands::Post { slug } => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            notion_blog::commands::post::run(&blog, &slug).await?;
        }

        Commands::Clean => {
            let blog = notion_blog::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::Version => {
            println!("notion-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
