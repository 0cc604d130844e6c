//! CLI entry point for dyncontent

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dyncontent::commands;
use dyncontent::Dyncontent;

#[derive(Parser)]
#[command(name = "dyncontent")]
#[command(author = "Yukang Chen")]
#[command(version)]
#[command(about = "Resolve, render and preview dynamic content blocks", long_about = None)]
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
    /// Initialize a preview workspace
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Render a page, or one position of it, to stdout
    #[command(alias = "r")]
    Render {
        /// Page key
        page: String,

        /// Position to render (defaults to the whole page)
        #[arg(short, long)]
        position: Option<String>,

        /// Viewport width in pixels; omit to emit responsive CSS instead
        #[arg(short, long)]
        width: Option<u32>,

        /// Markup to use while nothing resolves
        #[arg(short, long)]
        fallback: Option<String>,
    },

    /// Start the preview server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to
        #[arg(short, long)]
        ip: Option<String>,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Watch the local content directory and live reload
        #[arg(short, long)]
        watch: bool,
    },

    /// Manage content blocks
    Blocks {
        #[command(subcommand)]
        action: BlockAction,
    },

    /// Manage plugins
    Plugins {
        #[command(subcommand)]
        action: PluginAction,
    },

    /// Upload an asset and print its URL
    Upload {
        file: PathBuf,
    },

    /// Store a superadmin token for admin commands
    Login {
        /// Token issued by the Content Manager
        #[arg(long)]
        token: String,

        /// Forget the token after this many hours
        #[arg(long)]
        expires_in: Option<i64>,
    },

    /// Forget the stored session
    Logout,

    /// Display version information
    Version,
}

#[derive(Subcommand)]
enum BlockAction {
    /// List content blocks
    List {
        /// Only blocks of this page
        #[arg(short, long)]
        page: Option<String>,
    },
    /// Delete a content block
    Delete { id: String },
    /// Activate a content block
    Enable { id: String },
    /// Deactivate a content block
    Disable { id: String },
}

#[derive(Subcommand)]
enum PluginAction {
    /// List plugins
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "dyncontent=debug,info"
    } else {
        "dyncontent=info"
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
        None => std::env::current_dir().context("cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing workspace in {:?}", target_dir);
            commands::init::init_workspace(&target_dir)?;
            println!("Initialized dyncontent workspace in {:?}", target_dir);
        }

        Commands::Render {
            page,
            position,
            width,
            fallback,
        } => {
            let app = Dyncontent::new(&base_dir)?;
            let options = commands::render::RenderOptions {
                page: &page,
                position: position.as_deref(),
                width,
                fallback: fallback.as_deref(),
            };
            commands::render::run(&app, &options).await?;
        }

        Commands::Serve {
            port,
            ip,
            open,
            watch,
        } => {
            let app = Dyncontent::new(&base_dir)?;
            let options = commands::serve::ServeOptions {
                ip,
                port,
                watch,
                open,
            };
            commands::serve::run(&app, options).await?;
        }

        Commands::Blocks { action } => {
            let app = Dyncontent::new(&base_dir)?;
            match action {
                BlockAction::List { page } => {
                    commands::blocks::list(&app, page.as_deref()).await?
                }
                BlockAction::Delete { id } => commands::blocks::delete(&app, &id).await?,
                BlockAction::Enable { id } => {
                    commands::blocks::set_active(&app, &id, true).await?
                }
                BlockAction::Disable { id } => {
                    commands::blocks::set_active(&app, &id, false).await?
                }
            }
        }

        Commands::Plugins { action } => {
            let app = Dyncontent::new(&base_dir)?;
            match action {
                PluginAction::List => commands::plugins::list(&app).await?,
            }
        }

        Commands::Upload { file } => {
            let app = Dyncontent::new(&base_dir)?;
            commands::upload::run(&app, &file).await?;
        }

        Commands::Login { token, expires_in } => {
            let app = Dyncontent::new(&base_dir)?;
            commands::login::login(&app, &token, expires_in).await?;
        }

        Commands::Logout => {
            let app = Dyncontent::new(&base_dir)?;
            commands::login::logout(&app)?;
        }

        Commands::Version => {
            println!("dyncontent version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
