//! # Webstash CLI (`stash`)
//!
//! Save notes and links, browse them by tag and text, and ask grounded
//! questions over the current filtered view.
//!
//! ## Usage
//!
//! ```bash
//! stash --config ./config/stash.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stash init` | Create the SQLite database and schema |
//! | `stash save <content>` | Save a note, link or media URL |
//! | `stash list [query]` | List items grouped by day |
//! | `stash delete <id>` | Delete an item |
//! | `stash export` | Export every item as JSON |
//! | `stash params` | Show the model's sampling parameters |
//! | `stash ask "<question>"` | Ask one question over the filtered view |
//! | `stash chat` | Interactive questions over one session |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

use webstash::ask::{self, AskOptions};
use webstash::{browse, config, export, migrate, telemetry};
use webstash_core::filter::SortOrder;

/// Webstash CLI: a local-first stash with grounded questions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "stash",
    about = "Webstash: save notes and links, then ask questions about what you see",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/stash.toml")]
    config: PathBuf,

    /// Log debug output to stderr (`RUST_LOG` overrides).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Save an item.
    ///
    /// The type (note, link, image, video) is derived from the content.
    Save {
        /// Text or URL to save.
        content: String,

        /// Optional title.
        #[arg(long)]
        title: Option<String>,

        /// Tags separated by spaces or commas; a leading `#` is optional.
        #[arg(long)]
        tags: Option<String>,
    },

    /// List items matching a query, grouped by day.
    ///
    /// The item must carry at least one of the `#word` terms as a tag, and
    /// the remaining text must appear in its title, content or tags.
    List {
        /// Filter query, e.g. `"#space launch"`.
        #[arg(default_value = "")]
        query: String,

        /// Sort order: `newest`, `oldest`, or `title`.
        #[arg(long, default_value = "newest")]
        order: SortOrder,

        /// Print the view as a JSON array.
        #[arg(long)]
        json: bool,
    },

    /// Delete an item by id.
    Delete {
        /// Item id.
        id: String,
    },

    /// Export every item as JSON.
    Export {
        /// Output file or directory. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show advertised and effective sampling parameters.
    Params,

    /// Ask a question over the filtered view.
    Ask {
        /// The question.
        question: String,

        /// Filter query selecting the items the model sees.
        #[arg(long)]
        query: Option<String>,

        /// Sort order of the view: `newest`, `oldest`, or `title`.
        #[arg(long)]
        order: Option<SortOrder>,

        /// Sampling temperature, clamped to [0, 2].
        #[arg(long)]
        temperature: Option<f64>,

        /// Top-K sampling cutoff, clamped to [1, max].
        #[arg(long)]
        top_k: Option<u32>,

        /// Print the normalized reply as JSON instead of cards.
        #[arg(long)]
        raw: bool,
    },

    /// Ask several questions over one session.
    Chat {
        /// Initial filter query.
        #[arg(long)]
        query: Option<String>,

        /// Initial sort order.
        #[arg(long)]
        order: Option<SortOrder>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    });

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Save {
            content,
            title,
            tags,
        } => {
            browse::run_save(&cfg, &content, title.as_deref(), tags.as_deref()).await?;
        }
        Commands::List { query, order, json } => {
            browse::run_list(&cfg, &query, order, json).await?;
        }
        Commands::Delete { id } => {
            browse::run_delete(&cfg, &id).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Params => {
            ask::run_params(&cfg).await?;
        }
        Commands::Ask {
            question,
            query,
            order,
            temperature,
            top_k,
            raw,
        } => {
            let opts = AskOptions {
                query,
                order,
                temperature,
                top_k,
                raw,
            };
            ask::run_ask(&cfg, &question, &opts).await?;
        }
        Commands::Chat { query, order } => {
            ask::run_chat(&cfg, query.as_deref(), order).await?;
        }
    }

    Ok(())
}
