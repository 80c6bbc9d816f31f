//! Dirq - LDAP user and group lookups from the command line

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandContext;
use dirq_core::SearchScope;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirq")]
#[command(author = "Dirq Team")]
#[command(version = dirq_core::VERSION)]
#[command(about = "Query LDAP directories for users and groups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (default: ~/.dirq/config.toml)
    #[arg(short, long, global = true, env = "DIRQ_CONFIG")]
    config: Option<PathBuf>,

    /// Named server from [ldap.servers]
    #[arg(short, long, global = true, env = "DIRQ_SERVER")]
    server: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Find users by name pattern or DN
    Users {
        /// Username pattern (`*` wildcards allowed) or DN with --by-dn
        pattern: String,

        /// Attribute matched against the pattern
        #[arg(long)]
        attr: Option<String>,

        /// Attribute reported as the username
        #[arg(long)]
        name_attr: Option<String>,

        /// Base user filter
        #[arg(long)]
        filter: Option<String>,

        /// Treat the pattern as a distinguished name
        #[arg(long)]
        by_dn: bool,

        /// Search scope (base, one, subtree)
        #[arg(long, default_value = "subtree")]
        scope: SearchScope,
    },

    /// Find groups by name pattern or DN
    Groups {
        /// Group name pattern or DN with --by-dn
        pattern: String,

        #[arg(long)]
        attr: Option<String>,

        #[arg(long)]
        name_attr: Option<String>,

        /// Attribute holding member DNs
        #[arg(long)]
        member_attr: Option<String>,

        #[arg(long)]
        filter: Option<String>,

        #[arg(long)]
        by_dn: bool,

        #[arg(long, default_value = "subtree")]
        scope: SearchScope,
    },

    /// List users that are members of a group
    GroupUsers {
        /// Group distinguished name
        dn: String,
    },

    /// List groups nested in a group
    GroupGroups {
        /// Group distinguished name
        dn: String,
    },

    /// Connect, bind and show server information
    Check,

    /// Show the resolved configuration
    Config,
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let settings = config::load(cli.config.as_deref())?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    init_logging(&level, &settings.logging.format);

    let ctx = CommandContext {
        settings,
        server: cli.server,
        output_format: cli.output,
    };

    match cli.command {
        Commands::Users {
            pattern,
            attr,
            name_attr,
            filter,
            by_dn,
            scope,
        } => {
            let query = dirq_ldap::UserQuery {
                search_attr: attr,
                user_name_attr: name_attr,
                user_filter: filter,
                find_by_dn: by_dn,
                scope,
            };
            commands::users::execute(&ctx, &pattern, &query).await?;
        }
        Commands::Groups {
            pattern,
            attr,
            name_attr,
            member_attr,
            filter,
            by_dn,
            scope,
        } => {
            let query = dirq_ldap::GroupQuery {
                search_attr: attr,
                group_name_attr: name_attr,
                group_member_attr: member_attr,
                group_filter: filter,
                find_by_dn: by_dn,
                scope,
            };
            commands::groups::execute(&ctx, &pattern, &query).await?;
        }
        Commands::GroupUsers { dn } => {
            commands::members::users_of_group(&ctx, &dn).await?;
        }
        Commands::GroupGroups { dn } => {
            commands::members::groups_of_group(&ctx, &dn).await?;
        }
        Commands::Check => {
            commands::check::execute(&ctx).await?;
        }
        Commands::Config => {
            commands::config::execute(&ctx)?;
        }
    }

    Ok(())
}
