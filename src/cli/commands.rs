use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "access-warden")]
#[command(about = "Admin console and expiration sweeper for user access records")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all users with their current status
    List {
        /// Filter by status (active, expired, no_access, all)
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Run a single expiration sweep across both partitions
    Sweep {
        /// Stage and count, but don't write anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show accesses expiring within the horizon
    Upcoming {
        /// Horizon in days
        #[arg(short, long, default_value = "3")]
        days: i64,
    },

    /// Run the periodic sweep service until interrupted
    Auto {
        /// Sweep interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stage and count, but don't write anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show directory statistics
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Create a new user with access granted
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address (uniqueness key)
        #[arg(short, long)]
        email: String,

        /// Plan code (1, 3, 7, 14, 30, permanent)
        #[arg(short, long)]
        plan: String,
    },

    /// Change a user's plan, resetting access and expiration
    Grant {
        /// Email of the user
        email: String,

        /// Plan code (1, 3, 7, 14, 30, permanent)
        #[arg(short, long)]
        plan: String,
    },

    /// Change a user's display name
    Rename {
        /// Email of the user
        email: String,

        /// New display name
        #[arg(short, long)]
        name: String,
    },

    /// Remove a user's access (keeps the record)
    Revoke {
        /// Email of the user
        email: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Initialize the database and show the configuration
    Init,
}
