//! Command-line surface for haulboard.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Track delivery jobs through their dispatch lifecycle.
#[derive(Debug, Parser)]
#[command(name = "haulboard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Job store file (overrides `store_path` in haulboard.toml).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Only allow status changes that move forward.
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Print records as JSON instead of tables.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new scheduled job.
    Add {
        #[arg(long)]
        reference: String,
        #[arg(long)]
        customer: String,
        #[arg(long)]
        driver: String,
        /// Collection address.
        #[arg(long = "from")]
        collection_address: String,
        /// Delivery address.
        #[arg(long = "to")]
        delivery_address: String,
        /// Collection time, e.g. "2026-03-01 09:00" or RFC 3339.
        #[arg(long = "at")]
        collection_time: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all jobs by collection time.
    List,

    /// Show a single job.
    Show { id: String },

    /// Move a job to a new status, e.g. "Loaded" or "En route to delivery".
    Status { id: String, status: String },

    /// Replace a job's notes.
    Notes { id: String, text: String },

    /// Correct one of the job's timestamps by hand.
    Timestamp {
        id: String,
        /// One of collectionTime, timeEnRouteToCollection, timeArrivedAtCollection,
        /// timeLoaded, timeEnRouteToDelivery, timeArrivedAtDelivery, timeCompleted.
        field: String,
        time: String,
    },

    /// Fetch a live ETA for a job.
    Eta { id: String },

    /// Import jobs from a CSV file.
    Import {
        file: PathBuf,
        /// Delete all existing jobs before importing.
        #[arg(long, default_value_t = false)]
        replace: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_add_subcommand() {
        let cli = Cli::parse_from([
            "haulboard",
            "add",
            "--reference",
            "J-1",
            "--customer",
            "Acme",
            "--driver",
            "Sam",
            "--from",
            "1 Dock Road",
            "--to",
            "9 High Street",
            "--at",
            "2026-03-01 09:00",
        ]);
        match cli.command {
            Command::Add {
                reference,
                collection_address,
                notes,
                ..
            } => {
                assert_eq!(reference, "J-1");
                assert_eq!(collection_address, "1 Dock Road");
                assert!(notes.is_none());
            }
            _ => panic!("expected Add command"),
        }
    }

    #[test]
    fn cli_parses_status_with_spaces() {
        let cli = Cli::parse_from(["haulboard", "status", "abc", "En route to delivery"]);
        match cli.command {
            Command::Status { id, status } => {
                assert_eq!(id, "abc");
                assert_eq!(status, "En route to delivery");
            }
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "haulboard",
            "--store",
            "/tmp/jobs.json",
            "--strict",
            "-v",
            "import",
            "jobs.csv",
            "--replace",
        ]);
        assert!(cli.verbose);
        assert!(cli.strict);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/jobs.json")));
        assert!(matches!(cli.command, Command::Import { replace: true, .. }));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
