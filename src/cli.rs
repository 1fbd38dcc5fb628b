//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::geo::DEFAULT_GEO_CAP;
use crate::model::{DEFAULT_CLUSTERS, MAX_CLUSTERS, MIN_CLUSTERS};

/// Segmentation and geo analysis over a directory of e-commerce CSV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory scanned for CSV datasets
    #[arg(short, long, global = true, default_value = ".")]
    pub dir: PathBuf,

    /// Print results as pretty JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the tables found in the directory
    Tables,

    /// Row, column and missing-value counts of one table
    Overview {
        /// Table name, e.g. orders_dataset.csv
        table: String,
    },

    /// Cluster the payment_value column of one table
    Cluster {
        table: String,

        /// Number of clusters
        #[arg(short = 'k', long, default_value_t = DEFAULT_CLUSTERS, value_parser = parse_clusters)]
        clusters: usize,
    },

    /// Segment customers by total spending
    Segment {
        /// Number of clusters
        #[arg(short = 'k', long, default_value_t = DEFAULT_CLUSTERS, value_parser = parse_clusters)]
        clusters: usize,
    },

    /// Customer locations and counts per state
    Geo {
        /// Maximum number of points reported
        #[arg(long, default_value_t = DEFAULT_GEO_CAP)]
        cap: usize,
    },
}

fn parse_clusters(raw: &str) -> Result<usize, String> {
    let k: usize = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid cluster count: {}", raw))?;
    if !(MIN_CLUSTERS..=MAX_CLUSTERS).contains(&k) {
        return Err(format!(
            "cluster count must be between {} and {}",
            MIN_CLUSTERS, MAX_CLUSTERS
        ));
    }
    Ok(k)
}
