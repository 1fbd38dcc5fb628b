//! shoplens: thin entry point over the segmentation and geo pipelines
//!
//! Scans the dataset directory, runs the requested analysis and prints the
//! resulting records as text or JSON.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use shoplens::cli::Command;
use shoplens::{pipeline, Args, Catalog, DatasetRegistry};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let start_time = Instant::now();
    let catalog = DatasetRegistry::global()
        .get_or_load(&args.dir)
        .with_context(|| format!("no datasets available in {}", args.dir.display()))?;

    match &args.command {
        Command::Tables => run_tables(&args, &catalog)?,
        Command::Overview { table } => {
            let df = lookup(&catalog, table)?;
            emit(&args, &pipeline::overview(df), |summary| {
                println!("Rows: {}", summary.rows);
                println!("Columns: {}", summary.columns);
                println!("Missing values: {}", summary.missing);
                println!("Numeric columns: {}", summary.numeric_columns.join(", "));
            })?;
        }
        Command::Cluster { table, clusters } => {
            let df = lookup(&catalog, table)?;
            let clustering = pipeline::cluster_payments(df, *clusters)?;
            emit(&args, &clustering, |clustering| {
                println!("=== Cluster Statistics ===");
                let total = clustering.assignments.len();
                for (i, &size) in clustering.cluster_sizes().iter().enumerate() {
                    let percentage = (size as f64 / total as f64) * 100.0;
                    println!(
                        "Cluster {}: {} rows ({:.1}%), centroid {:.2}",
                        i, size, percentage, clustering.centroids[i]
                    );
                }
                println!("Within-cluster sum of squares: {:.2}", clustering.inertia);
            })?;
        }
        Command::Segment { clusters } => {
            let segmented = pipeline::segment_customers(&catalog, *clusters)?;
            emit(&args, &segmented, |segmented| {
                println!("{:<34} {:>14} {:>8}", "customer_id", "total_spending", "cluster");
                for customer in segmented {
                    println!(
                        "{:<34} {:>14.2} {:>8}",
                        customer.customer_id, customer.total_spending, customer.cluster
                    );
                }
            })?;
        }
        Command::Geo { cap } => {
            let distribution = pipeline::geo_distribution(&catalog, *cap)?;
            emit(&args, &distribution, |distribution| {
                println!("{:<8} {:>14}", "State", "Total Customer");
                for region in &distribution.regions {
                    println!("{:<8} {:>14}", region.region, region.count);
                }
                println!(
                    "\n{} of {} distinct locations reported",
                    distribution.points.len(),
                    distribution.total_points
                );
            })?;
        }
    }

    tracing::debug!(elapsed_s = start_time.elapsed().as_secs_f64(), "done");
    Ok(())
}

fn run_tables(args: &Args, catalog: &Catalog) -> Result<()> {
    let names: Vec<&str> = catalog.names().collect();
    emit(args, &names, |names| {
        if names.is_empty() {
            println!("No CSV files found in {}", catalog.dir().display());
        }
        for name in names {
            println!("{}", name);
        }
        for skipped in catalog.skipped() {
            println!("skipped {}: {}", skipped.file, skipped.reason);
        }
    })
}

fn lookup<'a>(catalog: &'a Catalog, table: &str) -> Result<&'a polars::prelude::DataFrame> {
    Ok(catalog.require(&[table])?[0])
}

/// Print `value` as JSON when requested, otherwise through `text`
fn emit<T: Serialize + ?Sized>(args: &Args, value: &T, text: impl FnOnce(&T)) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text(value);
    }
    Ok(())
}
