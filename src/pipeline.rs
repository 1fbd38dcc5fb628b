//! The analyses the dashboard exposes, wired from the engines
//!
//! Each function takes its inputs as plain parameters and recomputes its
//! result from the catalog on every call.

use polars::prelude::*;
use serde::Serialize;

use crate::aggregate::{aggregate_spending, CustomerSpending};
use crate::error::Result;
use crate::geo::{geo_join, GeoDistribution};
use crate::join::{join, JoinSpec, JoinStep};
use crate::model::{cluster, Clustering};
use crate::registry::Catalog;
use crate::schema::{
    CUSTOMERS, CUSTOMER_ID, GEOLOCATION, ORDERS, ORDER_ID, PAYMENTS, PAYMENT_VALUE,
    TOTAL_SPENDING,
};

/// Shape and completeness of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOverview {
    pub rows: usize,
    pub columns: usize,
    /// Null cells across every column
    pub missing: usize,
    pub numeric_columns: Vec<String>,
}

/// A customer's total spend together with its segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentedCustomer {
    pub customer_id: String,
    pub total_spending: f64,
    pub cluster: usize,
}

pub fn overview(table: &DataFrame) -> TableOverview {
    let columns = table.get_columns();
    TableOverview {
        rows: table.height(),
        columns: table.width(),
        missing: columns.iter().map(|s| s.null_count()).sum(),
        numeric_columns: columns
            .iter()
            .filter(|s| s.dtype().is_numeric())
            .map(|s| s.name().to_string())
            .collect(),
    }
}

/// Cluster the payment values of a single selected table
pub fn cluster_payments(table: &DataFrame, k: usize) -> Result<Clustering> {
    cluster(table, PAYMENT_VALUE, k)
}

/// orders ⋈ payments on order id, then ⋈ customers on customer id
pub fn segmentation_join_spec() -> JoinSpec {
    JoinSpec::new(vec![
        JoinStep::on(ORDERS, PAYMENTS, ORDER_ID),
        JoinStep::on(ORDERS, CUSTOMERS, CUSTOMER_ID),
    ])
}

/// Total spend per customer over the joined orders, payments and customers
pub fn customer_spending(catalog: &Catalog) -> Result<Vec<CustomerSpending>> {
    let joined = join(
        catalog,
        &[ORDERS, PAYMENTS, CUSTOMERS],
        &segmentation_join_spec(),
    )?;
    aggregate_spending(&joined, CUSTOMER_ID, PAYMENT_VALUE)
}

/// Segment customers into `k` groups by total spend
pub fn segment_customers(catalog: &Catalog, k: usize) -> Result<Vec<SegmentedCustomer>> {
    let spending = customer_spending(catalog)?;

    let totals: Vec<f64> = spending.iter().map(|s| s.total_spending).collect();
    let features = DataFrame::new(vec![Series::new(TOTAL_SPENDING, totals)])?;
    let clustering = cluster(&features, TOTAL_SPENDING, k)?;

    let segmented: Vec<SegmentedCustomer> = clustering
        .assignments
        .iter()
        .map(|assignment| {
            let customer = &spending[assignment.row];
            SegmentedCustomer {
                customer_id: customer.customer_id.clone(),
                total_spending: customer.total_spending,
                cluster: assignment.label,
            }
        })
        .collect();

    tracing::info!(
        customers = segmented.len(),
        k,
        sizes = ?clustering.cluster_sizes(),
        "customer segmentation complete"
    );

    Ok(segmented)
}

/// Customer locations and per-region counts
pub fn geo_distribution(catalog: &Catalog, cap: usize) -> Result<GeoDistribution> {
    let tables = catalog.require(&[CUSTOMERS, GEOLOCATION])?;
    geo_join(tables[0], tables[1], cap)
}
