//! Per-customer spending totals

use polars::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::TOTAL_SPENDING;

/// Total spend of one customer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSpending {
    pub customer_id: String,
    pub total_spending: f64,
}

/// Group `joined` by `group_key` and sum `value_column` within each group
///
/// Missing values are left out of the sum, rows with a missing group key are
/// dropped, and groups come out in first-seen order.
pub fn aggregate_spending(
    joined: &DataFrame,
    group_key: &str,
    value_column: &str,
) -> Result<Vec<CustomerSpending>> {
    for column in [group_key, value_column] {
        if joined.column(column).is_err() {
            return Err(Error::column_not_found(column));
        }
    }

    let totals = joined
        .clone()
        .lazy()
        .filter(col(group_key).is_not_null())
        .select([
            col(group_key).cast(DataType::String),
            col(value_column).cast(DataType::Float64),
        ])
        .group_by_stable([col(group_key)])
        .agg([col(value_column).sum().alias(TOTAL_SPENDING)])
        .collect()?;

    let ids = totals.column(group_key)?.str()?;
    let sums = totals.column(TOTAL_SPENDING)?.f64()?;

    let spending: Vec<CustomerSpending> = ids
        .into_iter()
        .zip(sums.into_iter())
        .filter_map(|(id, total)| {
            id.map(|id| CustomerSpending {
                customer_id: id.to_string(),
                total_spending: total.unwrap_or(0.0),
            })
        })
        .collect();

    tracing::debug!(
        rows = joined.height(),
        customers = spending.len(),
        "aggregated spending"
    );

    Ok(spending)
}
