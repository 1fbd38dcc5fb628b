//! Ordered chains of inner equality joins across catalog tables

use polars::prelude::*;

use crate::error::{Error, Result};
use crate::registry::Catalog;

/// One equality join: `left.left_on == right.right_on`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub left: String,
    pub right: String,
    pub left_on: String,
    pub right_on: String,
}

impl JoinStep {
    pub fn new(left: &str, right: &str, left_on: &str, right_on: &str) -> Self {
        Self {
            left: left.to_string(),
            right: right.to_string(),
            left_on: left_on.to_string(),
            right_on: right_on.to_string(),
        }
    }

    /// Join on a key column that has the same name on both sides
    pub fn on(left: &str, right: &str, key: &str) -> Self {
        Self::new(left, right, key, key)
    }
}

/// Steps applied left to right; the first step's left table seeds the result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinSpec {
    pub steps: Vec<JoinStep>,
}

impl JoinSpec {
    pub fn new(steps: Vec<JoinStep>) -> Self {
        Self { steps }
    }

    /// Every table name the steps touch, in first-mention order
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for step in &self.steps {
            for name in [step.left.as_str(), step.right.as_str()] {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}

/// Verify `required` tables are present, then run the join chain
///
/// Missing tables are reported together before any join runs. With an empty
/// spec the first required table is returned unchanged.
pub fn join(catalog: &Catalog, required: &[&str], spec: &JoinSpec) -> Result<DataFrame> {
    let mut needed: Vec<&str> = required.to_vec();
    for name in spec.table_names() {
        if !needed.contains(&name) {
            needed.push(name);
        }
    }
    catalog.require(&needed)?;

    let Some(first) = spec.steps.first() else {
        return match required.first() {
            Some(name) => Ok(catalog.get(name).cloned().unwrap_or_default()),
            None => Ok(DataFrame::empty()),
        };
    };

    let mut combined = table(catalog, &first.left)?.clone();
    for step in &spec.steps {
        let right = table(catalog, &step.right)?;
        combined = join_step(combined, right, step)?;
    }

    Ok(combined)
}

fn table<'a>(catalog: &'a Catalog, name: &str) -> Result<&'a DataFrame> {
    catalog
        .get(name)
        .ok_or_else(|| Error::MissingTables(vec![name.to_string()]))
}

/// Inner-join `right` into the accumulated table
///
/// Null keys never match; duplicate keys fan out to the cross product.
pub fn join_step(left: DataFrame, right: &DataFrame, step: &JoinStep) -> Result<DataFrame> {
    if left.column(&step.left_on).is_err() {
        return Err(Error::SchemaMismatch {
            table: step.left.clone(),
            column: step.left_on.clone(),
        });
    }
    if right.column(&step.right_on).is_err() {
        return Err(Error::SchemaMismatch {
            table: step.right.clone(),
            column: step.right_on.clone(),
        });
    }

    let left_rows = left.height();
    let joined = left
        .lazy()
        .join(
            right.clone().lazy(),
            [col(&step.left_on)],
            [col(&step.right_on)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    tracing::debug!(
        left = %step.left,
        right = %step.right,
        left_rows,
        right_rows = right.height(),
        rows = joined.height(),
        "join step"
    );

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DatasetRegistry;
    use std::fs;
    use tempfile::TempDir;

    fn catalog_with(files: &[(&str, &str)]) -> (TempDir, std::sync::Arc<Catalog>) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let catalog = DatasetRegistry::new().load(dir.path()).unwrap();
        (dir, catalog)
    }

    fn orders_payments_spec() -> JoinSpec {
        JoinSpec::new(vec![JoinStep::on("orders.csv", "payments.csv", "order_id")])
    }

    #[test]
    fn test_missing_tables_are_named() {
        let (_dir, catalog) = catalog_with(&[("orders.csv", "order_id,customer_id\n1,a\n")]);

        let result = join(&catalog, &["orders.csv", "payments.csv"], &orders_payments_spec());
        match result {
            Err(Error::MissingTables(names)) => assert_eq!(names, vec!["payments.csv"]),
            other => panic!("expected MissingTables, got {:?}", other),
        }
    }

    #[test]
    fn test_fan_out_on_duplicate_keys() {
        let (_dir, catalog) = catalog_with(&[
            ("orders.csv", "order_id,customer_id\n1,a\n2,b\n"),
            ("payments.csv", "order_id,payment_value\n1,10.0\n1,5.0\n3,7.0\n"),
        ]);

        let joined = join(&catalog, &["orders.csv", "payments.csv"], &orders_payments_spec()).unwrap();
        assert_eq!(joined.height(), 2);
        assert!(joined.column("customer_id").is_ok());
        assert!(joined.column("payment_value").is_ok());
    }

    #[test]
    fn test_no_matching_keys_gives_empty_table() {
        let (_dir, catalog) = catalog_with(&[
            ("orders.csv", "order_id,customer_id\n1,a\n"),
            ("payments.csv", "order_id,payment_value\n2,10.0\n"),
        ]);

        let joined = join(&catalog, &["orders.csv", "payments.csv"], &orders_payments_spec()).unwrap();
        assert_eq!(joined.height(), 0);
    }

    #[test]
    fn test_missing_key_column() {
        let (_dir, catalog) = catalog_with(&[
            ("orders.csv", "order_id,customer_id\n1,a\n"),
            ("payments.csv", "order,payment_value\n1,10.0\n"),
        ]);

        match join(&catalog, &["orders.csv", "payments.csv"], &orders_payments_spec()) {
            Err(Error::SchemaMismatch { table, column }) => {
                assert_eq!(table, "payments.csv");
                assert_eq!(column, "order_id");
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_null_keys_never_match() {
        let left = df!(
            "k" => [Some(1i64), None],
            "l" => ["x", "y"]
        )
        .unwrap();
        let right = df!(
            "k" => [Some(1i64), None],
            "r" => ["p", "q"]
        )
        .unwrap();

        let joined = join_step(left, &right, &JoinStep::on("left", "right", "k")).unwrap();
        assert_eq!(joined.height(), 1);
    }

    #[test]
    fn test_spec_table_names_dedup() {
        let spec = JoinSpec::new(vec![
            JoinStep::on("a", "b", "id"),
            JoinStep::on("b", "c", "other"),
        ]);
        assert_eq!(spec.table_names(), vec!["a", "b", "c"]);
    }
}
