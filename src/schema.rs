//! Table and column names of the e-commerce dataset layout
//!
//! The derived analyses run over a fixed, caller-known schema: the file names
//! below are the keys the registry stores tables under.

pub const ORDERS: &str = "orders_dataset.csv";
pub const PAYMENTS: &str = "order_payments_dataset.csv";
pub const CUSTOMERS: &str = "customers_dataset.csv";
pub const GEOLOCATION: &str = "geolocation_dataset.csv";

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const PAYMENT_VALUE: &str = "payment_value";
pub const TOTAL_SPENDING: &str = "total_spending";

pub const CUSTOMER_ZIP_PREFIX: &str = "customer_zip_code_prefix";
pub const CUSTOMER_STATE: &str = "customer_state";
pub const GEO_ZIP_PREFIX: &str = "geolocation_zip_code_prefix";
pub const GEO_LAT: &str = "geolocation_lat";
pub const GEO_LNG: &str = "geolocation_lng";

/// Extensions the registry recognizes as tabular input
pub const TABULAR_EXTENSIONS: &[&str] = &["csv"];
