//! shoplens: customer segmentation and geo distribution over e-commerce CSV datasets
//!
//! Tables are discovered and cached by the [`registry`], combined by the
//! [`join`] and [`aggregate`] engines, clustered with K-Means in [`model`]
//! and mapped to coordinates in [`geo`]. The [`pipeline`] module wires these
//! into the analyses a presentation layer renders.

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod geo;
pub mod join;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod schema;

// Re-export public items for easier access
pub use aggregate::{aggregate_spending, CustomerSpending};
pub use cli::Args;
pub use error::{Error, Result};
pub use geo::{geo_join, GeoDistribution, GeoPoint, RegionCount, DEFAULT_GEO_CAP};
pub use join::{join, JoinSpec, JoinStep};
pub use model::{cluster, ClusterAssignment, Clustering};
pub use pipeline::{
    cluster_payments, geo_distribution, overview, segment_customers, SegmentedCustomer,
    TableOverview,
};
pub use registry::{Catalog, DatasetRegistry, SkippedFile};
