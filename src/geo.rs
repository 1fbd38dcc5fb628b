//! Customer locations by postal-code prefix

use polars::prelude::*;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::schema::{
    CUSTOMERS, CUSTOMER_STATE, CUSTOMER_ZIP_PREFIX, GEOLOCATION, GEO_LAT, GEO_LNG, GEO_ZIP_PREFIX,
};

/// Upper bound on the points handed to the presentation layer
pub const DEFAULT_GEO_CAP: usize = 10_000;

const CUSTOMER_ROW: &str = "__customer_row";
const GEO_ROW: &str = "__geo_row";

/// A distinct (region, coordinate) combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub region: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCount {
    pub region: String,
    pub count: usize,
}

/// Points and per-region totals of one geo join
#[derive(Debug, Clone, Serialize)]
pub struct GeoDistribution {
    /// Deduplicated points, truncated to `cap`
    pub points: Vec<GeoPoint>,
    /// Counts over every deduplicated point, most frequent first
    pub regions: Vec<RegionCount>,
    /// Distinct points before the cap was applied
    pub total_points: usize,
    pub cap: usize,
}

impl GeoDistribution {
    pub fn is_truncated(&self) -> bool {
        self.total_points > self.points.len()
    }
}

/// Join customers to geolocation rows on postal-code prefix
///
/// Matches come out in customer row order, then geolocation row order. Rows
/// missing a region or coordinate are dropped, exact duplicates collapse to
/// their first occurrence, and only the first `cap` points are kept.
/// Region counts cover the full deduplicated set.
pub fn geo_join(customers: &DataFrame, geo: &DataFrame, cap: usize) -> Result<GeoDistribution> {
    if cap == 0 {
        return Err(Error::InvalidParameter("geo point cap must be positive".to_string()));
    }
    require_columns(customers, CUSTOMERS, &[CUSTOMER_ZIP_PREFIX, CUSTOMER_STATE])?;
    require_columns(geo, GEOLOCATION, &[GEO_ZIP_PREFIX, GEO_LAT, GEO_LNG])?;

    let distinct = customers
        .with_row_index(CUSTOMER_ROW, None)?
        .lazy()
        .join(
            geo.with_row_index(GEO_ROW, None)?.lazy(),
            [col(CUSTOMER_ZIP_PREFIX)],
            [col(GEO_ZIP_PREFIX)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort_by_exprs([col(CUSTOMER_ROW), col(GEO_ROW)], SortMultipleOptions::default())
        .select([
            col(CUSTOMER_STATE).cast(DataType::String),
            col(GEO_LAT).cast(DataType::Float64),
            col(GEO_LNG).cast(DataType::Float64),
        ])
        .filter(
            col(CUSTOMER_STATE)
                .is_not_null()
                .and(col(GEO_LAT).is_not_null())
                .and(col(GEO_LNG).is_not_null()),
        )
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    let regions = count_regions(&distinct)?;
    let total_points = distinct.height();
    let points = extract_points(&distinct.head(Some(cap)))?;

    tracing::info!(
        points = points.len(),
        total_points,
        regions = regions.len(),
        cap,
        "geo distribution computed"
    );

    Ok(GeoDistribution {
        points,
        regions,
        total_points,
        cap,
    })
}

fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|name| df.column(name).is_err()) {
        Some(missing) => Err(Error::SchemaMismatch {
            table: table.to_string(),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

/// Count points per region, by count descending then region ascending
fn count_regions(points: &DataFrame) -> Result<Vec<RegionCount>> {
    let counts = points
        .clone()
        .lazy()
        .group_by([col(CUSTOMER_STATE)])
        .agg([col(GEO_LAT).count().cast(DataType::UInt64).alias("count")])
        .collect()?;

    let names = counts.column(CUSTOMER_STATE)?.str()?;
    let totals = counts.column("count")?.u64()?;

    let mut regions: Vec<RegionCount> = names
        .into_iter()
        .zip(totals.into_iter())
        .filter_map(|(region, count)| match (region, count) {
            (Some(region), Some(count)) => Some(RegionCount {
                region: region.to_string(),
                count: count as usize,
            }),
            _ => None,
        })
        .collect();

    regions.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.region.cmp(&b.region)));
    Ok(regions)
}

fn extract_points(df: &DataFrame) -> Result<Vec<GeoPoint>> {
    let regions = df.column(CUSTOMER_STATE)?.str()?;
    let lats = df.column(GEO_LAT)?.f64()?;
    let lngs = df.column(GEO_LNG)?.f64()?;

    Ok(regions
        .into_iter()
        .zip(lats.into_iter())
        .zip(lngs.into_iter())
        .filter_map(|((region, lat), lng)| {
            Some(GeoPoint {
                region: region?.to_string(),
                lat: lat?,
                lng: lng?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customers() -> DataFrame {
        df!(
            "customer_id" => ["c1", "c2", "c3", "c4"],
            "customer_zip_code_prefix" => [100i64, 200, 300, 999],
            "customer_state" => ["CA", "NY", "CA", "TX"]
        )
        .unwrap()
    }

    fn geolocation() -> DataFrame {
        df!(
            "geolocation_zip_code_prefix" => [100i64, 100, 200, 200, 300],
            "geolocation_lat" => [1.0, 1.0, 5.0, 6.0, 3.0],
            "geolocation_lng" => [2.0, 2.0, 5.0, 6.0, 4.0]
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_coordinates_collapse() {
        let customers = df!(
            "id" => [1i64],
            "customer_zip_code_prefix" => [100i64],
            "customer_state" => ["CA"]
        )
        .unwrap();
        let geo = df!(
            "geolocation_zip_code_prefix" => [100i64, 100],
            "geolocation_state" => ["CA", "CA"],
            "geolocation_lat" => [1.0, 1.0],
            "geolocation_lng" => [2.0, 2.0]
        )
        .unwrap();

        let result = geo_join(&customers, &geo, DEFAULT_GEO_CAP).unwrap();
        assert_eq!(
            result.points,
            vec![GeoPoint { region: "CA".to_string(), lat: 1.0, lng: 2.0 }]
        );
        assert_eq!(result.regions, vec![RegionCount { region: "CA".to_string(), count: 1 }]);
    }

    #[test]
    fn test_points_follow_customer_order() {
        let result = geo_join(&customers(), &geolocation(), DEFAULT_GEO_CAP).unwrap();

        let coords: Vec<(&str, f64, f64)> = result
            .points
            .iter()
            .map(|p| (p.region.as_str(), p.lat, p.lng))
            .collect();
        assert_eq!(
            coords,
            vec![("CA", 1.0, 2.0), ("NY", 5.0, 5.0), ("NY", 6.0, 6.0), ("CA", 3.0, 4.0)]
        );
    }

    #[test]
    fn test_unmatched_prefix_is_dropped() {
        let result = geo_join(&customers(), &geolocation(), DEFAULT_GEO_CAP).unwrap();

        assert_eq!(result.total_points, 4);
        assert!(result.points.iter().all(|p| p.region != "TX"));
        assert!(!result.is_truncated());
    }

    #[test]
    fn test_region_counts_sorted() {
        let result = geo_join(&customers(), &geolocation(), DEFAULT_GEO_CAP).unwrap();

        // CA: (1,2) and (3,4); NY: (5,5) and (6,6) -> tie broken by name
        assert_eq!(
            result.regions,
            vec![
                RegionCount { region: "CA".to_string(), count: 2 },
                RegionCount { region: "NY".to_string(), count: 2 },
            ]
        );
    }

    #[test]
    fn test_cap_keeps_leading_points() {
        let result = geo_join(&customers(), &geolocation(), 2).unwrap();

        assert_eq!(result.points.len(), 2);
        assert_eq!(result.total_points, 4);
        assert!(result.is_truncated());

        let uncapped = geo_join(&customers(), &geolocation(), DEFAULT_GEO_CAP).unwrap();
        assert_eq!(result.points[..], uncapped.points[..2]);
        assert_eq!(result.regions, uncapped.regions);
    }

    #[test]
    fn test_zero_cap_rejected() {
        assert!(matches!(
            geo_join(&customers(), &geolocation(), 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_prefix_column() {
        let geo = geolocation().drop("geolocation_zip_code_prefix").unwrap();

        match geo_join(&customers(), &geo, DEFAULT_GEO_CAP) {
            Err(Error::SchemaMismatch { table, column }) => {
                assert_eq!(table, GEOLOCATION);
                assert_eq!(column, GEO_ZIP_PREFIX);
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }
}
