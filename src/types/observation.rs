//! Point observations as returned by the POWER daily point API.

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A geographical coordinate in degrees, longitude first.
///
/// POWER addresses points by `longitude, latitude`, so the coordinate keeps that order:
/// index 0 is the longitude and index 1 the latitude.
///
/// # Examples
///
/// ```
/// use powercast::LonLat;
///
/// let guelph = LonLat(-80.25, 43.55);
/// assert_eq!(guelph.lon(), -80.25);
/// assert_eq!(guelph.lat(), 43.55);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat(pub f64, pub f64);

/// Totally ordered `(lon, lat)` pair, usable as a map key.
pub type LocationKey = (OrderedFloat<f64>, OrderedFloat<f64>);

impl LonLat {
    pub fn lon(&self) -> f64 {
        self.0
    }

    pub fn lat(&self) -> f64 {
        self.1
    }

    pub fn key(&self) -> LocationKey {
        (OrderedFloat(self.0), OrderedFloat(self.1))
    }
}

/// One day of data at one grid point. Keyed by `(location, date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location: LonLat,
    pub date: NaiveDate,
    /// Air temperature at 2 m (`T2M`, °C).
    pub t2m: Option<f64>,
    /// Bias-corrected total precipitation (`PRECTOTCORR`, mm/day).
    pub precip: Option<f64>,
}

impl Observation {
    pub fn new(location: LonLat, date: NaiveDate, t2m: Option<f64>, precip: Option<f64>) -> Self {
        Self {
            location,
            date,
            t2m,
            precip,
        }
    }
}
