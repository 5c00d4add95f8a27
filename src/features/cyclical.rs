//! Encodes the day of year as a point on the unit circle.

use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

/// Divisor of the day-of-year angle. Leap days (ordinal 366) wrap slightly past a full turn.
pub const YEAR_LENGTH_DAYS: f64 = 365.0;

pub fn day_of_year_angle(date: NaiveDate) -> f64 {
    2.0 * PI * f64::from(date.ordinal()) / YEAR_LENGTH_DAYS
}

/// `(sin, cos)` of the day-of-year angle.
pub fn encode_day_of_year(date: NaiveDate) -> (f64, f64) {
    day_of_year_angle(date).sin_cos()
}
