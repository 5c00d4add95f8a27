//! Request parameters for one POWER daily point query.

use crate::types::observation::LonLat;
use crate::utils::format_power_date;
use bon::bon;
use chrono::{NaiveDate, Utc};

pub const TEMPERATURE_PARAMETER: &str = "T2M";
pub const PRECIPITATION_PARAMETER: &str = "PRECTOTCORR";
pub const DEFAULT_PARAMETERS: [&str; 2] = [TEMPERATURE_PARAMETER, PRECIPITATION_PARAMETER];

/// POWER user community; selects the units of the returned parameters.
const COMMUNITY: &str = "AG";

/// Earliest day of the POWER daily archive.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1981, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// A daily time series request for a single coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRequest {
    pub location: LonLat,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub parameters: Vec<String>,
}

#[bon]
impl PointRequest {
    /// Creates a request for `location`.
    ///
    /// * `.start(NaiveDate)`: Optional. Defaults to 1981-01-01.
    /// * `.end(NaiveDate)`: Optional. Defaults to today (UTC).
    /// * `.parameters(Vec<String>)`: Optional. Defaults to `T2M` and `PRECTOTCORR`.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use powercast::{LonLat, PointRequest};
    ///
    /// let request = PointRequest::builder()
    ///     .location(LonLat(-80.25, 43.55))
    ///     .start(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
    ///     .end(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap())
    ///     .build();
    /// assert_eq!(request.parameters, ["T2M", "PRECTOTCORR"]);
    /// ```
    #[builder]
    pub fn new(
        location: LonLat,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        parameters: Option<Vec<String>>,
    ) -> Self {
        Self {
            location,
            start: start.unwrap_or_else(default_start_date),
            end: end.unwrap_or_else(|| Utc::now().date_naive()),
            parameters: parameters
                .unwrap_or_else(|| DEFAULT_PARAMETERS.iter().map(|p| p.to_string()).collect()),
        }
    }
}

impl PointRequest {
    /// Same dates and parameters, another coordinate.
    pub fn at(&self, location: LonLat) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }

    /// Deterministic cache file name built from every request input.
    pub fn cache_key(&self) -> String {
        format!(
            "power_lon{}_lat{}_start{}_end{}_par{}.json",
            self.location.lon(),
            self.location.lat(),
            format_power_date(self.start),
            format_power_date(self.end),
            self.parameters.join("-"),
        )
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("start", format_power_date(self.start)),
            ("end", format_power_date(self.end)),
            ("longitude", self.location.lon().to_string()),
            ("latitude", self.location.lat().to_string()),
            ("community", COMMUNITY.to_string()),
            ("format", "JSON".to_string()),
            ("time-standard", "UTC".to_string()),
            ("parameters", self.parameters.join(",")),
        ]
    }
}
