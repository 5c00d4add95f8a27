//! Typed view of the POWER daily point JSON body.

use crate::power::request::{PRECIPITATION_PARAMETER, TEMPERATURE_PARAMETER};
use crate::types::observation::{LonLat, Observation};
use crate::utils::parse_power_date;
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Value POWER writes for days it has no data for, unless the header says otherwise.
pub const DEFAULT_FILL_VALUE: f64 = -999.0;

/// `{header: {fill_value}, properties: {parameter: {<P>: {<date>: <value>}}}}`.
///
/// Every level is optional so that partial bodies parse to an empty series instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerResponse {
    #[serde(default)]
    pub header: Option<ResponseHeader>,
    #[serde(default)]
    pub properties: ResponseProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseHeader {
    #[serde(default)]
    pub fill_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseProperties {
    #[serde(default)]
    pub parameter: HashMap<String, BTreeMap<String, Option<f64>>>,
}

impl PowerResponse {
    fn fill_value(&self) -> f64 {
        self.header
            .as_ref()
            .and_then(|h| h.fill_value)
            .unwrap_or(DEFAULT_FILL_VALUE)
    }

    fn series(&self, parameter: &str) -> Option<&BTreeMap<String, Option<f64>>> {
        self.properties.parameter.get(parameter)
    }

    /// Merges the temperature and precipitation series into one row per date, sorted by date.
    ///
    /// A date present in only one series still yields a row, with the other value missing.
    /// Fill values and nulls become missing values; keys that are not dates are skipped.
    pub fn observations(&self, location: LonLat) -> Vec<Observation> {
        let empty = BTreeMap::new();
        let t2m = self.series(TEMPERATURE_PARAMETER).unwrap_or(&empty);
        let precip = self.series(PRECIPITATION_PARAMETER).unwrap_or(&empty);
        let fill = self.fill_value();
        let clean = |value: Option<&Option<f64>>| value.copied().flatten().filter(|v| *v != fill);

        let keys: BTreeSet<&String> = t2m.keys().chain(precip.keys()).collect();
        let mut rows: Vec<Observation> = keys
            .into_iter()
            .filter_map(|key| match parse_power_date(key) {
                Some(date) => Some(Observation::new(
                    location,
                    date,
                    clean(t2m.get(key)),
                    clean(precip.get(key)),
                )),
                None => {
                    warn!("Ignoring unparsable POWER date key '{}'", key);
                    None
                }
            })
            .collect();
        rows.sort_by_key(|r| r.date);
        rows
    }
}
