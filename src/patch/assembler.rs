//! Fetches every point of a grid around a center coordinate into one [`LongTable`].

use crate::patch::grid::grid_points;
use crate::power::client::{FetchSource, PointFetch, PowerClient};
use crate::power::error::FetchError;
use crate::power::request::PointRequest;
use crate::types::long_table::LongTable;
use crate::types::observation::LonLat;
use bon::bon;
use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::PolarsResult;
use std::time::Duration;

/// Pause between two network fetches, to stay under the upstream rate limit.
pub const DEFAULT_PAUSE: Duration = Duration::from_millis(100);
pub const DEFAULT_RADIUS_DEG: f64 = 0.1;
pub const DEFAULT_GRID_SIZE: usize = 3;

/// Anything that can produce the rows of one point.
pub trait PointSource {
    fn try_fetch_point(&self, request: &PointRequest) -> Result<PointFetch, FetchError>;
}

impl PointSource for PowerClient {
    fn try_fetch_point(&self, request: &PointRequest) -> Result<PointFetch, FetchError> {
        PowerClient::try_fetch_point(self, request)
    }
}

/// Sequentially fetches a grid of points from a [`PointSource`].
pub struct PatchAssembler<'a, S: PointSource> {
    source: &'a S,
    pause: Duration,
}

impl<'a, S: PointSource> PatchAssembler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            pause: DEFAULT_PAUSE,
        }
    }

    /// Overrides the pause slept after each network fetch.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
}

#[bon]
impl<'a, S: PointSource> PatchAssembler<'a, S> {
    /// Fetches a `grid_width × grid_height` patch centered on `center`.
    ///
    /// * `.center(LonLat)`: **Required.**
    /// * `.radius(f64)`: Optional grid spacing in degrees. Defaults to `0.1`.
    /// * `.grid_width(usize)` / `.grid_height(usize)`: Optional. Default to `3`.
    /// * `.start(NaiveDate)` / `.end(NaiveDate)` / `.parameters(Vec<String>)`: Optional,
    ///   forwarded to every [`PointRequest`].
    ///
    /// Points are fetched one after another. A point that fails or has no rows is logged and
    /// left out; the others are still returned. When no point yields anything the result is
    /// an empty table with the full column set.
    ///
    /// # Errors
    ///
    /// Only if the rows cannot be assembled into a frame.
    #[builder]
    pub fn fetch_patch(
        &self,
        center: LonLat,
        #[builder(default = DEFAULT_RADIUS_DEG)] radius: f64,
        #[builder(default = DEFAULT_GRID_SIZE)] grid_width: usize,
        #[builder(default = DEFAULT_GRID_SIZE)] grid_height: usize,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        parameters: Option<Vec<String>>,
    ) -> PolarsResult<LongTable> {
        let template = PointRequest::builder()
            .location(center)
            .maybe_start(start)
            .maybe_end(end)
            .maybe_parameters(parameters)
            .build();
        let points = grid_points(center, radius, grid_width, grid_height);
        let total = points.len();

        let mut rows = Vec::new();
        for (index, point) in points.into_iter().enumerate() {
            info!(
                "Fetching point {}/{}: lon={} lat={}",
                index + 1,
                total,
                point.lon(),
                point.lat()
            );
            let went_to_network = match self.source.try_fetch_point(&template.at(point)) {
                Ok(fetch) => {
                    if fetch.observations.is_empty() {
                        info!("No data for lon={} lat={}, skipping", point.lon(), point.lat());
                    }
                    rows.extend(fetch.observations.into_iter().map(|mut row| {
                        row.location = point;
                        row
                    }));
                    fetch.source == FetchSource::Network
                }
                Err(e) => {
                    warn!(
                        "Fetch failed for lon={} lat={}, skipping: {}",
                        point.lon(),
                        point.lat(),
                        e
                    );
                    true
                }
            };

            if went_to_network && index + 1 < total && !self.pause.is_zero() {
                std::thread::sleep(self.pause);
            }
        }

        info!("Fetched patch rows: {}", rows.len());
        LongTable::from_observations(&rows)
    }
}
