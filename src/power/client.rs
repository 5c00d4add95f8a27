//! This module provides `PowerClient`, the entry point for reading NASA POWER daily point
//! data. A client owns the HTTP session, the retry policy and the response cache; create one
//! per process and pass it to whatever needs to fetch.

use crate::error::PowercastError;
use crate::power::cache::ResponseCache;
use crate::power::error::FetchError;
use crate::power::request::PointRequest;
use crate::power::response::PowerResponse;
use crate::power::retry::{send_with_retry, RetryPolicy};
use crate::types::observation::Observation;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use log::{info, warn};
use reqwest::blocking::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const POWER_DAILY_POINT_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where the rows of a [`PointFetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
}

/// Rows for one point plus their origin.
#[derive(Debug, Clone)]
pub struct PointFetch {
    pub observations: Vec<Observation>,
    pub source: FetchSource,
}

/// Blocking client for the POWER daily point API.
///
/// # Examples
///
/// ```no_run
/// # use powercast::{LonLat, PointRequest, PowerClient, PowercastError};
/// # fn main() -> Result<(), PowercastError> {
/// let client = PowerClient::new()?;
/// let rows = client.fetch_point(&PointRequest::builder().location(LonLat(-80.25, 43.55)).build());
/// println!("Rows returned: {}", rows.len());
/// # Ok(())
/// # }
/// ```
pub struct PowerClient {
    http: Client,
    base_url: String,
    cache: Option<ResponseCache>,
    retry: RetryPolicy,
}

#[bon]
impl PowerClient {
    /// Creates a client caching into the default cache directory
    /// (e.g. `~/.cache/powercast_cache` on Linux).
    ///
    /// # Errors
    ///
    /// Returns [`PowercastError::CacheDirResolution`] if no cache directory exists on this
    /// platform and [`PowercastError::CacheDirCreation`] if it cannot be created.
    pub fn new() -> Result<Self, PowercastError> {
        Self::configure().call()
    }

    /// Creates a client caching into `cache_folder`, created if needed.
    pub fn with_cache_folder(cache_folder: PathBuf) -> Result<Self, PowercastError> {
        Self::configure().cache_folder(cache_folder).call()
    }

    /// Creates a client with explicit settings.
    ///
    /// * `.cache_folder(PathBuf)`: Optional. Defaults to the system cache directory.
    /// * `.disable_cache(bool)`: Optional. Skip reading and writing the cache.
    /// * `.base_url(String)`: Optional. Defaults to [`POWER_DAILY_POINT_URL`].
    /// * `.timeout(Duration)`: Optional per-request timeout. Defaults to 15 seconds.
    /// * `.retry(RetryPolicy)`: Optional. Defaults to [`RetryPolicy::default`].
    #[builder]
    pub fn configure(
        cache_folder: Option<PathBuf>,
        #[builder(default)] disable_cache: bool,
        base_url: Option<String>,
        timeout: Option<Duration>,
        retry: Option<RetryPolicy>,
    ) -> Result<Self, PowercastError> {
        let cache = if disable_cache {
            None
        } else {
            let folder = match cache_folder {
                Some(folder) => folder,
                None => get_cache_dir()?,
            };
            ensure_cache_dir_exists(&folder)
                .map_err(|e| PowercastError::CacheDirCreation(folder.clone(), e))?;
            Some(ResponseCache::new(&folder))
        };

        let http = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(FetchError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: base_url.unwrap_or_else(|| POWER_DAILY_POINT_URL.to_string()),
            cache,
            retry: retry.unwrap_or_default(),
        })
    }
}

impl PowerClient {
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Fetches one point, from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the request still fails after retries, the service
    /// answers with an error status, or the body is not a POWER response. Cache problems are
    /// never errors: a corrupt entry is a miss and a failed write is only logged.
    pub fn try_fetch_point(&self, request: &PointRequest) -> Result<PointFetch, FetchError> {
        if let Some(response) = self.cache.as_ref().and_then(|c| c.load(request)) {
            info!("Cache hit for {}", request.cache_key());
            return Ok(PointFetch {
                observations: response.observations(request.location),
                source: FetchSource::Cache,
            });
        }

        let body = self.download(request)?;
        let response: PowerResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::JsonParse {
                url: self.base_url.clone(),
                source: e,
            })?;

        if let Some(cache) = &self.cache {
            match cache.store(request, &body) {
                Ok(path) => info!("Cached response for {} at {:?}", request.cache_key(), path),
                Err(e) => warn!("Could not cache response for {}: {}", request.cache_key(), e),
            }
        }

        Ok(PointFetch {
            observations: response.observations(request.location),
            source: FetchSource::Network,
        })
    }

    /// Fetches one point and never fails: on error the problem is logged and no rows are
    /// returned, so a batch over many points degrades instead of aborting.
    pub fn fetch_point(&self, request: &PointRequest) -> Vec<Observation> {
        match self.try_fetch_point(request) {
            Ok(fetch) => fetch.observations,
            Err(e) => {
                warn!(
                    "Fetch failed for lon={} lat={} {}..{}: {}",
                    request.location.lon(),
                    request.location.lat(),
                    request.start,
                    request.end,
                    e
                );
                Vec::new()
            }
        }
    }

    fn download(&self, request: &PointRequest) -> Result<String, FetchError> {
        let query = request.query_pairs();
        info!(
            "Downloading POWER data for lon={} lat={} from {}",
            request.location.lon(),
            request.location.lat(),
            self.base_url
        );

        let response = send_with_retry(&self.retry, || {
            self.http.get(&self.base_url).query(&query).send()
        })
        .map_err(|e| FetchError::NetworkRequest(self.base_url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", self.base_url, e);
                return Err(match e.status() {
                    Some(status) => FetchError::HttpStatus {
                        url: self.base_url.clone(),
                        status,
                        source: e,
                    },
                    None => FetchError::NetworkRequest(self.base_url.clone(), e),
                });
            }
        };

        response
            .text()
            .map_err(|e| FetchError::NetworkRequest(self.base_url.clone(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::LonLat;
    use chrono::NaiveDate;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    /// Nothing listens on the discard port, so requests fail fast with a connection error.
    const UNREACHABLE_URL: &str = "http://127.0.0.1:9/api/temporal/daily/point";

    fn offline_client(cache_folder: PathBuf) -> PowerClient {
        PowerClient::configure()
            .cache_folder(cache_folder)
            .base_url(UNREACHABLE_URL.to_string())
            .timeout(Duration::from_secs(2))
            .retry(RetryPolicy::none())
            .call()
            .unwrap()
    }

    const BODY: &str = r#"{"properties":{"parameter":{
        "T2M":{"20150101":1.0,"20150102":2.0,"20150103":3.0},
        "PRECTOTCORR":{"20150101":0.0,"20150102":0.5,"20150103":-999.0}}}}"#;

    /// Answers `connections` requests with a 200 and [`BODY`], returning the base URL.
    fn serve_body(connections: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/api/temporal/daily/point", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for _ in 0..connections {
                let (mut stream, _) = listener.accept().unwrap();
                let mut buf = [0u8; 4096];
                let mut request = Vec::new();
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    BODY.len(),
                    BODY
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        url
    }

    fn local_client(base_url: String, cache_folder: PathBuf) -> PowerClient {
        PowerClient::configure()
            .cache_folder(cache_folder)
            .base_url(base_url)
            .timeout(Duration::from_secs(5))
            .retry(RetryPolicy::none())
            .call()
            .unwrap()
    }

    fn request() -> PointRequest {
        PointRequest::builder()
            .location(LonLat(-80.25, 43.55))
            .start(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
            .end(NaiveDate::from_ymd_opt(2015, 1, 3).unwrap())
            .build()
    }

    #[test]
    fn test_cached_response_is_used_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let client = offline_client(tmp.path().to_path_buf());
        let body = r#"{"properties":{"parameter":{
            "T2M":{"20150101":1.0,"20150102":2.0},
            "PRECTOTCORR":{"20150102":0.5,"20150103":0.0}}}}"#;
        client.cache().unwrap().store(&request(), body).unwrap();

        let fetch = client.try_fetch_point(&request()).unwrap();
        assert_eq!(fetch.source, FetchSource::Cache);
        assert_eq!(fetch.observations.len(), 3);
        assert!(fetch
            .observations
            .windows(2)
            .all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_network_failure_degrades_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let client = offline_client(tmp.path().to_path_buf());

        assert!(matches!(
            client.try_fetch_point(&request()),
            Err(FetchError::NetworkRequest(..))
        ));
        assert!(client.fetch_point(&request()).is_empty());
    }

    #[test]
    fn test_corrupt_cache_falls_through_to_network() {
        let tmp = tempfile::tempdir().unwrap();
        let client = offline_client(tmp.path().to_path_buf());
        let path = client.cache().unwrap().path_for(&request());
        std::fs::write(&path, b"truncated{").unwrap();

        // The corrupt entry is ignored and the (unreachable) service is asked instead.
        assert!(client.try_fetch_point(&request()).is_err());
        assert!(client.fetch_point(&request()).is_empty());
    }

    #[test]
    fn test_disabled_cache() {
        let client = PowerClient::configure()
            .disable_cache(true)
            .base_url(UNREACHABLE_URL.to_string())
            .retry(RetryPolicy::none())
            .call()
            .unwrap();
        assert!(client.cache().is_none());
        assert!(client.fetch_point(&request()).is_empty());
    }

    #[test]
    fn test_downloaded_response_is_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let client = local_client(serve_body(1), tmp.path().to_path_buf());

        let first = client.try_fetch_point(&request()).unwrap();
        assert_eq!(first.source, FetchSource::Network);
        assert_eq!(first.observations.len(), 3);
        assert_eq!(first.observations[2].precip, None);
        assert!(client.cache().unwrap().path_for(&request()).is_file());

        // The server is gone after one answer, so this must come from disk.
        let second = client.try_fetch_point(&request()).unwrap();
        assert_eq!(second.source, FetchSource::Cache);
        assert_eq!(second.observations, first.observations);
    }

    #[test]
    fn test_failed_cache_write_still_returns_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let client = local_client(serve_body(1), tmp.path().to_path_buf());
        // A directory where the cache file should go makes the write fail.
        let path = client.cache().unwrap().path_for(&request());
        std::fs::create_dir_all(&path).unwrap();

        let fetch = client.try_fetch_point(&request()).unwrap();
        assert_eq!(fetch.source, FetchSource::Network);
        assert_eq!(fetch.observations.len(), 3);
        assert!(path.is_dir());
    }
}
