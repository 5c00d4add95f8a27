use crate::error::PowercastError;
use chrono::{Datelike, NaiveDate};
use log::info;
use std::io;
use std::path::{Path, PathBuf};

const CACHE_DIR_NAME: &str = "powercast_cache";

/// `NaiveDate::num_days_from_ce` of 1970-01-01, the origin of polars `Date` values.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn get_cache_dir() -> Result<PathBuf, PowercastError> {
    dirs::cache_dir()
        .ok_or(PowercastError::CacheDirResolution)
        .map(|p| p.join(CACHE_DIR_NAME))
}

pub fn ensure_cache_dir_exists(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Cache path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating cache directory: {}", path.display());
            std::fs::create_dir_all(path)
        }
        Err(e) => Err(e),
    }
}

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Parses a POWER date key. The API answers with `YYYYMMDD`; `YYYY-MM-DD` is accepted too.
pub fn parse_power_date(key: &str) -> Option<NaiveDate> {
    match key.len() {
        8 => NaiveDate::parse_from_str(key, "%Y%m%d").ok(),
        10 => NaiveDate::parse_from_str(key, "%Y-%m-%d").ok(),
        _ => None,
    }
}

pub fn format_power_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
