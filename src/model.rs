use std::{error::Error, fmt::Display, path::PathBuf};

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::http::client;

/// One quoted contract, flattened from a vendor strike row.
/// Numeric fields stay as the vendor formatted them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionContractRecord {
    #[serde(rename = "Root")]
    pub root: String, // Underlying ticker, upper case.
    #[serde(rename = "Calls")]
    pub calls: Option<String>, // Call contract symbol, set on call records.
    #[serde(rename = "Last")]
    pub last: Option<String>,
    #[serde(rename = "Chg")]
    pub chg: Option<String>,
    #[serde(rename = "Bid")]
    pub bid: Option<String>,
    #[serde(rename = "Ask")]
    pub ask: Option<String>,
    #[serde(rename = "Vol")]
    pub vol: Option<String>,
    #[serde(rename = "Open Int")]
    pub open_int: Option<String>,
    #[serde(rename = "Strike")]
    pub strike: Option<String>,
    #[serde(rename = "Puts")]
    pub puts: Option<String>, // Put contract symbol, set on put records.
    #[serde(rename = "Expiry Date")]
    pub expiry_date: String, // YYYY-MM-DD.
}

/// Field names in output order.
pub const RECORD_KEYS: [&str; 11] = [
    "Root",
    "Calls",
    "Last",
    "Chg",
    "Bid",
    "Ask",
    "Vol",
    "Open Int",
    "Strike",
    "Puts",
    "Expiry Date",
];

impl OptionContractRecord {
    pub fn side(&self) -> OptionChainSide {
        if self.puts.is_some() {
            OptionChainSide::Put
        } else {
            OptionChainSide::Call
        }
    }

    pub fn volume(&self) -> Option<u64> {
        parse_count(self.vol.as_deref())
    }

    pub fn open_interest(&self) -> Option<u64> {
        parse_count(self.open_int.as_deref())
    }
}

// Vendor numbers may carry thousands separators, a leading '$' or "--" for no value.
fn clean_number(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if value.is_empty() || value == "--" || value == "N/A" {
        return None;
    }
    Some(value.trim_start_matches('$').replace(',', ""))
}

pub fn parse_float(value: Option<&str>) -> Option<f64> {
    clean_number(value)?.parse().ok()
}

pub fn parse_count(value: Option<&str>) -> Option<u64> {
    clean_number(value)?.parse().ok()
}

/// Represents the side of an option contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OptionChainSide {
    Call,
    Put,
    Both,
}

impl OptionChainSide {
    pub fn matches(&self, record: &OptionContractRecord) -> bool {
        match self {
            OptionChainSide::Both => true,
            side => *side == record.side(),
        }
    }
}

// Value of the API's `callput` query parameter.
impl From<&OptionChainSide> for String {
    fn from(value: &OptionChainSide) -> Self {
        match value {
            OptionChainSide::Call => "call".to_string(),
            OptionChainSide::Put => "put".to_string(),
            OptionChainSide::Both => "callput".to_string(),
        }
    }
}

/// Expiration bucket. Standard monthly expirations fall on the third Friday,
/// or the Thursday before when that Friday is an exchange holiday; those in
/// the last month of a quarter are quarterly. Everything else is a weekly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExpiryClass {
    Week,
    Month,
    Quarter,
    All,
}

impl ExpiryClass {
    pub fn classify(date: NaiveDate) -> ExpiryClass {
        let Some(third_friday) =
            NaiveDate::from_weekday_of_month_opt(date.year(), date.month(), Weekday::Fri, 3)
        else {
            return ExpiryClass::Week;
        };
        // A holiday on the third Friday moves the standard expiration to Thursday.
        let standard = date == third_friday
            || (is_exchange_holiday(third_friday) && third_friday.pred_opt() == Some(date));
        if !standard {
            return ExpiryClass::Week;
        }
        match date.month() {
            3 | 6 | 9 | 12 => ExpiryClass::Quarter,
            _ => ExpiryClass::Month,
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            ExpiryClass::All => true,
            class => *class == ExpiryClass::classify(date),
        }
    }
}

// Only holidays that can land on a third Friday: Good Friday and Juneteenth.
fn is_exchange_holiday(date: NaiveDate) -> bool {
    let juneteenth = date.year() >= 2022 && date.month() == 6 && date.day() == 19;
    let good_friday = easter_sunday(date.year()).and_then(|d| d.checked_sub_days(Days::new(2)));
    juneteenth || good_friday == Some(date)
}

// Anonymous Gregorian computus.
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let (d, e) = (b / 4, b % 4);
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let (i, k) = (c / 4, c % 4);
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let n = h + l - 7 * m + 114;
    NaiveDate::from_ymd_opt(year, (n / 31) as u32, (n % 31 + 1) as u32)
}

/// Output file format for the batch writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SaveFormat {
    Csv,
    Json,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Csv => "csv",
            SaveFormat::Json => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug)]
pub enum ScrapeError {
    // Transport failures: NetworkError, HttpError and ParseError.
    Request(client::RequestError),
    SchemaError(String),
    CacheReadError(PathBuf, String),
    InvalidExpiryError { ticker: String, expiry: String },
    WriteError(PathBuf, String),
    ConfigError(String),
}

impl Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::Request(err) => write!(f, "{}", err),
            ScrapeError::SchemaError(msg) => write!(f, "Unexpected response layout: {}", msg),
            ScrapeError::CacheReadError(path, msg) => {
                write!(f, "Could not read cache file {}: {}", path.display(), msg)
            }
            ScrapeError::InvalidExpiryError { ticker, expiry } => write!(
                f,
                "{} is not a listed expiration date for {}",
                expiry, ticker
            ),
            ScrapeError::WriteError(path, msg) => {
                write!(f, "Could not write {}: {}", path.display(), msg)
            }
            ScrapeError::ConfigError(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for ScrapeError {}

impl From<client::RequestError> for ScrapeError {
    fn from(value: client::RequestError) -> Self {
        Self::Request(value)
    }
}

impl ScrapeError {
    pub fn write(path: impl Into<PathBuf>, err: impl Display) -> Self {
        Self::WriteError(path.into(), err.to_string())
    }

    pub fn cache_read(path: impl Into<PathBuf>, err: impl Display) -> Self {
        Self::CacheReadError(path.into(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(calls: Option<&str>, puts: Option<&str>) -> OptionContractRecord {
        OptionContractRecord {
            root: "AMD".into(),
            calls: calls.map(String::from),
            last: Some("1,234.50".into()),
            chg: Some("-0.25".into()),
            bid: Some("--".into()),
            ask: Some("2.10".into()),
            vol: Some("12,004".into()),
            open_int: None,
            strike: Some("100.00".into()),
            puts: puts.map(String::from),
            expiry_date: "2025-07-11".into(),
        }
    }

    #[test]
    fn serializes_all_fixed_keys() {
        let value = serde_json::to_value(record(Some("amd--250711c00100000"), None)).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), RECORD_KEYS.len());
        for key in RECORD_KEYS {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(object["Puts"].is_null());
    }

    #[test]
    fn numeric_accessors_tolerate_vendor_formatting() {
        let r = record(Some("amd--250711c00100000"), None);
        assert_eq!(parse_float(r.last.as_deref()), Some(1234.5));
        assert_eq!(parse_float(r.bid.as_deref()), None);
        assert_eq!(parse_float(r.ask.as_deref()), Some(2.1));
        assert_eq!(r.volume(), Some(12004));
        assert_eq!(r.open_interest(), None);
        assert_eq!(parse_float(Some("$123.45")), Some(123.45));
    }

    #[test]
    fn side_filter() {
        let call = record(Some("amd--250711c00100000"), None);
        let put = record(None, Some("amd--250711p00100000"));
        assert!(OptionChainSide::Call.matches(&call));
        assert!(!OptionChainSide::Call.matches(&put));
        assert!(OptionChainSide::Put.matches(&put));
        assert!(OptionChainSide::Both.matches(&call));
        assert!(OptionChainSide::Both.matches(&put));
        assert_eq!(String::from(&OptionChainSide::Both), "callput");
    }

    #[test]
    fn computes_easter() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(easter_sunday(2024), Some(date(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(date(2025, 4, 20)));
        assert_eq!(easter_sunday(2026), Some(date(2026, 4, 5)));
        assert!(is_exchange_holiday(date(2025, 4, 18)));
        assert!(!is_exchange_holiday(date(2025, 4, 17)));
    }

    #[test]
    fn classifies_expirations() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(ExpiryClass::classify(date(2025, 7, 11)), ExpiryClass::Week);
        assert_eq!(ExpiryClass::classify(date(2025, 7, 18)), ExpiryClass::Month);
        assert_eq!(ExpiryClass::classify(date(2025, 9, 19)), ExpiryClass::Quarter);
        // Good Friday 2025-04-18 and Juneteenth 2026-06-19 pull the standard
        // expiration back a day.
        assert_eq!(ExpiryClass::classify(date(2025, 4, 17)), ExpiryClass::Month);
        assert_eq!(ExpiryClass::classify(date(2026, 6, 18)), ExpiryClass::Quarter);
        assert_eq!(ExpiryClass::classify(date(2025, 7, 17)), ExpiryClass::Week);
        assert_eq!(ExpiryClass::classify(date(2021, 6, 17)), ExpiryClass::Week);
        assert!(ExpiryClass::All.matches(date(2025, 7, 11)));
        assert!(!ExpiryClass::Month.matches(date(2025, 9, 19)));
    }
}
