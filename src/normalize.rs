//! Reshapes the NASDAQ option-chain table into flat contract records.
//!
//! The vendor returns one row per strike with call columns (`c_*`) on the left
//! and put columns (`p_*`) on the right. Rows without a strike are group
//! headers naming the expiration that the following rows belong to.

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde_json::Value;

use crate::{
    model::{self, OptionContractRecord, ScrapeError},
    nasdaq::response,
};

const STRIKE: &str = "strike";
const EXPIRY_GROUP: &str = "expirygroup";
const EXPIRY_DATE: &str = "expiryDate";
const DRILL_DOWN_URL: &str = "drillDownURL";

// Per-side column suffixes, in record order: Last, Chg, Bid, Ask, Vol, Open Int.
const SIDE_COLUMNS: [&str; 6] = ["Last", "Change", "Bid", "Ask", "Volume", "Openinterest"];

/// Vendor table reduced to column names and positional row values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl ChainTable {
    /// Columns come from the table headers; the row-only keys the
    /// normalizer reads are appended so rows can be laid out positionally.
    pub fn from_response(table: response::Table) -> Self {
        let mut columns: Vec<String> = table
            .headers
            .map(|headers| headers.into_iter().map(|(key, _)| key).collect())
            .unwrap_or_default();
        for extra in [EXPIRY_GROUP, EXPIRY_DATE, DRILL_DOWN_URL] {
            if !columns.iter().any(|c| c == extra) {
                columns.push(extra.to_string());
            }
        }

        let rows = table
            .rows
            .unwrap_or_default()
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column).and_then(value_to_string))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

struct SideColumns {
    quote: [usize; 6],
}

impl SideColumns {
    fn locate(table: &ChainTable, prefix: &str) -> model::Result<Self> {
        let mut quote = [0; 6];
        for (slot, suffix) in quote.iter_mut().zip(SIDE_COLUMNS) {
            *slot = required(table, &format!("{}_{}", prefix, suffix))?;
        }
        Ok(Self { quote })
    }
}

fn required(table: &ChainTable, column: &str) -> model::Result<usize> {
    table
        .index_of(column)
        .ok_or_else(|| ScrapeError::SchemaError(format!("missing column '{}'", column)))
}

/// Converts one chain table into records. Each strike row yields a call
/// record when the call is quoted, followed by a put record when the put is.
pub fn normalize(
    ticker: &str,                       // Underlying symbol.
    table: &ChainTable,                 // Vendor table.
    requested_expiry: Option<NaiveDate>, // Expiry the request was made for.
    today: NaiveDate,                   // Reference date for year-less vendor dates.
) -> model::Result<Vec<OptionContractRecord>> {
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }

    let strike_idx = required(table, STRIKE)?;
    let calls = SideColumns::locate(table, "c")?;
    let puts = SideColumns::locate(table, "p")?;
    let group_idx = table.index_of(EXPIRY_GROUP);
    let expiry_idx = table.index_of(EXPIRY_DATE);
    let url_idx = table.index_of(DRILL_DOWN_URL);

    let root = ticker.to_uppercase();
    let mut records = Vec::with_capacity(table.rows.len() * 2);
    let mut group_expiry: Option<NaiveDate> = None;

    for row in &table.rows {
        let get = |idx: Option<usize>| idx.and_then(|i| row.get(i)).and_then(|v| v.as_deref());

        let Some(strike) = get(Some(strike_idx)) else {
            if let Some(label) = get(group_idx) {
                group_expiry = normalize_date(label, requested_expiry.unwrap_or(today));
                if group_expiry.is_none() {
                    log::warn!("unrecognised expiry group label '{}'", label);
                }
            }
            continue;
        };

        let reference = group_expiry.or(requested_expiry).unwrap_or(today);
        let expiry = get(expiry_idx)
            .and_then(|raw| normalize_date(raw, reference))
            .or(group_expiry)
            .or(requested_expiry)
            .ok_or_else(|| {
                ScrapeError::SchemaError(format!(
                    "no expiry date for {} strike {}",
                    root, strike
                ))
            })?;

        let contract = get(url_idx)
            .and_then(|url| url.rsplit('/').next())
            .filter(|symbol| !symbol.is_empty());

        if is_quoted(get(Some(calls.quote[0]))) {
            let symbol = match contract {
                Some(symbol) => symbol.to_string(),
                None => synthesize_symbol(ticker, expiry, 'c', strike)?,
            };
            let mut record = side_record(&root, strike, expiry, &calls, &get);
            record.calls = Some(symbol);
            records.push(record);
        }

        if is_quoted(get(Some(puts.quote[0]))) {
            let symbol = match contract.and_then(put_symbol) {
                Some(symbol) => symbol,
                None => synthesize_symbol(ticker, expiry, 'p', strike)?,
            };
            let mut record = side_record(&root, strike, expiry, &puts, &get);
            record.puts = Some(symbol);
            records.push(record);
        }
    }

    Ok(records)
}

fn is_quoted(last: Option<&str>) -> bool {
    matches!(last, Some(last) if last != "--")
}

fn side_record<'a>(
    root: &str,
    strike: &str,
    expiry: NaiveDate,
    columns: &SideColumns,
    get: &impl Fn(Option<usize>) -> Option<&'a str>,
) -> OptionContractRecord {
    let field = |slot: usize| get(Some(columns.quote[slot])).map(String::from);
    OptionContractRecord {
        root: root.to_string(),
        calls: None,
        last: field(0),
        chg: field(1),
        bid: field(2),
        ask: field(3),
        vol: field(4),
        open_int: field(5),
        strike: Some(strike.to_string()),
        puts: None,
        expiry_date: to_iso(expiry),
    }
}

/// Contract symbols end in the side letter followed by the strike in
/// thousandths (8 digits); the put sits on the same row as the call.
fn put_symbol(call_symbol: &str) -> Option<String> {
    let bytes = call_symbol.as_bytes();
    let n = bytes.len();
    if n < 9 || !bytes[n - 8..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    let side = match bytes[n - 9] {
        b'c' => 'p',
        b'C' => 'P',
        _ => return None,
    };
    Some(format!("{}{}{}", &call_symbol[..n - 9], side, &call_symbol[n - 8..]))
}

// Same shape as the vendor's own symbols, e.g. "amd--250711c00100000".
fn synthesize_symbol(
    ticker: &str,
    expiry: NaiveDate,
    side: char,
    strike: &str,
) -> model::Result<String> {
    let strike_value = model::parse_float(Some(strike))
        .ok_or_else(|| ScrapeError::SchemaError(format!("unparseable strike '{}'", strike)))?;
    Ok(format!(
        "{}--{}{}{:08}",
        ticker.to_lowercase(),
        expiry.format("%y%m%d"),
        side,
        (strike_value * 1000.0).round() as u64
    ))
}

const DATED_FORMATS: [&str; 4] = ["%m/%d/%Y", "%Y-%m-%d", "%B %d, %Y", "%b %d, %Y"];

/// Parses the vendor's date spellings. "Jul 11" carries no year: it is placed
/// in the reference year, or the next one when its month has already passed.
pub fn normalize_date(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in DATED_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }

    // Parse against a leap year so "Feb 29" survives until the real year is known.
    let partial = NaiveDate::parse_from_str(&format!("{} 2000", raw), "%b %d %Y").ok()?;
    let year = if partial.month() < reference.month() {
        reference.year() + 1
    } else {
        reference.year()
    };
    NaiveDate::from_ymd_opt(year, partial.month(), partial.day())
}

pub fn to_iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// The vendor's trading calendar runs on US Eastern time.
pub fn today_in_new_york() -> NaiveDate {
    Utc::now().with_timezone(&New_York).date_naive()
}
