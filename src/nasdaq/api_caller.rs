use std::time::Duration;

use super::response;
use crate::{
    config::ScraperConfig,
    constants,
    http::client::{self, RequestError},
    model::{self, OptionChainSide, ScrapeError},
    normalize,
};

/// Fetcher for the NASDAQ quote API.
pub struct NasdaqApi {
    client: client::Client,
    base_url: String,
    chain_timeout: Duration,
}

/// Unwraps the payload, turning the API's own error report into an error.
pub fn check_status<T>(resp: response::Envelope<T>) -> model::Result<T> {
    if let Some(data) = resp.data {
        return Ok(data);
    }
    let mut reasons: Vec<String> = resp
        .status
        .iter()
        .flat_map(|status| status.b_code_message.iter().flatten())
        .filter_map(|m| m.error_message.clone())
        .collect();
    if reasons.is_empty() {
        reasons.extend(resp.message);
    }
    if reasons.is_empty() {
        reasons.extend(resp.status.and_then(|s| s.developer_message));
    }
    if reasons.is_empty() {
        reasons.push("No data".into());
    }
    Err(ScrapeError::SchemaError(reasons.join("; ")))
}

fn parse<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> model::Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| ScrapeError::SchemaError(format!("{} response: {}", what, e)))
}

/// Query parameters for the full chain of one expiration.
pub fn chain_params(expiry: &str, side: &OptionChainSide) -> Vec<(&'static str, String)> {
    vec![
        ("assetclass", "stocks".to_string()),
        ("fromdate", expiry.to_string()),
        ("todate", expiry.to_string()),
        ("excode", "oprac".to_string()),
        ("callput", String::from(side)),
        ("money", "all".to_string()),
        ("type", "all".to_string()),
        ("limit", constants::CHAIN_LIMIT.to_string()),
    ]
}

impl NasdaqApi {
    pub fn new(config: &ScraperConfig) -> Result<Self, RequestError> {
        Ok(Self {
            client: client::Client::new(config)?,
            base_url: config.base_url.clone(),
            chain_timeout: config.chain_timeout,
        })
    }

    fn endpoint(&self, ticker: &str, path: &str) -> String {
        format!("{}{}/{}", self.base_url, ticker.trim().to_lowercase(), path)
    }

    /// Raw option-chain body, validated as JSON but otherwise untouched so it
    /// can be cached byte for byte.
    pub fn option_chain_raw(
        &self,
        ticker: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<u8>, RequestError> {
        self.client.get_json_bytes_within(
            &self.endpoint(ticker, "option-chain"),
            params,
            self.chain_timeout,
        )
    }

    /// Lists every expiration date the API offers for `ticker`, as ISO dates
    /// in chronological order. Asks for a single strike since only the filter
    /// list is needed.
    pub fn expiration_dates(&self, ticker: &str) -> model::Result<Vec<String>> {
        let bytes = self.client.get_json_bytes(
            &self.endpoint(ticker, "option-chain"),
            &[("assetclass", "stocks"), ("limit", "1")],
        )?;
        let data = check_status(parse::<response::Envelope<response::OptionChainData>>(
            &bytes,
            "expiration list",
        )?)?;

        let Some(filters) = data.filterlist.and_then(|list| list.fromdate) else {
            log::warn!("no expiration filter list returned for {}", ticker);
            return Ok(Vec::new());
        };

        let today = normalize::today_in_new_york();
        let mut dates: Vec<String> = Vec::with_capacity(filters.filter.len());
        for option in filters.filter {
            // "2025-07-11|2025-07-11": from and to of the same expiry.
            let Some(raw) = option.value.as_deref().and_then(|v| v.split('|').next()) else {
                continue;
            };
            match normalize::normalize_date(raw, today) {
                Some(date) => dates.push(normalize::to_iso(date)),
                None => log::warn!(
                    "skipping unrecognised expiration '{}' ({:?}) for {}",
                    raw,
                    option.label,
                    ticker
                ),
            }
        }
        dates.sort();
        dates.dedup();

        log::info!("{} expiration dates for {}", dates.len(), ticker);
        Ok(dates)
    }

    /// Last sale price of the underlying.
    pub fn last_sale_price(&self, ticker: &str) -> model::Result<f64> {
        let bytes = self
            .client
            .get_json_bytes(&self.endpoint(ticker, "info"), &[("assetclass", "stocks")])?;
        let data = check_status(parse::<response::Envelope<response::StockInfoData>>(
            &bytes,
            "stock info",
        )?)?;

        let price = data
            .primary_data
            .and_then(|primary| primary.last_sale_price);
        model::parse_float(price.as_deref()).ok_or_else(|| {
            ScrapeError::SchemaError(format!("no last sale price for {}: {:?}", ticker, price))
        })
    }
}
