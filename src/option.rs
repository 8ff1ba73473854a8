use std::{collections::VecDeque, iter::FusedIterator, vec};

use chrono::NaiveDate;

use crate::{
    config::ScraperConfig,
    model::{self, ExpiryClass, OptionChainSide, OptionContractRecord, ScrapeError},
    nasdaq::{
        api_caller::{self, NasdaqApi},
        response,
    },
    normalize::{self, ChainTable},
    store::cache::{CacheKey, ResponseCache},
};

/// What to pull for one ticker.
#[derive(Debug, Clone)]
pub struct ChainRequest {
    pub ticker: String,
    pub expiry: Option<String>, // All listed expirations when None.
    pub side: OptionChainSide,
    pub expiry_class: ExpiryClass,
}

impl ChainRequest {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.trim().to_string(),
            expiry: None,
            side: OptionChainSide::Both,
            expiry_class: ExpiryClass::All,
        }
    }
}

/// Option-chain scraper: API access plus the response cache.
pub struct OptionScraper {
    api: NasdaqApi,
    cache: ResponseCache,
}

impl OptionScraper {
    pub fn new(config: &ScraperConfig) -> model::Result<Self> {
        Ok(Self {
            api: NasdaqApi::new(config)?,
            cache: ResponseCache::new(config.cache_dir.clone()),
        })
    }

    pub fn expiration_dates(&self, ticker: &str) -> model::Result<Vec<String>> {
        self.api.expiration_dates(ticker)
    }

    pub fn last_sale_price(&self, ticker: &str) -> model::Result<f64> {
        self.api.last_sale_price(ticker)
    }

    /// Starts a lazy pass over the chain. The expiration list is fetched up
    /// front, so an unlisted expiry fails here before any chain request.
    pub fn records(&self, request: &ChainRequest) -> model::Result<OptionRecords<'_>> {
        let available = self.api.expiration_dates(&request.ticker)?;

        let selected = match &request.expiry {
            Some(expiry) => {
                let iso = normalize::normalize_date(expiry, normalize::today_in_new_york())
                    .map(normalize::to_iso)
                    .unwrap_or_else(|| expiry.clone());
                if !available.contains(&iso) {
                    return Err(ScrapeError::InvalidExpiryError {
                        ticker: request.ticker.to_uppercase(),
                        expiry: expiry.clone(),
                    });
                }
                if !parse_iso(&iso).is_some_and(|date| request.expiry_class.matches(date)) {
                    return Err(ScrapeError::ConfigError(format!(
                        "expiry {} is not a {:?} expiration",
                        iso, request.expiry_class
                    )));
                }
                vec![iso]
            }
            None => available,
        };

        let expiries: VecDeque<String> = selected
            .into_iter()
            .filter(|expiry| match parse_iso(expiry) {
                Some(date) => request.expiry_class.matches(date),
                None => false,
            })
            .collect();
        if expiries.is_empty() {
            log::warn!(
                "no {:?} expirations to fetch for {}",
                request.expiry_class,
                request.ticker
            );
        }

        Ok(OptionRecords {
            scraper: self,
            ticker: request.ticker.clone(),
            side: request.side,
            expiries,
            pending: Vec::new().into_iter(),
            failed: false,
        })
    }

    /// Fetches (or loads from cache) and normalizes one expiration.
    pub fn chain(
        &self,
        ticker: &str,
        expiry: &str,
        side: OptionChainSide,
    ) -> model::Result<Vec<OptionContractRecord>> {
        let params = api_caller::chain_params(expiry, &side);
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let key = CacheKey::new(ticker, expiry, &params);

        let resp: response::Envelope<response::OptionChainData> = self
            .cache
            .get_or_fetch(&key, || self.api.option_chain_raw(ticker, &params))?;
        let data = api_caller::check_status(resp)?;

        let table = data
            .table
            .map(ChainTable::from_response)
            .unwrap_or_default();
        let requested = parse_iso(expiry).or_else(|| {
            data.filters
                .and_then(|f| f.fromdate)
                .and_then(|f| f.value)
                .and_then(|v| v.split('|').next().and_then(parse_iso))
        });

        let mut records =
            normalize::normalize(ticker, &table, requested, normalize::today_in_new_york())?;
        records.retain(|record| side.matches(record));
        Ok(records)
    }
}

fn parse_iso(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Records for one ticker, one expiration at a time, in listing order.
/// Single pass: the first error is yielded and ends the sequence.
pub struct OptionRecords<'a> {
    scraper: &'a OptionScraper,
    ticker: String,
    side: OptionChainSide,
    expiries: VecDeque<String>,
    pending: vec::IntoIter<OptionContractRecord>,
    failed: bool,
}

impl Iterator for OptionRecords<'_> {
    type Item = model::Result<OptionContractRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(Ok(record));
            }
            if self.failed {
                return None;
            }
            let expiry = self.expiries.pop_front()?;
            match self.scraper.chain(&self.ticker, &expiry, self.side) {
                Ok(records) => {
                    log::info!(
                        "{} records for {} expiring {}",
                        records.len(),
                        self.ticker.to_uppercase(),
                        expiry
                    );
                    self.pending = records.into_iter();
                }
                Err(err) => {
                    log::error!(
                        "Fail to retrieve option chain for {} {}. Err: {}",
                        self.ticker,
                        expiry,
                        err
                    );
                    self.failed = true;
                    self.expiries.clear();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl FusedIterator for OptionRecords<'_> {}

/// Running call/put totals over exported records.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChainSummary {
    pub calls: usize,
    pub puts: usize,
    pub call_volume: u64,
    pub put_volume: u64,
    pub call_open_interest: u64,
    pub put_open_interest: u64,
}

impl ChainSummary {
    pub fn add(&mut self, record: &OptionContractRecord) {
        let volume = record.volume().unwrap_or(0);
        let open_interest = record.open_interest().unwrap_or(0);
        match record.side() {
            OptionChainSide::Put => {
                self.puts += 1;
                self.put_volume += volume;
                self.put_open_interest += open_interest;
            }
            _ => {
                self.calls += 1;
                self.call_volume += volume;
                self.call_open_interest += open_interest;
            }
        }
    }

    /// Put/call ratio by open interest; None without call open interest.
    pub fn put_call_ratio(&self) -> Option<f64> {
        if self.call_open_interest == 0 {
            return None;
        }
        Some(self.put_open_interest as f64 / self.call_open_interest as f64)
    }
}
