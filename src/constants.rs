// Base URL for the NASDAQ quote API.
pub const BASE_URL: &str = "https://api.nasdaq.com/api/quote/";

// The API refuses default client identifiers, so requests look like a browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36";

// Total time allowed per request (connect through body), in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 10;
// Full chain bodies are large; they get longer.
pub const CHAIN_TIMEOUT_SECS: u64 = 20;

pub const CACHE_DIR: &str = "cache";
pub const OUTPUT_DIR: &str = "output";
pub const BATCH_SIZE: usize = 1000;

// Upper bound on strikes returned by one chain request.
pub const CHAIN_LIMIT: u32 = 10000;
