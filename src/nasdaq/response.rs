use serde::Deserialize;
use serde_json::{Map, Value};

/// Every NASDAQ quote endpoint wraps its payload the same way.
#[derive(Deserialize, Debug)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub status: Option<Status>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub b_code_message: Option<Vec<CodeMessage>>,
    pub developer_message: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CodeMessage {
    pub error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct OptionChainData {
    pub table: Option<Table>,
    pub filters: Option<AppliedFilters>,
    pub filterlist: Option<FilterList>,
}

/// Column keys mapped to display labels, and one object per strike row.
#[derive(Deserialize, Debug)]
pub struct Table {
    pub headers: Option<Map<String, Value>>,
    pub rows: Option<Vec<Map<String, Value>>>,
}

#[derive(Deserialize, Debug)]
pub struct AppliedFilters {
    pub fromdate: Option<AppliedFilter>,
}

#[derive(Deserialize, Debug)]
pub struct AppliedFilter {
    pub value: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct FilterList {
    pub fromdate: Option<FilterGroup>,
}

#[derive(Deserialize, Debug)]
pub struct FilterGroup {
    #[serde(default)]
    pub filter: Vec<FilterOption>,
}

/// `value` looks like "2025-07-11|2025-07-11".
#[derive(Deserialize, Debug)]
pub struct FilterOption {
    pub label: Option<String>,
    pub value: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StockInfoData {
    pub primary_data: Option<PrimaryData>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryData {
    pub last_sale_price: Option<String>,
}
