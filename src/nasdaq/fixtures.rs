//! Canned NASDAQ responses for tests, shaped like the live API.

use chrono::NaiveDate;
use serde_json::{Value, json};

fn date(iso: &str) -> NaiveDate {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d").expect("fixture dates are ISO")
}

/// Option-chain body for one expiry with both sides quoted at every strike.
pub fn chain_body(ticker: &str, expiry: &str, strikes: &[f64]) -> String {
    let expiry = date(expiry);
    let mut rows: Vec<Value> = vec![json!({
        "expirygroup": expiry.format("%B %-d, %Y").to_string(),
        "expiryDate": null,
        "strike": null,
        "c_Last": null,
        "p_Last": null,
        "drillDownURL": null
    })];
    for strike in strikes {
        rows.push(json!({
            "expirygroup": "",
            "expiryDate": expiry.format("%b %d").to_string(),
            "c_Last": "4.20", "c_Change": "0.15", "c_Bid": "4.10", "c_Ask": "4.25",
            "c_Volume": "1,204", "c_Openinterest": "3,310",
            "strike": format!("{:.2}", strike),
            "p_Last": "1.00", "p_Change": "-0.05", "p_Bid": "0.98", "p_Ask": "1.02",
            "p_Volume": "77", "p_Openinterest": "905",
            "drillDownURL": format!(
                "/market-activity/stocks/{t}/option-chain/call-put-options/{t}--{}c{:08}",
                expiry.format("%y%m%d"),
                (strike * 1000.0).round() as u64,
                t = ticker.to_lowercase()
            )
        }));
    }

    json!({
        "data": {
            "totalRecord": strikes.len(),
            "table": {
                "headers": {
                    "expiryDate": "Exp. Date",
                    "c_Last": "Last", "c_Change": "Change", "c_Bid": "Bid", "c_Ask": "Ask",
                    "c_Volume": "Volume", "c_Openinterest": "Open Int.",
                    "strike": "Strike",
                    "p_Last": "Last", "p_Change": "Change", "p_Bid": "Bid", "p_Ask": "Ask",
                    "p_Volume": "Volume", "p_Openinterest": "Open Int."
                },
                "rows": rows
            },
            "filters": { "fromdate": { "value": format!("{0}|{0}", expiry) } }
        },
        "message": null,
        "status": { "rCode": 200, "bCodeMessage": null, "developerMessage": null }
    })
    .to_string()
}

pub fn expirations_body(dates: &[&str]) -> String {
    let filter: Vec<Value> = dates
        .iter()
        .map(|d| json!({ "label": date(d).format("%b %d").to_string(), "value": format!("{0}|{0}", d) }))
        .collect();
    json!({
        "data": {
            "table": { "headers": null, "rows": [] },
            "filterlist": { "fromdate": { "filter": filter } }
        },
        "message": null,
        "status": { "rCode": 200, "bCodeMessage": null, "developerMessage": null }
    })
    .to_string()
}

pub fn stock_info_body(last_sale_price: &str) -> String {
    json!({
        "data": {
            "symbol": "AMD",
            "primaryData": { "lastSalePrice": last_sale_price }
        },
        "message": null,
        "status": { "rCode": 200, "bCodeMessage": null, "developerMessage": null }
    })
    .to_string()
}
