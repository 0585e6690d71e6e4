use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::Deal;
use crate::normalize::{opt_i64, opt_str, require_f64, Rejection};

/// Maps one raw CheapShark deal into a typed record. Pure: `now` is
/// injected by the caller and becomes the extraction timestamp.
///
/// Prices and savings are mandatory; everything else degrades to a
/// sentinel instead of failing the record.
pub fn normalize_deal(raw: &Value, now: DateTime<Utc>) -> Result<Deal, Rejection> {
    let sale_price = require_f64(raw, "salePrice")?;
    let normal_price = require_f64(raw, "normalPrice")?;
    let savings_pct = require_f64(raw, "savings")?;

    Ok(Deal {
        title: opt_str(raw, "title").unwrap_or_else(|| "N/A".to_string()),
        sale_price,
        normal_price,
        savings_pct,
        store_id: opt_str(raw, "storeID").unwrap_or_else(|| "N/A".to_string()),
        steam_rating: opt_i64(raw, "steamRatingPercent"),
        metacritic: opt_i64(raw, "metacriticScore"),
        extracted_at: now,
    })
}
