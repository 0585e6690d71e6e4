use chrono::{DateTime, Utc};
use serde_json::{json, Map};

use crate::models::CanonicalRecord;

/// One game deal, normalized from the CheapShark payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub title: String,
    pub sale_price: f64,
    pub normal_price: f64,
    pub savings_pct: f64,
    pub store_id: String,
    pub steam_rating: Option<i64>,
    pub metacritic: Option<i64>,
    pub extracted_at: DateTime<Utc>,
}

impl Deal {
    pub fn into_record(self) -> CanonicalRecord {
        let mut fields = Map::new();
        fields.insert("titulo".to_string(), json!(self.title));
        fields.insert("precio_oferta".to_string(), json!(self.sale_price));
        fields.insert("precio_normal".to_string(), json!(self.normal_price));
        fields.insert("ahorro_porcentaje".to_string(), json!(self.savings_pct));
        fields.insert("store_id".to_string(), json!(self.store_id));
        fields.insert("rating_steam".to_string(), json!(self.steam_rating));
        fields.insert("metacritic".to_string(), json!(self.metacritic));
        fields.insert(
            "fecha_extraccion".to_string(),
            json!(self.extracted_at.to_rfc3339()),
        );

        let mut dimension_attrs = Map::new();
        dimension_attrs.insert("store_id".to_string(), json!(self.store_id));

        CanonicalRecord {
            dimension_key: self.title,
            dimension_attrs,
            fields,
            extracted_at: self.extracted_at,
        }
    }
}
