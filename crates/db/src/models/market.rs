use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A market observation for a region/city and property type
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct RealEstateMarket {
    pub id: Uuid,
    pub region: String,
    pub city: String,
    pub property_type: String,
    pub avg_price_per_sqm: f64,
    pub avg_rent_per_sqm: Option<f64>,
    pub growth_rate_percent: Option<f64>,
    pub recorded_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateRealEstateMarket {
    pub region: String,
    pub city: String,
    pub property_type: String,
    pub avg_price_per_sqm: f64,
    pub avg_rent_per_sqm: Option<f64>,
    pub growth_rate_percent: Option<f64>,
    pub recorded_on: NaiveDate,
}

/// Filter for market queries; all fields match case-insensitively
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct MarketFilter {
    pub region: Option<String>,
    pub city: Option<String>,
    pub property_type: Option<String>,
}

const MARKET_COLUMNS: &str = "id, region, city, property_type, avg_price_per_sqm, avg_rent_per_sqm, growth_rate_percent, recorded_on, created_at";

impl RealEstateMarket {
    /// Matching observations, most recent first
    pub async fn find(pool: &SqlitePool, filter: &MarketFilter) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RealEstateMarket>(&format!(
            "SELECT {MARKET_COLUMNS} FROM real_estate_markets
             WHERE ($1 IS NULL OR region = $1 COLLATE NOCASE)
               AND ($2 IS NULL OR city = $2 COLLATE NOCASE)
               AND ($3 IS NULL OR property_type = $3 COLLATE NOCASE)
             ORDER BY recorded_on DESC, created_at DESC"
        ))
        .bind(filter.region.as_deref())
        .bind(filter.city.as_deref())
        .bind(filter.property_type.as_deref())
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, RealEstateMarket>(&format!(
            "SELECT {MARKET_COLUMNS} FROM real_estate_markets WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateRealEstateMarket,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RealEstateMarket>(&format!(
            "INSERT INTO real_estate_markets
                 (id, region, city, property_type, avg_price_per_sqm, avg_rent_per_sqm, growth_rate_percent, recorded_on)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {MARKET_COLUMNS}"
        ))
        .bind(id)
        .bind(data.region.trim())
        .bind(data.city.trim())
        .bind(data.property_type.trim())
        .bind(data.avg_price_per_sqm)
        .bind(data.avg_rent_per_sqm)
        .bind(data.growth_rate_percent)
        .bind(data.recorded_on)
        .fetch_one(pool)
        .await
    }

    /// Gross rental yield in percent, when rent data is present
    pub fn rental_yield_percent(&self) -> Option<f64> {
        self.avg_rent_per_sqm
            .filter(|_| self.avg_price_per_sqm > 0.0)
            .map(|rent| rent * 12.0 / self.avg_price_per_sqm * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::db;

    fn observation(city: &str, recorded_on: NaiveDate) -> CreateRealEstateMarket {
        CreateRealEstateMarket {
            region: "Algarve".to_string(),
            city: city.to_string(),
            property_type: "apartment".to_string(),
            avg_price_per_sqm: 3200.0,
            avg_rent_per_sqm: Some(16.0),
            growth_rate_percent: Some(4.2),
            recorded_on,
        }
    }

    #[tokio::test]
    async fn find_filters_case_insensitively() {
        let db = db().await;
        let jan = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        RealEstateMarket::create(&db.pool, &observation("Faro", jan), Uuid::new_v4())
            .await
            .unwrap();
        RealEstateMarket::create(&db.pool, &observation("Lagos", feb), Uuid::new_v4())
            .await
            .unwrap();

        let filter = MarketFilter {
            region: Some("algarve".to_string()),
            ..Default::default()
        };
        let rows = RealEstateMarket::find(&db.pool, &filter).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].city, "Lagos");

        let filter = MarketFilter {
            city: Some("FARO".to_string()),
            ..Default::default()
        };
        assert_eq!(RealEstateMarket::find(&db.pool, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rental_yield_uses_annual_rent() {
        let db = db().await;
        let row = RealEstateMarket::create(
            &db.pool,
            &observation("Faro", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let yield_percent = row.rental_yield_percent().unwrap();
        assert!((yield_percent - 6.0).abs() < 1e-9);
    }
}
