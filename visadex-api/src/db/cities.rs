//! City database operations

use sqlx::{Row, SqlitePool};
use visadex_common::db::models::{City, Country};
use visadex_common::Result;

use crate::services::city_generator::GeneratedCity;

/// Countries that have no cities yet, capped at `limit`
pub async fn countries_without_cities(pool: &SqlitePool, limit: i64) -> Result<Vec<Country>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.name, c.capital, c.region, c.sub_region, c.flag_img
        FROM countries c
        WHERE NOT EXISTS (SELECT 1 FROM cities ci WHERE ci.country_id = c.id)
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Country {
            id: row.get("id"),
            name: row.get("name"),
            capital: row.get("capital"),
            region: row.get("region"),
            sub_region: row.get("sub_region"),
            flag_img: row.get("flag_img"),
        })
        .collect())
}

/// Insert generated cities for one country, returning the stored rows
pub async fn insert_cities(
    pool: &SqlitePool,
    country_id: i64,
    cities: &[GeneratedCity],
) -> Result<Vec<City>> {
    let mut inserted = Vec::with_capacity(cities.len());

    for city in cities {
        let result = sqlx::query(
            "INSERT INTO cities (country_id, name, state_province) VALUES (?, ?, ?)",
        )
        .bind(country_id)
        .bind(&city.name)
        .bind(&city.state_province)
        .execute(pool)
        .await?;

        inserted.push(City {
            id: result.last_insert_rowid(),
            country_id,
            name: city.name.clone(),
            state_province: city.state_province.clone(),
        });
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        visadex_common::db::init_tables(&pool)
            .await
            .expect("Failed to initialize tables");
        pool
    }

    #[tokio::test]
    async fn test_countries_without_cities_shrinks_after_insert() {
        let pool = test_pool().await;
        for name in ["France", "Japan"] {
            sqlx::query("INSERT INTO countries (name) VALUES (?)")
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
        }

        let missing = countries_without_cities(&pool, 10).await.unwrap();
        assert_eq!(missing.len(), 2);

        let france = missing.iter().find(|c| c.name == "France").unwrap();
        let cities = insert_cities(
            &pool,
            france.id,
            &[
                GeneratedCity {
                    name: "Paris".to_string(),
                    state_province: None,
                },
                GeneratedCity {
                    name: "Lyon".to_string(),
                    state_province: Some("Auvergne-Rhone-Alpes".to_string()),
                },
            ],
        )
        .await
        .unwrap();
        assert_eq!(cities.len(), 2);
        assert!(cities[0].id > 0);

        let missing = countries_without_cities(&pool, 10).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "Japan");
    }
}
