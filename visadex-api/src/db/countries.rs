//! Country database operations

use sqlx::{Row, SqlitePool};
use visadex_common::db::models::Country;
use visadex_common::Result;

use crate::services::country_loader::NewCountry;

/// Look up a country by exact name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Country>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, capital, region, sub_region, flag_img
        FROM countries
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Country {
        id: row.get("id"),
        name: row.get("name"),
        capital: row.get("capital"),
        region: row.get("region"),
        sub_region: row.get("sub_region"),
        flag_img: row.get("flag_img"),
    }))
}

/// Replace the full country table with a freshly imported list.
///
/// Runs in one transaction; dependent visa_status and cities rows are
/// removed by the cascading delete.
pub async fn replace_all(pool: &SqlitePool, countries: &[NewCountry]) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM countries").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'countries'")
        .execute(&mut *tx)
        .await?;

    for country in countries {
        sqlx::query(
            r#"
            INSERT INTO countries (name, capital, region, sub_region, flag_img)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&country.name)
        .bind(&country.capital)
        .bind(&country.region)
        .bind(&country.sub_region)
        .bind(&country.flag_img)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(countries.len() as u64)
}
