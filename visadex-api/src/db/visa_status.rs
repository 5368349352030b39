//! Visa status database operations
//!
//! The unresolved-record queries here are the storage side of the
//! enrichment loop's `VisaStore` contract; the read queries back the
//! lookup/listing endpoints.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use visadex_common::db::models::{Country, UnresolvedPair, VisaStatus, VisaStatusRecord};
use visadex_common::{Error, Result};

use crate::services::enrichment::VisaStore;

/// Fetch up to `limit` records with NULL status, optionally restricted to
/// one passport country, with country names joined in. Natural table order.
pub async fn fetch_unresolved(
    pool: &SqlitePool,
    scope: Option<i64>,
    limit: i64,
) -> Result<Vec<UnresolvedPair>> {
    let rows = match scope {
        Some(passport_id) => {
            sqlx::query(
                r#"
                SELECT v.id, c1.name AS passport, c2.name AS destination
                FROM visa_status v
                JOIN countries c1 ON c1.id = v.passport
                JOIN countries c2 ON c2.id = v.destination
                WHERE v.status IS NULL AND v.passport = ?
                LIMIT ?
                "#,
            )
            .bind(passport_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT v.id, c1.name AS passport, c2.name AS destination
                FROM visa_status v
                JOIN countries c1 ON c1.id = v.passport
                JOIN countries c2 ON c2.id = v.destination
                WHERE v.status IS NULL
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|row| UnresolvedPair {
            id: row.get("id"),
            passport: row.get("passport"),
            destination: row.get("destination"),
        })
        .collect())
}

/// Update exactly one record by id. Returns the number of rows touched
/// (0 when the id does not exist); never inserts.
pub async fn persist_status(
    pool: &SqlitePool,
    id: i64,
    status: VisaStatus,
    notes: &str,
) -> Result<u64> {
    let result = sqlx::query("UPDATE visa_status SET status = ?, notes = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(notes)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Rebuild the visa_status table as the full ordered cross product of
/// distinct countries. Returns the number of pairs created.
pub async fn materialize_pairs(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM visa_status").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'visa_status'")
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        r#"
        INSERT INTO visa_status (passport, destination)
        SELECT c1.id, c2.id
        FROM countries c1
        CROSS JOIN countries c2
        WHERE c1.id <> c2.id
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.rows_affected())
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> VisaStatusRecord {
    let status: Option<String> = row.get("status");
    VisaStatusRecord {
        id: row.get("id"),
        passport: row.get("passport"),
        destination: row.get("destination"),
        status: status.as_deref().and_then(VisaStatus::parse_canonical),
        notes: row.get("notes"),
    }
}

/// Point lookup of one pair by country names
pub async fn find_by_names(
    pool: &SqlitePool,
    passport: &str,
    destination: &str,
) -> Result<Option<VisaStatusRecord>> {
    let row = sqlx::query(
        r#"
        SELECT v.id, c1.name AS passport, c2.name AS destination, v.status, v.notes
        FROM visa_status v
        JOIN countries c1 ON c1.id = v.passport
        JOIN countries c2 ON c2.id = v.destination
        WHERE c1.name = ? AND c2.name = ?
        "#,
    )
    .bind(passport)
    .bind(destination)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(record_from_row))
}

/// Paginated listing with total count. Unresolved rows are excluded unless
/// `include_unresolved` is set.
pub async fn list(
    pool: &SqlitePool,
    page: i64,
    page_size: i64,
    include_unresolved: bool,
) -> Result<(Vec<VisaStatusRecord>, i64)> {
    if page < 1 || page_size < 1 {
        return Err(Error::InvalidInput(
            "page and page_size must be positive".to_string(),
        ));
    }

    let filter = if include_unresolved {
        ""
    } else {
        "WHERE v.status IS NOT NULL"
    };

    let query = format!(
        r#"
        SELECT v.id, c1.name AS passport, c2.name AS destination, v.status, v.notes
        FROM visa_status v
        JOIN countries c1 ON c1.id = v.passport
        JOIN countries c2 ON c2.id = v.destination
        {filter}
        LIMIT ? OFFSET ?
        "#
    );

    let rows = sqlx::query(&query)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(pool)
        .await?;

    let count_query = if include_unresolved {
        "SELECT COUNT(*) AS total FROM visa_status"
    } else {
        "SELECT COUNT(*) AS total FROM visa_status v WHERE v.status IS NOT NULL"
    };
    let total: i64 = sqlx::query(count_query)
        .fetch_one(pool)
        .await?
        .get("total");

    Ok((rows.iter().map(record_from_row).collect(), total))
}

/// Distinct passport countries that have at least one resolved record
pub async fn valid_passports(pool: &SqlitePool) -> Result<Vec<Country>> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT c.id, c.name, c.capital, c.region, c.sub_region, c.flag_img
        FROM visa_status v
        JOIN countries c ON c.id = v.passport
        WHERE v.status IS NOT NULL
        ORDER BY c.name ASC
        "#,
    )
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

/// `VisaStore` implementation over the SQLite pool
pub struct SqliteVisaStore {
    pool: SqlitePool,
}

impl SqliteVisaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisaStore for SqliteVisaStore {
    async fn fetch_unresolved(
        &self,
        scope: Option<i64>,
        limit: i64,
    ) -> Result<Vec<UnresolvedPair>> {
        fetch_unresolved(&self.pool, scope, limit).await
    }

    async fn persist_status(&self, id: i64, status: VisaStatus, notes: &str) -> Result<()> {
        let touched = persist_status(&self.pool, id, status, notes).await?;
        if touched == 0 {
            return Err(Error::NotFound(format!("visa_status id {id}")));
        }
        Ok(())
    }
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

    async fn seed_countries(pool: &SqlitePool, names: &[&str]) {
        for name in names {
            sqlx::query("INSERT INTO countries (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_materialize_pairs_is_full_cross_product() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR", "JP"]).await;

        let total = materialize_pairs(&pool).await.unwrap();
        assert_eq!(total, 6, "3 countries -> 3 * 2 ordered pairs");

        // Re-running rebuilds rather than duplicating
        let total = materialize_pairs(&pool).await.unwrap();
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn test_fetch_unresolved_excludes_persisted_records() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR"]).await;
        materialize_pairs(&pool).await.unwrap();

        let unresolved = fetch_unresolved(&pool, None, 150).await.unwrap();
        assert_eq!(unresolved.len(), 2);

        let first = &unresolved[0];
        persist_status(&pool, first.id, VisaStatus::VisaFree, "90 days")
            .await
            .unwrap();

        let remaining = fetch_unresolved(&pool, None, 150).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|p| p.id != first.id));
    }

    #[tokio::test]
    async fn test_fetch_unresolved_scope_and_limit() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR", "JP"]).await;
        materialize_pairs(&pool).await.unwrap();

        let us = crate::db::countries::find_by_name(&pool, "US")
            .await
            .unwrap()
            .unwrap();

        let scoped = fetch_unresolved(&pool, Some(us.id), 150).await.unwrap();
        assert_eq!(scoped.len(), 2);
        assert!(scoped.iter().all(|p| p.passport == "US"));

        let limited = fetch_unresolved(&pool, None, 4).await.unwrap();
        assert_eq!(limited.len(), 4);
    }

    #[tokio::test]
    async fn test_persist_status_updates_never_inserts() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR"]).await;
        materialize_pairs(&pool).await.unwrap();

        let touched = persist_status(&pool, 9999, VisaStatus::EVisa, "").await.unwrap();
        assert_eq!(touched, 0, "Unknown id must not insert");

        let touched = persist_status(&pool, 1, VisaStatus::EVisa, "apply online")
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let record = find_by_names(&pool, "US", "FR").await.unwrap().unwrap();
        assert_eq!(record.status, Some(VisaStatus::EVisa));
        assert_eq!(record.notes.as_deref(), Some("apply online"));
    }

    #[tokio::test]
    async fn test_list_pagination_and_filter() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR", "JP"]).await;
        materialize_pairs(&pool).await.unwrap();

        // Resolve 4 of the 6
        for id in 1..=4 {
            persist_status(&pool, id, VisaStatus::VisaFree, "").await.unwrap();
        }

        let (resolved, total) = list(&pool, 1, 3, false).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(resolved.len(), 3);

        let (page2, _) = list(&pool, 2, 3, false).await.unwrap();
        assert_eq!(page2.len(), 1);

        let (all, total_all) = list(&pool, 1, 100, true).await.unwrap();
        assert_eq!(total_all, 6);
        assert_eq!(all.len(), 6);
        assert_eq!(all.iter().filter(|r| r.status.is_none()).count(), 2);

        assert!(list(&pool, 0, 10, true).await.is_err());
    }

    #[tokio::test]
    async fn test_valid_passports_distinct() {
        let pool = test_pool().await;
        seed_countries(&pool, &["US", "FR", "JP"]).await;
        materialize_pairs(&pool).await.unwrap();

        let us = crate::db::countries::find_by_name(&pool, "US")
            .await
            .unwrap()
            .unwrap();

        // Resolve both outgoing US pairs; US must appear once
        for pair in fetch_unresolved(&pool, Some(us.id), 150).await.unwrap() {
            persist_status(&pool, pair.id, VisaStatus::VisaRequired, "")
                .await
                .unwrap();
        }

        let passports = valid_passports(&pool).await.unwrap();
        assert_eq!(passports.len(), 1);
        assert_eq!(passports[0].name, "US");
    }
}
