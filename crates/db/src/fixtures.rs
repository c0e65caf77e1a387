use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Row counts the seed dataset guarantees, per table.
const SEED_TABLES: &[SeedTableContract] = &[
    SeedTableContract { table: "menu_category", id_column: "id", ids: &[1, 2, 3] },
    SeedTableContract { table: "dish", id_column: "id", ids: &[1, 2, 3, 4, 5] },
    SeedTableContract { table: "ingredient", id_column: "id", ids: &[1, 2, 3, 4, 5, 6, 7] },
    SeedTableContract { table: "customer", id_column: "id", ids: &[1, 2, 3] },
    SeedTableContract {
        table: "customer_order",
        id_column: "id",
        ids: &[1001, 1002, 1003, 1004, 1005, 1006, 1007, 1008],
    },
    SeedTableContract {
        table: "order_item",
        id_column: "id",
        ids: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14],
    },
    SeedTableContract { table: "service_record", id_column: "id", ids: &[1, 2, 3] },
    SeedTableContract { table: "service_feedback", id_column: "id", ids: &[1, 2, 3] },
];

/// Seeded dish links; `dish_ingredient` has a composite key.
const SEED_DISH_INGREDIENT_LINKS: i64 = 8;

/// Orders seeded inside the default 30-day window (the rest are older).
const SEED_ORDERS_IN_DEFAULT_WINDOW: i64 = 7;

/// Deterministic demo dataset for the analytics engine.
///
/// Order dates are relative to the current local day, so a freshly seeded
/// database always has recent sales. Loading is idempotent.
pub struct SeedDataset;

impl SeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let tables_seeded = SEED_TABLES.iter().map(|contract| contract.table).collect();
        Ok(SeedResult { tables_seeded })
    }

    /// Checks that every seeded row is present.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for contract in SEED_TABLES {
            let ids = sql_array_from_ids(contract.ids);
            let count: i64 = sqlx::query_scalar(&format!(
                "SELECT COUNT(1) FROM {} WHERE {} IN {ids}",
                contract.table, contract.id_column
            ))
            .fetch_one(pool)
            .await?;
            checks.push((contract.table, count == contract.expected()));
        }

        let link_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM dish_ingredient WHERE dish_id BETWEEN 1 AND 5",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("dish_ingredient", link_count == SEED_DISH_INGREDIENT_LINKS));

        let recent_orders: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM customer_order
             WHERE id BETWEEN 1001 AND 1008
               AND order_date >= date('now', 'localtime', '-30 day')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("orders-in-default-window", recent_orders == SEED_ORDERS_IN_DEFAULT_WINDOW));

        let totals_consistent: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM customer_order co
             WHERE co.id BETWEEN 1001 AND 1008
               AND CAST(co.total_amount AS REAL) = (
                   SELECT SUM(oi.quantity * CAST(oi.unit_price AS REAL))
                   FROM order_item oi WHERE oi.order_id = co.id
               )",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("order-totals-match-items", totals_consistent == 8));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded rows, children first.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM dish_ingredient WHERE dish_id BETWEEN 1 AND 5")
            .execute(&mut *tx)
            .await?;
        for contract in SEED_TABLES.iter().rev() {
            let ids = sql_array_from_ids(contract.ids);
            sqlx::query(&format!(
                "DELETE FROM {} WHERE {} IN {ids}",
                contract.table, contract.id_column
            ))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedTableContract {
    table: &'static str,
    id_column: &'static str,
    ids: &'static [i64],
}

impl SeedTableContract {
    fn expected(&self) -> i64 {
        self.ids.len() as i64
    }
}

fn sql_array_from_ids(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub tables_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
