use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use super::{
    association::Association,
    error::StorageError,
    storage::{CounterReport, Storage, StorageTx},
};

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
    statement_timeout_ms: Option<u64>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout_ms: None,
        }
    }

    /// Caps every statement of a relation transaction, so a stuck lock
    /// aborts the change instead of holding the connection.
    pub fn with_statement_timeout(mut self, timeout_ms: u64) -> Self {
        self.statement_timeout_ms = Some(timeout_ms);
        self
    }
}

fn counter_column(association: &'static Association) -> Result<&'static str, StorageError> {
    association.counter_column.ok_or_else(|| {
        StorageError::Constraint(format!("{} has no counter column", association.name))
    })
}

#[async_trait]
impl Storage for PgStorage {
    type Tx = PgStorageTx;

    #[instrument(name = "db.relation.begin", skip(self))]
    async fn begin(&self) -> Result<PgStorageTx, StorageError> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout_ms) = self.statement_timeout_ms {
            sqlx::query("SELECT set_config('statement_timeout', $1, true)")
                .bind(format!("{timeout_ms}ms"))
                .execute(&mut *tx)
                .await?;
        }

        Ok(PgStorageTx { tx })
    }

    #[instrument(name = "db.relation.contains", skip(self, association), fields(association = association.name))]
    async fn contains(
        &self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = $1 AND {} = $2) AS exists",
            association.table, association.owner_column, association.member_column
        );
        let row = sqlx::query(&sql)
            .bind(owner)
            .bind(member)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<bool, _>("exists"))
    }

    #[instrument(name = "db.relation.count_by_owner", skip(self, association), fields(association = association.name))]
    async fn count_by_owner(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<i64, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {} = $1",
            association.table, association.owner_column
        );
        let row = sqlx::query(&sql).bind(owner).fetch_one(&self.pool).await?;

        Ok(row.get::<i64, _>("count"))
    }

    #[instrument(name = "db.relation.count_by_member", skip(self, association), fields(association = association.name))]
    async fn count_by_member(
        &self,
        association: &'static Association,
        member: i32,
    ) -> Result<i64, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) AS count FROM {} WHERE {} = $1",
            association.table, association.member_column
        );
        let row = sqlx::query(&sql).bind(member).fetch_one(&self.pool).await?;

        Ok(row.get::<i64, _>("count"))
    }

    #[instrument(name = "db.relation.owners_with_member", skip(self, association, owners), fields(association = association.name))]
    async fn owners_with_member(
        &self,
        association: &'static Association,
        member: i32,
        owners: &[i32],
    ) -> Result<Vec<i32>, StorageError> {
        let sql = format!(
            "SELECT {owner} FROM {table} WHERE {member} = $1 AND {owner} = ANY($2)",
            owner = association.owner_column,
            table = association.table,
            member = association.member_column,
        );
        let rows = sqlx::query(&sql)
            .bind(member)
            .bind(owners)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| r.get::<i32, _>(association.owner_column))
            .collect())
    }

    #[instrument(name = "db.relation.read_counter", skip(self, association), fields(association = association.name))]
    async fn read_counter(
        &self,
        association: &'static Association,
        owner: i32,
    ) -> Result<Option<i64>, StorageError> {
        let column = counter_column(association)?;
        let sql = format!(
            "SELECT {column}::BIGINT AS value FROM {} WHERE id = $1",
            association.owner_table
        );
        let row = sqlx::query(&sql)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<i64, _>("value")))
    }

    #[instrument(name = "db.relation.counter_drift", skip(self, association), fields(association = association.name))]
    async fn counter_drift(
        &self,
        association: &'static Association,
    ) -> Result<Vec<CounterReport>, StorageError> {
        let column = counter_column(association)?;
        let sql = format!(
            r#"
            SELECT o.id AS owner, o.{column}::BIGINT AS stored, COUNT(l.{member})::BIGINT AS actual
            FROM {owners} o
            LEFT JOIN {table} l ON l.{owner} = o.id
            GROUP BY o.id, o.{column}
            HAVING o.{column} <> COUNT(l.{member})
            ORDER BY o.id
            "#,
            owners = association.owner_table,
            table = association.table,
            owner = association.owner_column,
            member = association.member_column,
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|r| CounterReport {
                owner: r.get("owner"),
                stored: r.get("stored"),
                actual: r.get("actual"),
            })
            .collect())
    }
}

pub struct PgStorageTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StorageTx for PgStorageTx {
    #[instrument(name = "db.relation.insert_link", skip(self, association), fields(association = association.name))]
    async fn insert_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            association.table, association.owner_column, association.member_column
        );
        let result = sqlx::query(&sql)
            .bind(owner)
            .bind(member)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.relation.delete_link", skip(self, association), fields(association = association.name))]
    async fn delete_link(
        &mut self,
        association: &'static Association,
        owner: i32,
        member: i32,
    ) -> Result<bool, StorageError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            association.table, association.owner_column, association.member_column
        );
        let result = sqlx::query(&sql)
            .bind(owner)
            .bind(member)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(name = "db.relation.adjust_counter", skip(self, association), fields(association = association.name))]
    async fn adjust_counter(
        &mut self,
        association: &'static Association,
        owner: i32,
        delta: i32,
    ) -> Result<i64, StorageError> {
        let column = counter_column(association)?;
        let sql = format!(
            "UPDATE {} SET {column} = {column} + $2 WHERE id = $1 RETURNING {column}",
            association.owner_table
        );
        let value: Option<i32> = sqlx::query_scalar(&sql)
            .bind(owner)
            .bind(delta)
            .fetch_optional(&mut *self.tx)
            .await?;

        value.map(i64::from).ok_or(StorageError::MissingRow {
            table: association.owner_table,
            id: owner,
        })
    }

    async fn commit(self) -> Result<(), StorageError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), StorageError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
