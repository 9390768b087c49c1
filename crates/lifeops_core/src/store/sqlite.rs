//! SQLite implementation of `EntityStore`.

use super::{EntityStore, StoreError, StoreResult, StoredEntity};
use crate::db::migrations::latest_version;
use crate::model::EntityId;
use rusqlite::{params_from_iter, Connection};

/// SQLite-backed entity store over a migrated connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Wraps a connection returned by `open_db` / `open_db_in_memory`.
    ///
    /// Fails when the connection was not migrated to the latest schema.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        self.conn
    }
}

impl EntityStore for SqliteStore<'_> {
    fn insert<E: StoredEntity>(&self, entity: &E) -> StoreResult<EntityId> {
        entity.validate()?;

        let placeholders = (1..=E::COLUMNS.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::COLUMNS.join(", ")
        );
        self.conn
            .execute(&sql, params_from_iter(entity.to_values()))?;
        Ok(entity.id())
    }

    fn update<E: StoredEntity>(&self, entity: &E) -> StoreResult<()> {
        entity.validate()?;

        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .skip(1)
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {assignments} WHERE id = ?1;", E::TABLE);
        let changed = self
            .conn
            .execute(&sql, params_from_iter(entity.to_values()))?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: E::KIND,
                id: entity.id(),
            });
        }
        Ok(())
    }

    fn delete<E: StoredEntity>(&self, id: EntityId) -> StoreResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1;", E::TABLE);
        let changed = self.conn.execute(&sql, [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound { kind: E::KIND, id });
        }
        Ok(())
    }

    fn get<E: StoredEntity>(&self, id: EntityId) -> StoreResult<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1;",
            E::COLUMNS.join(", "),
            E::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row)?));
        }
        Ok(None)
    }

    fn fetch<E: StoredEntity>(&self, predicate: impl Fn(&E) -> bool) -> StoreResult<Vec<E>> {
        self.select_ordered(E::ORDER_BY, predicate)
    }

    fn fetch_newest_first<E: StoredEntity>(
        &self,
        predicate: impl Fn(&E) -> bool,
    ) -> StoreResult<Vec<E>> {
        self.select_ordered("created_at DESC, rowid DESC", predicate)
    }
}

impl SqliteStore<'_> {
    fn select_ordered<E: StoredEntity>(
        &self,
        order_by: &str,
        predicate: impl Fn(&E) -> bool,
    ) -> StoreResult<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {order_by};",
            E::COLUMNS.join(", "),
            E::TABLE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            let entity = E::from_row(row)?;
            if predicate(&entity) {
                entities.push(entity);
            }
        }
        Ok(entities)
    }
}
