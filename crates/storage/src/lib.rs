use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use practice::EntityStore;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::info;

use shared::{
    domain::{Item, ItemId, ProgressEntry, ProgressEvent, ProgressEventId, Room, RoomId},
    error::StoreError,
};

const SAMPLE_ROOM_NAME: &str = "First room";
const SAMPLE_ROOM_DESCRIPTION: &str = "Sample room to get started";
const SAMPLE_ITEM_NAME: &str = "Winged cat";
const SAMPLE_ITEM_HINT: &str = "A cat with golden wings";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to an in-memory URL opens a separate database,
        // so the pool must hold exactly one and never recycle it.
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(connect_options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn add_room(&self, name: &str, description: &str) -> Result<RoomId> {
        let name = name.trim();
        if name.is_empty() {
            bail!(StoreError::Invalid("room name must not be empty".into()));
        }

        let rec = sqlx::query("INSERT INTO rooms (name, description) VALUES (?, ?) RETURNING id")
            .bind(name)
            .bind(description.trim())
            .fetch_one(&self.pool)
            .await;
        match rec {
            Ok(rec) => Ok(RoomId(rec.get::<i64, _>(0))),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                bail!(StoreError::Invalid(format!("a room named '{name}' already exists")))
            }
            Err(err) => Err(err).context("failed to insert room"),
        }
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        let rows = sqlx::query("SELECT id, name, description FROM rooms ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(room_from_row).collect())
    }

    pub async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>> {
        let row = sqlx::query("SELECT id, name, description FROM rooms WHERE id = ?")
            .bind(room_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(room_from_row))
    }

    /// Removes the room and every item in it. Returns `false` if the room did not exist.
    pub async fn delete_room(&self, room_id: RoomId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM items WHERE room_id = ?")
            .bind(room_id.0)
            .execute(&mut *tx)
            .await?;
        let rooms = sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(room_id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(rooms > 0)
    }

    pub async fn add_item(
        &self,
        room_id: RoomId,
        name: &str,
        hint: &str,
        image_path: Option<&str>,
    ) -> Result<ItemId> {
        let name = name.trim();
        if name.is_empty() {
            bail!(StoreError::Invalid("item name must not be empty".into()));
        }
        let image_path = image_path.map(str::trim).filter(|path| !path.is_empty());

        let mut tx = self.pool.begin().await?;
        let room_exists = sqlx::query("SELECT 1 FROM rooms WHERE id = ?")
            .bind(room_id.0)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !room_exists {
            bail!(StoreError::RoomNotFound(room_id));
        }

        let rec = sqlx::query(
            "INSERT INTO items (room_id, name, hint, image_path) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(room_id.0)
        .bind(name)
        .bind(hint.trim())
        .bind(image_path)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(ItemId(rec.get::<i64, _>(0)))
    }

    pub async fn get_item(&self, item_id: ItemId) -> Result<Option<Item>> {
        let row = sqlx::query("SELECT id, room_id, name, hint, image_path FROM items WHERE id = ?")
            .bind(item_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(item_from_row))
    }

    pub async fn list_all_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query("SELECT id, room_id, name, hint, image_path FROM items ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(item_from_row).collect())
    }

    /// Items of one room, or `None` when the room does not exist.
    pub async fn list_room_items(&self, room_id: RoomId) -> Result<Option<Vec<Item>>> {
        if self.get_room(room_id).await?.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT id, room_id, name, hint, image_path
             FROM items
             WHERE room_id = ?
             ORDER BY id ASC",
        )
        .bind(room_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(rows.iter().map(item_from_row).collect()))
    }

    pub async fn delete_item(&self, item_id: ItemId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// Records that an item was shown. Returns `None` if the item does not exist.
    ///
    /// `seen_at` never goes backwards relative to the newest stored event,
    /// even if the wall clock does.
    pub async fn log_seen(&self, item_id: ItemId, note: Option<&str>) -> Result<Option<ProgressEvent>> {
        let note = note.map(str::trim).filter(|note| !note.is_empty());
        let mut tx = self.pool.begin().await?;

        let item_exists = sqlx::query("SELECT 1 FROM items WHERE id = ?")
            .bind(item_id.0)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !item_exists {
            return Ok(None);
        }

        let last_seen_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT seen_at FROM progress_events ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;
        let now = Utc::now();
        let seen_at = last_seen_at.map_or(now, |last| last.max(now));

        let rec = sqlx::query(
            "INSERT INTO progress_events (item_id, seen_at, note) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(item_id.0)
        .bind(seen_at)
        .bind(note)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert progress event")?;
        tx.commit().await?;

        Ok(Some(ProgressEvent {
            id: ProgressEventId(rec.get::<i64, _>(0)),
            item_id,
            seen_at,
            note: note.map(str::to_string),
        }))
    }

    /// Newest-first review history, optionally for a single item.
    pub async fn list_progress(&self, item_id: Option<ItemId>, limit: u32) -> Result<Vec<ProgressEntry>> {
        let rows = if let Some(item_id) = item_id {
            sqlx::query(
                "SELECT p.id, p.item_id, p.seen_at, p.note, i.name
                 FROM progress_events p
                 LEFT JOIN items i ON i.id = p.item_id
                 WHERE p.item_id = ?
                 ORDER BY p.id DESC
                 LIMIT ?",
            )
            .bind(item_id.0)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT p.id, p.item_id, p.seen_at, p.note, i.name
                 FROM progress_events p
                 LEFT JOIN items i ON i.id = p.item_id
                 ORDER BY p.id DESC
                 LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .into_iter()
            .map(|r| ProgressEntry {
                event: ProgressEvent {
                    id: ProgressEventId(r.get::<i64, _>(0)),
                    item_id: ItemId(r.get::<i64, _>(1)),
                    seen_at: r.get::<DateTime<Utc>, _>(2),
                    note: r.get::<Option<String>, _>(3),
                },
                item_name: r.get::<Option<String>, _>(4),
            })
            .collect())
    }

    /// Creates a starter room with one item when no rooms exist yet.
    pub async fn seed_sample_room(&self) -> Result<bool> {
        let rooms: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;
        if rooms > 0 {
            return Ok(false);
        }

        let room_id = self
            .add_room(SAMPLE_ROOM_NAME, SAMPLE_ROOM_DESCRIPTION)
            .await?;
        self.add_item(room_id, SAMPLE_ITEM_NAME, SAMPLE_ITEM_HINT, None)
            .await?;
        info!(%room_id, "seeded sample room");
        Ok(true)
    }
}

fn room_from_row(row: &SqliteRow) -> Room {
    Room {
        id: RoomId(row.get::<i64, _>(0)),
        name: row.get::<String, _>(1),
        description: row.get::<String, _>(2),
    }
}

fn item_from_row(row: &SqliteRow) -> Item {
    Item {
        id: ItemId(row.get::<i64, _>(0)),
        room_id: RoomId(row.get::<i64, _>(1)),
        name: row.get::<String, _>(2),
        hint: row.get::<String, _>(3),
        image_path: row.get::<Option<String>, _>(4),
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[async_trait]
impl EntityStore for Storage {
    async fn list_items(&self, room_id: Option<RoomId>) -> Result<Vec<Item>, StoreError> {
        match room_id {
            None => Ok(self.list_all_items().await?),
            Some(room_id) => self
                .list_room_items(room_id)
                .await?
                .ok_or(StoreError::RoomNotFound(room_id)),
        }
    }

    async fn append_progress_event(
        &self,
        item_id: ItemId,
        note: Option<&str>,
    ) -> Result<ProgressEvent, StoreError> {
        self.log_seen(item_id, note)
            .await?
            .ok_or(StoreError::ItemNotFound(item_id))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
