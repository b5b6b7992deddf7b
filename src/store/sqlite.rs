//! SQLite-backed record store.

use super::{
    CollectionStatistics, ConferenceStat, ConferenceStatistics, DetailFilter, LabelCount,
    NewVideoUrl, OverallStats, StoredVideoDetails, UrlFilter, VideoDetails, VideoUrlRecord,
    DEFAULT_DETAIL_LIMIT, DEFAULT_URL_LIMIT,
};
use crate::error::{HarvestError, Result};
use crate::source::SourceType;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS video_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    channel_name TEXT NOT NULL DEFAULT '',
    source_type TEXT NOT NULL CHECK (source_type IN ('channel', 'playlist')),
    source_url TEXT NOT NULL,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_video_urls_collected_at ON video_urls(collected_at);

CREATE TABLE IF NOT EXISTS video_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_url TEXT NOT NULL UNIQUE REFERENCES video_urls(url),
    video_id TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    channel_name TEXT,
    upload_date TEXT,
    duration_seconds INTEGER,
    view_count INTEGER,
    like_count INTEGER,
    comment_count INTEGER,
    conference_name TEXT,
    conference_year INTEGER,
    tags TEXT NOT NULL DEFAULT '[]',
    thumbnail_url TEXT,
    extracted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_video_details_conference
    ON video_details(conference_name, conference_year);
"#;

const URL_COLUMNS: &str =
    "id, url, title, channel_name, source_type, source_url, collected_at";

const DETAIL_COLUMNS: &str = "id, video_url, video_id, title, description, channel_name, \
     upload_date, duration_seconds, view_count, like_count, comment_count, conference_name, \
     conference_year, tags, thumbnail_url, extracted_at";

/// Record store owning a single SQLite connection.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database file and its schema.
    #[instrument(skip_all)]
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(&conn)?;

        info!("Opened record store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Release the connection, surfacing any error from closing it.
    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| HarvestError::Store(format!("Connection lock poisoned: {}", e)))?;
        conn.close().map_err(|(_, e)| HarvestError::from(e))?;
        debug!("Closed record store");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| HarvestError::Store(format!("Failed to acquire lock: {}", e)))
    }

    /// Record a URL unless it is already present.
    ///
    /// Returns `false` for a duplicate; the existing row, including its
    /// `collected_at`, is left as it was.
    #[instrument(skip(self, record), fields(url = %record.url))]
    pub fn upsert_url(&self, record: &NewVideoUrl) -> Result<bool> {
        let conn = self.conn()?;

        let changed = conn.execute(
            r#"
            INSERT INTO video_urls (url, title, channel_name, source_type, source_url, collected_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(url) DO NOTHING
            "#,
            params![
                record.url,
                record.title,
                record.channel_name,
                record.source_type.as_str(),
                record.source_url,
                now_timestamp(),
            ],
        )?;

        Ok(changed == 1)
    }

    /// Write the details for a collected URL, replacing any previous row.
    ///
    /// Returns `true` when no details existed for the URL. The row id is kept
    /// on overwrite.
    #[instrument(skip(self, details), fields(video_url = %details.video_url))]
    pub fn upsert_detail(&self, details: &VideoDetails) -> Result<bool> {
        let conn = self.conn()?;
        let tags = serde_json::to_string(&details.tags)?;

        let tx = conn.unchecked_transaction()?;

        let existed: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM video_details WHERE video_url = ?1)",
            params![details.video_url],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO video_details
            (video_url, video_id, title, description, channel_name, upload_date,
             duration_seconds, view_count, like_count, comment_count, conference_name,
             conference_year, tags, thumbnail_url, extracted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT(video_url) DO UPDATE SET
                video_id = excluded.video_id,
                title = excluded.title,
                description = excluded.description,
                channel_name = excluded.channel_name,
                upload_date = excluded.upload_date,
                duration_seconds = excluded.duration_seconds,
                view_count = excluded.view_count,
                like_count = excluded.like_count,
                comment_count = excluded.comment_count,
                conference_name = excluded.conference_name,
                conference_year = excluded.conference_year,
                tags = excluded.tags,
                thumbnail_url = excluded.thumbnail_url,
                extracted_at = excluded.extracted_at
            "#,
            params![
                details.video_url,
                details.video_id,
                details.title,
                details.description,
                details.channel_name,
                details.upload_date.map(|d| d.format("%Y-%m-%d").to_string()),
                details.duration_seconds,
                details.view_count,
                details.like_count,
                details.comment_count,
                details.conference_name,
                details.conference_year,
                tags,
                details.thumbnail_url,
                now_timestamp(),
            ],
        )?;

        tx.commit()?;

        debug!(replaced = existed, "Saved video details");
        Ok(!existed)
    }

    /// List collected URLs, newest first.
    #[instrument(skip(self))]
    pub fn list_urls(&self, filter: &UrlFilter) -> Result<Vec<VideoUrlRecord>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM video_urls WHERE 1=1", URL_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(source_type) = filter.source_type {
            values.push(Value::Text(source_type.as_str().to_string()));
            sql.push_str(&format!(" AND source_type = ?{}", values.len()));
        }
        if let Some(channel) = &filter.channel_name {
            values.push(Value::Text(channel.clone()));
            sql.push_str(&format!(" AND channel_name = ?{}", values.len()));
        }
        if let Some(source_url) = &filter.source_url {
            values.push(Value::Text(source_url.clone()));
            sql.push_str(&format!(" AND source_url = ?{}", values.len()));
        }

        values.push(Value::Integer(sql_limit(filter.limit.unwrap_or(DEFAULT_URL_LIMIT))));
        sql.push_str(&format!(
            " ORDER BY collected_at DESC, id DESC LIMIT ?{}",
            values.len()
        ));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_url)?;
        let result = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Found {} collected URLs", result.len());
        Ok(result)
    }

    /// List stored details, most viewed first.
    #[instrument(skip(self))]
    pub fn list_details(&self, filter: &DetailFilter) -> Result<Vec<StoredVideoDetails>> {
        let conn = self.conn()?;

        let mut sql = format!("SELECT {} FROM video_details WHERE 1=1", DETAIL_COLUMNS);
        let mut values: Vec<Value> = Vec::new();

        if let Some(video_url) = &filter.video_url {
            values.push(Value::Text(video_url.clone()));
            sql.push_str(&format!(" AND video_url = ?{}", values.len()));
        }
        if let Some(name) = &filter.conference_name {
            values.push(Value::Text(name.clone()));
            sql.push_str(&format!(
                " AND conference_name LIKE '%' || ?{} || '%'",
                values.len()
            ));
        }
        if let Some(year) = filter.conference_year {
            values.push(Value::Integer(i64::from(year)));
            sql.push_str(&format!(" AND conference_year = ?{}", values.len()));
        }

        values.push(Value::Integer(sql_limit(filter.limit.unwrap_or(DEFAULT_DETAIL_LIMIT))));
        sql.push_str(&format!(" ORDER BY view_count DESC, id ASC LIMIT ?{}", values.len()));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), row_to_details)?;
        let result = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!("Found {} detail rows", result.len());
        Ok(result)
    }

    /// Collected URLs that have no details yet, newest first.
    #[instrument(skip(self))]
    pub fn list_unprocessed(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT v.url
            FROM video_urls v
            LEFT JOIN video_details d ON d.video_url = v.url
            WHERE d.id IS NULL
            ORDER BY v.collected_at DESC, v.id DESC
            "#,
        )?;

        let urls = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        info!("Found {} unprocessed video URLs", urls.len());
        Ok(urls)
    }

    /// Look up a collected URL.
    pub fn get_url(&self, url: &str) -> Result<Option<VideoUrlRecord>> {
        let conn = self.conn()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM video_urls WHERE url = ?1", URL_COLUMNS),
            params![url],
            row_to_url,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Look up the details stored for a URL.
    pub fn get_detail(&self, video_url: &str) -> Result<Option<StoredVideoDetails>> {
        let conn = self.conn()?;

        let result = conn.query_row(
            &format!("SELECT {} FROM video_details WHERE video_url = ?1", DETAIL_COLUMNS),
            params![video_url],
            row_to_details,
        );

        match result {
            Ok(details) => Ok(Some(details)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Per-conference and overall aggregates over the detail rows.
    #[instrument(skip(self))]
    pub fn conference_statistics(&self) -> Result<ConferenceStatistics> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT conference_name,
                   conference_year,
                   COUNT(*) AS video_count,
                   AVG(view_count) AS avg_views,
                   COALESCE(SUM(duration_seconds), 0) AS total_duration
            FROM video_details
            WHERE conference_name IS NOT NULL
            GROUP BY conference_name, conference_year
            ORDER BY conference_year DESC, video_count DESC, conference_name
            "#,
        )?;

        let conferences = stmt
            .query_map([], |row| {
                Ok(ConferenceStat {
                    conference_name: row.get(0)?,
                    conference_year: row.get(1)?,
                    video_count: row.get(2)?,
                    avg_views: row.get(3)?,
                    total_duration_seconds: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let overall = conn.query_row(
            r#"
            SELECT COUNT(*),
                   COUNT(DISTINCT conference_name),
                   COUNT(DISTINCT conference_year),
                   AVG(view_count),
                   COALESCE(SUM(duration_seconds), 0)
            FROM video_details
            "#,
            [],
            |row| {
                Ok(OverallStats {
                    total_videos: row.get(0)?,
                    unique_conferences: row.get(1)?,
                    unique_years: row.get(2)?,
                    avg_views: row.get(3)?,
                    total_duration_seconds: row.get(4)?,
                })
            },
        )?;

        Ok(ConferenceStatistics {
            overall,
            conferences,
        })
    }

    /// Counts describing how far collection and enrichment have progressed.
    #[instrument(skip(self))]
    pub fn collection_statistics(&self) -> Result<CollectionStatistics> {
        let conn = self.conn()?;

        let collected_urls: i64 =
            conn.query_row("SELECT COUNT(*) FROM video_urls", [], |row| row.get(0))?;
        let detailed: i64 =
            conn.query_row("SELECT COUNT(*) FROM video_details", [], |row| row.get(0))?;
        let unprocessed: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM video_urls v
            LEFT JOIN video_details d ON d.video_url = v.url
            WHERE d.id IS NULL
            "#,
            [],
            |row| row.get(0),
        )?;

        let label_counts = |sql: &str| -> Result<Vec<LabelCount>> {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(LabelCount {
                        label: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        };

        let by_source_type = label_counts(
            "SELECT source_type, COUNT(*) AS n FROM video_urls \
             GROUP BY source_type ORDER BY n DESC, source_type",
        )?;
        let top_channels = label_counts(
            "SELECT CASE WHEN channel_name = '' THEN 'Unknown' ELSE channel_name END AS channel, \
             COUNT(*) AS n FROM video_urls GROUP BY channel ORDER BY n DESC, channel LIMIT 5",
        )?;

        Ok(CollectionStatistics {
            collected_urls,
            detailed,
            unprocessed,
            by_source_type,
            top_channels,
        })
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, format!("Invalid timestamp {:?}: {}", value, e)))
}

/// SQLite reads a negative LIMIT as unbounded, so clamp instead of wrapping.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn row_to_url(row: &Row<'_>) -> rusqlite::Result<VideoUrlRecord> {
    let source_type: String = row.get(4)?;
    let collected_at: String = row.get(6)?;

    Ok(VideoUrlRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        channel_name: row.get(3)?,
        source_type: source_type
            .parse::<SourceType>()
            .map_err(|e| conversion_error(4, e))?,
        source_url: row.get(5)?,
        collected_at: parse_timestamp(6, &collected_at)?,
    })
}

fn row_to_details(row: &Row<'_>) -> rusqlite::Result<StoredVideoDetails> {
    let upload_date: Option<String> = row.get(6)?;
    let tags_json: String = row.get(13)?;
    let extracted_at: String = row.get(15)?;

    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| conversion_error(13, format!("Invalid tags JSON: {}", e)))?;

    Ok(StoredVideoDetails {
        id: row.get(0)?,
        extracted_at: parse_timestamp(15, &extracted_at)?,
        details: VideoDetails {
            video_url: row.get(1)?,
            video_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            channel_name: row.get(5)?,
            upload_date: upload_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            duration_seconds: row.get(7)?,
            view_count: row.get(8)?,
            like_count: row.get(9)?,
            comment_count: row.get(10)?,
            conference_name: row.get(11)?,
            conference_year: row.get(12)?,
            tags,
            thumbnail_url: row.get(14)?,
        },
    })
}
