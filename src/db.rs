use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{StoreError, ValidationError};
use crate::models::{Application, ApplicationId, ApplicationStatus, StatusTransition};
use crate::store::ApplicationStore;

pub struct Database {
    conn: Connection,
    path: PathBuf,
}

const APPLICATION_COLUMNS: &str = "id, user_id, job_id, company, position, location, status,
     applied_at, response_at, last_updated, interview_at, followed_up, notes, tags";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        })
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS applications (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                job_id TEXT,
                company TEXT NOT NULL,
                position TEXT NOT NULL,
                location TEXT,
                status TEXT NOT NULL DEFAULT 'applied' CHECK (status IN ('applied', 'screening', 'interview', 'offer', 'rejected', 'withdrawn')),
                applied_at TEXT NOT NULL,
                response_at TEXT,
                last_updated TEXT NOT NULL,
                interview_at TEXT,
                followed_up INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                tags TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS status_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                application_id TEXT NOT NULL REFERENCES applications(id),
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                changed_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
            CREATE INDEX IF NOT EXISTS idx_applications_status ON applications(status);
            CREATE INDEX IF NOT EXISTS idx_history_application ON status_history(application_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!(
                "Database not initialized. Run 'applytrack init' first."
            ));
        }
        Ok(())
    }
}

// Raw column values; parsing happens outside rusqlite so bad rows map to Malformed.
struct ApplicationRow {
    id: String,
    user_id: String,
    job_id: Option<String>,
    company: String,
    position: String,
    location: Option<String>,
    status: String,
    applied_at: String,
    response_at: Option<String>,
    last_updated: String,
    interview_at: Option<String>,
    followed_up: bool,
    notes: Option<String>,
    tags: String,
}

impl ApplicationRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            job_id: row.get(2)?,
            company: row.get(3)?,
            position: row.get(4)?,
            location: row.get(5)?,
            status: row.get(6)?,
            applied_at: row.get(7)?,
            response_at: row.get(8)?,
            last_updated: row.get(9)?,
            interview_at: row.get(10)?,
            followed_up: row.get(11)?,
            notes: row.get(12)?,
            tags: row.get(13)?,
        })
    }

    fn into_application(self) -> Result<Application, StoreError> {
        let status = self
            .status
            .parse::<ApplicationStatus>()
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", self.id)))?;
        let tags: Vec<String> = serde_json::from_str(&self.tags)
            .map_err(|e| StoreError::Malformed(format!("{}: tags: {e}", self.id)))?;
        Ok(Application {
            applied_date: parse_stored(&self.id, &self.applied_at)?,
            response_date: parse_optional(&self.id, self.response_at.as_deref())?,
            last_updated: parse_stored(&self.id, &self.last_updated)?,
            interview_date: parse_optional(&self.id, self.interview_at.as_deref())?,
            id: ApplicationId(self.id),
            user_id: self.user_id,
            job_id: self.job_id,
            company: self.company,
            position: self.position,
            location: self.location,
            status,
            followed_up: self.followed_up,
            notes: self.notes,
            tags,
        })
    }
}

fn format_stored(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_stored(id: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed(format!("{id}: timestamp '{value}': {e}")))
}

fn parse_optional(id: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
    value.map(|v| parse_stored(id, v)).transpose()
}

fn upsert_application(conn: &Connection, application: &Application) -> Result<(), StoreError> {
    let tags = serde_json::to_string(&application.tags)
        .map_err(|e| StoreError::Malformed(format!("{}: tags: {e}", application.id)))?;
    // applied_at is left out of the update branch: it never changes after creation.
    conn.execute(
        "INSERT INTO applications (id, user_id, job_id, company, position, location, status,
                                   applied_at, response_at, last_updated, interview_at,
                                   followed_up, notes, tags)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
            user_id = excluded.user_id,
            job_id = excluded.job_id,
            company = excluded.company,
            position = excluded.position,
            location = excluded.location,
            status = excluded.status,
            response_at = excluded.response_at,
            last_updated = excluded.last_updated,
            interview_at = excluded.interview_at,
            followed_up = excluded.followed_up,
            notes = excluded.notes,
            tags = excluded.tags",
        params![
            application.id.as_str(),
            application.user_id,
            application.job_id,
            application.company,
            application.position,
            application.location,
            application.status.as_str(),
            format_stored(application.applied_date),
            application.response_date.map(format_stored),
            format_stored(application.last_updated),
            application.interview_date.map(format_stored),
            application.followed_up,
            application.notes,
            tags,
        ],
    )?;
    Ok(())
}

fn insert_transition(conn: &Connection, transition: &StatusTransition) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO status_history (application_id, from_status, to_status, changed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            transition.application_id.as_str(),
            transition.from.as_str(),
            transition.to.as_str(),
            format_stored(transition.at),
        ],
    )?;
    Ok(())
}

impl ApplicationStore for Database {
    fn list_applications(&self, user_id: &str) -> Result<Vec<Application>, StoreError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE user_id = ?1 ORDER BY applied_at DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([user_id], ApplicationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ApplicationRow::into_application).collect()
    }

    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = ?1");
        let row = self
            .conn
            .query_row(&sql, [id.as_str()], ApplicationRow::from_row)
            .optional()?;
        row.map(ApplicationRow::into_application).transpose()
    }

    fn put_application(&self, application: &Application) -> Result<(), StoreError> {
        upsert_application(&self.conn, application)
    }

    fn put_all(&self, applications: &[Application]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        for application in applications {
            upsert_application(&tx, application)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn put_with_transition(
        &self,
        application: &Application,
        transition: &StatusTransition,
    ) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        upsert_application(&tx, application)?;
        insert_transition(&tx, transition)?;
        tx.commit()?;
        Ok(())
    }

    fn transitions(&self, id: &ApplicationId) -> Result<Vec<StatusTransition>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT from_status, to_status, changed_at FROM status_history
             WHERE application_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(from, to, at)| -> Result<StatusTransition, StoreError> {
                let malformed = |e: ValidationError| StoreError::Malformed(format!("{id}: history: {e}"));
                Ok(StatusTransition {
                    application_id: id.clone(),
                    from: from.parse::<ApplicationStatus>().map_err(malformed)?,
                    to: to.parse::<ApplicationStatus>().map_err(malformed)?,
                    at: parse_stored(id.as_str(), &at)?,
                })
            })
            .collect()
    }
}
