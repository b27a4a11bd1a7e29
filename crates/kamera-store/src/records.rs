// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record store backed by SQLite.
//
// Holds projects, test packages, pdf lines and remarks. Ownership is expressed
// with foreign keys declared `ON DELETE CASCADE`, so deleting a project removes
// its packages, lines and remarks transitively. Attachment bytes are NOT stored
// here; rows only carry the `/uploads/...` reference.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument, warn};

use kamera_core::error::{KameraError, Result};
use kamera_core::types::{
    FullLine, FullPackage, PackageFields, PdfLine, Project, RecordId, Remark, TestPackage,
};

/// SQLite schema. Statements are idempotent.
const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_number TEXT NOT NULL UNIQUE,
        customer_name TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS test_packages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        comment TEXT,
        pipe_type TEXT,
        lining TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS pdf_lines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        test_package_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        pdf_path TEXT,
        line_number INTEGER,
        created_at TEXT NOT NULL,
        FOREIGN KEY (test_package_id) REFERENCES test_packages(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS remarks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        pdf_line_id INTEGER NOT NULL,
        image_path TEXT NOT NULL,
        comment TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (pdf_line_id) REFERENCES pdf_lines(id) ON DELETE CASCADE
    );
"#;

/// Columns added after the first schema revision. An ALTER whose column
/// already exists is skipped.
const MIGRATE_CLASSIFICATION_SQL: &str = r#"
    ALTER TABLE test_packages ADD COLUMN pipe_type TEXT;
    ALTER TABLE test_packages ADD COLUMN lining TEXT;
"#;

const PROJECT_COLUMNS: &str = "id, project_number, customer_name, created_at";
const PACKAGE_COLUMNS: &str = "id, project_id, name, comment, pipe_type, lining, created_at";
const LINE_COLUMNS: &str = "id, test_package_id, name, pdf_path, line_number, created_at";
const REMARK_COLUMNS: &str = "id, pdf_line_id, image_path, comment, created_at";

/// Row totals per table, mainly for diagnostics and cascade checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    pub projects: u64,
    pub packages: u64,
    pub lines: u64,
    pub remarks: u64,
}

/// Record store backed by a SQLite database.
///
/// All methods are synchronous because `rusqlite` does not support async
/// natively. In an async context, wrap calls in `tokio::task::spawn_blocking`.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db("open"))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db("WAL pragma"))?;

        let store = Self::init(conn)?;
        migrate_classification_columns(&store.conn)?;

        info!("record store opened");
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db("open in-memory"))?;
        let store = Self::init(conn)?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self> {
        // SQLite ignores ON DELETE CASCADE unless foreign keys are enabled per
        // connection.
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(db("foreign_keys pragma"))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(db("create tables"))?;
        Ok(Self { conn })
    }

    /// Run `f` inside one transaction. Every write it made is rolled back
    /// when it returns an error.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(db("begin transaction"))?;
        let value = f(self)?;
        tx.commit().map_err(db("commit transaction"))?;
        Ok(value)
    }

    // -- Projects ------------------------------------------------------------

    /// All projects, newest first.
    #[instrument(skip(self))]
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, id DESC");
        self.query_all(&sql, [], row_to_project)
    }

    /// A single project, or `None` if it does not exist.
    #[instrument(skip(self))]
    pub fn get_project(&self, id: RecordId) -> Result<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
        self.query_one(&sql, params![id], row_to_project)
    }

    /// Create a project. Project numbers are unique.
    #[instrument(skip(self))]
    pub fn create_project(&self, project_number: &str, customer_name: &str) -> Result<Project> {
        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO projects (project_number, customer_name, created_at)
                 VALUES (?1, ?2, ?3)",
                params![project_number, customer_name, timestamp(&created_at)],
            )
            .map_err(|e| unique_violation(e, "project number already exists", "insert project"))?;

        let id = self.conn.last_insert_rowid();
        info!(project_id = id, project_number, "project created");
        Ok(Project {
            id,
            project_number: project_number.to_owned(),
            customer_name: customer_name.to_owned(),
            created_at,
        })
    }

    /// Replace the project number and customer name.
    #[instrument(skip(self))]
    pub fn update_project(&self, id: RecordId, project_number: &str, customer_name: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE projects SET project_number = ?1, customer_name = ?2 WHERE id = ?3",
                params![project_number, customer_name, id],
            )
            .map_err(|e| unique_violation(e, "project number already exists", "update project"))?;
        require_row(rows, "project", id)
    }

    /// Delete a project and, by cascade, everything it owns.
    ///
    /// Returns `false` when no such project existed.
    #[instrument(skip(self))]
    pub fn delete_project(&self, id: RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .map_err(db("delete project"))?;
        info!(project_id = id, removed = rows > 0, "project deleted");
        Ok(rows > 0)
    }

    // -- Test packages -------------------------------------------------------

    /// All packages across projects, newest first.
    #[instrument(skip(self))]
    pub fn list_packages(&self) -> Result<Vec<TestPackage>> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM test_packages ORDER BY created_at DESC, id DESC"
        );
        self.query_all(&sql, [], row_to_package)
    }

    /// Packages of one project, ordered by name.
    #[instrument(skip(self))]
    pub fn packages_by_project(&self, project_id: RecordId) -> Result<Vec<TestPackage>> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM test_packages WHERE project_id = ?1 ORDER BY name ASC, id ASC"
        );
        self.query_all(&sql, params![project_id], row_to_package)
    }

    #[instrument(skip(self))]
    pub fn get_package(&self, id: RecordId) -> Result<Option<TestPackage>> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM test_packages WHERE id = ?1");
        self.query_one(&sql, params![id], row_to_package)
    }

    /// Create a package under an existing project.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub fn create_package(&self, project_id: RecordId, input: &PackageFields) -> Result<TestPackage> {
        if self.get_project(project_id)?.is_none() {
            return Err(KameraError::not_found("project", project_id));
        }

        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO test_packages (project_id, name, comment, pipe_type, lining, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    project_id,
                    input.name,
                    input.comment,
                    input.pipe_type,
                    input.lining,
                    timestamp(&created_at),
                ],
            )
            .map_err(db("insert package"))?;

        let id = self.conn.last_insert_rowid();
        info!(package_id = id, project_id, "package created");
        Ok(TestPackage {
            id,
            project_id,
            name: input.name.clone(),
            comment: input.comment.clone(),
            pipe_type: input.pipe_type.clone(),
            lining: input.lining.clone(),
            created_at,
        })
    }

    /// Replace only the package comment.
    #[instrument(skip(self, comment))]
    pub fn update_package_comment(&self, id: RecordId, comment: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE test_packages SET comment = ?1 WHERE id = ?2",
                params![comment, id],
            )
            .map_err(db("update package comment"))?;
        require_row(rows, "package", id)
    }

    /// Replace every editable package field.
    #[instrument(skip(self, input))]
    pub fn update_package(&self, id: RecordId, input: &PackageFields) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE test_packages SET name = ?1, comment = ?2, pipe_type = ?3, lining = ?4
                 WHERE id = ?5",
                params![input.name, input.comment, input.pipe_type, input.lining, id],
            )
            .map_err(db("update package"))?;
        require_row(rows, "package", id)
    }

    #[instrument(skip(self))]
    pub fn delete_package(&self, id: RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM test_packages WHERE id = ?1", params![id])
            .map_err(db("delete package"))?;
        info!(package_id = id, removed = rows > 0, "package deleted");
        Ok(rows > 0)
    }

    // -- Pdf lines -----------------------------------------------------------

    /// Lines of one package, ordered by their user-assigned line number.
    #[instrument(skip(self))]
    pub fn lines_by_package(&self, package_id: RecordId) -> Result<Vec<PdfLine>> {
        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM pdf_lines WHERE test_package_id = ?1
             ORDER BY line_number ASC, id ASC"
        );
        self.query_all(&sql, params![package_id], row_to_line)
    }

    #[instrument(skip(self))]
    pub fn get_line(&self, id: RecordId) -> Result<Option<PdfLine>> {
        let sql = format!("SELECT {LINE_COLUMNS} FROM pdf_lines WHERE id = ?1");
        self.query_one(&sql, params![id], row_to_line)
    }

    /// Create a line under an existing package.
    #[instrument(skip(self))]
    pub fn create_line(
        &self,
        package_id: RecordId,
        name: &str,
        pdf_path: Option<&str>,
        line_number: i64,
    ) -> Result<PdfLine> {
        if self.get_package(package_id)?.is_none() {
            return Err(KameraError::not_found("package", package_id));
        }

        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO pdf_lines (test_package_id, name, pdf_path, line_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![package_id, name, pdf_path, line_number, timestamp(&created_at)],
            )
            .map_err(db("insert line"))?;

        let id = self.conn.last_insert_rowid();
        debug!(line_id = id, package_id, line_number, "line created");
        Ok(PdfLine {
            id,
            test_package_id: package_id,
            name: name.to_owned(),
            pdf_path: pdf_path.map(str::to_owned),
            line_number,
            created_at,
        })
    }

    /// Replace the line name and number. The drawing reference is immutable.
    #[instrument(skip(self))]
    pub fn update_line(&self, id: RecordId, name: &str, line_number: i64) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE pdf_lines SET name = ?1, line_number = ?2 WHERE id = ?3",
                params![name, line_number, id],
            )
            .map_err(db("update line"))?;
        require_row(rows, "line", id)
    }

    #[instrument(skip(self))]
    pub fn delete_line(&self, id: RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pdf_lines WHERE id = ?1", params![id])
            .map_err(db("delete line"))?;
        Ok(rows > 0)
    }

    // -- Remarks -------------------------------------------------------------

    /// Remarks of one line in creation order.
    #[instrument(skip(self))]
    pub fn remarks_by_line(&self, line_id: RecordId) -> Result<Vec<Remark>> {
        let sql = format!(
            "SELECT {REMARK_COLUMNS} FROM remarks WHERE pdf_line_id = ?1 ORDER BY created_at ASC, id ASC"
        );
        self.query_all(&sql, params![line_id], row_to_remark)
    }

    #[instrument(skip(self))]
    pub fn get_remark(&self, id: RecordId) -> Result<Option<Remark>> {
        let sql = format!("SELECT {REMARK_COLUMNS} FROM remarks WHERE id = ?1");
        self.query_one(&sql, params![id], row_to_remark)
    }

    /// Create a remark under an existing line.
    #[instrument(skip(self, comment))]
    pub fn create_remark(&self, line_id: RecordId, image_path: &str, comment: &str) -> Result<Remark> {
        if self.get_line(line_id)?.is_none() {
            return Err(KameraError::not_found("line", line_id));
        }

        let created_at = Utc::now();
        self.conn
            .execute(
                "INSERT INTO remarks (pdf_line_id, image_path, comment, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![line_id, image_path, comment, timestamp(&created_at)],
            )
            .map_err(db("insert remark"))?;

        let id = self.conn.last_insert_rowid();
        debug!(remark_id = id, line_id, "remark created");
        Ok(Remark {
            id,
            pdf_line_id: line_id,
            image_path: image_path.to_owned(),
            comment: comment.to_owned(),
            created_at,
        })
    }

    /// Replace only the remark comment.
    #[instrument(skip(self, comment))]
    pub fn update_remark_comment(&self, id: RecordId, comment: &str) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE remarks SET comment = ?1 WHERE id = ?2",
                params![comment, id],
            )
            .map_err(db("update remark comment"))?;
        require_row(rows, "remark", id)
    }

    #[instrument(skip(self))]
    pub fn delete_remark(&self, id: RecordId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM remarks WHERE id = ?1", params![id])
            .map_err(db("delete remark"))?;
        Ok(rows > 0)
    }

    // -- Hydration -----------------------------------------------------------

    /// The package with its owning project, its lines ordered by line number
    /// and each line's remarks ordered by creation time.
    #[instrument(skip(self))]
    pub fn full_package(&self, package_id: RecordId) -> Result<Option<FullPackage>> {
        let Some(package) = self.get_package(package_id)? else {
            return Ok(None);
        };
        let project = self.get_project(package.project_id)?;

        let mut lines = Vec::new();
        for line in self.lines_by_package(package_id)? {
            let remarks = self.remarks_by_line(line.id)?;
            lines.push(FullLine { line, remarks });
        }

        debug!(package_id, lines = lines.len(), "package hydrated");
        Ok(Some(FullPackage {
            package,
            project,
            lines,
        }))
    }

    /// Row totals for every table.
    pub fn record_counts(&self) -> Result<RecordCounts> {
        let count = |table: &str| -> Result<u64> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get::<_, i64>(0)
                })
                .map(|n| n as u64)
                .map_err(db("count rows"))
        };
        Ok(RecordCounts {
            projects: count("projects")?,
            packages: count("test_packages")?,
            lines: count("pdf_lines")?,
            remarks: count("remarks")?,
        })
    }

    // -- Query helpers -------------------------------------------------------

    fn query_all<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>>
    where
        P: rusqlite::Params,
    {
        let mut stmt = self.conn.prepare(sql).map_err(db("prepare"))?;
        let rows = stmt
            .query_map(params, map)
            .map_err(db("query"))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db("collect rows"))?;
        Ok(rows)
    }

    fn query_one<T, P>(
        &self,
        sql: &str,
        params: P,
        map: fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>>
    where
        P: rusqlite::Params,
    {
        self.conn
            .query_row(sql, params, map)
            .optional()
            .map_err(db("query row"))
    }
}

fn migrate_classification_columns(conn: &Connection) -> Result<()> {
    for stmt in MIGRATE_CLASSIFICATION_SQL.split(';') {
        let trimmed = stmt.trim();
        if trimmed.is_empty() {
            continue;
        }
        match conn.execute_batch(trimmed) {
            Ok(()) => info!(statement = trimmed, "schema column added"),
            Err(err) if is_duplicate_column(&err) => {
                debug!(statement = trimmed, "column already present");
            }
            Err(err) => {
                warn!(statement = trimmed, %err, "schema migration failed");
                return Err(KameraError::Database(format!("migrate: {err}")));
            }
        }
    }
    Ok(())
}

fn is_duplicate_column(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(message)) if message.contains("duplicate column name"))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn db(context: &'static str) -> impl Fn(rusqlite::Error) -> KameraError {
    move |e| KameraError::Database(format!("{context}: {e}"))
}

fn unique_violation(err: rusqlite::Error, message: &str, context: &str) -> KameraError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            KameraError::Validation(message.to_owned())
        }
        _ => KameraError::Database(format!("{context}: {err}")),
    }
}

fn require_row(rows: usize, entity: &'static str, id: RecordId) -> Result<()> {
    if rows == 0 {
        Err(KameraError::not_found(entity, id))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Timestamps are stored as fixed-width RFC 3339 so lexical order is
/// chronological order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let created_at: String = row.get(3)?;
    Ok(Project {
        id: row.get(0)?,
        project_number: row.get(1)?,
        customer_name: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
    })
}

fn row_to_package(row: &rusqlite::Row<'_>) -> rusqlite::Result<TestPackage> {
    let comment: Option<String> = row.get(3)?;
    let created_at: String = row.get(6)?;
    Ok(TestPackage {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        comment: comment.unwrap_or_default(),
        pipe_type: row.get(4)?,
        lining: row.get(5)?,
        created_at: parse_timestamp(6, &created_at)?,
    })
}

fn row_to_line(row: &rusqlite::Row<'_>) -> rusqlite::Result<PdfLine> {
    let line_number: Option<i64> = row.get(4)?;
    let created_at: String = row.get(5)?;
    Ok(PdfLine {
        id: row.get(0)?,
        test_package_id: row.get(1)?,
        name: row.get(2)?,
        pdf_path: row.get(3)?,
        line_number: line_number.unwrap_or(0),
        created_at: parse_timestamp(5, &created_at)?,
    })
}

fn row_to_remark(row: &rusqlite::Row<'_>) -> rusqlite::Result<Remark> {
    let comment: Option<String> = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(Remark {
        id: row.get(0)?,
        pdf_line_id: row.get(1)?,
        image_path: row.get(2)?,
        comment: comment.unwrap_or_default(),
        created_at: parse_timestamp(4, &created_at)?,
    })
}
