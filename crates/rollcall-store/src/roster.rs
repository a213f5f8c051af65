//! SQLite-backed roster of enrolled students.

use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] rusqlite::Error),
}

/// One enrolled student as stored in the roster.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
    pub class_label: String,
    pub photo_path: String,
}

/// The student roster. Enrollment writes here; the scanner reads the full
/// list once per session to build its gallery.
pub struct Roster {
    conn: Connection,
}

impl Roster {
    /// Open (or create) the roster database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let roster = Self { conn };
        roster.ensure_schema()?;
        tracing::debug!(path = %path.display(), "roster opened");
        Ok(roster)
    }

    /// In-memory roster, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let roster = Self { conn };
        roster.ensure_schema()?;
        Ok(roster)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS students (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name TEXT NOT NULL,
                class_label TEXT NOT NULL,
                photo_path TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn add(
        &self,
        name: &str,
        class_label: &str,
        photo_path: &str,
    ) -> Result<StudentRecord, StoreError> {
        self.conn.execute(
            "INSERT INTO students (full_name, class_label, photo_path) VALUES (?1, ?2, ?3)",
            (name, class_label, photo_path),
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, name, class = class_label, "student enrolled");
        Ok(StudentRecord {
            id,
            name: name.to_string(),
            class_label: class_label.to_string(),
            photo_path: photo_path.to_string(),
        })
    }

    /// All students in enrollment order.
    pub fn list(&self) -> Result<Vec<StudentRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name, class_label, photo_path FROM students ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(StudentRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                class_label: row.get(2)?,
                photo_path: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Remove a student by id. Returns false when no such row existed.
    pub fn remove(&self, id: i64) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_list_in_enrollment_order() {
        let roster = Roster::open_in_memory().unwrap();
        roster.add("Alice", "10-A", "/photos/alice.png").unwrap();
        roster.add("Bob", "10-B", "/photos/bob.png").unwrap();

        let students = roster.list().unwrap();
        assert_eq!(students.len(), 2);
        assert_eq!(students[0].name, "Alice");
        assert_eq!(students[1].name, "Bob");
        assert_eq!(students[1].class_label, "10-B");
    }

    #[test]
    fn test_duplicate_names_allowed() {
        // Names are not unique by construction.
        let roster = Roster::open_in_memory().unwrap();
        let a = roster.add("Arber Hoxha", "10-A", "/p/a.png").unwrap();
        let b = roster.add("Arber Hoxha", "10-B", "/p/b.png").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(roster.list().unwrap().len(), 2);
    }

    #[test]
    fn test_remove() {
        let roster = Roster::open_in_memory().unwrap();
        let rec = roster.add("Alice", "10-A", "/p/a.png").unwrap();
        assert!(roster.remove(rec.id).unwrap());
        assert!(!roster.remove(rec.id).unwrap());
        assert!(roster.list().unwrap().is_empty());
    }

    #[test]
    fn test_open_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("school.db");
        {
            let roster = Roster::open(&path).unwrap();
            roster.add("Alice", "10-A", "/p/a.png").unwrap();
        }
        // Reopen; data survives and schema creation is idempotent.
        let roster = Roster::open(&path).unwrap();
        assert_eq!(roster.list().unwrap().len(), 1);
    }
}
