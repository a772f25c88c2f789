use std::path::Path;

use rusqlite::Connection;
use tracing::error;

use crate::error::Error;
use crate::index::{IndexEntry, ResourceKind};

type Result<T> = std::result::Result<T, Error>;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    }
    let conn = Connection::open(path)?;
    // docset readers expect a single self-contained file
    conn.execute_batch("PRAGMA journal_mode=DELETE; PRAGMA synchronous=NORMAL;")?;
    Ok(conn)
}

/// The lookup table read by docset browsers. (name, type, path) is unique.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS searchIndex (
            id          INTEGER PRIMARY KEY,
            name        TEXT,
            type        TEXT,
            path        TEXT,
            description TEXT NOT NULL DEFAULT ''
        );
        CREATE UNIQUE INDEX IF NOT EXISTS anchor ON searchIndex (name, type, path);
        ",
    )?;
    Ok(())
}

// ── Inserting ──

const INSERT_SQL: &str =
    "INSERT OR IGNORE INTO searchIndex (name, type, path, description) VALUES (?1, ?2, ?3, ?4)";

/// Insert unless (name, type, path) is already present. Returns whether a
/// row was written.
pub fn insert_entry(conn: &Connection, entry: &IndexEntry) -> Result<bool> {
    let written = conn.execute(
        INSERT_SQL,
        rusqlite::params![entry.name, entry.kind.as_str(), entry.location, entry.description],
    )?;
    Ok(written == 1)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InsertStats {
    pub inserted: usize,
    pub duplicates: usize,
    pub missing: usize,
}

/// Insert all entries in one transaction. Entries whose location does not
/// exist below `documents_root` are logged and dropped.
pub fn insert_entries(
    conn: &Connection,
    entries: &[IndexEntry],
    documents_root: &Path,
) -> Result<InsertStats> {
    let mut stats = InsertStats::default();
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(INSERT_SQL)?;
        for e in entries {
            let file = documents_root.join(&e.location);
            if !file.exists() {
                error!("File \"{}\" is inaccessible", file.display());
                stats.missing += 1;
                continue;
            }
            let written = stmt.execute(rusqlite::params![
                e.name, e.kind.as_str(), e.location, e.description,
            ])?;
            if written == 1 {
                stats.inserted += 1;
            } else {
                stats.duplicates += 1;
            }
        }
    }
    tx.commit()?;
    Ok(stats)
}

// ── Queries ──

/// Entries whose name contains `query`, exact matches first, then prefix
/// matches, then alphabetical.
pub fn lookup(
    conn: &Connection,
    query: &str,
    kind: Option<ResourceKind>,
    limit: usize,
) -> Result<Vec<IndexEntry>> {
    let escaped = query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    let mut stmt = conn.prepare(
        "SELECT name, type, path, description FROM searchIndex
         WHERE name LIKE ?1 ESCAPE '\\'
           AND (?4 IS NULL OR type = ?4)
         ORDER BY (name = ?2) DESC, (name LIKE ?3 ESCAPE '\\') DESC, name
         LIMIT ?5",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                format!("%{}%", escaped),
                query,
                format!("{}%", escaped),
                kind.map(ResourceKind::as_str),
                limit as i64,
            ],
            |row| {
                let kind: String = row.get(1)?;
                Ok(IndexEntry {
                    name: row.get(0)?,
                    kind: kind.parse().unwrap_or(ResourceKind::Object),
                    location: row.get(2)?,
                    description: row.get(3)?,
                })
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn kind_counts(conn: &Connection) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT type, COUNT(*) FROM searchIndex GROUP BY type ORDER BY COUNT(*) DESC, type",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn entry(kind: ResourceKind, name: &str, location: &str) -> IndexEntry {
        IndexEntry {
            kind,
            name: name.to_string(),
            location: location.to_string(),
            description: if kind.is_container() { String::new() } else { "storage.local".into() },
        }
    }

    fn rows(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM searchIndex", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let conn = memory();
        let e = entry(ResourceKind::Method, "get()", "en-us/docs/api/storage/local/get/index.html");
        assert!(insert_entry(&conn, &e).unwrap());
        assert!(!insert_entry(&conn, &e).unwrap());
        assert_eq!(rows(&conn), 1);

        // same name, other kind is a distinct row
        let other = entry(ResourceKind::Property, "get", &e.location);
        assert!(insert_entry(&conn, &other).unwrap());
        assert_eq!(rows(&conn), 2);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = memory();
        init_schema(&conn).unwrap();
        assert_eq!(rows(&conn), 0);
    }

    #[test]
    fn missing_locations_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let page = "en-us/docs/api/storage/index.html";
        std::fs::create_dir_all(dir.path().join("en-us/docs/api/storage")).unwrap();
        std::fs::write(dir.path().join(page), "<p/>").unwrap();

        let conn = memory();
        let entries = vec![
            entry(ResourceKind::Namespace, "storage", page),
            entry(ResourceKind::Namespace, "storage", page),
            entry(ResourceKind::Namespace, "tabs", "en-us/docs/api/tabs/index.html"),
        ];
        let stats = insert_entries(&conn, &entries, dir.path()).unwrap();
        assert_eq!(
            stats,
            InsertStats {
                inserted: 1,
                duplicates: 1,
                missing: 1
            }
        );
        assert_eq!(rows(&conn), 1);
    }

    #[test]
    fn lookup_ranks_exact_then_prefix() {
        let conn = memory();
        for (kind, name) in [
            (ResourceKind::Method, "getAll()"),
            (ResourceKind::Method, "get()"),
            (ResourceKind::Property, "target"),
            (ResourceKind::Constant, "MAX_GET"),
        ] {
            insert_entry(&conn, &entry(kind, name, &format!("{}.html", name))).unwrap();
        }

        let names: Vec<String> = lookup(&conn, "get()", None, 10)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["get()"]);

        let names: Vec<String> = lookup(&conn, "get", None, 10)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names[..2], ["get()".to_string(), "getAll()".to_string()]);
        assert_eq!(names.len(), 4);

        let methods = lookup(&conn, "get", Some(ResourceKind::Method), 10).unwrap();
        assert!(methods.iter().all(|e| e.kind == ResourceKind::Method));
        assert_eq!(methods.len(), 2);
    }

    #[test]
    fn lookup_escapes_wildcards() {
        let conn = memory();
        insert_entry(&conn, &entry(ResourceKind::Constant, "MAX_X", "a.html")).unwrap();
        insert_entry(&conn, &entry(ResourceKind::Property, "maxAx", "b.html")).unwrap();
        let found = lookup(&conn, "_", None, 10).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "MAX_X");
    }

    #[test]
    fn counts_per_kind() {
        let conn = memory();
        insert_entry(&conn, &entry(ResourceKind::Method, "a()", "a.html")).unwrap();
        insert_entry(&conn, &entry(ResourceKind::Method, "b()", "b.html")).unwrap();
        insert_entry(&conn, &entry(ResourceKind::Event, "onC", "c.html")).unwrap();
        assert_eq!(
            kind_counts(&conn).unwrap(),
            vec![("Method".to_string(), 2), ("Event".to_string(), 1)]
        );
    }
}
