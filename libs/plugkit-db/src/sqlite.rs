//! SQLite DSN helpers.

use std::path::{Path, PathBuf};

use crate::{DbError, Result};

pub const MEMORY_DSN: &str = "sqlite::memory:";

pub fn is_memory_dsn(dsn: &str) -> bool {
    let lower = dsn.to_ascii_lowercase();
    lower == MEMORY_DSN
        || lower == "sqlite://:memory:"
        || lower == "sqlite://memory:"
        || lower.contains("mode=memory")
}

/// Rewrite a `sqlite://` DSN so that a relative path lives under `base_dir`.
///
/// In-memory DSNs are normalized to `sqlite::memory:`. Query parameters are kept.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if is_memory_dsn(dsn) && !dsn.contains('?') {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| DbError::InvalidDsn(format!("expected sqlite:// prefix: {dsn}")))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(DbError::InvalidDsn("empty SQLite path".to_string()));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }
    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_variants_normalize() {
        let base = Path::new("/srv");
        for dsn in ["sqlite::memory:", "SQLITE::MEMORY:", "sqlite://:memory:"] {
            assert_eq!(absolutize_sqlite_dsn(dsn, base, false).unwrap(), MEMORY_DSN);
        }
        assert!(is_memory_dsn("sqlite://file:x?mode=memory&cache=shared"));
    }

    #[test]
    fn relative_paths_join_base_dir() {
        let tmp = tempdir().unwrap();
        let out = absolutize_sqlite_dsn("sqlite://database/users.db?mode=rwc", tmp.path(), true)
            .unwrap();
        let expected = tmp.path().join("database/users.db");
        assert_eq!(
            out,
            format!(
                "sqlite://{}?mode=rwc",
                expected.to_string_lossy().replace('\\', "/")
            )
        );
        assert!(tmp.path().join("database").is_dir());
    }

    #[test]
    fn rejects_foreign_and_empty_dsns() {
        let base = Path::new("/srv");
        assert!(matches!(
            absolutize_sqlite_dsn("postgres://x/y", base, false),
            Err(DbError::InvalidDsn(_))
        ));
        assert!(matches!(
            absolutize_sqlite_dsn("sqlite://", base, false),
            Err(DbError::InvalidDsn(_))
        ));
    }
}
