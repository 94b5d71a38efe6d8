//! Migration files - scaffolding and loading `.sql` migrations
//!
//! A migration file is named `<id>.sql` and holds two sections introduced by
//! the marker lines `-- Up migration` and `-- Down migration` (`-- Up` and
//! `-- Down` also work, in any letter case). Every other line of a section,
//! comments and blank lines included, is part of its SQL body. Lines before
//! the first marker are ignored.

use chrono::{DateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use super::registry::MigrationRegistry;
use crate::error::{OrmError, OrmResult};

/// Format of the timestamp prefix of generated migration ids
pub const MIGRATION_ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// Up and down bodies parsed from one migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSource {
    pub id: String,
    pub up_sql: String,
    pub down_sql: String,
}

/// Scaffold a new migration file in `dir` and return its path.
///
/// The id is `now` formatted as `YYYYMMDDHHMMSS`, followed by `_` and the
/// snake_case form of `name` when one is given.
pub fn create_migration(dir: &Path, name: Option<&str>, now: DateTime<Utc>) -> OrmResult<PathBuf> {
    let id = migration_id(name, now);

    fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.sql", id));
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(OrmError::Configuration(format!(
                "Migration file '{}' already exists",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(migration_template(&id, now).as_bytes())?;
    tracing::info!(migration = %id, path = %path.display(), "created migration file");
    Ok(path)
}

/// Identifier for a migration created at `now`
pub fn migration_id(name: Option<&str>, now: DateTime<Utc>) -> String {
    let mut id = now.format(MIGRATION_ID_FORMAT).to_string();
    if let Some(suffix) = name.map(to_snake_case).filter(|s| !s.is_empty()) {
        id.push('_');
        id.push_str(&suffix);
    }
    id
}

/// Register every `*.sql` file in `dir`, returning how many were added.
///
/// A missing directory registers nothing.
pub fn load_migrations(dir: &Path, registry: &mut MigrationRegistry) -> OrmResult<usize> {
    let sources = read_migrations(dir)?;
    let count = sources.len();

    for source in sources {
        registry.add_sql(source.id, source.up_sql, source.down_sql)?;
    }

    tracing::debug!(dir = %dir.display(), count, "loaded migration files");
    Ok(count)
}

/// Parse every `*.sql` file in `dir`, sorted by file name
pub fn read_migrations(dir: &Path) -> OrmResult<Vec<MigrationSource>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "sql") {
            paths.push(path);
        }
    }
    paths.sort();

    paths.iter().map(|path| read_migration_file(path)).collect()
}

/// Parse one migration file; the id is the file stem
pub fn read_migration_file(path: &Path) -> OrmResult<MigrationSource> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            OrmError::Configuration(format!("Invalid migration filename '{}'", path.display()))
        })?
        .to_string();

    let content = fs::read_to_string(path)?;
    let (up_sql, down_sql) = parse_migration_content(&content);

    Ok(MigrationSource { id, up_sql, down_sql })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Split file content into up and down SQL bodies
pub fn parse_migration_content(content: &str) -> (String, String) {
    let mut up_sql = Vec::new();
    let mut down_sql = Vec::new();
    let mut section = Section::Preamble;

    for line in content.lines() {
        if let Some(marker) = section_marker(line) {
            section = marker;
            continue;
        }

        match section {
            Section::Up => up_sql.push(line),
            Section::Down => down_sql.push(line),
            Section::Preamble => {}
        }
    }

    (
        up_sql.join("\n").trim().to_string(),
        down_sql.join("\n").trim().to_string(),
    )
}

fn section_marker(line: &str) -> Option<Section> {
    let comment = line.trim().strip_prefix("--")?.to_ascii_lowercase();
    let mut words = comment.split_whitespace();

    let section = match words.next()? {
        "up" => Section::Up,
        "down" => Section::Down,
        _ => return None,
    };

    match (words.next(), words.next()) {
        (None, _) | (Some("migration"), None) => Some(section),
        _ => None,
    }
}

fn migration_template(id: &str, now: DateTime<Utc>) -> String {
    format!(
        "-- Migration: {}\n\
         -- Created: {}\n\
         -- Schema changes go below the Up marker, rollback statements below the Down marker.\n\n\
         -- Up migration\n\n\n\
         -- Down migration\n\n",
        id,
        now.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Normalize a free-form name into `snake_case`.
///
/// Splits camelCase humps, collapses runs of other characters into one `_`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() && i > 0 && !out.is_empty() && !out.ends_with('_') {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }

        out.push(c.to_ascii_lowercase());
    }

    out.trim_end_matches('_').to_string()
}
