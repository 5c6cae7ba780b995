//! v001 -- Initial schema creation.
//!
//! Creates the `recipes` table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS recipes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,               -- submitter username
    festival     TEXT,
    dish         TEXT NOT NULL,
    language     TEXT NOT NULL,
    ingredients  TEXT,
    instructions TEXT NOT NULL,
    image        BLOB,
    latitude     REAL,
    longitude    REAL,
    video        BLOB,
    audio        BLOB
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
