//! v002 -- One recipe per (submitter, dish).
//!
//! Fails on a database that already holds duplicate pairs; those have to be
//! resolved by hand before upgrading.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_recipes_submitter_dish ON recipes(name, dish);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
