//! Learning resource catalogue

use rusqlite::{params, Connection, Result};

use crate::domain::{Difficulty, Resource};

pub fn insert_resource(
    conn: &Connection,
    title: &str,
    subject: &str,
    difficulty: Difficulty,
    kind: &str,
    url: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO resources (title, subject, difficulty, kind, url) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![title, subject, difficulty.as_str(), kind, url],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All resources for a subject, in catalogue order
pub fn resources_for_subject(conn: &Connection, subject: &str) -> Result<Vec<Resource>> {
    let mut stmt = conn.prepare(
        r#"
    SELECT id, title, subject, difficulty, kind, url
    FROM resources
    WHERE subject = ?1
    ORDER BY id ASC
    "#,
    )?;
    let resources = stmt
        .query_map(params![subject], |row| {
            let difficulty: String = row.get(3)?;
            Ok(Resource {
                id: row.get(0)?,
                title: row.get(1)?,
                subject: row.get(2)?,
                difficulty: Difficulty::from_str(&difficulty).unwrap_or(Difficulty::Medium),
                kind: row.get(4)?,
                url: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>>>()?;
    Ok(resources)
}

pub fn resource_count(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))
}
