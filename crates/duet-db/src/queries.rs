use crate::models::{self, Collection, Document, Filter};
use crate::{Database, Store};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension};

impl Store for Database {
    fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Option<Document>> {
        self.with_conn(|conn| {
            let (clause, params) = where_clause(filter);
            let sql = format!(
                "SELECT doc FROM {} {} ORDER BY seq LIMIT 1",
                collection.table(),
                clause
            );
            let doc: Option<String> = conn
                .query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))
                .optional()?;
            doc.map(|raw| parse(&raw)).transpose()
        })
    }

    fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
        self.with_conn(|conn| query_docs(conn, collection, filter))
    }

    fn insert(&self, collection: Collection, doc: Document) -> Result<Document> {
        let doc = models::stamp(doc);
        let id = string_field(&doc, models::ID)?;
        let created_at = string_field(&doc, models::CREATED_AT)?;
        let body = serde_json::to_string(&doc)?;

        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, doc, created_at) VALUES (?1, ?2, ?3)",
                    collection.table()
                ),
                rusqlite::params![id, body, created_at],
            )?;
            Ok(())
        })?;

        Ok(doc)
    }

    fn update_fields(&self, collection: Collection, id: &str, patch: Document) -> Result<bool> {
        let patch = serde_json::to_string(&models::sanitize_patch(patch))?;
        self.with_conn(|conn| {
            // json_patch follows RFC 7396: null removes a key, objects merge.
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET doc = json_patch(doc, ?2) WHERE id = ?1",
                    collection.table()
                ),
                rusqlite::params![id, patch],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_docs(conn: &Connection, collection: Collection, filter: &Filter) -> Result<Vec<Document>> {
    let (clause, params) = where_clause(filter);
    let sql = format!(
        "SELECT doc FROM {} {} ORDER BY seq",
        collection.table(),
        clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.iter().map(|raw| parse(raw)).collect()
}

/// Translate a filter into a WHERE clause plus its bound parameters.
/// Field names are compile-time constants, so formatting them into the
/// JSON path is safe and lets SQLite use the expression indexes.
fn where_clause(filter: &Filter) -> (String, Vec<String>) {
    match filter {
        Filter::All => (String::new(), vec![]),
        Filter::Id(id) => ("WHERE id = ?1".into(), vec![id.clone()]),
        Filter::Eq(field, value) => (
            format!("WHERE json_extract(doc, '$.{}') = ?1", field),
            vec![value.clone()],
        ),
        Filter::Contains(field, value) => (
            // json_each yields the value itself for scalars, so require an array.
            format!(
                "WHERE json_type(doc, '$.{0}') = 'array' \
                 AND EXISTS (SELECT 1 FROM json_each(doc, '$.{0}') WHERE json_each.value = ?1)",
                field
            ),
            vec![value.clone()],
        ),
    }
}

fn parse(raw: &str) -> Result<Document> {
    serde_json::from_str(raw).map_err(|e| anyhow!("Corrupt document: {}", e))
}

fn string_field(doc: &Document, key: &str) -> Result<String> {
    doc.get(key)
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("Document is missing '{}'", key))
}
