//! JSON document collections on top of SQLite.
//!
//! Every collection lives in the shared `documents` table. Fields are
//! addressed with `json_extract`, and field names are bound as JSON paths,
//! never spliced into SQL.

use serde_json::{Map, Value};
use sqlx::{QueryBuilder, Sqlite, sqlite::SqlitePool};

/// A stored document. Returned with its id under [`ID_FIELD`].
pub type Document = Map<String, Value>;

/// Name under which a document's id is exposed.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(String, Value),
    Contains(String, String),
}

/// Conditions a document must all satisfy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: &str) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Field equals value. A `null` value also matches a missing field.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    /// Field contains `needle`, ignoring ASCII case.
    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), needle.to_string()));
        self
    }
}

/// Ordering on one field. Ties fall back to insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }

    /// Parse `field` (ascending) or `-field` (descending).
    pub fn parse(value: &str) -> Self {
        match value.strip_prefix('-') {
            Some(field) => Self::desc(field),
            None => Self::asc(value),
        }
    }
}

/// Changes applied to one document: `$set` fields merged in, then `$inc` counters.
#[derive(Debug, Clone, Default)]
pub struct Update {
    set: Document,
    inc: Vec<(String, i64)>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `field`, replacing whatever was there. A `null` is
    /// stored as `null` and objects replace objects wholesale.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    /// Merge every field of `fields` except the id.
    pub fn set_all(mut self, fields: Document) -> Self {
        for (field, value) in fields {
            if field != ID_FIELD {
                self.set.insert(field, value);
            }
        }
        self
    }

    pub fn inc(mut self, field: &str, by: i64) -> Self {
        self.inc.push((field.to_string(), by));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty()
    }
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let mut doc: Document = serde_json::from_str(&row.body)?;
        doc.insert(ID_FIELD.to_string(), Value::String(row.id));
        Ok(doc)
    }
}

/// Handle to one named collection.
#[derive(Clone)]
pub struct Collection {
    pool: SqlitePool,
    name: &'static str,
}

impl Collection {
    pub fn new(pool: SqlitePool, name: &'static str) -> Self {
        Self { pool, name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Documents matching `filter`, ordered by `sort`, skipping `skip` and
    /// returning at most `limit`.
    pub async fn find(
        &self,
        filter: &Filter,
        sort: Option<&Sort>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<Document>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, body FROM documents");
        push_conditions(&mut qb, self.name, filter)?;

        qb.push(" ORDER BY ");
        if let Some(sort) = sort {
            if sort.field == ID_FIELD {
                qb.push("id");
            } else {
                qb.push("json_extract(body, ")
                    .push_bind(json_path(&sort.field)?)
                    .push(")");
            }
            qb.push(if sort.descending { " DESC, " } else { " ASC, " });
        }
        qb.push("rowid ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(skip);

        let rows: Vec<DocumentRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Document::try_from).collect()
    }

    /// First document matching `filter` in insertion order.
    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.find(filter, None, 0, 1).await?.into_iter().next())
    }

    /// Store a new document. Any caller-supplied id is discarded. Returns the new id.
    pub async fn insert_one(&self, mut doc: Document) -> Result<String, StoreError> {
        doc.remove(ID_FIELD);
        let id = uuid::Uuid::new_v4().to_string();
        let body = serde_json::to_string(&doc)?;

        sqlx::query("INSERT INTO documents (id, collection, body) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(self.name)
            .bind(body)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    /// Apply `update` to the first document matching `filter`.
    /// Returns true if a document matched.
    pub async fn update_one(&self, filter: &Filter, update: &Update) -> Result<bool, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET body = ");

        if update.is_empty() {
            qb.push("body");
        } else {
            // One json_set call: `$set` pairs first, then `$inc` pairs read from the old body.
            qb.push("json_set(body");
            for (field, value) in &update.set {
                qb.push(", ")
                    .push_bind(json_path(field)?)
                    .push(", json(")
                    .push_bind(serde_json::to_string(value)?)
                    .push(")");
            }
            for (field, by) in &update.inc {
                let path = json_path(field)?;
                qb.push(", ")
                    .push_bind(path.clone())
                    .push(", COALESCE(json_extract(body, ")
                    .push_bind(path)
                    .push("), 0) + ")
                    .push_bind(*by);
            }
            qb.push(")");
        }

        qb.push(" WHERE id = (SELECT id FROM documents");
        push_conditions(&mut qb, self.name, filter)?;
        qb.push(" ORDER BY rowid LIMIT 1)");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the first document matching `filter`. Returns true if one was deleted.
    pub async fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        let mut qb =
            QueryBuilder::<Sqlite>::new("DELETE FROM documents WHERE id = (SELECT id FROM documents");
        push_conditions(&mut qb, self.name, filter)?;
        qb.push(" ORDER BY rowid LIMIT 1)");

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_documents(&self, filter: &Filter) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents");
        push_conditions(&mut qb, self.name, filter)?;

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn push_conditions(
    qb: &mut QueryBuilder<'_, Sqlite>,
    collection: &'static str,
    filter: &Filter,
) -> Result<(), StoreError> {
    qb.push(" WHERE collection = ").push_bind(collection);

    for condition in &filter.conditions {
        match condition {
            Condition::Eq(field, value) if field == ID_FIELD => match value.as_str() {
                Some(id) => {
                    qb.push(" AND id = ").push_bind(id.to_string());
                }
                None => {
                    qb.push(" AND 0");
                }
            },
            Condition::Eq(field, value) => {
                qb.push(" AND json_extract(body, ")
                    .push_bind(json_path(field)?)
                    .push(")");
                match value {
                    Value::Null => {
                        qb.push(" IS NULL");
                    }
                    Value::Bool(b) => {
                        qb.push(" = ").push_bind(*b);
                    }
                    Value::Number(n) => match n.as_i64() {
                        Some(i) => {
                            qb.push(" = ").push_bind(i);
                        }
                        None => {
                            qb.push(" = ").push_bind(n.as_f64().unwrap_or_default());
                        }
                    },
                    Value::String(s) => {
                        qb.push(" = ").push_bind(s.clone());
                    }
                    Value::Array(_) | Value::Object(_) => {
                        qb.push(" = json(").push_bind(value.to_string()).push(")");
                    }
                }
            }
            Condition::Contains(field, needle) => {
                qb.push(" AND json_extract(body, ")
                    .push_bind(json_path(field)?)
                    .push(") LIKE ")
                    .push_bind(like_pattern(needle))
                    .push(" ESCAPE '\\'");
            }
        }
    }

    Ok(())
}

/// Turn a dotted field name into a JSON path, rejecting anything but
/// ASCII alphanumerics and underscores between the dots.
fn json_path(field: &str) -> Result<String, StoreError> {
    let valid = !field.is_empty()
        && field.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if !valid {
        return Err(StoreError::InvalidField(field.to_string()));
    }
    Ok(format!("$.{}", field))
}

fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Errors from collection operations.
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Serialization(serde_json::Error),
    /// Field name that cannot be used as a JSON path
    InvalidField(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Serialization(e) => write!(f, "Document serialization error: {}", e),
            StoreError::InvalidField(field) => write!(f, "Invalid field name: {}", field),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn seeded_items() -> Collection {
        let db = Database::open(":memory:").await.unwrap();
        let items = db.items();
        for (name, category, price) in [
            ("Pad Thai", "thai", 12),
            ("Green Curry", "thai", 14),
            ("Margherita", "pizza", 10),
            ("100% Juice", "drinks", 4),
        ] {
            items
                .insert_one(doc(json!({"name": name, "category": category, "price": price})))
                .await
                .unwrap();
        }
        items
    }

    #[tokio::test]
    async fn test_find_filter_sort_paginate() {
        let items = seeded_items().await;

        let thai = Filter::new().eq("category", "thai");
        assert_eq!(items.count_documents(&thai).await.unwrap(), 2);

        let by_price = items
            .find(&Filter::new(), Some(&Sort::parse("-price")), 1, 2)
            .await
            .unwrap();
        let names: Vec<&str> = by_price
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Pad Thai", "Margherita"]);
    }

    #[tokio::test]
    async fn test_contains_is_case_insensitive_and_escaped() {
        let items = seeded_items().await;

        let curry = items
            .find(&Filter::new().contains("name", "CURRY"), None, 0, 10)
            .await
            .unwrap();
        assert_eq!(curry.len(), 1);

        // '%' must match literally, not as a wildcard.
        let percent = items
            .count_documents(&Filter::new().contains("name", "%"))
            .await
            .unwrap();
        assert_eq!(percent, 1);
    }

    #[tokio::test]
    async fn test_insert_find_update_delete_by_id() {
        let db = Database::open(":memory:").await.unwrap();
        let orders = db.orders();

        let id = orders
            .insert_one(doc(json!({"_id": "forged", "buyer_email": "a@b.com"})))
            .await
            .unwrap();
        assert_ne!(id, "forged");

        let found = orders.find_one(&Filter::by_id(&id)).await.unwrap().unwrap();
        assert_eq!(found[ID_FIELD], json!(id));
        assert_eq!(found["buyer_email"], "a@b.com");

        let matched = orders
            .update_one(
                &Filter::by_id(&id),
                &Update::new().set("status", "paid").inc("quantity", 2),
            )
            .await
            .unwrap();
        assert!(matched);

        let updated = orders.find_one(&Filter::by_id(&id)).await.unwrap().unwrap();
        assert_eq!(updated["status"], "paid");
        assert_eq!(updated["quantity"], 2);

        assert!(orders.delete_one(&Filter::by_id(&id)).await.unwrap());
        assert!(!orders.delete_one(&Filter::by_id(&id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_replaces_values_and_keeps_nulls() {
        let db = Database::open(":memory:").await.unwrap();
        let items = db.items();

        let id = items
            .insert_one(doc(json!({
                "name": "Ramen",
                "note": "spicy",
                "options": {"size": "large", "extra": "egg"}
            })))
            .await
            .unwrap();

        let changes = doc(json!({"note": null, "options": {"size": "small"}}));
        assert!(
            items
                .update_one(&Filter::by_id(&id), &Update::new().set_all(changes))
                .await
                .unwrap()
        );

        let updated = items.find_one(&Filter::by_id(&id)).await.unwrap().unwrap();
        assert!(updated.contains_key("note"));
        assert_eq!(updated["note"], Value::Null);
        assert_eq!(updated["options"], json!({"size": "small"}));
        assert_eq!(updated["name"], "Ramen");
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let db = Database::open(":memory:").await.unwrap();
        db.items().insert_one(doc(json!({"name": "x"}))).await.unwrap();

        assert_eq!(db.items().count_documents(&Filter::new()).await.unwrap(), 1);
        assert_eq!(db.orders().count_documents(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_field_rejected() {
        let items = seeded_items().await;
        let result = items
            .find(&Filter::new().eq("name') OR 1=1 --", "x"), None, 0, 10)
            .await;
        assert!(matches!(result, Err(StoreError::InvalidField(_))));
    }
}
