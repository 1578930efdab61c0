//! Multi-column tables flattened onto a flat, ordered key-value namespace.
//!
//! A row with primary key `pk` in table `t` is stored as
//!
//! ```text
//! /<t>/<encode(pk)>             -> NULL
//! /<t>/<encode(pk)>/<column_id> -> encode(value)    (each non-key column)
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, trace};

use crate::encoding::{EncodeError, KEY_DELIMITER, Value};
use crate::kv::KvEngine;
use crate::schema::{ColumnId, Schema, column_id_to_index, index_to_column_id};

pub type TableId = u32;

/// Value stored under a row's base key to mark that the row exists.
pub const EXISTS_MARKER: &str = "NULL";

pub type DatabaseResult<T> = Result<T, DatabaseError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("table {0:?} already exists")]
    DuplicateTable(String),

    #[error("no table named {0:?}")]
    UnknownTable(String),

    #[error("expected {expected} values, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("malformed key {0:?}")]
    MalformedKey(String),

    #[error("row {0:?} is missing column values")]
    IncompleteRow(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A parsed key: `/<table_id>/<primary_key>[/<column_id>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    pub table_id: TableId,
    pub primary_key: String,
    pub column_id: Option<ColumnId>,
}

impl KeyPath {
    pub fn row(table_id: TableId, primary_key: impl Into<String>) -> Self {
        Self {
            table_id,
            primary_key: primary_key.into(),
            column_id: None,
        }
    }

    pub fn with_column(&self, column_id: ColumnId) -> Self {
        Self {
            column_id: Some(column_id),
            ..self.clone()
        }
    }

    pub fn parse(key: &str) -> DatabaseResult<Self> {
        let malformed = || DatabaseError::MalformedKey(key.to_owned());

        let rest = key.strip_prefix(KEY_DELIMITER).ok_or_else(malformed)?;
        let mut parts = rest.split(KEY_DELIMITER);
        let table_id = parts
            .next()
            .and_then(|p| p.parse::<TableId>().ok())
            .ok_or_else(malformed)?;
        let primary_key = parts.next().ok_or_else(malformed)?.to_owned();
        let column_id = match parts.next() {
            None => None,
            Some(p) => Some(
                p.parse::<ColumnId>()
                    .ok()
                    .filter(|id| *id > 0)
                    .ok_or_else(malformed)?,
            ),
        };
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            table_id,
            primary_key,
            column_id,
        })
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{KEY_DELIMITER}{}{KEY_DELIMITER}{}",
            self.table_id, self.primary_key
        )?;
        if let Some(column_id) = self.column_id {
            write!(f, "{KEY_DELIMITER}{column_id}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct KeyedTable {
    id: TableId,
    schema: Schema,
}

impl KeyedTable {
    fn new(id: TableId, schema: Schema) -> Self {
        Self { id, schema }
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn row_key(&self, primary_key: &Value) -> DatabaseResult<KeyPath> {
        let encoded = self.schema.primary_key_type().encode(primary_key)?;
        Ok(KeyPath::row(self.id, encoded))
    }

    /// The key/value pairs `values` is stored as, marker first.
    ///
    /// Every value is encoded before anything is returned, so a bad value
    /// produces no pairs at all.
    pub fn entries(&self, values: &[Value]) -> DatabaseResult<Vec<(String, String)>> {
        if values.len() != self.schema.column_count() {
            return Err(DatabaseError::ColumnCountMismatch {
                expected: self.schema.column_count(),
                actual: values.len(),
            });
        }

        let pk = self.schema.primary_key_index();
        let base = self.row_key(&values[pk])?;

        let mut entries = Vec::with_capacity(values.len());
        entries.push((base.to_string(), EXISTS_MARKER.to_owned()));
        for (idx, ((_, column), value)) in self.schema.columns().zip(values).enumerate() {
            if idx == pk {
                continue;
            }
            let key = base.with_column(index_to_column_id(idx));
            entries.push((key.to_string(), column.ty.encode(value)?));
        }
        Ok(entries)
    }

    pub fn insert<E>(&self, values: &[Value], engine: &mut E) -> DatabaseResult<()>
    where
        E: KvEngine + ?Sized,
    {
        for (key, value) in self.entries(values)? {
            trace!(%key, %value, "put");
            engine.put(&key, &value);
        }
        Ok(())
    }

    pub fn get<E>(&self, primary_key: &Value, engine: &E) -> DatabaseResult<Option<Vec<Value>>>
    where
        E: KvEngine + ?Sized,
    {
        let row_key = self.row_key(primary_key)?;
        let base = row_key.to_string();
        let mut row = RowBuilder::new(&self.schema);
        for (key, value) in engine.scan_prefix(&base) {
            let path = KeyPath::parse(key)?;
            // The prefix also matches longer primary keys that merely start
            // with this one.
            if path.primary_key != row_key.primary_key {
                continue;
            }
            row.apply(&self.schema, &path, key, value)?;
        }
        row.finish(&base)
    }

    /// Every row of the table, ordered by primary key.
    pub fn scan<E>(&self, engine: &E) -> DatabaseResult<Vec<Vec<Value>>>
    where
        E: KvEngine + ?Sized,
    {
        let prefix = format!("{KEY_DELIMITER}{}{KEY_DELIMITER}", self.id);
        let mut rows: BTreeMap<String, RowBuilder> = BTreeMap::new();
        for (key, value) in engine.scan_prefix(&prefix) {
            let path = KeyPath::parse(key)?;
            rows.entry(path.primary_key.clone())
                .or_insert_with(|| RowBuilder::new(&self.schema))
                .apply(&self.schema, &path, key, value)?;
        }

        let mut out = Vec::with_capacity(rows.len());
        for (pk, row) in rows {
            let base = KeyPath::row(self.id, pk).to_string();
            if let Some(values) = row.finish(&base)? {
                out.push(values);
            }
        }
        Ok(out)
    }
}

/// Collects the entries of one row until it can be reassembled.
#[derive(Debug)]
struct RowBuilder {
    exists: bool,
    values: Vec<Option<Value>>,
}

impl RowBuilder {
    fn new(schema: &Schema) -> Self {
        Self {
            exists: false,
            values: vec![None; schema.column_count()],
        }
    }

    fn apply(
        &mut self,
        schema: &Schema,
        path: &KeyPath,
        key: &str,
        value: &str,
    ) -> DatabaseResult<()> {
        match path.column_id {
            None => {
                let pk = schema.primary_key_index();
                self.values[pk] = Some(schema.primary_key_type().decode(&path.primary_key)?);
                self.exists = true;
            }
            Some(column_id) => {
                let idx = column_id_to_index(column_id)
                    .filter(|idx| *idx != schema.primary_key_index())
                    .ok_or_else(|| DatabaseError::MalformedKey(key.to_owned()))?;
                let (_, column) = schema
                    .column(idx)
                    .ok_or_else(|| DatabaseError::MalformedKey(key.to_owned()))?;
                self.values[idx] = Some(column.ty.decode(value)?);
            }
        }
        Ok(())
    }

    fn finish(self, base: &str) -> DatabaseResult<Option<Vec<Value>>> {
        if !self.exists {
            return Ok(None);
        }
        self.values
            .into_iter()
            .collect::<Option<Vec<Value>>>()
            .map(Some)
            .ok_or_else(|| DatabaseError::IncompleteRow(base.to_owned()))
    }
}

/// Named keyed tables sharing one engine.
///
/// Table ids are handed out from 1 in creation order.
#[derive(Debug)]
pub struct Database<E: KvEngine> {
    engine: E,
    tables: HashMap<String, KeyedTable>,
    table_ids: HashMap<String, TableId>,
    next_table_id: TableId,
}

impl<E: KvEngine> Database<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            tables: HashMap::new(),
            table_ids: HashMap::new(),
            next_table_id: 1,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn create_table(&mut self, name: &str, schema: Schema) -> DatabaseResult<TableId> {
        if self.tables.contains_key(name) {
            return Err(DatabaseError::DuplicateTable(name.to_owned()));
        }

        let id = self.next_table_id;
        self.next_table_id += 1;
        let table = KeyedTable::new(id, schema);
        self.tables.insert(name.to_owned(), table);
        self.table_ids.insert(name.to_owned(), id);

        info!(table = name, id, "created table");
        Ok(id)
    }

    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.table_ids.get(name).copied()
    }

    pub fn table(&self, name: &str) -> DatabaseResult<&KeyedTable> {
        self.tables
            .get(name)
            .ok_or_else(|| DatabaseError::UnknownTable(name.to_owned()))
    }

    pub fn insert(&mut self, name: &str, values: &[Value]) -> DatabaseResult<()> {
        let table = self
            .tables
            .get(name)
            .ok_or_else(|| DatabaseError::UnknownTable(name.to_owned()))?;
        table.insert(values, &mut self.engine)?;
        debug!(table = name, "inserted row");
        Ok(())
    }

    pub fn get(&self, name: &str, primary_key: &Value) -> DatabaseResult<Option<Vec<Value>>> {
        self.table(name)?.get(primary_key, &self.engine)
    }

    pub fn scan(&self, name: &str) -> DatabaseResult<Vec<Vec<Value>>> {
        self.table(name)?.scan(&self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Type;
    use crate::kv::MemEngine;
    use crate::schema::Column;

    fn users() -> Schema {
        Schema::new([
            ("id", Column::primary_key(Type::Integer)),
            ("username", Column::new(Type::Text)),
            ("email", Column::new(Type::Text)),
        ])
        .unwrap()
    }

    fn user(id: i64, name: &str, email: &str) -> Vec<Value> {
        vec![Value::Integer(id), name.into(), email.into()]
    }

    #[test]
    fn it_assigns_sequential_table_ids() {
        let mut db = Database::new(MemEngine::new());
        assert_eq!(db.create_table("a", users()).unwrap(), 1);
        assert_eq!(db.create_table("b", users()).unwrap(), 2);
        assert_eq!(db.create_table("c", users()).unwrap(), 3);
        assert_eq!(db.table_id("b"), Some(2));
        assert_eq!(db.table_id("zzz"), None);
    }

    #[test]
    fn it_rejects_duplicate_tables() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("users", users()).unwrap();

        let err = db.create_table("users", users()).unwrap_err();
        assert_eq!(err, DatabaseError::DuplicateTable("users".into()));
        assert_eq!(db.table_id("users"), Some(1));

        // The failed call does not consume an id.
        assert_eq!(db.create_table("other", users()).unwrap(), 2);
    }

    #[test]
    fn it_writes_a_marker_and_one_entry_per_column() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("a", users()).unwrap();
        db.create_table("b", users()).unwrap();
        db.create_table("c", users()).unwrap();

        db.insert("c", &user(42, "ann", "a@b.com")).unwrap();

        let entries: Vec<(&str, &str)> = db.engine().iter().collect();
        assert_eq!(
            entries,
            [
                ("/3/10000000042", "NULL"),
                ("/3/10000000042/2", "ann"),
                ("/3/10000000042/3", "a@b..com"),
            ]
        );
    }

    #[test]
    fn it_embeds_a_non_leading_primary_key_in_the_base_key() {
        let schema = Schema::new([
            ("name", Column::new(Type::Text)),
            ("code", Column::primary_key(Type::Text)),
            ("size", Column::new(Type::Integer)),
        ])
        .unwrap();
        let mut db = Database::new(MemEngine::new());
        db.create_table("items", schema).unwrap();

        let values = ["widget".into(), "w/1".into(), Value::Integer(-5)];
        db.insert("items", &values).unwrap();

        assert_eq!(db.engine().get("/1/w.~1"), Some("NULL"));
        assert_eq!(db.engine().get("/1/w.~1/1"), Some("widget"));
        assert_eq!(db.engine().get("/1/w.~1/3"), Some("09999999995"));
        assert_eq!(db.engine().get("/1/w.~1/2"), None);
        assert_eq!(db.engine().len(), 3);
    }

    #[test]
    fn it_writes_nothing_for_invalid_rows() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("users", users()).unwrap();

        let err = db
            .insert("users", &[Value::Integer(1), "ann".into()])
            .unwrap_err();
        assert_eq!(
            err,
            DatabaseError::ColumnCountMismatch {
                expected: 3,
                actual: 2
            }
        );

        let values = [Value::Integer(1), "ann".into(), Value::Integer(2)];
        let err = db.insert("users", &values).unwrap_err();
        assert_eq!(
            err,
            DatabaseError::Encode(EncodeError::TypeMismatch {
                expected: Type::Text,
                found: Type::Integer,
            })
        );

        assert!(db.engine().is_empty());
    }

    #[test]
    fn it_rejects_unknown_tables() {
        let mut db = Database::new(MemEngine::new());
        assert_eq!(
            db.insert("nope", &user(1, "a", "b")).unwrap_err(),
            DatabaseError::UnknownTable("nope".into())
        );
    }

    #[test]
    fn it_reads_rows_back() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("users", users()).unwrap();
        db.insert("users", &user(7, "bob", "b/o.b")).unwrap();
        db.insert("users", &user(70, "bobby", "x")).unwrap();

        assert_eq!(
            db.get("users", &Value::Integer(7)).unwrap(),
            Some(user(7, "bob", "b/o.b"))
        );
        assert_eq!(db.get("users", &Value::Integer(8)).unwrap(), None);
    }

    #[test]
    fn it_does_not_mix_rows_sharing_a_text_prefix() {
        let schema = Schema::new([
            ("name", Column::primary_key(Type::Text)),
            ("n", Column::new(Type::Integer)),
        ])
        .unwrap();
        let mut db = Database::new(MemEngine::new());
        db.create_table("t", schema).unwrap();
        db.insert("t", &["a".into(), Value::Integer(1)]).unwrap();
        db.insert("t", &["a!".into(), Value::Integer(2)]).unwrap();
        db.insert("t", &["ab".into(), Value::Integer(3)]).unwrap();

        assert_eq!(
            db.get("t", &"a".into()).unwrap(),
            Some(vec!["a".into(), Value::Integer(1)])
        );
        assert_eq!(
            db.scan("t").unwrap(),
            [
                vec!["a".into(), Value::Integer(1)],
                vec!["a!".into(), Value::Integer(2)],
                vec!["ab".into(), Value::Integer(3)],
            ]
        );
    }

    #[test]
    fn it_scans_in_primary_key_order() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("users", users()).unwrap();
        db.create_table("other", users()).unwrap();
        for id in [5, -3, 100, 0, -40] {
            db.insert("users", &user(id, "u", "e")).unwrap();
        }
        db.insert("other", &user(1, "o", "o")).unwrap();

        let ids: Vec<Value> = db
            .scan("users")
            .unwrap()
            .into_iter()
            .map(|row| row[0].clone())
            .collect();
        assert_eq!(ids, [-40, -3, 0, 5, 100].map(Value::Integer).to_vec());
    }

    #[test]
    fn it_overwrites_rows_with_the_same_primary_key() {
        let mut db = Database::new(MemEngine::new());
        db.create_table("users", users()).unwrap();
        db.insert("users", &user(1, "old", "old")).unwrap();
        db.insert("users", &user(1, "new", "new")).unwrap();

        assert_eq!(db.scan("users").unwrap(), [user(1, "new", "new")]);
    }

    #[test]
    fn it_parses_key_paths() {
        assert_eq!(
            KeyPath::parse("/3/10000000042").unwrap(),
            KeyPath::row(3, "10000000042")
        );
        assert_eq!(
            KeyPath::parse("/3/10000000042/2").unwrap(),
            KeyPath::row(3, "10000000042").with_column(2)
        );
        assert_eq!(
            KeyPath::parse("/1//2").unwrap(),
            KeyPath::row(1, "").with_column(2)
        );

        for bad in ["", "3/x", "/x/y", "/3", "/3/x/0", "/3/x/y", "/3/x/2/4"] {
            assert_eq!(
                KeyPath::parse(bad).unwrap_err(),
                DatabaseError::MalformedKey(bad.into())
            );
        }
    }

    #[test]
    fn it_displays_key_paths() {
        let row = KeyPath::row(3, "10000000042");
        assert_eq!(row.to_string(), "/3/10000000042");
        assert_eq!(row.with_column(2).to_string(), "/3/10000000042/2");
    }
}
