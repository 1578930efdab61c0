use std::collections::HashSet;

use thiserror::Error;

use crate::encoding::Type;

pub type ColumnId = u32;

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no primary key column")]
    MissingPrimaryKey,

    #[error("columns {first:?} and {second:?} are both marked primary key")]
    MultiplePrimaryKeys { first: String, second: String },

    #[error("column {0:?} appears more than once")]
    DuplicateColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub ty: Type,
    pub primary_key: bool,
}

impl Column {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            primary_key: false,
        }
    }

    pub fn primary_key(ty: Type) -> Self {
        Self {
            ty,
            primary_key: true,
        }
    }
}

/// Ordered column list with exactly one primary key.
///
/// Column ids are 1-based positions in this order. The primary key takes a
/// position like any other column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<(String, Column)>,
    primary_key: usize,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let columns: Vec<(String, Column)> = columns
            .into_iter()
            .map(|(name, column)| (name.into(), column))
            .collect();

        let mut seen = HashSet::new();
        let mut primary_key: Option<usize> = None;
        for (idx, (name, column)) in columns.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
            if !column.primary_key {
                continue;
            }
            if let Some(first) = primary_key {
                return Err(SchemaError::MultiplePrimaryKeys {
                    first: columns[first].0.clone(),
                    second: name.clone(),
                });
            }
            primary_key = Some(idx);
        }

        let primary_key = primary_key.ok_or(SchemaError::MissingPrimaryKey)?;
        Ok(Self {
            columns,
            primary_key,
        })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns
            .iter()
            .map(|(name, column)| (name.as_str(), column))
    }

    pub fn column(&self, idx: usize) -> Option<(&str, &Column)> {
        self.columns
            .get(idx)
            .map(|(name, column)| (name.as_str(), column))
    }

    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    pub fn primary_key_type(&self) -> Type {
        self.columns[self.primary_key].1.ty
    }

    pub fn column_id(&self, name: &str) -> Option<ColumnId> {
        self.columns
            .iter()
            .position(|(n, _)| n == name)
            .map(index_to_column_id)
    }
}

pub(crate) fn index_to_column_id(idx: usize) -> ColumnId {
    idx as ColumnId + 1
}

pub(crate) fn column_id_to_index(id: ColumnId) -> Option<usize> {
    (id as usize).checked_sub(1)
}
