use std::collections::HashMap;
use std::sync::Arc;

use strata_protos::common::{ColumnSchemaPb, DataTypePb, SchemaPb};
use strata_rpc::{Error, Result};

/// Column types supported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Binary,
}

impl DataType {
    pub(crate) fn to_pb(self) -> i32 {
        let pb = match self {
            DataType::Bool => DataTypePb::Bool,
            DataType::Int8 => DataTypePb::Int8,
            DataType::Int16 => DataTypePb::Int16,
            DataType::Int32 => DataTypePb::Int32,
            DataType::Int64 => DataTypePb::Int64,
            DataType::UInt32 => DataTypePb::Uint32,
            DataType::UInt64 => DataTypePb::Uint64,
            DataType::Float => DataTypePb::Float,
            DataType::Double => DataTypePb::Double,
            DataType::String => DataTypePb::String,
            DataType::Binary => DataTypePb::Binary,
        };
        pb as i32
    }

    pub(crate) fn from_pb(pb: i32) -> Result<DataType> {
        match DataTypePb::try_from(pb) {
            Ok(DataTypePb::Bool) => Ok(DataType::Bool),
            Ok(DataTypePb::Int8) => Ok(DataType::Int8),
            Ok(DataTypePb::Int16) => Ok(DataType::Int16),
            Ok(DataTypePb::Int32) => Ok(DataType::Int32),
            Ok(DataTypePb::Int64) => Ok(DataType::Int64),
            Ok(DataTypePb::Uint32) => Ok(DataType::UInt32),
            Ok(DataTypePb::Uint64) => Ok(DataType::UInt64),
            Ok(DataTypePb::Float) => Ok(DataType::Float),
            Ok(DataTypePb::Double) => Ok(DataType::Double),
            Ok(DataTypePb::String) => Ok(DataType::String),
            Ok(DataTypePb::Binary) => Ok(DataType::Binary),
            Ok(DataTypePb::UnknownType) | Err(_) => {
                Err(Error::Corruption(format!("unknown column type {pb}")))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    pub is_key: bool,
    pub is_nullable: bool,
    /// Assigned by the master; never set on client-built schemas.
    pub id: Option<u32>,
}

impl ColumnSchema {
    pub(crate) fn to_pb(&self) -> ColumnSchemaPb {
        ColumnSchemaPb {
            name: self.name.clone(),
            r#type: self.data_type.to_pb(),
            is_key: self.is_key,
            is_nullable: self.is_nullable,
            id: self.id,
        }
    }

    pub(crate) fn from_pb(pb: &ColumnSchemaPb) -> Result<ColumnSchema> {
        Ok(ColumnSchema {
            name: pb.name.clone(),
            data_type: DataType::from_pb(pb.r#type)?,
            is_key: pb.is_key,
            is_nullable: pb.is_nullable,
            id: pb.id,
        })
    }
}

/// An ordered set of columns. Key columns come first and are never
/// nullable. Cheap to clone; shared by tables, rows, and scanners.
#[derive(Debug, Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    columns: Vec<ColumnSchema>,
    index_by_name: HashMap<String, usize>,
    num_key_columns: usize,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Schema) -> bool {
        self.inner.columns == other.inner.columns
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    fn from_columns(columns: Vec<ColumnSchema>) -> Result<Schema> {
        let num_key_columns = columns.iter().take_while(|c| c.is_key).count();
        if num_key_columns == 0 {
            return Err(Error::InvalidArgument("schema has no key columns".to_string()));
        }
        for (i, column) in columns.iter().enumerate() {
            if column.is_key && i >= num_key_columns {
                return Err(Error::InvalidArgument(format!(
                    "key column {} must precede all value columns",
                    column.name
                )));
            }
            if column.is_key && column.is_nullable {
                return Err(Error::InvalidArgument(format!(
                    "key column {} must not be nullable",
                    column.name
                )));
            }
        }
        Schema::from_parts(columns, num_key_columns)
    }

    fn from_parts(columns: Vec<ColumnSchema>, num_key_columns: usize) -> Result<Schema> {
        let mut index_by_name = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index_by_name.insert(column.name.clone(), i).is_some() {
                return Err(Error::InvalidArgument(format!("duplicate column {}", column.name)));
            }
        }
        Ok(Schema {
            inner: Arc::new(SchemaInner { columns, index_by_name, num_key_columns }),
        })
    }

    /// A key-less view of the named columns, in the given order, for scan
    /// projections.
    pub(crate) fn projection(&self, columns: &[&str]) -> Result<Schema> {
        let projected = columns
            .iter()
            .map(|&name| {
                let index = self.column_index(name).ok_or_else(|| {
                    Error::InvalidArgument(format!("unknown projection column {name}"))
                })?;
                Ok(ColumnSchema { is_key: false, ..self.inner.columns[index].clone() })
            })
            .collect::<Result<Vec<_>>>()?;
        Schema::from_parts(projected, 0)
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.inner.columns
    }

    pub fn column(&self, index: usize) -> &ColumnSchema {
        &self.inner.columns[index]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.inner.index_by_name.get(name).copied()
    }

    pub fn num_columns(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn num_key_columns(&self) -> usize {
        self.inner.num_key_columns
    }

    /// A copy of this schema with the server-assigned column ids removed.
    pub fn without_column_ids(&self) -> Schema {
        let columns = self
            .inner
            .columns
            .iter()
            .map(|c| ColumnSchema { id: None, ..c.clone() })
            .collect();
        // Names are unique in `self`, so this cannot fail.
        Schema::from_parts(columns, self.inner.num_key_columns).unwrap()
    }

    pub fn to_pb(&self) -> SchemaPb {
        SchemaPb { columns: self.inner.columns.iter().map(ColumnSchema::to_pb).collect() }
    }

    /// Builds a schema from its wire form. Trusts the sender's column
    /// order; key-less projections are accepted.
    pub fn from_pb(pb: &SchemaPb) -> Result<Schema> {
        let columns = pb.columns.iter().map(ColumnSchema::from_pb).collect::<Result<Vec<_>>>()?;
        let num_key_columns = columns.iter().take_while(|c| c.is_key).count();
        Schema::from_parts(columns, num_key_columns)
    }
}

/// Builds a [`Schema`] column by column; key columns must be added first.
#[derive(Default)]
pub struct SchemaBuilder {
    columns: Vec<ColumnSchema>,
}

impl SchemaBuilder {
    pub fn add_key_column(mut self, name: impl Into<String>, data_type: DataType) -> SchemaBuilder {
        self.columns.push(ColumnSchema {
            name: name.into(),
            data_type,
            is_key: true,
            is_nullable: false,
            id: None,
        });
        self
    }

    pub fn add_column(mut self, name: impl Into<String>, data_type: DataType) -> SchemaBuilder {
        self.columns.push(ColumnSchema {
            name: name.into(),
            data_type,
            is_key: false,
            is_nullable: false,
            id: None,
        });
        self
    }

    pub fn add_nullable_column(mut self, name: impl Into<String>, data_type: DataType) -> SchemaBuilder {
        self.columns.push(ColumnSchema {
            name: name.into(),
            data_type,
            is_key: false,
            is_nullable: true,
            id: None,
        });
        self
    }

    pub fn build(self) -> Result<Schema> {
        Schema::from_columns(self.columns)
    }
}
