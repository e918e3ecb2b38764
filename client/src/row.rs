use bytes::{Buf, BufMut};

use strata_protos::common::RowBlockPb;
use strata_rpc::{Error, Result};

use crate::schema::{DataType, Schema};
use crate::value::Value;

/// One row of a table, laid out against a schema. Cells are unset until
/// assigned; scans return rows with every projected cell set (or null).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Schema,
    cells: Vec<Option<Value>>,
}

impl Row {
    /// Rows written through a session are created with
    /// [`Table::new_insert`](crate::Table::new_insert); direct construction
    /// is for code that materializes rows itself.
    pub fn new(schema: Schema) -> Row {
        let cells = vec![None; schema.num_columns()];
        Row { schema, cells }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let index = self
            .schema
            .column_index(column)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown column {column}")))?;
        let expected = self.schema.column(index).data_type;
        if value.data_type() != expected {
            return Err(Error::InvalidArgument(format!(
                "wrong type for column {column}: expected {expected:?}, got {:?}",
                value.data_type()
            )));
        }
        self.cells[index] = Some(value);
        Ok(())
    }

    pub fn set_null(&mut self, column: &str) -> Result<()> {
        let index = self
            .schema
            .column_index(column)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown column {column}")))?;
        if !self.schema.column(index).is_nullable {
            return Err(Error::InvalidArgument(format!("column {column} is not nullable")));
        }
        self.cells[index] = None;
        Ok(())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.schema.column_index(column)?;
        self.cells[index].as_ref()
    }

    /// True when every key column has been assigned.
    pub(crate) fn key_is_set(&self) -> bool {
        self.cells[..self.schema.num_key_columns()].iter().all(Option::is_some)
    }
}

// Row-wise codec shared with server components. Each row is one presence
// byte per column followed by the set cells in schema order; scalars are
// little-endian fixed width, var-len cells carry a u32 length prefix.

pub fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Bool(v) => buf.put_u8(*v as u8),
        Value::Int8(v) => buf.put_i8(*v),
        Value::Int16(v) => buf.put_i16_le(*v),
        Value::Int32(v) => buf.put_i32_le(*v),
        Value::Int64(v) => buf.put_i64_le(*v),
        Value::UInt32(v) => buf.put_u32_le(*v),
        Value::UInt64(v) => buf.put_u64_le(*v),
        Value::Float(v) => buf.put_f32_le(*v),
        Value::Double(v) => buf.put_f64_le(*v),
        Value::String(v) => {
            buf.put_u32_le(v.len() as u32);
            buf.put_slice(v.as_bytes());
        }
        Value::Binary(v) => {
            buf.put_u32_le(v.len() as u32);
            buf.put_slice(v);
        }
    }
}

fn ensure(buf: &[u8], needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Error::Corruption("truncated row data".to_string()));
    }
    Ok(())
}

pub fn decode_value(data_type: DataType, buf: &mut &[u8]) -> Result<Value> {
    let value = match data_type {
        DataType::Bool => {
            ensure(buf, 1)?;
            Value::Bool(buf.get_u8() != 0)
        }
        DataType::Int8 => {
            ensure(buf, 1)?;
            Value::Int8(buf.get_i8())
        }
        DataType::Int16 => {
            ensure(buf, 2)?;
            Value::Int16(buf.get_i16_le())
        }
        DataType::Int32 => {
            ensure(buf, 4)?;
            Value::Int32(buf.get_i32_le())
        }
        DataType::Int64 => {
            ensure(buf, 8)?;
            Value::Int64(buf.get_i64_le())
        }
        DataType::UInt32 => {
            ensure(buf, 4)?;
            Value::UInt32(buf.get_u32_le())
        }
        DataType::UInt64 => {
            ensure(buf, 8)?;
            Value::UInt64(buf.get_u64_le())
        }
        DataType::Float => {
            ensure(buf, 4)?;
            Value::Float(buf.get_f32_le())
        }
        DataType::Double => {
            ensure(buf, 8)?;
            Value::Double(buf.get_f64_le())
        }
        DataType::String => {
            ensure(buf, 4)?;
            let len = buf.get_u32_le() as usize;
            ensure(buf, len)?;
            let bytes = buf[..len].to_vec();
            buf.advance(len);
            Value::String(String::from_utf8(bytes).map_err(|e| {
                Error::Corruption(format!("invalid utf-8 in string cell: {e}"))
            })?)
        }
        DataType::Binary => {
            ensure(buf, 4)?;
            let len = buf.get_u32_le() as usize;
            ensure(buf, len)?;
            let bytes = buf[..len].to_vec();
            buf.advance(len);
            Value::Binary(bytes)
        }
    };
    Ok(value)
}

/// Encodes rows against `schema`, returning the row count and the block
/// bytes.
pub fn encode_rows<'a, I>(schema: &Schema, rows: I) -> (u32, Vec<u8>)
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut buf = Vec::new();
    let mut count = 0u32;
    for row in rows {
        debug_assert!(row.schema == *schema);
        for index in 0..schema.num_columns() {
            match &row.cells[index] {
                Some(value) => {
                    buf.put_u8(1);
                    encode_value(value, &mut buf);
                }
                None => buf.put_u8(0),
            }
        }
        count += 1;
    }
    (count, buf)
}

pub fn decode_rows(schema: &Schema, block: &RowBlockPb) -> Result<Vec<Row>> {
    let mut buf = block.rows.as_slice();
    let mut rows = Vec::with_capacity(block.num_rows as usize);
    for _ in 0..block.num_rows {
        let mut row = Row::new(schema.clone());
        for index in 0..schema.num_columns() {
            ensure(buf, 1)?;
            if buf.get_u8() != 0 {
                let data_type = schema.column(index).data_type;
                row.cells[index] = Some(decode_value(data_type, &mut buf)?);
            }
        }
        rows.push(row);
    }
    if buf.has_remaining() {
        return Err(Error::Corruption(format!(
            "{} trailing bytes after {} rows",
            buf.remaining(),
            block.num_rows
        )));
    }
    Ok(rows)
}
