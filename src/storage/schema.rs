use crate::storage::cell::Cell;
use crate::utils::io::Decodeable;

/// The on-page shape of a single column. `Bytes(n)` is a fixed prefix
/// length, matching the record codec's "prefix field" concept: the
/// B-tree core never stores full variable-length payloads on internal
/// pages, only a `n_uniq`-field prefix of the leaf key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int64,
    Float64,
    Bytes(usize),
}

impl Type {
    /// Fixed on-page footprint of this type, including its 1-byte
    /// variant tag. `Bytes` always occupies its declared prefix
    /// length plus a 4-byte length prefix, even for shorter values.
    pub fn fixed_len(&self) -> usize {
        match self {
            Type::Bool => 1 + 1,
            Type::Int64 => 1 + 8,
            Type::Float64 => 1 + 8,
            Type::Bytes(n) => 1 + 4 + n,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: Type,
}

impl Field {
    pub fn new(name: &str, field_type: Type) -> Field {
        Field {
            name: name.to_string(),
            field_type,
        }
    }
}

/// The column list of an index: field types (fixed/prefix-length
/// info) plus the unique-prefix count `n_uniq` consumed by the
/// node-pointer codec when it builds a routing key for an internal
/// record. The record codec proper (offset computation, variable
/// record conversion) is an external collaborator; this type only
/// carries the shape the core needs to stay byte-exact.
#[derive(Clone, Debug)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Schema {
        Schema { fields }
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    /// Total on-page footprint of a record laid out with this schema.
    pub fn tuple_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.fixed_len()).sum()
    }

    /// Decode `n_uniq` leading cells of `bytes`, used by the
    /// node-pointer codec to build a routing prefix without decoding
    /// the whole record.
    pub fn decode_prefix(&self, bytes: &[u8], n_uniq: usize) -> Vec<Cell> {
        let mut cells = Vec::with_capacity(n_uniq);
        let mut offset = 0;
        for field in self.fields.iter().take(n_uniq) {
            let (cell, len) = Cell::decode_one(&bytes[offset..], field.field_type);
            cells.push(cell);
            offset += len;
        }
        cells
    }

    pub fn decode_all(&self, bytes: &[u8]) -> Vec<Cell> {
        self.decode_prefix(bytes, self.fields.len())
    }
}

impl Decodeable for Schema {
    fn decode(_bytes: &[u8]) -> Self {
        unimplemented!("schema is supplied by the catalog, not read off a page")
    }
}
