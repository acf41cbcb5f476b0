use std::cmp::Ordering;
use std::fmt;

use crate::storage::schema::Type;
use crate::utils::io::Encodeable;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT64: u8 = 2;
const TAG_FLOAT64: u8 = 3;
const TAG_BYTES: u8 = 4;

/// The minimal logical value a tuple field or node-pointer prefix
/// holds. Stands in for the external record codec's richer type set;
/// the core only needs ordering, equality and a stable byte encoding.
#[derive(Clone, Debug)]
pub enum Cell {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
}

impl Cell {
    fn tag(&self) -> u8 {
        match self {
            Cell::Null => TAG_NULL,
            Cell::Bool(_) => TAG_BOOL,
            Cell::Int64(_) => TAG_INT64,
            Cell::Float64(_) => TAG_FLOAT64,
            Cell::Bytes(_) => TAG_BYTES,
        }
    }

    /// Decode one cell of the given on-page `Type` starting at
    /// `bytes[0]`, returning it together with the number of bytes
    /// consumed (the type's fixed footprint).
    pub fn decode_one(bytes: &[u8], field_type: Type) -> (Cell, usize) {
        let tag = bytes[0];
        if tag == TAG_NULL {
            return (Cell::Null, field_type.fixed_len());
        }
        match field_type {
            Type::Bool => (Cell::Bool(bytes[1] != 0), field_type.fixed_len()),
            Type::Int64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[1..9]);
                (Cell::Int64(i64::from_be_bytes(buf)), field_type.fixed_len())
            }
            Type::Float64 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[1..9]);
                (
                    Cell::Float64(f64::from_bits(u64::from_be_bytes(buf))),
                    field_type.fixed_len(),
                )
            }
            Type::Bytes(n) => {
                let mut len_buf = [0u8; 4];
                len_buf.copy_from_slice(&bytes[1..5]);
                let len = u32::from_be_bytes(len_buf) as usize;
                let data = bytes[5..5 + len].to_vec();
                (Cell::Bytes(data), field_type.fixed_len())
            }
        }
    }
}

impl Encodeable for Cell {
    fn encode(&self) -> Vec<u8> {
        match self {
            Cell::Null => vec![TAG_NULL],
            Cell::Bool(b) => vec![TAG_BOOL, *b as u8],
            Cell::Int64(v) => {
                let mut buf = vec![TAG_INT64];
                buf.extend_from_slice(&v.to_be_bytes());
                buf
            }
            Cell::Float64(v) => {
                let mut buf = vec![TAG_FLOAT64];
                buf.extend_from_slice(&v.to_bits().to_be_bytes());
                buf
            }
            Cell::Bytes(b) => {
                let mut buf = vec![TAG_BYTES];
                buf.extend_from_slice(&(b.len() as u32).to_be_bytes());
                buf.extend_from_slice(b);
                buf
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Int64(v) => write!(f, "{}", v),
            Cell::Float64(v) => write!(f, "{}", v),
            Cell::Bytes(b) => write!(f, "{:?}", b),
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    /// A total order across variants so that a `Vec<Cell>` always
    /// sorts deterministically even in corner cases (e.g. comparing a
    /// NULL key prefix against a populated one during validation).
    /// Same-column comparisons, the only ones the tree ever performs
    /// on a real workload, always hit a same-variant branch below.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            (Cell::Int64(a), Cell::Int64(b)) => a.cmp(b),
            (Cell::Float64(a), Cell::Float64(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Cell::Bytes(a), Cell::Bytes(b)) => a.cmp(b),
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

/// Comparison operators a search predicate may apply against a key
/// field. Only `Equals` is exercised by the current cursor search
/// (point lookup feeding the sibling-chain iterator); the others
/// support range-scan predicates over an already-positioned cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Equals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
}

/// A single-field search predicate: `field <op> value`. Used to drive
/// `BTreeTableSearchIterator`, which positions a leaf cursor at the
/// first qualifying record and then walks forward until the predicate
/// can no longer hold.
#[derive(Clone, Debug)]
pub struct Predicate {
    pub field: usize,
    pub op: Op,
    pub value: Cell,
}

impl Predicate {
    pub fn new(field: usize, op: Op, value: &Cell) -> Predicate {
        Predicate {
            field,
            op,
            value: value.clone(),
        }
    }

    pub fn is_satisfied(&self, candidate: &Cell) -> bool {
        match self.op {
            Op::Equals => candidate == &self.value,
            Op::LessThan => candidate < &self.value,
            Op::LessThanOrEq => candidate <= &self.value,
            Op::GreaterThan => candidate > &self.value,
            Op::GreaterThanOrEq => candidate >= &self.value,
        }
    }
}
