use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::btree::page_id::BTreePageID;
use crate::storage::cell::Cell;
use crate::storage::schema::Schema;
use crate::utils::io::Encodeable;

/// A decoded logical record: the leaf-level "full indexed tuple" of
/// §3, or (sliced to its key prefix) the payload a node pointer
/// carries. Stands in for the record codec's `dtuple_t`.
#[derive(Clone, Debug)]
pub struct Tuple {
    cells: Vec<Cell>,
}

impl Tuple {
    pub fn new_from_cells(cells: Vec<Cell>) -> Tuple {
        Tuple { cells }
    }

    pub fn new(scheme: &Schema, bytes: &[u8]) -> Tuple {
        Tuple {
            cells: scheme.decode_all(bytes),
        }
    }

    /// Test helper: a tuple of `width` `Int64` cells, all carrying
    /// `value`. Used by random-workload test setup where only the key
    /// field's actual value matters.
    pub fn new_int_tuples(value: i64, width: usize) -> Tuple {
        Tuple {
            cells: (0..width).map(|_| Cell::Int64(value)).collect(),
        }
    }

    pub fn get_cell(&self, index: usize) -> Cell {
        self.cells[index].clone()
    }

    pub fn get_cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn fields_count(&self) -> usize {
        self.cells.len()
    }

    /// `n_uniq`-wide prefix of this tuple, the payload a node pointer
    /// built from this record would carry.
    pub fn key_prefix(&self, n_uniq: usize) -> Vec<Cell> {
        self.cells.iter().take(n_uniq).cloned().collect()
    }
}

impl Encodeable for Tuple {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for cell in &self.cells {
            buf.extend(cell.encode());
        }
        buf
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", cell)?;
        }
        write!(f, ")")
    }
}

/// A tuple together with the slot and page it currently occupies.
/// Returned by leaf-page iterators so that a caller (e.g. the deleter
/// in a concurrent workload) can later name the exact record to
/// remove without re-searching the tree.
#[derive(Clone, Debug)]
pub struct WrappedTuple {
    internal: Tuple,
    slot_number: usize,
    pid: BTreePageID,
}

impl WrappedTuple {
    pub fn new(internal: Tuple, slot_number: usize, pid: BTreePageID) -> WrappedTuple {
        WrappedTuple {
            internal,
            slot_number,
            pid,
        }
    }

    pub fn get_slot_number(&self) -> usize {
        self.slot_number
    }

    pub fn get_pid(&self) -> BTreePageID {
        self.pid.clone()
    }
}

impl Deref for WrappedTuple {
    type Target = Tuple;

    fn deref(&self) -> &Tuple {
        &self.internal
    }
}

impl DerefMut for WrappedTuple {
    fn deref_mut(&mut self) -> &mut Tuple {
        &mut self.internal
    }
}

impl fmt::Display for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::page_id::PageCategory;

    #[test]
    fn test_tuple_clone() {
        let t = Tuple::new_int_tuples(7, 3);
        let t2 = t.clone();
        assert_eq!(t, t2);
    }

    #[test]
    fn test_key_prefix() {
        let t = Tuple::new_from_cells(vec![Cell::Int64(1), Cell::Int64(2), Cell::Int64(3)]);
        assert_eq!(t.key_prefix(1), vec![Cell::Int64(1)]);
    }

    #[test]
    fn test_wrapped_tuple_deref() {
        let pid = BTreePageID::new(PageCategory::Leaf, 0, 1);
        let wrapped = WrappedTuple::new(Tuple::new_int_tuples(1, 2), 3, pid);
        assert_eq!(wrapped.fields_count(), 2);
    }
}
