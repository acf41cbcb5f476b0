pub mod cell;
pub mod schema;
pub mod tuple;

pub use cell::{Cell, Op, Predicate};
pub use schema::{Field, Schema, Type};
pub use tuple::{Tuple, WrappedTuple};

/// Build a schema of `columns` big-endian `Int64` fields, the data
/// shape used throughout the integration tests and by `S1`-`S6` in the
/// testable-properties suite (a single-column unique integer index,
/// widened to multiple columns for multi-field payload tests).
pub fn small_int_schema(columns: usize, prefix: &str) -> Schema {
    let fields = (0..columns)
        .map(|i| Field::new(&format!("{}{}", prefix, i), Type::Int64))
        .collect();
    Schema::new(fields)
}
