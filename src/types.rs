use std::sync::{Arc, RwLock};

use crate::error::SmallError;

/// A reference-counted, internally-latched handle to a value shared
/// across threads. Pages, tables and the singleton collaborators are
/// all held behind this alias.
pub type Pod<T> = Arc<RwLock<T>>;

pub type ResultPod<T> = Result<Pod<T>, SmallError>;

pub type SmallResult = Result<(), SmallError>;

pub fn new_pod<T>(value: T) -> Pod<T> {
    Arc::new(RwLock::new(value))
}
