use std::fmt;

/// The error type used across the tree engine.
///
/// Structural corruption (parent/child mismatch, broken sibling
/// links, record-shape violations) is unrecoverable in-line: the
/// caller is expected to dump context via [`SmallError::show_backtrace`]
/// and abort, per the corruption policy in the design notes.
#[derive(Clone)]
pub struct SmallError {
    message: String,
    backtrace: std::sync::Arc<backtrace::Backtrace>,
}

impl SmallError {
    pub fn new(message: &str) -> SmallError {
        SmallError {
            message: message.to_string(),
            backtrace: std::sync::Arc::new(backtrace::Backtrace::new()),
        }
    }

    /// Print the captured backtrace to stderr. Called by callers that
    /// are about to treat this error as fatal corruption.
    pub fn show_backtrace(&self) {
        eprintln!("error: {}", self.message);
        eprintln!("{:?}", self.backtrace);
    }
}

impl fmt::Display for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for SmallError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SmallError {{ message: {} }}", self.message)
    }
}

impl std::error::Error for SmallError {}

impl From<std::io::Error> for SmallError {
    fn from(e: std::io::Error) -> Self {
        SmallError::new(&format!("io error: {}", e))
    }
}
