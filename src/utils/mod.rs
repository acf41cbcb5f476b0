pub mod io;

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use backtrace::Backtrace;

/// Shorthand accessors for `RwLock<T>`, copied from the locking idiom
/// used throughout tikv: `.rl()`/`.wl()` read better at call sites than
/// `.read().unwrap()`/`.write().unwrap()` in code that never expects
/// poisoning.
pub trait HandyRwLock<T> {
    fn rl(&self) -> RwLockReadGuard<'_, T>;
    fn wl(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> HandyRwLock<T> for RwLock<T> {
    fn rl(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap()
    }

    fn wl(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap()
    }
}

/// Render the current try-lock state of a `RwLock`, for latch-state
/// diagnostics in debug logging.
pub fn lock_state<T>(lock: &RwLock<T>) -> String {
    if lock.is_poisoned() {
        return "poisoned".to_string();
    }
    match lock.try_write() {
        Ok(_) => "free".to_string(),
        Err(_) => match lock.try_read() {
            Ok(_) => "read-locked".to_string(),
            Err(_) => "write-locked".to_string(),
        },
    }
}

/// Best-effort "who called me" string for verbose structural-mutation
/// logging; walks the backtrace and reports the first frame outside
/// this crate's own stack-inspection helpers.
pub fn get_caller() -> String {
    let bt = Backtrace::new();
    for frame in bt.frames().iter().skip(2) {
        for symbol in frame.symbols() {
            if let Some(name) = symbol.name() {
                let name = name.to_string();
                if !name.contains("backtrace::") && !name.contains("get_caller") {
                    return name;
                }
            }
        }
    }
    "<unknown>".to_string()
}

static LOG_INIT: std::sync::Once = std::sync::Once::new();

/// Install the env_logger backend. Idempotent: tests call this from
/// every `setup()`, but the underlying logger may only be installed
/// once per process.
pub fn init_log() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
