//! Registration of the sqlite-vec functions and `vec0` module.
//!
//! The entry point is called directly rather than through
//! `load_extension`, so nothing here depends on a shared library path.

use std::ffi::{c_char, c_int, CStr};
use std::ptr;
use std::sync::OnceLock;

use rusqlite::ffi;
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;

use crate::types::{InitOutcome, Result, VecError};

type ExtensionEntry = unsafe extern "C" fn(
    *mut ffi::sqlite3,
    *mut *mut c_char,
    *const ffi::sqlite3_api_routines,
) -> c_int;

fn entry_point() -> ExtensionEntry {
    // SAFETY: sqlite3_vec_init is declared without arguments by the
    // sqlite-vec crate but is the standard extension entry point.
    unsafe { std::mem::transmute::<*const (), ExtensionEntry>(sqlite3_vec_init as *const ()) }
}

/// Register sqlite-vec on a raw connection handle.
///
/// A null handle fails with `SQLITE_ERROR` without calling into SQLite. Any
/// message allocated by the extension is copied and released with
/// `sqlite3_free` before returning.
///
/// # Safety
/// `db` must be null or a valid, open `sqlite3*` not used concurrently by
/// another thread for the duration of the call.
pub unsafe fn init_raw(db: *mut ffi::sqlite3) -> InitOutcome {
    if db.is_null() {
        tracing::error!("sqlite-vec init called with a null database handle");
        return InitOutcome {
            code: ffi::SQLITE_ERROR,
            message: Some("invalid database handle".to_string()),
        };
    }

    let mut err_msg: *mut c_char = ptr::null_mut();
    let code = entry_point()(db, &mut err_msg, ptr::null());

    let message = if err_msg.is_null() {
        None
    } else {
        let owned = CStr::from_ptr(err_msg).to_string_lossy().into_owned();
        ffi::sqlite3_free(err_msg.cast());
        Some(owned)
    };

    if code == ffi::SQLITE_OK {
        tracing::debug!("sqlite-vec initialized");
    } else {
        tracing::error!(
            code,
            "failed to initialize sqlite-vec: {}",
            message.as_deref().unwrap_or("unknown error")
        );
    }

    InitOutcome { code, message }
}

/// Register sqlite-vec on an open rusqlite connection.
pub fn register(conn: &Connection) -> Result<()> {
    // SAFETY: the handle belongs to `conn`, which is borrowed for the call.
    unsafe { init_raw(conn.handle()) }.into_result()
}

/// Register sqlite-vec for every connection opened after this call.
pub fn auto_load() -> Result<()> {
    // SAFETY: sqlite3_auto_extension only records the entry point.
    let rc = unsafe {
        ffi::sqlite3_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())))
    };
    if rc == ffi::SQLITE_OK {
        tracing::debug!("sqlite-vec auto-load enabled");
        Ok(())
    } else {
        Err(VecError::Extension {
            code: rc,
            message: Some("sqlite3_auto_extension failed".to_string()),
        })
    }
}

/// Undo [`auto_load`]. Returns false if it was not registered.
pub fn cancel_auto_load() -> bool {
    // SAFETY: removing an entry point that may or may not be registered is
    // always valid.
    let removed = unsafe {
        ffi::sqlite3_cancel_auto_extension(Some(std::mem::transmute(sqlite3_vec_init as *const ())))
    };
    removed != 0
}

static VERSION: OnceLock<String> = OnceLock::new();

/// Version string reported by `vec_version()`, computed once per process
/// from a private in-memory connection.
pub fn version() -> Result<String> {
    if let Some(v) = VERSION.get() {
        return Ok(v.clone());
    }
    let conn = Connection::open_in_memory()?;
    register(&conn)?;
    let v: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;
    Ok(VERSION.get_or_init(|| v).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle_fails_fast() {
        let outcome = unsafe { init_raw(ptr::null_mut()) };
        assert_eq!(outcome.code, ffi::SQLITE_ERROR);
        assert!(!outcome.is_ok());
        assert_eq!(outcome.message.as_deref(), Some("invalid database handle"));
    }

    #[test]
    fn test_register_on_connection() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();
        let v: String = conn
            .query_row("SELECT vec_version()", [], |row| row.get(0))
            .unwrap();
        assert!(v.starts_with('v'));
    }

    #[test]
    fn test_version_is_cached() {
        let first = version().unwrap();
        let second = version().unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
