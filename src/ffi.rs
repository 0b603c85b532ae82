//! FFI bindings for habit-tally
//!
//! This module provides C-compatible functions for calling habit-tally from
//! other languages. All functions take null-terminated C strings and return
//! allocated memory that must be freed by the caller using `habit_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::pipeline::{rankings_from_json, scoreboard_from_json, HabitTracker};
use crate::schema::EntryRecord;
use crate::types::User;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Like `cstr_to_string`, recording an error naming the argument on failure
unsafe fn required_arg(ptr: *const c_char, name: &str) -> Option<String> {
    let value = cstr_to_string(ptr);
    if value.is_none() {
        set_last_error(&format!("Invalid {name} string pointer"));
    }
    value
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute rankings for a snapshot JSON and return a JSON array.
///
/// # Safety
/// - `snapshot_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `habit_free_string`.
/// - Returns NULL on error; call `habit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn habit_rankings_json(snapshot_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json) = required_arg(snapshot_json, "snapshot JSON") else {
        return ptr::null_mut();
    };

    match rankings_from_json(&json) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compute the full scoreboard for a snapshot JSON.
///
/// # Safety
/// - `snapshot_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `habit_free_string`.
/// - Returns NULL on error; call `habit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn habit_scoreboard_json(snapshot_json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json) = required_arg(snapshot_json, "snapshot JSON") else {
        return ptr::null_mut();
    };

    match scoreboard_from_json(&json) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Tracker API
// ============================================================================

/// Opaque handle to a HabitTracker
pub struct HabitTrackerHandle {
    tracker: HabitTracker,
}

/// Create a new tracker with the program catalog and no users.
///
/// # Safety
/// - Returns a pointer to a newly allocated tracker.
/// - Must be freed with `habit_tracker_free`.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_new() -> *mut HabitTrackerHandle {
    clear_last_error();

    let handle = Box::new(HabitTrackerHandle {
        tracker: HabitTracker::default(),
    });
    Box::into_raw(handle)
}

/// Free a tracker.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_free(tracker: *mut HabitTrackerHandle) {
    if !tracker.is_null() {
        drop(Box::from_raw(tracker));
    }
}

/// Register or update a user from `{"id", "name", "avatar"}` JSON.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - `user_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `habit_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_add_user(
    tracker: *mut HabitTrackerHandle,
    user_json: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &mut *tracker;

    let Some(json) = required_arg(user_json, "user JSON") else {
        return -1;
    };

    match serde_json::from_str::<User>(&json) {
        Ok(user) => {
            handle.tracker.add_user(user);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Record one habit.entry.v1 JSON record.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - `record_json` must be a valid null-terminated C string.
/// - Returns 0 on success, -1 on error; call `habit_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_record(
    tracker: *mut HabitTrackerHandle,
    record_json: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &mut *tracker;

    let Some(json) = required_arg(record_json, "record JSON") else {
        return -1;
    };

    let record = match serde_json::from_str::<EntryRecord>(&json) {
        Ok(record) => record,
        Err(e) => {
            set_last_error(&e.to_string());
            return -1;
        }
    };

    match handle.tracker.record(&record) {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Current rankings of a tracker as a JSON array.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - Returns a newly allocated string that must be freed with `habit_free_string`.
/// - Returns NULL on error; call `habit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_rankings(tracker: *mut HabitTrackerHandle) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }

    let handle = &*tracker;

    match serde_json::to_string(&handle.tracker.rankings()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// 1-based rank of a user; unknown users get the user count.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - `user_id` must be a valid null-terminated C string.
/// - Returns -1 on error; call `habit_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_user_rank(
    tracker: *mut HabitTrackerHandle,
    user_id: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &*tracker;

    let Some(user_id) = required_arg(user_id, "user id") else {
        return -1;
    };

    i32::try_from(handle.tracker.user_rank(&user_id)).unwrap_or(i32::MAX)
}

/// Save tracker state to JSON.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - Returns a newly allocated string that must be freed with `habit_free_string`.
/// - Returns NULL on error; call `habit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_save(tracker: *mut HabitTrackerHandle) -> *mut c_char {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return ptr::null_mut();
    }

    let handle = &*tracker;

    match handle.tracker.save() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load tracker state from JSON, replacing the current state.
///
/// # Safety
/// - `tracker` must be a valid pointer returned by `habit_tracker_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `habit_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn habit_tracker_load(
    tracker: *mut HabitTrackerHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if tracker.is_null() {
        set_last_error("Null tracker pointer");
        return -1;
    }

    let handle = &mut *tracker;

    let Some(json_str) = required_arg(json, "JSON") else {
        return -1;
    };

    match handle.tracker.load(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by habit-tally functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a habit-tally function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn habit_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next habit-tally call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn habit_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the habit-tally library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn habit_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
