// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! FFI status codes and the thread-local last error.

use std::cell::RefCell;
use std::ffi::{c_char, CString};

/// Status returned by lifecycle calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaiErrorCode {
    Ok = 0,
    NullPointer = -1,
    InvalidUtf8 = -2,
    InitFailed = -3,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record the last error for the calling thread.
pub fn set_last_error(msg: impl Into<String>) {
    let msg: String = msg.into().replace('\0', " ");
    let c = CString::new(msg).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = c);
}

/// Last error on this thread, or null. Valid until the next failing call.
#[no_mangle]
pub extern "C" fn mai_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(std::ptr::null(), |c| c.as_ptr())
    })
}
