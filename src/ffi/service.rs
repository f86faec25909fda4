// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Service lifecycle and inference over the C ABI.

use std::ffi::{c_char, CStr, CString};
use std::path::Path;

use super::error::{set_last_error, MaiErrorCode};
use crate::assets::DirAssetStore;
use crate::cli::native_orchestrator;
use crate::config;
use crate::orchestrator::{MobileAiService, NOT_INITIALIZED};

/// Opaque service handle.
pub struct MaiService {
    inner: MobileAiService,
}

impl MaiService {
    pub fn new(inner: MobileAiService) -> Self {
        Self { inner }
    }
}

/// Owned C string; interior NULs become spaces.
fn to_c_string(s: String) -> *mut c_char {
    let s = if s.contains('\0') { s.replace('\0', " ") } else { s };
    CString::new(s).map_or(std::ptr::null_mut(), CString::into_raw)
}

unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, MaiErrorCode> {
    if ptr.is_null() {
        set_last_error(format!("null {}", what));
        return Err(MaiErrorCode::NullPointer);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| {
        set_last_error(format!("invalid UTF-8 in {}", what));
        MaiErrorCode::InvalidUtf8
    })
}

/// Create a service over the native runtimes, configured from the environment.
///
/// Returns null if the library was built without a native engine.
#[no_mangle]
pub extern "C" fn mai_service_new() -> *mut MaiService {
    match native_orchestrator(&config::load()) {
        Some(orchestrator) => Box::into_raw(Box::new(MaiService::new(MobileAiService::new(orchestrator)))),
        None => {
            set_last_error("built without a native engine runtime");
            std::ptr::null_mut()
        }
    }
}

/// Release a service created by [`mai_service_new`].
///
/// # Safety
/// `service` must come from `mai_service_new` and not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn mai_service_free(service: *mut MaiService) {
    if !service.is_null() {
        drop(Box::from_raw(service));
    }
}

/// Initialize from a model file.
///
/// # Safety
/// `service` must be valid; `model_path` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mai_initialize(
    service: *mut MaiService,
    model_path: *const c_char,
) -> MaiErrorCode {
    if service.is_null() {
        set_last_error("null service");
        return MaiErrorCode::NullPointer;
    }
    let path = match read_str(model_path, "model_path") {
        Ok(p) => p,
        Err(code) => return code,
    };
    let result = (*service).inner.initialize_detailed(Path::new(path));
    if result.success {
        MaiErrorCode::Ok
    } else {
        set_last_error(result.message.unwrap_or_default());
        MaiErrorCode::InitFailed
    }
}

/// Initialize from a directory of bundled assets.
///
/// # Safety
/// `service` must be valid; `asset_dir` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mai_initialize_with_asset_dir(
    service: *mut MaiService,
    asset_dir: *const c_char,
) -> MaiErrorCode {
    if service.is_null() {
        set_last_error("null service");
        return MaiErrorCode::NullPointer;
    }
    let dir = match read_str(asset_dir, "asset_dir") {
        Ok(d) => d,
        Err(code) => return code,
    };
    let store = DirAssetStore::new(dir);
    if (*service).inner.initialize_with_assets(&store) {
        MaiErrorCode::Ok
    } else {
        set_last_error("no backend initialized from assets");
        MaiErrorCode::InitFailed
    }
}

/// Run one inference. Never returns null for a valid service.
///
/// # Safety
/// `service` must be valid; `input` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mai_process_inference(
    service: *mut MaiService,
    input: *const c_char,
) -> *mut c_char {
    if service.is_null() {
        set_last_error("null service");
        return to_c_string(NOT_INITIALIZED.to_string());
    }
    let text = if input.is_null() {
        String::new()
    } else {
        CStr::from_ptr(input).to_string_lossy().into_owned()
    };
    to_c_string((*service).inner.process_inference(&text))
}

/// Describe the active backend.
///
/// # Safety
/// `service` must be valid.
#[no_mangle]
pub unsafe extern "C" fn mai_backend_info(service: *mut MaiService) -> *mut c_char {
    if service.is_null() {
        set_last_error("null service");
        return to_c_string(crate::orchestrator::INFO_NOT_INITIALIZED.to_string());
    }
    to_c_string((*service).inner.backend_info())
}

/// Release engines. Idempotent.
///
/// # Safety
/// `service` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn mai_cleanup(service: *mut MaiService) {
    if !service.is_null() {
        (*service).inner.cleanup();
    }
}

/// Free a string returned by this library.
///
/// # Safety
/// `s` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn mai_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::engine::runtime::{MockBehavior, MockRuntime};
    use crate::orchestrator::Orchestrator;

    fn mock_service() -> *mut MaiService {
        let orchestrator = Orchestrator::with_runtimes(
            &OrchestratorConfig { perf_probe: false, ..Default::default() },
            Arc::new(MockRuntime::new("gpu", MockBehavior::default())),
            None,
        );
        Box::into_raw(Box::new(MaiService::new(MobileAiService::new(orchestrator))))
    }

    unsafe fn take(s: *mut c_char) -> String {
        let out = CStr::from_ptr(s).to_str().unwrap().to_string();
        mai_string_free(s);
        out
    }

    #[test]
    fn test_lifecycle_over_c_abi() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/test_model.tflite"), b"m").unwrap();
        let dir_c = CString::new(dir.path().to_str().unwrap()).unwrap();
        let input = CString::new("hello").unwrap();

        unsafe {
            let svc = mock_service();
            assert_eq!(take(mai_process_inference(svc, input.as_ptr())), NOT_INITIALIZED);
            assert_eq!(mai_initialize_with_asset_dir(svc, dir_c.as_ptr()), MaiErrorCode::Ok);
            assert_eq!(
                take(mai_process_inference(svc, input.as_ptr())),
                "GPU Engine response (token 1, score: 0.900)"
            );
            assert!(take(mai_backend_info(svc)).starts_with("Backend: primary_gpu"));
            mai_cleanup(svc);
            mai_cleanup(svc);
            assert_eq!(take(mai_process_inference(svc, input.as_ptr())), NOT_INITIALIZED);
            mai_service_free(svc);
        }
    }

    #[test]
    fn test_null_arguments() {
        unsafe {
            assert_eq!(mai_initialize(std::ptr::null_mut(), std::ptr::null()), MaiErrorCode::NullPointer);
            let svc = mock_service();
            assert_eq!(mai_initialize(svc, std::ptr::null()), MaiErrorCode::NullPointer);
            assert_eq!(take(mai_process_inference(std::ptr::null_mut(), std::ptr::null())), NOT_INITIALIZED);
            mai_service_free(svc);
            mai_string_free(std::ptr::null_mut());
        }
    }
}
