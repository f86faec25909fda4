// Copyright 2024-2026 Mobile AI Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! C ABI for host applications.
//!
//! Every string returned by this module is owned by the caller and must be
//! released with [`mai_string_free`]. Services are released with
//! [`mai_service_free`].

mod error;
mod service;

pub use error::{mai_last_error, set_last_error, MaiErrorCode};
pub use service::{
    mai_backend_info, mai_cleanup, mai_initialize, mai_initialize_with_asset_dir,
    mai_process_inference, mai_service_free, mai_service_new, mai_string_free, MaiService,
};
