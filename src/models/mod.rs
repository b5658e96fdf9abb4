// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod api_key;
pub mod principal;

pub use api_key::{ApiKeyRecord, LoginCredentials, PipelineResponse};
pub use principal::Principal;
