// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod api_key;
pub mod botnoi;
pub mod google_oidc;
pub mod identity;

pub use api_key::{ApiKeyOrchestrator, KeyState, OrchestratorError};
pub use botnoi::{BotnoiClient, ClientError, KeyStrategy};
pub use google_oidc::GoogleIdentity;
pub use identity::{AuthError, IdentityProvider, SessionProvider};
