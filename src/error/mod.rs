//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Common error codes.

use thiserror::Error;

/// Platform independent error conditions.
#[derive(Error, Debug)]
pub enum CallMetricsError {
    // Project wide common error codes
    #[error("Mutex poisoned: {0}")]
    MutexPoisoned(String),

    // Event gating contract errors. These indicate a caller built a wire
    // request before the gating state allowed it, not a runtime condition.
    #[error("Event requires an auth token before a request can be built: {0}")]
    AuthTokenNotHeld(&'static str),
    #[error("Event requires an established session before a request can be built: {0}")]
    SessionNotHeld(&'static str),
    #[error("Event payload could not be serialized: {0}")]
    PayloadNotSerializable(&'static str),
}
