//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Core, platform independent functionality.

pub mod event_manager;
pub mod metrics_manager;
