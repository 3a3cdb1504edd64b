//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::time::{Duration, SystemTime};

pub fn saturating_epoch_time(ts: SystemTime) -> Duration {
    ts.duration_since(std::time::UNIX_EPOCH).unwrap_or_default()
}

/// Current wall-clock time in milliseconds since the epoch, as stamped on
/// outgoing events.
pub fn now_millis() -> u64 {
    saturating_epoch_time(SystemTime::now()).as_millis() as u64
}
