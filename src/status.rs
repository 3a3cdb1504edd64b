//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! System and radio status sampling. Both are pluggable: the session
//! facade takes the providers at construction, and the default system
//! provider reads through `sysinfo`. Every sample is best-effort; a
//! provider returns None for anything the platform cannot report.

use std::sync::Mutex;

use sysinfo::System;

/// Point-in-time system status of the local endpoint.
pub trait SystemStatusProvider: Send + Sync {
    /// CPU level in percent.
    fn cpu_level(&self) -> Option<u32>;
    /// Battery level in percent.
    fn battery_level(&self) -> Option<u32>;
    /// Used memory in MB.
    fn memory_usage(&self) -> Option<u64>;
    /// Total memory in MB.
    fn memory_available(&self) -> Option<u64>;
    fn thread_count(&self) -> Option<u32>;
}

/// Wifi reception of the local endpoint.
pub trait WifiStatusProvider: Send + Sync {
    fn signal(&self) -> Option<i32>;
    fn rssi(&self) -> Option<i32>;
}

const BYTES_PER_MB: u64 = 1024 * 1024;

/// The default system provider, sampling through `sysinfo`.
pub struct SystemMonitor {
    system: Mutex<System>,
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemStatusProvider for SystemMonitor {
    fn cpu_level(&self) -> Option<u32> {
        let mut system = self.system.lock().ok()?;
        // Usage is computed against the previous refresh; the first sample
        // after startup reads low and settles from the second period on.
        system.refresh_cpu_usage();
        Some(system.global_cpu_usage() as u32)
    }

    fn battery_level(&self) -> Option<u32> {
        None
    }

    fn memory_usage(&self) -> Option<u64> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        Some(system.used_memory() / BYTES_PER_MB)
    }

    fn memory_available(&self) -> Option<u64> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        Some(system.total_memory() / BYTES_PER_MB)
    }

    fn thread_count(&self) -> Option<u32> {
        None
    }
}

/// For hosts without a radio, or ones that do not expose it.
pub struct NoWifiStatus;

impl WifiStatusProvider for NoWifiStatus {
    fn signal(&self) -> Option<i32> {
        None
    }

    fn rssi(&self) -> Option<i32> {
        None
    }
}
