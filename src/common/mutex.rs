//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Wrapper around `std::sync::Mutex::lock()` that on error consumes the
//! poisoned mutex and returns a labeled error instead of a panic.

use std::sync::{Mutex, MutexGuard};

use crate::common::Result;
use crate::error::CallMetricsError;

pub struct StateMutex<T: ?Sized> {
    /// Human readable label for the mutex
    label: String,
    /// The actual mutex
    mutex: Mutex<T>,
}

impl<T> StateMutex<T> {
    pub fn new(t: T, label: &str) -> StateMutex<T> {
        StateMutex {
            mutex: Mutex::new(t),
            label: label.to_string(),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, T>> {
        match self.mutex.lock() {
            Ok(v) => Ok(v),
            Err(_) => Err(CallMetricsError::MutexPoisoned(self.label.clone()).into()),
        }
    }
}
