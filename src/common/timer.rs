//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! A cancellable periodic task on a dedicated thread.
//!
//! Both the session facade and each per-peer event manager own recurring
//! work (keep-alive, system status, stats polling) that must be stoppable
//! independently of each other and of in-flight transport calls. The timer
//! thread sleeps on a control channel so cancellation takes effect
//! immediately rather than at the next tick boundary.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{channel, RecvTimeoutError, Sender},
    Arc,
};
use std::thread;
use std::time::Duration;

enum Control {
    Cancel,
}

pub struct PeriodicTimer {
    control: Sender<Control>,
    cancelled: Arc<AtomicBool>,
}

impl PeriodicTimer {
    /// Start a timer that runs `tick` every `period`, with the first tick
    /// one full period from now.
    pub fn start(period: Duration, mut tick: impl FnMut() + Send + 'static) -> Self {
        let (control, receiver) = channel::<Control>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_for_thread = cancelled.clone();

        thread::spawn(move || loop {
            match receiver.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    if cancelled_for_thread.load(Ordering::Acquire) {
                        break;
                    }
                    tick();
                }
                Ok(Control::Cancel) | Err(RecvTimeoutError::Disconnected) => {
                    break;
                }
            }
        });

        Self { control, cancelled }
    }

    /// Stop the timer. Does not join the timer thread, so it is safe to
    /// call from within a tick.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        let _ = self.control.send(Control::Cancel);
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
