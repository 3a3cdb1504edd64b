//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The per-peer event manager. Every notification for one remote peer is
//! paired with a stats snapshot pulled at that moment, fanned through the
//! interceptor pipeline, and the produced events handed to the shared
//! delivery queue. The manager also owns the stats-polling timer, which
//! runs only between fabric setup and fabric termination.

use std::sync::Arc;

use crate::common::mutex::StateMutex;
use crate::common::time::now_millis;
use crate::common::{Config, PeerEvent};
use crate::event::sender::EventSender;
use crate::event::EventKind;
use crate::interceptor::fabric::FabricInterceptor;
use crate::interceptor::ice::IceInterceptor;
use crate::interceptor::media::MediaInterceptor;
use crate::interceptor::sdp::SdpInterceptor;
use crate::interceptor::ssrc::SsrcInterceptor;
use crate::interceptor::stats::StatsInterceptor;
use crate::interceptor::{Interceptor, PipelineContext};
use crate::status::WifiStatusProvider;
use crate::webrtc::stats::{derive_connection_id, StatsReport};
use crate::webrtc::{IceConnectionState, PeerConnection};

struct ManagerState {
    sender: EventSender,
    local_id: String,
    remote_id: String,
    connection: Arc<dyn PeerConnection>,
    config: Config,
    interceptors: Vec<Box<dyn Interceptor>>,
    /// Derived from the selected candidate pair; empty until the
    /// connection first connects. While empty, nothing is emitted.
    connection_id: String,
    stats_timer: Option<crate::common::timer::PeriodicTimer>,
}

/// One per remote peer. Clones share state; processing within one manager
/// is serialized by its lock, managers for different peers are independent.
#[derive(Clone)]
pub struct EventManager {
    state: Arc<StateMutex<ManagerState>>,
}

impl EventManager {
    pub fn new(
        sender: EventSender,
        local_id: &str,
        remote_id: &str,
        connection: Arc<dyn PeerConnection>,
        config: Config,
        wifi_status: Arc<dyn WifiStatusProvider>,
    ) -> Self {
        let created_at = now_millis();
        let interceptors: Vec<Box<dyn Interceptor>> = vec![
            Box::new(FabricInterceptor::new(created_at)),
            Box::new(StatsInterceptor::new(wifi_status)),
            Box::new(IceInterceptor::new(created_at)),
            Box::new(SsrcInterceptor::new()),
            Box::new(SdpInterceptor::new()),
            Box::new(MediaInterceptor::new()),
        ];
        Self {
            state: Arc::new(StateMutex::new(
                ManagerState {
                    sender,
                    local_id: local_id.to_string(),
                    remote_id: remote_id.to_string(),
                    connection,
                    config,
                    interceptors,
                    connection_id: String::new(),
                    stats_timer: None,
                },
                "EventManager::state",
            )),
        }
    }

    /// Submit one notification. The pipeline runs with the snapshot
    /// delivered to the stats callback for this call; ordering between the
    /// event and the snapshot it reads is guaranteed per tick.
    pub fn process(&self, event: PeerEvent) {
        let connection = match self.state.lock() {
            Ok(state) => state.connection.clone(),
            Err(e) => {
                error!("EventManager::process(): {}", e);
                return;
            }
        };
        let manager = self.clone();
        connection.get_stats(Box::new(move |report| {
            manager.process_with_snapshot(event, report)
        }));
    }

    pub fn connection_id(&self) -> String {
        self.state
            .lock()
            .map(|state| state.connection_id.clone())
            .unwrap_or_default()
    }

    fn process_with_snapshot(&self, event: PeerEvent, report: StatsReport) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(e) => {
                error!("EventManager::process_with_snapshot(): {}", e);
                return;
            }
        };

        // Every time the connection (re)connects, the selected pair may
        // have changed, and with it the connection id.
        if matches!(
            event,
            PeerEvent::IceConnectionChange(IceConnectionState::Connected)
        ) {
            state.connection_id = derive_connection_id(&report).unwrap_or_default();
        }
        if state.connection_id.is_empty() {
            debug!(
                "EventManager::process_with_snapshot(): no connection id yet, suppressing {:?}",
                event
            );
            return;
        }

        let local_sdp = state.connection.local_description();
        let remote_sdp = state.connection.remote_description();
        let now = now_millis();

        let mut setup_seen = false;
        let mut terminated_seen = false;
        {
            let state = &mut *state;
            let ctx = PipelineContext {
                local_id: &state.local_id,
                remote_id: &state.remote_id,
                connection_id: &state.connection_id,
                now_ms: now,
                local_sdp: local_sdp.as_deref(),
                remote_sdp: remote_sdp.as_deref(),
            };
            for interceptor in state.interceptors.iter_mut() {
                for produced in interceptor.process(&ctx, &event, &report) {
                    match produced.kind {
                        EventKind::FabricSetup(_) => setup_seen = true,
                        EventKind::FabricTerminated(_) => terminated_seen = true,
                        _ => {}
                    }
                    state.sender.send(produced);
                }
            }
        }

        if setup_seen {
            info!(
                "EventManager: fabric set up for {}, starting stats polling",
                state.remote_id
            );
            // The timer thread must not keep the manager alive: dropping
            // the last handle cancels polling via ManagerState's drop.
            let weak = Arc::downgrade(&self.state);
            let timer = crate::common::timer::PeriodicTimer::start(
                state.config.stats_submission_period,
                move || {
                    if let Some(state) = weak.upgrade() {
                        EventManager { state }.process(PeerEvent::StatsPoll);
                    }
                },
            );
            if let Some(previous) = state.stats_timer.replace(timer) {
                previous.cancel();
            }
        }
        if terminated_seen {
            info!(
                "EventManager: fabric terminated for {}, stopping stats polling",
                state.remote_id
            );
            if let Some(timer) = state.stats_timer.take() {
                timer.cancel();
            }
        }
    }
}
