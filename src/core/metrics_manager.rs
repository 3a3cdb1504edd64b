//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The process-wide entry point. Owns the delivery queue, the keep-alive
//! and system-status timers, and one event manager per remote peer. All
//! collaborators -- the HTTP client and the status providers -- are passed
//! in at construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{AppEvent, Config, ErrorKind, LogContent, LogLevel, PeerEvent};
use crate::common::timer::PeriodicTimer;
use crate::core::event_manager::EventManager;
use crate::event::fabric::ErrorReport;
use crate::event::info::Feedback;
use crate::event::sender::{EventSender, SendObserver};
use crate::event::session::{
    DeviceList, FeedbackSubmission, LogEntry, SystemStatus, TokenRequest, UserDetails, UserJoin,
};
use crate::event::{Event, EventKind};
use crate::http;
use crate::status::{SystemStatusProvider, WifiStatusProvider};
use crate::webrtc::PeerConnection;

pub struct MetricsManager {
    config: Config,
    sender: EventSender,
    local_id: String,
    client_version: Option<String>,
    system_status: Arc<dyn SystemStatusProvider>,
    wifi_status: Arc<dyn WifiStatusProvider>,
    event_managers: HashMap<String, EventManager>,
    alive_timer: Option<PeriodicTimer>,
    system_stats_timer: Option<PeriodicTimer>,
}

impl MetricsManager {
    /// Create the session entry point and immediately submit the
    /// authentication request. Everything submitted before the token
    /// response arrives waits on the delivery queue.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: Arc<dyn http::Client + Send + Sync>,
        system_status: Arc<dyn SystemStatusProvider>,
        wifi_status: Arc<dyn WifiStatusProvider>,
        config: Config,
        app_id: &str,
        local_id: &str,
        device_id: &str,
        origin_id: Option<&str>,
        jwt: &str,
        client_version: Option<&str>,
    ) -> Self {
        info!("MetricsManager::new(): local_id: {}", local_id);
        let sender = EventSender::new(client, app_id, local_id, device_id, origin_id);
        sender.send(Event::new(EventKind::TokenRequest(TokenRequest {
            code: jwt.to_string(),
            client_id: format!("{}@{}", local_id, app_id),
        })));

        Self {
            config,
            sender,
            local_id: local_id.to_string(),
            client_version: client_version.map(str::to_string),
            system_status,
            wifi_status,
            event_managers: HashMap::new(),
            alive_timer: None,
            system_stats_timer: None,
        }
    }

    /// Observe the outcome of every send attempt.
    pub fn set_send_observer(&self, observer: SendObserver) {
        self.sender.set_observer(observer);
    }

    /// Join the conference, creating the session, and start the keep-alive
    /// and system-status schedules.
    pub fn start_session(&mut self, conf_id: &str) {
        info!("MetricsManager::start_session(): conf_id: {}", conf_id);
        self.sender.send(Event::new(EventKind::UserJoin(UserJoin {
            conf_id: conf_id.to_string(),
            client_version: self.client_version.clone(),
        })));
        self.start_keep_alive();
        self.start_system_stats();
    }

    /// Leave the conference and stop the session-wide schedules. In-flight
    /// transport calls are not aborted.
    pub fn stop_session(&mut self) {
        info!("MetricsManager::stop_session()");
        self.stop_system_stats();
        self.stop_keep_alive();
        self.sender.send(Event::new(EventKind::UserLeft));
    }

    /// Register the connection to one remote peer. Call before reporting
    /// events for that peer. Repeated registration is ignored.
    pub fn add_connection(&mut self, remote_id: &str, connection: Arc<dyn PeerConnection>) {
        if self.event_managers.contains_key(remote_id) {
            debug!(
                "MetricsManager::add_connection(): already registered: {}",
                remote_id
            );
            return;
        }
        info!("MetricsManager::add_connection(): remote_id: {}", remote_id);
        self.event_managers.insert(
            remote_id.to_string(),
            EventManager::new(
                self.sender.clone(),
                &self.local_id,
                remote_id,
                connection,
                self.config,
                self.wifi_status.clone(),
            ),
        );
    }

    /// Discard the connection to one remote peer, cancelling its stats
    /// polling and its interceptor state.
    pub fn remove_connection(&mut self, remote_id: &str) {
        if self.event_managers.remove(remote_id).is_some() {
            info!(
                "MetricsManager::remove_connection(): remote_id: {}",
                remote_id
            );
        }
    }

    /// Report a transport or application notification for one peer.
    pub fn report_peer_event(&self, remote_id: &str, event: PeerEvent) {
        match self.event_managers.get(remote_id) {
            Some(manager) => manager.process(event),
            None => warn!(
                "MetricsManager::report_peer_event(): unknown remote: {}",
                remote_id
            ),
        }
    }

    /// Report a session-level notification not tied to one peer.
    pub fn report_app_event(&self, event: AppEvent) {
        let kind = match event {
            AppEvent::DominantSpeaker => EventKind::DominantSpeaker,
            AppEvent::DevicesConnected(devices) => EventKind::DeviceList(DeviceList {
                event_type: DeviceList::EVENT_CONNECTED.to_string(),
                media_device_list: devices,
            }),
            AppEvent::DevicesActive(devices) => EventKind::DeviceList(DeviceList {
                event_type: DeviceList::EVENT_ACTIVE.to_string(),
                media_device_list: devices,
            }),
        };
        self.sender.send(Event::new(kind));
    }

    /// Report an application failure. Requires authentication but not a
    /// live session, so setup failures are reported even when no session
    /// could be established.
    pub fn report_error(&self, kind: ErrorKind, message: Option<&str>, stack: Option<&str>) {
        self.sender
            .send(Event::new(EventKind::ErrorReport(ErrorReport::new(
                kind.as_reason(),
                message.map(str::to_string),
                stack.map(str::to_string),
            ))));
    }

    /// Submit an application log line.
    pub fn log(&self, message: &str, level: LogLevel, content: LogContent) {
        self.sender.send(Event::new(EventKind::Log(LogEntry {
            level: level.to_string(),
            message: message.to_string(),
            message_type: content.to_string(),
        })));
    }

    /// Submit conference feedback from the local participant.
    pub fn report_feedback(
        &self,
        rating: u8,
        comment: Option<&str>,
        audio_quality: Option<u8>,
        video_quality: Option<u8>,
        remote_id: Option<&str>,
    ) {
        self.sender
            .send(Event::new(EventKind::Feedback(FeedbackSubmission {
                feedback: Feedback {
                    overall_rating: rating,
                    remote_id: remote_id.map(str::to_string),
                    video_quality_rating: video_quality,
                    audio_quality_rating: audio_quality,
                    comments: comment.map(str::to_string),
                },
            })));
    }

    /// Submit the local participant's display details.
    pub fn report_user_details(&self, user_name: &str) {
        self.sender
            .send(Event::new(EventKind::UserDetails(UserDetails {
                user_name: user_name.to_string(),
            })));
    }

    fn start_keep_alive(&mut self) {
        self.stop_keep_alive();
        let sender = self.sender.clone();
        self.alive_timer = Some(PeriodicTimer::start(
            self.config.keep_alive_period,
            move || sender.send(Event::new(EventKind::UserAlive)),
        ));
    }

    fn stop_keep_alive(&mut self) {
        if let Some(timer) = self.alive_timer.take() {
            timer.cancel();
        }
    }

    fn start_system_stats(&mut self) {
        self.stop_system_stats();
        let sender = self.sender.clone();
        let provider = self.system_status.clone();
        self.system_stats_timer = Some(PeriodicTimer::start(
            self.config.system_stats_submission_period,
            move || {
                let status = SystemStatus {
                    cpu_level: provider.cpu_level(),
                    battery_level: provider.battery_level(),
                    memory_usage: provider.memory_usage(),
                    memory_available: provider.memory_available(),
                    thread_count: provider.thread_count(),
                };
                if status.is_valid() {
                    sender.send(Event::new(EventKind::SystemStatus(status)));
                }
            },
        ));
    }

    fn stop_system_stats(&mut self) {
        if let Some(timer) = self.system_stats_timer.take() {
            timer.cancel();
        }
    }
}
