//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Payloads for authentication, session membership, and the session-level
//! submissions (stats, system status, logs, feedback, devices).

use serde::Serialize;
use serde_json::Value;

use crate::event::info::{Feedback, MediaDevice, WifiStats};

/// The authentication request. Unlike every other event this is sent
/// form-urlencoded, not as JSON, and carries no envelope.
#[derive(Clone, Debug)]
pub struct TokenRequest {
    /// The externally issued authorization code (a JWT).
    pub code: String,
    /// "{localID}@{appID}"
    pub client_id: String,
}

impl TokenRequest {
    pub const GRANT_TYPE: &'static str = "authorization_code";

    pub fn form_body(&self) -> String {
        format!(
            "grant_type={}&client_id={}&code={}",
            Self::GRANT_TYPE,
            self.client_id,
            self.code
        )
    }
}

/// Adds the local participant to the conference, creating the session if
/// this is the first participant. The response carries the server-issued
/// session id.
#[derive(Clone, Debug, Serialize)]
pub struct UserJoin {
    #[serde(rename = "confID")]
    pub conf_id: String,
    #[serde(rename = "clientVersion", skip_serializing_if = "Option::is_none")]
    pub client_version: Option<String>,
}

/// The local participant's display details.
#[derive(Clone, Debug, Serialize)]
pub struct UserDetails {
    #[serde(rename = "userName")]
    pub user_name: String,
}

/// An application log line.
#[derive(Clone, Debug, Serialize)]
pub struct LogEntry {
    /// "debug", "info", "warn", "error" or "fatal"
    pub level: String,
    pub message: String,
    /// "text" or "json"
    #[serde(rename = "messageType")]
    pub message_type: String,
}

/// Conference feedback from the local participant.
#[derive(Clone, Debug, Serialize)]
pub struct FeedbackSubmission {
    pub feedback: Feedback,
}

/// The connected or active media devices of the local endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceList {
    /// [`DeviceList::EVENT_CONNECTED`] or [`DeviceList::EVENT_ACTIVE`]
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "mediaDeviceList")]
    pub media_device_list: Vec<MediaDevice>,
}

impl DeviceList {
    pub const EVENT_CONNECTED: &'static str = "connectedDeviceList";
    pub const EVENT_ACTIVE: &'static str = "activeDeviceList";
}

/// One periodic submission of a connection's annotated stats snapshot.
#[derive(Clone, Debug, Serialize)]
pub struct ConferenceStats {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    /// The full snapshot, one object per record, with the derived
    /// `csio*` fields added to the rtp records.
    pub stats: Vec<Value>,
    #[serde(rename = "wifiStats", skip_serializing_if = "Option::is_none")]
    pub wifi_stats: Option<WifiStats>,
}

/// Periodic system status of the local endpoint.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SystemStatus {
    /// CPU level in percent.
    #[serde(rename = "cpuLevel", skip_serializing_if = "Option::is_none")]
    pub cpu_level: Option<u32>,
    /// Battery level in percent.
    #[serde(rename = "batteryLevel", skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u32>,
    /// Memory usage in MB.
    #[serde(rename = "memoryUsage", skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<u64>,
    /// Total memory in MB.
    #[serde(rename = "memoryAvailable", skip_serializing_if = "Option::is_none")]
    pub memory_available: Option<u64>,
    #[serde(rename = "threadCount", skip_serializing_if = "Option::is_none")]
    pub thread_count: Option<u32>,
}

impl SystemStatus {
    /// Whether this sample has anything worth submitting.
    pub fn is_valid(&self) -> bool {
        self.cpu_level.is_some()
            || self.battery_level.is_some()
            || self.memory_usage.is_some()
            || self.memory_available.is_some()
            || self.thread_count.is_some()
    }
}
