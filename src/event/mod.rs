//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The analytics event model: one envelope type over a tagged union of
//! event kinds. Each kind carries its payload and resolves to a capability
//! requirement, a host family, and a path; the delivery queue uses those to
//! gate and to build the wire request.
//!
//! Constructing an event never performs I/O. Building the wire request for
//! an event whose required capability is absent is a contract violation and
//! fails fast rather than producing a half-authorized request.

pub mod fabric;
pub mod ice;
pub mod info;
pub mod media;
pub mod sender;
pub mod session;

use std::collections::HashMap;

use serde_json::Value;

use crate::common::Result;
use crate::error::CallMetricsError;
use crate::event::fabric::{
    ErrorReport, FabricAction, FabricDropped, FabricSetup, FabricStateChange, FabricTerminated,
    FabricTransportChange,
};
use crate::event::ice::{
    IceAborted, IceConnectionDisruptEnd, IceConnectionDisruptStart, IceDisruptEnd, IceDisruptStart,
    IceFailed, IceRestart, IceTerminated,
};
use crate::event::media::{MediaAction, MediaPlayback, SdpSnapshot, SsrcMap};
use crate::event::session::{
    ConferenceStats, DeviceList, FeedbackSubmission, LogEntry, SystemStatus, TokenRequest,
    UserDetails, UserJoin,
};
use crate::http;

const AUTH_BASE_URL: &str = "https://auth.callmetrics.io";
const EVENTS_BASE_URL: &str = "https://events.callmetrics.io";
const STATS_BASE_URL: &str = "https://stats.callmetrics.io";

/// The capability an event must have attached before it may be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gating {
    /// Sendable immediately; the authentication request itself.
    None,
    /// Requires an auth token and app id.
    Authenticated,
    /// Requires an auth token; carries a client-chosen conference id and
    /// yields the server-issued session id on success.
    CreatesSession,
    /// Requires an established session id on top of authentication.
    Session,
    /// A session event that is never worth queueing: dropping a late
    /// keep-alive is harmless.
    KeepAlive,
}

/// Which collection host an event is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HostFamily {
    Auth,
    Events,
    Stats,
}

impl HostFamily {
    fn base_url(self) -> &'static str {
        match self {
            HostFamily::Auth => AUTH_BASE_URL,
            HostFamily::Events => EVENTS_BASE_URL,
            HostFamily::Stats => STATS_BASE_URL,
        }
    }
}

/// Every analytics event the library can emit.
#[derive(Clone, Debug)]
pub enum EventKind {
    TokenRequest(TokenRequest),
    UserJoin(UserJoin),
    UserAlive,
    UserLeft,
    UserDetails(UserDetails),
    FabricSetup(FabricSetup),
    FabricStateChange(FabricStateChange),
    FabricTransportChange(Box<FabricTransportChange>),
    FabricDropped(FabricDropped),
    FabricTerminated(FabricTerminated),
    FabricAction(FabricAction),
    ErrorReport(ErrorReport),
    IceDisruptStart(IceDisruptStart),
    IceDisruptEnd(IceDisruptEnd),
    IceRestart(IceRestart),
    IceFailed(IceFailed),
    IceAborted(IceAborted),
    IceTerminated(IceTerminated),
    IceConnectionDisruptStart(IceConnectionDisruptStart),
    IceConnectionDisruptEnd(IceConnectionDisruptEnd),
    SsrcMap(SsrcMap),
    SdpSnapshot(SdpSnapshot),
    MediaAction(MediaAction),
    MediaPlayback(MediaPlayback),
    ConferenceStats(ConferenceStats),
    SystemStatus(SystemStatus),
    Log(LogEntry),
    Feedback(FeedbackSubmission),
    DominantSpeaker,
    DeviceList(DeviceList),
}

impl EventKind {
    pub fn gating(&self) -> Gating {
        match self {
            EventKind::TokenRequest(_) => Gating::None,
            // Error reports need authentication only, not a live session.
            EventKind::ErrorReport(_) | EventKind::SystemStatus(_) => Gating::Authenticated,
            EventKind::UserJoin(_) => Gating::CreatesSession,
            EventKind::UserAlive => Gating::KeepAlive,
            _ => Gating::Session,
        }
    }

    fn family(&self) -> HostFamily {
        match self {
            EventKind::TokenRequest(_) => HostFamily::Auth,
            EventKind::ConferenceStats(_) | EventKind::SystemStatus(_) => HostFamily::Stats,
            _ => HostFamily::Events,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            EventKind::TokenRequest(_) => "authenticate",
            // The session-creating join posts to the conference itself.
            EventKind::UserJoin(_) => "",
            EventKind::UserAlive => "user/alive",
            EventKind::UserLeft => "user/left",
            EventKind::UserDetails(_) => "events/userdetails",
            EventKind::FabricSetup(_)
            | EventKind::FabricStateChange(_)
            | EventKind::FabricTransportChange(_)
            | EventKind::FabricAction(_) => "fabric",
            EventKind::FabricDropped(_) => "fabric/status",
            EventKind::FabricTerminated(_) => "fabric/terminated",
            EventKind::ErrorReport(_) => "fabric/setupfailed",
            EventKind::IceDisruptStart(_)
            | EventKind::IceDisruptEnd(_)
            | EventKind::IceRestart(_)
            | EventKind::IceFailed(_)
            | EventKind::IceAborted(_)
            | EventKind::IceTerminated(_)
            | EventKind::IceConnectionDisruptStart(_)
            | EventKind::IceConnectionDisruptEnd(_) => "events/ice/status",
            EventKind::SsrcMap(_) => "events/ssrcmap",
            EventKind::SdpSnapshot(_) => "events/sdp",
            EventKind::MediaAction(_) => "events/media/actions",
            EventKind::MediaPlayback(_) => "events/media",
            EventKind::ConferenceStats(_) => "stats",
            EventKind::SystemStatus(_) => "stats/system",
            EventKind::Log(_) => "events/app/logs",
            EventKind::Feedback(_) => "events/feedback",
            EventKind::DominantSpeaker => "events/dominantspeaker",
            EventKind::DeviceList(_) => "events/devices",
        }
    }

    /// A stable name for logging and error reporting.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::TokenRequest(_) => "TokenRequest",
            EventKind::UserJoin(_) => "UserJoin",
            EventKind::UserAlive => "UserAlive",
            EventKind::UserLeft => "UserLeft",
            EventKind::UserDetails(_) => "UserDetails",
            EventKind::FabricSetup(_) => "FabricSetup",
            EventKind::FabricStateChange(_) => "FabricStateChange",
            EventKind::FabricTransportChange(_) => "FabricTransportChange",
            EventKind::FabricDropped(_) => "FabricDropped",
            EventKind::FabricTerminated(_) => "FabricTerminated",
            EventKind::FabricAction(_) => "FabricAction",
            EventKind::ErrorReport(_) => "ErrorReport",
            EventKind::IceDisruptStart(_) => "IceDisruptStart",
            EventKind::IceDisruptEnd(_) => "IceDisruptEnd",
            EventKind::IceRestart(_) => "IceRestart",
            EventKind::IceFailed(_) => "IceFailed",
            EventKind::IceAborted(_) => "IceAborted",
            EventKind::IceTerminated(_) => "IceTerminated",
            EventKind::IceConnectionDisruptStart(_) => "IceConnectionDisruptStart",
            EventKind::IceConnectionDisruptEnd(_) => "IceConnectionDisruptEnd",
            EventKind::SsrcMap(_) => "SsrcMap",
            EventKind::SdpSnapshot(_) => "SdpSnapshot",
            EventKind::MediaAction(_) => "MediaAction",
            EventKind::MediaPlayback(_) => "MediaPlayback",
            EventKind::ConferenceStats(_) => "ConferenceStats",
            EventKind::SystemStatus(_) => "SystemStatus",
            EventKind::Log(_) => "Log",
            EventKind::Feedback(_) => "Feedback",
            EventKind::DominantSpeaker => "DominantSpeaker",
            EventKind::DeviceList(_) => "DeviceList",
        }
    }

    /// The client-chosen conference id a session-creating event carries.
    pub fn conf_id(&self) -> Option<&str> {
        match self {
            EventKind::UserJoin(join) => Some(&join.conf_id),
            _ => None,
        }
    }

    fn payload_value(&self) -> Result<Value> {
        let value = match self {
            // The token request is form-urlencoded, not JSON.
            EventKind::TokenRequest(_) => Value::Object(Default::default()),
            EventKind::UserAlive | EventKind::UserLeft | EventKind::DominantSpeaker => {
                Value::Object(Default::default())
            }
            EventKind::UserJoin(p) => serde_json::to_value(p)?,
            EventKind::UserDetails(p) => serde_json::to_value(p)?,
            EventKind::FabricSetup(p) => serde_json::to_value(p)?,
            EventKind::FabricStateChange(p) => serde_json::to_value(p)?,
            EventKind::FabricTransportChange(p) => serde_json::to_value(p)?,
            EventKind::FabricDropped(p) => serde_json::to_value(p)?,
            EventKind::FabricTerminated(p) => serde_json::to_value(p)?,
            EventKind::FabricAction(p) => serde_json::to_value(p)?,
            EventKind::ErrorReport(p) => serde_json::to_value(p)?,
            EventKind::IceDisruptStart(p) => serde_json::to_value(p)?,
            EventKind::IceDisruptEnd(p) => serde_json::to_value(p)?,
            EventKind::IceRestart(p) => serde_json::to_value(p)?,
            EventKind::IceFailed(p) => serde_json::to_value(p)?,
            EventKind::IceAborted(p) => serde_json::to_value(p)?,
            EventKind::IceTerminated(p) => serde_json::to_value(p)?,
            EventKind::IceConnectionDisruptStart(p) => serde_json::to_value(p)?,
            EventKind::IceConnectionDisruptEnd(p) => serde_json::to_value(p)?,
            EventKind::SsrcMap(p) => serde_json::to_value(p)?,
            EventKind::SdpSnapshot(p) => serde_json::to_value(p)?,
            EventKind::MediaAction(p) => serde_json::to_value(p)?,
            EventKind::MediaPlayback(p) => serde_json::to_value(p)?,
            EventKind::ConferenceStats(p) => serde_json::to_value(p)?,
            EventKind::SystemStatus(p) => serde_json::to_value(p)?,
            EventKind::Log(p) => serde_json::to_value(p)?,
            EventKind::Feedback(p) => serde_json::to_value(p)?,
            EventKind::DeviceList(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }
}

/// The credentials and identifiers currently held by the delivery queue,
/// borrowed while building one wire request.
#[derive(Clone, Copy, Debug)]
pub struct WireContext<'a> {
    pub app_id: &'a str,
    pub token: Option<&'a str>,
    pub conf_id: Option<&'a str>,
    pub uc_id: Option<&'a str>,
}

/// An analytics event: payload plus the envelope fields stamped by the
/// delivery queue on first submission.
#[derive(Clone, Debug)]
pub struct Event {
    pub(crate) local_id: String,
    pub(crate) device_id: String,
    pub(crate) origin_id: Option<String>,
    /// Wall-clock creation time in epoch milliseconds. Zero until stamped;
    /// a non-zero value set by the caller is never overwritten.
    pub(crate) timestamp: u64,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            local_id: String::new(),
            device_id: String::new(),
            origin_id: None,
            timestamp: 0,
            kind,
        }
    }

    /// An event whose creation time was recorded by the caller before
    /// submission.
    pub fn with_timestamp(kind: EventKind, timestamp: u64) -> Self {
        let mut event = Self::new(kind);
        event.timestamp = timestamp;
        event
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn gating(&self) -> Gating {
        self.kind.gating()
    }

    /// Serialize the payload body: all non-transient payload fields plus
    /// the envelope. Credentials are never part of the body.
    fn body_json(&self) -> Result<Value> {
        let mut map = match self.kind.payload_value()? {
            Value::Object(map) => map,
            _ => return Err(CallMetricsError::PayloadNotSerializable(self.kind.label()).into()),
        };
        map.insert("localID".to_string(), Value::from(self.local_id.clone()));
        map.insert("deviceID".to_string(), Value::from(self.device_id.clone()));
        map.insert("timestamp".to_string(), Value::from(self.timestamp));
        if let Some(origin_id) = &self.origin_id {
            map.insert("originID".to_string(), Value::from(origin_id.clone()));
        }
        Ok(Value::Object(map))
    }

    /// Build the wire request for this event. The required capability must
    /// be held in `wire`; a missing one is a caller contract violation and
    /// fails fast.
    pub fn to_request(&self, wire: &WireContext<'_>) -> Result<http::Request> {
        let base_url = self.kind.family().base_url();
        let label = self.kind.label();

        if let EventKind::TokenRequest(token_request) = &self.kind {
            let mut headers = HashMap::new();
            headers.insert(
                "Content-Type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            );
            return Ok(http::Request {
                method: http::Method::Post,
                url: format!("{}/{}", base_url, self.kind.path()),
                headers,
                body: Some(token_request.form_body().into_bytes()),
            });
        }

        let token = wire
            .token
            .ok_or(CallMetricsError::AuthTokenNotHeld(label))?;

        let url = match self.kind.gating() {
            Gating::Authenticated => {
                format!("{}/v1/apps/{}/{}", base_url, wire.app_id, self.kind.path())
            }
            Gating::CreatesSession => {
                let conf_id = self
                    .kind
                    .conf_id()
                    .ok_or(CallMetricsError::SessionNotHeld(label))?;
                format!("{}/v1/apps/{}/conferences/{}", base_url, wire.app_id, conf_id)
            }
            Gating::Session | Gating::KeepAlive => {
                let conf_id = wire
                    .conf_id
                    .ok_or(CallMetricsError::SessionNotHeld(label))?;
                let uc_id = wire.uc_id.ok_or(CallMetricsError::SessionNotHeld(label))?;
                format!(
                    "{}/v1/apps/{}/conferences/{}/{}/{}",
                    base_url,
                    wire.app_id,
                    conf_id,
                    uc_id,
                    self.kind.path()
                )
            }
            Gating::None => unreachable!("handled above"),
        };

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Authorization".to_string(), format!("Bearer {}", token));

        Ok(http::Request {
            method: http::Method::Post,
            url,
            headers,
            body: Some(serde_json::to_vec(&self.body_json()?)?),
        })
    }
}
