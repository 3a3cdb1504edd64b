//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Common types used throughout the library.

use std::fmt;
use std::time::Duration;

use crate::event::info::MediaDevice;
use crate::webrtc::{IceConnectionState, IceGatheringState, SignalingState};

pub mod mutex;
pub mod time;
pub mod timer;

/// Common Result type, using `anyhow::Error` for Error.
pub type Result<T> = std::result::Result<T, anyhow::Error>;

/// Periods for the recurring submissions a session performs.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// How often the session announces itself as still present.
    pub keep_alive_period: Duration,
    /// How often each connection polls and submits media stats.
    pub stats_submission_period: Duration,
    /// How often the session samples and submits system status.
    pub system_stats_submission_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keep_alive_period: Duration::from_secs(10),
            stats_submission_period: Duration::from_secs(30),
            system_stats_submission_period: Duration::from_secs(30),
        }
    }
}

/// A notification scoped to one remote peer's connection, reported by the
/// host application from its transport observer (or produced internally by
/// the stats-polling timer).
#[derive(Clone, Debug, PartialEq)]
pub enum PeerEvent {
    IceConnectionChange(IceConnectionState),
    IceGatheringChange(IceGatheringState),
    SignalingChange(SignalingState),
    /// A new media stream was attached to the connection.
    StreamAdded,
    /// Internal: a stats-polling tick fired for this connection.
    StatsPoll,
    Hold,
    Resume,
    Audio {
        muted: bool,
        device_id: String,
    },
    Video {
        enabled: bool,
        device_id: String,
    },
    ScreenShare {
        enabled: bool,
        device_id: String,
    },
    Playback {
        kind: PlaybackKind,
        media: MediaKind,
    },
}

/// A session-level notification that is not tied to one remote peer.
#[derive(Clone, Debug)]
pub enum AppEvent {
    DominantSpeaker,
    DevicesConnected(Vec<MediaDevice>),
    DevicesActive(Vec<MediaDevice>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackKind {
    Start,
    Suspended,
    Stalled,
    OneWay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Screen,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Screen => "screen",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error classifications the host application can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The failure occurred because of missing media permissions.
    MediaPermission,
    /// The failure occurred while generating an offer or answer.
    SdpGeneration,
    /// The failure occurred while applying a local or remote description.
    Negotiation,
    /// Signaling related errors in the application.
    Signaling,
}

impl ErrorKind {
    pub fn as_reason(self) -> &'static str {
        match self {
            ErrorKind::MediaPermission => "MediaPermissionError",
            ErrorKind::SdpGeneration => "SDPGenerationError",
            ErrorKind::Negotiation => "NegotiationFailure",
            ErrorKind::Signaling => "SignalingError",
        }
    }
}

/// Severity of an application log submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Content type of an application log submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogContent {
    Text,
    Json,
}
