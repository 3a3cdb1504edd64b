//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Payloads for media actions, playback health, and stream identity.

use serde::Serialize;

use crate::event::info::Ssrc;

/// A participant muted/unmuted audio, paused/resumed video, or
/// started/stopped screen sharing.
#[derive(Clone, Debug, Serialize)]
pub struct MediaAction {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    /// One of the `EVENT_*` constants below.
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "mediaDeviceID")]
    pub media_device_id: String,
    // The collection API takes a list of affected remotes; for a
    // peer-to-peer connection that is exactly the one remote.
    #[serde(rename = "remoteIDList")]
    pub remote_id_list: Vec<String>,
}

impl MediaAction {
    pub const EVENT_MUTE: &'static str = "audioMute";
    pub const EVENT_UNMUTE: &'static str = "audioUnmute";
    pub const EVENT_VIDEO_PAUSE: &'static str = "videoPause";
    pub const EVENT_VIDEO_RESUME: &'static str = "videoResume";
    pub const EVENT_SCREENSHARE_START: &'static str = "screenShareStart";
    pub const EVENT_SCREENSHARE_STOP: &'static str = "screenShareStop";

    pub fn new(remote_id: &str, connection_id: &str, event_type: &str, media_device_id: &str) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: event_type.to_string(),
            media_device_id: media_device_id.to_string(),
            remote_id_list: vec![remote_id.to_string()],
        }
    }
}

/// Media playback started, suspended, stalled, or is one-way.
#[derive(Clone, Debug, Serialize)]
pub struct MediaPlayback {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    /// One of the `EVENT_*` constants below.
    #[serde(rename = "eventType")]
    pub event_type: String,
    /// "audio", "video" or "screen"
    #[serde(rename = "mediaType")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<String>,
}

impl MediaPlayback {
    pub const EVENT_PLAYBACK_START: &'static str = "mediaPlaybackStart";
    pub const EVENT_PLAYBACK_SUSPENDED: &'static str = "mediaPlaybackSuspended";
    pub const EVENT_PLAYBACK_STALLED: &'static str = "mediaPlaybackStalled";
    pub const EVENT_ONE_WAY_MEDIA: &'static str = "oneWayMedia";
}

/// The stream-identity map of a connection: sent when the connection first
/// comes up and whenever a new media stream appears.
#[derive(Clone, Debug, Serialize)]
pub struct SsrcMap {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "ssrcData")]
    pub ssrc_data: Vec<Ssrc>,
}

/// A verbatim snapshot of the negotiated session descriptions.
#[derive(Clone, Debug, Serialize)]
pub struct SdpSnapshot {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "localSDP", skip_serializing_if = "Option::is_none")]
    pub local_sdp: Option<String>,
    #[serde(rename = "remoteSDP", skip_serializing_if = "Option::is_none")]
    pub remote_sdp: Option<String>,
}
