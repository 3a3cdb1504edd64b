//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Reusable wire objects embedded in event payloads.

use serde::Serialize;

/// One network endpoint considered for the media path.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IceCandidate {
    pub id: String,
    /// "local-candidate" or "remote-candidate"
    #[serde(rename = "type")]
    pub kind: String,
    pub ip: String,
    pub port: u16,
    #[serde(rename = "candidateType")]
    pub candidate_type: String,
    pub transport: String,
}

/// A local/remote endpoint combination considered for the media path.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IceCandidatePair {
    pub id: String,
    #[serde(rename = "localCandidateId")]
    pub local_candidate_id: String,
    #[serde(rename = "remoteCandidateId")]
    pub remote_candidate_id: String,
    /// "frozen", "waiting", "in-progress", "failed" or "succeeded"
    pub state: String,
    pub priority: u64,
    pub nominated: bool,
}

/// Identity of one media stream within a connection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Ssrc {
    pub ssrc: String,
    pub cname: String,
    /// "inbound" or "outbound"
    #[serde(rename = "streamType")]
    pub stream_type: String,
    /// [`Ssrc::REPORT_LOCAL`] or [`Ssrc::REPORT_REMOTE`]
    #[serde(rename = "reportType")]
    pub report_type: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    #[serde(rename = "userID")]
    pub user_id: String,
    pub msid: String,
    pub mslabel: String,
    pub label: String,
    #[serde(rename = "localStartTime")]
    pub local_start_time: f64,
}

impl Ssrc {
    pub const REPORT_LOCAL: &'static str = "local";
    pub const REPORT_REMOTE: &'static str = "remote";
}

/// Conference feedback given by the local participant.
#[derive(Clone, Debug, Serialize)]
pub struct Feedback {
    /// Rating from 1 to 5.
    #[serde(rename = "overallRating")]
    pub overall_rating: u8,
    /// Non-empty means the feedback is about the connection to this peer
    /// specifically, otherwise it is general conference feedback.
    #[serde(rename = "remoteID", skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(rename = "videoQualityRating", skip_serializing_if = "Option::is_none")]
    pub video_quality_rating: Option<u8>,
    #[serde(rename = "audioQualityRating", skip_serializing_if = "Option::is_none")]
    pub audio_quality_rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// A media input or output device of the local endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct MediaDevice {
    /// "audioinput", "audiooutput" or "videoinput"
    pub kind: String,
    /// Devices share a group id only when they belong to the same physical
    /// device.
    #[serde(rename = "groupID")]
    pub group_id: String,
    #[serde(rename = "mediaDeviceID", skip_serializing_if = "Option::is_none")]
    pub media_device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Wifi reception of the local endpoint, attached to stats submissions
/// when the host provides it.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct WifiStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
}

impl WifiStats {
    pub fn is_empty(&self) -> bool {
        self.rssi.is_none() && self.signal.is_none()
    }
}
