//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The media-transport boundary: the connection state sets reported by the
//! transport's observer, and the handle through which a stats snapshot and
//! the negotiated session descriptions are read.

pub mod sdp;
pub mod stats;

use crate::webrtc::stats::StatsReport;

/// Rust version of the WebRTC RTCIceConnectionState enum.
///
/// See [RTCIceConnectionState](https://w3c.github.io/webrtc-pc/#dom-rtciceconnectionstate)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

/// Rust version of the WebRTC RTCIceGatheringState enum.
///
/// See [RTCIceGatheringState](https://www.w3.org/TR/webrtc/#rtcicegatheringstate-enum)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

/// Rust version of the WebRTC RTCSignalingState enum.
///
/// See [RTCSignalingState](https://www.w3.org/TR/webrtc/#rtcsignalingstate-enum)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveLocalPrAnswer,
    HaveRemoteOffer,
    HaveRemotePrAnswer,
    Closed,
}

pub type StatsCallback = Box<dyn FnOnce(StatsReport) + Send>;

/// The handle to one peer connection in the underlying media-transport
/// stack. Stats retrieval is asynchronous; the snapshot is delivered to the
/// callback on whatever thread the transport uses for stats collection.
pub trait PeerConnection: Send + Sync {
    fn get_stats(&self, callback: StatsCallback);
    fn local_description(&self) -> Option<String>;
    fn remote_description(&self) -> Option<String>;
}
