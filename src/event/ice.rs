//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Payloads for the network-path sub-lifecycle events. Each payload pins
//! the wire `eventType` and, where the transition fixes it, the current or
//! previous ice connection state.

use serde::Serialize;

use crate::event::info::{IceCandidate, IceCandidatePair};

/// The path of a connected pair went to disconnected.
#[derive(Clone, Debug, Serialize)]
pub struct IceDisruptStart {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "currIceCandidatePair")]
    pub curr_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    /// "connected" or "completed"
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
}

impl IceDisruptStart {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        curr_ice_candidate_pair: IceCandidatePair,
        prev_ice_connection_state: String,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceDisruptionStart".to_string(),
            curr_ice_candidate_pair,
            curr_ice_connection_state: "disconnected".to_string(),
            prev_ice_connection_state,
        }
    }
}

/// The path recovered from disconnected.
#[derive(Clone, Debug, Serialize)]
pub struct IceDisruptEnd {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "currIceCandidatePair")]
    pub curr_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "prevIceCandidatePair")]
    pub prev_ice_candidate_pair: IceCandidatePair,
    /// "connected", "completed" or "checking"
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    /// Time spent disconnected.
    pub delay: u64,
}

impl IceDisruptEnd {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        curr_ice_candidate_pair: IceCandidatePair,
        prev_ice_candidate_pair: IceCandidatePair,
        curr_ice_connection_state: String,
        delay: u64,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceDisruptionEnd".to_string(),
            curr_ice_candidate_pair,
            prev_ice_candidate_pair,
            curr_ice_connection_state,
            prev_ice_connection_state: "disconnected".to_string(),
            delay,
        }
    }
}

/// The path negotiation restarted.
#[derive(Clone, Debug, Serialize)]
pub struct IceRestart {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "prevIceCandidatePair")]
    pub prev_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
}

impl IceRestart {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        prev_ice_candidate_pair: IceCandidatePair,
        prev_ice_connection_state: String,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceRestarted".to_string(),
            prev_ice_candidate_pair,
            curr_ice_connection_state: "new".to_string(),
            prev_ice_connection_state,
        }
    }
}

/// The path negotiation failed out of checking or disconnected.
#[derive(Clone, Debug, Serialize)]
pub struct IceFailed {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "localIceCandidates")]
    pub local_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "remoteIceCandidates")]
    pub remote_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "iceCandidatePairs")]
    pub ice_candidate_pairs: Vec<IceCandidatePair>,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    /// "checking" or "disconnected"
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    /// Time spent in the previous state before the failure.
    pub delay: u64,
}

impl IceFailed {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        prev_ice_connection_state: String,
        delay: u64,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceFailed".to_string(),
            local_ice_candidates: Vec::new(),
            remote_ice_candidates: Vec::new(),
            ice_candidate_pairs: Vec::new(),
            curr_ice_connection_state: "failed".to_string(),
            prev_ice_connection_state,
            delay,
        }
    }
}

/// The path negotiation was abandoned before it ever connected.
#[derive(Clone, Debug, Serialize)]
pub struct IceAborted {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "localIceCandidates")]
    pub local_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "remoteIceCandidates")]
    pub remote_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "iceCandidatePairs")]
    pub ice_candidate_pairs: Vec<IceCandidatePair>,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    /// "checking" or "new"
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    pub delay: u64,
}

impl IceAborted {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        prev_ice_connection_state: String,
        delay: u64,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceFailed".to_string(),
            local_ice_candidates: Vec::new(),
            remote_ice_candidates: Vec::new(),
            ice_candidate_pairs: Vec::new(),
            curr_ice_connection_state: "closed".to_string(),
            prev_ice_connection_state,
            delay,
        }
    }
}

/// The path of a previously live connection closed.
#[derive(Clone, Debug, Serialize)]
pub struct IceTerminated {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "prevIceCandidatePair")]
    pub prev_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    /// "connected", "completed", "failed" or "disconnected"
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
}

impl IceTerminated {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        prev_ice_candidate_pair: IceCandidatePair,
        prev_ice_connection_state: String,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceTerminated".to_string(),
            prev_ice_candidate_pair,
            curr_ice_connection_state: "closed".to_string(),
            prev_ice_connection_state,
        }
    }
}

/// The path negotiation was interrupted while still checking.
#[derive(Clone, Debug, Serialize)]
pub struct IceConnectionDisruptStart {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
}

impl IceConnectionDisruptStart {
    pub fn new(remote_id: &str, connection_id: &str) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceConnectionDisruptionStart".to_string(),
            curr_ice_connection_state: "disconnected".to_string(),
            prev_ice_connection_state: "checking".to_string(),
        }
    }
}

/// The interrupted negotiation resumed checking.
#[derive(Clone, Debug, Serialize)]
pub struct IceConnectionDisruptEnd {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    /// Time spent disconnected.
    pub delay: u64,
}

impl IceConnectionDisruptEnd {
    pub fn new(remote_id: &str, connection_id: &str, delay: u64) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            event_type: "iceConnectionDisruptionEnd".to_string(),
            curr_ice_connection_state: "checking".to_string(),
            prev_ice_connection_state: "disconnected".to_string(),
            delay,
        }
    }
}
