//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Payloads for the overall connection lifecycle events.

use serde::Serialize;

use crate::event::info::{IceCandidate, IceCandidatePair};

/// Sent once per connection, when the selected candidate pair first
/// connects. After this the fabric is set up and media can flow.
#[derive(Clone, Debug, Serialize)]
pub struct FabricSetup {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    /// Time from connection registration until the chosen pair connected.
    pub delay: u64,
    #[serde(rename = "iceGatheringDelay", skip_serializing_if = "Option::is_none")]
    pub ice_gathering_delay: Option<u64>,
    #[serde(rename = "iceConnectivityDelay")]
    pub ice_connectivity_delay: u64,
    /// "sendonly", "receiveonly" or "sendrecv"
    #[serde(rename = "fabricTransmissionDirection")]
    pub fabric_transmission_direction: String,
    /// "peer" or "server"
    #[serde(rename = "remoteEndpointType")]
    pub remote_endpoint_type: String,
    #[serde(rename = "localIceCandidates")]
    pub local_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "remoteIceCandidates")]
    pub remote_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "iceCandidatePairs")]
    pub ice_candidate_pairs: Vec<IceCandidatePair>,
    #[serde(rename = "selectedCandidatePairID", skip_serializing_if = "Option::is_none")]
    pub selected_candidate_pair_id: Option<String>,
}

impl FabricSetup {
    pub fn new(remote_id: &str, connection_id: &str, delay: u64) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            delay,
            ice_gathering_delay: None,
            ice_connectivity_delay: delay,
            fabric_transmission_direction: "sendrecv".to_string(),
            remote_endpoint_type: "peer".to_string(),
            local_ice_candidates: Vec::new(),
            remote_ice_candidates: Vec::new(),
            ice_candidate_pairs: Vec::new(),
            selected_candidate_pair_id: None,
        }
    }
}

/// Sent whenever the ice connection, ice gathering or signaling state of a
/// set-up connection changes.
#[derive(Clone, Debug, Serialize)]
pub struct FabricStateChange {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "prevState")]
    pub prev_state: String,
    #[serde(rename = "newState")]
    pub new_state: String,
    /// "iceConnectionState", "iceGatheringState" or "signalingState"
    #[serde(rename = "changedState")]
    pub changed_state: String,
}

/// Sent when a set-up connection reconnects over a different candidate
/// pair.
#[derive(Clone, Debug, Serialize)]
pub struct FabricTransportChange {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "currIceCandidatePair")]
    pub curr_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "prevIceCandidatePair")]
    pub prev_ice_candidate_pair: IceCandidatePair,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    /// Time since the previous transition into connected.
    pub delay: u64,
    #[serde(rename = "localIceCandidates")]
    pub local_ice_candidates: Vec<IceCandidate>,
    #[serde(rename = "remoteIceCandidates")]
    pub remote_ice_candidates: Vec<IceCandidate>,
    /// "turn/udp", "turn/tcp" or "turn/tls"
    #[serde(rename = "relayType", skip_serializing_if = "Option::is_none")]
    pub relay_type: Option<String>,
}

/// Sent when a set-up connection drops: the ice connection goes to failed
/// out of completed or disconnected.
#[derive(Clone, Debug, Serialize)]
pub struct FabricDropped {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    #[serde(rename = "currIceCandidatePair")]
    pub curr_ice_candidate_pair: IceCandidatePair,
    /// "completed" or "disconnected"
    #[serde(rename = "prevIceConnectionState")]
    pub prev_ice_connection_state: String,
    #[serde(rename = "currIceConnectionState")]
    pub curr_ice_connection_state: String,
    /// Time spent in the previous state before the drop.
    pub delay: u64,
}

impl FabricDropped {
    pub fn new(
        remote_id: &str,
        connection_id: &str,
        curr_ice_candidate_pair: IceCandidatePair,
        prev_ice_connection_state: String,
        delay: u64,
    ) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            connection_id: connection_id.to_string(),
            curr_ice_candidate_pair,
            prev_ice_connection_state,
            curr_ice_connection_state: "failed".to_string(),
            delay,
        }
    }
}

/// Sent when the connection has ended and no more data can be sent.
#[derive(Clone, Debug, Serialize)]
pub struct FabricTerminated {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
}

/// A hold or resume of the whole connection, initiated by the application.
#[derive(Clone, Debug, Serialize)]
pub struct FabricAction {
    #[serde(rename = "remoteID")]
    pub remote_id: String,
    #[serde(rename = "connectionID")]
    pub connection_id: String,
    /// [`FabricAction::EVENT_HOLD`] or [`FabricAction::EVENT_RESUME`]
    #[serde(rename = "eventType")]
    pub event_type: String,
}

impl FabricAction {
    pub const EVENT_HOLD: &'static str = "fabricHold";
    pub const EVENT_RESUME: &'static str = "fabricResume";
}

/// An application-reported failure: media permissions, SDP generation,
/// negotiation or signaling.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorReport {
    /// "MediaPermissionError", "SDPGenerationError", "NegotiationFailure"
    /// or "SignalingError"
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "fabricTransmissionDirection")]
    pub fabric_transmission_direction: String,
    #[serde(rename = "remoteEndpointType")]
    pub remote_endpoint_type: String,
}

impl ErrorReport {
    pub fn new(reason: &str, message: Option<String>, stack: Option<String>) -> Self {
        Self {
            reason: reason.to_string(),
            name: None,
            message,
            stack,
            fabric_transmission_direction: "sendrecv".to_string(),
            remote_endpoint_type: "peer".to_string(),
        }
    }
}
