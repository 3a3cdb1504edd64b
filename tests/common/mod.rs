//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Test fixtures: a manually-driven HTTP delegate, an auto-responding
//! client, and a scripted peer connection.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use callmetrics::http::{self, Delegate, DelegatingClient};
use callmetrics::webrtc::stats::{StatsEntry, StatsReport};
use callmetrics::webrtc::{PeerConnection, StatsCallback};

/// Records every outgoing request; the test answers through
/// `DelegatingClient::received_response`.
pub struct RecordingDelegate {
    pub requests: Arc<Mutex<Vec<(u32, http::Request)>>>,
}

impl Delegate for RecordingDelegate {
    fn send_request(&self, request_id: u32, request: http::Request) {
        self.requests.lock().unwrap().push((request_id, request));
    }
}

pub fn manual_client() -> (DelegatingClient, Arc<Mutex<Vec<(u32, http::Request)>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let client = DelegatingClient::new(RecordingDelegate {
        requests: requests.clone(),
    });
    (client, requests)
}

/// Answers every request immediately: the auth endpoint with a token, a
/// conference create with a session id, everything else with `{}`.
pub struct AutoClient {
    pub requests: Mutex<Vec<http::Request>>,
}

impl AutoClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

impl http::Client for AutoClient {
    fn send_request(&self, request: http::Request, callback: http::ResponseCallback) {
        // A session-creating join posts to ".../conferences/{confID}" with
        // nothing after the conference id.
        let is_create = request
            .url
            .split_once("/conferences/")
            .map(|(_, rest)| !rest.contains('/'))
            .unwrap_or(false);
        let body = if request.url.ends_with("/authenticate") {
            "{\"access_token\": \"test-token\"}"
        } else if is_create {
            "{\"ucID\": \"ucA\"}"
        } else {
            "{}"
        };
        self.requests.lock().unwrap().push(request);
        callback(Some(http::Response {
            status: 200.into(),
            body: body.as_bytes().to_vec(),
        }));
    }
}

/// A peer connection whose snapshot the test scripts.
pub struct FakePeerConnection {
    pub report: Mutex<StatsReport>,
    pub local_sdp: String,
    pub remote_sdp: String,
}

impl FakePeerConnection {
    pub fn with_path() -> Arc<Self> {
        Arc::new(Self {
            report: Mutex::new(path_report()),
            local_sdp: "v=0 local".to_string(),
            remote_sdp: "v=0 remote".to_string(),
        })
    }
}

impl PeerConnection for FakePeerConnection {
    fn get_stats(&self, callback: StatsCallback) {
        callback(self.report.lock().unwrap().clone());
    }

    fn local_description(&self) -> Option<String> {
        Some(self.local_sdp.clone())
    }

    fn remote_description(&self) -> Option<String> {
        Some(self.remote_sdp.clone())
    }
}

fn object(value: Value) -> serde_json::Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

/// A snapshot with one fully resolvable selected candidate pair.
pub fn path_report() -> StatsReport {
    StatsReport::from_entries([
        StatsEntry::new(
            "T1",
            "transport",
            0.0,
            object(json!({ "selectedCandidatePairId": "P1" })),
        ),
        StatsEntry::new(
            "P1",
            "candidate-pair",
            0.0,
            object(json!({
                "localCandidateId": "L1",
                "remoteCandidateId": "R1",
                "state": "succeeded",
                "nominated": true,
            })),
        ),
        StatsEntry::new(
            "L1",
            "local-candidate",
            0.0,
            object(json!({ "ip": "10.0.0.2", "port": 50000, "candidateType": "host", "protocol": "udp" })),
        ),
        StatsEntry::new(
            "R1",
            "remote-candidate",
            0.0,
            object(json!({ "ip": "192.0.2.7", "port": 3478, "candidateType": "relay", "protocol": "udp" })),
        ),
    ])
}

pub fn body_of(request: &http::Request) -> Value {
    serde_json::from_slice(request.body.as_deref().unwrap_or(b"{}")).unwrap_or(Value::Null)
}
