//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! End-to-end scenarios over the session facade with fake transports:
//! capability gating across the auth and session boundaries, and the
//! connection lifecycle from setup to termination.

use std::sync::Arc;
use std::time::Duration;

use callmetrics::common::{Config, ErrorKind, LogContent, LogLevel, PeerEvent};
use callmetrics::core::metrics_manager::MetricsManager;
use callmetrics::http;
use callmetrics::status::{NoWifiStatus, SystemStatusProvider};
use callmetrics::webrtc::IceConnectionState;

mod common;
use common::{body_of, manual_client, AutoClient, FakePeerConnection};

struct NoSystemStatus;

impl SystemStatusProvider for NoSystemStatus {
    fn cpu_level(&self) -> Option<u32> {
        None
    }
    fn battery_level(&self) -> Option<u32> {
        None
    }
    fn memory_usage(&self) -> Option<u64> {
        None
    }
    fn memory_available(&self) -> Option<u64> {
        None
    }
    fn thread_count(&self) -> Option<u32> {
        None
    }
}

fn manager_with_client(client: Arc<dyn http::Client + Send + Sync>, config: Config) -> MetricsManager {
    MetricsManager::new(
        client,
        Arc::new(NoSystemStatus),
        Arc::new(NoWifiStatus),
        config,
        "app1",
        "local1",
        "device1",
        None,
        "jwt-credential",
        Some("1.0-test"),
    )
}

#[test]
fn events_queue_until_capabilities_are_granted() {
    let (client, requests) = manual_client();
    let mut manager = manager_with_client(Arc::new(client.clone()), Config::default());

    // The auth request is out; nothing has been answered yet.
    assert_eq!(1, requests.lock().unwrap().len());

    manager.start_session("conf1");
    manager.report_error(ErrorKind::Signaling, Some("ice failed"), None);
    manager.log("negotiation done", LogLevel::Info, LogContent::Text);

    // Everything after the auth request is waiting on a capability.
    assert_eq!(1, requests.lock().unwrap().len());

    // Grant the token: the join and the error report drain, in submission
    // order, each carrying the granted token.
    let auth_id = requests.lock().unwrap()[0].0;
    client.received_response(
        auth_id,
        Some(http::Response {
            status: 200.into(),
            body: b"{\"access_token\": \"granted\"}".to_vec(),
        }),
    );

    {
        let requests = requests.lock().unwrap();
        assert_eq!(3, requests.len());
        assert!(requests[1].1.url.ends_with("/conferences/conf1"));
        assert!(requests[2].1.url.ends_with("/fabric/setupfailed"));
        assert_eq!("Bearer granted", requests[1].1.headers["Authorization"]);
        assert_eq!("Bearer granted", requests[2].1.headers["Authorization"]);
    }

    // Grant the session: the log line drains.
    let join_id = requests.lock().unwrap()[1].0;
    client.received_response(
        join_id,
        Some(http::Response {
            status: 200.into(),
            body: b"{\"ucID\": \"uc1\"}".to_vec(),
        }),
    );

    let requests = requests.lock().unwrap();
    assert_eq!(4, requests.len());
    assert!(requests[3]
        .1
        .url
        .ends_with("/conferences/conf1/uc1/events/app/logs"));
    let body = body_of(&requests[3].1);
    assert_eq!("negotiation done", body["message"]);
    assert_eq!("info", body["level"]);
    assert_eq!("local1", body["localID"]);
}

#[test]
fn transport_failure_is_reported_and_never_retried() {
    let (client, requests) = manual_client();
    let manager = manager_with_client(Arc::new(client.clone()), Config::default());

    let results = Arc::new(std::sync::Mutex::new(Vec::new()));
    let results_for_observer = results.clone();
    manager.set_send_observer(Box::new(move |event, success| {
        results_for_observer
            .lock()
            .unwrap()
            .push((event.kind.label(), success));
    }));

    let auth_id = requests.lock().unwrap()[0].0;
    client.received_response(auth_id, None);

    assert_eq!(vec![("TokenRequest", false)], *results.lock().unwrap());
    // No retry went out.
    assert_eq!(1, requests.lock().unwrap().len());
}

#[test]
fn fabric_lifecycle_scenario() {
    let client = AutoClient::new();
    let mut manager = manager_with_client(client.clone(), Config::default());
    manager.start_session("conf1");

    let connection = FakePeerConnection::with_path();
    manager.add_connection("remote1", connection);

    // CONNECTED: setup (exactly once, no state-change first time) and the
    // one-shot sdp snapshot.
    manager.report_peer_event(
        "remote1",
        PeerEvent::IceConnectionChange(IceConnectionState::Connected),
    );
    {
        let requests = client.requests.lock().unwrap();
        let fabric: Vec<_> = requests
            .iter()
            .filter(|r| r.url.ends_with("/fabric"))
            .collect();
        assert_eq!(1, fabric.len());
        let setup = body_of(fabric[0]);
        assert_eq!("P1", setup["selectedCandidatePairID"]);
        assert_eq!("sendrecv", setup["fabricTransmissionDirection"]);
        assert_eq!("peer", setup["remoteEndpointType"]);
        assert!(setup.get("eventType").is_none());
        assert_eq!(
            1,
            requests
                .iter()
                .filter(|r| r.url.ends_with("/events/sdp"))
                .count()
        );
    }

    // DISCONNECTED: a state change plus the ice disruption start.
    manager.report_peer_event(
        "remote1",
        PeerEvent::IceConnectionChange(IceConnectionState::Disconnected),
    );

    // FAILED: a state change plus the fabric dropped event.
    manager.report_peer_event(
        "remote1",
        PeerEvent::IceConnectionChange(IceConnectionState::Failed),
    );
    {
        let requests = client.requests.lock().unwrap();
        let dropped: Vec<_> = requests
            .iter()
            .filter(|r| r.url.ends_with("/fabric/status"))
            .collect();
        assert_eq!(1, dropped.len());
        let body = body_of(dropped[0]);
        assert_eq!("disconnected", body["prevIceConnectionState"]);
        assert_eq!("failed", body["currIceConnectionState"]);
        assert_eq!("P1", body["currIceCandidatePair"]["id"]);
    }

    // CLOSED: a state change plus fabric terminated and ice terminated.
    manager.report_peer_event(
        "remote1",
        PeerEvent::IceConnectionChange(IceConnectionState::Closed),
    );
    {
        let requests = client.requests.lock().unwrap();
        assert_eq!(
            1,
            requests
                .iter()
                .filter(|r| r.url.ends_with("/fabric/terminated"))
                .count()
        );
        let ice_bodies: Vec<_> = requests
            .iter()
            .filter(|r| r.url.ends_with("/events/ice/status"))
            .map(body_of)
            .collect();
        assert!(ice_bodies
            .iter()
            .any(|b| b["eventType"] == "iceDisruptionStart"));
        assert!(ice_bodies.iter().any(|b| b["eventType"] == "iceFailed"));
        assert!(ice_bodies.iter().any(|b| b["eventType"] == "iceTerminated"));

        let changes: Vec<_> = requests
            .iter()
            .filter(|r| r.url.ends_with("/fabric"))
            .map(body_of)
            .filter(|b| b.get("changedState").is_some())
            .collect();
        // One per lifecycle transition after setup.
        assert_eq!(3, changes.len());
        assert!(changes
            .iter()
            .all(|b| b["changedState"] == "iceConnectionState"));
    }
}

#[test]
fn peer_events_for_unknown_remotes_are_ignored() {
    let client = AutoClient::new();
    let manager = manager_with_client(client.clone(), Config::default());
    let before = client.urls().len();
    manager.report_peer_event(
        "nobody",
        PeerEvent::IceConnectionChange(IceConnectionState::Connected),
    );
    assert_eq!(before, client.urls().len());
}

#[test]
fn keep_alive_runs_while_the_session_is_active() {
    let client = AutoClient::new();
    let mut config = Config::default();
    config.keep_alive_period = Duration::from_millis(20);
    config.system_stats_submission_period = Duration::from_secs(3600);
    let mut manager = manager_with_client(client.clone(), config);

    manager.start_session("conf1");
    std::thread::sleep(Duration::from_millis(120));

    let alive = |urls: &[String]| {
        urls.iter()
            .filter(|u| u.ends_with("/user/alive"))
            .count()
    };
    let while_active = alive(&client.urls());
    assert!(
        while_active >= 2,
        "expected at least 2 keep-alives, got {}",
        while_active
    );

    manager.stop_session();
    std::thread::sleep(Duration::from_millis(60));
    let after_stop = alive(&client.urls());
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(after_stop, alive(&client.urls()));

    // Leaving the conference was announced.
    assert!(client.urls().iter().any(|u| u.ends_with("/user/left")));
}

#[test]
fn session_submissions_after_establishment() {
    let client = AutoClient::new();
    let mut manager = manager_with_client(client.clone(), Config::default());
    manager.start_session("conf1");

    manager.report_feedback(4, Some("clear audio"), Some(5), None, Some("remote1"));
    manager.report_user_details("Moxie");

    let urls = client.urls();
    assert!(urls.iter().any(|u| u.ends_with("/events/feedback")));
    assert!(urls.iter().any(|u| u.ends_with("/events/userdetails")));

    let requests = client.requests.lock().unwrap();
    let feedback = requests
        .iter()
        .find(|r| r.url.ends_with("/events/feedback"))
        .unwrap();
    let body = body_of(feedback);
    assert_eq!(4, body["feedback"]["overallRating"]);
    assert_eq!("clear audio", body["feedback"]["comments"]);
    assert!(body["feedback"].get("videoQualityRating").is_none());
}
