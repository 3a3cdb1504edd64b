//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The gated delivery queue. Events flow through [`EventSender::send`],
//! which stamps the envelope, checks the capability the event needs, and
//! either hands a wire request to the transport or parks the event on the
//! wait list for that capability. A successful auth or session-create
//! response stores the granted capability and replays the corresponding
//! wait list in arrival order.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Deserialize;

use crate::common::mutex::StateMutex;
use crate::common::time::now_millis;
use crate::event::{Event, EventKind, Gating, WireContext};
use crate::http;

/// Observes the outcome of every transmission attempt. Failures are not
/// retried; callers needing resilience must re-submit at a higher layer.
pub type SendObserver = Box<dyn Fn(&Event, bool) + Send + Sync>;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    #[serde(rename = "ucID")]
    uc_id: String,
}

#[derive(Default)]
struct GateState {
    token: Option<String>,
    conf_id: Option<String>,
    uc_id: Option<String>,
    // Events waiting for a capability, in arrival order per class.
    auth_wait: VecDeque<Event>,
    session_wait: VecDeque<Event>,
}

struct Inner {
    client: Arc<dyn http::Client + Send + Sync>,
    app_id: String,
    local_id: String,
    device_id: String,
    origin_id: Option<String>,
    state: StateMutex<GateState>,
    observer: StateMutex<Option<Arc<SendObserver>>>,
}

/// The delivery queue, shared by the session facade and every per-peer
/// event manager. Cloning is cheap and all clones share gating state.
#[derive(Clone)]
pub struct EventSender {
    inner: Arc<Inner>,
}

impl EventSender {
    pub fn new(
        client: Arc<dyn http::Client + Send + Sync>,
        app_id: &str,
        local_id: &str,
        device_id: &str,
        origin_id: Option<&str>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                app_id: app_id.to_string(),
                local_id: local_id.to_string(),
                device_id: device_id.to_string(),
                origin_id: origin_id.map(str::to_string),
                state: StateMutex::new(GateState::default(), "EventSender::state"),
                observer: StateMutex::new(None, "EventSender::observer"),
            }),
        }
    }

    pub fn set_observer(&self, observer: SendObserver) {
        if let Ok(mut slot) = self.inner.observer.lock() {
            *slot = Some(Arc::new(observer));
        }
    }

    /// Submit one event. Never blocks on the network: the transport send
    /// happens through the client's callback machinery, and any queue drain
    /// triggered by a response happens when that response arrives.
    pub fn send(&self, mut event: Event) {
        event.local_id = self.inner.local_id.clone();
        event.device_id = self.inner.device_id.clone();
        event.origin_id = self.inner.origin_id.clone();
        // Set the creation time only if the caller did not.
        if event.timestamp == 0 {
            event.timestamp = now_millis();
        }

        let request = {
            let mut state = match self.inner.state.lock() {
                Ok(state) => state,
                Err(e) => {
                    error!("EventSender::send(): {}", e);
                    return;
                }
            };

            match event.gating() {
                Gating::KeepAlive if state.uc_id.is_none() => {
                    // No need to save a keep-alive for later.
                    debug!("EventSender::send(): dropping keep-alive before session");
                    return;
                }
                Gating::Session | Gating::KeepAlive if state.uc_id.is_none() => {
                    debug!(
                        "EventSender::send(): waiting for session: {}",
                        event.kind.label()
                    );
                    state.session_wait.push_back(event);
                    return;
                }
                Gating::Authenticated | Gating::CreatesSession if state.token.is_none() => {
                    debug!(
                        "EventSender::send(): waiting for auth: {}",
                        event.kind.label()
                    );
                    state.auth_wait.push_back(event);
                    return;
                }
                _ => {}
            }

            event.to_request(&WireContext {
                app_id: &self.inner.app_id,
                token: state.token.as_deref(),
                conf_id: state.conf_id.as_deref(),
                uc_id: state.uc_id.as_deref(),
            })
        };

        let request = match request {
            Ok(request) => request,
            Err(e) => {
                // Gating was checked above, so this only fires on a
                // payload that cannot be serialized.
                error!(
                    "EventSender::send(): could not build request for {}: {}",
                    event.kind.label(),
                    e
                );
                return;
            }
        };

        info!("EventSender::send(): {}", event.kind.label());
        let sender = self.clone();
        self.inner.client.send_request(
            request,
            Box::new(move |response| sender.handle_response(event, response)),
        );
    }

    fn handle_response(&self, event: Event, response: Option<http::Response>) {
        let success = response
            .as_ref()
            .map(|r| r.status.is_success())
            .unwrap_or(false);

        let drained = if success {
            // The body is only needed for the responses that grant a
            // capability.
            self.store_granted_capability(&event, response.as_ref())
        } else {
            warn!(
                "EventSender::handle_response(): send failed for {}: {}",
                event.kind.label(),
                response
                    .map(|r| r.status.code.to_string())
                    .unwrap_or_else(|| "no response".to_string())
            );
            Vec::new()
        };

        // Clone the observer handle out of the lock: an observer is allowed
        // to submit follow-up events from its callback.
        let observer = self
            .inner
            .observer
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        if let Some(observer) = observer {
            observer(&event, success);
        }

        // Replay outside the state lock, through the same gating checks,
        // in original arrival order.
        for waiting in drained {
            self.send(waiting);
        }
    }

    fn store_granted_capability(
        &self,
        event: &Event,
        response: Option<&http::Response>,
    ) -> Vec<Event> {
        let mut state = match self.inner.state.lock() {
            Ok(state) => state,
            Err(e) => {
                error!("EventSender::store_granted_capability(): {}", e);
                return Vec::new();
            }
        };

        match &event.kind {
            EventKind::TokenRequest(_) => {
                let body = response.map(|r| r.body.as_slice()).unwrap_or_default();
                match serde_json::from_slice::<TokenResponse>(body) {
                    Ok(parsed) => {
                        info!("EventSender: authenticated, draining auth wait list");
                        state.token = Some(parsed.access_token);
                        state.auth_wait.drain(..).collect()
                    }
                    Err(e) => {
                        error!("EventSender: bad auth response body: {}", e);
                        Vec::new()
                    }
                }
            }
            kind if kind.gating() == Gating::CreatesSession => {
                let body = response.map(|r| r.body.as_slice()).unwrap_or_default();
                match serde_json::from_slice::<CreateSessionResponse>(body) {
                    Ok(parsed) => {
                        info!("EventSender: session created, draining session wait list");
                        state.uc_id = Some(parsed.uc_id);
                        state.conf_id = kind.conf_id().map(str::to_string);
                        state.session_wait.drain(..).collect()
                    }
                    Err(e) => {
                        error!("EventSender: bad session response body: {}", e);
                        Vec::new()
                    }
                }
            }
            _ => Vec::new(),
        }
    }

    #[cfg(test)]
    fn wait_list_lengths(&self) -> (usize, usize) {
        let state = self.inner.state.lock().unwrap();
        (state.auth_wait.len(), state.session_wait.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::fabric::FabricTerminated;
    use crate::event::session::{TokenRequest, UserJoin};
    use std::sync::Mutex;

    /// A transport that records requests and answers each one with a
    /// scripted response (or failure) immediately.
    struct ScriptedClient {
        requests: Mutex<Vec<http::Request>>,
        respond: Box<dyn Fn(&http::Request) -> Option<http::Response> + Send + Sync>,
    }

    impl ScriptedClient {
        fn ok_with(body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                respond: Box::new(move |_| {
                    Some(http::Response {
                        status: 200.into(),
                        body: body.as_bytes().to_vec(),
                    })
                }),
            })
        }

        fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.clone())
                .collect()
        }
    }

    impl http::Client for ScriptedClient {
        fn send_request(&self, request: http::Request, callback: http::ResponseCallback) {
            let response = (self.respond)(&request);
            self.requests.lock().unwrap().push(request);
            callback(response);
        }
    }

    fn auth_event() -> Event {
        Event::new(EventKind::TokenRequest(TokenRequest {
            code: "jwt".to_string(),
            client_id: "local1@app1".to_string(),
        }))
    }

    fn join_event() -> Event {
        Event::new(EventKind::UserJoin(UserJoin {
            conf_id: "conf1".to_string(),
            client_version: None,
        }))
    }

    fn session_event() -> Event {
        Event::new(EventKind::FabricTerminated(FabricTerminated {
            remote_id: "remote1".to_string(),
            connection_id: "con1".to_string(),
        }))
    }

    fn sender_with(client: Arc<ScriptedClient>) -> EventSender {
        EventSender::new(client, "app1", "local1", "device1", None)
    }

    #[test]
    fn stamps_envelope_once() {
        let client = Arc::new(ScriptedClient {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(|_| None),
        });
        let sender = sender_with(client.clone());

        let stamped = Arc::new(Mutex::new(Vec::new()));
        let stamped_for_observer = stamped.clone();
        sender.set_observer(Box::new(move |event, _| {
            stamped_for_observer.lock().unwrap().push((
                event.local_id().to_string(),
                event.device_id().to_string(),
                event.timestamp(),
            ));
        }));

        sender.send(auth_event());
        let stamped = stamped.lock().unwrap();
        assert_eq!("local1", stamped[0].0);
        assert_eq!("device1", stamped[0].1);
        assert_ne!(0, stamped[0].2);
    }

    #[test]
    fn does_not_overwrite_caller_timestamp() {
        let client = ScriptedClient::ok_with("{\"access_token\": \"1234\"}");
        let sender = sender_with(client.clone());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_observer = seen.clone();
        sender.set_observer(Box::new(move |event, _| {
            seen_for_observer.lock().unwrap().push(event.timestamp());
        }));

        sender.send(Event::with_timestamp(
            EventKind::TokenRequest(TokenRequest {
                code: "jwt".to_string(),
                client_id: "local1@app1".to_string(),
            }),
            300,
        ));
        assert_eq!(300, seen.lock().unwrap()[0]);
    }

    #[test]
    fn queues_events_before_needed_capability() {
        let client = ScriptedClient::ok_with("{}");
        let sender = sender_with(client.clone());

        sender.send(join_event());
        sender.send(session_event());

        assert_eq!((1, 1), sender.wait_list_lengths());
        assert!(client.urls().is_empty());
    }

    #[test]
    fn drains_in_submission_order() {
        let client = Arc::new(ScriptedClient {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(|request| {
                let body = if request.url.ends_with("/authenticate") {
                    "{\"access_token\": \"1234\"}"
                } else if request.url.ends_with("/conferences/conf1") {
                    "{\"ucID\": \"5678\"}"
                } else {
                    "{}"
                };
                Some(http::Response {
                    status: 200.into(),
                    body: body.as_bytes().to_vec(),
                })
            }),
        });
        let sender = sender_with(client.clone());

        // Submit in reverse dependency order.
        sender.send(session_event());
        sender.send(join_event());
        sender.send(auth_event());

        let urls = client.urls();
        assert_eq!(3, urls.len());
        assert!(urls[0].ends_with("/authenticate"));
        assert!(urls[1].ends_with("/conferences/conf1"));
        assert!(urls[2].ends_with("/conferences/conf1/5678/fabric/terminated"));
        assert_eq!((0, 0), sender.wait_list_lengths());
    }

    #[test]
    fn sent_session_event_carries_granted_token() {
        let client = Arc::new(ScriptedClient {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(|request| {
                let body = if request.url.ends_with("/authenticate") {
                    "{\"access_token\": \"granted-token\"}"
                } else if request.url.ends_with("/conferences/conf1") {
                    "{\"ucID\": \"5678\"}"
                } else {
                    "{}"
                };
                Some(http::Response {
                    status: 200.into(),
                    body: body.as_bytes().to_vec(),
                })
            }),
        });
        let sender = sender_with(client.clone());

        sender.send(session_event());
        sender.send(auth_event());
        sender.send(join_event());

        let requests = client.requests.lock().unwrap();
        let session_request = requests
            .iter()
            .find(|r| r.url.ends_with("/fabric/terminated"))
            .expect("session event sent");
        assert_eq!(
            "Bearer granted-token",
            session_request.headers["Authorization"]
        );
    }

    #[test]
    fn keep_alive_is_never_queued() {
        let client = ScriptedClient::ok_with("{}");
        let sender = sender_with(client.clone());

        sender.send(Event::new(EventKind::UserAlive));
        assert_eq!((0, 0), sender.wait_list_lengths());
        assert!(client.urls().is_empty());
    }

    #[test]
    fn transport_failure_reports_and_does_not_advance_gating() {
        let client = Arc::new(ScriptedClient {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(|_| None),
        });
        let sender = sender_with(client.clone());

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_for_observer = results.clone();
        sender.set_observer(Box::new(move |event, success| {
            results_for_observer
                .lock()
                .unwrap()
                .push((event.kind.label(), success));
        }));

        sender.send(auth_event());
        assert_eq!(vec![("TokenRequest", false)], *results.lock().unwrap());

        // The failed auth granted nothing: authenticated events still wait.
        sender.send(join_event());
        assert_eq!((1, 0), sender.wait_list_lengths());
    }

    #[test]
    fn non_2xx_is_a_failure() {
        let client = Arc::new(ScriptedClient {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(|_| {
                Some(http::Response {
                    status: 500.into(),
                    body: Vec::new(),
                })
            }),
        });
        let sender = sender_with(client.clone());

        let results = Arc::new(Mutex::new(Vec::new()));
        let results_for_observer = results.clone();
        sender.set_observer(Box::new(move |_, success| {
            results_for_observer.lock().unwrap().push(success);
        }));

        sender.send(auth_event());
        assert_eq!(vec![false], *results.lock().unwrap());
    }
}
