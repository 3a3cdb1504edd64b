//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Make calls to the App to do HTTP requests
//! and define common types like Method, Response, Client, etc.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get = 0,
    Post,
}

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: ResponseStatus,
    pub body: Vec<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResponseStatus {
    pub code: u16,
}

impl From<u16> for ResponseStatus {
    fn from(code: u16) -> Self {
        Self { code }
    }
}

impl ResponseStatus {
    pub fn is_success(self) -> bool {
        matches!(self.code, 200..=299)
    }
}

pub type ResponseCallback = Box<dyn FnOnce(Option<Response>) + Send>;

/// An abstract HTTP client.
/// Rust consumers of HTTP clients should use this trait.
/// Apps should use a platform-specific Client impl.
pub trait Client {
    fn send_request(&self, request: Request, callback: ResponseCallback);
}

/// Platform-specific methods that must be provided by
/// the application to create a platform-specific Client impl.
pub trait Delegate {
    /// Responses should be provided via DelegatingClient::received_response.
    fn send_request(&self, request_id: u32, request: Request);
}

/// An impl of Client that calls out to a Delegate to make requests.
#[derive(Clone)]
pub struct DelegatingClient {
    delegate: Arc<Mutex<dyn Delegate + Send>>,
    response_callbacks: Arc<Mutex<ResponseCallbacks>>,
}

impl DelegatingClient {
    pub fn new(delegate: impl Delegate + Send + 'static) -> Self {
        Self {
            delegate: Arc::new(Mutex::new(delegate)),
            response_callbacks: Arc::default(),
        }
    }

    /// A None Response indicates a failure.
    pub fn received_response(&self, request_id: u32, response: Option<Response>) {
        info!(
            "http::DelegatingClient::received_response(): request_id: {}",
            request_id
        );

        match response.as_ref() {
            Some(r) => {
                info!("  status_code: {}", r.status.code);
                debug!("  body: {} bytes", r.body.len())
            }
            None => {
                info!("  no response, which indicates request failure");
            }
        }

        let response_callback = {
            let mut response_callbacks = self
                .response_callbacks
                .lock()
                .expect("http::DelegatingClient::response_callbacks lock");
            response_callbacks.pop(request_id)
        };
        if let Some(response_callback) = response_callback {
            response_callback(response);
        } else {
            error!(
                "http::DelegatingClient::received_response(): unknown request ID: {}",
                request_id
            );
        }
    }
}

impl Client for DelegatingClient {
    fn send_request(&self, request: Request, response_callback: ResponseCallback) {
        debug!(
            "http::DelegatingClient::send_request(): url: {} method: {:?}",
            request.url, request.method
        );
        let request_id = {
            let mut response_callbacks = self
                .response_callbacks
                .lock()
                .expect("http::DelegatingClient::response_callbacks lock");
            response_callbacks.push(response_callback)
        };
        let delegate = self
            .delegate
            .lock()
            .expect("http::DelegatingClient::delegate lock");
        delegate.send_request(request_id, request)
    }
}

#[derive(Default)]
struct ResponseCallbacks {
    response_callback_by_request_id: HashMap<u32, ResponseCallback>,
    next_request_id: u32,
}

impl ResponseCallbacks {
    fn push(&mut self, response_callback: ResponseCallback) -> u32 {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.response_callback_by_request_id
            .insert(request_id, response_callback);
        request_id
    }

    fn pop(&mut self, request_id: u32) -> Option<ResponseCallback> {
        self.response_callback_by_request_id.remove(&request_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingDelegate {
        requests: Arc<Mutex<Vec<(u32, Request)>>>,
    }

    impl Delegate for RecordingDelegate {
        fn send_request(&self, request_id: u32, request: Request) {
            self.requests.lock().unwrap().push((request_id, request));
        }
    }

    #[test]
    fn routes_response_to_matching_callback() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = DelegatingClient::new(RecordingDelegate {
            requests: requests.clone(),
        });

        let got = Arc::new(Mutex::new(None));
        let got_for_callback = got.clone();
        client.send_request(
            Request {
                method: Method::Post,
                url: "https://example.org/".to_string(),
                headers: HashMap::new(),
                body: None,
            },
            Box::new(move |response| {
                *got_for_callback.lock().unwrap() = response;
            }),
        );

        let request_id = requests.lock().unwrap()[0].0;
        client.received_response(
            request_id,
            Some(Response {
                status: 200.into(),
                body: b"ok".to_vec(),
            }),
        );

        let got = got.lock().unwrap();
        assert_eq!(200, got.as_ref().unwrap().status.code);
        assert_eq!(b"ok".to_vec(), got.as_ref().unwrap().body);
    }

    #[test]
    fn missing_response_indicates_failure() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let client = DelegatingClient::new(RecordingDelegate {
            requests: requests.clone(),
        });

        let failed = Arc::new(Mutex::new(false));
        let failed_for_callback = failed.clone();
        client.send_request(
            Request {
                method: Method::Get,
                url: "https://example.org/".to_string(),
                headers: HashMap::new(),
                body: None,
            },
            Box::new(move |response| {
                *failed_for_callback.lock().unwrap() = response.is_none();
            }),
        );

        let request_id = requests.lock().unwrap()[0].0;
        client.received_response(request_id, None);
        assert!(*failed.lock().unwrap());
    }
}
