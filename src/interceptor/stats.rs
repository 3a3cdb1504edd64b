//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Incremental stats derivation. On every polling tick the raw rtp records
//! are annotated -- on a copy, never mutating the snapshot -- with derived
//! `csio*` fields computed from per-track cumulative caches, and the whole
//! annotated snapshot goes out as one stats submission.
//!
//! Bitrates divide bits by elapsed milliseconds, which yields kbit/s
//! directly.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::common::PeerEvent;
use crate::event::info::WifiStats;
use crate::event::session::ConferenceStats;
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::status::WifiStatusProvider;
use crate::webrtc::stats::{StatsEntry, StatsReport};
use crate::webrtc::IceConnectionState;

/// Cumulative counters for one track, keyed by stats record id.
#[derive(Default)]
struct TrackCache {
    rtt_sum: f64,
    rtt_count: u64,
    jitter_sum: f64,
    jitter_count: u64,
    bytes: Option<f64>,
    packets_lost: Option<f64>,
    packets_received: Option<f64>,
}

pub struct StatsInterceptor {
    wifi: Arc<dyn WifiStatusProvider>,
    /// When the connection first reached connected, epoch ms.
    connected_at: Option<u64>,
    /// When the previous polling tick ran, epoch ms.
    last_tick: Option<u64>,
    tracks: HashMap<String, TrackCache>,
}

impl StatsInterceptor {
    pub fn new(wifi: Arc<dyn WifiStatusProvider>) -> Self {
        Self {
            wifi,
            connected_at: None,
            last_tick: None,
            tracks: HashMap::new(),
        }
    }

    fn annotate(&mut self, entry: &StatsEntry, now: u64) -> Value {
        let mut values = entry.values.clone();
        let outbound = entry.kind == "outbound-rtp";
        let cache = self.tracks.entry(entry.id.clone()).or_default();

        let bytes = entry.num_value(if outbound { "bytesSent" } else { "bytesReceived" });

        if let (Some(bytes), Some(connected_at)) = (bytes, self.connected_at) {
            let elapsed = now.saturating_sub(connected_at);
            if elapsed > 0 {
                values.insert(
                    "csioAvgBRKbps".to_string(),
                    json!(bytes * 8.0 / elapsed as f64),
                );
            }
        }

        if let (Some(bytes), Some(cached_bytes), Some(last_tick)) =
            (bytes, cache.bytes, self.last_tick)
        {
            let interval = now.saturating_sub(last_tick);
            if interval > 0 {
                values.insert(
                    "csioIntBRKbps".to_string(),
                    json!((bytes - cached_bytes) * 8.0 / interval as f64),
                );
            }
        }

        if outbound {
            if let Some(rtt) = entry.num_value("roundTripTime") {
                cache.rtt_sum += rtt;
                cache.rtt_count += 1;
            }
            if cache.rtt_count > 0 {
                values.insert(
                    "csioAvgRtt".to_string(),
                    json!(cache.rtt_sum / cache.rtt_count as f64),
                );
            }
            if let Some(last_tick) = self.last_tick {
                values.insert("csioIntMs".to_string(), json!(now.saturating_sub(last_tick)));
            }
            if let Some(connected_at) = self.connected_at {
                values.insert(
                    "csioTimeElapseMs".to_string(),
                    json!(now.saturating_sub(connected_at)),
                );
            }
        } else {
            if let Some(jitter) = entry.num_value("jitter") {
                cache.jitter_sum += jitter;
                cache.jitter_count += 1;
            }
            if cache.jitter_count > 0 {
                values.insert(
                    "csioAvgJitter".to_string(),
                    json!(cache.jitter_sum / cache.jitter_count as f64),
                );
            }

            let lost = entry.num_value("packetsLost");
            let received = entry.num_value("packetsReceived");
            if let (Some(lost), Some(received), Some(cached_lost), Some(cached_received)) =
                (lost, received, cache.packets_lost, cache.packets_received)
            {
                let delta_lost = lost - cached_lost;
                let delta_received = received - cached_received;
                // The fraction is undefined on a tick with no new packets.
                if delta_lost + delta_received > 0.0 {
                    values.insert(
                        "csioIntFL".to_string(),
                        json!(delta_lost / (delta_lost + delta_received)),
                    );
                }
                values.insert("csioIntPktLoss".to_string(), json!(delta_lost));
            }
            if lost.is_some() {
                cache.packets_lost = lost;
            }
            if received.is_some() {
                cache.packets_received = received;
            }
        }

        if bytes.is_some() {
            cache.bytes = bytes;
        }

        values.insert("id".to_string(), json!(entry.id));
        values.insert("type".to_string(), json!(entry.kind));
        values.insert("timestamp".to_string(), json!(entry.timestamp_us));
        Value::Object(values)
    }
}

impl Interceptor for StatsInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event> {
        match event {
            PeerEvent::IceConnectionChange(IceConnectionState::Connected) => {
                if self.connected_at.is_none() {
                    self.connected_at = Some(ctx.now_ms);
                }
                return Vec::new();
            }
            PeerEvent::StatsPoll => {}
            _ => return Vec::new(),
        }

        let now = ctx.now_ms;
        let mut stats = Vec::new();
        for entry in report.entries() {
            stats.push(
                if entry.kind == "inbound-rtp" || entry.kind == "outbound-rtp" {
                    self.annotate(entry, now)
                } else {
                    let mut values = entry.values.clone();
                    values.insert("id".to_string(), json!(entry.id));
                    values.insert("type".to_string(), json!(entry.kind));
                    values.insert("timestamp".to_string(), json!(entry.timestamp_us));
                    Value::Object(values)
                },
            );
        }

        self.last_tick = Some(now);

        let wifi = WifiStats {
            rssi: self.wifi.rssi(),
            signal: self.wifi.signal(),
        };

        vec![Event::new(EventKind::ConferenceStats(ConferenceStats {
            remote_id: ctx.remote_id.to_string(),
            connection_id: ctx.connection_id.to_string(),
            stats,
            wifi_stats: if wifi.is_empty() { None } else { Some(wifi) },
        }))]
    }
}
