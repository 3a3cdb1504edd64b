//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Stream-identity mapping. Emits one ssrc map when the connection first
//! comes up and again whenever a stream is added; later reconnects do not
//! re-emit.

use crate::common::PeerEvent;
use crate::event::media::SsrcMap;
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::webrtc::stats::StatsReport;
use crate::webrtc::IceConnectionState;

#[derive(Default)]
pub struct SsrcInterceptor {
    connected: bool,
}

impl SsrcInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interceptor for SsrcInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event> {
        match event {
            PeerEvent::StreamAdded => {}
            PeerEvent::IceConnectionChange(IceConnectionState::Connected) if !self.connected => {
                self.connected = true;
            }
            _ => return Vec::new(),
        }

        let ssrcs = report.ssrcs(ctx.local_sdp, ctx.remote_sdp, ctx.local_id, ctx.remote_id);
        if ssrcs.is_empty() {
            return Vec::new();
        }

        vec![Event::new(EventKind::SsrcMap(SsrcMap {
            remote_id: ctx.remote_id.to_string(),
            connection_id: ctx.connection_id.to_string(),
            ssrc_data: ssrcs,
        }))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::webrtc::stats::StatsEntry;

    const LOCAL_SDP: &str = "a=ssrc:1234 cname:alice\r\n\
                             a=ssrc:1234 msid:stream track\r\n\
                             a=ssrc:1234 mslabel:stream\r\n\
                             a=ssrc:1234 label:track\r\n";

    fn ctx() -> PipelineContext<'static> {
        PipelineContext {
            local_id: "local1",
            remote_id: "remote1",
            connection_id: "con1",
            now_ms: 0,
            local_sdp: Some(LOCAL_SDP),
            remote_sdp: None,
        }
    }

    fn report_with_track() -> StatsReport {
        let values = match json!({ "isRemote": false, "ssrc": "1234", "mediaType": "audio" }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        StatsReport::from_entries([StatsEntry::new("S1", "outbound-rtp", 0.0, values)])
    }

    #[test]
    fn emits_on_first_connected_only() {
        let mut interceptor = SsrcInterceptor::new();
        let connected = PeerEvent::IceConnectionChange(IceConnectionState::Connected);

        let events = interceptor.process(&ctx(), &connected, &report_with_track());
        assert_eq!(1, events.len());
        match &events[0].kind {
            EventKind::SsrcMap(map) => assert_eq!(1, map.ssrc_data.len()),
            _ => panic!("expected ssrc map"),
        }

        assert!(interceptor
            .process(&ctx(), &connected, &report_with_track())
            .is_empty());
    }

    #[test]
    fn emits_on_every_stream_added() {
        let mut interceptor = SsrcInterceptor::new();
        let connected = PeerEvent::IceConnectionChange(IceConnectionState::Connected);
        interceptor.process(&ctx(), &connected, &report_with_track());

        assert_eq!(
            1,
            interceptor
                .process(&ctx(), &PeerEvent::StreamAdded, &report_with_track())
                .len()
        );
        assert_eq!(
            1,
            interceptor
                .process(&ctx(), &PeerEvent::StreamAdded, &report_with_track())
                .len()
        );
    }

    #[test]
    fn no_tracks_found_suppresses_emission() {
        let mut interceptor = SsrcInterceptor::new();
        let events = interceptor.process(
            &ctx(),
            &PeerEvent::IceConnectionChange(IceConnectionState::Connected),
            &StatsReport::new(),
        );
        assert!(events.is_empty());
    }
}
