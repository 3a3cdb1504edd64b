//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Session-description snapshotting: exactly once, on the first connect,
//! the negotiated local and remote descriptions are submitted verbatim.

use crate::common::PeerEvent;
use crate::event::media::SdpSnapshot;
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::webrtc::stats::StatsReport;
use crate::webrtc::IceConnectionState;

#[derive(Default)]
pub struct SdpInterceptor {
    connected: bool,
}

impl SdpInterceptor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Interceptor for SdpInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        _report: &StatsReport,
    ) -> Vec<Event> {
        if !matches!(
            event,
            PeerEvent::IceConnectionChange(IceConnectionState::Connected)
        ) || self.connected
        {
            return Vec::new();
        }
        self.connected = true;

        vec![Event::new(EventKind::SdpSnapshot(SdpSnapshot {
            remote_id: ctx.remote_id.to_string(),
            connection_id: ctx.connection_id.to_string(),
            local_sdp: ctx.local_sdp.map(str::to_string),
            remote_sdp: ctx.remote_sdp.map(str::to_string),
        }))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PipelineContext<'static> {
        PipelineContext {
            local_id: "local1",
            remote_id: "remote1",
            connection_id: "con1",
            now_ms: 0,
            local_sdp: Some("v=0 local"),
            remote_sdp: Some("v=0 remote"),
        }
    }

    #[test]
    fn emits_descriptions_once() {
        let mut interceptor = SdpInterceptor::new();
        let connected = PeerEvent::IceConnectionChange(IceConnectionState::Connected);

        let events = interceptor.process(&ctx(), &connected, &StatsReport::new());
        assert_eq!(1, events.len());
        match &events[0].kind {
            EventKind::SdpSnapshot(snapshot) => {
                assert_eq!(Some("v=0 local".to_string()), snapshot.local_sdp);
                assert_eq!(Some("v=0 remote".to_string()), snapshot.remote_sdp);
            }
            _ => panic!("expected sdp snapshot"),
        }

        assert!(interceptor
            .process(&ctx(), &connected, &StatsReport::new())
            .is_empty());
    }

    #[test]
    fn other_transitions_are_ignored() {
        let mut interceptor = SdpInterceptor::new();
        let events = interceptor.process(
            &ctx(),
            &PeerEvent::IceConnectionChange(IceConnectionState::Checking),
            &StatsReport::new(),
        );
        assert!(events.is_empty());
    }
}
