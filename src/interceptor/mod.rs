//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The per-connection interceptor pipeline. Each interceptor owns the
//! state for one concern of one connection and translates incoming
//! transport notifications, together with the stats snapshot taken for the
//! same tick, into zero or more analytics events.

pub mod fabric;
pub mod ice;
pub mod media;
pub mod sdp;
pub mod ssrc;
pub mod stats;

use crate::common::PeerEvent;
use crate::event::Event;
use crate::webrtc::stats::StatsReport;

/// Everything an interceptor may read about the connection for one event,
/// assembled by the event manager at the moment of processing. Interceptors
/// hold no references to the transport between calls.
#[derive(Clone, Copy, Debug)]
pub struct PipelineContext<'a> {
    pub local_id: &'a str,
    pub remote_id: &'a str,
    pub connection_id: &'a str,
    /// Wall-clock time of this pipeline run, epoch milliseconds. All
    /// interceptors of one run observe the same instant.
    pub now_ms: u64,
    pub local_sdp: Option<&'a str>,
    pub remote_sdp: Option<&'a str>,
}

pub trait Interceptor: Send {
    /// Process one notification with the snapshot taken for it, mutating
    /// this interceptor's connection state and returning the events to
    /// submit, in emission order.
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event>;
}
