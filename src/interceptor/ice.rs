//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The network-path sub-lifecycle. Watches the same ice connection state
//! transitions as the fabric interceptor but keeps its own state and emits
//! the finer-grained ice event family. Elapsed values come from this
//! interceptor's own entry-timestamp map, which is updated on every
//! transition after the events for it have been built.

use std::collections::HashMap;

use crate::common::PeerEvent;
use crate::event::ice::{
    IceAborted, IceConnectionDisruptEnd, IceConnectionDisruptStart, IceDisruptEnd, IceDisruptStart,
    IceFailed, IceRestart, IceTerminated,
};
use crate::event::info::IceCandidatePair;
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::webrtc::stats::StatsReport;
use crate::webrtc::IceConnectionState;

use IceConnectionState::*;

pub struct IceInterceptor {
    state: IceConnectionState,
    pair: Option<IceCandidatePair>,
    /// When each state was last entered, epoch ms.
    entered_at: HashMap<IceConnectionState, u64>,
}

impl IceInterceptor {
    pub fn new(created_at_ms: u64) -> Self {
        let mut entered_at = HashMap::new();
        entered_at.insert(New, created_at_ms);
        Self {
            state: New,
            pair: None,
            entered_at,
        }
    }

    fn since(&self, state: IceConnectionState, now: u64) -> Option<u64> {
        self.entered_at.get(&state).map(|t| now.saturating_sub(*t))
    }
}

impl Interceptor for IceInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event> {
        let new_state = match event {
            PeerEvent::IceConnectionChange(state) => *state,
            _ => return Vec::new(),
        };

        let now = ctx.now_ms;
        let new_pair = report.candidate_pairs().into_iter().next();
        let mut events = Vec::new();

        // [disruption start] connected/completed -> disconnected
        if new_state == Disconnected && matches!(self.state, Connected | Completed) {
            if let Some(pair) = new_pair.clone() {
                events.push(Event::new(EventKind::IceDisruptStart(IceDisruptStart::new(
                    ctx.remote_id,
                    ctx.connection_id,
                    pair,
                    self.state.to_string(),
                ))));
            }
        }

        // [disruption end] disconnected -> connected/completed/checking
        if self.state == Disconnected && matches!(new_state, Connected | Completed | Checking) {
            if let (Some(pair), Some(prev_pair), Some(delay)) =
                (new_pair.clone(), self.pair.clone(), self.since(Disconnected, now))
            {
                events.push(Event::new(EventKind::IceDisruptEnd(IceDisruptEnd::new(
                    ctx.remote_id,
                    ctx.connection_id,
                    pair,
                    prev_pair,
                    new_state.to_string(),
                    delay,
                ))));
            }
        }

        // [restart] any -> new, when a pair was already known
        if new_state == New {
            if let Some(prev_pair) = self.pair.clone() {
                events.push(Event::new(EventKind::IceRestart(IceRestart::new(
                    ctx.remote_id,
                    ctx.connection_id,
                    prev_pair,
                    self.state.to_string(),
                ))));
            }
        }

        // [failed] checking/disconnected -> failed
        if new_state == Failed && matches!(self.state, Checking | Disconnected) {
            if let Some(delay) = self.since(self.state, now) {
                let mut failed =
                    IceFailed::new(ctx.remote_id, ctx.connection_id, self.state.to_string(), delay);
                failed.local_ice_candidates = report.local_candidates();
                failed.remote_ice_candidates = report.remote_candidates();
                failed.ice_candidate_pairs = report.candidate_pairs();
                events.push(Event::new(EventKind::IceFailed(failed)));
            }
        }

        // [aborted] checking/new -> closed
        if new_state == Closed && matches!(self.state, Checking | New) {
            if let Some(delay) = self.since(self.state, now) {
                let mut aborted =
                    IceAborted::new(ctx.remote_id, ctx.connection_id, self.state.to_string(), delay);
                aborted.local_ice_candidates = report.local_candidates();
                aborted.remote_ice_candidates = report.remote_candidates();
                aborted.ice_candidate_pairs = report.candidate_pairs();
                events.push(Event::new(EventKind::IceAborted(aborted)));
            }
        }

        // [terminated] connected/completed/failed/disconnected -> closed
        if new_state == Closed
            && matches!(self.state, Connected | Completed | Failed | Disconnected)
        {
            if let Some(prev_pair) = self.pair.clone() {
                events.push(Event::new(EventKind::IceTerminated(IceTerminated::new(
                    ctx.remote_id,
                    ctx.connection_id,
                    prev_pair,
                    self.state.to_string(),
                ))));
            }
        }

        // [connection disruption start] checking -> disconnected
        if new_state == Disconnected && self.state == Checking {
            events.push(Event::new(EventKind::IceConnectionDisruptStart(
                IceConnectionDisruptStart::new(ctx.remote_id, ctx.connection_id),
            )));
        }

        // [connection disruption end] disconnected -> checking
        if new_state == Checking && self.state == Disconnected {
            if let Some(delay) = self.since(self.state, now) {
                events.push(Event::new(EventKind::IceConnectionDisruptEnd(
                    IceConnectionDisruptEnd::new(ctx.remote_id, ctx.connection_id, delay),
                )));
            }
        }

        // Finally, update the states.
        self.state = new_state;
        self.pair = new_pair;
        self.entered_at.insert(new_state, now);

        events
    }
}
