//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The connection-lifecycle state machine. Tracks the three transport
//! state axes of one connection, plus the selected candidate pair and the
//! time each ice connection state was last entered, and emits the fabric
//! event family.
//!
//! Check order matters: state-change, dropped and terminated compare
//! against the state stored *before* this event, and the timestamp map is
//! updated only after every check has run, so elapsed values measure the
//! time spent in the previous state.

use std::collections::HashMap;

use crate::common::PeerEvent;
use crate::event::fabric::{
    FabricAction, FabricDropped, FabricSetup, FabricStateChange, FabricTerminated,
    FabricTransportChange,
};
use crate::event::info::IceCandidatePair;
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::webrtc::stats::StatsReport;
use crate::webrtc::{IceConnectionState, IceGatheringState, SignalingState};

pub struct FabricInterceptor {
    ice_connection_state: IceConnectionState,
    ice_gathering_state: IceGatheringState,
    signaling_state: SignalingState,
    /// When each ice connection state was last entered, epoch ms.
    entered_at: HashMap<IceConnectionState, u64>,
    selected_pair: Option<IceCandidatePair>,
    /// Whether the connection has ever reached connected.
    connected: bool,
}

impl FabricInterceptor {
    pub fn new(created_at_ms: u64) -> Self {
        let mut entered_at = HashMap::new();
        entered_at.insert(IceConnectionState::New, created_at_ms);
        Self {
            ice_connection_state: IceConnectionState::New,
            ice_gathering_state: IceGatheringState::New,
            signaling_state: SignalingState::Closed,
            entered_at,
            selected_pair: None,
            connected: false,
        }
    }

    fn state_change(
        &self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
    ) -> Option<FabricStateChange> {
        let (prev_state, new_state, changed_state) = match event {
            PeerEvent::IceConnectionChange(new) if *new != self.ice_connection_state => (
                self.ice_connection_state.to_string(),
                new.to_string(),
                "iceConnectionState",
            ),
            PeerEvent::IceGatheringChange(new) if *new != self.ice_gathering_state => (
                self.ice_gathering_state.to_string(),
                new.to_string(),
                "iceGatheringState",
            ),
            PeerEvent::SignalingChange(new) if *new != self.signaling_state => (
                self.signaling_state.to_string(),
                new.to_string(),
                "signalingState",
            ),
            _ => return None,
        };
        Some(FabricStateChange {
            remote_id: ctx.remote_id.to_string(),
            connection_id: ctx.connection_id.to_string(),
            prev_state,
            new_state,
            changed_state: changed_state.to_string(),
        })
    }
}

impl Interceptor for FabricInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event> {
        // Hold/resume are meaningful only once the connection is up.
        match event {
            PeerEvent::Hold | PeerEvent::Resume => {
                if !self.connected {
                    return Vec::new();
                }
                let event_type = if matches!(event, PeerEvent::Hold) {
                    FabricAction::EVENT_HOLD
                } else {
                    FabricAction::EVENT_RESUME
                };
                return vec![Event::new(EventKind::FabricAction(FabricAction {
                    remote_id: ctx.remote_id.to_string(),
                    connection_id: ctx.connection_id.to_string(),
                    event_type: event_type.to_string(),
                }))];
            }
            PeerEvent::IceConnectionChange(_)
            | PeerEvent::IceGatheringChange(_)
            | PeerEvent::SignalingChange(_) => {}
            _ => return Vec::new(),
        }

        let now = ctx.now_ms;
        let mut events = Vec::new();

        // [state change] any axis change of a set-up connection
        if self.connected {
            if let Some(change) = self.state_change(ctx, event) {
                events.push(Event::new(EventKind::FabricStateChange(change)));
            }
        }

        // [dropped] failed out of completed/disconnected on a set-up
        // connection, measured from entry into the previous state
        if self.connected
            && matches!(event, PeerEvent::IceConnectionChange(IceConnectionState::Failed))
            && matches!(
                self.ice_connection_state,
                IceConnectionState::Completed | IceConnectionState::Disconnected
            )
        {
            if let (Some(pair), Some(since)) = (
                self.selected_pair.clone(),
                self.entered_at.get(&self.ice_connection_state),
            ) {
                events.push(Event::new(EventKind::FabricDropped(FabricDropped::new(
                    ctx.remote_id,
                    ctx.connection_id,
                    pair,
                    self.ice_connection_state.to_string(),
                    now.saturating_sub(*since),
                ))));
            }
        }

        // [terminated] closed from anything but closed on a set-up
        // connection
        if self.connected
            && matches!(event, PeerEvent::IceConnectionChange(IceConnectionState::Closed))
            && self.ice_connection_state != IceConnectionState::Closed
        {
            events.push(Event::new(EventKind::FabricTerminated(FabricTerminated {
                remote_id: ctx.remote_id.to_string(),
                connection_id: ctx.connection_id.to_string(),
            })));
        }

        if matches!(event, PeerEvent::IceConnectionChange(IceConnectionState::Connected)) {
            let selected_id = report.selected_candidate_pair_id();
            let pairs = report.candidate_pairs();
            let new_pair = selected_id
                .as_ref()
                .and_then(|id| pairs.iter().find(|p| &p.id == id).cloned());
            let locals = report.local_candidates();
            let remotes = report.remote_candidates();

            if !self.connected {
                // [setup] first time the connection comes up
                self.connected = true;
                let delay = self
                    .entered_at
                    .get(&IceConnectionState::New)
                    .map(|t| now.saturating_sub(*t))
                    .unwrap_or(0);
                let mut setup = FabricSetup::new(ctx.remote_id, ctx.connection_id, delay);
                setup.local_ice_candidates = locals;
                setup.remote_ice_candidates = remotes;
                setup.ice_candidate_pairs = pairs;
                setup.selected_candidate_pair_id = selected_id;
                events.push(Event::new(EventKind::FabricSetup(setup)));
            } else if let (Some(prev_pair), Some(new_pair)) =
                (self.selected_pair.clone(), new_pair.clone())
            {
                // [transport change] reconnected over a (possibly) new pair
                let delay = self
                    .entered_at
                    .get(&IceConnectionState::Connected)
                    .map(|t| now.saturating_sub(*t))
                    .unwrap_or(0);
                events.push(Event::new(EventKind::FabricTransportChange(Box::new(
                    FabricTransportChange {
                        remote_id: ctx.remote_id.to_string(),
                        connection_id: ctx.connection_id.to_string(),
                        curr_ice_candidate_pair: new_pair,
                        prev_ice_candidate_pair: prev_pair,
                        curr_ice_connection_state: IceConnectionState::Connected.to_string(),
                        prev_ice_connection_state: self.ice_connection_state.to_string(),
                        delay,
                        local_ice_candidates: locals,
                        remote_ice_candidates: remotes,
                        relay_type: None,
                    },
                ))));
            }

            self.selected_pair = new_pair;
        }

        // Update the stored states last; the checks above need the old
        // values.
        match event {
            PeerEvent::IceConnectionChange(new) => {
                self.ice_connection_state = *new;
                self.entered_at.insert(*new, now);
            }
            PeerEvent::IceGatheringChange(new) => self.ice_gathering_state = *new,
            PeerEvent::SignalingChange(new) => self.signaling_state = *new,
            _ => {}
        }

        events
    }
}
