//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Stateless translation of application-level media actions and playback
//! health signals into their typed events. Playback events other than
//! one-way must resolve a locally-reported track of the matching media
//! type from the snapshot; when none is found, nothing is emitted.

use crate::common::{MediaKind, PeerEvent, PlaybackKind};
use crate::event::info::Ssrc;
use crate::event::media::{MediaAction, MediaPlayback};
use crate::event::{Event, EventKind};
use crate::interceptor::{Interceptor, PipelineContext};
use crate::webrtc::stats::StatsReport;

#[derive(Default)]
pub struct MediaInterceptor;

impl MediaInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Interceptor for MediaInterceptor {
    fn process(
        &mut self,
        ctx: &PipelineContext<'_>,
        event: &PeerEvent,
        report: &StatsReport,
    ) -> Vec<Event> {
        let action = |event_type: &str, device_id: &str| {
            vec![Event::new(EventKind::MediaAction(MediaAction::new(
                ctx.remote_id,
                ctx.connection_id,
                event_type,
                device_id,
            )))]
        };

        match event {
            PeerEvent::Audio { muted, device_id } => action(
                if *muted {
                    MediaAction::EVENT_MUTE
                } else {
                    MediaAction::EVENT_UNMUTE
                },
                device_id,
            ),
            PeerEvent::Video { enabled, device_id } => action(
                if *enabled {
                    MediaAction::EVENT_VIDEO_RESUME
                } else {
                    MediaAction::EVENT_VIDEO_PAUSE
                },
                device_id,
            ),
            PeerEvent::ScreenShare { enabled, device_id } => action(
                if *enabled {
                    MediaAction::EVENT_SCREENSHARE_START
                } else {
                    MediaAction::EVENT_SCREENSHARE_STOP
                },
                device_id,
            ),
            PeerEvent::Playback { kind, media } => {
                let event_type = match kind {
                    PlaybackKind::Start => MediaPlayback::EVENT_PLAYBACK_START,
                    PlaybackKind::Suspended => MediaPlayback::EVENT_PLAYBACK_SUSPENDED,
                    PlaybackKind::Stalled => MediaPlayback::EVENT_PLAYBACK_STALLED,
                    PlaybackKind::OneWay => MediaPlayback::EVENT_ONE_WAY_MEDIA,
                };

                let ssrc = if *kind == PlaybackKind::OneWay {
                    None
                } else {
                    // The playback report is about a local track; without a
                    // matching one there is nothing to attribute it to.
                    let found = report
                        .ssrcs(ctx.local_sdp, ctx.remote_sdp, ctx.local_id, ctx.remote_id)
                        .into_iter()
                        .find(|s| {
                            s.report_type == Ssrc::REPORT_LOCAL && s.media_type == media.as_str()
                        });
                    match found {
                        Some(ssrc) => Some(ssrc.ssrc),
                        None => return Vec::new(),
                    }
                };

                vec![Event::new(EventKind::MediaPlayback(MediaPlayback {
                    remote_id: ctx.remote_id.to_string(),
                    connection_id: ctx.connection_id.to_string(),
                    event_type: event_type.to_string(),
                    media_type: media.as_str().to_string(),
                    ssrc,
                }))]
            }
            _ => Vec::new(),
        }
    }
}
