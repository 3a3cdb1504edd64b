//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! # CallMetrics -- An RTC Telemetry Core
//!
//! This crate turns raw peer-connection lifecycle signals and periodic
//! stats snapshots into a normalized, ordered stream of analytics events
//! delivered to a collection endpoint. The host application supplies the
//! HTTP transport and the media-transport handle; everything in between --
//! event gating, connection lifecycle tracking, and incremental stats
//! derivation -- lives here.

#[macro_use]
extern crate log;

pub mod common;
pub mod core;
pub mod error;
pub mod event;
pub mod http;
pub mod interceptor;
pub mod status;
pub mod webrtc;
