//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! A point-in-time stats snapshot from the media transport: a keyed
//! collection of heterogeneous records, each with a type tag and a field
//! map, plus the lookups the interceptor pipeline performs against it.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::event::info::{IceCandidate, IceCandidatePair, Ssrc};
use crate::webrtc::sdp;

/// One record of a stats snapshot.
#[derive(Clone, Debug)]
pub struct StatsEntry {
    pub id: String,
    /// The record's `RTCStatsType` tag, e.g. "candidate-pair".
    pub kind: String,
    /// Timestamp of the record, in microseconds.
    pub timestamp_us: f64,
    pub values: Map<String, Value>,
}

impl StatsEntry {
    pub fn new(id: &str, kind: &str, timestamp_us: f64, values: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            timestamp_us,
            values,
        }
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn num_value(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    /// The stream id of an inbound-rtp/outbound-rtp record, however the
    /// transport spelled it.
    pub fn ssrc_value(&self) -> Option<String> {
        match self.values.get("ssrc") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A full snapshot, keyed by record id.
#[derive(Clone, Debug, Default)]
pub struct StatsReport {
    entries: BTreeMap<String, StatsEntry>,
}

impl StatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = StatsEntry>) -> Self {
        let mut report = Self::new();
        for entry in entries {
            report.insert(entry);
        }
        report
    }

    pub fn insert(&mut self, entry: StatsEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&StatsEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &StatsEntry> {
        self.entries.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a StatsEntry> {
        self.entries.values().filter(move |e| e.kind == kind)
    }

    /// The id of the candidate pair the transport currently routes over,
    /// read from the snapshot's "transport" record.
    pub fn selected_candidate_pair_id(&self) -> Option<String> {
        self.of_kind("transport")
            .find_map(|e| e.str_value("selectedCandidatePairId"))
            .map(str::to_string)
    }

    pub fn candidate_pairs(&self) -> Vec<IceCandidatePair> {
        self.of_kind("candidate-pair").map(candidate_pair_from_entry).collect()
    }

    pub fn local_candidates(&self) -> Vec<IceCandidate> {
        self.of_kind("local-candidate").map(candidate_from_entry).collect()
    }

    pub fn remote_candidates(&self) -> Vec<IceCandidate> {
        self.of_kind("remote-candidate").map(candidate_from_entry).collect()
    }

    /// Track identities, cross-referencing the snapshot's rtp records with
    /// the `a=ssrc:` attributes of the corresponding session description.
    pub fn ssrcs(
        &self,
        local_sdp: Option<&str>,
        remote_sdp: Option<&str>,
        local_id: &str,
        remote_id: &str,
    ) -> Vec<Ssrc> {
        self.entries
            .values()
            .filter(|e| e.kind == "inbound-rtp" || e.kind == "outbound-rtp")
            .filter_map(|e| ssrc_from_entry(e, local_sdp, remote_sdp, local_id, remote_id))
            .collect()
    }
}

fn candidate_pair_from_entry(entry: &StatsEntry) -> IceCandidatePair {
    IceCandidatePair {
        id: entry.id.clone(),
        local_candidate_id: entry.str_value("localCandidateId").unwrap_or_default().to_string(),
        remote_candidate_id: entry.str_value("remoteCandidateId").unwrap_or_default().to_string(),
        state: entry.str_value("state").unwrap_or_default().to_string(),
        priority: entry.num_value("priority").unwrap_or_default() as u64,
        nominated: entry.bool_value("nominated").unwrap_or_default(),
    }
}

fn candidate_from_entry(entry: &StatsEntry) -> IceCandidate {
    IceCandidate {
        id: entry.id.clone(),
        kind: entry.kind.clone(),
        ip: entry.str_value("ip").unwrap_or_default().to_string(),
        port: entry.num_value("port").unwrap_or_default() as u16,
        candidate_type: entry.str_value("candidateType").unwrap_or_default().to_string(),
        transport: entry.str_value("protocol").unwrap_or_default().to_string(),
    }
}

fn ssrc_from_entry(
    entry: &StatsEntry,
    local_sdp: Option<&str>,
    remote_sdp: Option<&str>,
    local_id: &str,
    remote_id: &str,
) -> Option<Ssrc> {
    let is_remote = entry.bool_value("isRemote")?;
    let description = if is_remote { remote_sdp } else { local_sdp }?;
    let ssrc = entry.ssrc_value()?;
    let attributes = sdp::ssrc_attributes(description, &ssrc)?;
    Some(Ssrc {
        ssrc,
        cname: attributes.get("cname")?.clone(),
        stream_type: entry.kind.trim_end_matches("-rtp").to_string(),
        report_type: if is_remote {
            Ssrc::REPORT_REMOTE.to_string()
        } else {
            Ssrc::REPORT_LOCAL.to_string()
        },
        media_type: entry.str_value("mediaType")?.to_string(),
        user_id: if is_remote { remote_id } else { local_id }.to_string(),
        msid: attributes.get("msid")?.clone(),
        mslabel: attributes.get("mslabel")?.clone(),
        label: attributes.get("label")?.clone(),
        local_start_time: entry.timestamp_us,
    })
}

/// Derive the stable identifier of the connection from its selected network
/// path: an MD5 digest over local ip, local port, remote ip, remote port.
/// Two peers watching the same path agree on the value. Returns None until
/// a path has been selected and both its candidates are resolvable.
pub fn derive_connection_id(report: &StatsReport) -> Option<String> {
    let selected_id = report.selected_candidate_pair_id()?;
    let pair = report
        .candidate_pairs()
        .into_iter()
        .find(|p| p.id == selected_id)?;
    let local = report
        .local_candidates()
        .into_iter()
        .find(|c| c.id == pair.local_candidate_id)?;
    let remote = report
        .remote_candidates()
        .into_iter()
        .find(|c| c.id == pair.remote_candidate_id)?;
    Some(format!(
        "{:x}",
        md5::compute(format!(
            "{}{}{}{}",
            local.ip, local.port, remote.ip, remote.port
        ))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(id: &str, kind: &str, fields: Value) -> StatsEntry {
        let values = match fields {
            Value::Object(map) => map,
            _ => panic!("fields must be an object"),
        };
        StatsEntry::new(id, kind, 0.0, values)
    }

    fn report_with_path() -> StatsReport {
        StatsReport::from_entries([
            entry(
                "T1",
                "transport",
                json!({ "selectedCandidatePairId": "P1" }),
            ),
            entry(
                "P1",
                "candidate-pair",
                json!({
                    "localCandidateId": "L1",
                    "remoteCandidateId": "R1",
                    "state": "succeeded",
                    "priority": 9114756780671369u64,
                    "nominated": true,
                }),
            ),
            entry(
                "L1",
                "local-candidate",
                json!({ "ip": "10.0.0.2", "port": 50000, "candidateType": "host", "protocol": "udp" }),
            ),
            entry(
                "R1",
                "remote-candidate",
                json!({ "ip": "192.0.2.7", "port": 3478, "candidateType": "relay", "protocol": "udp" }),
            ),
        ])
    }

    #[test]
    fn selected_pair_comes_from_transport_record() {
        assert_eq!(
            Some("P1".to_string()),
            report_with_path().selected_candidate_pair_id()
        );
        assert_eq!(None, StatsReport::new().selected_candidate_pair_id());
    }

    #[test]
    fn connection_id_is_deterministic() {
        let first = derive_connection_id(&report_with_path()).unwrap();
        let second = derive_connection_id(&report_with_path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            format!("{:x}", md5::compute("10.0.0.250000192.0.2.73478")),
            second
        );
    }

    #[test]
    fn connection_id_changes_with_any_path_field() {
        let base = derive_connection_id(&report_with_path()).unwrap();

        let mut changed_port = report_with_path();
        changed_port.insert(entry(
            "L1",
            "local-candidate",
            json!({ "ip": "10.0.0.2", "port": 50001, "candidateType": "host", "protocol": "udp" }),
        ));
        assert_ne!(base, derive_connection_id(&changed_port).unwrap());

        let mut changed_ip = report_with_path();
        changed_ip.insert(entry(
            "R1",
            "remote-candidate",
            json!({ "ip": "192.0.2.8", "port": 3478, "candidateType": "relay", "protocol": "udp" }),
        ));
        assert_ne!(base, derive_connection_id(&changed_ip).unwrap());
    }

    #[test]
    fn connection_id_absent_before_path_selected() {
        // No transport record at all.
        assert_eq!(None, derive_connection_id(&StatsReport::new()));

        // Selected pair names a candidate that is not in the snapshot.
        let mut truncated = StatsReport::new();
        truncated.insert(entry(
            "T1",
            "transport",
            json!({ "selectedCandidatePairId": "P1" }),
        ));
        truncated.insert(entry(
            "P1",
            "candidate-pair",
            json!({ "localCandidateId": "L1", "remoteCandidateId": "R1" }),
        ));
        assert_eq!(None, derive_connection_id(&truncated));
    }

    #[test]
    fn ssrcs_require_matching_description_attributes() {
        let sdp = "v=0\r\n\
                   a=ssrc:1234 cname:user1\r\n\
                   a=ssrc:1234 msid:stream track\r\n\
                   a=ssrc:1234 mslabel:stream\r\n\
                   a=ssrc:1234 label:track\r\n";
        let report = StatsReport::from_entries([
            entry(
                "S1",
                "outbound-rtp",
                json!({ "isRemote": false, "ssrc": "1234", "mediaType": "audio" }),
            ),
            // No attributes for this id in the description.
            entry(
                "S2",
                "outbound-rtp",
                json!({ "isRemote": false, "ssrc": "9999", "mediaType": "video" }),
            ),
        ]);

        let ssrcs = report.ssrcs(Some(sdp), None, "local1", "remote1");
        assert_eq!(1, ssrcs.len());
        let ssrc = &ssrcs[0];
        assert_eq!("1234", ssrc.ssrc);
        assert_eq!("user1", ssrc.cname);
        assert_eq!("outbound", ssrc.stream_type);
        assert_eq!(Ssrc::REPORT_LOCAL, ssrc.report_type);
        assert_eq!("local1", ssrc.user_id);
    }
}
