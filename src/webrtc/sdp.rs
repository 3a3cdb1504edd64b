//
// Copyright 2019-2022 Signal Messenger, LLC
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Extraction of per-stream attributes from a session description.

use std::collections::HashMap;

/// Collect the `a=ssrc:<id> <key>:<value>` attribute lines of one stream id
/// from a session description. Returns None if the description carries no
/// attributes for that id.
pub fn ssrc_attributes(description: &str, ssrc: &str) -> Option<HashMap<String, String>> {
    let prefix = format!("a=ssrc:{} ", ssrc);
    let mut attributes: Option<HashMap<String, String>> = None;
    for line in description.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix(&prefix) {
            if let Some((key, value)) = rest.split_once(':') {
                attributes
                    .get_or_insert_with(HashMap::new)
                    .insert(key.to_string(), value.to_string());
            }
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTION: &str = "v=0\r\n\
                               o=- 0 0 IN IP4 127.0.0.1\r\n\
                               a=ssrc:111 cname:alice\r\n\
                               a=ssrc:111 msid:stream audio0\r\n\
                               a=ssrc:222 cname:alice\r\n";

    #[test]
    fn collects_attributes_for_one_stream() {
        let attributes = ssrc_attributes(DESCRIPTION, "111").unwrap();
        assert_eq!(2, attributes.len());
        assert_eq!("alice", attributes["cname"]);
        assert_eq!("stream audio0", attributes["msid"]);
    }

    #[test]
    fn unknown_stream_yields_none() {
        assert!(ssrc_attributes(DESCRIPTION, "999").is_none());
    }

    #[test]
    fn value_may_itself_contain_colons() {
        let description = "a=ssrc:5 msid:a:b:c\r\n";
        let attributes = ssrc_attributes(description, "5").unwrap();
        assert_eq!("a:b:c", attributes["msid"]);
    }
}
