//! Header Analyzer (C8).
//!
//! Checks presence/validity of RFC 5322 headers, builds the received-chain,
//! and assesses domain alignment between `From` and `Return-Path`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::message::ParsedMessage;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceivedHop {
    pub from: Option<String>,
    pub by: Option<String>,
    pub with: Option<String>,
    pub id: Option<String>,
    pub ip: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderAnalysis {
    pub required_present: Vec<(String, bool)>,
    pub recommended_present: Vec<(String, bool)>,
    pub mime_structure_present: bool,
    pub message_id_valid: bool,
    pub received_chain: Vec<ReceivedHop>,
    pub alignment_ok: bool,
    pub alignment_issue: Option<String>,
    pub score: u8,
}

const REQUIRED_HEADERS: [&str; 3] = ["From", "Date", "Message-ID"];
const RECOMMENDED_HEADERS: [&str; 3] = ["Subject", "To", "Reply-To"];

pub fn analyze_headers(message: &ParsedMessage) -> HeaderAnalysis {
    let required_present: Vec<(String, bool)> = REQUIRED_HEADERS
        .iter()
        .map(|h| (h.to_string(), header_non_empty(message, h)))
        .collect();
    let recommended_present: Vec<(String, bool)> = RECOMMENDED_HEADERS
        .iter()
        .map(|h| (h.to_string(), header_non_empty(message, h)))
        .collect();

    let mime_structure_present = !message.root.content.is_empty() || !message.root.children.is_empty();
    let message_id_valid = validate_message_id(message.message_id.as_deref());

    let received_chain: Vec<ReceivedHop> = message
        .headers
        .get_all("Received")
        .iter()
        .filter_map(|raw| parse_received_hop(raw))
        .collect();

    let (alignment_ok, alignment_issue) = check_alignment(message);

    let required_count = required_present.iter().filter(|(_, p)| *p).count();
    let recommended_count = recommended_present.iter().filter(|(_, p)| *p).count();

    let required_score = (required_count as f64 / REQUIRED_HEADERS.len() as f64) * 40.0;
    let recommended_score = (recommended_count as f64 / RECOMMENDED_HEADERS.len() as f64) * 30.0;
    let mime_score = if mime_structure_present { 20.0 } else { 0.0 };
    let msgid_score = if message_id_valid { 10.0 } else { 0.0 };

    let score = (required_score + recommended_score + mime_score + msgid_score)
        .floor()
        .clamp(0.0, 100.0) as u8;

    HeaderAnalysis {
        required_present,
        recommended_present,
        mime_structure_present,
        message_id_valid,
        received_chain,
        alignment_ok,
        alignment_issue,
        score,
    }
}

fn header_non_empty(message: &ParsedMessage, name: &str) -> bool {
    message
        .headers
        .get_first(name)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn validate_message_id(message_id: Option<&str>) -> bool {
    let value = match message_id {
        Some(v) => v.trim(),
        None => return false,
    };
    let inner = match value.strip_prefix('<').and_then(|v| v.strip_suffix('>')) {
        Some(inner) => inner,
        None => return false,
    };
    let parts: Vec<&str> = inner.splitn(3, '@').collect();
    if parts.len() != 2 {
        return false;
    }
    !parts[0].is_empty() && !parts[1].is_empty() && inner.matches('@').count() == 1
}

static FROM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfrom\s+(\S+)").unwrap());
static BY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bby\s+(\S+)").unwrap());
static WITH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bwith\s+(\S+)").unwrap());
static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bid\s+(\S+)").unwrap());
static PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());
static IPV4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap());
static IPV6_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:IPv6:)?([0-9a-f]{0,4}(?::[0-9a-f]{0,4}){2,7})").unwrap());

fn parse_received_hop(raw: &str) -> Option<ReceivedHop> {
    let from = FROM_RE.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
    let by = BY_RE.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());

    if from.is_none() && by.is_none() {
        return None;
    }

    let with = WITH_RE.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().to_string());
    let id = ID_RE.captures(raw).and_then(|c| c.get(1)).map(|m| m.as_str().trim_end_matches(';').to_string());

    let ip = PAREN_RE.captures_iter(raw).find_map(|c| {
        let inner = c.get(1)?.as_str();
        if let Some(cap) = IPV4_RE.captures(inner) {
            cap.get(1).map(|g| g.as_str().to_string())
        } else {
            IPV6_RE.captures(inner).and_then(|cap| cap.get(1)).map(|g| g.as_str().to_string())
        }
    });

    let timestamp = raw.split_once(';').map(|(_, date)| date.trim().to_string());

    Some(ReceivedHop {
        from,
        by,
        with,
        id,
        ip,
        timestamp,
    })
}

fn check_alignment(message: &ParsedMessage) -> (bool, Option<String>) {
    let from_domain = message.from.first().and_then(|a| a.rsplit_once('@')).map(|(_, d)| d.to_lowercase());
    let rp_domain = message
        .return_path
        .as_deref()
        .map(|rp| rp.trim_matches(|c| c == '<' || c == '>'))
        .and_then(|rp| rp.rsplit_once('@'))
        .map(|(_, d)| d.to_lowercase());

    match (&from_domain, &rp_domain) {
        (Some(f), Some(r)) if f != r => (
            false,
            Some(format!("From domain '{f}' does not match Return-Path domain '{r}'")),
        ),
        _ => (true, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_message;

    #[test]
    fn flags_missing_required_headers() {
        let raw = b"Subject: hi\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let analysis = analyze_headers(&msg);
        assert!(analysis.score < 100);
        assert!(!analysis.required_present.iter().all(|(_, p)| *p));
    }

    #[test]
    fn validates_message_id_form() {
        assert!(validate_message_id(Some("<abc@example.com>")));
        assert!(!validate_message_id(Some("abc@example.com")));
        assert!(!validate_message_id(Some("<abc@@example.com>")));
        assert!(!validate_message_id(Some("<@example.com>")));
        assert!(!validate_message_id(None));
    }

    #[test]
    fn parses_received_hop_with_ip_and_date() {
        let raw = "from mail.example.com (mail.example.com [203.0.113.9]) by mx.receiver.test with ESMTP id AB12; Mon, 1 Jan 2024 00:00:00 +0000";
        let hop = parse_received_hop(raw).unwrap();
        assert_eq!(hop.ip.as_deref(), Some("203.0.113.9"));
        assert!(hop.timestamp.as_deref().unwrap().contains("2024"));
    }

    #[test]
    fn hop_without_from_or_by_is_dropped() {
        assert!(parse_received_hop("with ESMTP id AB12").is_none());
    }

    #[test]
    fn ip_is_found_in_a_later_paren_when_first_has_none() {
        let raw = "from mail.example.com (envelope-id EF-001) by mx.receiver.test (203.0.113.9) with ESMTP; Mon, 1 Jan 2024 00:00:00 +0000";
        let hop = parse_received_hop(raw).unwrap();
        assert_eq!(hop.ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn detects_from_return_path_mismatch() {
        let raw = b"From: user@example.com\r\nReturn-Path: <bounce@other.com>\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let analysis = analyze_headers(&msg);
        assert!(!analysis.alignment_ok);
        assert!(analysis.alignment_issue.is_some());
    }
}
