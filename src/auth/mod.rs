//! Authentication Analyzer (C4).
//!
//! Populates [`AuthenticationResults`] from headers already present on the
//! message, without performing any cryptographic verification — only
//! metadata extraction, per spec §1 Non-goals.

pub mod arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::message::ParsedMessage;

pub use arc::{validate_arc_chain, ArcResult};

/// Uniform result keyword used across SPF/DKIM/DMARC/BIMI/IPRev/X-*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthOutcome {
    Pass,
    Fail,
    Neutral,
    SoftFail,
    None,
    TempError,
    PermError,
    Declined,
}

impl AuthOutcome {
    fn parse(word: &str) -> Self {
        match word.to_ascii_lowercase().as_str() {
            "pass" => AuthOutcome::Pass,
            "fail" => AuthOutcome::Fail,
            "neutral" => AuthOutcome::Neutral,
            "softfail" => AuthOutcome::SoftFail,
            "temperror" => AuthOutcome::TempError,
            "permerror" => AuthOutcome::PermError,
            "declined" => AuthOutcome::Declined,
            _ => AuthOutcome::None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResult {
    pub result: AuthOutcome,
    pub domain: Option<String>,
    pub selector: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IpRevResult {
    pub result: AuthOutcome,
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub details: Option<String>,
}

/// Aggregate holding every method's parsed result for one message.
#[derive(Debug, Clone, Serialize, Default)]
pub struct AuthenticationResults {
    pub spf: Option<AuthResult>,
    pub dkim: Vec<AuthResult>,
    pub dmarc: Option<AuthResult>,
    pub bimi: Option<AuthResult>,
    pub arc: Option<ArcResult>,
    pub iprev: Option<IpRevResult>,
    pub x_google_dkim: Option<AuthResult>,
    pub x_aligned_from: Option<AuthResult>,
}

/// Entry point: builds the full [`AuthenticationResults`] for a message.
pub fn analyze_authentication(message: &ParsedMessage, local_hostname: &str) -> AuthenticationResults {
    let mut agg = AuthenticationResults::default();

    for header_value in message.headers.get_all("Authentication-Results") {
        parse_authentication_results_header(header_value, local_hostname, &mut agg);
    }

    if agg.spf.is_none() {
        if let Some(received_spf) = message.headers.get_first("Received-Spf") {
            agg.spf = Some(parse_received_spf(received_spf));
        }
    }

    if agg.dkim.is_empty() {
        for sig in message.headers.get_all("Dkim-Signature") {
            agg.dkim.push(parse_legacy_dkim_signature(sig));
        }
    }

    agg.arc = Some(validate_arc_chain(&message.headers));

    agg
}

fn parse_authentication_results_header(h: &str, local_hostname: &str, agg: &mut AuthenticationResults) {
    let mut segments = h.split(';');
    let authserv_raw = segments.next().unwrap_or("").trim();

    if !local_hostname.is_empty() {
        let authserv_id = authserv_raw.split_whitespace().next().unwrap_or("");
        if !authserv_id.eq_ignore_ascii_case(local_hostname) {
            return;
        }
    }

    for seg in segments {
        let seg = seg.trim();
        if seg.is_empty() {
            continue;
        }
        let first_tok = match seg.split_whitespace().next() {
            Some(t) => t,
            None => continue,
        };
        let method = match first_tok.split_once('=') {
            Some((m, _)) => m.to_ascii_lowercase(),
            None => continue,
        };

        match method.as_str() {
            "spf" if agg.spf.is_none() => agg.spf = Some(parse_spf_result(seg)),
            "dkim" => agg.dkim.push(parse_dkim_result(seg)),
            "dmarc" if agg.dmarc.is_none() => agg.dmarc = Some(parse_dmarc_result(seg)),
            "bimi" if agg.bimi.is_none() => agg.bimi = Some(parse_bimi_result(seg)),
            "iprev" if agg.iprev.is_none() => agg.iprev = Some(parse_iprev_result(seg)),
            "x-google-dkim" if agg.x_google_dkim.is_none() => {
                agg.x_google_dkim = Some(parse_x_google_dkim_result(seg))
            }
            "x-aligned-from" if agg.x_aligned_from.is_none() => {
                agg.x_aligned_from = Some(parse_x_aligned_from_result(seg))
            }
            // `arc=` is informational only; the authoritative ARCResult is
            // derived from the ARC-Seal/ARC-Message-Signature/
            // ARC-Authentication-Results chain (see arc.rs), per the
            // ARC chain validation invariant.
            "arc" => {}
            _ => {}
        }
    }
}

static PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(([^)]*)\)").unwrap());

fn first_parenthesized(segment: &str) -> Option<String> {
    PAREN
        .captures(segment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn leading_result(segment: &str) -> AuthOutcome {
    let first_tok = segment.split_whitespace().next().unwrap_or("");
    match first_tok.split_once('=') {
        Some((_, v)) => AuthOutcome::parse(v.trim_matches(|c: char| !c.is_alphanumeric())),
        None => AuthOutcome::None,
    }
}

fn extract_tag(segment: &str, tags: &[&str]) -> Option<String> {
    let tokens: Vec<&str> = segment.split_whitespace().collect();
    for tag in tags {
        for tok in &tokens {
            let tok_trim = tok.trim_matches(|c| c == ';' || c == ',');
            if tok_trim.len() > tag.len() && tok_trim[..tag.len()].eq_ignore_ascii_case(tag) {
                let val = tok_trim[tag.len()..].trim_end_matches(|c| c == ';' || c == ',');
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

fn domain_after_at(value: &str) -> String {
    match value.rsplit_once('@') {
        Some((_, domain)) => domain.trim_end_matches('>').to_string(),
        None => value.to_string(),
    }
}

fn parse_spf_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["smtp.mailfrom="]).map(|v| domain_after_at(&v));
    let details = first_parenthesized(segment);
    AuthResult {
        result,
        domain,
        selector: None,
        details,
    }
}

fn parse_received_spf(value: &str) -> AuthResult {
    let first = value.split_whitespace().next().unwrap_or("");
    let result = AuthOutcome::parse(first);
    let domain = extract_tag(value, &["envelope-from=", "sender="]).map(|v| domain_after_at(&v));
    AuthResult {
        result,
        domain,
        selector: None,
        details: None,
    }
}

fn parse_dkim_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["header.d=", "d="]);
    let selector = extract_tag(segment, &["header.s=", "s="]);
    let details = first_parenthesized(segment);
    AuthResult {
        result,
        domain,
        selector,
        details,
    }
}

fn parse_legacy_dkim_signature(sig: &str) -> AuthResult {
    let mut domain = None;
    let mut selector = None;
    for part in sig.split(';') {
        let part = part.trim();
        if let Some((k, v)) = part.split_once('=') {
            match k.trim() {
                "d" => domain = Some(v.trim().to_string()),
                "s" => selector = Some(v.trim().to_string()),
                _ => {}
            }
        }
    }
    AuthResult {
        result: AuthOutcome::None,
        domain,
        selector,
        details: Some("DKIM signature present (verification status unknown)".to_string()),
    }
}

fn parse_dmarc_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["header.from="]);
    AuthResult {
        result,
        domain,
        selector: None,
        details: None,
    }
}

fn parse_bimi_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["header.d=", "d="]);
    let selector = extract_tag(segment, &["header.selector=", "selector="]);
    AuthResult {
        result,
        domain,
        selector,
        details: None,
    }
}

fn parse_iprev_result(segment: &str) -> IpRevResult {
    let result = leading_result(segment);
    let ip = extract_tag(segment, &["smtp.remote-ip=", "remote-ip="]);
    let hostname = first_parenthesized(segment);
    IpRevResult {
        result,
        ip,
        hostname,
        details: None,
    }
}

fn parse_x_google_dkim_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["header.d=", "d="]);
    AuthResult {
        result,
        domain,
        selector: None,
        details: first_parenthesized(segment),
    }
}

fn parse_x_aligned_from_result(segment: &str) -> AuthResult {
    let result = leading_result(segment);
    let domain = extract_tag(segment, &["header.from=", "from="]);
    AuthResult {
        result,
        domain,
        selector: None,
        details: first_parenthesized(segment),
    }
}

/// Scores the authentication category (0-100) from the aggregate.
///
/// Each present method contributes a 0-100 percentage, weighted per spec
/// §4.2 (SPF 25, DKIM 23, DMARC 25, BIMI 10, IPRev 15, X-Google-DKIM 12,
/// X-Aligned-From 2), then normalized by the sum of weights for methods
/// actually present on the message so an email that simply doesn't carry
/// BIMI or X-Google-DKIM headers isn't penalized for their absence.
pub fn score_authentication(results: &AuthenticationResults) -> u8 {
    let mut weighted_sum: f64 = 0.0;
    let mut total_weight: f64 = 0.0;

    if let Some(spf) = &results.spf {
        let pct = score_spf(spf, results.dmarc.as_ref());
        weighted_sum += pct * 25.0;
        total_weight += 25.0;
    }

    if !results.dkim.is_empty() {
        let pct = results
            .dkim
            .iter()
            .map(|d| score_outcome(d.result))
            .fold(0.0_f64, f64::max);
        weighted_sum += pct * 23.0;
        total_weight += 23.0;
    }

    if let Some(dmarc) = &results.dmarc {
        weighted_sum += score_outcome(dmarc.result) * 25.0;
        total_weight += 25.0;
    }

    if let Some(bimi) = &results.bimi {
        weighted_sum += score_outcome(bimi.result) * 10.0;
        total_weight += 10.0;
    }

    if let Some(iprev) = &results.iprev {
        weighted_sum += score_outcome(iprev.result) * 15.0;
        total_weight += 15.0;
    }

    if let Some(xgd) = &results.x_google_dkim {
        weighted_sum += score_outcome(xgd.result) * 12.0;
        total_weight += 12.0;
    }

    if let Some(xaf) = &results.x_aligned_from {
        weighted_sum += score_outcome(xaf.result) * 2.0;
        total_weight += 2.0;
    }

    if total_weight == 0.0 {
        return 0;
    }

    ((weighted_sum / total_weight).clamp(0.0, 100.0)) as u8
}

fn score_outcome(outcome: AuthOutcome) -> f64 {
    match outcome {
        AuthOutcome::Pass => 100.0,
        AuthOutcome::Neutral => 50.0,
        AuthOutcome::SoftFail => 30.0,
        AuthOutcome::TempError => 40.0,
        AuthOutcome::Fail | AuthOutcome::PermError | AuthOutcome::None | AuthOutcome::Declined => 0.0,
    }
}

/// SPF's pass percentage is scaled down when the passing domain is not
/// aligned with the DMARC `aspf` policy for the `From` domain.
fn score_spf(spf: &AuthResult, dmarc: Option<&AuthResult>) -> f64 {
    if spf.result != AuthOutcome::Pass {
        return score_outcome(spf.result);
    }
    match (dmarc, &spf.domain) {
        (Some(dmarc_result), Some(spf_domain)) => match &dmarc_result.domain {
            Some(from_domain) if spf_domain.eq_ignore_ascii_case(from_domain) => 100.0,
            Some(from_domain) if from_domain.ends_with(spf_domain.as_str()) => 80.0,
            Some(_) => 60.0,
            None => 100.0,
        },
        _ => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_message;

    #[test]
    fn parses_full_authentication_results_header() {
        let raw = b"From: a@example.com\r\nAuthentication-Results: mx.receiver.test; spf=pass smtp.mailfrom=a@example.com; dkim=pass header.d=example.com header.s=s1; dmarc=pass header.from=example.com\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let results = analyze_authentication(&msg, "");

        let spf = results.spf.as_ref().unwrap();
        assert_eq!(spf.result, AuthOutcome::Pass);
        assert_eq!(spf.domain.as_deref(), Some("example.com"));

        assert_eq!(results.dkim.len(), 1);
        assert_eq!(results.dkim[0].domain.as_deref(), Some("example.com"));
        assert_eq!(results.dkim[0].selector.as_deref(), Some("s1"));

        let dmarc = results.dmarc.as_ref().unwrap();
        assert_eq!(dmarc.result, AuthOutcome::Pass);
        assert_eq!(dmarc.domain.as_deref(), Some("example.com"));

        assert!(score_authentication(&results) >= 90);
    }

    #[test]
    fn authentication_results_dkim_wins_over_legacy_signature() {
        let raw = b"From: a@example.com\r\nAuthentication-Results: host; dkim=pass header.d=verified.com header.s=s1\r\nDKIM-Signature: v=1; a=rsa-sha256; d=example.com; s=selector1; b=xyz\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let results = analyze_authentication(&msg, "");
        assert_eq!(results.dkim.len(), 1);
        assert_eq!(results.dkim[0].domain.as_deref(), Some("verified.com"));
        assert_eq!(results.dkim[0].result, AuthOutcome::Pass);
    }

    #[test]
    fn legacy_dkim_signature_used_when_no_authentication_results_dkim() {
        let raw = b"From: a@example.com\r\nDKIM-Signature: v=1; a=rsa-sha256; d=example.com; s=selector1; b=xyz\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let results = analyze_authentication(&msg, "");
        assert_eq!(results.dkim.len(), 1);
        assert_eq!(results.dkim[0].domain.as_deref(), Some("example.com"));
        assert_eq!(results.dkim[0].details.as_deref(), Some("DKIM signature present (verification status unknown)"));
    }

    #[test]
    fn filters_by_local_hostname() {
        let raw = b"From: a@example.com\r\nAuthentication-Results: other-host.test; spf=pass smtp.mailfrom=a@example.com\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let results = analyze_authentication(&msg, "mx.receiver.test");
        assert!(results.spf.is_none());
    }

    #[test]
    fn received_spf_fallback_used_when_no_ar_spf() {
        let raw = b"From: a@example.com\r\nReceived-SPF: pass (domain of example.com designates 1.2.3.4 as permitted sender) envelope-from=a@example.com\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let results = analyze_authentication(&msg, "");
        let spf = results.spf.unwrap();
        assert_eq!(spf.result, AuthOutcome::Pass);
        assert_eq!(spf.domain.as_deref(), Some("example.com"));
    }
}
