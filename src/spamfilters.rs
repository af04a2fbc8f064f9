//! SpamAssassin / Rspamd header parsers (C9).
//!
//! These filters run upstream of the analyzer and leave their verdicts in
//! headers; this module only parses what they already decided, it never
//! re-scores a message itself.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::message::ParsedMessage;

#[derive(Debug, Clone, Serialize)]
pub struct SpamAssassinResult {
    pub is_spam: Option<bool>,
    pub score: Option<f64>,
    pub required_score: Option<f64>,
    pub flag: Option<String>,
    pub checker_version: Option<String>,
    pub report_rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RspamdSymbol {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RspamdResult {
    pub score: f64,
    pub threshold: f64,
    pub is_spam: bool,
    pub action: Option<String>,
    pub symbols: Vec<RspamdSymbol>,
}

static SPAM_STATUS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(Yes|No)\s*,\s*score\s*=\s*(-?[\d.]+)\s+required\s*=\s*(-?[\d.]+)").unwrap()
});
static SPAMD_RESULT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:default\s*:\s*)?(-?[\d.]+)\s*/\s*([\d.]+)").unwrap());
static SPAMD_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z][A-Z0-9_]*)\((-?[\d.]+)\)").unwrap());
static REPORT_RULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*\*\s*(-?[\d.]+)\s+(\S+)").unwrap());

/// Parses `X-Spam-*` headers left by SpamAssassin, if present.
pub fn parse_spamassassin(message: &ParsedMessage) -> Option<SpamAssassinResult> {
    let flag = message.headers.get_first("X-Spam-Flag").map(|v| v.trim().to_string());
    let checker_version = message
        .headers
        .get_first("X-Spam-Checker-Version")
        .map(|v| v.trim().to_string());

    let status = message.headers.get_first("X-Spam-Status");
    let (is_spam, score, required_score) = match status {
        Some(raw) => match SPAM_STATUS_RE.captures(raw) {
            Some(caps) => (
                Some(caps[1].eq_ignore_ascii_case("yes")),
                caps[2].parse::<f64>().ok(),
                caps[3].parse::<f64>().ok(),
            ),
            None => (None, None, None),
        },
        None => (None, None, None),
    };

    let score = score.or_else(|| {
        message
            .headers
            .get_first("X-Spam-Score")
            .and_then(|v| v.trim().parse::<f64>().ok())
    });

    let report_rules: Vec<String> = message
        .headers
        .get_first("X-Spam-Report")
        .map(|raw| {
            REPORT_RULE_RE
                .captures_iter(raw)
                .map(|c| format!("{} ({})", &c[2], &c[1]))
                .collect()
        })
        .unwrap_or_default();

    if is_spam.is_none() && score.is_none() && flag.is_none() && checker_version.is_none() && report_rules.is_empty()
    {
        return None;
    }

    Some(SpamAssassinResult {
        is_spam,
        score,
        required_score,
        flag,
        checker_version,
        report_rules,
    })
}

/// Parses an `X-Spamd-Result` header left by Rspamd, if present.
pub fn parse_rspamd(message: &ParsedMessage) -> Option<RspamdResult> {
    let raw = message.headers.get_first("X-Spamd-Result")?;

    let mut lines = raw.lines();
    let first = lines.next().unwrap_or(raw);
    let caps = SPAMD_RESULT_RE.captures(first)?;
    let score: f64 = caps[1].parse().ok()?;
    let threshold: f64 = caps[2].parse().ok()?;

    let action = first
        .split(';')
        .nth(1)
        .map(|s| s.trim().trim_end_matches(';').to_string())
        .filter(|s| !s.is_empty());

    let symbols = SPAMD_SYMBOL_RE
        .captures_iter(raw)
        .filter_map(|c| {
            let score = c[2].parse::<f64>().ok()?;
            Some(RspamdSymbol {
                name: c[1].to_string(),
                score,
            })
        })
        .collect();

    Some(RspamdResult {
        score,
        threshold,
        is_spam: score >= threshold,
        action,
        symbols,
    })
}

/// `100` if clean, falling to `0` past the threshold, linearly scaled by how
/// far into "spam" territory the score sits relative to the required score.
pub fn score_spamassassin(result: &SpamAssassinResult) -> u8 {
    match (result.score, result.required_score) {
        (Some(score), Some(required)) if required > 0.0 => {
            if score <= 0.0 {
                100
            } else if score >= required {
                0
            } else {
                (100.0 * (1.0 - score / required)).clamp(0.0, 100.0) as u8
            }
        }
        _ => match result.is_spam {
            Some(true) => 0,
            Some(false) => 100,
            None => 100,
        },
    }
}

/// `1 − score / (2·threshold)` mapped into `[0, 100]`.
pub fn score_rspamd(result: &RspamdResult) -> u8 {
    if result.threshold <= 0.0 {
        return 100;
    }
    (100.0 * (1.0 - result.score / (2.0 * result.threshold))).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse_message;

    #[test]
    fn parses_clean_spamassassin_status() {
        let raw = b"From: a@example.com\r\nX-Spam-Status: No, score=-1.2 required=5.0 tests=HTML_MESSAGE\r\nX-Spam-Score: -1.2\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let result = parse_spamassassin(&msg).unwrap();
        assert_eq!(result.is_spam, Some(false));
        assert_eq!(result.score, Some(-1.2));
        assert_eq!(score_spamassassin(&result), 100);
    }

    #[test]
    fn flags_spam_above_required_score() {
        let raw = b"From: a@example.com\r\nX-Spam-Status: Yes, score=8.4 required=5.0\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let result = parse_spamassassin(&msg).unwrap();
        assert_eq!(result.is_spam, Some(true));
        assert_eq!(score_spamassassin(&result), 0);
    }

    #[test]
    fn parses_rspamd_result_with_symbols() {
        let raw = b"From: a@example.com\r\nX-Spamd-Result: default: False [2.50 / 15.00]; R_SPF_ALLOW(-0.20)[]; ARC_ALLOW(-1.0)\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let result = parse_rspamd(&msg).unwrap();
        assert_eq!(result.score, 2.5);
        assert_eq!(result.threshold, 15.0);
        assert!(!result.is_spam);
        assert!(score_rspamd(&result) > 50);
    }

    #[test]
    fn rspamd_score_at_threshold_is_fifty() {
        let raw = b"From: a@example.com\r\nX-Spamd-Result: default: True [15.00 / 15.00]; BAYES_SPAM(3.0)\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        let result = parse_rspamd(&msg).unwrap();
        assert!(result.is_spam);
        assert_eq!(score_rspamd(&result), 50);
    }

    #[test]
    fn missing_headers_yield_none() {
        let raw = b"From: a@example.com\r\n\r\nbody";
        let msg = parse_message(raw).unwrap();
        assert!(parse_spamassassin(&msg).is_none());
        assert!(parse_rspamd(&msg).is_none());
    }
}
