//! ARC (RFC 8617) chain validation (part of C4).
//!
//! A chain is valid iff the three header lists have equal length and the
//! multiset of `i=N` instance tags across all three equals `{1, ..., N}`. An
//! empty chain is valid.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::message::HeaderMap;

use super::AuthOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcResult {
    pub result: AuthOutcome,
    pub chain_length: usize,
    pub chain_valid: bool,
    pub details: Option<String>,
}

static INSTANCE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bi=(\d+)").unwrap());

fn instance_tags(values: &[String]) -> Vec<u32> {
    values
        .iter()
        .filter_map(|v| INSTANCE_TAG.captures(v))
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .collect()
}

pub fn validate_arc_chain(headers: &HeaderMap) -> ArcResult {
    let aar = headers.get_all("ARC-Authentication-Results").to_vec();
    let ams = headers.get_all("ARC-Message-Signature").to_vec();
    let seal = headers.get_all("ARC-Seal").to_vec();

    let chain_length = seal.len();

    if aar.is_empty() && ams.is_empty() && seal.is_empty() {
        return ArcResult {
            result: AuthOutcome::None,
            chain_length: 0,
            chain_valid: true,
            details: None,
        };
    }

    let equal_lengths = aar.len() == ams.len() && ams.len() == seal.len();

    let mut aar_tags = instance_tags(&aar);
    let mut ams_tags = instance_tags(&ams);
    let mut seal_tags = instance_tags(&seal);
    aar_tags.sort_unstable();
    ams_tags.sort_unstable();
    seal_tags.sort_unstable();

    let expected: Vec<u32> = (1..=chain_length as u32).collect();
    let tags_match = equal_lengths
        && aar_tags == expected
        && ams_tags == expected
        && seal_tags == expected;

    let chain_valid = equal_lengths && tags_match;

    let result = if chain_length == 0 {
        AuthOutcome::None
    } else if !chain_valid {
        AuthOutcome::Fail
    } else {
        AuthOutcome::Pass
    };

    let details = if chain_valid {
        None
    } else {
        Some(format!(
            "ARC header counts aar={} ams={} seal={} do not form a valid chain",
            aar.len(),
            ams.len(),
            seal.len()
        ))
    };

    ArcResult {
        result,
        chain_length,
        chain_valid,
        details,
    }
}
