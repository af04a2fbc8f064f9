//! DNS Analyzer (C5).
//!
//! Drives the resolver port to retrieve and validate MX/SPF/DKIM/DMARC/BIMI
//! and PTR records tied to the message's domains. No resolver failure
//! aborts analysis: every sub-result is either valid with data, or invalid
//! with a human-readable error (spec §4.3 "Failure semantics").

use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;

use crate::auth::AuthenticationResults;
use crate::config::Config;
use crate::dns::{DnsResolverPort, MxRecord};
use crate::headers::ReceivedHop;

pub const MAX_SPF_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllQualifier {
    Plus,
    Minus,
    Tilde,
    Question,
    Unset,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpfRecordEntry {
    pub domain: String,
    pub raw: Option<String>,
    pub valid: bool,
    pub all_qualifier: AllQualifier,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DkimRecord {
    pub domain: String,
    pub selector: String,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DmarcPolicy {
    None,
    Quarantine,
    Reject,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Relaxed,
    Strict,
}

#[derive(Debug, Clone, Serialize)]
pub struct DmarcRecord {
    pub domain: String,
    pub raw: Option<String>,
    pub valid: bool,
    pub policy: DmarcPolicy,
    pub subdomain_policy: Option<DmarcPolicy>,
    pub percentage: Option<u8>,
    pub aspf: Alignment,
    pub adkim: Alignment,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BimiRecord {
    pub domain: String,
    pub selector: String,
    pub valid: bool,
    pub logo: Option<String>,
    pub vmc: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MxRecordDto {
    pub host: String,
    pub preference: u16,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PtrResult {
    pub ip: String,
    pub ptr_names: Vec<String>,
    pub forward_ips: Vec<String>,
    pub fcrdns_pass: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DnsResults {
    pub spf: Vec<SpfRecordEntry>,
    pub dkim: Vec<DkimRecord>,
    pub dmarc: Option<DmarcRecord>,
    pub bimi: Option<BimiRecord>,
    pub mx: Vec<MxRecordDto>,
    pub ptr: Option<PtrResult>,
}

/// Runs the full DNS Analyzer for the `From` domain (and the `Return-Path`
/// domain, if different), using DKIM selectors surfaced by the
/// Authentication Analyzer and the first `Received` hop's IP for PTR/FCrDNS.
pub async fn analyze_dns(
    resolver: &dyn DnsResolverPort,
    config: &Config,
    from_domain: &str,
    return_path_domain: Option<&str>,
    auth: &AuthenticationResults,
    received_chain: &[ReceivedHop],
) -> DnsResults {
    let deadline = config.dns_timeout;
    let mut results = DnsResults::default();

    if !from_domain.is_empty() {
        let mut visited = HashSet::new();
        results.spf = resolve_spf(resolver, from_domain, 0, &mut visited, deadline).await;
        results.mx = lookup_mx(resolver, from_domain, deadline).await;
        results.dmarc = Some(lookup_dmarc(resolver, from_domain, deadline).await);
        results.bimi = Some(lookup_bimi(resolver, from_domain, "default", deadline).await);

        if let Some(rp_domain) = return_path_domain {
            if !rp_domain.eq_ignore_ascii_case(from_domain) {
                let mut rp_visited = HashSet::new();
                results
                    .spf
                    .extend(resolve_spf(resolver, rp_domain, 0, &mut rp_visited, deadline).await);
            }
        }
    }

    let selectors: Vec<(String, String)> = auth
        .dkim
        .iter()
        .filter_map(|d| Some((d.domain.clone()?, d.selector.clone()?)))
        .collect();
    let fanout = config.max_fanout.max(1);
    for chunk in selectors.chunks(fanout) {
        let futures = chunk
            .iter()
            .map(|(domain, selector)| lookup_dkim(resolver, domain, selector, deadline));
        let chunk_results = futures::future::join_all(futures).await;
        results.dkim.extend(chunk_results);
    }

    if let Some(hop) = received_chain.iter().find(|h| h.ip.is_some()) {
        let ip = hop.ip.clone().unwrap();
        results.ptr = Some(resolve_ptr(resolver, &ip, deadline).await);
    }

    results
}

/// Scores the DNS-record half of the authentication category: each of
/// SPF/DKIM/DMARC/MX contributes equally, crediting only validated, erroring
/// the same as absent. BIMI is a bonus, not a deduction, since its absence is
/// normal for most senders.
pub fn score_dns(results: &DnsResults) -> u8 {
    let spf_ok = !results.spf.is_empty() && results.spf.iter().any(|e| e.valid && e.error.is_none());
    let dkim_ok = results.dkim.iter().any(|d| d.valid);
    let dmarc_ok = results.dmarc.as_ref().map(|d| d.valid).unwrap_or(false);
    let mx_ok = !results.mx.is_empty();

    let base = [spf_ok, dkim_ok, dmarc_ok, mx_ok]
        .iter()
        .filter(|&&ok| ok)
        .count() as f64
        * 25.0;

    let bimi_bonus = match &results.bimi {
        Some(b) if b.valid => 5.0,
        _ => 0.0,
    };

    (base + bimi_bonus).min(100.0) as u8
}

fn resolve_spf<'a>(
    resolver: &'a dyn DnsResolverPort,
    domain: &'a str,
    depth: usize,
    visited: &'a mut HashSet<String>,
    deadline: Duration,
) -> Pin<Box<dyn Future<Output = Vec<SpfRecordEntry>> + Send + 'a>> {
    Box::pin(async move {
        if depth >= MAX_SPF_DEPTH {
            return vec![SpfRecordEntry {
                domain: domain.to_string(),
                raw: None,
                valid: false,
                all_qualifier: AllQualifier::Unset,
                error: Some(format!(
                    "SPF resolution exceeded maximum depth of {MAX_SPF_DEPTH}"
                )),
            }];
        }

        let lower = domain.to_lowercase();
        if visited.contains(&lower) {
            return Vec::new();
        }
        visited.insert(lower);

        let txt = match resolver.lookup_txt(domain, deadline).await {
            Ok(records) => records,
            Err(e) => {
                return vec![SpfRecordEntry {
                    domain: domain.to_string(),
                    raw: None,
                    valid: false,
                    all_qualifier: AllQualifier::Unset,
                    error: Some(format!("DNS error resolving SPF: {e}")),
                }]
            }
        };

        let candidates: Vec<&String> = txt.iter().filter(|t| t.starts_with("v=spf1")).collect();
        if candidates.is_empty() {
            return vec![SpfRecordEntry {
                domain: domain.to_string(),
                raw: None,
                valid: false,
                all_qualifier: AllQualifier::Unset,
                error: Some("No SPF record".to_string()),
            }];
        }
        if candidates.len() > 1 {
            return vec![SpfRecordEntry {
                domain: domain.to_string(),
                raw: Some(candidates[0].clone()),
                valid: false,
                all_qualifier: AllQualifier::Unset,
                error: Some("Multiple SPF records found (RFC violation)".to_string()),
            }];
        }

        let raw = candidates[0].clone();
        let is_apex = depth == 0;

        let mut errors = Vec::new();
        let mut includes = Vec::new();
        let mut redirect = None;
        let mut all_qualifier = AllQualifier::Unset;

        for tok in raw.split_whitespace().skip(1) {
            let (qualifier, mech) = strip_qualifier(tok);
            if mech.eq_ignore_ascii_case("all") {
                all_qualifier = qualifier;
                continue;
            }
            if let Some(target) = ci_strip_prefix(mech, "include:") {
                if let Some(err) = validate_token(mech) {
                    errors.push(err);
                } else {
                    includes.push(target.to_string());
                }
                continue;
            }
            if let Some(target) = ci_strip_prefix(mech, "redirect=") {
                if let Some(err) = validate_token(mech) {
                    errors.push(err);
                } else {
                    redirect = Some(target.to_string());
                }
                continue;
            }
            if let Some(err) = validate_token(mech) {
                errors.push(err);
            }
        }

        if is_apex && redirect.is_none() && matches!(all_qualifier, AllQualifier::Unset) {
            errors.push("apex SPF record does not terminate with an 'all' mechanism".to_string());
        }

        let mut entry = SpfRecordEntry {
            domain: domain.to_string(),
            raw: Some(raw),
            valid: errors.is_empty(),
            all_qualifier: if is_apex { all_qualifier } else { AllQualifier::Unset },
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
        };

        if let Some(target) = redirect {
            // A redirect replaces the current domain's policy entirely:
            // recurse into it and stop, ignoring any includes.
            entry.all_qualifier = AllQualifier::Unset;
            let mut out = vec![entry];
            out.extend(resolve_spf(resolver, &target, depth + 1, visited, deadline).await);
            return out;
        }

        let mut out = vec![entry];
        for include in includes {
            out.extend(resolve_spf(resolver, &include, depth + 1, visited, deadline).await);
        }
        out
    })
}

fn strip_qualifier(tok: &str) -> (AllQualifier, &str) {
    match tok.chars().next() {
        Some('+') => (AllQualifier::Plus, &tok[1..]),
        Some('-') => (AllQualifier::Minus, &tok[1..]),
        Some('~') => (AllQualifier::Tilde, &tok[1..]),
        Some('?') => (AllQualifier::Question, &tok[1..]),
        _ => (AllQualifier::Plus, tok),
    }
}

fn ci_strip_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

const PREFIXED_MECHANISMS: [&str; 9] = [
    "include:", "a:", "a/", "mx:", "mx/", "ptr:", "ip4:", "ip6:", "exists:",
];
const MODIFIERS: [&str; 5] = ["redirect=", "exp=", "ra=", "rp=", "rr="];
const STANDALONE: [&str; 4] = ["all", "a", "mx", "ptr"];
const MECHANISM_BASES: [&str; 7] = ["include", "a", "mx", "ptr", "ip4", "ip6", "exists"];

fn validate_token(mech: &str) -> Option<String> {
    let lower = mech.to_ascii_lowercase();
    if STANDALONE.contains(&lower.as_str()) {
        return None;
    }
    if PREFIXED_MECHANISMS.iter().any(|p| ci_strip_prefix(mech, p).is_some()) {
        return None;
    }
    if MODIFIERS.iter().any(|m| ci_strip_prefix(mech, m).is_some()) {
        return None;
    }
    for base in MECHANISM_BASES {
        let wrong = format!("{base}=");
        if let Some(rest) = ci_strip_prefix(mech, &wrong) {
            return Some(format!(
                "mechanism '{base}' uses '=' instead of ':' — did you mean '{base}:{rest}'?"
            ));
        }
    }
    Some(format!("unrecognized SPF mechanism/modifier: '{mech}'"))
}

async fn lookup_mx(resolver: &dyn DnsResolverPort, domain: &str, deadline: Duration) -> Vec<MxRecordDto> {
    match resolver.lookup_mx(domain, deadline).await {
        Ok(records) if !records.is_empty() => records
            .into_iter()
            .map(|MxRecord { host, preference }| MxRecordDto {
                host,
                preference,
                valid: true,
                error: None,
            })
            .collect(),
        Ok(_) => vec![MxRecordDto {
            host: String::new(),
            preference: 0,
            valid: false,
            error: Some("No MX records found".to_string()),
        }],
        Err(e) => vec![MxRecordDto {
            host: String::new(),
            preference: 0,
            valid: false,
            error: Some(e.to_string()),
        }],
    }
}

async fn lookup_dkim(
    resolver: &dyn DnsResolverPort,
    domain: &str,
    selector: &str,
    deadline: Duration,
) -> DkimRecord {
    let name = format!("{selector}._domainkey.{domain}");
    match resolver.lookup_txt(&name, deadline).await {
        Ok(records) => {
            let concatenated = records.concat();
            let mut error = None;
            if !concatenated.contains("p=") {
                error = Some("missing required p= tag".to_string());
            } else if let Some(v) = extract_plain_tag(&concatenated, "v=") {
                if v != "DKIM1" {
                    error = Some(format!("unexpected v= tag: {v}"));
                }
            }
            DkimRecord {
                domain: domain.to_string(),
                selector: selector.to_string(),
                valid: error.is_none(),
                error,
            }
        }
        Err(e) => DkimRecord {
            domain: domain.to_string(),
            selector: selector.to_string(),
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

async fn lookup_dmarc(resolver: &dyn DnsResolverPort, domain: &str, deadline: Duration) -> DmarcRecord {
    let name = format!("_dmarc.{domain}");
    match resolver.lookup_txt(&name, deadline).await {
        Ok(records) => match records.into_iter().find(|r| r.starts_with("v=DMARC1")) {
            Some(raw) => {
                let policy = parse_dmarc_policy(extract_plain_tag(&raw, "p=").as_deref());
                let subdomain_policy =
                    extract_plain_tag(&raw, "sp=").map(|v| parse_dmarc_policy(Some(&v)));
                let percentage = extract_plain_tag(&raw, "pct=")
                    .and_then(|v| v.parse::<u8>().ok())
                    .filter(|p| *p <= 100);
                let aspf = parse_alignment(extract_plain_tag(&raw, "aspf=").as_deref());
                let adkim = parse_alignment(extract_plain_tag(&raw, "adkim=").as_deref());
                DmarcRecord {
                    domain: domain.to_string(),
                    raw: Some(raw),
                    valid: true,
                    policy,
                    subdomain_policy,
                    percentage,
                    aspf,
                    adkim,
                    error: None,
                }
            }
            None => DmarcRecord {
                domain: domain.to_string(),
                raw: None,
                valid: false,
                policy: DmarcPolicy::Unknown,
                subdomain_policy: None,
                percentage: None,
                aspf: Alignment::Relaxed,
                adkim: Alignment::Relaxed,
                error: Some("No DMARC record".to_string()),
            },
        },
        Err(e) => DmarcRecord {
            domain: domain.to_string(),
            raw: None,
            valid: false,
            policy: DmarcPolicy::Unknown,
            subdomain_policy: None,
            percentage: None,
            aspf: Alignment::Relaxed,
            adkim: Alignment::Relaxed,
            error: Some(e.to_string()),
        },
    }
}

fn parse_dmarc_policy(value: Option<&str>) -> DmarcPolicy {
    match value {
        Some("none") => DmarcPolicy::None,
        Some("quarantine") => DmarcPolicy::Quarantine,
        Some("reject") => DmarcPolicy::Reject,
        _ => DmarcPolicy::Unknown,
    }
}

fn parse_alignment(value: Option<&str>) -> Alignment {
    match value {
        Some("strict") => Alignment::Strict,
        _ => Alignment::Relaxed,
    }
}

async fn lookup_bimi(
    resolver: &dyn DnsResolverPort,
    domain: &str,
    selector: &str,
    deadline: Duration,
) -> BimiRecord {
    let name = format!("{selector}._bimi.{domain}");
    match resolver.lookup_txt(&name, deadline).await {
        Ok(records) => {
            let concatenated = records.concat();
            if !concatenated.starts_with("v=BIMI1") {
                return BimiRecord {
                    domain: domain.to_string(),
                    selector: selector.to_string(),
                    valid: false,
                    logo: None,
                    vmc: None,
                    error: Some("No BIMI record".to_string()),
                };
            }
            let logo = extract_plain_tag(&concatenated, "l=");
            let vmc = extract_plain_tag(&concatenated, "a=");
            let valid = logo.is_some();
            let error = if valid {
                None
            } else {
                Some("BIMI record missing required l= tag".to_string())
            };
            BimiRecord {
                domain: domain.to_string(),
                selector: selector.to_string(),
                valid,
                logo,
                vmc,
                error,
            }
        }
        Err(e) => BimiRecord {
            domain: domain.to_string(),
            selector: selector.to_string(),
            valid: false,
            logo: None,
            vmc: None,
            error: Some(e.to_string()),
        },
    }
}

fn extract_plain_tag(text: &str, tag: &str) -> Option<String> {
    text.split(';').map(str::trim).find_map(|part| {
        if part.len() > tag.len() && part[..tag.len()].eq_ignore_ascii_case(tag) {
            Some(part[tag.len()..].trim().to_string())
        } else {
            None
        }
    })
}

async fn resolve_ptr(resolver: &dyn DnsResolverPort, ip: &str, deadline: Duration) -> PtrResult {
    let parsed_ip: IpAddr = match ip.parse() {
        Ok(ip) => ip,
        Err(_) => {
            return PtrResult {
                ip: ip.to_string(),
                ptr_names: Vec::new(),
                forward_ips: Vec::new(),
                fcrdns_pass: false,
                error: Some("invalid IP literal".to_string()),
            }
        }
    };

    let ptr_names = match resolver.lookup_addr(parsed_ip, deadline).await {
        Ok(names) => names,
        Err(e) => {
            return PtrResult {
                ip: ip.to_string(),
                ptr_names: Vec::new(),
                forward_ips: Vec::new(),
                fcrdns_pass: false,
                error: Some(e.to_string()),
            }
        }
    };

    let mut forward_ips = Vec::new();
    for name in &ptr_names {
        if let Ok(ips) = resolver.lookup_host(name, deadline).await {
            forward_ips.extend(ips.iter().map(|ip| ip.to_string()));
        }
    }

    let fcrdns_pass = forward_ips.iter().any(|fwd| fwd == ip);

    PtrResult {
        ip: ip.to_string(),
        ptr_names,
        forward_ips,
        fcrdns_pass,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::MockResolver;
    use std::time::Duration;

    #[tokio::test]
    async fn spf_apex_strict_all_is_valid() {
        let resolver = MockResolver::new().with_txt("example.com", vec!["v=spf1 -all".to_string()]);
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "example.com", 0, &mut visited, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].valid);
        assert_eq!(entries[0].all_qualifier, AllQualifier::Minus);
    }

    #[tokio::test]
    async fn spf_include_cycle_terminates_without_duplicates() {
        let resolver = MockResolver::new()
            .with_txt("example.com", vec!["v=spf1 include:_spf.example.com -all".to_string()])
            .with_txt("_spf.example.com", vec!["v=spf1 include:example.com -all".to_string()]);
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "example.com", 0, &mut visited, Duration::from_secs(1)).await;
        // apex + one include; the cyclic back-reference resolves to nothing.
        assert_eq!(entries.len(), 2);
        assert!(entries[0].valid);
        assert_eq!(entries[0].domain, "example.com");
        assert_eq!(entries[1].domain, "_spf.example.com");
    }

    #[tokio::test]
    async fn spf_depth_limit_is_enforced() {
        let mut resolver = MockResolver::new();
        for i in 0..15 {
            let domain = format!("d{i}.example.com");
            let next = format!("d{}.example.com", i + 1);
            resolver = resolver.with_txt(&domain, vec![format!("v=spf1 include:{next} -all")]);
        }
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "d0.example.com", 0, &mut visited, Duration::from_secs(1)).await;
        assert!(entries.len() <= MAX_SPF_DEPTH + 1);
        assert!(entries.last().unwrap().error.as_deref().unwrap().contains("maximum depth"));
    }

    #[tokio::test]
    async fn spf_redirect_replaces_policy_and_skips_includes() {
        let resolver = MockResolver::new()
            .with_txt(
                "example.com",
                vec!["v=spf1 include:should-be-skipped.com redirect=_spf.example.net".to_string()],
            )
            .with_txt("_spf.example.net", vec!["v=spf1 -all".to_string()]);
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "example.com", 0, &mut visited, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].domain, "_spf.example.net");
    }

    #[tokio::test]
    async fn spf_multiple_records_is_rfc_violation() {
        let resolver = MockResolver::new().with_txt(
            "example.com",
            vec!["v=spf1 -all".to_string(), "v=spf1 ~all".to_string()],
        );
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "example.com", 0, &mut visited, Duration::from_secs(1)).await;
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].valid);
        assert!(entries[0].error.as_deref().unwrap().contains("Multiple SPF"));
    }

    #[tokio::test]
    async fn spf_detects_equals_instead_of_colon_mistake() {
        let resolver =
            MockResolver::new().with_txt("example.com", vec!["v=spf1 include=example.net -all".to_string()]);
        let mut visited = HashSet::new();
        let entries = resolve_spf(&resolver, "example.com", 0, &mut visited, Duration::from_secs(1)).await;
        assert!(!entries[0].valid);
        assert!(entries[0].error.as_deref().unwrap().contains("instead of"));
    }

    #[tokio::test]
    async fn dmarc_record_parses_tags() {
        let resolver = MockResolver::new().with_txt(
            "_dmarc.example.com",
            vec!["v=DMARC1; p=reject; sp=quarantine; pct=50; aspf=strict".to_string()],
        );
        let record = lookup_dmarc(&resolver, "example.com", Duration::from_secs(1)).await;
        assert!(record.valid);
        assert_eq!(record.policy, DmarcPolicy::Reject);
        assert_eq!(record.subdomain_policy, Some(DmarcPolicy::Quarantine));
        assert_eq!(record.percentage, Some(50));
        assert_eq!(record.aspf, Alignment::Strict);
        assert_eq!(record.adkim, Alignment::Relaxed);
    }

    #[tokio::test]
    async fn dmarc_out_of_range_percentage_is_ignored() {
        let resolver = MockResolver::new()
            .with_txt("_dmarc.example.com", vec!["v=DMARC1; p=reject; pct=150".to_string()]);
        let record = lookup_dmarc(&resolver, "example.com", Duration::from_secs(1)).await;
        assert_eq!(record.percentage, None);
    }

    #[tokio::test]
    async fn dkim_requires_p_tag() {
        let resolver = MockResolver::new().with_txt("s1._domainkey.example.com", vec!["v=DKIM1".to_string()]);
        let record = lookup_dkim(&resolver, "example.com", "s1", Duration::from_secs(1)).await;
        assert!(!record.valid);
    }

    #[tokio::test]
    async fn bimi_requires_v_and_l() {
        let resolver = MockResolver::new()
            .with_txt("default._bimi.example.com", vec!["v=BIMI1; l=https://example.com/logo.svg".to_string()]);
        let record = lookup_bimi(&resolver, "example.com", "default", Duration::from_secs(1)).await;
        assert!(record.valid);
        assert_eq!(record.logo.as_deref(), Some("https://example.com/logo.svg"));
    }

    #[tokio::test]
    async fn fcrdns_passes_when_forward_matches() {
        use std::net::IpAddr;
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        let resolver = MockResolver::new()
            .with_addr(ip, vec!["mail.example.com".to_string()])
            .with_host("mail.example.com", vec![ip]);
        let result = resolve_ptr(&resolver, "1.2.3.4", Duration::from_secs(1)).await;
        assert!(result.fcrdns_pass);
    }

    #[test]
    fn score_dns_rewards_each_valid_record_type() {
        let results = DnsResults {
            spf: vec![SpfRecordEntry {
                domain: "example.com".to_string(),
                raw: Some("v=spf1 -all".to_string()),
                valid: true,
                all_qualifier: AllQualifier::Minus,
                error: None,
            }],
            dkim: vec![DkimRecord {
                domain: "example.com".to_string(),
                selector: "s1".to_string(),
                valid: true,
                error: None,
            }],
            dmarc: Some(DmarcRecord {
                domain: "example.com".to_string(),
                raw: Some("v=DMARC1; p=reject".to_string()),
                valid: true,
                policy: DmarcPolicy::Reject,
                subdomain_policy: None,
                percentage: Some(100),
                aspf: Alignment::Relaxed,
                adkim: Alignment::Relaxed,
                error: None,
            }),
            bimi: None,
            mx: vec![MxRecordDto {
                host: "mx.example.com".to_string(),
                preference: 10,
                valid: true,
                error: None,
            }],
            ptr: None,
        };
        assert_eq!(score_dns(&results), 100);
    }

    #[test]
    fn score_dns_is_zero_when_everything_absent() {
        let results = DnsResults::default();
        assert_eq!(score_dns(&results), 0);
    }
}
