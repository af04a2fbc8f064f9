//! RBL Checker (C6).
//!
//! Extracts public source IPs from `Received` headers (falling back to
//! `X-Originating-IP`), then queries every configured DNSBL zone for each IP
//! via a reversed-octet `A` lookup.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::dns::{DnsError, DnsResolverPort};
use crate::message::ParsedMessage;

#[derive(Debug, Clone, Serialize)]
pub struct BlacklistCheck {
    pub rbl: String,
    pub listed: bool,
    pub response: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct RblResults {
    pub checks: Vec<(String, Vec<BlacklistCheck>)>,
    pub total_listed: usize,
    pub ips_checked: Vec<String>,
}

static IPV4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap());

/// Entry point for `CheckBlacklistIP`: queries every configured RBL for one
/// explicit IP, bypassing message extraction entirely.
pub async fn check_ip(resolver: &dyn DnsResolverPort, config: &Config, ip: &str) -> Vec<BlacklistCheck> {
    check_one_ip(resolver, config, ip).await
}

pub async fn check_blacklists(
    resolver: &dyn DnsResolverPort,
    config: &Config,
    message: &ParsedMessage,
) -> RblResults {
    let mut ips = extract_public_ips(message);
    if !config.check_all_ips && ips.len() > 1 {
        ips.truncate(1);
    }

    if ips.is_empty() {
        return RblResults {
            checks: Vec::new(),
            total_listed: 0,
            ips_checked: Vec::new(),
        };
    }

    let mut all_checks = Vec::with_capacity(ips.len());
    let mut total_listed = 0usize;

    for chunk in ips.chunks(config.max_fanout.max(1)) {
        let futures = chunk.iter().map(|ip| check_one_ip(resolver, config, ip));
        let results = futures::future::join_all(futures).await;
        for (ip, checks) in chunk.iter().zip(results) {
            total_listed += checks.iter().filter(|c| c.listed).count();
            all_checks.push((ip.clone(), checks));
        }
    }

    RblResults {
        checks: all_checks,
        total_listed,
        ips_checked: ips,
    }
}

async fn check_one_ip(resolver: &dyn DnsResolverPort, config: &Config, ip: &str) -> Vec<BlacklistCheck> {
    let Ok(ipv4): Result<Ipv4Addr, _> = ip.parse() else {
        // IPv6 sender IPs are not queried; reversed form would be empty.
        return Vec::new();
    };
    let reversed = reverse_octets(ipv4);

    let mut checks = Vec::with_capacity(config.rbls.len());
    for chunk in config.rbls.chunks(config.max_fanout.max(1)) {
        let futures = chunk
            .iter()
            .map(|rbl| query_one_rbl(resolver, config, &reversed, rbl));
        let results = futures::future::join_all(futures).await;
        checks.extend(results);
    }
    checks
}

async fn query_one_rbl(
    resolver: &dyn DnsResolverPort,
    config: &Config,
    reversed: &str,
    rbl: &str,
) -> BlacklistCheck {
    let query = format!("{reversed}.{rbl}");
    match resolver.lookup_host(&query, config.dns_timeout).await {
        Ok(answers) if answers.is_empty() => BlacklistCheck {
            rbl: rbl.to_string(),
            listed: false,
            response: None,
            error: None,
        },
        Ok(answers) => {
            let first = answers[0].to_string();
            if is_operational_error_response(&first) {
                BlacklistCheck {
                    rbl: rbl.to_string(),
                    listed: false,
                    response: Some(first),
                    error: Some("RBL operational issue".to_string()),
                }
            } else {
                BlacklistCheck {
                    rbl: rbl.to_string(),
                    listed: true,
                    response: Some(first),
                    error: None,
                }
            }
        }
        Err(DnsError::NotFound) => BlacklistCheck {
            rbl: rbl.to_string(),
            listed: false,
            response: None,
            error: None,
        },
        Err(e) => BlacklistCheck {
            rbl: rbl.to_string(),
            listed: false,
            response: None,
            error: Some(e.to_string()),
        },
    }
}

fn is_operational_error_response(answer: &str) -> bool {
    matches!(answer, "127.255.255.253" | "127.255.255.254" | "127.255.255.255")
}

fn reverse_octets(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}")
}

/// Score: `100 - listedCount * 100 / |RBLs|`, floored at 0. No extractable
/// IPs gets the benefit of the doubt (100).
pub fn score_blacklists(results: &RblResults, rbl_count: usize) -> u8 {
    if results.ips_checked.is_empty() || rbl_count == 0 {
        return 100;
    }
    let penalty = (results.total_listed * 100) / rbl_count;
    100u8.saturating_sub(penalty.min(100) as u8)
}

fn extract_public_ips(message: &ParsedMessage) -> Vec<String> {
    let mut ips = Vec::new();
    for received in message.headers.get_all("Received") {
        for cap in IPV4_RE.captures_iter(received) {
            if let Some(ip_str) = cap.get(1) {
                if let Ok(ip) = ip_str.as_str().parse::<Ipv4Addr>() {
                    if is_public(ip) && !ips.contains(&ip.to_string()) {
                        ips.push(ip.to_string());
                    }
                }
            }
        }
    }

    if ips.is_empty() {
        if let Some(header) = message.headers.get_first("X-Originating-Ip") {
            let cleaned = header.trim().trim_start_matches('[').trim_end_matches(']');
            if let Ok(ip) = cleaned.parse::<Ipv4Addr>() {
                if is_public(ip) {
                    ips.push(ip.to_string());
                }
            }
        }
    }

    ips
}

fn is_public(ip: Ipv4Addr) -> bool {
    !(ip.is_private() || ip.is_loopback() || ip.is_link_local() || ip.is_unspecified())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::MockResolver;
    use std::net::IpAddr;

    fn message_with_received(ip: &str) -> ParsedMessage {
        let raw = format!(
            "From: a@example.com\r\nReceived: from mail.example.com ({ip}) by mx.receiver.test; Mon, 1 Jan 2024 00:00:00 +0000\r\n\r\nbody"
        );
        crate::message::parse_message(raw.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn one_ip_listed_out_of_six_rbls_scores_83() {
        let msg = message_with_received("198.51.100.7");
        let listed_ip: IpAddr = "127.0.0.2".parse().unwrap();
        let resolver = MockResolver::new().with_host("7.100.51.198.zen.spamhaus.org", vec![listed_ip]);
        let config = Config::default();
        assert_eq!(config.rbls.len(), 6);

        let results = check_blacklists(&resolver, &config, &msg).await;
        assert_eq!(results.total_listed, 1);
        let score = score_blacklists(&results, config.rbls.len());
        assert_eq!(score, 83);
    }

    #[tokio::test]
    async fn private_ips_are_excluded() {
        let msg = message_with_received("10.0.0.5");
        let resolver = MockResolver::new();
        let config = Config::default();
        let results = check_blacklists(&resolver, &config, &msg).await;
        assert!(results.ips_checked.is_empty());
        assert_eq!(score_blacklists(&results, config.rbls.len()), 100);
    }

    #[tokio::test]
    async fn operational_error_response_is_not_a_listing() {
        let msg = message_with_received("198.51.100.9");
        let op_err_ip: IpAddr = "127.255.255.254".parse().unwrap();
        let resolver = MockResolver::new().with_host("9.100.51.198.zen.spamhaus.org", vec![op_err_ip]);
        let config = Config::default();
        let results = check_blacklists(&resolver, &config, &msg).await;
        let (_, checks) = results.checks.iter().find(|(ip, _)| ip == "198.51.100.9").unwrap();
        let zen = checks.iter().find(|c| c.rbl == "zen.spamhaus.org").unwrap();
        assert!(!zen.listed);
        assert_eq!(zen.error.as_deref(), Some("RBL operational issue"));
    }
}
