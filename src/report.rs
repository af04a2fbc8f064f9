//! Report Generator (C11).
//!
//! Orchestrates every analyzer for one message and assembles the final,
//! JSON-serializable [`Report`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{self, AuthenticationResults};
use crate::config::Config;
use crate::content::{self, ContentResults};
use crate::dns::DnsResolverPort;
use crate::dns_analyzer::{self, DnsResults};
use crate::error::AnalysisError;
use crate::headers::{self, HeaderAnalysis};
use crate::http_prober::HttpProberPort;
use crate::message::{parse_message, ParsedMessage};
use crate::rbl::{self, RblResults};
use crate::scoring::{self, CategoryScores, Grade};
use crate::spamfilters::{self, RspamdResult, SpamAssassinResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub authentication_score: u8,
    pub blacklist_score: u8,
    pub content_score: u8,
    pub header_score: u8,
    pub spam_score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub test_id: String,
    pub score: u8,
    pub grade: Grade,
    pub summary: Summary,
    pub authentication: AuthenticationResults,
    pub header_analysis: HeaderAnalysis,
    pub content_analysis: ContentResults,
    pub dns_results: DnsResults,
    pub blacklists: RblResults,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spamassassin: Option<SpamAssassinResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rspamd: Option<RspamdResult>,
    pub raw_headers: String,
    pub created_at: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

fn domain_of(address: &str) -> Option<String> {
    address.rsplit_once('@').map(|(_, d)| d.trim_end_matches('>').to_lowercase())
}

/// Runs the full pipeline against already-parsed bytes: authentication →
/// content → DNS (needs authentication + headers) → headers → RBL → spam
/// filters, then assembles and returns the [`Report`].
pub async fn generate_report(
    raw: &[u8],
    test_id: &str,
    resolver: &dyn DnsResolverPort,
    prober: &dyn HttpProberPort,
    config: &Config,
) -> Result<Report, AnalysisError> {
    let message: ParsedMessage = parse_message(raw)?;
    Ok(generate_report_for_message(&message, test_id, resolver, prober, config).await)
}

pub async fn generate_report_for_message(
    message: &ParsedMessage,
    test_id: &str,
    resolver: &dyn DnsResolverPort,
    prober: &dyn HttpProberPort,
    config: &Config,
) -> Report {
    let authentication = auth::analyze_authentication(message, &config.local_hostname);
    let header_analysis = headers::analyze_headers(message);
    let content_analysis = content::analyze_content(message, prober, config).await;

    let from_domain = message.from.first().and_then(|a| domain_of(a)).unwrap_or_default();
    let return_path_domain = message.return_path.as_deref().and_then(domain_of);
    let dns_results = dns_analyzer::analyze_dns(
        resolver,
        config,
        &from_domain,
        return_path_domain.as_deref(),
        &authentication,
        &header_analysis.received_chain,
    )
    .await;

    let blacklists = rbl::check_blacklists(resolver, config, message).await;
    let spamassassin = spamfilters::parse_spamassassin(message);
    let rspamd = spamfilters::parse_rspamd(message);

    let auth_header_score = auth::score_authentication(&authentication) as f64;
    let auth_dns_score = dns_analyzer::score_dns(&dns_results) as f64;
    let authentication_score = ((auth_header_score + auth_dns_score) / 2.0).round() as u8;

    let content_score = content::score_content(&content_analysis);
    let header_score = header_analysis.score;
    let blacklist_score = rbl::score_blacklists(&blacklists, config.rbls.len());

    let spam_score = match (&spamassassin, &rspamd) {
        (Some(sa), Some(rs)) => {
            (((spamfilters::score_spamassassin(sa) as u16) + (spamfilters::score_rspamd(rs) as u16)) / 2) as u8
        }
        (Some(sa), None) => spamfilters::score_spamassassin(sa),
        (None, Some(rs)) => spamfilters::score_rspamd(rs),
        (None, None) => 100,
    };

    let category_scores = CategoryScores {
        authentication: authentication_score,
        blacklist: blacklist_score,
        content: content_score,
        header: header_score,
        spam: spam_score,
    };

    let score = scoring::overall_score(&category_scores);
    let grade = scoring::grade_for_score(score);

    let recommendations = build_recommendations(
        &authentication,
        &dns_results,
        &header_analysis,
        &content_analysis,
        &blacklists,
    );

    Report {
        id: Uuid::new_v4(),
        test_id: test_id.to_string(),
        score,
        grade,
        summary: Summary {
            authentication_score,
            blacklist_score,
            content_score,
            header_score,
            spam_score,
        },
        authentication,
        header_analysis,
        content_analysis,
        dns_results,
        blacklists,
        spamassassin,
        rspamd,
        raw_headers: String::from_utf8_lossy(&message.raw_headers).into_owned(),
        created_at: Utc::now(),
        recommendations,
    }
}

fn build_recommendations(
    auth: &AuthenticationResults,
    dns: &DnsResults,
    headers: &HeaderAnalysis,
    content: &ContentResults,
    blacklists: &RblResults,
) -> Vec<String> {
    let mut out = Vec::new();

    if auth.spf.is_none() && dns.spf.is_empty() {
        out.push("Publish an SPF record for the sending domain.".to_string());
    }
    if auth.dkim.is_empty() {
        out.push("Sign outgoing mail with DKIM.".to_string());
    }
    if auth.dmarc.is_none() && dns.dmarc.is_none() {
        out.push("Publish a DMARC policy for the sending domain.".to_string());
    }
    if !headers.alignment_ok {
        if let Some(issue) = &headers.alignment_issue {
            out.push(format!("Fix header alignment: {issue}"));
        }
    }
    if !headers.message_id_valid {
        out.push("Include a well-formed Message-ID header.".to_string());
    }
    if content.links.iter().any(|l| l.misaligned) {
        out.push("Review links whose anchor text names a different domain than their href.".to_string());
    }
    if !content.harmful_issues.is_empty() {
        out.push("Remove active/embedded content (script, iframe, form, etc.) from the HTML body.".to_string());
    }
    if blacklists.total_listed > 0 {
        out.push("Request delisting from the DNSBLs that currently list this sending IP.".to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::MockResolver;
    use crate::http_prober::MockProber;
    use std::net::IpAddr;

    #[tokio::test]
    async fn clean_authenticated_message_scores_high() {
        let raw = b"From: a@example.com\r\nDate: Mon, 1 Jan 2024 00:00:00 +0000\r\nMessage-ID: <abc@example.com>\r\nSubject: hi\r\nTo: dest@example.org\r\nAuthentication-Results: mx.receiver.test; spf=pass smtp.mailfrom=a@example.com; dkim=pass header.d=example.com header.s=s1; dmarc=pass header.from=example.com\r\n\r\nhello";
        let message = parse_message(raw).unwrap();

        let dkim_ip: IpAddr = "10.20.30.1".parse().unwrap();
        let resolver = MockResolver::new()
            .with_txt("example.com", vec!["v=spf1 -all".to_string()])
            .with_txt("s1._domainkey.example.com", vec!["v=DKIM1; p=AAA".to_string()])
            .with_txt("_dmarc.example.com", vec!["v=DMARC1; p=reject".to_string()])
            .with_mx("example.com", vec![])
            .with_host("example.com", vec![dkim_ip]);

        let prober = MockProber::new();
        let config = Config::default();

        let report = generate_report_for_message(&message, "t-1", &resolver, &prober, &config).await;
        assert!(report.summary.authentication_score >= 90);
        assert!(matches!(report.grade, Grade::A | Grade::APlus));
        assert!(report.score <= 100);
    }

    #[tokio::test]
    async fn score_and_grade_are_consistent_with_summary() {
        let raw = b"From: a@example.com\r\n\r\nbody";
        let message = parse_message(raw).unwrap();
        let resolver = MockResolver::new();
        let prober = MockProber::new();
        let config = Config::default();

        let report = generate_report_for_message(&message, "t-2", &resolver, &prober, &config).await;
        let values = [
            report.summary.authentication_score,
            report.summary.blacklist_score,
            report.summary.content_score,
            report.summary.header_score,
            report.summary.spam_score,
        ];
        let mean = values.iter().map(|&v| v as u32).sum::<u32>() as f64 / 5.0;
        assert_eq!(report.score, mean.floor() as u8);
        assert_eq!(report.grade, scoring::grade_for_score(report.score));
    }
}
