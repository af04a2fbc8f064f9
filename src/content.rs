//! Content Analyzer (C7).
//!
//! Walks the MIME tree, parses HTML, classifies links/images, and computes
//! ratios and safety flags. May use the HTTP Prober port (C3) to validate
//! links.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::config::Config;
use crate::http_prober::HttpProberPort;
use crate::message::{MessagePart, ParsedMessage};

#[derive(Debug, Clone, Serialize)]
pub struct LinkInfo {
    pub href: String,
    pub anchor_text: String,
    pub valid: bool,
    pub warning: Option<String>,
    pub misaligned: bool,
    pub is_unsubscribe: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub missing_src: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ContentResults {
    pub is_multipart: bool,
    pub html_valid: bool,
    pub html_errors: Vec<String>,
    pub links: Vec<LinkInfo>,
    pub images: Vec<ImageInfo>,
    pub has_unsubscribe: bool,
    pub unsubscribe_links: Vec<String>,
    pub text_content: String,
    pub html_content: String,
    pub text_html_similarity: f64,
    pub image_text_ratio: f64,
    pub suspicious_urls: Vec<String>,
    pub content_issues: Vec<String>,
    pub harmful_issues: Vec<String>,
}

const UNSUBSCRIBE_KEYWORDS: [&str; 5] = ["unsubscribe", "opt-out", "optout", "remove", "list-unsubscribe"];
const GENERIC_ANCHOR_TEXTS: [&str; 8] = [
    "click here",
    "read more",
    "here",
    "link",
    "learn more",
    "click",
    "more info",
    "this link",
];
const URL_SHORTENERS: [&str; 10] = [
    "bit.ly", "t.co", "goo.gl", "tinyurl.com", "ow.ly", "is.gd", "buff.ly", "j.mp", "t.ly", "rb.gy",
];
const HARMFUL_TAGS: [&str; 7] = ["script", "iframe", "object", "embed", "applet", "form", "base"];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>\[\]{}|\\^`\x00-\x1f\x7f]+").unwrap());
static DOMAIN_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:https?://)?(?:www\.)?[a-z0-9][-a-z0-9]*(?:\.[a-z0-9][-a-z0-9]*)+").unwrap()
});

pub async fn analyze_content(
    message: &ParsedMessage,
    prober: &dyn HttpProberPort,
    config: &Config,
) -> ContentResults {
    let mut results = ContentResults::default();
    results.is_multipart = !message.root.children.is_empty();
    results.html_valid = true;

    let parts = message.root.walk();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for part in &parts {
        if part.is_html {
            analyze_html_part(part, &mut results, prober, config, &mut seen_urls).await;
        }
    }
    for part in &parts {
        if part.is_text && !part.is_html {
            analyze_text_part(part, &mut results, prober, config, &mut seen_urls).await;
        }
    }

    for child in &parts {
        if let Some(err) = &child.parse_error {
            results.html_valid = false;
            results.html_errors.push(err.clone());
        }
    }

    results.text_html_similarity = text_html_similarity(&results.text_content, &results.html_content);
    let text_len = extract_text_from_html(&results.html_content).chars().count();
    results.image_text_ratio = if text_len == 0 {
        0.0
    } else {
        (results.images.len() as f64) * 1000.0 / (text_len as f64)
    };

    results
}

async fn analyze_html_part(
    part: &MessagePart,
    results: &mut ContentResults,
    prober: &dyn HttpProberPort,
    config: &Config,
    seen_urls: &mut HashSet<String>,
) {
    let html_text = part.as_text();
    if html_text.trim().is_empty() {
        results.html_valid = false;
        results.html_errors.push("empty HTML content".to_string());
        return;
    }
    results.html_content.push_str(&html_text);

    let document = Html::parse_document(&html_text);

    let a_sel = Selector::parse("a").unwrap();
    for el in document.select(&a_sel) {
        let href = match el.value().attr("href") {
            Some(h) => h.to_string(),
            None => continue,
        };
        let anchor_text: String = el.text().collect::<Vec<_>>().join("").trim().to_string();
        let is_unsubscribe = is_unsubscribe_link(&href, &anchor_text);
        if is_unsubscribe {
            results.has_unsubscribe = true;
            results.unsubscribe_links.push(href.clone());
        }

        let misaligned = detect_misalignment(&href, &anchor_text);
        if is_suspicious_url(&href) {
            results.suspicious_urls.push(href.clone());
        }

        if seen_urls.insert(href.clone()) {
            let probe = prober.head(&href, config.http_timeout).await;
            results.links.push(LinkInfo {
                href: href.clone(),
                anchor_text,
                valid: probe.valid,
                warning: probe.warning,
                misaligned,
                is_unsubscribe,
            });
        }
    }

    let img_sel = Selector::parse("img").unwrap();
    for el in document.select(&img_sel) {
        let src = el.value().attr("src").map(|s| s.to_string());
        let alt = el.value().attr("alt").map(|s| s.to_string());
        let missing_src = src.is_none();
        if missing_src {
            results
                .content_issues
                .push("image element missing src attribute".to_string());
        }
        results.images.push(ImageInfo { src, alt, missing_src });
    }

    for tag in HARMFUL_TAGS {
        let sel = Selector::parse(tag).unwrap();
        for el in document.select(&sel) {
            results.harmful_issues.push(format!(
                "message HTML contains a <{tag}> element ({})",
                describe_attrs(&el)
            ));
        }
    }

    if let Ok(meta_sel) = Selector::parse(r#"meta[http-equiv]"#) {
        for el in document.select(&meta_sel) {
            if el
                .value()
                .attr("http-equiv")
                .map(|v| v.eq_ignore_ascii_case("refresh"))
                .unwrap_or(false)
            {
                results.harmful_issues.push(format!(
                    "message HTML contains a <meta http-equiv=\"refresh\"> element (content={})",
                    el.value().attr("content").unwrap_or("")
                ));
            }
        }
    }

    if let Ok(link_sel) = Selector::parse(r#"link[rel="stylesheet"]"#) {
        for el in document.select(&link_sel) {
            if let Some(href) = el.value().attr("href") {
                if href.starts_with("http://") || href.starts_with("https://") {
                    results
                        .content_issues
                        .push(format!("message HTML loads an external stylesheet: {href}"));
                }
            }
        }
    }
}

fn describe_attrs(el: &scraper::ElementRef) -> String {
    el.value()
        .attrs()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

async fn analyze_text_part(
    part: &MessagePart,
    results: &mut ContentResults,
    prober: &dyn HttpProberPort,
    config: &Config,
    seen_urls: &mut HashSet<String>,
) {
    let text = part.as_text();
    results.text_content.push_str(&text);

    for m in URL_RE.find_iter(&text) {
        let url = m.as_str().to_string();
        if is_suspicious_url(&url) {
            results.suspicious_urls.push(url.clone());
        }
        if seen_urls.insert(url.clone()) {
            let probe = prober.head(&url, config.http_timeout).await;
            results.links.push(LinkInfo {
                href: url,
                anchor_text: String::new(),
                valid: probe.valid,
                warning: probe.warning,
                misaligned: false,
                is_unsubscribe: false,
            });
        }
    }
}

fn is_unsubscribe_link(href: &str, anchor_text: &str) -> bool {
    let haystack = format!("{href} {anchor_text}").to_lowercase();
    UNSUBSCRIBE_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

fn is_suspicious_url(url: &str) -> bool {
    if url.starts_with("mailto:") {
        return false;
    }
    if url.contains('@') {
        return true;
    }
    let host = extract_host(url);
    let host = match host {
        Some(h) => h,
        None => return false,
    };
    if host.contains(['[', ']', '(', ')', '<', '>']) {
        return true;
    }
    if host.parse::<std::net::Ipv4Addr>().is_ok() || host.contains(':') {
        return true;
    }
    if URL_SHORTENERS.iter().any(|s| host.eq_ignore_ascii_case(s)) {
        return true;
    }
    if host.split('.').count() > 4 {
        return true;
    }
    false
}

fn extract_host(url: &str) -> Option<String> {
    url::Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string()))
}

/// Declares misalignment when the anchor text looks like a domain that
/// differs from the href's actual registrable domain (spec §4.5).
fn detect_misalignment(href: &str, anchor_text: &str) -> bool {
    let actual_domain = match actual_domain_of(href) {
        Some(d) => d,
        None => return false,
    };

    let trimmed = anchor_text.trim();
    if trimmed.len() < 4 {
        return false;
    }
    if GENERIC_ANCHOR_TEXTS.iter().any(|g| trimmed.eq_ignore_ascii_case(g)) {
        return false;
    }

    let candidate = match DOMAIN_TOKEN_RE.find(trimmed) {
        Some(m) => m.as_str(),
        None => return false,
    };

    let text_domain = normalize_domain_token(candidate);
    if text_domain.is_empty() {
        return false;
    }

    // The actual domain is accepted as a suffix of the text domain (e.g.
    // text "mail.paypal.com" vs actual "paypal.com").
    if text_domain == actual_domain || text_domain.ends_with(&format!(".{actual_domain}")) {
        return false;
    }

    true
}

fn normalize_domain_token(token: &str) -> String {
    let lower = token.to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
        .to_string()
}

fn actual_domain_of(href: &str) -> Option<String> {
    if let Some(addr) = href.strip_prefix("mailto:") {
        let addr = addr.split('?').next().unwrap_or(addr);
        return addr.rsplit_once('@').map(|(_, d)| d.to_lowercase());
    }
    let host = extract_host(href)?;
    Some(registrable_domain(&host))
}

fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_lowercase()
    } else {
        labels[labels.len() - 2..].join(".").to_lowercase()
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

fn extract_text_from_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

/// `commonWords / ((|P| + |H|) / 2)`, capped at 1.0.
fn text_html_similarity(plain: &str, html: &str) -> f64 {
    let html_text = extract_text_from_html(html);
    let plain_tokens = tokenize(plain);
    let html_tokens = tokenize(&html_text);

    if plain_tokens.is_empty() && html_tokens.is_empty() {
        return 0.0;
    }

    let mut plain_counts = std::collections::HashMap::new();
    for w in &plain_tokens {
        *plain_counts.entry(w.clone()).or_insert(0usize) += 1;
    }
    let mut html_counts = std::collections::HashMap::new();
    for w in &html_tokens {
        *html_counts.entry(w.clone()).or_insert(0usize) += 1;
    }

    let mut common = 0usize;
    for (word, count) in &plain_counts {
        if let Some(html_count) = html_counts.get(word) {
            common += (*count).min(*html_count);
        }
    }

    let denom = (plain_tokens.len() + html_tokens.len()) as f64 / 2.0;
    if denom == 0.0 {
        return 0.0;
    }
    (common as f64 / denom).min(1.0)
}

/// Scores the content category from its findings: starts at 100 and
/// subtracts for harmful elements, suspicious URLs, misaligned links, and a
/// broken HTML part, floored at 0.
pub fn score_content(results: &ContentResults) -> u8 {
    let mut score: i32 = 100;
    score -= (results.harmful_issues.len() as i32) * 15;
    score -= (results.suspicious_urls.len() as i32) * 10;
    score -= (results.links.iter().filter(|l| l.misaligned).count() as i32) * 20;
    if !results.html_valid && !results.html_content.is_empty() {
        score -= 10;
    }
    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_prober::{MockProber, ProbeResult};
    use crate::message::parse_message;

    fn raw_html_message(html: &str) -> Vec<u8> {
        format!(
            "From: a@example.com\r\nContent-Type: text/html\r\n\r\n{html}"
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn phishing_anchor_is_flagged_misaligned_and_suspicious() {
        let raw = raw_html_message(r#"<a href="https://evil.com/login">paypal.com</a>"#);
        let msg = parse_message(&raw).unwrap();
        let prober = MockProber::new();
        let config = Config::default();
        let results = analyze_content(&msg, &prober, &config).await;
        assert_eq!(results.links.len(), 1);
        assert!(results.links[0].misaligned);
    }

    #[tokio::test]
    async fn unsubscribe_link_is_detected() {
        let raw = raw_html_message(r#"<a href="https://example.com/unsubscribe">Unsubscribe here</a>"#);
        let msg = parse_message(&raw).unwrap();
        let prober = MockProber::new();
        let config = Config::default();
        let results = analyze_content(&msg, &prober, &config).await;
        assert!(results.has_unsubscribe);
        assert_eq!(results.unsubscribe_links.len(), 1);
    }

    #[tokio::test]
    async fn script_tag_is_harmful() {
        let raw = raw_html_message(r#"<script>alert(1)</script><p>hi</p>"#);
        let msg = parse_message(&raw).unwrap();
        let prober = MockProber::new();
        let config = Config::default();
        let results = analyze_content(&msg, &prober, &config).await;
        assert_eq!(results.harmful_issues.len(), 1);
    }

    #[tokio::test]
    async fn ip_literal_host_is_suspicious() {
        let raw = raw_html_message(r#"<a href="http://192.168.50.4/x">click here</a>"#);
        let msg = parse_message(&raw).unwrap();
        let prober = MockProber::new().with_response(
            "http://192.168.50.4/x",
            ProbeResult {
                valid: true,
                status: Some(200),
                warning: None,
            },
        );
        let config = Config::default();
        let results = analyze_content(&msg, &prober, &config).await;
        assert!(results.suspicious_urls.contains(&"http://192.168.50.4/x".to_string()));
    }

    #[test]
    fn similarity_is_one_for_identical_text() {
        let sim = text_html_similarity("hello world", "<p>hello world</p>");
        assert!((sim - 1.0).abs() < 0.01);
    }

    #[test]
    fn generic_anchor_text_is_never_misaligned() {
        assert!(!detect_misalignment("https://evil.com", "click here"));
    }
}
