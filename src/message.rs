//! Message Parser (C1).
//!
//! Decodes raw bytes into headers, address lists, and a MIME tree of parts.
//! Header values are preserved in insertion order per canonical name; address
//! parsing is best-effort and never turns into a hard error. Only a missing
//! header/body separator is treated as fatal.

use mailparse::{addrparse, MailHeaderMap, ParsedMail};

use crate::error::ParseError;

/// Case-insensitive multimap from canonical header name to its values, in
/// first-seen order, preserving per-name insertion order of values. See
/// design notes §9.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    order: Vec<String>,
    values: std::collections::HashMap<String, Vec<String>>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: String) {
        let key = canonicalize_header_name(name);
        if !self.values.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.values.entry(key).or_default().push(value);
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(|s| s.as_str())
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        let key = canonicalize_header_name(name);
        self.values.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.get_all(name).is_empty()
    }

    /// Iterates headers in first-seen order, each with its full value list.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .map(move |k| (k.as_str(), self.values[k].as_slice()))
    }
}

/// Converts a header name to the conventional capitalization: the first
/// letter following each hyphen is upper-cased, everything else lower-cased
/// (e.g. `dkim-signature` -> `Dkim-Signature`).
pub fn canonicalize_header_name(name: &str) -> String {
    name.split('-')
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// A node in the MIME tree. Recursive for `multipart/*`; leaves keep their
/// raw (undecoded) content bytes — transfer-encoding decoding is deferred to
/// whichever analyzer actually inspects the part.
#[derive(Debug, Clone)]
pub struct MessagePart {
    pub content_type: String,
    pub transfer_encoding: String,
    pub content: Vec<u8>,
    pub is_html: bool,
    pub is_text: bool,
    pub children: Vec<MessagePart>,
    /// Set when a `multipart/*` part declared no boundary; its subtree is
    /// empty but the message as a whole is still parsed.
    pub parse_error: Option<String>,
}

impl MessagePart {
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// Depth-first walk over this part and all descendants.
    pub fn walk<'a>(&'a self) -> Vec<&'a MessagePart> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// The fully parsed message shared immutably by every analyzer.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub headers: HeaderMap,
    pub from: Vec<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub message_id: Option<String>,
    pub return_path: Option<String>,
    pub root: MessagePart,
    pub raw_headers: Vec<u8>,
    pub raw_body: Vec<u8>,
}

pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage, ParseError> {
    let split_at = find_header_body_split(raw).ok_or(ParseError::NoHeaderBlock)?;
    let raw_headers = raw[..split_at].to_vec();
    let raw_body = raw[split_at..].to_vec();

    let parsed: ParsedMail = mailparse::parse_mail(raw)?;

    let mut headers = HeaderMap::new();
    for h in parsed.get_headers().iter() {
        headers.insert(h.get_key_ref(), h.get_value());
    }

    let from = best_effort_addresses(&parsed, "From");
    let to = best_effort_addresses(&parsed, "To");
    let subject = parsed.headers.get_first_value("Subject");
    let date = parsed.headers.get_first_value("Date");
    let message_id = parsed.headers.get_first_value("Message-ID");
    let return_path = parsed.headers.get_first_value("Return-Path");

    let root = build_part_tree(&parsed);

    Ok(ParsedMessage {
        headers,
        from,
        to,
        subject,
        date,
        message_id,
        return_path,
        root,
        raw_headers,
        raw_body,
    })
}

fn find_header_body_split(raw: &[u8]) -> Option<usize> {
    if let Some(pos) = find_subslice(raw, b"\r\n\r\n") {
        return Some(pos + 4);
    }
    if let Some(pos) = find_subslice(raw, b"\n\n") {
        return Some(pos + 2);
    }
    // A header-only message (no body at all) is still parseable.
    if !raw.is_empty() {
        return Some(raw.len());
    }
    None
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn best_effort_addresses(parsed: &ParsedMail, header: &str) -> Vec<String> {
    match parsed.headers.get_first_value(header) {
        Some(raw) => match addrparse(&raw) {
            Ok(list) => list.iter().map(|a| a.to_string()).collect(),
            Err(_) => Vec::new(),
        },
        None => Vec::new(),
    }
}

fn build_part_tree(mail: &ParsedMail) -> MessagePart {
    let content_type = mail.ctype.mimetype.to_lowercase();
    let transfer_encoding = mail
        .headers
        .get_first_value("Content-Transfer-Encoding")
        .unwrap_or_default();
    let is_multipart = content_type.starts_with("multipart/");

    if is_multipart {
        if mail.ctype.params.get("boundary").is_none() {
            return MessagePart {
                content_type,
                transfer_encoding,
                content: Vec::new(),
                is_html: false,
                is_text: false,
                children: Vec::new(),
                parse_error: Some("multipart declared with no boundary parameter".to_string()),
            };
        }
        let children = mail.subparts.iter().map(build_part_tree).collect();
        return MessagePart {
            content_type,
            transfer_encoding,
            content: Vec::new(),
            is_html: false,
            is_text: false,
            children,
            parse_error: None,
        };
    }

    let is_html = content_type == "text/html";
    let is_text = content_type.starts_with("text/");
    MessagePart {
        content_type,
        transfer_encoding,
        content: mail.get_body_raw().unwrap_or_default(),
        is_html,
        is_text,
        children: Vec::new(),
        parse_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_header_names() {
        assert_eq!(canonicalize_header_name("dkim-signature"), "Dkim-Signature");
        assert_eq!(canonicalize_header_name("X-GOOGLE-DKIM"), "X-Google-Dkim");
        assert_eq!(canonicalize_header_name("subject"), "Subject");
    }

    #[test]
    fn header_map_preserves_order_and_multivalue() {
        let mut map = HeaderMap::new();
        map.insert("Received", "hop1".to_string());
        map.insert("received", "hop2".to_string());
        map.insert("From", "a@example.com".to_string());
        assert_eq!(map.get_all("RECEIVED"), &["hop1".to_string(), "hop2".to_string()]);
        assert_eq!(map.get_first("from"), Some("a@example.com"));
    }

    #[test]
    fn parses_simple_message() {
        let raw = b"From: user@example.com\r\nTo: dest@example.org\r\nSubject: hi\r\nDate: Mon, 1 Jan 2024 00:00:00 +0000\r\nMessage-ID: <abc@example.com>\r\n\r\nhello world";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.from, vec!["user@example.com".to_string()]);
        assert_eq!(parsed.subject.as_deref(), Some("hi"));
        assert_eq!(parsed.root.as_text(), "hello world");
    }

    #[test]
    fn bad_from_address_yields_empty_not_error() {
        let raw = b"From: \"unterminated\r\n\r\nbody";
        let parsed = parse_message(raw).unwrap();
        assert!(parsed.from.is_empty());
    }
}
