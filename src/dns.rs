//! DNS Resolver Port (C2).
//!
//! An abstract capability exposing `LookupTXT`, `LookupMX`, `LookupHost`,
//! `LookupAddr`, each accepting a deadline. Production code binds it to the
//! platform stub resolver (`trust-dns-resolver`); tests bind it to an
//! in-memory table keyed by `(qtype, name)`, per the design notes — this
//! keeps the DNS Analyzer and the RBL Checker, which are the heaviest
//! consumers of this port, fully unit-testable without a network.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Distinguishes "the name genuinely doesn't exist" from "the resolver
/// couldn't complete the query" (spec §6.3), so analyzers can report a more
/// precise `error` string on the record DTO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    NotFound,
    Transient(String),
}

impl std::fmt::Display for DnsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DnsError::NotFound => write!(f, "no such record"),
            DnsError::Transient(msg) => write!(f, "{msg}"),
        }
    }
}

pub type DnsResult<T> = Result<T, DnsError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub host: String,
    pub preference: u16,
}

/// Resolver trait for real or mock DNS.
#[async_trait]
pub trait DnsResolverPort: Send + Sync {
    async fn lookup_txt(&self, name: &str, deadline: Duration) -> DnsResult<Vec<String>>;
    async fn lookup_mx(&self, name: &str, deadline: Duration) -> DnsResult<Vec<MxRecord>>;
    async fn lookup_host(&self, name: &str, deadline: Duration) -> DnsResult<Vec<IpAddr>>;
    async fn lookup_addr(&self, ip: IpAddr, deadline: Duration) -> DnsResult<Vec<String>>;
}

/// DNS resolver wrapper around `trust-dns-resolver`'s Tokio resolver.
#[derive(Clone)]
pub struct TrustDnsResolver {
    inner: Arc<TokioAsyncResolver>,
}

impl TrustDnsResolver {
    pub fn new() -> anyhow::Result<Self> {
        let resolver =
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self {
            inner: Arc::new(resolver),
        })
    }

    async fn with_deadline<F, T>(deadline: Duration, fut: F) -> DnsResult<T>
    where
        F: std::future::Future<Output = DnsResult<T>>,
    {
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(DnsError::Transient("lookup timed out".to_string())),
        }
    }
}

#[async_trait]
impl DnsResolverPort for TrustDnsResolver {
    async fn lookup_txt(&self, name: &str, deadline: Duration) -> DnsResult<Vec<String>> {
        let inner = self.inner.clone();
        let name = name.to_string();
        Self::with_deadline(deadline, async move {
            match inner.txt_lookup(name).await {
                Ok(response) => {
                    let mut records = Vec::new();
                    for r in response.iter() {
                        let mut fragments = Vec::new();
                        for txt in r.txt_data() {
                            fragments.push(String::from_utf8_lossy(txt).into_owned());
                        }
                        records.push(fragments.concat());
                    }
                    Ok(records)
                }
                Err(e) => Err(classify_resolve_error(&e)),
            }
        })
        .await
    }

    async fn lookup_mx(&self, name: &str, deadline: Duration) -> DnsResult<Vec<MxRecord>> {
        let inner = self.inner.clone();
        let name = name.to_string();
        Self::with_deadline(deadline, async move {
            match inner.mx_lookup(name).await {
                Ok(response) => Ok(response
                    .iter()
                    .map(|mx| MxRecord {
                        host: mx.exchange().to_utf8().trim_end_matches('.').to_string(),
                        preference: mx.preference(),
                    })
                    .collect()),
                Err(e) => Err(classify_resolve_error(&e)),
            }
        })
        .await
    }

    async fn lookup_host(&self, name: &str, deadline: Duration) -> DnsResult<Vec<IpAddr>> {
        let inner = self.inner.clone();
        let ascii = idna::domain_to_ascii(name).unwrap_or_else(|_| name.to_string());
        Self::with_deadline(deadline, async move {
            match inner.lookup_ip(ascii).await {
                Ok(response) => Ok(response.iter().collect()),
                Err(e) => Err(classify_resolve_error(&e)),
            }
        })
        .await
    }

    async fn lookup_addr(&self, ip: IpAddr, deadline: Duration) -> DnsResult<Vec<String>> {
        let inner = self.inner.clone();
        Self::with_deadline(deadline, async move {
            match inner.reverse_lookup(ip).await {
                Ok(response) => Ok(response
                    .iter()
                    .map(|name| name.to_utf8().trim_end_matches('.').to_string())
                    .collect()),
                Err(e) => Err(classify_resolve_error(&e)),
            }
        })
        .await
    }
}

fn classify_resolve_error(e: &trust_dns_resolver::error::ResolveError) -> DnsError {
    use trust_dns_resolver::error::ResolveErrorKind;
    match e.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => DnsError::NotFound,
        _ => DnsError::Transient(e.to_string()),
    }
}

/// Query kind used to key the in-memory mock resolver table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Txt,
    Mx,
    Host,
    Addr,
}

/// An in-memory resolver keyed by `(qtype, name)`, used by tests so the DNS
/// Analyzer, RBL Checker, and Authentication Analyzer can be exercised
/// deterministically without a network.
#[derive(Default, Clone)]
pub struct MockResolver {
    txt: HashMap<String, DnsResult<Vec<String>>>,
    mx: HashMap<String, DnsResult<Vec<MxRecord>>>,
    host: HashMap<String, DnsResult<Vec<IpAddr>>>,
    addr: HashMap<String, DnsResult<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_txt(mut self, name: &str, records: Vec<String>) -> Self {
        self.txt.insert(name.to_lowercase(), Ok(records));
        self
    }

    pub fn with_txt_error(mut self, name: &str, err: DnsError) -> Self {
        self.txt.insert(name.to_lowercase(), Err(err));
        self
    }

    pub fn with_mx(mut self, name: &str, records: Vec<MxRecord>) -> Self {
        self.mx.insert(name.to_lowercase(), Ok(records));
        self
    }

    pub fn with_host(mut self, name: &str, ips: Vec<IpAddr>) -> Self {
        self.host.insert(name.to_lowercase(), Ok(ips));
        self
    }

    pub fn with_addr(mut self, ip: IpAddr, names: Vec<String>) -> Self {
        self.addr.insert(ip.to_string(), Ok(names));
        self
    }
}

#[async_trait]
impl DnsResolverPort for MockResolver {
    async fn lookup_txt(&self, name: &str, _deadline: Duration) -> DnsResult<Vec<String>> {
        self.txt
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(Err(DnsError::NotFound))
    }

    async fn lookup_mx(&self, name: &str, _deadline: Duration) -> DnsResult<Vec<MxRecord>> {
        self.mx
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(Err(DnsError::NotFound))
    }

    async fn lookup_host(&self, name: &str, _deadline: Duration) -> DnsResult<Vec<IpAddr>> {
        self.host
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(Err(DnsError::NotFound))
    }

    async fn lookup_addr(&self, ip: IpAddr, _deadline: Duration) -> DnsResult<Vec<String>> {
        self.addr
            .get(&ip.to_string())
            .cloned()
            .unwrap_or(Err(DnsError::NotFound))
    }
}
