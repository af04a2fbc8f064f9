//! Recognized configuration keys (spec §6.2).

use std::time::Duration;

/// Runtime configuration for one analysis. Cheap to clone; shared by value
/// across the analyzers invoked from a single [`crate::report::ReportGenerator`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Deadline per DNS call.
    pub dns_timeout: Duration,
    /// Deadline per HTTP HEAD probe.
    pub http_timeout: Duration,
    /// DNSBL zones to query for every extracted source IP.
    pub rbls: Vec<String>,
    /// Whether RBL checks enumerate all extracted IPs, or only the first.
    pub check_all_ips: bool,
    /// `authserv-id` used to filter incoming `Authentication-Results` headers.
    /// Empty means all such headers are trusted.
    pub local_hostname: String,
    /// Upper bound on concurrent fan-out within one analyzer (RBL matrix,
    /// SPF include siblings, DKIM selector lookups).
    pub max_fanout: usize,
    /// `User-Agent` sent by the HTTP prober.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(10),
            rbls: default_rbls(),
            check_all_ips: true,
            local_hostname: String::new(),
            max_fanout: 16.min(num_cpus::get().max(1)),
            user_agent: "deliverability-analyzer/0.1".to_string(),
        }
    }
}

/// The default RBL zones named in spec §6.2.
pub fn default_rbls() -> Vec<String> {
    vec![
        "zen.spamhaus.org".to_string(),
        "bl.spamcop.net".to_string(),
        "dnsbl.sorbs.net".to_string(),
        "b.barracudacentral.org".to_string(),
        "cbl.abuseat.org".to_string(),
        "dnsbl-1.uceprotect.net".to_string(),
    ]
}
