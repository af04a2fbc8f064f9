use clap::Parser;
use deliverability_analyzer::config::Config;
use deliverability_analyzer::dns::{DnsResolverPort, TrustDnsResolver};
use deliverability_analyzer::http_prober::ReqwestProber;
use deliverability_analyzer::{dns_analyzer, rbl, report, scoring};

#[derive(Parser)]
struct Cli {
    /// Path to a raw .eml file to analyze (AnalyzeEmailBytes).
    #[arg(short, long)]
    input: Option<String>,

    /// Domain to analyze instead of a message (AnalyzeDomain).
    #[arg(short, long)]
    domain: Option<String>,

    /// IP to check against configured DNSBLs (CheckBlacklistIP).
    #[arg(long)]
    ip: Option<String>,

    /// Opaque identifier carried through into the report's testId.
    #[arg(long, default_value = "cli")]
    test_id: String,

    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if [cli.input.is_some(), cli.domain.is_some(), cli.ip.is_some()]
        .iter()
        .filter(|v| **v)
        .count()
        != 1
    {
        eprintln!("Error: provide exactly one of --input, --domain, --ip");
        std::process::exit(1);
    }

    let resolver = TrustDnsResolver::new()?;
    let config = Config::default();

    if let Some(ip) = cli.ip {
        let checks = rbl::check_ip(&resolver as &dyn DnsResolverPort, &config, &ip).await;
        let listed_count = checks.iter().filter(|c| c.listed).count();
        let score = 100u8.saturating_sub(((listed_count * 100) / config.rbls.len().max(1)) as u8);
        let grade = scoring::grade_for_score(score);

        if cli.json {
            let output = serde_json::json!({
                "ip": ip,
                "checks": checks,
                "listedCount": listed_count,
                "score": score,
                "grade": grade.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Blacklist check for {ip}");
            for check in &checks {
                println!("  {}: listed={}", check.rbl, check.listed);
            }
            println!("Listed on {listed_count}/{} RBLs, score={score}, grade={grade}", config.rbls.len());
        }
        return Ok(());
    }

    if let Some(domain) = cli.domain {
        let auth = deliverability_analyzer::auth::AuthenticationResults::default();
        let dns_results = dns_analyzer::analyze_dns(&resolver, &config, &domain, None, &auth, &[]).await;
        let score = dns_analyzer::score_dns(&dns_results);
        let grade = scoring::grade_for_score(score);

        if cli.json {
            let output = serde_json::json!({
                "domain": domain,
                "dnsResults": dns_results,
                "score": score,
                "grade": grade.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("Domain analysis for {domain}");
            println!("  SPF entries: {}", dns_results.spf.len());
            println!("  DKIM entries: {}", dns_results.dkim.len());
            println!("  DMARC present: {}", dns_results.dmarc.is_some());
            println!("  Score: {score}, Grade: {grade}");
        }
        return Ok(());
    }

    let input_path = cli.input.expect("exactly one ingress mode selected");
    let raw = std::fs::read(&input_path)?;
    let prober = ReqwestProber::new(&config.user_agent)?;

    let rep = report::generate_report(&raw, &cli.test_id, &resolver, &prober, &config).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rep)?);
    } else {
        println!("Report {} (test {})", rep.id, rep.test_id);
        println!("  Score: {}  Grade: {}", rep.score, rep.grade);
        println!(
            "  Authentication={} Blacklist={} Content={} Header={} Spam={}",
            rep.summary.authentication_score,
            rep.summary.blacklist_score,
            rep.summary.content_score,
            rep.summary.header_score,
            rep.summary.spam_score,
        );
        for rec in &rep.recommendations {
            println!("  - {rec}");
        }
    }

    Ok(())
}
