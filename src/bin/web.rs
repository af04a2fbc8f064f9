use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use deliverability_analyzer::auth::AuthenticationResults;
use deliverability_analyzer::config::Config;
use deliverability_analyzer::dns::TrustDnsResolver;
use deliverability_analyzer::http_prober::ReqwestProber;
use deliverability_analyzer::{dns_analyzer, rbl, report, scoring};
use env_logger::Env;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
struct AnalyzeRequest {
    raw_email: String,
    #[serde(default)]
    test_id: Option<String>,
}

#[derive(Deserialize)]
struct DomainRequest {
    domain: String,
}

#[derive(Deserialize)]
struct IpRequest {
    ip: String,
}

async fn analyze(req: web::Json<AnalyzeRequest>) -> impl Responder {
    let config = Config::default();
    let resolver = match TrustDnsResolver::new() {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().body(format!("DNS resolver error: {e}")),
    };
    let prober = match ReqwestProber::new(&config.user_agent) {
        Ok(p) => p,
        Err(e) => return HttpResponse::InternalServerError().body(format!("HTTP prober error: {e}")),
    };

    let test_id = req.test_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    match report::generate_report(req.raw_email.as_bytes(), &test_id, &resolver, &prober, &config).await {
        Ok(rep) => HttpResponse::Ok().json(rep),
        Err(e) => HttpResponse::BadRequest().body(format!("Failed to analyze message: {e}")),
    }
}

async fn analyze_domain(req: web::Json<DomainRequest>) -> impl Responder {
    let config = Config::default();
    let resolver = match TrustDnsResolver::new() {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().body(format!("DNS resolver error: {e}")),
    };

    let auth = AuthenticationResults::default();
    let dns_results = dns_analyzer::analyze_dns(&resolver, &config, &req.domain, None, &auth, &[]).await;
    let score = dns_analyzer::score_dns(&dns_results);
    let grade = scoring::grade_for_score(score);

    HttpResponse::Ok().json(serde_json::json!({
        "domain": req.domain,
        "dnsResults": dns_results,
        "score": score,
        "grade": grade.as_str(),
    }))
}

async fn check_blacklist(req: web::Json<IpRequest>) -> impl Responder {
    let config = Config::default();
    let resolver = match TrustDnsResolver::new() {
        Ok(r) => r,
        Err(e) => return HttpResponse::InternalServerError().body(format!("DNS resolver error: {e}")),
    };

    let checks = rbl::check_ip(&resolver, &config, &req.ip).await;
    let listed_count = checks.iter().filter(|c| c.listed).count();
    let score = 100u8.saturating_sub(((listed_count * 100) / config.rbls.len().max(1)) as u8);
    let grade = scoring::grade_for_score(score);

    HttpResponse::Ok().json(serde_json::json!({
        "ip": req.ip,
        "checks": checks,
        "listedCount": listed_count,
        "score": score,
        "grade": grade.as_str(),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    log::info!("Starting deliverability analysis service");

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Binding to {host}:{port}");

    HttpServer::new(|| {
        App::new()
            .route("/analyze", web::post().to(analyze))
            .route("/analyze/domain", web::post().to(analyze_domain))
            .route("/blacklist", web::post().to(check_blacklist))
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(num_cpus::get())
    .keep_alive(std::time::Duration::from_secs(75))
    .max_connections(1_000)
    .bind((host.as_str(), port))?
    .run()
    .await
}
