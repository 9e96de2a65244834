//! Request router in front of the leave service.
//!
//! `/manager/{path}` is relayed to the manager upstream with the prefix removed, every
//! other path to the employee upstream. Method, query string, body and end-to-end
//! headers pass through; the upstream status, headers and body come back unchanged.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Logger;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, ResponseError, get, web};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;

const MANAGER_PREFIX: &str = "/manager/";

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers never copied onto the upstream request.
pub fn is_request_excluded(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "host" || HOP_BY_HOP.contains(&name.as_str())
}

/// Headers never copied back onto the client response.
pub fn is_response_excluded(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "content-length" || HOP_BY_HOP.contains(&name.as_str())
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Service timeout")]
    Timeout,

    #[error("Gateway error: {0}")]
    Upstream(String),
}

impl GatewayError {
    fn from_reqwest(e: reqwest::Error, target: &str) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_connect() {
            GatewayError::Unavailable(target.to_string())
        } else {
            GatewayError::Upstream(e.to_string())
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

pub struct Gateway {
    client: reqwest::Client,
    employee_url: String,
    manager_url: String,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            employee_url: config.employee_url.trim_end_matches('/').to_string(),
            manager_url: config.manager_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upstream URL for an incoming path and query string.
    pub fn target(&self, path: &str, query: &str) -> String {
        let (base, rest) = match path.strip_prefix(MANAGER_PREFIX) {
            Some(rest) => (&self.manager_url, rest),
            None => (&self.employee_url, path.trim_start_matches('/')),
        };
        if query.is_empty() {
            format!("{base}/{rest}")
        } else {
            format!("{base}/{rest}?{query}")
        }
    }

    async fn forward(&self, req: &HttpRequest, body: web::Bytes) -> Result<HttpResponse, GatewayError> {
        let target = self.target(req.path(), req.query_string());
        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        let mut upstream = self.client.request(method, &target).body(body);
        for (name, value) in req.headers() {
            if is_request_excluded(name.as_str()) {
                continue;
            }
            upstream = upstream.header(name.as_str(), value.as_bytes());
        }

        debug!(target = %target, method = %req.method(), "Forwarding request");
        let resp = upstream
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &target))?;

        let status = StatusCode::from_u16(resp.status().as_u16())
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;
        let mut out = HttpResponse::build(status);
        for (name, value) in resp.headers() {
            if is_response_excluded(name.as_str()) {
                continue;
            }
            match (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                (Ok(name), Ok(value)) => {
                    out.append_header((name, value));
                }
                _ => warn!(header = %name, "Dropping unrepresentable upstream header"),
            }
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &target))?;
        Ok(out.body(body))
    }
}

#[get("/health")]
async fn health(gateway: web::Data<Gateway>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "gateway-ok",
        "employee_url": gateway.employee_url,
        "manager_url": gateway.manager_url,
    }))
}

async fn proxy(
    req: HttpRequest,
    body: web::Bytes,
    gateway: web::Data<Gateway>,
) -> Result<HttpResponse, GatewayError> {
    gateway.forward(&req, body).await.inspect_err(|e| {
        warn!(path = %req.path(), error = %e, "Upstream request failed");
    })
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).default_service(web::to(proxy));
}

pub async fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let gateway = web::Data::new(Gateway::new(&config)?);
    info!(
        addr = %config.addr,
        employee_url = %config.employee_url,
        manager_url = %config.manager_url,
        "Gateway starting..."
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(gateway.clone())
            .configure(configure)
    })
    .bind(&config.addr)?
    .run()
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{TestRequest, call_service, init_service, read_body_json};

    fn gateway_for(employee_url: &str, manager_url: &str) -> web::Data<Gateway> {
        gateway_with_timeout(employee_url, manager_url, 5)
    }

    fn gateway_with_timeout(
        employee_url: &str,
        manager_url: &str,
        timeout_secs: u64,
    ) -> web::Data<Gateway> {
        web::Data::new(
            Gateway::new(&GatewayConfig {
                addr: "127.0.0.1:0".into(),
                employee_url: employee_url.into(),
                manager_url: manager_url.into(),
                timeout_secs,
                log_dir: "logs".into(),
            })
            .unwrap(),
        )
    }

    async fn echo(req: HttpRequest, body: web::Bytes) -> HttpResponse {
        HttpResponse::Created()
            .insert_header(("x-upstream", "yes"))
            .insert_header(("connection", "close"))
            .json(json!({
                "method": req.method().as_str(),
                "path": req.path(),
                "query": req.query_string(),
                "trace": req.headers().get("x-trace").and_then(|v| v.to_str().ok()),
                "body": String::from_utf8_lossy(&body),
            }))
    }

    /// Binds an echo service on an ephemeral port and returns its base URL.
    fn spawn_upstream() -> String {
        let server = HttpServer::new(|| App::new().default_service(web::to(echo)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    async fn stall() -> HttpResponse {
        actix_web::rt::time::sleep(Duration::from_secs(3)).await;
        HttpResponse::Ok().finish()
    }

    fn spawn_stalled_upstream() -> String {
        let server = HttpServer::new(|| App::new().default_service(web::to(stall)))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}")
    }

    #[test]
    fn header_filters() {
        assert!(is_request_excluded("Host"));
        assert!(is_request_excluded("Transfer-Encoding"));
        assert!(!is_request_excluded("Authorization"));
        assert!(!is_request_excluded("Cookie"));
        assert!(is_response_excluded("content-length"));
        assert!(is_response_excluded("Connection"));
        assert!(!is_response_excluded("set-cookie"));
    }

    #[test]
    fn manager_prefix_picks_the_manager_upstream() {
        let gw = gateway_for("http://emp:8001/", "http://mgr:8002");
        assert_eq!(gw.target("/manager/leave/3", ""), "http://mgr:8002/leave/3");
        assert_eq!(gw.target("/api/leave", "page=2"), "http://emp:8001/api/leave?page=2");
        assert_eq!(gw.target("/managerial", ""), "http://emp:8001/managerial");
        assert_eq!(gw.target("/", ""), "http://emp:8001/");
    }

    #[actix_web::test]
    async fn relays_request_and_response() {
        let upstream = spawn_upstream();
        let app = init_service(
            App::new()
                .app_data(gateway_for("http://127.0.0.1:1", &upstream))
                .configure(configure),
        )
        .await;

        let req = TestRequest::put()
            .uri("/manager/api/leave/4/status?dry=1")
            .insert_header(("x-trace", "abc"))
            .set_payload(r#"{"status":"Approved"}"#)
            .to_request();
        let resp = call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers().get("x-upstream").unwrap(), "yes");
        assert!(resp.headers().get("connection").is_none());

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["method"], "PUT");
        assert_eq!(body["path"], "/api/leave/4/status");
        assert_eq!(body["query"], "dry=1");
        assert_eq!(body["trace"], "abc");
        assert_eq!(body["body"], r#"{"status":"Approved"}"#);
    }

    #[actix_web::test]
    async fn unreachable_upstream_is_503() {
        let app = init_service(
            App::new()
                .app_data(gateway_for("http://127.0.0.1:1", "http://127.0.0.1:1"))
                .configure(configure),
        )
        .await;

        let req = TestRequest::get().uri("/api/leave").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["error"], "Service unavailable: http://127.0.0.1:1/api/leave");
    }

    #[actix_web::test]
    async fn slow_upstream_is_504() {
        let upstream = spawn_stalled_upstream();
        let app = init_service(
            App::new()
                .app_data(gateway_with_timeout(&upstream, "http://127.0.0.1:1", 1))
                .configure(configure),
        )
        .await;

        let req = TestRequest::get().uri("/api/leave/mine").to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Service timeout"}));
    }

    #[actix_web::test]
    async fn health_answers_locally() {
        let app = init_service(
            App::new()
                .app_data(gateway_for("http://127.0.0.1:1", "http://127.0.0.1:1"))
                .configure(configure),
        )
        .await;

        let resp = call_service(&app, TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = read_body_json(resp).await;
        assert_eq!(body["status"], "gateway-ok");
    }
}
