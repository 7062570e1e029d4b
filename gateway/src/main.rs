use axum::{body::Body, response::Response};
use common::{aws_logging, parameter_store};
use lambda_http::{
    Error, Request, RequestExt,
    http::{Method, StatusCode, header::CONTENT_TYPE},
    service_fn,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const FINANCE_SERVICE_URL: &str = "FINANCE_SERVICE_URL";
const FINANCIAL_PATH: &str = "/e/fin/financial";
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// The finance service this gateway fronts
struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    fn new(base_url: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;

        Ok(Upstream {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Relays the request body and query string to the financial endpoint,
    /// and the upstream status and body back, whatever the status.
    async fn forward_financial(&self, req: &Request) -> Result<Response<Body>, Error> {
        let query = req.query_string_parameters().to_query_string();
        let url = match query.is_empty() {
            true => format!("{}{}", self.base_url, FINANCIAL_PATH),
            false => format!("{}{}?{}", self.base_url, FINANCIAL_PATH, query),
        };
        info!("Forwarding to {url}");

        let mut upstream_req = self.client.post(&url).body(req.body().to_vec());
        if let Some(content_type) = req.headers().get(CONTENT_TYPE) {
            upstream_req = upstream_req.header(CONTENT_TYPE, content_type);
        }

        let upstream_res = match upstream_req.send().await {
            Ok(res) => res,
            Err(e) => {
                error!("Finance service unreachable: {e}");
                return Ok(Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .body(e.to_string().into())?);
            }
        };

        let status = upstream_res.status();
        let content_type = upstream_res.headers().get(CONTENT_TYPE).cloned();
        let body = match upstream_res.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to read finance service response: {e}");
                return Ok(Response::builder()
                    .status(StatusCode::BAD_GATEWAY)
                    .body(e.to_string().into())?);
            }
        };
        info!("Finance service answered {status}");

        let mut builder = Response::builder().status(status);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        Ok(builder.body(Body::from(body))?)
    }
}

async fn gateway_endpoints(req: Request, upstream: &Upstream) -> Result<Response<Body>, Error> {
    let path = req.uri().path();

    info!(
        "{} path: {} query: {}",
        req.method(),
        path,
        req.query_string_parameters().to_query_string()
    );
    match path {
        "/fin/ping" => Ok(Response::builder()
            .status(StatusCode::OK)
            .body("pong".into())?),
        "/fin/financial" if req.method() == Method::POST => upstream.forward_financial(&req).await,
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(format!("Endpoint not Found {}", req.uri()).into())?),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = aws_logging::init_logger(&aws_logging::LoggingConfig {
        log_group: "finlens".to_string(),
        log_stream: "gateway".to_string(),
        level: "INFO".to_string(),
        cloudwatch: true,
        batch_size: 10,
    });

    let base_url = parameter_store::resolve(FINANCE_SERVICE_URL, false).await?;
    let upstream = Arc::new(Upstream::new(&base_url)?);
    info!("Gateway fronting {base_url}");

    lambda_http::run(service_fn(move |req| {
        let upstream = Arc::clone(&upstream);
        async move { gateway_endpoints(req, &upstream).await }
    }))
    .await?;
    Ok(())
}
