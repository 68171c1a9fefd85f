use crate::alert::Resolution;
use crate::config::FraudWatchConfig;
use crate::error::ServiceError;
use crate::evaluator::TransactionCheck;
use crate::rule::{Condition, RuleAction, RulePatch};
use crate::FraudEngine;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

pub type SharedEngine = Arc<RwLock<FraudEngine>>;

/// Simple token bucket rate limiter for the analyze route.
pub struct RateLimiter {
    tokens: Mutex<u32>,
    max_tokens: u32,
    refill_interval: Duration,
    last_refill: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            tokens: Mutex::new(requests_per_second),
            max_tokens: requests_per_second,
            refill_interval: Duration::from_secs(1),
            last_refill: Mutex::new(Instant::now()),
        }
    }

    async fn allow(&self) -> bool {
        let mut tokens = self.tokens.lock().await;
        let mut last_refill = self.last_refill.lock().await;

        let elapsed = last_refill.elapsed();
        if elapsed >= self.refill_interval {
            let refills = (elapsed.as_secs_f64() / self.refill_interval.as_secs_f64()) as u32;
            *tokens = (*tokens + refills).min(self.max_tokens);
            *last_refill = Instant::now();
        }

        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }
}

pub struct FraudServer {
    engine: SharedEngine,
    config_path: String,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl FraudServer {
    pub fn new(engine: SharedEngine, config_path: String, rate_limit: Option<u32>) -> Self {
        let rate_limiter = rate_limit.map(|rps| Arc::new(RateLimiter::new(rps)));
        Self {
            engine,
            config_path,
            rate_limiter,
        }
    }

    pub async fn run(self, port: u16) -> anyhow::Result<()> {
        let app = router(self.engine.clone(), self.rate_limiter.clone());

        let addr = format!("0.0.0.0:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("FraudWatch server running on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(
                self.engine.clone(),
                self.config_path.clone(),
            ))
            .await?;

        info!("FraudWatch server shut down gracefully");
        Ok(())
    }
}

/// Full route table. Factored out of `run` so tests can drive the router
/// without binding a socket.
pub fn router(engine: SharedEngine, rate_limiter: Option<Arc<RateLimiter>>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/metrics", get(handle_metrics))
        .route("/api/rules", get(handle_list_rules).post(handle_create_rule))
        .route(
            "/api/rules/:id",
            get(handle_get_rule).put(handle_update_rule),
        )
        .route("/api/alerts", get(handle_list_alerts))
        .route("/api/alerts/:id", get(handle_get_alert))
        .route("/api/alerts/:id/resolve", post(handle_resolve_alert))
        .route(
            "/api/analyze",
            post(move |state, body| {
                handle_analyze_with_rate_limit(state, body, rate_limiter.clone())
            }),
        )
        .fallback(handle_not_found)
        .with_state(engine)
}

async fn handle_health(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let (total, active) = engine.read().await.rule_counts().await;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "OK",
            "message": "Fraud detection service is running",
            "rules": { "total": total, "active": active },
        })),
    )
}

async fn handle_status() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "active" })),
    )
}

async fn handle_metrics() -> String {
    crate::metrics::METRICS.to_prometheus()
}

async fn handle_not_found() -> ServiceError {
    ServiceError::NotFound("Route not found")
}

// Rule management

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRuleRequest {
    name: Option<String>,
    description: Option<String>,
    conditions: Option<Vec<Condition>>,
    action: Option<RuleAction>,
}

async fn handle_list_rules(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let rules = engine.read().await.list_rules().await;
    (StatusCode::OK, Json(rules))
}

async fn handle_get_rule(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let rule = engine.read().await.get_rule(&id).await?;
    Ok((StatusCode::OK, Json(rule)))
}

async fn handle_create_rule(
    State(engine): State<SharedEngine>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (Some(name), Some(conditions), Some(action)) = (req.name, req.conditions, req.action)
    else {
        return Err(ServiceError::Validation("Missing required fields".to_string()));
    };

    let rule = engine
        .read()
        .await
        .create_rule(name, req.description, conditions, action)
        .await;
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn handle_update_rule(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(patch): Json<RulePatch>,
) -> Result<impl IntoResponse, ServiceError> {
    let rule = engine.read().await.update_rule(&id, patch).await?;
    Ok((StatusCode::OK, Json(rule)))
}

// Alerts

async fn handle_list_alerts(State(engine): State<SharedEngine>) -> impl IntoResponse {
    let alerts = engine.read().await.list_alerts().await;
    (StatusCode::OK, Json(alerts))
}

async fn handle_get_alert(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let alert = engine.read().await.get_alert(&id).await?;
    Ok((StatusCode::OK, Json(alert)))
}

#[derive(serde::Deserialize)]
struct ResolveRequest {
    action: Option<String>,
    notes: Option<String>,
}

async fn handle_resolve_alert(
    State(engine): State<SharedEngine>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let resolution = match req.action.as_deref() {
        Some("approve") => Resolution::Approve,
        Some("reject") => Resolution::Reject,
        _ => {
            return Err(ServiceError::Validation(
                "Valid action (approve/reject) is required".to_string(),
            ))
        }
    };

    let alert = engine
        .read()
        .await
        .resolve_alert(&id, resolution, req.notes)
        .await?;
    Ok((StatusCode::OK, Json(alert)))
}

// Analysis

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    transaction_id: Option<String>,
    customer_id: Option<String>,
    amount: Option<f64>,
    country: Option<String>,
    // cardDetails is accepted but opaque; serde drops it with any other
    // unknown field.
}

async fn handle_analyze_with_rate_limit(
    state: State<SharedEngine>,
    body: Json<AnalyzeRequest>,
    rate_limiter: Option<Arc<RateLimiter>>,
) -> Result<impl IntoResponse, ServiceError> {
    if let Some(limiter) = rate_limiter {
        if !limiter.allow().await {
            warn!("Analyze rate limit exceeded");
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "message": "Too many requests. Please try again later."
                })),
            )
                .into_response());
        }
    }

    handle_analyze(state, body).await.map(IntoResponse::into_response)
}

async fn handle_analyze(
    State(engine): State<SharedEngine>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (Some(transaction_id), Some(customer_id), Some(amount)) =
        (req.transaction_id, req.customer_id, req.amount)
    else {
        return Err(ServiceError::Validation("Missing required fields".to_string()));
    };

    let check = TransactionCheck {
        transaction_id,
        customer_id,
        amount,
        country: req.country,
    };

    let evaluation = engine.write().await.analyze(check).await;
    Ok((StatusCode::OK, Json(evaluation)))
}

async fn shutdown_signal(engine: SharedEngine, config_path: String) {
    // SIGHUP reloads rules and notifiers from the config file without
    // dropping the alert log.
    #[cfg(unix)]
    {
        let engine = engine.clone();
        let config_path = config_path.clone();
        tokio::spawn(async move {
            let mut stream = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::hangup(),
            ) {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to install SIGHUP handler: {}", e);
                    return;
                }
            };
            while stream.recv().await.is_some() {
                info!("SIGHUP received, reloading configuration...");
                match FraudWatchConfig::from_file(&config_path) {
                    Ok(new_config) => {
                        let mut engine = engine.write().await;
                        if let Err(e) = engine.reload_from_config(new_config).await {
                            error!("Failed to reload engine: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Failed to load config file for reload: {}", e);
                    }
                }
            }
        });
    }

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Termination signal received (Ctrl+C)"),
        _ = terminate => info!("Termination signal received (SIGTERM)"),
    }
}
