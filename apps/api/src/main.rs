//! Taskboard API composition root.

#![forbid(unsafe_code)]

mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use sqlx::postgres::PgPoolOptions;
use taskboard_application::{
    AccessControlService, AuditLogService, AuditSink, AuthService, RateLimitRule,
    RateLimitService, ResourceContextResolver, RoleAdminService,
};
use taskboard_core::AppError;
use taskboard_infrastructure::{
    InMemoryRateLimitRepository, PostgresAuditLogRepository, PostgresAuditRepository,
    PostgresResourceContextRepository, PostgresRoleAssignmentStore, PostgresTokenRepository,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let token_repository = Arc::new(PostgresTokenRepository::new(pool.clone()));
    let auth_service = AuthService::new(token_repository);

    let assignment_store = Arc::new(PostgresRoleAssignmentStore::new(pool.clone()));
    let context_repository = Arc::new(PostgresResourceContextRepository::new(pool.clone()));
    let access_control_service = AccessControlService::new(
        assignment_store.clone(),
        ResourceContextResolver::new(context_repository),
    );

    let audit_repository = Arc::new(PostgresAuditRepository::new(pool.clone()));
    let audit_sink = AuditSink::new(audit_repository);
    let role_admin_service = RoleAdminService::new(assignment_store, audit_sink);

    let audit_log_repository = Arc::new(PostgresAuditLogRepository::new(pool.clone()));
    let audit_log_service = AuditLogService::new(audit_log_repository);

    let rate_limit_repository = Arc::new(InMemoryRateLimitRepository::new());
    let rate_limit_service = RateLimitService::new(rate_limit_repository);

    let app_state = AppState {
        auth_service,
        access_control_service,
        role_admin_service,
        audit_log_service,
        rate_limit_service,
    };

    // Role administration: 30 mutations per user per minute.
    let security_admin_rate_rule = RateLimitRule::new("security_admin", 30, 60);

    let security_mutation_routes = Router::new()
        .route(
            "/api/security/role-assignments",
            post(handlers::security::assign_role_handler),
        )
        .route(
            "/api/security/role-unassignments",
            post(handlers::security::unassign_role_handler),
        )
        .route(
            "/api/security/users/{user_id}/roles",
            put(handlers::security::sync_roles_handler),
        )
        .route(
            "/api/security/roles/{role_name}",
            delete(handlers::security::delete_role_handler),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::rate_limit,
        ))
        .layer(axum::Extension(security_admin_rate_rule));

    let protected_routes = Router::new()
        .route(
            "/api/security/roles",
            get(handlers::security::list_roles_handler),
        )
        .route(
            "/api/security/role-assignments",
            get(handlers::security::list_role_assignments_handler),
        )
        .route(
            "/api/security/audit-log",
            get(handlers::security::list_audit_log_handler),
        )
        .route("/api/access/check", post(handlers::access::access_check_handler))
        .merge(security_mutation_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_auth,
        ));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "taskboard-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
