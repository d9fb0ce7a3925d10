//! 数据库元数据浏览服务
//!
//! 基于 MySQL information_schema 提供只读的元数据查询：
//! - 数据库 / schema / 表 / 列列表
//! - 表的单行数据预览

mod handlers;
mod preview;
mod repository;
mod routes;
mod state;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use axum::{middleware, routing::get, Json, Router};
use common::config::{load_dotenv, AppConfig, LogFormat};
use common::middleware::request_id::request_id_middleware;
use repository::MySqlMetadataRepository;
use state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

const SERVICE_NAME: &str = "metadata-service";
const DEFAULT_PORT: u16 = 8083;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "元数据服务 API",
        version = "0.1.0",
        description = "数据库元数据浏览微服务"
    ),
    paths(
        handlers::list_databases,
        handlers::list_schemas,
        handlers::list_tables,
        handlers::list_columns,
        handlers::preview_table,
        handlers::health_check,
    ),
    components(schemas(
        common::models::TablePreview,
        common::response::ErrorResponse,
        common::response::ApiError,
        common::response::ResponseMeta,
        handlers::HealthResponse,
    )),
    tags(
        (name = "metadata", description = "元数据浏览端点"),
        (name = "health", description = "健康检查端点")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 先加载 .env，已存在的环境变量优先
    load_dotenv(Path::new(".env"));

    // 初始化日志追踪
    init_tracing(LogFormat::from_env());

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME, DEFAULT_PORT);
    if config.database.is_fallback {
        warn!("未设置 DATABASE_URL，使用内置默认连接字符串（仅限开发环境）");
    }

    // 创建仓储（连接延迟建立）
    let repository = MySqlMetadataRepository::connect_lazy(&config.database)
        .context("数据库连接配置无效")?;

    // 创建应用状态
    let state = AppState::new(config.clone(), Arc::new(repository));

    // 创建路由
    let app = create_router(state)?;

    // 启动服务
    let addr = format!("{}:{}", config.host, config.port);
    info!(service = SERVICE_NAME, address = %addr, "启动服务");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    axum::serve(listener, app).await.context("服务启动失败")?;
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn create_router(state: AppState) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(&state.config.cors_allowed_origin)
        .with_context(|| format!("CORS 来源无效: {}", state.config.cors_allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .merge(routes::router())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use common::errors::AppResult;
    use common::models::TablePreview;
    use crate::repository::MetadataRepository;

    struct EmptyRepository;

    #[async_trait]
    impl MetadataRepository for EmptyRepository {
        async fn list_databases(&self) -> AppResult<Vec<String>> {
            Ok(vec![])
        }

        async fn list_schemas(&self, _: &str) -> AppResult<Vec<String>> {
            Ok(vec![])
        }

        async fn list_tables(&self, _: &str, _: &str) -> AppResult<Vec<String>> {
            Ok(vec![])
        }

        async fn list_columns(&self, _: &str, _: &str, _: &str) -> AppResult<Vec<String>> {
            Ok(vec![])
        }

        async fn preview_table(&self, _: &str, _: &str, _: &str) -> AppResult<TablePreview> {
            Ok(TablePreview::new())
        }
    }

    fn app() -> Router {
        let config = AppConfig::from_lookup(SERVICE_NAME, DEFAULT_PORT, |_| None);
        create_router(AppState::new(config, Arc::new(EmptyRepository))).unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_dev_origin_only() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/databases")
                    .header("origin", "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:5173"
        );

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/databases")
                    .header("origin", "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let response = app()
            .oneshot(Request::builder().uri("/databases").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_openapi_lists_all_endpoints() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();

        for path in [
            "/databases",
            "/databases/{database}/schemas",
            "/databases/{database}/schemas/{schema}/tables",
            "/databases/{database}/schemas/{schema}/tables/{table}/columns",
            "/databases/{database}/schemas/{schema}/tables/{table}/preview",
            "/health",
        ] {
            assert!(doc["paths"].get(path).is_some(), "{path}");
        }
    }

    #[test]
    fn test_invalid_cors_origin_is_rejected() {
        let config = AppConfig::from_lookup(SERVICE_NAME, DEFAULT_PORT, |key| {
            (key == "CORS_ALLOWED_ORIGIN").then(|| "bad\norigin".to_string())
        });
        assert!(create_router(AppState::new(config, Arc::new(EmptyRepository))).is_err());
    }
}
