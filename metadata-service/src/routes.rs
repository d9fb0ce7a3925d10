//! 元数据服务路由模块

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// 创建元数据浏览路由
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/databases", get(handlers::list_databases))
        .route("/databases/{database}/schemas", get(handlers::list_schemas))
        .route(
            "/databases/{database}/schemas/{schema}/tables",
            get(handlers::list_tables),
        )
        .route(
            "/databases/{database}/schemas/{schema}/tables/{table}/columns",
            get(handlers::list_columns),
        )
        .route(
            "/databases/{database}/schemas/{schema}/tables/{table}/preview",
            get(handlers::preview_table),
        )
        .route("/health", get(handlers::health_check))
}
