//! Handler模块
//!
//! 失败时只记录服务端日志（带上涉及的库、schema、表名），
//! 客户端统一收到 500 和通用错误体。

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use common::errors::AppError;
use common::models::TablePreview;
use common::response::ErrorResponse;
use crate::state::AppState;

/// 列出所有用户数据库
#[utoipa::path(
    get,
    path = "/databases",
    tag = "metadata",
    responses(
        (status = 200, description = "数据库名称列表（升序）", body = Vec<String>),
        (status = 500, description = "服务器内部错误", body = ErrorResponse)
    )
)]
pub async fn list_databases(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, AppError> {
    let databases = state.repository.list_databases().await.inspect_err(|e| {
        tracing::error!(kind = e.kind(), error = %e, "获取数据库列表失败");
    })?;
    Ok(Json(databases))
}

/// 列出数据库下的 schema
#[utoipa::path(
    get,
    path = "/databases/{database}/schemas",
    tag = "metadata",
    params(
        ("database" = String, Path, description = "数据库名称")
    ),
    responses(
        (status = 200, description = "schema 名称列表", body = Vec<String>),
        (status = 500, description = "服务器内部错误", body = ErrorResponse)
    )
)]
pub async fn list_schemas(
    State(state): State<AppState>,
    Path(database): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let schemas = state
        .repository
        .list_schemas(&database)
        .await
        .inspect_err(|e| {
            tracing::error!(database = %database, kind = e.kind(), error = %e, "获取 schema 列表失败");
        })?;
    Ok(Json(schemas))
}

/// 列出 schema 下的基础表
#[utoipa::path(
    get,
    path = "/databases/{database}/schemas/{schema}/tables",
    tag = "metadata",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("schema" = String, Path, description = "schema 名称")
    ),
    responses(
        (status = 200, description = "表名列表（升序，不含视图）", body = Vec<String>),
        (status = 500, description = "服务器内部错误", body = ErrorResponse)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Path((database, schema)): Path<(String, String)>,
) -> Result<Json<Vec<String>>, AppError> {
    let tables = state
        .repository
        .list_tables(&database, &schema)
        .await
        .inspect_err(|e| {
            tracing::error!(
                database = %database,
                schema = %schema,
                kind = e.kind(),
                error = %e,
                "获取表列表失败"
            );
        })?;
    Ok(Json(tables))
}

/// 列出表的列
#[utoipa::path(
    get,
    path = "/databases/{database}/schemas/{schema}/tables/{table}/columns",
    tag = "metadata",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("schema" = String, Path, description = "schema 名称"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列名列表（按定义顺序）", body = Vec<String>),
        (status = 500, description = "服务器内部错误", body = ErrorResponse)
    )
)]
pub async fn list_columns(
    State(state): State<AppState>,
    Path((database, schema, table)): Path<(String, String, String)>,
) -> Result<Json<Vec<String>>, AppError> {
    let columns = state
        .repository
        .list_columns(&database, &schema, &table)
        .await
        .inspect_err(|e| {
            tracing::error!(
                database = %database,
                schema = %schema,
                table = %table,
                kind = e.kind(),
                error = %e,
                "获取列列表失败"
            );
        })?;
    Ok(Json(columns))
}

/// 预览表的第一行数据
#[utoipa::path(
    get,
    path = "/databases/{database}/schemas/{schema}/tables/{table}/preview",
    tag = "metadata",
    params(
        ("database" = String, Path, description = "数据库名称"),
        ("schema" = String, Path, description = "schema 名称"),
        ("table" = String, Path, description = "表名")
    ),
    responses(
        (status = 200, description = "列名到值的映射；空表返回 {}", body = TablePreview),
        (status = 500, description = "服务器内部错误", body = ErrorResponse)
    )
)]
pub async fn preview_table(
    State(state): State<AppState>,
    Path((database, schema, table)): Path<(String, String, String)>,
) -> Result<Json<TablePreview>, AppError> {
    let preview = state
        .repository
        .preview_table(&database, &schema, &table)
        .await
        .inspect_err(|e| {
            tracing::error!(
                database = %database,
                schema = %schema,
                table = %table,
                kind = e.kind(),
                error = %e,
                "获取表预览失败"
            );
        })?;
    Ok(Json(preview))
}

/// 健康检查端点
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "服务运行正常", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// 健康检查响应
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 服务名称
    pub service: String,
    /// 服务版本
    pub version: String,
    /// 当前时间戳
    pub timestamp: DateTime<Utc>,
}
