//! 元数据仓储模块
//!
//! 每个操作只执行一条针对 information_schema 或目标表的参数化语句。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;

use common::config::DatabaseConfig;
use common::errors::{AppError, AppResult};
use common::models::TablePreview;
use common::utils::identifier::qualified_table_name;

use crate::preview::row_to_preview;

const LIST_DATABASES_SQL: &str = "SELECT CAST(SCHEMA_NAME AS CHAR) AS name
     FROM information_schema.SCHEMATA
     WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
     ORDER BY SCHEMA_NAME";

const LIST_SCHEMAS_SQL: &str = "SELECT CAST(TABLE_SCHEMA AS CHAR) AS name
     FROM information_schema.TABLES
     WHERE TABLE_SCHEMA = ?
     GROUP BY TABLE_SCHEMA
     ORDER BY TABLE_SCHEMA";

const LIST_TABLES_SQL: &str = "SELECT CAST(TABLE_NAME AS CHAR) AS name
     FROM information_schema.TABLES
     WHERE TABLE_SCHEMA = ?
       AND TABLE_TYPE = 'BASE TABLE'
       AND TABLE_NAME NOT LIKE 'sys!_%' ESCAPE '!'
     ORDER BY TABLE_NAME";

const LIST_COLUMNS_SQL: &str = "SELECT CAST(COLUMN_NAME AS CHAR) AS name
     FROM information_schema.COLUMNS
     WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
     ORDER BY ORDINAL_POSITION";

/// 元数据仓储 Trait
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// 列出用户数据库（排除系统库），按名称升序
    async fn list_databases(&self) -> AppResult<Vec<String>>;

    /// 列出数据库下的 schema（MySQL 中即数据库本身；无表时为空）
    async fn list_schemas(&self, database: &str) -> AppResult<Vec<String>>;

    /// 列出 schema 下的基础表（排除视图与 `sys_` 前缀），按名称升序
    async fn list_tables(&self, database: &str, schema: &str) -> AppResult<Vec<String>>;

    /// 列出表的列名，按 ordinal position 排序
    async fn list_columns(&self, database: &str, schema: &str, table: &str)
        -> AppResult<Vec<String>>;

    /// 读取表的第一行；空表返回空映射
    ///
    /// 语句不带 ORDER BY，返回哪一行由存储引擎决定，不保证稳定。
    async fn preview_table(&self, database: &str, schema: &str, table: &str)
        -> AppResult<TablePreview>;
}

/// 基于 MySQL information_schema 的元数据仓储
pub struct MySqlMetadataRepository {
    pool: MySqlPool,
}

impl MySqlMetadataRepository {
    /// 根据配置创建仓储。连接在首次请求时才建立，
    /// 数据库不可达不会阻止服务启动。
    pub fn connect_lazy(config: &DatabaseConfig) -> AppResult<Self> {
        let options = config.connect_options()?;
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// 使用已有连接池创建仓储
    #[cfg(test)]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// 获取本次操作独占的连接，离开作用域时自动归还
    async fn acquire(&self) -> AppResult<PoolConnection<MySql>> {
        Ok(self.pool.acquire().await?)
    }

    async fn fetch_names(&self, sql: &str, binds: &[&str]) -> AppResult<Vec<String>> {
        let mut conn = self.acquire().await?;
        let mut query = sqlx::query_scalar::<_, String>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        Ok(query.fetch_all(&mut *conn).await?)
    }
}

/// MySQL 中 database 与 schema 是同一个命名空间，两者不一致时
/// 这对参数不指向任何对象。
///
/// 按字节精确比较，与 `TABLE_SCHEMA = ?` 的过滤方式一致。服务器开启
/// `lower_case_table_names=1/2` 时 `Shop` 与 `shop` 指向同一个库，
/// 但这里仍视为不同；调用方应使用 `list_databases` 返回的原始名称。
fn same_namespace(database: &str, schema: &str) -> bool {
    if database == schema {
        return true;
    }
    tracing::debug!(database, schema, "database 与 schema 不一致");
    false
}

#[async_trait]
impl MetadataRepository for MySqlMetadataRepository {
    async fn list_databases(&self) -> AppResult<Vec<String>> {
        self.fetch_names(LIST_DATABASES_SQL, &[]).await
    }

    async fn list_schemas(&self, database: &str) -> AppResult<Vec<String>> {
        self.fetch_names(LIST_SCHEMAS_SQL, &[database]).await
    }

    async fn list_tables(&self, database: &str, schema: &str) -> AppResult<Vec<String>> {
        if !same_namespace(database, schema) {
            return Ok(vec![]);
        }
        self.fetch_names(LIST_TABLES_SQL, &[schema]).await
    }

    async fn list_columns(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> AppResult<Vec<String>> {
        if !same_namespace(database, schema) {
            return Ok(vec![]);
        }
        self.fetch_names(LIST_COLUMNS_SQL, &[schema, table]).await
    }

    async fn preview_table(
        &self,
        database: &str,
        schema: &str,
        table: &str,
    ) -> AppResult<TablePreview> {
        if !same_namespace(database, schema) {
            return Err(AppError::DatabaseQuery(format!(
                "schema `{}` does not belong to database `{}`",
                schema, database
            )));
        }

        let sql = format!("SELECT * FROM {} LIMIT 1", qualified_table_name(schema, table)?);
        let mut conn = self.acquire().await?;
        let row = sqlx::query(&sql)
            .persistent(false)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => row_to_preview(&row),
            None => Ok(TablePreview::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_databases_excludes_system_schemas() {
        for schema in ["'information_schema'", "'mysql'", "'performance_schema'", "'sys'"] {
            assert!(LIST_DATABASES_SQL.contains(schema), "{schema}");
        }
        assert!(LIST_DATABASES_SQL.ends_with("ORDER BY SCHEMA_NAME"));
    }

    #[test]
    fn test_filters_are_bound_parameters() {
        assert_eq!(LIST_SCHEMAS_SQL.matches('?').count(), 1);
        assert_eq!(LIST_TABLES_SQL.matches('?').count(), 1);
        assert_eq!(LIST_COLUMNS_SQL.matches('?').count(), 2);
    }

    #[test]
    fn test_list_tables_filters() {
        assert!(LIST_TABLES_SQL.contains("TABLE_TYPE = 'BASE TABLE'"));
        assert!(LIST_TABLES_SQL.contains("NOT LIKE 'sys!_%' ESCAPE '!'"));
        assert!(LIST_TABLES_SQL.ends_with("ORDER BY TABLE_NAME"));
    }

    #[test]
    fn test_columns_follow_ordinal_position() {
        assert!(LIST_COLUMNS_SQL.ends_with("ORDER BY ORDINAL_POSITION"));
    }

    fn unreachable_repository() -> MySqlMetadataRepository {
        let config = DatabaseConfig {
            connection_string: "Server=127.0.0.1;Port=1;User=nobody;".into(),
            is_fallback: false,
            connect_timeout_secs: 1,
            max_connections: 1,
        };
        MySqlMetadataRepository::connect_lazy(&config).unwrap()
    }

    #[test]
    fn test_same_namespace() {
        assert!(same_namespace("shop", "shop"));
        assert!(!same_namespace("shop", "crm"));
    }

    #[test]
    fn test_same_namespace_is_case_sensitive() {
        assert!(!same_namespace("Shop", "shop"));
        assert!(same_namespace("Shop", "Shop"));
    }

    #[tokio::test]
    async fn test_mismatched_schema_short_circuits() {
        // 指向不可达地址，若真的发出查询会得到连接错误
        let repo = unreachable_repository();

        assert!(repo.list_tables("shop", "crm").await.unwrap().is_empty());
        assert!(repo.list_columns("shop", "crm", "orders").await.unwrap().is_empty());
        assert!(matches!(
            repo.preview_table("shop", "crm", "orders").await,
            Err(AppError::DatabaseQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_failure() {
        let repo = unreachable_repository();

        assert!(matches!(
            repo.list_databases().await,
            Err(AppError::DatabaseConnection(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_identifier_fails_before_connecting() {
        let repo = unreachable_repository();

        let err = repo.preview_table("shop", "shop", "bad\0name").await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseQuery(_)));
    }

    /// 需要真实 MySQL：
    /// `TEST_DATABASE_URL=mysql://root:pw@localhost/mysql cargo test -- --ignored`
    mod live {
        use super::*;
        use serde_json::json;

        const DATABASE: &str = "metadata_browser_it";

        async fn seeded_repository() -> MySqlMetadataRepository {
            let url = std::env::var("TEST_DATABASE_URL")
                .expect("TEST_DATABASE_URL must point at a MySQL server");
            let pool = MySqlPoolOptions::new()
                .max_connections(2)
                .connect(&url)
                .await
                .unwrap();

            for statement in [
                format!("DROP DATABASE IF EXISTS `{DATABASE}`"),
                format!("CREATE DATABASE `{DATABASE}`"),
                format!(
                    "CREATE TABLE `{DATABASE}`.`orders` (
                        id INT PRIMARY KEY,
                        total DECIMAL(10, 2) NOT NULL,
                        created_at DATETIME NOT NULL
                    )"
                ),
                format!(
                    "INSERT INTO `{DATABASE}`.`orders` VALUES
                        (1, 19.99, '2024-05-01 10:00:00'),
                        (2, 5.00, '2024-05-02 11:30:00')"
                ),
                format!("CREATE TABLE `{DATABASE}`.`empty_cart` (id INT)"),
                format!("CREATE TABLE `{DATABASE}`.`sys_audit` (id INT)"),
                format!("CREATE VIEW `{DATABASE}`.`big_orders` AS SELECT id FROM `{DATABASE}`.`orders`"),
            ] {
                sqlx::query(&statement).execute(&pool).await.unwrap();
            }

            MySqlMetadataRepository::from_pool(pool)
        }

        /// 浏览与预览共用同一个种子库，放在一个测试里顺序执行，
        /// 避免并行测试互相 DROP 对方的数据库。
        #[tokio::test]
        #[ignore = "requires a MySQL server at TEST_DATABASE_URL"]
        async fn test_browse_seeded_catalog() {
            let repo = seeded_repository().await;

            let databases = repo.list_databases().await.unwrap();
            assert!(databases.contains(&DATABASE.to_string()));
            for reserved in ["information_schema", "mysql", "performance_schema", "sys"] {
                assert!(!databases.iter().any(|d| d == reserved));
            }
            let mut sorted = databases.clone();
            sorted.sort();
            assert_eq!(databases, sorted);

            assert_eq!(repo.list_schemas(DATABASE).await.unwrap(), vec![DATABASE]);
            assert!(repo.list_schemas("no_such_database").await.unwrap().is_empty());

            assert_eq!(
                repo.list_tables(DATABASE, DATABASE).await.unwrap(),
                vec!["empty_cart", "orders"]
            );
            assert_eq!(
                repo.list_columns(DATABASE, DATABASE, "orders").await.unwrap(),
                vec!["id", "total", "created_at"]
            );

            let preview = repo.preview_table(DATABASE, DATABASE, "orders").await.unwrap();
            assert_eq!(
                preview.columns().collect::<Vec<_>>(),
                vec!["id", "total", "created_at"]
            );
            let id = preview.get("id").unwrap();
            assert!(*id == json!(1) || *id == json!(2));

            let empty = repo.preview_table(DATABASE, DATABASE, "empty_cart").await.unwrap();
            assert!(empty.is_empty());

            assert!(matches!(
                repo.preview_table(DATABASE, DATABASE, "missing").await,
                Err(AppError::DatabaseQuery(_))
            ));

            sqlx::query(&format!("DROP DATABASE `{DATABASE}`"))
                .execute(&repo.pool)
                .await
                .unwrap();
        }
    }
}
