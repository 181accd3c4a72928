/*
 * Responsibility
 * - users テーブル向け SQLx 操作 (認証に必要な参照のみ)
 * - ユーザー作成/更新は外部 (登録・ログイン側) の責務
 */
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email
        FROM users
        WHERE lower(email) = lower($1)
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;

    Ok(row)
}
