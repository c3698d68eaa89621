use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// One uploaded CV file. Users keep a history of uploads; entries are
/// deleted individually together with the file on disk.
#[derive(Debug, Clone, FromRow)]
pub struct UserCv {
    pub id: i32,
    pub user_id: i32,
    pub file_path: String,
    pub uploaded_at: OffsetDateTime,
}

impl UserCv {
    pub async fn insert(db: &PgPool, user_id: i32, file_path: &str) -> anyhow::Result<UserCv> {
        let row = sqlx::query_as::<_, UserCv>(
            r#"
            INSERT INTO user_cvs (user_id, file_path)
            VALUES ($1, $2)
            RETURNING id, user_id, file_path, uploaded_at
            "#,
        )
        .bind(user_id)
        .bind(file_path)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn list_by_user(db: &PgPool, user_id: i32) -> anyhow::Result<Vec<UserCv>> {
        let rows = sqlx::query_as::<_, UserCv>(
            r#"
            SELECT id, user_id, file_path, uploaded_at
            FROM user_cvs
            WHERE user_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Most recent upload for a user, if any.
    pub async fn latest_for_user(db: &PgPool, user_id: i32) -> anyhow::Result<Option<UserCv>> {
        let row = sqlx::query_as::<_, UserCv>(
            r#"
            SELECT id, user_id, file_path, uploaded_at
            FROM user_cvs
            WHERE user_id = $1
            ORDER BY uploaded_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(db: &PgPool, id: i32) -> anyhow::Result<Option<UserCv>> {
        let row = sqlx::query_as::<_, UserCv>(
            r#"
            SELECT id, user_id, file_path, uploaded_at
            FROM user_cvs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn delete(db: &PgPool, id: i32) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM user_cvs WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
