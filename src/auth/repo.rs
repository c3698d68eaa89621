use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub nome: String,
    pub cognome: String,
    pub role: String,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, nome, cognome, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i32) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, nome, cognome, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a student account plus its empty profile row, atomically.
    pub async fn register(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        nome: &str,
        cognome: &str,
    ) -> anyhow::Result<User> {
        let mut tx = db.begin().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, nome, cognome, role)
            VALUES ($1, $2, $3, $4, 'student')
            RETURNING id, email, password_hash, nome, cognome, role, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(nome)
        .bind(cognome)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"INSERT INTO cv_data (user_id) VALUES ($1)"#)
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn email_taken_by_other(
        db: &PgPool,
        email: &str,
        user_id: i32,
    ) -> anyhow::Result<bool> {
        let row: Option<(i32,)> =
            sqlx::query_as(r#"SELECT id FROM users WHERE email = $1 AND id != $2"#)
                .bind(email)
                .bind(user_id)
                .fetch_optional(db)
                .await?;
        Ok(row.is_some())
    }
}
