use sqlx::{FromRow, PgPool};
use time::Date;

use crate::experience::dto::ExperienceForm;

/// One work ("lavoro") or education ("formazione") entry in a user's
/// history. `data_fine` is NULL exactly when `is_current` is set; the
/// schema enforces the same rule with a CHECK constraint.
#[derive(Debug, Clone, FromRow)]
pub struct Experience {
    pub id: i32,
    pub user_id: i32,
    pub tipo: String,
    pub titolo: String,
    pub azienda_istituto: String,
    pub data_inizio: Date,
    pub data_fine: Option<Date>,
    pub is_current: bool,
    pub descrizione: Option<String>,
}

impl Experience {
    pub async fn list_by_user(db: &PgPool, user_id: i32) -> anyhow::Result<Vec<Experience>> {
        let rows = sqlx::query_as::<_, Experience>(
            r#"
            SELECT id, user_id, tipo, titolo, azienda_istituto, data_inizio,
                   data_fine, is_current, descrizione
            FROM experiences
            WHERE user_id = $1
            ORDER BY data_inizio DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn insert(db: &PgPool, user_id: i32, form: &ExperienceForm) -> anyhow::Result<i32> {
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO experiences
                (user_id, tipo, titolo, azienda_istituto, data_inizio, data_fine,
                 is_current, descrizione)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&form.tipo)
        .bind(&form.titolo)
        .bind(&form.azienda_istituto)
        .bind(form.data_inizio)
        .bind(form.data_fine)
        .bind(form.is_current)
        .bind(&form.descrizione)
        .fetch_one(db)
        .await?;
        Ok(id)
    }

    /// Returns false when the row does not exist or belongs to someone else.
    pub async fn update_owned(
        db: &PgPool,
        user_id: i32,
        experience_id: i32,
        form: &ExperienceForm,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE experiences
            SET tipo = $1, titolo = $2, azienda_istituto = $3, data_inizio = $4,
                data_fine = $5, is_current = $6, descrizione = $7
            WHERE id = $8 AND user_id = $9
            "#,
        )
        .bind(&form.tipo)
        .bind(&form.titolo)
        .bind(&form.azienda_istituto)
        .bind(form.data_inizio)
        .bind(form.data_fine)
        .bind(form.is_current)
        .bind(&form.descrizione)
        .bind(experience_id)
        .bind(user_id)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_owned(
        db: &PgPool,
        user_id: i32,
        experience_id: i32,
    ) -> anyhow::Result<bool> {
        let result =
            sqlx::query(r#"DELETE FROM experiences WHERE id = $1 AND user_id = $2"#)
                .bind(experience_id)
                .bind(user_id)
                .execute(db)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
