use sqlx::{FromRow, PgPool};
use time::Date;

use crate::profile::dto::ProfileForm;

/// Structured résumé fields, 1:1 with a user. The row is created empty at
/// registration and upserted on every profile edit.
#[derive(Debug, Clone, Default, FromRow)]
pub struct CvData {
    pub user_id: i32,
    pub telefono: Option<String>,
    pub indirizzo: Option<String>,
    pub data_nascita: Option<Date>,
    pub citta: Option<String>,
    pub nazionalita: Option<String>,
    pub linkedin_url: Option<String>,
    pub hobby: Option<String>,
    pub skills: Option<String>,
    pub languages: Option<String>,
}

impl CvData {
    pub async fn find_by_user(db: &PgPool, user_id: i32) -> anyhow::Result<Option<CvData>> {
        let row = sqlx::query_as::<_, CvData>(
            r#"
            SELECT user_id, telefono, indirizzo, data_nascita, citta, nazionalita,
                   linkedin_url, hobby, skills, languages
            FROM cv_data
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Update the user's identity fields and upsert the profile row in one
    /// transaction, so a failure in either leaves both untouched.
    pub async fn update_profile(
        db: &PgPool,
        user_id: i32,
        form: &ProfileForm,
    ) -> anyhow::Result<()> {
        let mut tx = db.begin().await?;

        sqlx::query(r#"UPDATE users SET nome = $1, cognome = $2, email = $3 WHERE id = $4"#)
            .bind(&form.nome)
            .bind(&form.cognome)
            .bind(&form.email)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO cv_data (user_id, telefono, data_nascita, citta, indirizzo,
                                 nazionalita, linkedin_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                telefono = EXCLUDED.telefono,
                data_nascita = EXCLUDED.data_nascita,
                citta = EXCLUDED.citta,
                indirizzo = EXCLUDED.indirizzo,
                nazionalita = EXCLUDED.nazionalita,
                linkedin_url = EXCLUDED.linkedin_url
            "#,
        )
        .bind(user_id)
        .bind(&form.telefono)
        .bind(form.data_nascita)
        .bind(&form.citta)
        .bind(&form.indirizzo)
        .bind(&form.nazionalita)
        .bind(&form.linkedin_url)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Free-text CV sections (hobby, skills, languages).
    pub async fn update_content(
        db: &PgPool,
        user_id: i32,
        hobby: &str,
        skills: &str,
        languages: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cv_data (user_id, hobby, skills, languages)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                hobby = EXCLUDED.hobby,
                skills = EXCLUDED.skills,
                languages = EXCLUDED.languages
            "#,
        )
        .bind(user_id)
        .bind(hobby)
        .bind(skills)
        .bind(languages)
        .execute(db)
        .await?;
        Ok(())
    }
}
