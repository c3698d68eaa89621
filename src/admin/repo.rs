use sqlx::{FromRow, PgPool};
use time::Date;

/// One row of the admin roster: identity plus a couple of per-student
/// aggregates.
#[derive(Debug, Clone, FromRow)]
pub struct StudentRow {
    pub id: i32,
    pub nome: String,
    pub cognome: String,
    pub email: String,
    pub data_nascita: Option<Date>,
    pub has_cv: bool,
    pub total_experiences: i64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdminStats {
    pub total_students: i64,
    pub students_with_cv: i64,
    pub total_work_exp: i64,
    pub total_edu_exp: i64,
}

pub async fn list_students(db: &PgPool) -> anyhow::Result<Vec<StudentRow>> {
    let rows = sqlx::query_as::<_, StudentRow>(
        r#"
        SELECT u.id, u.nome, u.cognome, u.email, cv.data_nascita,
               EXISTS(SELECT 1 FROM user_cvs c WHERE c.user_id = u.id) AS has_cv,
               COUNT(e.id) AS total_experiences
        FROM users u
        LEFT JOIN cv_data cv ON cv.user_id = u.id
        LEFT JOIN experiences e ON e.user_id = u.id
        WHERE u.role = 'student'
        GROUP BY u.id, u.nome, u.cognome, u.email, cv.data_nascita
        ORDER BY u.id
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn load_stats(db: &PgPool) -> anyhow::Result<AdminStats> {
    let total_students: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE role = 'student'"#)
            .fetch_one(db)
            .await?;
    let students_with_cv: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(DISTINCT user_id) FROM user_cvs"#)
            .fetch_one(db)
            .await?;
    let total_work_exp: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM experiences WHERE tipo = 'lavoro'"#)
            .fetch_one(db)
            .await?;
    let total_edu_exp: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM experiences WHERE tipo = 'formazione'"#)
            .fetch_one(db)
            .await?;
    Ok(AdminStats {
        total_students,
        students_with_cv,
        total_work_exp,
        total_edu_exp,
    })
}

/// Delete a student account; dependent rows go with it via the schema's
/// cascading foreign keys.
pub async fn delete_student(db: &PgPool, user_id: i32) -> anyhow::Result<()> {
    sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
