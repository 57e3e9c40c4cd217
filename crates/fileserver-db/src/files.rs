use crate::types::{FileRecord, NewFileRecord};
use sqlx::PgPool;

/// Insert a file record, returning it with its assigned id and timestamp
pub async fn insert(pool: &PgPool, p: &NewFileRecord) -> Result<FileRecord, sqlx::Error> {
    sqlx::query_as::<_, FileRecord>(
        r#"
        INSERT INTO files (file_name, storage_name, extension)
        VALUES ($1, $2, $3)
        RETURNING id, file_name, storage_name, extension, created_at
        "#,
    )
    .bind(&p.file_name)
    .bind(&p.storage_name)
    .bind(&p.extension)
    .fetch_one(pool)
    .await
}

/// Look up a file record by its storage name
pub async fn find_by_storage_name(
    pool: &PgPool,
    storage_name: &str,
) -> Result<Option<FileRecord>, sqlx::Error> {
    sqlx::query_as::<_, FileRecord>(
        r#"
        SELECT id, file_name, storage_name, extension, created_at
        FROM files
        WHERE storage_name = $1
        "#,
    )
    .bind(storage_name)
    .fetch_optional(pool)
    .await
}

/// All file records, oldest first
pub async fn list_all(pool: &PgPool) -> Result<Vec<FileRecord>, sqlx::Error> {
    sqlx::query_as::<_, FileRecord>(
        r#"
        SELECT id, file_name, storage_name, extension, created_at
        FROM files
        ORDER BY created_at, id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Delete a file record by id
pub async fn delete(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM files WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
