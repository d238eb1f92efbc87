use crate::{
    database::error::QueryError,
    error::ApiError,
    schema::{Id, Ingredient},
};

use sqlx::{Pool, Postgres};

/// Escapes `LIKE` wildcards so user input only ever matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub async fn search_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let rows: Vec<Ingredient> = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => sqlx::query_as(
            "SELECT * FROM ingredients WHERE LOWER(name) LIKE LOWER($1) || '%' ORDER BY name, measurement_unit",
        )
        .bind(escape_like(search))
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?,
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name, measurement_unit")
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?,
    };

    Ok(rows)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Inserts an ingredient unless the `(name, measurement_unit)` pair exists.
/// Returns the new id, or `None` when it was already there.
pub async fn insert_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Option<Id>, ApiError> {
    let id: Option<(Id,)> = sqlx::query_as(
        "
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT (name, measurement_unit) DO NOTHING RETURNING id
    ",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(id.map(|id| id.0))
}
