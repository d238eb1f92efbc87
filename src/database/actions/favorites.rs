use crate::{
    database::error::QueryError,
    error::ApiError,
    schema::Id,
};

use sqlx::{Pool, Postgres};

pub async fn is_favorite(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// Marks a recipe as favorite. A second add is rejected, by the pre-check or,
/// under a race, by `unique_favorite`.
pub async fn add_favorite(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if is_favorite(user_id, recipe_id, pool).await? {
        return Err(ApiError::InvalidRequest(String::from(
            "Recipe is already in favorites.",
        )));
    }

    sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn remove_favorite(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(String::from(
            "Recipe is not in favorites.",
        )));
    }
    Ok(())
}
