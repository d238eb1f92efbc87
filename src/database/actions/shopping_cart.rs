use crate::{
    database::error::QueryError,
    error::ApiError,
    schema::{Id, RecipePart},
};

use sqlx::{Pool, Postgres};

pub async fn is_in_cart(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2)",
    )
    .bind(user_id)
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn add_to_cart(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    if is_in_cart(user_id, recipe_id, pool).await? {
        return Err(ApiError::InvalidRequest(String::from(
            "Recipe is already in the shopping cart.",
        )));
    }

    sqlx::query("INSERT INTO shopping_cart (user_id, recipe_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

pub async fn remove_from_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(String::from(
            "Recipe is not in the shopping cart.",
        )));
    }
    Ok(())
}

pub async fn count_cart(user_id: Id, pool: &Pool<Postgres>) -> Result<i64, ApiError> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shopping_cart WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.0)
}

/// Every ingredient line of every recipe in the user's cart.
pub async fn list_cart_parts(user_id: Id, pool: &Pool<Postgres>) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM shopping_cart c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
