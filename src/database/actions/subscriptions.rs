use crate::{
    database::error::QueryError,
    error::ApiError,
    pagination::{PageContext, Pagination},
    schema::{Id, RecipeCount, ShortRecipeRow, UserRow},
    validators::validate_subscription,
};

use sqlx::{Pool, Postgres};

use super::users::get_user_by_id;

async fn ensure_author(author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    get_user_by_id(pool, author_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("User"))
}

pub async fn is_subscribed(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

pub async fn subscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    validate_subscription(user_id, author_id)?;
    ensure_author(author_id, pool).await?;

    if is_subscribed(user_id, author_id, pool).await? {
        return Err(ApiError::InvalidRequest(String::from(
            "You are already subscribed to this author.",
        )));
    }

    sqlx::query("INSERT INTO subscriptions (user_id, author_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::debug!("User {user_id} subscribed to {author_id}");
    Ok(())
}

pub async fn unsubscribe(user_id: Id, author_id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    ensure_author(author_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::InvalidRequest(String::from(
            "You are not subscribed to this author.",
        )));
    }
    Ok(())
}

/// Authors the user follows, most recent subscription first.
pub async fn fetch_subscriptions(
    user_id: Id,
    pagination: Pagination,
    base_path: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            TRUE AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM subscriptions s
        INNER JOIN users u ON u.id = s.author_id
        WHERE s.user_id = $1
        ORDER BY s.id DESC
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|u| u.count).unwrap_or(0);
    PageContext::from_rows(rows, total_count, pagination, base_path)
}

/// Newest recipes of each author, at most `limit` per author when given.
pub async fn list_author_recipes(
    author_ids: &[Id],
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipeRow>, ApiError> {
    let rows: Vec<ShortRecipeRow> = sqlx::query_as(
        "
        SELECT id, author_id, name, image, cooking_time
        FROM (
            SELECT r.id, r.author_id, r.name, r.image, r.cooking_time, r.pub_date,
                ROW_NUMBER() OVER (PARTITION BY r.author_id ORDER BY r.pub_date DESC, r.id DESC) AS position
            FROM recipes r
            WHERE r.author_id = ANY($1)
        ) ranked
        WHERE $2::BIGINT IS NULL OR position <= $2
        ORDER BY author_id, pub_date DESC, id DESC
    ",
    )
    .bind(author_ids)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_author_recipes(
    author_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeCount>, ApiError> {
    let rows: Vec<RecipeCount> = sqlx::query_as(
        "SELECT author_id, COUNT(*) AS count FROM recipes WHERE author_id = ANY($1) GROUP BY author_id",
    )
    .bind(author_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
