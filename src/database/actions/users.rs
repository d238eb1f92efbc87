use crate::{
    authentication::{cryptography::verify_password, jwt::generate_jwt_session},
    error::{ApiError, FieldErrors},
    pagination::{PageContext, Pagination},
    schema::{Id, User, UserRow},
    validators::NewUser,
};

use crate::database::error::QueryError;

use sqlx::{Pool, Postgres};

pub async fn get_user_by_email(
    pool: &Pool<Postgres>,
    email: &str,
) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = LOWER($1)")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, ApiError> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Fetches a user together with whether `viewer` follows them.
pub async fn get_user_row(
    pool: &Pool<Postgres>,
    user_id: Id,
    viewer: Option<Id>,
) -> Result<Option<UserRow>, ApiError> {
    let row: Option<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id) AS is_subscribed,
            1::BIGINT AS count
        FROM users u
        WHERE u.id = $1
    ",
    )
    .bind(user_id)
    .bind(viewer)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_user_rows(
    pool: &Pool<Postgres>,
    user_ids: &[Id],
    viewer: Option<Id>,
) -> Result<Vec<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $2 AND s.author_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        WHERE u.id = ANY($1)
    ",
    )
    .bind(user_ids)
    .bind(viewer)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn fetch_users(
    pool: &Pool<Postgres>,
    viewer: Option<Id>,
    pagination: Pagination,
    base_path: &str,
) -> Result<PageContext<UserRow>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "
        SELECT u.id, u.email, u.username, u.first_name, u.last_name,
            EXISTS(SELECT 1 FROM subscriptions s WHERE s.user_id = $1 AND s.author_id = u.id) AS is_subscribed,
            COUNT(*) OVER() AS count
        FROM users u
        ORDER BY u.id
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(viewer)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let total_count = rows.first().map(|u| u.count).unwrap_or(0);
    PageContext::from_rows(rows, total_count, pagination, base_path)
}

/// Creates a user. `password_hash` is the argon2 hash of their password.
pub async fn register_user(
    user: &NewUser,
    password_hash: &str,
    pool: &Pool<Postgres>,
) -> Result<User, ApiError> {
    let mut errors = FieldErrors::new();
    let taken: Vec<(String, String)> =
        sqlx::query_as("SELECT email, username FROM users WHERE email = $1 OR username = $2")
            .bind(&user.email)
            .bind(&user.username)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    for (email, username) in taken {
        if email == user.email {
            errors.add("email", "A user with this email already exists.");
        }
        if username == user.username {
            errors.add("username", "A user with this username already exists.");
        }
    }
    errors.into_result(())?;

    let row: User = sqlx::query_as(
        "
        INSERT INTO users (email, username, first_name, last_name, password)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *;
    ",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    log::info!("Registered user {} ({})", row.id, row.username);
    Ok(row)
}

pub async fn login_user(
    email: &str,
    password: &str,
    secret: &str,
    lifetime_hours: i64,
    pool: &Pool<Postgres>,
) -> Result<String, ApiError> {
    let invalid = || ApiError::InvalidRequest(String::from("Invalid credentials."));

    let user = get_user_by_email(pool, email).await?.ok_or_else(invalid)?;

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        log::error!("Stored password hash for user {} is unreadable: {e}", user.id);
        ApiError::Internal(String::from("Unreadable password hash"))
    })?;
    if !authenticated {
        return Err(invalid());
    }

    generate_jwt_session(&user, secret, lifetime_hours)
}

pub async fn delete_user(user_id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
