use std::fmt::{self, Display};

use crate::error::{ApiError, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryErrorKind {
    RowNotFound,
    UniqueViolation,
    CheckViolation,
    ForeignKeyViolation,
    Other,
}

/// A failed query, classified so constraint violations can reach the caller as
/// 400-class errors while everything else stays an internal error.
#[derive(Debug)]
pub struct QueryError {
    kind: QueryErrorKind,
    constraint: Option<String>,
    info: String,
}

impl QueryError {
    fn new(kind: QueryErrorKind, info: String) -> Self {
        Self {
            kind,
            constraint: None,
            info,
        }
    }

    pub fn constraint(&self) -> Option<&str> {
        self.constraint.as_deref()
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                let kind = if e.is_unique_violation() {
                    QueryErrorKind::UniqueViolation
                } else if e.is_check_violation() {
                    QueryErrorKind::CheckViolation
                } else if e.is_foreign_key_violation() {
                    QueryErrorKind::ForeignKeyViolation
                } else {
                    QueryErrorKind::Other
                };

                Self {
                    kind,
                    constraint: e.constraint().map(str::to_string),
                    info: format!("{e}"),
                }
            }
            sqlx::Error::RowNotFound => {
                Self::new(QueryErrorKind::RowNotFound, String::from("RowNotFound"))
            }
            sqlx::Error::ColumnNotFound(e) => {
                Self::new(QueryErrorKind::Other, format!("Column not found: {e}"))
            }
            sqlx::Error::ColumnDecode { index, source } => Self::new(
                QueryErrorKind::Other,
                format!("Column decode {index} ({source})"),
            ),
            sqlx::Error::PoolTimedOut => {
                Self::new(QueryErrorKind::Other, String::from("Pool timed out"))
            }
            sqlx::Error::PoolClosed => Self::new(QueryErrorKind::Other, String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => {
                Self::new(QueryErrorKind::Other, String::from("Worker crashed"))
            }
            e => Self::new(QueryErrorKind::Other, format!("{e}")),
        }
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{} [{constraint}]", self.info),
            None => write!(f, "{}", self.info),
        }
    }
}

impl std::error::Error for QueryError {}

/// Maps the schema's named constraints onto the messages the validation layer
/// would have produced for the same input.
fn constraint_error(constraint: &str) -> Option<ApiError> {
    let field = |field: &str, message: &str| Some(FieldErrors::single(field, message).into());

    match constraint {
        "unique_favorite" => Some(ApiError::InvalidRequest(String::from(
            "Recipe is already in favorites.",
        ))),
        "unique_shopping_cart" => Some(ApiError::InvalidRequest(String::from(
            "Recipe is already in the shopping cart.",
        ))),
        "unique_user_author" => Some(ApiError::InvalidRequest(String::from(
            "You are already subscribed to this author.",
        ))),
        "no_self_subscription" => Some(ApiError::InvalidRequest(String::from(
            "You cannot subscribe to yourself.",
        ))),
        "unique_user_email" => field("email", "A user with this email already exists."),
        "unique_user_username" => field("username", "A user with this username already exists."),
        "unique_recipe_author_name" => field("name", "You already have a recipe with this name."),
        "unique_ingredients_recipe" | "recipe_ingredients_ingredient_id_fkey" => {
            field("ingredients", "Ingredients must exist and must not repeat.")
        }
        "recipe_ingredient_amount_range" => field("ingredients", "Amount is out of range."),
        "recipe_tags_pkey" | "recipe_tags_tag_id_fkey" => {
            field("tags", "Tags must exist and must not repeat.")
        }
        "recipe_cooking_time_range" => field("cooking_time", "Cooking time is out of range."),
        "unique_tag_name" => field("name", "A tag with this name already exists."),
        "unique_tag_slug" => field("slug", "A tag with this slug already exists."),
        "tag_color_hex" => field("color", "Color must be a hex code like #49B64E."),
        "tag_slug_format" => field("slug", "Slug may only contain letters, digits, - and _."),
        "unique_ingredient_unit" => field(
            "name",
            "An ingredient with this name and measurement unit already exists.",
        ),
        _ => None,
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        let known = value.constraint().and_then(constraint_error);

        match (value.kind, known) {
            (QueryErrorKind::RowNotFound, _) => ApiError::not_found("Object"),
            (QueryErrorKind::Other, _) => {
                log::error!("Query failed: {}", value.info);
                ApiError::Internal(value.info)
            }
            (_, Some(error)) => error,
            (QueryErrorKind::ForeignKeyViolation, None) => {
                ApiError::NotFound(String::from("Referenced object not found."))
            }
            (_, None) => {
                log::warn!("Unmapped constraint violation: {}", value.info);
                ApiError::InvalidRequest(String::from("Request violates a data constraint."))
            }
        }
    }
}
