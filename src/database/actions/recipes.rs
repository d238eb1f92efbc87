use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    database::error::QueryError,
    error::{ApiError, FieldErrors},
    jwt::SessionData,
    pagination::{PageContext, Pagination},
    schema::{Id, Recipe, RecipePart, RecipeRow},
    validators::{NewRecipe, RecipeChanges},
};

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

/// Narrowing applied to the recipe list. The favorite and cart flags only
/// apply when there is a viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn push_recipe_columns(builder: &mut QueryBuilder<'_, Postgres>, viewer: Option<Id>) {
    builder
        .push(
            "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.pub_date, \
             EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
        )
        .push_bind(viewer)
        .push(
            ") AS is_favorited, \
             EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
        )
        .push_bind(viewer)
        .push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pagination: Pagination,
    base_path: &str,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeRow>, ApiError> {
    let mut builder = QueryBuilder::new("");
    push_recipe_columns(&mut builder, viewer);

    if let Some(author) = filter.author {
        builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        builder
            .push(
                " AND EXISTS(SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(viewer) = viewer {
        if filter.is_favorited {
            builder
                .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            builder
                .push(" AND EXISTS(SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ")
                .push_bind(viewer)
                .push(")");
        }
    }

    builder
        .push(" ORDER BY r.pub_date DESC, r.id DESC LIMIT ")
        .push_bind(pagination.limit)
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let rows: Vec<RecipeRow> = builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    PageContext::from_rows(rows, total_count, pagination, base_path)
}

pub async fn get_recipe_row(
    recipe_id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeRow>, ApiError> {
    let mut builder = QueryBuilder::new("");
    push_recipe_columns(&mut builder, viewer);
    builder.push(" AND r.id = ").push_bind(recipe_id);

    let row: Option<RecipeRow> = builder
        .build_query_as()
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe(recipe_id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Fetches a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    recipe_id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    session.authenticate_owner(
        recipe.author_id,
        ActionType::ManageOwnRecipes,
        ActionType::ManageAllRecipes,
    )?;

    Ok(recipe)
}

pub async fn list_recipe_parts(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<Vec<RecipePart>, ApiError> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name,
            i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub fn group_rows<T>(rows: Vec<T>, key: impl Fn(&T) -> Id) -> HashMap<Id, Vec<T>> {
    let mut map: HashMap<Id, Vec<T>> = HashMap::new();
    for row in rows {
        map.entry(key(&row)).or_default().push(row);
    }
    map
}

async fn check_references(
    tx: &mut Transaction<'_, Postgres>,
    tags: &[Id],
    ingredients: &[(Id, i32)],
) -> Result<(), ApiError> {
    let mut errors = FieldErrors::new();

    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tags)
        .fetch_all(&mut **tx)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();
    for tag in tags.iter().filter(|tag| !found.contains(*tag)) {
        errors.add("tags", format!("Tag {tag} does not exist."));
    }

    let ingredient_ids: Vec<Id> = ingredients.iter().map(|(id, _)| *id).collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ingredient_ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(QueryError::from)?;
    let found: HashSet<Id> = found.into_iter().map(|row| row.0).collect();
    for id in ingredient_ids.iter().filter(|id| !found.contains(*id)) {
        errors.add("ingredients", format!("Ingredient {id} does not exist."));
    }

    errors.into_result(())
}

async fn insert_links(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Id,
    tags: &[Id],
    ingredients: &[(Id, i32)],
) -> Result<(), ApiError> {
    if !tags.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        builder.push_values(tags, |mut b, tag| {
            b.push_bind(recipe_id).push_bind(*tag);
        });
        builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(QueryError::from)?;
    }

    if !ingredients.is_empty() {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");
        builder.push_values(ingredients, |mut b, &(ingredient_id, amount)| {
            b.push_bind(recipe_id)
                .push_bind(ingredient_id)
                .push_bind(amount);
        });
        builder
            .build()
            .execute(&mut **tx)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Creates the recipe and all its links in one transaction. `image` is the
/// already stored relative image path.
pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    check_references(&mut tx, &recipe.tags, &recipe.ingredients).await?;

    let row: Recipe = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    insert_links(&mut tx, row.id, &recipe.tags, &recipe.ingredients).await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("User {author_id} created recipe {} ({})", row.id, row.name);
    Ok(row)
}

/// Applies `changes` and replaces the tag and ingredient sets wholesale. Either
/// everything is stored or nothing is.
pub async fn update_recipe(
    recipe_id: Id,
    changes: &RecipeChanges,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    check_references(&mut tx, &changes.tags, &changes.ingredients).await?;

    let row: Recipe = sqlx::query_as(
        "
        UPDATE recipes SET
            name = COALESCE($2, name),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time),
            image = COALESCE($5, image)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(recipe_id)
    .bind(changes.name.as_deref())
    .bind(changes.text.as_deref())
    .bind(changes.cooking_time)
    .bind(image)
    .fetch_optional(&mut *tx)
    .await
    .map_err(QueryError::from)?
    .ok_or_else(|| ApiError::not_found("Recipe"))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(QueryError::from)?;

    insert_links(&mut tx, recipe_id, &changes.tags, &changes.ingredients).await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("Updated recipe {recipe_id}");
    Ok(row)
}

pub async fn delete_recipe(recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
