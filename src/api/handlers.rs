pub mod recipes;
pub mod reference;
pub mod subscriptions;
pub mod users;

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use crate::{
    actions::{
        recipes::{group_rows, list_recipe_parts},
        subscriptions::{count_author_recipes, list_author_recipes},
        tags::list_recipe_tags,
        users::list_user_rows,
    },
    error::ApiError,
    schema::{Id, RecipeRow, Tag, UserRow},
    serializers::{RecipeRead, ShortRecipeRead, SubscriptionRead, UserRead},
    state::AppState,
};

/// Expands recipe rows into full read shapes, batching the author, tag and
/// ingredient lookups over the whole set.
pub async fn load_recipe_reads(
    rows: Vec<RecipeRow>,
    viewer: Option<Id>,
    state: &Arc<AppState>,
) -> Result<Vec<RecipeRead>, ApiError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let author_ids: Vec<Id> = rows
        .iter()
        .map(|row| row.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let authors: HashMap<Id, UserRead> = list_user_rows(&state.pool, &author_ids, viewer)
        .await?
        .into_iter()
        .map(|row| (row.id, UserRead::from(row)))
        .collect();
    let mut tags = group_rows(list_recipe_tags(&state.pool, &recipe_ids).await?, |tag| {
        tag.recipe_id
    });
    let mut parts = group_rows(list_recipe_parts(&state.pool, &recipe_ids).await?, |part| {
        part.recipe_id
    });

    rows.into_iter()
        .map(|row| -> Result<RecipeRead, ApiError> {
            let author = authors.get(&row.author_id).cloned().ok_or_else(|| {
                ApiError::Internal(format!(
                    "Author {} of recipe {} is missing",
                    row.author_id, row.id
                ))
            })?;
            let recipe_tags: Vec<Tag> = tags
                .remove(&row.id)
                .unwrap_or_default()
                .into_iter()
                .map(Tag::from)
                .collect();
            let recipe_parts = parts.remove(&row.id).unwrap_or_default();

            Ok(RecipeRead::assemble(
                row,
                author,
                recipe_tags,
                recipe_parts,
                &state.media,
            ))
        })
        .collect()
}

pub async fn load_recipe_read(
    row: RecipeRow,
    viewer: Option<Id>,
    state: &Arc<AppState>,
) -> Result<RecipeRead, ApiError> {
    load_recipe_reads(vec![row], viewer, state)
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(String::from("Recipe vanished while loading")))
}

/// Wraps followed authors with a preview of their newest recipes.
pub async fn load_subscription_reads(
    authors: Vec<UserRow>,
    recipes_limit: Option<i64>,
    state: &Arc<AppState>,
) -> Result<Vec<SubscriptionRead>, ApiError> {
    if authors.is_empty() {
        return Ok(vec![]);
    }

    let author_ids: Vec<Id> = authors.iter().map(|author| author.id).collect();

    let counts: HashMap<Id, i64> = count_author_recipes(&author_ids, &state.pool)
        .await?
        .into_iter()
        .map(|row| (row.author_id, row.count))
        .collect();
    let mut recipes = group_rows(
        list_author_recipes(&author_ids, recipes_limit, &state.pool).await?,
        |recipe| recipe.author_id,
    );

    Ok(authors
        .into_iter()
        .map(|author| SubscriptionRead {
            recipes: recipes
                .remove(&author.id)
                .unwrap_or_default()
                .into_iter()
                .map(|recipe| ShortRecipeRead::from_row(recipe, &state.media))
                .collect(),
            recipes_count: counts.get(&author.id).copied().unwrap_or(0),
            author: UserRead::from(author),
        })
        .collect())
}
