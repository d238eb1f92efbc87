use serde::{Deserialize, Serialize};

use crate::{
    media::MediaStore,
    schema::{Id, Recipe, RecipePart, RecipeRow, ShortRecipeRow, Tag, User, UserRow},
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRead {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserRead {
    pub fn from_user(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
        }
    }
}

impl From<UserRow> for UserRead {
    fn from(value: UserRow) -> Self {
        Self {
            email: value.email,
            id: value.id,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
            is_subscribed: value.is_subscribed,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientRead {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipeIngredientRead {
    fn from(value: RecipePart) -> Self {
        Self {
            id: value.ingredient_id,
            name: value.name,
            measurement_unit: value.measurement_unit,
            amount: value.amount,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeRead {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<RecipeIngredientRead>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeRead {
    pub fn assemble(
        row: RecipeRow,
        author: UserRead,
        tags: Vec<Tag>,
        parts: Vec<RecipePart>,
        media: &MediaStore,
    ) -> Self {
        Self {
            id: row.id,
            tags,
            author,
            ingredients: parts.into_iter().map(RecipeIngredientRead::from).collect(),
            is_favorited: row.is_favorited,
            is_in_shopping_cart: row.is_in_shopping_cart,
            name: row.name,
            image: media.url(&row.image),
            text: row.text,
            cooking_time: row.cooking_time,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortRecipeRead {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl ShortRecipeRead {
    pub fn from_row(row: ShortRecipeRow, media: &MediaStore) -> Self {
        Self {
            id: row.id,
            image: media.url(&row.image),
            name: row.name,
            cooking_time: row.cooking_time,
        }
    }

    pub fn from_recipe(recipe: &Recipe, media: &MediaStore) -> Self {
        Self::from_row(ShortRecipeRow::from(recipe), media)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct SubscriptionRead {
    #[serde(flatten)]
    pub author: UserRead,
    pub recipes: Vec<ShortRecipeRead>,
    pub recipes_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct TokenRead {
    pub auth_token: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientAmountWrite {
    pub id: Id,
    pub amount: i64,
}

/// Every field is optional here so that missing ones surface as field errors
/// instead of a generic body error.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeWrite {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmountWrite>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UserWrite {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoginWrite {
    pub email: Option<String>,
    pub password: Option<String>,
}
