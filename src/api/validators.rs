use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    constants::{
        AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, EMAIL_MAX_LENGTH,
        NAME_MAX_LENGTH, PASSWORD_MAX_LENGTH, USER_FIELD_MAX_LENGTH,
    },
    error::{ApiError, FieldErrors},
    media::{decode_data_uri, DecodedImage},
    schema::Id,
    serializers::{IngredientAmountWrite, RecipeWrite, UserWrite},
};

static COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("valid regex"));
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"));
static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));
static REAL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"));

pub fn is_valid_color(value: &str) -> bool {
    COLOR.is_match(value)
}

pub fn is_valid_slug(value: &str) -> bool {
    SLUG.is_match(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<DecodedImage>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<(Id, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: DecodedImage,
    pub tags: Vec<Id>,
    pub ingredients: Vec<(Id, i32)>,
}

fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max: Option<usize>) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if let Some(max) = max {
        if value.chars().count() > max {
            errors.add(field, format!("Ensure this field has no more than {max} characters."));
        }
    }
}

fn check_tags(errors: &mut FieldErrors, tags: &[Id]) {
    if tags.is_empty() {
        errors.add("tags", "At least one tag is required.");
        return;
    }

    let mut seen = HashSet::new();
    for tag in tags {
        if !seen.insert(tag) {
            errors.add("tags", format!("Tag {tag} is listed more than once."));
        }
    }
}

fn check_ingredients(errors: &mut FieldErrors, ingredients: &[IngredientAmountWrite]) {
    if ingredients.is_empty() {
        errors.add("ingredients", "At least one ingredient is required.");
        return;
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            errors.add(
                "ingredients",
                format!("Ingredient {} is listed more than once.", ingredient.id),
            );
        }
        if !(AMOUNT_MIN..=AMOUNT_MAX).contains(&ingredient.amount) {
            errors.add(
                "ingredients",
                format!(
                    "Amount of ingredient {} must be between {AMOUNT_MIN} and {AMOUNT_MAX}.",
                    ingredient.id
                ),
            );
        }
    }
}

/// Validates a recipe body. `partial` allows name, text, cooking time and image to
/// be omitted; tags and ingredients are always required since they are replaced
/// wholesale.
pub fn validate_recipe(write: RecipeWrite, partial: bool) -> Result<RecipeChanges, ApiError> {
    let mut errors = FieldErrors::new();
    let required = |errors: &mut FieldErrors, field: &str, present: bool| {
        if !present && !partial {
            errors.add(field, "This field is required.");
        }
    };

    required(&mut errors, "name", write.name.is_some());
    if let Some(name) = &write.name {
        check_text(&mut errors, "name", name, Some(NAME_MAX_LENGTH));
    }

    required(&mut errors, "text", write.text.is_some());
    if let Some(text) = &write.text {
        check_text(&mut errors, "text", text, None);
    }

    required(&mut errors, "cooking_time", write.cooking_time.is_some());
    if let Some(cooking_time) = write.cooking_time {
        if !(COOKING_TIME_MIN..=COOKING_TIME_MAX).contains(&cooking_time) {
            errors.add(
                "cooking_time",
                format!("Cooking time must be between {COOKING_TIME_MIN} and {COOKING_TIME_MAX}."),
            );
        }
    }

    required(&mut errors, "image", write.image.is_some());
    let image = match write.image.as_deref().map(decode_data_uri) {
        Some(Ok(image)) => Some(image),
        Some(Err(info)) => {
            errors.add("image", info);
            None
        }
        None => None,
    };

    let tags = write.tags.unwrap_or_default();
    check_tags(&mut errors, &tags);

    let ingredients = write.ingredients.unwrap_or_default();
    check_ingredients(&mut errors, &ingredients);

    errors.into_result(())?;

    Ok(RecipeChanges {
        name: write.name.map(|name| name.trim().to_string()),
        text: write.text,
        // bounds checked above
        cooking_time: write.cooking_time.map(|time| time as i32),
        image,
        tags,
        ingredients: ingredients
            .into_iter()
            .map(|ingredient| (ingredient.id, ingredient.amount as i32))
            .collect(),
    })
}

pub fn validate_new_recipe(write: RecipeWrite) -> Result<NewRecipe, ApiError> {
    let changes = validate_recipe(write, false)?;

    match changes {
        RecipeChanges {
            name: Some(name),
            text: Some(text),
            cooking_time: Some(cooking_time),
            image: Some(image),
            tags,
            ingredients,
        } => Ok(NewRecipe {
            name,
            text,
            cooking_time,
            image,
            tags,
            ingredients,
        }),
        _ => Err(ApiError::Internal(String::from(
            "Recipe passed validation without required fields",
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn check_user_field<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: &'a Option<String>,
    max: usize,
    pattern: Option<(&Regex, &str)>,
) -> &'a str {
    let Some(value) = value.as_deref() else {
        errors.add(field, "This field is required.");
        return "";
    };

    check_text(errors, field, value, Some(max));
    if let Some((pattern, message)) = pattern {
        if !value.is_empty() && !pattern.is_match(value) {
            errors.add(field, message);
        }
    }
    value
}

pub fn validate_new_user(write: UserWrite) -> Result<NewUser, ApiError> {
    let mut errors = FieldErrors::new();

    let email = check_user_field(
        &mut errors,
        "email",
        &write.email,
        EMAIL_MAX_LENGTH,
        Some((&*EMAIL, "Enter a valid email address.")),
    );
    let username = check_user_field(
        &mut errors,
        "username",
        &write.username,
        USER_FIELD_MAX_LENGTH,
        Some((
            &*USERNAME,
            "Username may only contain letters, digits and @/./+/-/_ characters.",
        )),
    );
    if username.eq_ignore_ascii_case("me") {
        errors.add("username", "This username is reserved.");
    }
    let first_name = check_user_field(
        &mut errors,
        "first_name",
        &write.first_name,
        USER_FIELD_MAX_LENGTH,
        Some((&*REAL_NAME, "Name may only contain letters, digits, - and _.")),
    );
    let last_name = check_user_field(
        &mut errors,
        "last_name",
        &write.last_name,
        USER_FIELD_MAX_LENGTH,
        Some((&*REAL_NAME, "Name may only contain letters, digits, - and _.")),
    );
    let password = check_user_field(
        &mut errors,
        "password",
        &write.password,
        PASSWORD_MAX_LENGTH,
        None,
    );

    let user = NewUser {
        email: email.to_lowercase(),
        username: username.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        password: password.to_string(),
    };
    errors.into_result(user)
}

pub fn validate_subscription(user_id: Id, author_id: Id) -> Result<(), ApiError> {
    if user_id == author_id {
        return Err(ApiError::InvalidRequest(String::from(
            "You cannot subscribe to yourself.",
        )));
    }
    Ok(())
}

/// `recipes_limit` caps the preview in subscription listings; absent means no cap.
pub fn parse_recipes_limit(value: Option<&str>) -> Result<Option<i64>, ApiError> {
    match value {
        None => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .ok()
            .filter(|limit| *limit >= 0)
            .map(Some)
            .ok_or_else(|| {
                FieldErrors::single("recipes_limit", "recipes_limit must be a non-negative integer.")
                    .into()
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/gif;base64,R0lGODlhAQABAAAAACw=";

    fn recipe() -> RecipeWrite {
        RecipeWrite {
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
            image: Some(String::from(PIXEL)),
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![
                IngredientAmountWrite { id: 10, amount: 200 },
                IngredientAmountWrite { id: 11, amount: 2 },
            ]),
        }
    }

    fn field_errors(result: Result<impl std::fmt::Debug, ApiError>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_recipe_passes() {
        let recipe = validate_new_recipe(recipe()).unwrap();

        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.image.extension, "gif");
        assert_eq!(recipe.ingredients, vec![(10, 200), (11, 2)]);
    }

    #[test]
    fn duplicate_tag_fails() {
        let mut write = recipe();
        write.tags = Some(vec![1, 1]);

        assert!(field_errors(validate_new_recipe(write)).contains("tags"));
    }

    #[test]
    fn duplicate_ingredient_fails_even_with_different_amounts() {
        let mut write = recipe();
        write.ingredients = Some(vec![
            IngredientAmountWrite { id: 10, amount: 1 },
            IngredientAmountWrite { id: 10, amount: 5 },
        ]);

        assert!(field_errors(validate_recipe(write, true)).contains("ingredients"));
    }

    #[test]
    fn empty_lists_fail() {
        let mut write = recipe();
        write.tags = Some(vec![]);
        write.ingredients = None;

        let errors = field_errors(validate_new_recipe(write));
        assert!(errors.contains("tags"));
        assert!(errors.contains("ingredients"));
    }

    #[test]
    fn bounds_are_enforced() {
        let mut write = recipe();
        write.cooking_time = Some(0);
        write.ingredients = Some(vec![IngredientAmountWrite {
            id: 10,
            amount: AMOUNT_MAX + 1,
        }]);

        let errors = field_errors(validate_new_recipe(write));
        assert!(errors.contains("cooking_time"));
        assert!(errors.contains("ingredients"));
    }

    #[test]
    fn partial_update_may_skip_scalar_fields() {
        let write = RecipeWrite {
            tags: Some(vec![3]),
            ingredients: Some(vec![IngredientAmountWrite { id: 1, amount: 1 }]),
            ..Default::default()
        };

        let changes = validate_recipe(write.clone(), true).unwrap();
        assert!(changes.name.is_none() && changes.image.is_none());

        let errors = field_errors(validate_new_recipe(write));
        for field in ["name", "text", "cooking_time", "image"] {
            assert!(errors.contains(field), "{field}");
        }
    }

    #[test]
    fn broken_image_is_a_field_error() {
        let mut write = recipe();
        write.image = Some(String::from("not an image"));

        assert!(field_errors(validate_new_recipe(write)).contains("image"));
    }

    #[test]
    fn user_fields_are_checked() {
        let errors = field_errors(validate_new_user(UserWrite {
            email: Some(String::from("nope")),
            username: Some(String::from("me")),
            first_name: Some(String::from("Ada Lovelace")),
            last_name: None,
            password: Some(String::from("pw")),
        }));

        for field in ["email", "username", "first_name", "last_name"] {
            assert!(errors.contains(field), "{field}");
        }
        assert!(!errors.contains("password"));
    }

    #[test]
    fn user_email_is_normalized() {
        let user = validate_new_user(UserWrite {
            email: Some(String::from("Chef@Example.com")),
            username: Some(String::from("chef.1")),
            first_name: Some(String::from("Иван")),
            last_name: Some(String::from("Петров")),
            password: Some(String::from("s3cret")),
        })
        .unwrap();

        assert_eq!(user.email, "chef@example.com");
    }

    #[test]
    fn self_subscription_fails() {
        assert!(validate_subscription(4, 4).is_err());
        assert!(validate_subscription(4, 5).is_ok());
    }

    #[test]
    fn recipes_limit_parsing() {
        assert_eq!(parse_recipes_limit(None).unwrap(), None);
        assert_eq!(parse_recipes_limit(Some("3")).unwrap(), Some(3));
        assert!(parse_recipes_limit(Some("three")).is_err());
        assert!(parse_recipes_limit(Some("-1")).is_err());
    }

    #[test]
    fn colors_and_slugs() {
        assert!(is_valid_color("#49B64E"));
        assert!(is_valid_color("#fff"));
        assert!(!is_valid_color("49B64E"));
        assert!(is_valid_slug("breakfast_2"));
        assert!(!is_valid_slug("зав трак"));
    }
}
