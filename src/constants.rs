pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const NAME_MAX_LENGTH: usize = 200;
pub const USER_FIELD_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MAX_LENGTH: usize = 150;

pub const COOKING_TIME_MIN: i64 = 1;
pub const COOKING_TIME_MAX: i64 = 32000;

pub const AMOUNT_MIN: i64 = 1;
pub const AMOUNT_MAX: i64 = 32000;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "png"),
    ("jpeg", "jpg"),
    ("jpg", "jpg"),
    ("gif", "gif"),
    ("webp", "webp"),
];

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
