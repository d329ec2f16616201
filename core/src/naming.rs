//! Identifier case conversion used for entity names and renderer helpers.
//!
//! Words are split on `_`, `-` and spaces; empty segments are dropped.

fn words(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Converts `user_profile-data` style input to `UserProfileData`.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::naming::to_pascal_case;
///
/// assert_eq!(to_pascal_case("user_profiles"), "UserProfiles");
/// assert_eq!(to_pascal_case("ORDER items"), "OrderItems");
/// ```
pub fn to_pascal_case(input: &str) -> String {
    words(input).map(capitalize).collect()
}

/// Converts to `camelCase`.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::naming::to_camel_case;
///
/// assert_eq!(to_camel_case("user_profile_data"), "userProfileData");
/// ```
pub fn to_camel_case(input: &str) -> String {
    let pascal = to_pascal_case(input);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => pascal,
    }
}

/// Converts to `snake_case`.
///
/// # Examples
///
/// ```
/// use ddl_schema_core::naming::to_snake_case;
///
/// assert_eq!(to_snake_case("User Profile-Data"), "user_profile_data");
/// ```
pub fn to_snake_case(input: &str) -> String {
    words(input)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Strips a trailing `_id` (case-insensitive): `user_id` → `user`.
pub fn remove_id_suffix(input: &str) -> &str {
    let len = input.len();
    if len >= 3 && input.is_char_boundary(len - 3) && input[len - 3..].eq_ignore_ascii_case("_id")
    {
        &input[..len - 3]
    } else {
        input
    }
}
