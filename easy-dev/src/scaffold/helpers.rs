//! Naming helpers for code generation
//!
//! Every name derived from an entity (module, table, route, accessor, foreign
//! key) goes through here so generated artifacts and relation accessors agree.

use inflector::Inflector;

/// Naming conventions shared by templates and the relation synchronizer
pub struct TemplateHelpers;

impl TemplateHelpers {
    /// Convert string to `snake_case`
    ///
    /// # Examples
    ///
    /// ```
    /// # use easy_dev::scaffold::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_snake_case("UserProfile"), "user_profile");
    /// ```
    #[must_use]
    pub fn to_snake_case(input: &str) -> String {
        input.to_snake_case()
    }

    /// Pluralize a word
    ///
    /// The inflector library has known limitations with some irregular plurals.
    /// Entity names are typically regular words.
    #[must_use]
    pub fn pluralize(input: &str) -> String {
        input.to_plural()
    }

    /// Convert an entity name to its table name (`snake_case` plural)
    ///
    /// # Examples
    ///
    /// ```
    /// # use easy_dev::scaffold::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_table_name("Post"), "posts");
    /// assert_eq!(TemplateHelpers::to_table_name("Category"), "categories");
    /// ```
    #[must_use]
    pub fn to_table_name(entity: &str) -> String {
        Self::pluralize(&Self::to_snake_case(entity))
    }

    /// Convert an entity name to its route path (kebab-case plural)
    #[must_use]
    pub fn to_route_path(entity: &str) -> String {
        format!("/{}", Self::pluralize(&entity.to_kebab_case()))
    }

    /// Human-readable title
    #[must_use]
    pub fn to_title(entity: &str) -> String {
        entity.to_title_case()
    }

    /// Human-readable plural title
    #[must_use]
    pub fn to_plural_title(entity: &str) -> String {
        Self::pluralize(&Self::to_title(entity))
    }

    /// Foreign key column pointing at `entity`
    ///
    /// # Examples
    ///
    /// ```
    /// # use easy_dev::scaffold::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_foreign_key("Post"), "post_id");
    /// assert_eq!(TemplateHelpers::to_foreign_key("UserProfile"), "user_profile_id");
    /// ```
    #[must_use]
    pub fn to_foreign_key(entity: &str) -> String {
        format!("{}_id", Self::to_snake_case(entity))
    }

    /// Accessor returning a single related entity (`post()`)
    #[must_use]
    pub fn to_singular_accessor(entity: &str) -> String {
        Self::to_snake_case(entity)
    }

    /// Accessor returning a collection of related entities (`comments()`)
    #[must_use]
    pub fn to_plural_accessor(entity: &str) -> String {
        Self::to_table_name(entity)
    }

    /// Join table name for a many-to-many pair, independent of argument order
    ///
    /// # Examples
    ///
    /// ```
    /// # use easy_dev::scaffold::TemplateHelpers;
    /// assert_eq!(TemplateHelpers::to_pivot_table("Tag", "Post"), "post_tag");
    /// ```
    #[must_use]
    pub fn to_pivot_table(a: &str, b: &str) -> String {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!(
            "{}_{}",
            Self::to_snake_case(first),
            Self::to_snake_case(second)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(TemplateHelpers::to_snake_case("UserProfile"), "user_profile");
        assert_eq!(TemplateHelpers::to_snake_case("simple"), "simple");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(TemplateHelpers::pluralize("post"), "posts");
        assert_eq!(TemplateHelpers::pluralize("category"), "categories");
        assert_eq!(TemplateHelpers::pluralize("comment"), "comments");
    }

    #[test]
    fn test_table_name() {
        assert_eq!(TemplateHelpers::to_table_name("Post"), "posts");
        assert_eq!(TemplateHelpers::to_table_name("UserProfile"), "user_profiles");
        assert_eq!(TemplateHelpers::to_table_name("Category"), "categories");
    }

    #[test]
    fn test_route_path() {
        assert_eq!(TemplateHelpers::to_route_path("Post"), "/posts");
        assert_eq!(TemplateHelpers::to_route_path("UserProfile"), "/user-profiles");
    }

    #[test]
    fn test_titles() {
        assert_eq!(TemplateHelpers::to_title("UserProfile"), "User Profile");
        assert_eq!(TemplateHelpers::to_plural_title("UserProfile"), "User Profiles");
    }

    #[test]
    fn test_accessors() {
        assert_eq!(TemplateHelpers::to_singular_accessor("Post"), "post");
        assert_eq!(TemplateHelpers::to_plural_accessor("Comment"), "comments");
        assert_eq!(TemplateHelpers::to_plural_accessor("UserProfile"), "user_profiles");
    }

    #[test]
    fn test_pivot_table_is_order_independent() {
        assert_eq!(
            TemplateHelpers::to_pivot_table("Post", "Tag"),
            TemplateHelpers::to_pivot_table("Tag", "Post")
        );
    }
}
