use crate::models::{NewIngredient, NewRecipeIngredient, NewRecipeTag, NewTag};
use crate::schema::{ingredients, recipe_ingredients, recipe_tags, tags};
use diesel::prelude::*;
use serde::Deserialize;
use utoipa::ToSchema;

/// Nested tag reference in a recipe write payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TagName {
    pub name: String,
}

/// Nested ingredient reference in a recipe write payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientName {
    pub name: String,
}

/// Reject blank names before any write happens.
pub fn validate_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), String> {
    for name in names {
        if name.trim().is_empty() {
            return Err(format!("{} name cannot be empty", kind));
        }
    }
    Ok(())
}

/// Trim and de-duplicate names, preserving first-occurrence order. A payload
/// naming the same tag twice must resolve to a single row and association.
pub fn dedupe_names(names: &[String]) -> Vec<&str> {
    let mut seen = Vec::new();
    for name in names {
        let name = name.trim();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Replace a recipe's tag set with the named tags, reusing the caller's
/// existing rows and creating missing ones. The ON CONFLICT path leans on the
/// (user_id, name) unique constraint, so concurrent writers converge on one
/// row. Callers run this inside the surrounding recipe transaction.
pub fn set_recipe_tags(
    conn: &mut PgConnection,
    user_id: i64,
    recipe_id: i64,
    names: &[String],
) -> QueryResult<()> {
    diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
        .execute(conn)?;

    for name in dedupe_names(names) {
        diesel::insert_into(tags::table)
            .values(&NewTag { user_id, name })
            .on_conflict((tags::user_id, tags::name))
            .do_nothing()
            .execute(conn)?;

        let tag_id: i64 = tags::table
            .filter(tags::user_id.eq(user_id))
            .filter(tags::name.eq(name))
            .select(tags::id)
            .first(conn)?;

        diesel::insert_into(recipe_tags::table)
            .values(&NewRecipeTag { recipe_id, tag_id })
            .execute(conn)?;
    }

    Ok(())
}

/// Same get-or-create semantics as [`set_recipe_tags`], for ingredients.
pub fn set_recipe_ingredients(
    conn: &mut PgConnection,
    user_id: i64,
    recipe_id: i64,
    names: &[String],
) -> QueryResult<()> {
    diesel::delete(
        recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
    )
    .execute(conn)?;

    for name in dedupe_names(names) {
        diesel::insert_into(ingredients::table)
            .values(&NewIngredient { user_id, name })
            .on_conflict((ingredients::user_id, ingredients::name))
            .do_nothing()
            .execute(conn)?;

        let ingredient_id: i64 = ingredients::table
            .filter(ingredients::user_id.eq(user_id))
            .filter(ingredients::name.eq(name))
            .select(ingredients::id)
            .first(conn)?;

        diesel::insert_into(recipe_ingredients::table)
            .values(&NewRecipeIngredient {
                recipe_id,
                ingredient_id,
            })
            .execute(conn)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedupe_collapses_repeated_names() {
        assert_eq!(
            dedupe_names(&names(&["Vegan", "Vegan", "Dessert"])),
            vec!["Vegan", "Dessert"]
        );
    }

    #[test]
    fn dedupe_trims_before_comparing() {
        assert_eq!(dedupe_names(&names(&["Vegan", " Vegan "])), vec!["Vegan"]);
    }

    #[test]
    fn dedupe_keeps_distinct_case() {
        // Names match exactly; "vegan" and "Vegan" are different tags
        assert_eq!(
            dedupe_names(&names(&["vegan", "Vegan"])),
            vec!["vegan", "Vegan"]
        );
    }

    #[test]
    fn validate_rejects_blank_names() {
        assert!(validate_names("Tag", ["ok", "  "].into_iter()).is_err());
        assert!(validate_names("Tag", ["ok"].into_iter()).is_ok());
        assert!(validate_names("Tag", std::iter::empty()).is_ok());
    }
}

// Exercised against a real database when DATABASE_URL is set; each test
// rolls back its own transaction.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::test_connection;
    use crate::models::{NewRecipe, NewUser};
    use crate::schema::{recipe_tags, recipes, tags, users};

    fn create_user(conn: &mut PgConnection, email: &str) -> i64 {
        diesel::insert_into(users::table)
            .values(&NewUser {
                email,
                password_hash: "x",
                name: "Test",
            })
            .returning(users::id)
            .get_result(conn)
            .unwrap()
    }

    fn create_recipe(conn: &mut PgConnection, user_id: i64) -> i64 {
        diesel::insert_into(recipes::table)
            .values(&NewRecipe {
                user_id,
                title: "Test recipe",
                description: "",
                time_minutes: 10,
                link: "",
                instructions: "",
            })
            .returning(recipes::id)
            .get_result(conn)
            .unwrap()
    }

    fn tag_id(conn: &mut PgConnection, user_id: i64, name: &str) -> i64 {
        tags::table
            .filter(tags::user_id.eq(user_id))
            .filter(tags::name.eq(name))
            .select(tags::id)
            .first(conn)
            .unwrap()
    }

    fn association_count(conn: &mut PgConnection, recipe_id: i64) -> i64 {
        recipe_tags::table
            .filter(recipe_tags::recipe_id.eq(recipe_id))
            .count()
            .get_result(conn)
            .unwrap()
    }

    #[test]
    fn tags_are_reused_per_user_but_not_across_users() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        conn.test_transaction::<_, diesel::result::Error, _>(|conn| {
            let alice = create_user(conn, "alice-tags@example.com");
            let bob = create_user(conn, "bob-tags@example.com");
            let alice_recipe = create_recipe(conn, alice);
            let bob_recipe = create_recipe(conn, bob);

            set_recipe_tags(conn, alice, alice_recipe, &["Vegan".to_string()])?;
            set_recipe_tags(conn, bob, bob_recipe, &["Vegan".to_string()])?;

            // Same name, one row per owner
            let alice_tag = tag_id(conn, alice, "Vegan");
            let bob_tag = tag_id(conn, bob, "Vegan");
            assert_ne!(alice_tag, bob_tag);

            // Re-submitting the same name resolves to the existing row
            set_recipe_tags(conn, alice, alice_recipe, &["Vegan".to_string()])?;
            assert_eq!(tag_id(conn, alice, "Vegan"), alice_tag);

            Ok(())
        });
    }

    #[test]
    fn duplicate_names_in_one_payload_yield_one_row_and_association() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        conn.test_transaction::<_, diesel::result::Error, _>(|conn| {
            let user = create_user(conn, "dup-tags@example.com");
            let recipe = create_recipe(conn, user);

            set_recipe_tags(
                conn,
                user,
                recipe,
                &["Vegan".to_string(), " Vegan ".to_string()],
            )?;

            let rows: i64 = tags::table
                .filter(tags::user_id.eq(user))
                .filter(tags::name.eq("Vegan"))
                .count()
                .get_result(conn)?;
            assert_eq!(rows, 1);
            assert_eq!(association_count(conn, recipe), 1);

            Ok(())
        });
    }

    #[test]
    fn empty_name_list_clears_associations_but_keeps_tag_rows() {
        let Some(mut conn) = test_connection() else {
            return;
        };
        conn.test_transaction::<_, diesel::result::Error, _>(|conn| {
            let user = create_user(conn, "clear-tags@example.com");
            let recipe = create_recipe(conn, user);

            set_recipe_tags(conn, user, recipe, &["Dessert".to_string()])?;
            assert_eq!(association_count(conn, recipe), 1);

            set_recipe_tags(conn, user, recipe, &[])?;
            assert_eq!(association_count(conn, recipe), 0);

            // The tag itself stays in the user's vocabulary
            let _ = tag_id(conn, user, "Dessert");

            Ok(())
        });
    }
}
