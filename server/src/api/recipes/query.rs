use crate::models::Recipe;
use crate::schema::{recipe_ingredients, recipe_tags, recipes};
use diesel::prelude::*;

/// Explicit specification for a recipe list query: owner, optional tag and
/// ingredient filters. Built once per request and handed to [`load_recipes`].
#[derive(Debug, Default, Clone)]
pub struct RecipeQuery {
    pub user_id: i64,
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

/// Parse a comma-separated list of ids, as given in `?tags=` / `?ingredients=`.
pub fn parse_id_csv(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid id in filter: {:?}", part.trim()))
        })
        .collect()
}

/// Run the list query described by `spec`: owner-scoped, each present filter
/// keeping recipes associated with at least one of the listed ids, ordered
/// newest-first. The IN-subquery form returns each recipe once, with no
/// mutable intermediate query state.
pub fn load_recipes(conn: &mut PgConnection, spec: &RecipeQuery) -> QueryResult<Vec<Recipe>> {
    let mut query = recipes::table
        .filter(recipes::user_id.eq(spec.user_id))
        .into_boxed();

    if let Some(tag_ids) = &spec.tag_ids {
        query = query.filter(
            recipes::id.eq_any(
                recipe_tags::table
                    .filter(recipe_tags::tag_id.eq_any(tag_ids.clone()))
                    .select(recipe_tags::recipe_id),
            ),
        );
    }

    if let Some(ingredient_ids) = &spec.ingredient_ids {
        query = query.filter(
            recipes::id.eq_any(
                recipe_ingredients::table
                    .filter(recipe_ingredients::ingredient_id.eq_any(ingredient_ids.clone()))
                    .select(recipe_ingredients::recipe_id),
            ),
        );
    }

    query
        .order(recipes::id.desc())
        .select(Recipe::as_select())
        .load(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_id() {
        assert_eq!(parse_id_csv("7"), Ok(vec![7]));
    }

    #[test]
    fn parses_multiple_ids_with_spaces() {
        assert_eq!(parse_id_csv("1,2, 3"), Ok(vec![1, 2, 3]));
    }

    #[test]
    fn rejects_non_numeric_entries() {
        assert!(parse_id_csv("1,x").is_err());
        assert!(parse_id_csv("").is_err());
        assert!(parse_id_csv("1,,2").is_err());
    }
}
