//! Read-only access to the ingredient and product catalog

use std::collections::HashMap;

use rust_decimal::Decimal;
use shared::{Ingredient, Recipe, RecipeComponent};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Row for recipe query, ingredient columns are empty for a product without a formula
#[derive(Debug, FromRow)]
struct RecipeRow {
    product_id: Uuid,
    product_name: String,
    ingredient_id: Option<Uuid>,
    ingredient_name: Option<String>,
    percent_per_kg: Option<Decimal>,
    unit_cost: Option<Decimal>,
}

/// Load the current formula of every listed product that exists
pub async fn load_recipes(
    conn: &mut PgConnection,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Recipe>> {
    let rows = sqlx::query_as::<_, RecipeRow>(
        r#"
        SELECT p.id AS product_id, p.name AS product_name,
               pi.ingredient_id, i.name AS ingredient_name,
               pi.percent_per_kg, i.unit_cost
        FROM products p
        LEFT JOIN product_ingredients pi ON pi.product_id = p.id
        LEFT JOIN ingredients i ON i.id = pi.ingredient_id
        WHERE p.id = ANY($1)
        ORDER BY p.id, pi.position, pi.created_at
        "#,
    )
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut recipes: HashMap<Uuid, Recipe> = HashMap::new();
    for row in rows {
        let recipe = recipes.entry(row.product_id).or_insert_with(|| Recipe {
            product_id: row.product_id,
            product_name: row.product_name.clone(),
            components: Vec::new(),
        });

        if let (Some(ingredient_id), Some(percent_per_kg)) = (row.ingredient_id, row.percent_per_kg) {
            recipe.components.push(RecipeComponent {
                ingredient_id,
                ingredient_name: row.ingredient_name.unwrap_or_default(),
                percent_per_kg,
                unit_cost: row.unit_cost,
            });
        }
    }

    Ok(recipes)
}

/// Load recipes and fail on the first product id that does not exist
pub async fn require_recipes(
    conn: &mut PgConnection,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Recipe>> {
    let recipes = load_recipes(conn, product_ids).await?;

    if let Some(missing) = product_ids.iter().find(|id| !recipes.contains_key(id)) {
        tracing::warn!("Order references unknown product {}", missing);
        return Err(AppError::NotFound(format!("Product {}", missing)));
    }

    Ok(recipes)
}

/// Load catalog ingredients by id
pub async fn load_ingredients(
    conn: &mut PgConnection,
    ingredient_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Ingredient>> {
    let rows = sqlx::query_as::<_, (Uuid, String, Option<Decimal>)>(
        "SELECT id, name, unit_cost FROM ingredients WHERE id = ANY($1)",
    )
    .bind(ingredient_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name, unit_cost)| (id, Ingredient { id, name, unit_cost }))
        .collect())
}

/// Load ingredients and fail on the first id that does not exist
pub async fn require_ingredients(
    conn: &mut PgConnection,
    ingredient_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Ingredient>> {
    let ingredients = load_ingredients(conn, ingredient_ids).await?;

    if let Some(missing) = ingredient_ids.iter().find(|id| !ingredients.contains_key(id)) {
        return Err(AppError::NotFound(format!("Ingredient {}", missing)));
    }

    Ok(ingredients)
}

/// Distinct ids in first-seen order
pub fn distinct_ids<I>(ids: I) -> Vec<Uuid>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
