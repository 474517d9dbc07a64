use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::meals::repo_types::{Meal, NewMeal};

pub async fn insert(db: &PgPool, meal: NewMeal) -> Result<Meal, sqlx::Error> {
    sqlx::query_as::<_, Meal>(
        r#"
        INSERT INTO meals (user_id, food_name, detected, meal_type, calories, protein, carbohydrates, fat, eaten_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, user_id, food_name, detected, meal_type, calories, protein, carbohydrates, fat, eaten_at
        "#,
    )
    .bind(meal.user_id)
    .bind(&meal.food_name)
    .bind(&meal.detected)
    .bind(meal.meal_type)
    .bind(meal.calories)
    .bind(meal.protein)
    .bind(meal.carbohydrates)
    .bind(meal.fat)
    .bind(meal.eaten_at)
    .fetch_one(db)
    .await
}

pub async fn list_page(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Meal>, sqlx::Error> {
    sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, food_name, detected, meal_type, calories, protein, carbohydrates, fat, eaten_at
        FROM meals
        WHERE user_id = $1
        ORDER BY eaten_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

pub async fn list_all(db: &PgPool, user_id: Uuid) -> Result<Vec<Meal>, sqlx::Error> {
    sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, food_name, detected, meal_type, calories, protein, carbohydrates, fat, eaten_at
        FROM meals
        WHERE user_id = $1
        ORDER BY eaten_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Meals with `start <= eaten_at < end`, oldest first for aggregation.
pub async fn list_between(
    db: &PgPool,
    user_id: Uuid,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<Meal>, sqlx::Error> {
    sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, food_name, detected, meal_type, calories, protein, carbohydrates, fat, eaten_at
        FROM meals
        WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
        ORDER BY eaten_at ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

pub async fn count_for_user(db: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM meals WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
}

/// Deletes only when the meal belongs to `user_id`; a foreign meal id reads
/// the same as a missing one.
pub async fn delete_scoped(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meals WHERE id = $1 AND user_id = $2")
        .bind(meal_id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
