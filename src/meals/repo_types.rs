use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Meal-type buckets the client groups by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "meal_type", rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    Snack,
}

/// Meal record with its write-time nutrient totals. Totals are a snapshot
/// of the submitted nutrition entries and are never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_name: String,
    pub detected: Vec<String>,
    pub meal_type: MealType,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    #[serde(rename = "date", with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
}

/// Insert payload after validation and total computation.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub user_id: Uuid,
    pub food_name: String,
    pub detected: Vec<String>,
    pub meal_type: MealType,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub eaten_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn meal_serializes_with_wire_field_names() {
        let meal = Meal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            food_name: "fried rice".into(),
            detected: vec!["rice".into(), "egg".into()],
            meal_type: MealType::Lunch,
            calories: 350.0,
            protein: 12.0,
            carbohydrates: 50.0,
            fat: 9.0,
            eaten_at: OffsetDateTime::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&meal).expect("serialize meal");
        assert_eq!(value["foodName"], json!("fried rice"));
        assert_eq!(value["mealType"], json!("lunch"));
        assert_eq!(value["date"], json!("1970-01-01T00:00:00Z"));
        assert!(value.get("eaten_at").is_none());
        assert!(value.get("food_name").is_none());
    }

    #[test]
    fn meal_type_defaults_to_snack() {
        assert_eq!(MealType::default(), MealType::Snack);
        let parsed: MealType = serde_json::from_value(json!("dinner")).expect("parse");
        assert_eq!(parsed, MealType::Dinner);
    }
}
