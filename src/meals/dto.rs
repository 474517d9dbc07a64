use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::meals::repo_types::{Meal, MealType};
use crate::meals::services::{DayBucket, MonthlyTotals, NutrientTotals};
use crate::prediction::Prediction;

/// One nutrition entry as submitted by the client. All numeric fields are
/// optional; absent values count as zero when totals are computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionItem {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    #[serde(alias = "carbs")]
    pub carbohydrates: Option<f64>,
    pub fat: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMealRequest {
    pub food_name: Option<String>,
    #[serde(default)]
    pub detected: Vec<String>,
    // Kept as a raw value so "not a list" is our 400, not a body-parse reject.
    pub nutrition: Option<serde_json::Value>,
    pub meal_type: Option<MealType>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}

/// Query-string pagination. Mirrors the former `parseInt(...) || default`
/// behavior: absent or non-numeric values fall back to the defaults.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_number")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<i64>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse::<i64>().ok()))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct SaveMealResponse {
    pub success: bool,
    pub meal: Meal,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub meals: Vec<Meal>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct AllMealsResponse {
    pub success: bool,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub prediction: Prediction,
}

#[derive(Debug, Serialize)]
pub struct DailySummaryResponse {
    pub success: bool,
    pub meals: Vec<Meal>,
    pub totals: NutrientTotals,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummaryResponse {
    pub success: bool,
    pub daily_data: BTreeMap<u8, DayBucket>,
    pub monthly_totals: MonthlyTotals,
}
