use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, Duration, Month, OffsetDateTime};

use crate::error::ApiError;
use crate::meals::dto::NutritionItem;
use crate::meals::repo_types::Meal;

/// Four-field nutrient accumulator shared by save totals and the summaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

/// Write-time totals over the submitted nutrition entries. Missing per-item
/// fields count as zero.
pub fn nutrition_totals(items: &[NutritionItem]) -> NutrientTotals {
    items.iter().fold(NutrientTotals::default(), |mut acc, item| {
        acc.calories += item.calories.unwrap_or(0.0);
        acc.protein += item.protein.unwrap_or(0.0);
        acc.carbohydrates += item.carbohydrates.unwrap_or(0.0);
        acc.fat += item.fat.unwrap_or(0.0);
        acc
    })
}

pub fn summarize(meals: &[Meal]) -> NutrientTotals {
    meals.iter().fold(NutrientTotals::default(), |mut acc, meal| {
        acc.calories += meal.calories;
        acc.protein += meal.protein;
        acc.carbohydrates += meal.carbohydrates;
        acc.fat += meal.fat;
        acc
    })
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// UTC day window for a calendar date: `[midnight, next midnight)`.
pub fn day_bounds(date: Date) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.midnight().assume_utc();
    (start, start + Duration::days(1))
}

/// UTC month window: `[first of month, first of next month)`.
pub fn month_bounds(year: i32, month: u8) -> Result<(OffsetDateTime, OffsetDateTime), ApiError> {
    let month = Month::try_from(month).map_err(|_| ApiError::Validation("Invalid month".into()))?;
    let start = Date::from_calendar_date(year, month, 1)
        .map_err(|_| ApiError::Validation("Invalid month".into()))?;
    let next = if month == Month::December {
        Date::from_calendar_date(year + 1, Month::January, 1)
    } else {
        Date::from_calendar_date(year, month.next(), 1)
    }
    .map_err(|_| ApiError::Validation("Invalid month".into()))?;

    Ok((start.midnight().assume_utc(), next.midnight().assume_utc()))
}

/// One calendar day's accumulated meals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub meal_count: u32,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub meal_count: u32,
    pub days_with_meals: u32,
    pub avg_calories: f64,
}

#[derive(Debug)]
pub struct MonthlySummary {
    pub daily_data: BTreeMap<u8, DayBucket>,
    pub monthly_totals: MonthlyTotals,
}

/// Groups a month's meals by day of month. The average divides by the number
/// of days that have at least one meal, not the days in the month.
pub fn monthly_summary(meals: &[Meal]) -> MonthlySummary {
    let mut daily_data: BTreeMap<u8, DayBucket> = BTreeMap::new();
    for meal in meals {
        let bucket = daily_data.entry(meal.eaten_at.day()).or_default();
        bucket.calories += meal.calories;
        bucket.protein += meal.protein;
        bucket.carbohydrates += meal.carbohydrates;
        bucket.fat += meal.fat;
        bucket.meal_count += 1;
    }

    let mut monthly_totals = MonthlyTotals::default();
    for bucket in daily_data.values() {
        monthly_totals.calories += bucket.calories;
        monthly_totals.protein += bucket.protein;
        monthly_totals.carbohydrates += bucket.carbohydrates;
        monthly_totals.fat += bucket.fat;
        monthly_totals.meal_count += bucket.meal_count;
    }
    monthly_totals.days_with_meals = daily_data.len() as u32;
    monthly_totals.avg_calories = if daily_data.is_empty() {
        0.0
    } else {
        monthly_totals.calories / daily_data.len() as f64
    };

    MonthlySummary {
        daily_data,
        monthly_totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meals::repo_types::MealType;
    use time::macros::date;
    use uuid::Uuid;

    fn item(calories: Option<f64>, protein: Option<f64>) -> NutritionItem {
        NutritionItem {
            name: None,
            calories,
            protein,
            carbohydrates: None,
            fat: None,
        }
    }

    fn meal_on(day: u8, calories: f64) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            food_name: "test".into(),
            detected: Vec::new(),
            meal_type: MealType::Snack,
            calories,
            protein: 1.0,
            carbohydrates: 2.0,
            fat: 3.0,
            eaten_at: Date::from_calendar_date(2026, Month::March, day)
                .expect("valid day")
                .midnight()
                .assume_utc(),
        }
    }

    #[test]
    fn totals_treat_missing_fields_as_zero() {
        let totals = nutrition_totals(&[
            item(Some(100.0), Some(5.0)),
            item(None, None),
            item(Some(50.0), None),
        ]);
        assert_eq!(totals.calories, 150.0);
        assert_eq!(totals.protein, 5.0);
        assert_eq!(totals.carbohydrates, 0.0);
        assert_eq!(totals.fat, 0.0);
    }

    #[test]
    fn totals_of_empty_list_are_zero() {
        assert_eq!(nutrition_totals(&[]), NutrientTotals::default());
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let (start, end) = day_bounds(date!(2026 - 03 - 15));
        assert_eq!(end - start, Duration::days(1));
        assert_eq!(start.day(), 15);
        assert_eq!(start.hour(), 0);
    }

    #[test]
    fn month_bounds_roll_over_december() {
        let (start, end) = month_bounds(2026, 12).expect("valid month");
        assert_eq!(start.year(), 2026);
        assert_eq!(start.month(), Month::December);
        assert_eq!(end.year(), 2027);
        assert_eq!(end.month(), Month::January);
    }

    #[test]
    fn month_bounds_reject_bad_month() {
        assert!(matches!(
            month_bounds(2026, 13),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(month_bounds(2026, 0), Err(ApiError::Validation(_))));
    }

    #[test]
    fn monthly_average_divides_by_days_with_meals() {
        // Three distinct days in a 31-day month: average is over 3, not 31.
        let meals = vec![meal_on(1, 100.0), meal_on(10, 200.0), meal_on(20, 300.0)];
        let summary = monthly_summary(&meals);
        assert_eq!(summary.monthly_totals.calories, 600.0);
        assert_eq!(summary.monthly_totals.days_with_meals, 3);
        assert_eq!(summary.monthly_totals.avg_calories, 200.0);
        assert_eq!(summary.monthly_totals.meal_count, 3);
    }

    #[test]
    fn monthly_summary_groups_same_day_meals() {
        let meals = vec![meal_on(5, 100.0), meal_on(5, 150.0), meal_on(6, 50.0)];
        let summary = monthly_summary(&meals);
        assert_eq!(summary.daily_data.len(), 2);
        assert_eq!(summary.daily_data[&5].calories, 250.0);
        assert_eq!(summary.daily_data[&5].meal_count, 2);
        assert_eq!(summary.daily_data[&6].meal_count, 1);
        assert_eq!(summary.monthly_totals.avg_calories, 150.0);
    }

    #[test]
    fn empty_month_has_zero_average() {
        let summary = monthly_summary(&[]);
        assert!(summary.daily_data.is_empty());
        assert_eq!(summary.monthly_totals.avg_calories, 0.0);
        assert_eq!(summary.monthly_totals.days_with_meals, 0);
    }

    #[test]
    fn summarize_sums_all_four_fields() {
        let totals = summarize(&[meal_on(1, 100.0), meal_on(1, 200.0)]);
        assert_eq!(totals.calories, 300.0);
        assert_eq!(totals.protein, 2.0);
        assert_eq!(totals.carbohydrates, 4.0);
        assert_eq!(totals.fat, 6.0);
    }
}
