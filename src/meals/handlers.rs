use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

use super::dto::{
    AllMealsResponse, DailySummaryResponse, DeleteResponse, HistoryResponse,
    MonthlySummaryResponse, NutritionItem, PageQuery, PaginationMeta, PredictResponse,
    SaveMealRequest, SaveMealResponse,
};
use super::repo;
use super::repo_types::NewMeal;
use super::services::{
    day_bounds, month_bounds, monthly_summary, nutrition_totals, summarize, total_pages,
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(history))
        .route("/all", get(all_meals))
        .route("/daily/:date", get(daily))
        .route("/monthly/:year/:month", get(monthly))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add))
        .route("/save", post(save))
        .route("/:id", delete(remove))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// Forwards the uploaded image to the prediction service and relays the
/// normalized result. Unauthenticated by design; nothing is persisted here.
#[instrument(skip(state, multipart))]
pub async fn add(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<PredictResponse>> {
    let mut upload: Option<(Bytes, String, String)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if matches!(field.name(), Some("image") | Some("file")) {
            let filename = field.file_name().unwrap_or("upload.jpg").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("Unreadable upload: {e}")))?;
            upload = Some((data, filename, content_type));
            break;
        }
    }

    let (bytes, filename, content_type) =
        upload.ok_or_else(|| ApiError::Validation("No image uploaded".into()))?;

    let prediction = state.prediction.predict(bytes, &filename, &content_type).await?;
    Ok(Json(PredictResponse {
        success: true,
        prediction,
    }))
}

#[instrument(skip(state, payload))]
pub async fn save(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveMealRequest>,
) -> ApiResult<Json<SaveMealResponse>> {
    let food_name = payload
        .food_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if food_name.is_empty() {
        return Err(ApiError::Validation("Food name is required".into()));
    }

    let nutrition: Vec<NutritionItem> = match payload.nutrition {
        Some(value) if value.is_array() => serde_json::from_value(value)
            .map_err(|_| ApiError::Validation("Malformed nutrition entries".into()))?,
        _ => return Err(ApiError::Validation("Nutrition must be a list".into())),
    };

    let totals = nutrition_totals(&nutrition);
    let meal = repo::insert(
        &state.db,
        NewMeal {
            user_id: user.id,
            food_name: food_name.to_string(),
            detected: payload.detected,
            meal_type: payload.meal_type.unwrap_or_default(),
            calories: totals.calories,
            protein: totals.protein,
            carbohydrates: totals.carbohydrates,
            fat: totals.fat,
            eaten_at: payload.date.unwrap_or_else(OffsetDateTime::now_utc),
        },
    )
    .await?;

    info!(user_id = %user.id, meal_id = %meal.id, "meal saved");
    Ok(Json(SaveMealResponse {
        success: true,
        meal,
    }))
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let page = q.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).max(1);
    let offset = (page - 1) * limit;

    let meals = repo::list_page(&state.db, user.id, limit, offset).await?;
    let total = repo::count_for_user(&state.db, user.id).await?;

    Ok(Json(HistoryResponse {
        success: true,
        meals,
        pagination: PaginationMeta {
            page,
            limit,
            total,
            pages: total_pages(total, limit),
        },
    }))
}

#[instrument(skip(state))]
pub async fn all_meals(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<AllMealsResponse>> {
    let meals = repo::list_all(&state.db, user.id).await?;
    Ok(Json(AllMealsResponse {
        success: true,
        meals,
    }))
}

#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    if !repo::delete_scoped(&state.db, user.id, id).await? {
        return Err(ApiError::NotFound("Meal not found".into()));
    }
    info!(user_id = %user.id, meal_id = %id, "meal deleted");
    Ok(Json(DeleteResponse { success: true }))
}

#[instrument(skip(state))]
pub async fn daily(
    State(state): State<AppState>,
    user: AuthUser,
    Path(date): Path<String>,
) -> ApiResult<Json<DailySummaryResponse>> {
    let format = format_description!("[year]-[month]-[day]");
    let date = Date::parse(&date, &format)
        .map_err(|_| ApiError::Validation("Invalid date, expected YYYY-MM-DD".into()))?;

    let (start, end) = day_bounds(date);
    let meals = repo::list_between(&state.db, user.id, start, end).await?;
    let totals = summarize(&meals);

    Ok(Json(DailySummaryResponse {
        success: true,
        meals,
        totals,
    }))
}

#[instrument(skip(state))]
pub async fn monthly(
    State(state): State<AppState>,
    user: AuthUser,
    Path((year, month)): Path<(i32, u8)>,
) -> ApiResult<Json<MonthlySummaryResponse>> {
    let (start, end) = month_bounds(year, month)?;
    let meals = repo::list_between(&state.db, user.id, start, end).await?;
    let summary = monthly_summary(&meals);

    Ok(Json(MonthlySummaryResponse {
        success: true,
        daily_data: summary.daily_data,
        monthly_totals: summary.monthly_totals,
    }))
}
