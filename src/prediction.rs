use std::time::Duration;

use axum::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PredictionConfig;
use crate::error::ApiError;

/// One recognized food with its per-item nutrition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default, alias = "carbs")]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fat: f64,
}

/// Canonical prediction payload. Upstream shape differences are absorbed
/// here so callers only ever see `food_items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub food_items: Vec<FoodItem>,
}

#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(
        &self,
        image: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<Prediction, ApiError>;
}

pub struct HttpPredictionClient {
    http: reqwest::Client,
    url: String,
    retries: u32,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            retries: config.retries,
        })
    }

    async fn attempt(
        &self,
        image: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<Prediction, String> {
        let part = reqwest::multipart::Part::bytes(image.to_vec())
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| e.to_string())?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let resp = self
            .http
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("upstream returned {status}: {body}"));
        }

        let payload: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;
        normalize(payload).ok_or_else(|| "unrecognized prediction payload".to_string())
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(
        &self,
        image: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<Prediction, ApiError> {
        // Single attempt unless retries are configured; fixed count, no backoff.
        let mut last_err = String::new();
        for attempt in 0..=self.retries {
            match self.attempt(image.clone(), filename, content_type).await {
                Ok(prediction) => {
                    debug!(items = prediction.food_items.len(), "prediction succeeded");
                    return Ok(prediction);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "prediction attempt failed");
                    last_err = e;
                }
            }
        }
        Err(ApiError::PredictionUnavailable(last_err))
    }
}

/// Accepts either the `{food_items: [...]}` shape or the legacy
/// `{detected: [...], nutrition: [...]}` pair.
pub fn normalize(payload: serde_json::Value) -> Option<Prediction> {
    let obj = payload.as_object()?;

    if let Some(items) = obj.get("food_items") {
        let food_items: Vec<FoodItem> = serde_json::from_value(items.clone()).ok()?;
        return Some(Prediction { food_items });
    }

    let nutrition: Vec<FoodItem> = obj
        .get("nutrition")
        .and_then(|n| serde_json::from_value(n.clone()).ok())
        .unwrap_or_default();
    if !nutrition.is_empty() {
        return Some(Prediction { food_items: nutrition });
    }

    let detected: Vec<String> = obj
        .get("detected")
        .and_then(|d| serde_json::from_value(d.clone()).ok())
        .unwrap_or_default();
    if !detected.is_empty() {
        let food_items = detected
            .into_iter()
            .map(|name| FoodItem {
                name,
                calories: 0.0,
                protein: 0.0,
                carbohydrates: 0.0,
                fat: 0.0,
            })
            .collect();
        return Some(Prediction { food_items });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_canonical_shape() {
        let payload = json!({
            "food_items": [
                {"name": "rice", "calories": 130.0, "protein": 2.7, "carbohydrates": 28.0, "fat": 0.3}
            ]
        });
        let prediction = normalize(payload).expect("canonical shape");
        assert_eq!(prediction.food_items.len(), 1);
        assert_eq!(prediction.food_items[0].name, "rice");
        assert_eq!(prediction.food_items[0].carbohydrates, 28.0);
    }

    #[test]
    fn normalizes_detected_nutrition_pair() {
        let payload = json!({
            "detected": ["rice", "egg"],
            "nutrition": [
                {"name": "rice", "calories": 130.0, "carbs": 28.0},
                {"name": "egg", "calories": 78.0, "protein": 6.3}
            ]
        });
        let prediction = normalize(payload).expect("legacy shape");
        assert_eq!(prediction.food_items.len(), 2);
        // `carbs` alias folds into the canonical field.
        assert_eq!(prediction.food_items[0].carbohydrates, 28.0);
        // Missing fields read as zero.
        assert_eq!(prediction.food_items[0].fat, 0.0);
        assert_eq!(prediction.food_items[1].protein, 6.3);
    }

    #[test]
    fn detected_only_yields_zeroed_items() {
        let payload = json!({ "detected": ["banana"] });
        let prediction = normalize(payload).expect("detected only");
        assert_eq!(prediction.food_items[0].name, "banana");
        assert_eq!(prediction.food_items[0].calories, 0.0);
    }

    #[test]
    fn rejects_unrecognized_payload() {
        assert!(normalize(json!({"status": "ok"})).is_none());
        assert!(normalize(json!("nonsense")).is_none());
        assert!(normalize(json!({"food_items": "not-a-list"})).is_none());
    }
}
