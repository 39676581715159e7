//! Recommendation model clients
//!
//! Two external model endpoints: today's recipe recommendation and the
//! similar-allergy-ingredient check. Both are best effort with a bounded
//! per-call timeout and no retry: any transport error, non-success status,
//! or malformed body degrades to an empty result and is logged, never
//! surfaced to the caller.

use crate::config::RecommendConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

#[derive(Serialize)]
struct RecommendRequest {
    user_id: Uuid,
}

#[derive(Deserialize)]
struct RecommendResponse {
    recipe_id: Option<Uuid>,
}

#[derive(Serialize)]
struct AllergyRequest {
    recipe_id: Uuid,
    user_id: Uuid,
}

#[derive(Deserialize)]
struct AllergyResponse {
    #[serde(default)]
    similar_ingredients: Vec<String>,
}

/// Client for the recommendation and allergy models
#[derive(Clone)]
pub struct RecommendClient {
    client: reqwest::Client,
    recommend_url: String,
    allergy_url: String,
}

impl RecommendClient {
    /// Build a client with the configured per-call timeout
    pub fn new(config: &RecommendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            recommend_url: config.recommend_url.clone(),
            allergy_url: config.allergy_url.clone(),
        }
    }

    /// Ask the model for today's recipe for this user.
    ///
    /// Returns `None` on any failure or when the response carries no
    /// `recipe_id`.
    pub async fn today_recipe(&self, user_id: Uuid) -> Option<Uuid> {
        let response = self
            .client
            .post(&self.recommend_url)
            .json(&RecommendRequest { user_id })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Recommendation model unreachable");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                user_id = %user_id,
                status = response.status().as_u16(),
                "Recommendation model returned non-success status"
            );
            return None;
        }

        match response.json::<RecommendResponse>().await {
            Ok(body) => {
                if body.recipe_id.is_none() {
                    warn!(user_id = %user_id, "Recommendation response missing recipe_id");
                }
                body.recipe_id
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Malformed recommendation response");
                None
            }
        }
    }

    /// Ask the model which of the recipe's ingredients resemble the user's
    /// allergy list. Empty on any failure.
    pub async fn similar_allergy_ingredients(
        &self,
        recipe_id: Uuid,
        user_id: Uuid,
    ) -> Vec<String> {
        let response = self
            .client
            .post(&self.allergy_url)
            .json(&AllergyRequest { recipe_id, user_id })
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(recipe_id = %recipe_id, user_id = %user_id, error = %e, "Allergy model unreachable");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(
                recipe_id = %recipe_id,
                status = response.status().as_u16(),
                "Allergy model returned non-success status"
            );
            return Vec::new();
        }

        match response.json::<AllergyResponse>().await {
            Ok(body) => body.similar_ingredients,
            Err(e) => {
                warn!(recipe_id = %recipe_id, error = %e, "Malformed allergy response");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommendConfig;

    fn local_config() -> RecommendConfig {
        // Nothing listens on these ports; every call must degrade.
        RecommendConfig {
            recommend_url: "http://127.0.0.1:1/recommend".to_string(),
            allergy_url: "http://127.0.0.1:1/check_allergy".to_string(),
            timeout_ms: 200,
        }
    }

    #[tokio::test]
    async fn test_today_recipe_degrades_to_none() {
        let client = RecommendClient::new(&local_config());
        assert_eq!(client.today_recipe(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn test_allergy_check_degrades_to_empty() {
        let client = RecommendClient::new(&local_config());
        let warnings = client
            .similar_allergy_ingredients(Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_allergy_response_tolerates_missing_field() {
        let body: AllergyResponse = serde_json::from_str("{}").unwrap();
        assert!(body.similar_ingredients.is_empty());
    }
}
