//! Prompt template for recommendation requests.
use crate::models::RecommendationRequest;

/// Renders the instruction sent to the model.
///
/// Breed and product type are trimmed; the diet preference is embedded as given.
pub fn build_prompt(request: &RecommendationRequest) -> String {
    let dog_breed = request.dog_breed.trim();
    let diet_preference = &request.diet_preference;
    let product_type = request.product_type.trim();

    format!(
        r#"As an AI assistant for a dog product company, provide a brief, personalized product recommendation and a quick, relevant insight for a dog parent.

Dog Breed: {dog_breed}
Dietary Preference: {diet_preference}
Desired Product Type: {product_type}

Please provide:
1. A specific, plausible product recommendation (e.g., 'XYZ Brand Organic Chicken Dog Food').
2. A concise insight related to cost-benefit or community trend (e.g., '80% of Golden Retriever owners prefer large bags for cost savings.' or 'This toy is a hit with active breeds!').

Format your response strictly as a JSON object with two keys: "recommendation" and "insight".
Example:
{{
  "recommendation": "Durable Chew Toy for Large Breeds",
  "insight": "Chew toys help reduce anxiety in high-energy dogs."
}}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_trimmed_fields() {
        let prompt = build_prompt(&RecommendationRequest {
            dog_breed: "  Golden Retriever\t".into(),
            diet_preference: "grain-free".into(),
            product_type: "\n chew toy  ".into(),
        });

        assert!(prompt.contains("Dog Breed: Golden Retriever\n"));
        assert!(prompt.contains("Dietary Preference: grain-free\n"));
        assert!(prompt.contains("Desired Product Type: chew toy\n"));
        assert!(!prompt.contains("  Golden"));
        assert!(!prompt.contains(" chew toy  "));
    }

    #[test]
    fn test_prompt_asks_for_json_keys() {
        let prompt = build_prompt(&RecommendationRequest {
            dog_breed: "Pug".into(),
            diet_preference: "raw".into(),
            product_type: "food".into(),
        });

        assert!(prompt.contains(r#"two keys: "recommendation" and "insight""#));
        assert!(prompt.contains(r#""recommendation": "Durable Chew Toy for Large Breeds""#));
    }
}
