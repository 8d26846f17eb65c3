use serde_json::Value;
use sha2::{Digest, Sha256};

use super::{aliases, FieldMapper, REVIEW_ALIASES};
use crate::models::{Aspects, JsonObject, Review};

const PROS_PATHS: &[&str] = &["pros", "review.pros", "positives"];
const CONS_PATHS: &[&str] = &["cons", "review.cons", "negatives"];

impl FieldMapper {
    pub fn map_reviews(&self, property_id: i64, items: &[JsonObject]) -> Vec<Review> {
        items.iter().map(|r| self.map_review(property_id, r)).collect()
    }

    pub fn map_review(&self, property_id: i64, payload: &JsonObject) -> Review {
        let author = self.review_author(payload);
        let title = self.alias_str(payload, REVIEW_ALIASES, "title");
        let text = self
            .alias_str(payload, REVIEW_ALIASES, "text")
            .or_else(|| self.pros_cons_text(payload));
        let lang = self.alias_str(payload, REVIEW_ALIASES, "lang");
        let rating = self.first_f64(payload, aliases(REVIEW_ALIASES, "rating"));
        let source = self.alias_str(payload, REVIEW_ALIASES, "source");

        let source_id = self.review_source_id(payload).unwrap_or_else(|| {
            natural_review_id(
                author.as_deref(),
                title.as_deref(),
                text.as_deref(),
                lang.as_deref(),
                rating,
            )
        });

        let aspects = self.review_aspects(payload);

        Review {
            property_id,
            source_id,
            author,
            rating,
            lang,
            title,
            text,
            aspects: if aspects.is_empty() { None } else { Some(aspects) },
            source,
            raw: Value::Object(payload.clone()),
            created_at: None,
        }
    }

    fn review_author(&self, payload: &JsonObject) -> Option<String> {
        if let Some(author) = self.alias_str(payload, REVIEW_ALIASES, "author") {
            return Some(author);
        }
        let first = self.alias_str(payload, REVIEW_ALIASES, "author_first");
        let last = self.alias_str(payload, REVIEW_ALIASES, "author_last");
        let full = [first, last].into_iter().flatten().collect::<Vec<_>>().join(" ");
        let full = full.trim();
        if full.is_empty() {
            None
        } else {
            Some(full.to_string())
        }
    }

    /// Upstream review identifier. Integer ids are accepted alongside strings.
    fn review_source_id(&self, payload: &JsonObject) -> Option<String> {
        aliases(REVIEW_ALIASES, "source_id").iter().find_map(|p| {
            match self.extract_value_by_path(payload, p)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
                _ => None,
            }
        })
    }

    fn pros_cons_text(&self, payload: &JsonObject) -> Option<String> {
        let mut lines = Vec::with_capacity(2);
        if let Some(pros) = self.lookup_str(payload, "pros") {
            lines.push(format!("Pros: {}", pros));
        }
        if let Some(cons) = self.lookup_str(payload, "cons") {
            lines.push(format!("Cons: {}", cons));
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn review_aspects(&self, payload: &JsonObject) -> Aspects {
        let mut pros = self.first_string_list(payload, PROS_PATHS);
        if pros.is_empty() {
            pros = self.first_str(payload, &["pros", "positives"]).into_iter().collect();
        }
        let mut cons = self.first_string_list(payload, CONS_PATHS);
        if cons.is_empty() {
            cons = self.first_str(payload, &["cons", "negatives"]).into_iter().collect();
        }
        Aspects { pros, cons }
    }
}

/// Stable identifier for reviews that arrive without one: SHA-256 over
/// `author|title|text|lang|rating` with the rating at three decimals.
pub fn natural_review_id(
    author: Option<&str>,
    title: Option<&str>,
    text: Option<&str>,
    lang: Option<&str>,
    rating: Option<f64>,
) -> String {
    let rating = rating.map(|r| format!("{:.3}", r)).unwrap_or_default();
    let signature = [
        author.unwrap_or(""),
        title.unwrap_or(""),
        text.unwrap_or(""),
        lang.unwrap_or(""),
        rating.as_str(),
    ]
    .join("|");
    let digest = Sha256::digest(signature.as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn preferred_alias_wins_over_legacy() {
        let review = obj(json!({
            "text": "preferred body",
            "comment": "legacy body",
            "author": "Ana",
            "reviewer": {"name": "Legacy Ana"},
            "score": "9,0",
            "rating": 8
        }));
        let mapped = FieldMapper::new().map_review(7, &review);
        assert_eq!(mapped.text.as_deref(), Some("preferred body"));
        assert_eq!(mapped.author.as_deref(), Some("Ana"));
        assert_eq!(mapped.rating, Some(8.0));
    }

    #[test]
    fn natural_id_is_deterministic() {
        let review = obj(json!({
            "name": "Ana",
            "headline": "Great stay",
            "review": "Clean rooms",
            "language": "en",
            "score": "8,5"
        }));
        let mapper = FieldMapper::new();
        let a = mapper.map_review(1, &review);
        let b = mapper.map_review(1, &review);
        assert_eq!(a.source_id, b.source_id);
        assert_eq!(a.source_id.len(), 64);
        assert_eq!(
            a.source_id,
            natural_review_id(Some("Ana"), Some("Great stay"), Some("Clean rooms"), Some("en"), Some(8.5))
        );
    }

    #[test]
    fn natural_id_changes_with_content() {
        let a = natural_review_id(Some("Ana"), None, Some("ok"), None, Some(8.0));
        let b = natural_review_id(Some("Ana"), None, Some("ok"), None, Some(8.25));
        assert_ne!(a, b);
    }

    #[test]
    fn explicit_ids_are_kept() {
        let mapper = FieldMapper::new();
        let with_string = mapper.map_review(1, &obj(json!({"review_id": " r-1 "})));
        assert_eq!(with_string.source_id, "r-1");
        let with_number = mapper.map_review(1, &obj(json!({"id": 991})));
        assert_eq!(with_number.source_id, "991");
    }

    #[test]
    fn author_falls_back_to_first_and_last_name() {
        let mapper = FieldMapper::new();
        let both = mapper.map_review(1, &obj(json!({"first_name": " Jane ", "user": {"lastName": "Doe"}})));
        assert_eq!(both.author.as_deref(), Some("Jane Doe"));
        let last_only = mapper.map_review(1, &obj(json!({"lastname": "Doe"})));
        assert_eq!(last_only.author.as_deref(), Some("Doe"));
        let none = mapper.map_review(1, &obj(json!({"first_name": "  "})));
        assert_eq!(none.author, None);
    }

    #[test]
    fn text_falls_back_to_pros_and_cons() {
        let mapper = FieldMapper::new();
        let both = mapper.map_review(1, &obj(json!({"pros": "Location", "cons": "Noise"})));
        assert_eq!(both.text.as_deref(), Some("Pros: Location\nCons: Noise"));
        let cons_only = mapper.map_review(1, &obj(json!({"pros": "", "cons": "Noise"})));
        assert_eq!(cons_only.text.as_deref(), Some("Cons: Noise"));
        let neither = mapper.map_review(1, &obj(json!({"title": "Meh"})));
        assert_eq!(neither.text, None);
    }

    #[test]
    fn aspects_prefer_arrays_and_wrap_strings() {
        let mapper = FieldMapper::new();
        let arrays = mapper.map_review(
            1,
            &obj(json!({"review": {"pros": ["Breakfast", "Staff"]}, "negatives": "Parking"})),
        );
        let aspects = arrays.aspects.expect("aspects present");
        assert_eq!(aspects.pros, vec!["Breakfast", "Staff"]);
        assert_eq!(aspects.cons, vec!["Parking"]);

        let none = mapper.map_review(1, &obj(json!({"text": "fine"})));
        assert_eq!(none.aspects, None);

        let pros_only = mapper.map_review(1, &obj(json!({"pros": "View"})));
        let aspects = pros_only.aspects.unwrap();
        assert_eq!(aspects.pros, vec!["View"]);
        assert!(aspects.cons.is_empty());
        assert_eq!(serde_json::to_value(&aspects).unwrap(), json!({"pros": ["View"]}));
    }

    #[test]
    fn raw_payload_is_retained() {
        let payload = obj(json!({"id": "x", "extra": {"nested": true}}));
        let mapped = FieldMapper::new().map_review(3, &payload);
        assert_eq!(mapped.property_id, 3);
        assert_eq!(mapped.raw, Value::Object(payload));
        assert_eq!(mapped.created_at, None);
    }
}
