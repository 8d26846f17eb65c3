use super::{FieldMapper, I18N_ALIASES};
use crate::models::{HotelI18n, JsonObject};

/// True when `key` is the first segment of any localized-field alias.
fn is_known_i18n_key(key: &str) -> bool {
    I18N_ALIASES.iter().any(|(_, paths)| {
        paths
            .iter()
            .any(|p| p.split('.').next().map_or(false, |head| head == key))
    })
}

impl FieldMapper {
    pub fn map_translation(&self, property_id: i64, lang: &str, payload: &JsonObject) -> HotelI18n {
        let extras: JsonObject = payload
            .iter()
            .filter(|(k, _)| !is_known_i18n_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        HotelI18n {
            property_id,
            lang: lang.to_string(),
            name: self.alias_str(payload, I18N_ALIASES, "name"),
            description: self.alias_str(payload, I18N_ALIASES, "description"),
            policies: self.alias_str(payload, I18N_ALIASES, "policies"),
            address: self.alias_str(payload, I18N_ALIASES, "address"),
            extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn obj(v: Value) -> JsonObject {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn maps_localized_fields_and_extras() {
        let payload = obj(json!({
            "hotel_name": "Hôtel du Parc",
            "markdown_description": "Un hôtel **calme**",
            "important_info": "Check-in 15h",
            "address": {"line": "12 rue du Parc"},
            "checkin": {"from": "15:00"},
            "rooms": [1, 2]
        }));
        let i18n = FieldMapper::new().map_translation(42, "fr", &payload);

        assert_eq!(i18n.property_id, 42);
        assert_eq!(i18n.lang, "fr");
        assert_eq!(i18n.name.as_deref(), Some("Hôtel du Parc"));
        assert_eq!(i18n.description.as_deref(), Some("Un hôtel **calme**"));
        assert_eq!(i18n.policies.as_deref(), Some("Check-in 15h"));
        assert_eq!(i18n.address.as_deref(), Some("12 rue du Parc"));

        let mut keys: Vec<&str> = i18n.extras.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["checkin", "rooms"]);
        assert_eq!(i18n.extras["checkin"], json!({"from": "15:00"}));
    }

    #[test]
    fn nested_translation_block_is_not_an_extra() {
        let payload = obj(json!({"translations": {"name": "Hotel Sol", "policies": "No pets"}}));
        let i18n = FieldMapper::new().map_translation(1, "es", &payload);
        assert_eq!(i18n.name.as_deref(), Some("Hotel Sol"));
        assert_eq!(i18n.policies.as_deref(), Some("No pets"));
        assert!(i18n.extras.is_empty());
    }

    #[test]
    fn empty_payload_maps_to_empty_record() {
        let i18n = FieldMapper::new().map_translation(1, "en", &JsonObject::new());
        assert_eq!(i18n.name, None);
        assert_eq!(i18n.address, None);
        assert!(i18n.extras.is_empty());
    }
}
