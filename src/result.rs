use serde::{Deserialize, Serialize};

use crate::extraction::Field;

/// Structured reading of one registration certificate photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<String>,
    /// Everything the engine read, line breaks kept
    pub raw_text: String,
    /// Engine certainty, 0-100
    pub confidence: f32,
    /// Fields that came from a fallback rather than a printed label
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heuristic_fields: Vec<Field>,
}

impl OcrResult {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    pub fn is_heuristic(&self, field: Field) -> bool {
        self.heuristic_fields.contains(&field)
    }

    /// Fields that were extracted, in form order
    pub fn present_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Vin => &self.vin,
            Field::EngineNumber => &self.engine_number,
            Field::LicensePlate => &self.license_plate,
            Field::Brand => &self.brand,
            Field::Color => &self.color,
            Field::OwnerName => &self.owner_name,
            Field::Address => &self.address,
            Field::RegistrationDate => &self.registration_date,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Vin => &mut self.vin,
            Field::EngineNumber => &mut self.engine_number,
            Field::LicensePlate => &mut self.license_plate,
            Field::Brand => &mut self.brand,
            Field::Color => &mut self.color,
            Field::OwnerName => &mut self.owner_name,
            Field::Address => &mut self.address,
            Field::RegistrationDate => &mut self.registration_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_fields_are_omitted() {
        let result = OcrResult {
            brand: Some("HONDA".to_string()),
            raw_text: "Brand: HONDA".to_string(),
            confidence: 81.5,
            ..Default::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object["brand"], "HONDA");
        assert_eq!(object["rawText"], "Brand: HONDA");
        assert_eq!(object["confidence"], 81.5);
        assert!(!object.contains_key("vin"));
        assert!(!object.contains_key("ownerName"));
        assert!(!object.contains_key("heuristicFields"));
    }

    #[test]
    fn test_empty_text_still_serializes_raw_text() {
        let json = serde_json::to_value(OcrResult::default()).unwrap();
        assert_eq!(json["rawText"], "");
        assert_eq!(json["confidence"], 0.0);
    }

    #[test]
    fn test_heuristic_fields_camel_case() {
        let result = OcrResult {
            license_plate: Some("30A-123.45".to_string()),
            heuristic_fields: vec![Field::LicensePlate],
            ..Default::default()
        };

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""licensePlate":"30A-123.45""#));
        assert!(json.contains(r#""heuristicFields":["licensePlate"]"#));

        let back: OcrResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert!(back.is_heuristic(Field::LicensePlate));
    }

    #[test]
    fn test_get_and_set() {
        let mut result = OcrResult::default();
        result.set(Field::RegistrationDate, Some("05/03/2024".to_string()));
        result.set(Field::Color, Some("Bạc".to_string()));

        assert_eq!(result.get(Field::RegistrationDate), Some("05/03/2024"));
        assert_eq!(result.registration_date.as_deref(), Some("05/03/2024"));
        assert_eq!(result.present_fields(), vec![Field::Color, Field::RegistrationDate]);
    }
}
