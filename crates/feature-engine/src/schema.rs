//! Feature Schema and Alignment

use crate::encoder::EncodedRow;
use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Ordered feature names the classifier was trained on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated column lists
    pub fn new(columns: Vec<String>) -> Result<Self, FeatureError> {
        if columns.is_empty() {
            return Err(FeatureError::SchemaMismatch(
                "feature schema has no columns".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(FeatureError::SchemaMismatch(format!(
                "feature schema lists {} more than once",
                duplicate
            )));
        }
        Ok(Self { columns })
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reorder an encoded row into schema order.
    ///
    /// Schema columns missing from the row are zero-filled; row columns missing
    /// from the schema are dropped. A row sharing no column with the schema
    /// cannot have come from the same training run.
    pub fn align(&self, row: &EncodedRow) -> Result<Vec<f64>, FeatureError> {
        let values: HashMap<&str, f64> = row.iter().collect();

        let mut matched = 0;
        let aligned = self
            .columns
            .iter()
            .map(|name| match values.get(name.as_str()) {
                Some(value) => {
                    matched += 1;
                    *value
                }
                None => 0.0,
            })
            .collect();

        if matched == 0 && !row.is_empty() {
            return Err(FeatureError::SchemaMismatch(format!(
                "none of the {} encoded columns appear in the {}-column schema",
                row.len(),
                self.columns.len()
            )));
        }

        Ok(aligned)
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = FeatureError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().map(|n| n.to_string()).collect()).unwrap()
    }

    fn row(pairs: &[(&str, f64)]) -> EncodedRow {
        EncodedRow::from_pairs(pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect())
    }

    #[test]
    fn test_align_reorders_fills_and_drops() {
        let schema = schema(&["amt", "category_0", "category_1", "hour"]);
        let encoded = row(&[("hour", 2.0), ("extra_0", 9.0), ("amt", 1.5), ("category_1", 1.0)]);

        let aligned = schema.align(&encoded).unwrap();
        assert_eq!(aligned, vec![1.5, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_disjoint_row_is_mismatch() {
        let schema = schema(&["amt", "hour"]);
        let encoded = row(&[("merchant_0", 1.0)]);
        assert!(matches!(
            schema.align(&encoded),
            Err(FeatureError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_empty_and_duplicate_schemas_rejected() {
        assert!(FeatureSchema::new(vec![]).is_err());
        assert!(FeatureSchema::new(vec!["amt".into(), "hour".into(), "amt".into()]).is_err());
    }

    #[test]
    fn test_serialized_as_ordered_list() {
        let schema = schema(&["merchant_0", "amt", "hour"]);
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"["merchant_0","amt","hour"]"#);

        let restored: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, schema);
        assert!(serde_json::from_str::<FeatureSchema>(r#"["amt","amt"]"#).is_err());
    }

    proptest! {
        #[test]
        fn prop_align_matches_schema_shape(
            schema_names in prop::collection::hash_set("[a-z]{1,6}", 1..20),
            row_names in prop::collection::hash_set("[a-z]{1,6}", 0..20),
            value in -100.0f64..100.0,
        ) {
            let mut schema_names: Vec<String> = schema_names.into_iter().collect();
            schema_names.sort();
            // Guarantee overlap so the row is reconcilable.
            let mut pairs: Vec<(String, f64)> = row_names.into_iter().map(|n| (n, value)).collect();
            if !pairs.iter().any(|(n, _)| n == &schema_names[0]) {
                pairs.push((schema_names[0].clone(), value));
            }
            let encoded = EncodedRow::from_pairs(pairs.clone());
            let schema = FeatureSchema::new(schema_names.clone()).unwrap();

            let aligned = schema.align(&encoded).unwrap();
            prop_assert_eq!(aligned.len(), schema_names.len());
            for (name, v) in schema_names.iter().zip(&aligned) {
                let expected = pairs.iter().find(|(n, _)| n == name).map(|(_, v)| *v).unwrap_or(0.0);
                prop_assert_eq!(*v, expected);
            }
        }
    }
}
