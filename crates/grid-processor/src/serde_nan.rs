//! Serde helpers that write non-finite floats as JSON `null`.
//!
//! JSON has no NaN, so missing values in source and result documents are
//! encoded as `null` and decoded back to NaN.

/// `Vec<f64>` with `null` for non-finite values.
pub mod vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: Vec<Option<f64>> = values
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let encoded: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect())
    }
}

/// `BTreeMap<String, Vec<f64>>` with `null` for non-finite values.
pub mod map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        fields: &BTreeMap<String, Vec<f64>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<&str, Vec<Option<f64>>> = fields
            .iter()
            .map(|(name, values)| {
                let values = values.iter().map(|v| v.is_finite().then_some(*v)).collect();
                (name.as_str(), values)
            })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<f64>>, D::Error> {
        let encoded: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|(name, values)| {
                let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, values)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Doc {
        #[serde(with = "super::vec")]
        values: Vec<f64>,
        #[serde(with = "super::map")]
        fields: BTreeMap<String, Vec<f64>>,
    }

    #[test]
    fn test_nan_written_as_null() {
        let mut fields = BTreeMap::new();
        fields.insert("QV".to_string(), vec![f64::INFINITY, 2.0]);
        let doc = Doc {
            values: vec![1.0, f64::NAN],
            fields,
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"values":[1.0,null],"fields":{"QV":[null,2.0]}}"#);

        let back: Doc = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], 1.0);
        assert!(back.values[1].is_nan());
        assert!(back.fields["QV"][0].is_nan());
    }
}
