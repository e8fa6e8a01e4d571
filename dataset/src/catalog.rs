use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;

use crate::{DataErr, Result};

/// The authoritative list of rooms and the fixed sensor ordering.
///
/// It is loaded once and handed down by reference to whatever needs it, it is never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    rooms: Vec<String>,
    #[serde(rename = "sensorOrder")]
    sensor_order: Vec<String>,
}

impl Catalog {
    /// Creates a new validated `Catalog`.
    ///
    /// # Errors
    /// `InvalidCatalog` if either list is empty or contains repeated names.
    pub fn new(rooms: Vec<String>, sensor_order: Vec<String>) -> Result<Self> {
        let catalog = Self {
            rooms,
            sensor_order,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads a catalog from a JSON config file holding `rooms` and `sensorOrder` arrays. Other
    /// keys of the file are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| DataErr::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content).map_err(|e| match e {
            DataErr::Json { source, .. } => DataErr::Json {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parses and validates a catalog from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(content).map_err(|source| DataErr::Json {
            path: Default::default(),
            source,
        })?;

        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        check_list("rooms", &self.rooms)?;
        check_list("sensorOrder", &self.sensor_order)
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    pub fn sensor_order(&self) -> &[String] {
        &self.sensor_order
    }

    pub fn contains_room(&self, room: &str) -> bool {
        self.rooms.iter().any(|r| r == room)
    }

    /// The length every sample vector must have: a distance and a freshness flag per sensor.
    pub fn vector_width(&self) -> usize {
        2 * self.sensor_order.len()
    }

    /// Returns the feature names laid out exactly like the sample vectors,
    /// `{sensor}_dist` followed by `{sensor}_fresh` for every sensor in order.
    pub fn feature_names(&self) -> Vec<String> {
        self.sensor_order
            .iter()
            .flat_map(|sensor| [format!("{sensor}_dist"), format!("{sensor}_fresh")])
            .collect()
    }
}

fn check_list(what: &str, list: &[String]) -> Result<()> {
    if list.is_empty() {
        return Err(DataErr::InvalidCatalog(format!("{what} must not be empty")));
    }

    let mut seen = HashSet::with_capacity(list.len());
    if let Some(repeated) = list.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(DataErr::InvalidCatalog(format!(
            "{what} lists '{repeated}' more than once"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "rooms": ["hall", "kitchen", "office"],
        "sensorOrder": ["hall", "kitchen"],
        "people": [{"id": "bob", "device": "phone"}]
    }"#;

    #[test]
    fn loads_the_relevant_keys() {
        let catalog = Catalog::from_json(CONFIG).unwrap();

        assert_eq!(catalog.rooms(), ["hall", "kitchen", "office"]);
        assert_eq!(catalog.sensor_order(), ["hall", "kitchen"]);
        assert!(catalog.contains_room("office"));
        assert!(!catalog.contains_room("garage"));
        assert_eq!(catalog.vector_width(), 4);
    }

    #[test]
    fn feature_names_follow_the_vector_layout() {
        let catalog = Catalog::from_json(CONFIG).unwrap();
        assert_eq!(
            catalog.feature_names(),
            ["hall_dist", "hall_fresh", "kitchen_dist", "kitchen_fresh"]
        );
    }

    #[test]
    fn rejects_missing_and_repeated_entries() {
        assert!(Catalog::from_json(r#"{"rooms": ["a"]}"#).is_err());

        let err = Catalog::new(vec![], vec!["s".into()]).unwrap_err();
        assert!(matches!(err, DataErr::InvalidCatalog(_)));

        let err = Catalog::new(vec!["a".into(), "a".into()], vec!["s".into()]).unwrap_err();
        assert!(err.to_string().contains("'a'"));
    }
}
