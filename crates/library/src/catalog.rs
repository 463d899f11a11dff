//! JSON catalog files: the already-scraped items and people a build starts from.

use std::path::Path;

use jukebox_core::{Item, Person};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::repository::Library;
use crate::LibraryError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub items: Vec<Item>,
    pub people: Vec<Person>,
}

impl Catalog {
    pub fn from_json(raw: &str) -> Result<Self, LibraryError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Read a catalog file and file every entry into a fresh [`Library`].
pub fn load_catalog(path: &Path) -> Result<Library, LibraryError> {
    let raw = std::fs::read_to_string(path)?;
    let catalog = Catalog::from_json(&raw)?;
    let library = Library::from_catalog(catalog);
    info!(
        path = %path.display(),
        items = library.len(),
        people = library.people().count(),
        "catalog loaded"
    );
    Ok(library)
}

impl Library {
    pub fn from_catalog(catalog: Catalog) -> Self {
        let mut library = Library::new();
        for item in catalog.items {
            library.add_item(item);
        }
        for person in catalog.people {
            library.add_person(person);
        }
        library.merge_extras();
        library
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_items() {
        let catalog = Catalog::from_json(
            r#"{
                "items": [
                    { "title": "Alien", "year": "1979", "base_name": "Alien", "genres": ["Horror"] },
                    { "title": "Aliens", "year": "1986", "base_name": "Aliens" }
                ],
                "people": [ { "name": "Sigourney Weaver", "id": "nm0000244" } ]
            }"#,
        )
        .unwrap();
        let library = Library::from_catalog(catalog);
        assert_eq!(library.len(), 2);
        assert_eq!(library.get("alien (1979)").unwrap().genres, ["Horror"]);
        assert!(library.person("sigourney weaver/nm0000244").is_some());
    }

    #[test]
    fn malformed_catalog_is_an_error() {
        assert!(matches!(
            Catalog::from_json("{ not json"),
            Err(LibraryError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_catalog(Path::new("/nonexistent/catalog.json")),
            Err(LibraryError::Io(_))
        ));
    }
}
