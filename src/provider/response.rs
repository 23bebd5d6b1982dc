//! Typed views over raw provider responses.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ArtistGraphError, Result};
use crate::graph::EDGE_ID_SEPARATOR;

/// An artist as the catalog describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistEntity {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<f64>,
}

impl ArtistEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            genres: Vec::new(),
            popularity: None,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of a limit-1 artist search
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Artist(ArtistEntity),
    Empty,
}

#[derive(Deserialize)]
struct SearchBody {
    artists: Page,
}

#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Deserialize)]
struct RelatedBody {
    artists: Vec<Value>,
}

fn parse_entity(value: &Value) -> Result<ArtistEntity> {
    let entity: ArtistEntity = serde_json::from_value(value.clone())
        .map_err(|e| ArtistGraphError::Parse(format!("malformed artist entity: {}", e)))?;
    if entity.id.trim().is_empty() {
        return Err(ArtistGraphError::Parse(format!(
            "artist entity {:?} has an empty id",
            entity.name
        )));
    }
    // `_` joins the two ends of a relation id
    if entity.id.contains(EDGE_ID_SEPARATOR) {
        return Err(ArtistGraphError::Parse(format!(
            "artist entity {:?} has id {:?} containing {:?}",
            entity.name, entity.id, EDGE_ID_SEPARATOR
        )));
    }
    Ok(entity)
}

/// Parse an artist search response, taking the first item
pub fn parse_search(value: &Value) -> Result<SearchOutcome> {
    let body: SearchBody = serde_json::from_value(value.clone())
        .map_err(|e| ArtistGraphError::Parse(format!("unexpected search response shape: {}", e)))?;

    match body.artists.items.first() {
        Some(item) => Ok(SearchOutcome::Artist(parse_entity(item)?)),
        None => Ok(SearchOutcome::Empty),
    }
}

/// Parse a related-artists response
pub fn parse_related(value: &Value) -> Result<Vec<ArtistEntity>> {
    let body: RelatedBody = serde_json::from_value(value.clone())
        .map_err(|e| ArtistGraphError::Parse(format!("unexpected related-artists response shape: {}", e)))?;

    body.artists.iter().map(parse_entity).collect()
}
