use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Kind-specific item fields. The store never looks inside beyond `validate`.
pub trait ItemPayload: Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static {
    /// Reject payloads missing required fields or carrying out-of-range values.
    fn validate(&self) -> AppResult<()>;
}

/// One entry of an ordered collection. Payload fields are flattened into the item's
/// JSON object next to `id`, `order` and `visible`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem<P> {
    pub id: String,
    pub order: usize,
    pub visible: bool,
    #[serde(flatten)]
    pub payload: P,
}

/// Persisted document for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot<P> {
    /// Bumped by one on every mutation that changed the collection.
    #[serde(default)]
    pub revision: u64,
    #[serde(default = "Vec::new")]
    pub items: Vec<ContentItem<P>>,
}

impl<P> Default for CollectionSnapshot<P> {
    fn default() -> Self { Self { revision: 0, items: Vec::new() } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::str::FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(AppError::invalid_input("invalid_direction".to_string(), format!("direction must be 'up' or 'down', got '{other}'"))),
        }
    }
}
