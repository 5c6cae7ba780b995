//! Domain model structs persisted in the recipe database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use flavors_shared::error::require;
use flavors_shared::{Coordinates, ValidationError};
use serde::{Deserialize, Serialize};

/// System-assigned recipe identity (SQLite rowid).
pub type RecipeId = i64;

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

/// Everything a submitter provides for a new recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeInput {
    /// Submitter username.
    pub name: String,
    pub festival: Option<String>,
    pub dish: String,
    pub language: String,
    pub ingredients: Option<String>,
    pub instructions: String,
    pub image: Option<Vec<u8>>,
    pub video: Option<Vec<u8>>,
    pub audio: Option<Vec<u8>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RecipeInput {
    /// Check required fields in the order `name`, `dish`, `language`,
    /// `instructions`, reporting the first blank one.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("dish", &self.dish)?;
        require("language", &self.language)?;
        require("instructions", &self.instructions)?;
        Ok(())
    }

    pub fn with_location(mut self, location: Option<Coordinates>) -> Self {
        self.latitude = location.map(|c| c.latitude);
        self.longitude = location.map(|c| c.longitude);
        self
    }
}

/// A stored recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub festival: Option<String>,
    pub dish: String,
    pub language: String,
    pub ingredients: Option<String>,
    pub instructions: String,
    pub image: Option<Vec<u8>>,
    pub video: Option<Vec<u8>>,
    pub audio: Option<Vec<u8>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Recipe {
    /// The fields of this recipe as they were submitted.
    pub fn to_input(&self) -> RecipeInput {
        RecipeInput {
            name: self.name.clone(),
            festival: self.festival.clone(),
            dish: self.dish.clone(),
            language: self.language.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            image: self.image.clone(),
            video: self.video.clone(),
            audio: self.audio.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    pub fn location(&self) -> Option<Coordinates> {
        Coordinates::from_parts(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// A recipe without its media payloads, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeSummary {
    pub id: RecipeId,
    pub name: String,
    pub festival: Option<String>,
    pub dish: String,
    pub language: String,
    pub ingredients: Option<String>,
    pub instructions: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_image: bool,
    pub has_video: bool,
    pub has_audio: bool,
}

impl From<&Recipe> for RecipeSummary {
    fn from(r: &Recipe) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            festival: r.festival.clone(),
            dish: r.dish.clone(),
            language: r.language.clone(),
            ingredients: r.ingredients.clone(),
            instructions: r.instructions.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            has_image: r.image.is_some(),
            has_video: r.video.is_some(),
            has_audio: r.audio.is_some(),
        }
    }
}

/// Result of a checked submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(RecipeId),
    AlreadyExists,
}
