use serde::{Deserialize, Serialize};

/// Profile hints used to localize tutor output to a student's curriculum.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub curriculum: String,
}

impl UserProfile {
    pub fn new(country: &str, curriculum: &str) -> Self {
        UserProfile {
            country: country.to_string(),
            curriculum: curriculum.to_string(),
        }
    }

    /// Both country and curriculum are required before the profile affects prompts.
    pub fn is_complete(&self) -> bool {
        !self.country.trim().is_empty() && !self.curriculum.trim().is_empty()
    }
}
