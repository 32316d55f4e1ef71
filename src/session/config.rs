use serde::{Deserialize, Serialize};

/// Configuration for capture sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Recognition locale as a BCP 47 tag
    pub locale: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: "ja-JP".to_string(),
        }
    }
}
