use serde::{Deserialize, Serialize};

/// What the image-selection collaborator hands over. Permission-denied and
/// cancelled picks never reach the session; they collapse to "no image".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePickerResult {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_size: Option<u64>,
    pub file_name: Option<String>,
}

/// Image attached to a message. Not validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            width: None,
            height: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

impl From<ImagePickerResult> for ImageRef {
    fn from(picked: ImagePickerResult) -> Self {
        Self {
            uri: picked.uri,
            width: picked.width,
            height: picked.height,
        }
    }
}
