pub mod image;
pub mod message;

pub use image::{ImagePickerResult, ImageRef};
pub use message::{AnalysisStatus, Message, MessageId, Sender};
