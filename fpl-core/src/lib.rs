pub mod analysis;
pub mod config;
pub mod error;
pub mod ipc;
pub mod models;
pub mod responses;
pub mod session;
pub mod theme;

pub use analysis::{AnalysisError, ImageAnalyzer, TemplateAnalyzer, ANALYSIS_TEMPLATES, APOLOGY};
pub use config::{AssistantConfig, ChatConfig};
pub use error::AssistantError;
pub use models::{AnalysisStatus, ImagePickerResult, ImageRef, Message, MessageId, Sender};
pub use responses::{Category, ResponsePolicy};
pub use session::{ChatSession, PendingReply, ReplyOutcome, SessionSnapshot};
pub use theme::{Palette, ThemeContext, ThemeMode};
