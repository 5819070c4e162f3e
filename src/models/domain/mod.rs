pub mod attachment;
pub mod learning_context;
pub mod message;
pub mod persona;
pub mod user_profile;
pub use attachment::Attachment;
pub use learning_context::LearningContext;
pub use message::{
    ChartKind, ChartSpec, Citation, ContentSegment, Definition, ExtractedEntity, Extractions,
    Formula, ImageContent, Message, Role, SeriesKey, Vocabulary,
};
pub use persona::{Locale, Persona};
pub use user_profile::UserProfile;
