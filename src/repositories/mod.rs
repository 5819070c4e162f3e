pub mod learning_context_repository;

pub use learning_context_repository::{
    InMemoryLearningContextRepository, LearningContextRepository,
};
