pub mod asset_resolver;
pub mod chat_backend;
pub mod gemini_client;
pub mod instruction_builder;
pub mod learning_context_service;
pub mod markup_parser;
pub mod tutor_service;
pub mod tutor_session;
