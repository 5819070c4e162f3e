pub mod context_handler;
pub mod tutor_handler;

use actix_web::web;

pub use context_handler::{create_context, delete_context, get_context, health_check, list_contexts};
pub use tutor_handler::{ask_about_concept, change_persona, get_tutor, new_chat, send_message};

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(create_context)
        .service(list_contexts)
        .service(get_context)
        .service(delete_context)
        .service(get_tutor)
        .service(new_chat)
        .service(change_persona)
        .service(send_message)
        .service(ask_about_concept);
}
