//! HTTP request handlers.

use serde::Serialize;
use utoipa::ToSchema;

pub mod admin_handler;
pub mod auth_handler;
pub mod health_handler;
pub mod me_handler;
pub mod password_handler;
pub mod verification_handler;

pub use admin_handler::admin_routes;
pub use auth_handler::{auth_routes, auth_session_routes};
pub use health_handler::health_routes;
pub use me_handler::me_routes;
pub use password_handler::password_routes;
pub use verification_handler::{verification_routes, verification_session_routes};

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Email verified")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
