//! SeaORM entities.

pub mod email_verification;
pub mod password_reset;
pub mod session;
pub mod user;
