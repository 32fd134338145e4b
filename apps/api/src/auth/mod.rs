//! Credential auth: bcrypt password hashes, JWT sessions carried in a
//! cookie or bearer header, and single-use password reset tokens.

pub mod extractor;
pub mod handlers;
pub mod mailer;
pub mod password;
pub mod reset;
pub mod session;
pub mod store;
pub mod validation;

pub use extractor::AuthUser;
