pub mod password;
pub mod request_context;
pub mod session;
pub mod validate;

pub use request_context::{CookieChange, SessionContext};
