// handlers/auth/mod.rs - Session handlers
//
// `me` sits behind `middleware::require_session`; `logout` does not, so it
// succeeds whether or not the caller still holds a valid session.

pub mod logout;
pub mod me;

pub use logout::logout as session_logout;
pub use me::me as session_me;
