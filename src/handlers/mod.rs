// handlers/mod.rs - Route handlers grouped by area
//
// auth   → /auth/*   (session logout, current user)
// system → /system/* (diagnostics, no authentication)

pub mod auth;
pub mod system;
