pub mod health;

pub use health::health as system_health;
