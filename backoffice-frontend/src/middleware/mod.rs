pub mod auth;

pub use auth::{module_gate, ModuleGate};
