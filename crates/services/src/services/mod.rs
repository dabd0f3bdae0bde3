pub mod animal;
pub mod database_validator;
pub mod error;
pub mod herd;
mod retry;
