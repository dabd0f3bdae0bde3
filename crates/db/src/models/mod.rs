pub mod animal;
pub mod herd;
