pub mod mint;
pub mod validate;
