pub mod dasvid;
pub mod health;
pub mod keys;
