pub mod dasvid;
pub mod keys;
pub mod token;
pub mod zkp;
