pub mod error;
pub mod models;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
