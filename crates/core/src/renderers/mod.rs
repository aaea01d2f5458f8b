pub mod json;
pub mod traits;
