pub mod draft;
pub mod license;
pub mod quote;
