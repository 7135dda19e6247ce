mod core;
pub mod types;

pub use self::core::Document;
pub use self::types::Metadata;
