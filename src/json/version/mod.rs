pub mod manifest;
pub mod meta;
