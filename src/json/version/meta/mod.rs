pub mod custom;
pub mod vanilla;
