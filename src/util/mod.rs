/// Utility module containing various helper functions and types.
pub mod extract; // Functions for extracting files from ZIP archives
pub mod hash; // Functions for calculating hashes
pub mod json; // Functions for reading and writing JSON files
pub mod retry; // Functions for retrying operations
