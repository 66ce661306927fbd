pub mod data;
pub mod error;
pub mod release;
pub mod remote;
pub mod version;
