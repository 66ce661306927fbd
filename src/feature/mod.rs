pub mod check;
pub mod git;
pub mod tagging;
