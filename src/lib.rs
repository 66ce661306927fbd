//! Release gating and tag publication.
//!
//! [`feature::check`] decides whether the version declared by the project has
//! published release notes; [`feature::tagging`] tags it and pushes the tag
//! through a transient upstream remote.

pub mod feature;
pub mod libs;
