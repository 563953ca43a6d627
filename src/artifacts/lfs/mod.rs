//! Large File Storage conversion
//!
//! - `pointer`: the pointer file format that replaces large blobs
//! - `policy`: which blobs get converted, and the `.gitattributes` content

pub mod pointer;
pub mod policy;
