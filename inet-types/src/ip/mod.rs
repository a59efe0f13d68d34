//! Internet-Protocol version 6.

mod v6;
pub use v6::*;
