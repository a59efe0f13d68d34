#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]

#[macro_use]
mod macros;

pub mod icmpv6;
pub mod iface;
pub mod ip;
