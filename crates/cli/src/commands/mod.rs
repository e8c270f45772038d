//! CLI Commands

pub mod inspect;
pub mod run;
pub mod wait;
