//! The dump and inject commands.

pub mod dump;
pub mod inject;
