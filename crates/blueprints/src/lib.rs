//! Blueprint / Template System.
//!
//! A blueprint is a named, position-independent template of placed objects.
//! Players capture the objects around an origin into a blueprint, then stamp
//! copies of it elsewhere. Offsets and rotations are stored relative to the
//! capture origin, so a blueprint carries no absolute world position.

pub mod blueprint;
pub mod capture;
pub mod config;
pub mod error;
pub mod host;
pub mod placement;
pub mod plugin;

#[cfg(test)]
mod tests;

pub use blueprint::*;
pub use capture::*;
pub use config::*;
pub use error::*;
pub use host::*;
pub use placement::*;
pub use plugin::*;
