//! Request handlers.

pub mod actuator;
pub mod analysis;
pub mod health;
pub mod sensor;

pub use actuator::*;
pub use analysis::*;
pub use health::*;
pub use sensor::*;
