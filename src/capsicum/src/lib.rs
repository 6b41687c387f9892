pub mod builder;
mod capability;
mod enforcement;
mod rights;

pub use capability::*;
pub use enforcement::*;
pub use rights::*;
