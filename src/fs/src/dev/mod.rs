mod null;

pub use null::*;
