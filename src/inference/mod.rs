pub mod engine;
pub mod http;

#[cfg(test)]
pub mod testing;

pub use engine::{ChatEngine, FragmentSink};
pub use http::HttpEngine;
