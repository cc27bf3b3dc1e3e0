pub mod kambi;

pub use kambi::*;
