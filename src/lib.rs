pub mod prelude;

pub use larkspur_lib as lib;
pub use larkspur_oauth::*;
