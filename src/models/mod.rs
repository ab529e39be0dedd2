pub mod data_uri;
pub mod prediction;
pub mod result;

pub use data_uri::*;
pub use prediction::*;
pub use result::*;
