pub mod status;
pub mod vocab;

pub use status::*;
pub use vocab::*;
