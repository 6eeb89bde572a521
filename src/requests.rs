mod arguments;
mod request;
pub(crate) mod signature;
pub(crate) mod state;

pub use arguments::*;
pub use request::*;
