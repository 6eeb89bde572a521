mod context;
mod exclusive;
mod scope;
mod scoped;

pub use context::*;
pub use exclusive::*;
pub use scope::*;
pub use scoped::*;
