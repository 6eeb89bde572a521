mod array;
mod constant;
mod ctor;
mod factory;
mod fallible;
mod func;
mod link;
mod multi;
mod private;
mod providers;
mod service;
mod singleton;

pub use array::*;
pub use constant::*;
pub use ctor::*;
pub use factory::*;
pub use fallible::*;
pub use func::*;
pub use link::*;
pub use multi::*;
pub use private::*;
pub use providers::*;
pub use service::*;
pub use singleton::*;
