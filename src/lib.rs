//! Runtime dependency injection with keyed bindings.
//!
//! By default, services provided by the `Injector` are thread-safe: `Arc<T>`
//! holds instances of the services, and every service must be `Send + Sync`.
//! Single-threaded applications can use `Rc<T>` instead by disabling default
//! features and enabling the "rc" feature:
//!
//! ```text
//! keyed_injector = {
//!     version = "*",
//!     default_features = false,
//!     features = ["rc"]
//! }
//! ```
//!
//! # Keys and bindings
//!
//! Everything an injector can provide is identified by a [`Key`]: the type
//! of the value, an optional [`Tag`] that tells otherwise identical keys
//! apart, and whether the key is an array key. A [`Binding`] pairs a key with
//! the [`Provider`] responsible for it, and bindings are grouped into
//! [`Bindings`] collections that can be nested and combined freely.
//!
//! Bindings are declared with a [`Binder`]:
//!
//! - [`bind_type`]: constructs an [`Injectable`] type.
//! - [`bind_fn`]: calls a function whose parameters are injected.
//! - [`bind_const`]: provides a constant value.
//! - [`bind`]: binds an explicit key to one of the `to_*` strategies, for
//!   example another key.
//!
//! A binder can make its value a singleton (created once per injector),
//! scope it to a [`Scope`], or make it eager (created when the injector is
//! created).
//!
//! # Resolution
//!
//! An injector compiles its bindings into one provider per key, rejecting
//! keys bound more than once. Requesting a key runs its provider, which
//! requests the provider's own dependencies from the same injector. All of
//! the provisioning done for one top-level request shares a record of what
//! was provisioned so far: every key is provisioned at most once per request,
//! and requesting a key that is still being provisioned is reported as a
//! dependency cycle instead of overflowing the stack.
//!
//! Array keys collect any number of contributions, and sets and maps can be
//! assembled from contributions with [`SetBinder`] and [`MapBinder`]. Graphs
//! can be encapsulated with [`private`], replaced piecewise with
//! [`override_bindings`], and observed with [`bind_provision_listener`].
//!
//! # Example
//!
//! ```
//! use keyed_injector::{
//!     bind_const, bind_type, bindings, injectable, override_bindings, Injector, Svc,
//! };
//!
//! struct Config {
//!     path: &'static str,
//! }
//!
//! struct Repo {
//!     config: Svc<Config>,
//! }
//!
//! injectable! {
//!     Repo { config: Svc<Config> }
//! }
//!
//! let bindings = bindings![
//!     bind_type::<Repo>().singleton(),
//!     bind_const(Config { path: "/x" }),
//! ]
//! .unwrap();
//!
//! let injector = Injector::new(&bindings, None).unwrap();
//! let repo: Svc<Repo> = injector.get().unwrap();
//! assert_eq!("/x", repo.config.path);
//!
//! // Replace the configuration without touching the repository binding
//! let testing = override_bindings(bindings, bind_const(Config { path: "/y" })).unwrap();
//! let injector = Injector::new(&testing, None).unwrap();
//! let repo: Svc<Repo> = injector.get().unwrap();
//! assert_eq!("/y", repo.config.path);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown,
    clippy::needless_pass_by_value
)]

#[cfg(not(any(feature = "arc", feature = "rc")))]
compile_error!(
    "Either the 'arc' or 'rc' feature must be enabled (but not both)."
);

#[cfg(all(feature = "arc", feature = "rc"))]
compile_error!(
    "The 'arc' and 'rc' features are mutually exclusive and cannot be enabled together."
);

mod binder;
mod bindings;
mod builder;
mod injector;
mod key;
mod listeners;
mod provider_map;
mod requests;
mod scopes;
mod services;
mod sync;

pub use binder::*;
pub use bindings::*;
pub use builder::*;
pub use injector::*;
pub use key::*;
pub use listeners::*;
pub use requests::*;
pub use scopes::*;
pub use services::*;
