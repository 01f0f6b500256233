//! Client-side state for CampuzBuzz.
//!
//! Reads go through [`RetryableQuery`], writes through
//! [`OptimisticMutation`], and each screen composes the two in a
//! [`view_models`] type. Everything here runs on a single-threaded executor:
//! state lives in `Rc`/`RefCell` and the futures handed back are not `Send`.

pub mod collection;
pub mod config;
pub mod error;
mod listeners;
pub mod messaging;
pub mod mutation;
pub mod query;
pub mod session;
pub mod telemetry;
mod timer;
pub mod toast;
pub mod view_models;

pub use collection::{Collection, Record, Toggle};
pub use config::{ClientConfig, ConfigError, QueryOptions};
pub use error::ClientError;
pub use listeners::{Listener, ListenerId};
pub use messaging::{ChatEvent, InMemoryBus, MessageBus, Subscription};
pub use mutation::{
    MutationKind, MutationPhase, MutationState, OptimisticMutation,
    tolerate_conflict,
};
pub use query::{QueryRun, QueryState, RetryableQuery};
pub use session::{AppContext, Session};
pub use toast::{Toast, ToastType, Toasts};
pub use view_models::ViewModel;
