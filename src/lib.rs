//! Canonical event synchronization engine.
//!
//! Reads backend-native calendar records into the canonical model from
//! `evsync-core` and writes canonical events back without duplicating
//! locations or taxonomy terms and without flooding host listeners with
//! per-step change notifications. The backend itself (record storage,
//! term storage, authorization, tenant switching, metadata) is supplied
//! by the adapter through the traits in [`backend`].
//!
//! Writes are not transactional. The reconciler persists the primary
//! event record first and fails forward from there: a later sub-step
//! failure keeps what was committed and reports the partial ids in the
//! `SaveResult`. Two concurrent saves for the same uid can race between
//! identity resolution and the primary persist and produce duplicate
//! records; the engine takes no cross-request locks, so hosts running
//! parallel writers should serialize saves per uid themselves.

pub mod backend;
pub mod convert;
pub mod feed;
pub mod identity;
pub mod notify;
pub mod reconcile;

#[cfg(test)]
mod testing;

pub use backend::{Backend, BackendSettings, CapabilityNames, Lifecycle};
pub use convert::ReadConverter;
pub use feed::EventsFeed;
pub use identity::IdentityResolver;
pub use notify::{NotificationBroker, NotifyKind, SuppressGuard};
pub use reconcile::WriteReconciler;
