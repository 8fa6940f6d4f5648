//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! register / login / token verification
//!     → store.rs (IdentityStore trait: find by email, find by id, save)
//!     → model.rs (Identity record, IdentityView for responses)
//! ```
//!
//! # Design Decisions
//! - Identity is a fixed-shape record: `is_active` and `is_admin` are plain bools
//! - Email is unique and stored lower-cased
//! - The password hash never leaves the crate; responses use `IdentityView`

pub mod model;
pub mod store;

pub use model::{Identity, IdentityView};
pub use store::{IdentityStore, MemoryIdentityStore, StoreError};
