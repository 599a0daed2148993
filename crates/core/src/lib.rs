//! `stockroom-core`: identifiers, quantities, the clock seam and the domain
//! error type shared by every other crate. No storage or I/O lives here.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use clock::{Clock, FixedClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::Id;
pub use value_object::{Quantity, ValueObject};
