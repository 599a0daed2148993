//! Entity trait: identity + continuity across state changes.

use crate::id::Id;

/// A persisted record with a store-assigned identity.
///
/// `Draft` is what callers hand to the store on insert (everything except the
/// id); `Patch` is a partial update where `None` leaves a field untouched.
/// Applying a patch is pure and infallible: rules about *which* patches are
/// legal live in the domain modules, not here.
pub trait Entity: Clone + core::fmt::Debug + Send + Sync + 'static {
    type Draft: Send + 'static;
    type Patch: Send + 'static;

    /// Human-readable kind used in errors and logs (e.g. "unit").
    const KIND: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> Id<Self>;

    /// Materialize a draft once the store has assigned an id.
    fn from_draft(id: Id<Self>, draft: Self::Draft) -> Self;

    fn apply_patch(&mut self, patch: Self::Patch);
}
