//! Heralds: stateful observers that keep secondary-map mirrors current.
//!
//! Each herald subscribes to a slice of primary-map state on activation and
//! reverses every subscription on deactivation. Composition is by
//! delegation: the layers herald owns one herald per source family plus the
//! view herald, and fans the shared "secondary map is active" flag out to
//! them.

pub mod feature;
pub mod layers;
pub mod tile;
pub mod vector;
pub mod view;
pub mod wms;

pub use feature::FeatureHerald;
pub use layers::{ActivationState, LayersHerald};
pub use tile::TileHerald;
pub use vector::VectorHerald;
pub use view::ViewHerald;
pub use wms::WmsHerald;

/// The capability every herald offers: begin mirroring, and undo exactly
/// what activation did.
pub trait Herald {
    fn activate(&self);
    fn deactivate(&self);
}
