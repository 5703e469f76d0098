//! # mapbridge
//!
//! A one-directional synchronization layer that keeps two independently
//! owned map widgets consistent: a primary interactive map that owns all
//! user interaction, and a secondary tile-rendering backend that mirrors
//! the primary map's state whenever it is made visible.
//!
//! The crate is organized around "heralds": stateful observers that
//! subscribe to a slice of primary-map state and keep a secondary-map
//! mirror current, reversing every subscription on deactivation.

pub mod bridge;
pub mod core;
pub mod events;
pub mod herald;
pub mod prelude;
pub mod primary;
pub mod secondary;

// Re-export public API
pub use crate::core::{
    color::Rgba,
    geo::{Extent, LatLng, Point, TileCoord},
    resolution::{resolution_from_zoom, zoom_from_resolution},
};

pub use crate::bridge::{BridgeOptions, IconRenderOptions, MapBridge, WatchOptions};

pub use crate::events::{ListenerHandle, Property, PropertyChange, PropertyListener, Signal};

pub use crate::primary::{
    feature::Feature,
    geometry::Geometry,
    layer::{Layer, LayerSource},
    map::PrimaryMap,
    view::View,
};

pub use crate::secondary::map::SecondaryMap;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = BridgeError;
