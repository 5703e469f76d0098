//! Command surface of the secondary rendering engine.
//!
//! The bridge only ever writes to this side: map type, view state, tile
//! overlays, ground overlays, data features and canvas overlay views. The
//! in-memory model here records every command so activation, mirroring and
//! teardown are observable without a real rendering backend; it is the
//! injectable adapter the heralds receive at construction time.

pub mod data;
pub mod map;
pub mod overlay;
pub mod pane;
pub mod scheduler;
pub mod stage;
pub mod translate;

pub use data::{DataCollection, DataFeature, DataGeometry, DataStyle};
pub use map::{MapTypeId, SecondaryMap};
pub use overlay::{GroundOverlay, LabelOverlay, MarkerOverlay};
pub use pane::{OverlayPane, TileOverlay};
pub use scheduler::{Scheduler, TaskId};
pub use stage::{MountedWidget, Stage};

pub(crate) use crate::core::ids::next_id;
