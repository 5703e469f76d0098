//! Observable model of the primary map engine.
//!
//! The synchronization core only ever reads this object graph and
//! subscribes to its changes; all mutation is driven by the host
//! application. Handles are cheap clones sharing one underlying object,
//! matching the read-plus-subscribe surface the heralds consume.

pub mod feature;
pub mod geometry;
pub mod layer;
pub mod map;
pub mod source;
pub mod stack;
pub mod style;
pub mod tilegrid;
pub mod view;

pub use feature::Feature;
pub use geometry::{Geometry, Shape};
pub use layer::{Layer, LayerSource, SourceKind};
pub use map::PrimaryMap;
pub use source::{ImageWmsSource, ProxySource, TileSource, VectorSource};
pub use stack::LayerStack;
pub use style::{ColorSpec, Fill, Icon, Stroke, Style, TextAlign, TextStyle};
pub use tilegrid::TileGrid;
pub use view::View;

pub(crate) use crate::core::ids::next_id;
