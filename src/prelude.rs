//! Prelude module for common mapbridge types and traits
//!
//! Re-exports the most commonly used types and functions for easy
//! importing with `use mapbridge::prelude::*;`

pub use crate::core::{
    color::Rgba,
    geo::{Extent, LatLng, Point, TileCoord},
    resolution::{resolution_from_zoom, zoom_from_resolution},
};

pub use crate::events::{ListenerHandle, Property, PropertyChange, PropertyListener, Signal};

pub use crate::primary::{
    feature::Feature,
    geometry::{Geometry, Shape},
    layer::{Layer, LayerSource},
    map::PrimaryMap,
    source::{ImageWmsSource, ProxySource, TileSource, VectorSource},
    stack::LayerStack,
    style::{Fill, Icon, Stroke, Style, TextStyle},
    tilegrid::TileGrid,
    view::View,
};

pub use crate::secondary::{
    data::{DataCollection, DataFeature, DataGeometry, DataStyle},
    map::{MapTypeId, SecondaryMap},
    overlay::{GroundOverlay, LabelOverlay, MarkerOverlay},
    pane::TileOverlay,
    scheduler::Scheduler,
    stage::{MountedWidget, Stage},
};

pub use crate::herald::Herald;

pub use crate::bridge::{BridgeOptions, IconRenderOptions, MapBridge, WatchOptions};

pub use crate::{Error as BridgeError, Result};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
