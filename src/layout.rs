//! Pure geometry: percent boxes to EMU, weighted partitions and connector routes.

pub mod geometry;
pub mod partition;
pub mod routing;
pub mod types;

pub use geometry::{pct_to_emu, resolve, two_panel};
pub use partition::{
    MIN_WEIGHT, PlacedNode, Span, TreeLayout, TreeOptions, WeightedNode, layout_tree, partition,
};
pub use routing::{ConnectorRoute, RouteStyle, Site, polyline, route};
pub use types::*;
