mod index;
mod mapping;

pub use index::RectIndex;
pub use mapping::{map_points, sort_rectangles, PointMap};
