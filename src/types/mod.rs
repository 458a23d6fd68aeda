mod feature;
mod move_report;

pub use feature::{FeatureLayer, PointFeature, RectFeature};
pub use move_report::MoveReport;
