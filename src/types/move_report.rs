use serde::{Deserialize, Serialize};

/// Summary of one run, printed as JSON with `--json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub points_layer: String,
    pub rects_layer: String,
    pub rectangles: usize,
    pub points: usize,
    pub mapped_points: usize,
    pub unassigned_points: usize,
    pub moved_points: usize,
    pub committed: bool,
    pub dry_run: bool,
}
