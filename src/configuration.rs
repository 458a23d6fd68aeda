use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    pub points: PathBuf,
    pub rects: PathBuf,
    pub points_layer: Option<String>,
    pub rects_layer: Option<String>,
    pub dry_run: bool,
    pub json: bool,
    pub log_file: Option<PathBuf>,
}
