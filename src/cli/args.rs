use clap::Parser;
use std::env;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Move points from each rectangle into the next one",
    long_about = "Moves point features of a GeoPackage layer from the rectangle that contains them into the next rectangle, with rectangles ordered by the X coordinate of their centroid. The last rectangle hands its points to the first. Each point keeps its offset from the rectangle centroid. The points layer is updated in place.",
    after_help = "Example:\n  move-point --points data/points.gpkg --rects data/rectangles.gpkg"
)]
pub struct Cli {
    #[arg(
        long,
        env = "MOVE_POINT_POINTS",
        value_name = "PATH",
        help = "GeoPackage with the point layer (.gpkg)"
    )]
    pub points: PathBuf,

    #[arg(
        long,
        env = "MOVE_POINT_RECTS",
        value_name = "PATH",
        help = "GeoPackage with the rectangle layer (.gpkg)"
    )]
    pub rects: PathBuf,

    #[arg(
        long,
        value_name = "TABLE",
        help = "Point layer table name (default: first feature table)"
    )]
    pub points_layer: Option<String>,

    #[arg(
        long,
        value_name = "TABLE",
        help = "Rectangle layer table name (default: first feature table)"
    )]
    pub rects_layer: Option<String>,

    #[arg(
        long,
        default_value_t = false,
        help = "Compute and log the moves without saving them"
    )]
    pub dry_run: bool,

    #[arg(long, default_value_t = false, help = "Print a JSON summary on stdout")]
    pub json: bool,

    #[arg(
        long = "log-file",
        env = "MOVE_POINT_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<PathBuf>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    Cli::parse()
}
