use crate::configuration::Configuration;

pub struct Context {
    pub config: Configuration,
}

impl Context {
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        let cfg = Configuration {
            points: cli.points.clone(),
            rects: cli.rects.clone(),
            points_layer: cli.points_layer.clone(),
            rects_layer: cli.rects_layer.clone(),
            dry_run: cli.dry_run,
            json: cli.json,
            log_file: cli.log_file.clone(),
        };
        Self { config: cfg }
    }
}
