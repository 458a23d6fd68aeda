mod wiring;

use crate::gpkg::GpkgStorage;
use crate::relocate::{self, MovePlan};
use crate::spatial::{self, RectIndex};
use crate::types::{FeatureLayer, MoveReport};
use crate::{cli, context};
use anyhow::{Context as AnyhowContext, Result};

pub struct App {
    pub ctx: context::Context,
}

impl App {
    pub fn new(ctx: context::Context) -> Self {
        Self { ctx }
    }

    pub fn from_cli() -> Result<Self> {
        let cli = cli::parse();
        let ctx = context::Context::from_cli(&cli);

        crate::tracing::init(ctx.config.log_file.as_deref());
        log::info!("🚀 Starting move-point");
        log::info!("📍 Points: {}", ctx.config.points.display());
        log::info!("🔲 Rectangles: {}", ctx.config.rects.display());
        if ctx.config.dry_run {
            log::info!("🧪 Dry run: changes will be rolled back");
        }
        if let Some(path) = ctx.config.log_file.as_deref() {
            log::info!("📝 Log file: {}", path.display());
        }

        Ok(Self::new(ctx))
    }

    /// Loads both layers, moves the points and saves them unless this is a dry run.
    pub fn process(&self) -> Result<MoveReport> {
        let cfg = &self.ctx.config;
        let _span = ::tracing::info_span!(
            "move_points",
            points = %cfg.points.display(),
            rects = %cfg.rects.display()
        )
        .entered();

        let points_storage = wiring::open_storage(&cfg.points)?;
        let rects_storage = wiring::open_storage(&cfg.rects)?;

        let (points_layer, points) =
            wiring::load_points(&points_storage, cfg.points_layer.as_deref())?;
        let (rects_layer, rects) =
            wiring::load_rectangles(&rects_storage, cfg.rects_layer.as_deref())?;

        if points_layer.srs_id != rects_layer.srs_id {
            log::warn!(
                "layers use different spatial reference systems ({} vs {}); coordinates are compared as-is",
                points_layer.srs_id,
                rects_layer.srs_id
            );
        }

        let sorted = spatial::sort_rectangles(rects);
        let index = RectIndex::build(&sorted);
        log::info!("Spatial index for '{}' built", rects_layer.table);
        let map = spatial::map_points(&points, &sorted, &index);

        let plan = relocate::plan_moves(&sorted, &map).context("planning point moves")?;
        let committed = apply_plan(&points_storage, &points_layer, &plan, cfg.dry_run)?;

        Ok(MoveReport {
            points_layer: points_layer.table,
            rects_layer: rects_layer.table,
            rectangles: sorted.len(),
            points: points.len(),
            mapped_points: map.mapped(),
            unassigned_points: map.unassigned(),
            moved_points: plan.len(),
            committed,
            dry_run: cfg.dry_run,
        })
    }
}

/// Writes every move in one transaction. Any failure rolls the whole plan back.
fn apply_plan(
    storage: &GpkgStorage,
    layer: &FeatureLayer,
    plan: &MovePlan,
    dry_run: bool,
) -> Result<bool> {
    if plan.is_empty() {
        log::info!("No point lies inside a rectangle, nothing to move");
        return Ok(false);
    }

    let tx = storage.begin_tx().context("starting transaction")?;
    for mv in &plan.moves {
        tx.update_point(layer, mv.point_fid, &mv.to, mv.shape)
            .with_context(|| format!("moving point {}", mv.point_fid))?;
    }
    tx.refresh_extent(layer)
        .context("refreshing layer extent")?;

    if dry_run {
        tx.rollback().context("rolling back dry run")?;
        log::info!("Dry run finished, {} moves discarded", plan.len());
        return Ok(false);
    }

    tx.commit().context("committing changes")?;
    log::info!("✅ Changes saved: {} points moved", plan.len());
    Ok(true)
}

pub fn run() -> Result<()> {
    let app = App::from_cli()?;
    let report = app.process()?;

    if app.ctx.config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
