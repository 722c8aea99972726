//! Batch render driver
//!
//! The plan is computed from a [`snapshot::SceneSnapshot`]; the script only
//! applies it camera by camera.
pub mod plan;
pub mod script;
pub mod snapshot;

use crate::config::RenderConfig;
use crate::core::session::Session;
use log::info;
use plan::RenderPlan;
use snapshot::SceneSnapshot;

/// Plans every eligible camera and appends the render script to `session`.
pub fn generate(
    session: &mut Session,
    snapshot: &SceneSnapshot,
    config: &RenderConfig,
    filter: Option<&str>,
) -> crate::Result<RenderPlan> {
    config.validate()?;
    let plan = plan::plan(snapshot, config, filter);
    info!(
        "scene {}: {} cameras to render, {} skipped",
        plan.scene_name,
        plan.jobs.len(),
        plan.skipped.len()
    );
    script::emit(session, &plan, config);
    Ok(plan)
}
