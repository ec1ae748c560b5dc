use std::path::Path;

use serde_json::{Map, Value, json, to_string_pretty};

use crate::{
    config::Settings,
    equalizer::Outcome,
    error::{Error, Result},
    report::peak_factor_db,
};

pub fn summary(settings: &Settings, outcome: &Outcome) -> Value {
    let stats = outcome.measurement.stats();
    let active = outcome.measurement.active_level_db();

    let mut map = Map::new();
    map.insert(
        "input".to_string(),
        json!({
            "path": settings.input.display().to_string(),
            "sampleRate": settings.sample_rate,
            "resolution": settings.format.resolution(),
        }),
    );
    map.insert(
        "output".to_string(),
        json!({
            "path": settings.output.display().to_string(),
            "samples": outcome.samples_written,
            "saturated": outcome.saturated,
        }),
    );
    map.insert("blocks".to_string(), json!(outcome.plan));
    map.insert("measurement".to_string(), json!(outcome.measurement));
    map.insert(
        "peakFactors".to_string(),
        json!({
            "rms": peak_factor_db(stats.max_abs, stats.long_term_level_db),
            "active": active.and_then(|level| peak_factor_db(stats.max_abs, level)),
        }),
    );
    map.insert(
        "equalization".to_string(),
        json!({
            "source": outcome.level_source,
            "desiredLevelDb": outcome.desired_level_db,
            "measuredLevelDb": outcome.measured_level_db,
            "factor": outcome.factor,
            "headroom": outcome.headroom,
        }),
    );

    Value::Object(map)
}

pub fn write_json(path: &Path, settings: &Settings, outcome: &Outcome) -> Result<()> {
    let text = to_string_pretty(&summary(settings, outcome))
        .map_err(|e| Error::Write(e.into()))?;
    std::fs::write(path, text).map_err(|source| Error::CreateOutput {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "wrote JSON summary");
    Ok(())
}
