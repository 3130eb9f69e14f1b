use std::{fs, path::Path};

use anyhow::{Context, Result};
use traffic_grid_world::{Config, MapModel};

/// Values supplied on the command line that take precedence over the
/// configuration file.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) population: Option<u32>,
    pub(crate) columns: Option<u32>,
    pub(crate) rows: Option<u32>,
    pub(crate) seed: Option<u64>,
}

/// Reads a world configuration from a TOML file.
pub(crate) fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("failed to parse configuration file {}", path.display()))
}

fn parse_config(contents: &str) -> Result<Config> {
    toml::from_str(contents).context("invalid world configuration")
}

/// Reads a map file holding one row of glyphs per line.
pub(crate) fn load_map(path: &Path) -> Result<MapModel> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read map file {}", path.display()))?;
    Ok(MapModel::from_text(&contents))
}

/// Layers command-line overrides on top of the file configuration.
///
/// Without a configuration file the grid takes the map's dimensions.
pub(crate) fn resolve(file: Option<Config>, map: &MapModel, overrides: Overrides) -> Config {
    let base = file.unwrap_or_else(|| {
        let (columns, rows) = map.dimensions();
        Config::default().with_dimensions(columns, rows)
    });

    let mut config = base.with_dimensions(
        overrides.columns.unwrap_or(base.columns()),
        overrides.rows.unwrap_or(base.rows()),
    );
    if let Some(population) = overrides.population {
        config = config.with_population(population);
    }
    if let Some(seed) = overrides.seed {
        config = config.with_seed(seed);
    }
    config
}
