//! Immutable classification of the source map.

use traffic_grid_core::{CellCoord, MapCell, SignalSize};

/// Map classified once from rows of glyphs.
///
/// Rows may differ in length; cells beyond the end of a row, or below the
/// last row, have no classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapModel {
    raw: Vec<String>,
    cells: Vec<Vec<MapCell>>,
    destinations: Vec<CellCoord>,
    obstacles: Vec<CellCoord>,
    signals: Vec<(CellCoord, SignalSize)>,
}

impl MapModel {
    /// Classifies every glyph of the provided rows. Row `y` holds the cells `(x, y)`.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = rows.into_iter().map(Into::into).collect();
        let cells: Vec<Vec<MapCell>> = raw
            .iter()
            .map(|row| row.chars().map(MapCell::from_glyph).collect())
            .collect();

        let mut destinations = Vec::new();
        let mut obstacles = Vec::new();
        let mut signals = Vec::new();
        for (row_index, row) in cells.iter().enumerate() {
            for (column_index, classification) in row.iter().enumerate() {
                let (Ok(x), Ok(y)) = (u32::try_from(column_index), u32::try_from(row_index)) else {
                    continue;
                };
                let cell = CellCoord::new(x, y);
                match classification {
                    MapCell::Destination => destinations.push(cell),
                    MapCell::Obstacle => obstacles.push(cell),
                    MapCell::TrafficLight(size) => signals.push((cell, *size)),
                    MapCell::Empty | MapCell::Direction(_) => {}
                }
            }
        }

        Self {
            raw,
            cells,
            destinations,
            obstacles,
            signals,
        }
    }

    /// Classifies map text holding one row per line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_rows(text.lines())
    }

    /// Classification of the cell, or `None` when the map holds no glyph for it.
    #[must_use]
    pub fn classify(&self, cell: CellCoord) -> Option<MapCell> {
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        self.cells.get(row)?.get(column).copied()
    }

    /// Destination cells in row-major order.
    #[must_use]
    pub fn destinations(&self) -> &[CellCoord] {
        &self.destinations
    }

    /// Obstacle cells in row-major order.
    #[must_use]
    pub fn obstacles(&self) -> &[CellCoord] {
        &self.obstacles
    }

    /// Traffic signal cells and their sizes in row-major order.
    #[must_use]
    pub fn signals(&self) -> &[(CellCoord, SignalSize)] {
        &self.signals
    }

    /// Rows exactly as supplied.
    #[must_use]
    pub fn raw_rows(&self) -> &[String] {
        &self.raw
    }

    /// Width of the longest row and the number of rows.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        let columns = self.cells.iter().map(Vec::len).max().unwrap_or(0);
        (
            u32::try_from(columns).unwrap_or(u32::MAX),
            u32::try_from(self.cells.len()).unwrap_or(u32::MAX),
        )
    }
}
