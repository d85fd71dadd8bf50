//! Layout definitions and the cell geometry derived from them.

use super::graph::{Direction, StackMode};
use super::spacing::{PaddingSpec, SpacingValue};
use super::tracks::{TrackSize, calculate_tracks};
use super::ConfigurationError;
use crate::common::collections::{BTreeMap, HashSet};
use crate::sys::geometry::{Point, Rect, RectExt};

/// A named region of the grid. Spans are 1-indexed with an exclusive end,
/// so `col_start = 1, col_end = 3` covers the first two columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub id: String,
    pub col_start: usize,
    pub col_end: usize,
    pub row_start: usize,
    pub row_end: usize,
    pub stack_mode: Option<StackMode>,
    pub padding: Option<PaddingSpec>,
    pub window_spacing: Option<SpacingValue>,
}

impl Cell {
    pub fn new(id: impl Into<String>, columns: (usize, usize), rows: (usize, usize)) -> Self {
        Cell {
            id: id.into(),
            col_start: columns.0,
            col_end: columns.1,
            row_start: rows.0,
            row_end: rows.1,
            ..Default::default()
        }
    }

    pub fn with_stack_mode(mut self, mode: StackMode) -> Self {
        self.stack_mode = Some(mode);
        self
    }

    fn span_error(&self, columns: usize, rows: usize) -> ConfigurationError {
        ConfigurationError::CellSpanOutOfRange {
            cell: self.id.clone(),
            col_start: self.col_start,
            col_end: self.col_end,
            row_start: self.row_start,
            row_end: self.row_end,
            columns,
            rows,
        }
    }

    fn check_span(&self, columns: usize, rows: usize) -> Result<(), ConfigurationError> {
        let fits = |start: usize, end: usize, count: usize| start >= 1 && end > start && end <= count + 1;
        if fits(self.col_start, self.col_end, columns) && fits(self.row_start, self.row_end, rows) {
            Ok(())
        } else {
            Err(self.span_error(columns, rows))
        }
    }
}

/// A grid: column and row tracks plus the cells placed on them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
    pub id: String,
    pub name: String,
    pub description: String,
    pub columns: Vec<TrackSize>,
    pub rows: Vec<TrackSize>,
    pub cells: Vec<Cell>,
    /// Per-cell stack mode overrides, keyed by cell id.
    pub cell_modes: BTreeMap<String, StackMode>,
    pub padding: Option<PaddingSpec>,
    pub window_spacing: Option<SpacingValue>,
}

impl Layout {
    pub fn cell(&self, id: &str) -> Option<&Cell> { self.cells.iter().find(|c| c.id == id) }

    pub fn has_cell(&self, id: &str) -> bool { self.cell(id).is_some() }

    pub fn cell_ids(&self) -> impl Iterator<Item = &str> { self.cells.iter().map(|c| c.id.as_str()) }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.cells.is_empty() {
            return Err(ConfigurationError::NoCells(self.id.clone()));
        }
        let mut seen = HashSet::default();
        for cell in &self.cells {
            if !seen.insert(cell.id.as_str()) {
                return Err(ConfigurationError::DuplicateCell {
                    layout: self.id.clone(),
                    cell: cell.id.clone(),
                });
            }
            cell.check_span(self.columns.len(), self.rows.len())?;
        }
        if let Some(unknown) = self.cell_modes.keys().find(|id| !seen.contains(id.as_str())) {
            return Err(ConfigurationError::UnknownCell {
                layout: self.id.clone(),
                cell: unknown.clone(),
            });
        }
        Ok(())
    }
}

/// Pixel geometry of a layout on one screen. Derived, never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CalculatedLayout {
    pub layout_id: String,
    pub screen: Rect,
    pub gap: f64,
    pub column_sizes: Vec<f64>,
    pub row_sizes: Vec<f64>,
    pub cell_bounds: BTreeMap<String, Rect>,
}

impl CalculatedLayout {
    pub fn bounds(&self, cell_id: &str) -> Option<Rect> { self.cell_bounds.get(cell_id).copied() }

    /// Smallest rectangle enclosing every cell.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut rects = self.cell_bounds.values();
        let first = *rects.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) =
            (first.min_x(), first.min_y(), first.max_x(), first.max_y());
        for r in rects {
            min_x = min_x.min(r.min_x());
            min_y = min_y.min(r.min_y());
            max_x = max_x.max(r.max_x());
            max_y = max_y.max(r.max_y());
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

/// Rectangle covered by `cell`, relative to the grid origin.
pub fn calculate_cell_bounds(
    cell: &Cell,
    column_sizes: &[f64],
    row_sizes: &[f64],
    gap: f64,
) -> Result<Rect, ConfigurationError> {
    cell.check_span(column_sizes.len(), row_sizes.len())?;

    let span = |sizes: &[f64], start: usize, end: usize| -> (f64, f64) {
        let (start, end) = (start - 1, end - 1);
        let offset = sizes[..start].iter().sum::<f64>() + start as f64 * gap;
        let length = sizes[start..end].iter().sum::<f64>() + (end - start - 1) as f64 * gap;
        (offset, length)
    };
    let (x, width) = span(column_sizes, cell.col_start, cell.col_end);
    let (y, height) = span(row_sizes, cell.row_start, cell.row_end);
    Ok(Rect::new(x, y, width, height))
}

/// Resolves every cell of `layout` onto `screen`.
pub fn calculate_layout(
    layout: &Layout,
    screen: Rect,
    gap: f64,
) -> Result<CalculatedLayout, ConfigurationError> {
    layout.validate()?;

    let column_sizes = calculate_tracks(&layout.columns, screen.width, gap);
    let row_sizes = calculate_tracks(&layout.rows, screen.height, gap);

    let mut cell_bounds = BTreeMap::new();
    for cell in &layout.cells {
        let mut bounds = calculate_cell_bounds(cell, &column_sizes, &row_sizes, gap)?;
        bounds.x += screen.x;
        bounds.y += screen.y;
        cell_bounds.insert(cell.id.clone(), bounds);
    }

    Ok(CalculatedLayout {
        layout_id: layout.id.clone(),
        screen,
        gap,
        column_sizes,
        row_sizes,
        cell_bounds,
    })
}

fn is_empty_area(name: &str) -> bool { name.is_empty() || name == "." }

/// Builds cells from an area grid such as
///
/// ```text
/// main main side
/// main main side
/// foot foot foot
/// ```
///
/// `.` marks an unused slot. Every name must cover a rectangle. Cells come
/// back in order of first appearance.
pub fn areas_to_cells<R, S>(areas: &[R]) -> Result<Vec<Cell>, ConfigurationError>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let Some(first) = areas.first() else {
        return Err(ConfigurationError::MalformedAreas("no rows".into()));
    };
    let width = first.as_ref().len();

    let mut order: Vec<String> = Vec::new();
    let mut slots: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
    for (row, names) in areas.iter().enumerate() {
        let names = names.as_ref();
        if names.len() != width {
            return Err(ConfigurationError::MalformedAreas(format!(
                "row {} has {} columns, expected {width}",
                row + 1,
                names.len()
            )));
        }
        for (col, name) in names.iter().enumerate() {
            let name = name.as_ref().trim();
            if is_empty_area(name) {
                continue;
            }
            if !slots.contains_key(name) {
                order.push(name.to_string());
            }
            slots.entry(name.to_string()).or_default().push((row, col));
        }
    }

    order
        .into_iter()
        .map(|name| {
            let positions = &slots[&name];
            let min_row = positions.iter().map(|p| p.0).min().unwrap_or(0);
            let max_row = positions.iter().map(|p| p.0).max().unwrap_or(0);
            let min_col = positions.iter().map(|p| p.1).min().unwrap_or(0);
            let max_col = positions.iter().map(|p| p.1).max().unwrap_or(0);
            if positions.len() != (max_row - min_row + 1) * (max_col - min_col + 1) {
                return Err(ConfigurationError::MalformedAreas(format!(
                    "cell {name} does not form a rectangle"
                )));
            }
            Ok(Cell::new(name, (min_col + 1, max_col + 2), (min_row + 1, max_row + 2)))
        })
        .collect()
}

/// The cell containing `point`. Overlapping cells resolve to the smallest id.
pub fn cell_at_point(bounds: &BTreeMap<String, Rect>, point: Point) -> Option<&str> {
    bounds.iter().find(|(_, rect)| rect.contains(point)).map(|(id, _)| id.as_str())
}

/// Cells lying in each direction from `cell_id` that share some extent on
/// the perpendicular axis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Adjacency {
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub up: Vec<String>,
    pub down: Vec<String>,
}

impl Adjacency {
    pub fn get(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }
}

pub fn adjacent_cells(bounds: &BTreeMap<String, Rect>, cell_id: &str) -> Adjacency {
    let mut adjacency = Adjacency::default();
    let Some(current) = bounds.get(cell_id) else {
        return adjacency;
    };
    let center = current.center();

    for (id, rect) in bounds {
        if id == cell_id {
            continue;
        }
        let other = rect.center();
        let (dx, dy) = (other.x - center.x, other.y - center.y);
        if current.overlaps_vertically(rect) {
            if dx < 0.0 {
                adjacency.left.push(id.clone());
            } else if dx > 0.0 {
                adjacency.right.push(id.clone());
            }
        }
        if current.overlaps_horizontally(rect) {
            if dy < 0.0 {
                adjacency.up.push(id.clone());
            } else if dy > 0.0 {
                adjacency.down.push(id.clone());
            }
        }
    }
    adjacency
}

/// Cell ids in reading order: top to bottom, then left to right, then by id.
pub fn sort_cells_by_position(bounds: &BTreeMap<String, Rect>) -> Vec<String> {
    let mut ids: Vec<(&String, &Rect)> = bounds.iter().collect();
    ids.sort_by(|(a_id, a), (b_id, b)| {
        a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)).then_with(|| a_id.cmp(b_id))
    });
    ids.into_iter().map(|(id, _)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fr(n: usize) -> Vec<TrackSize> { vec![TrackSize::Fr(1.0); n] }

    fn two_by_two() -> Layout {
        Layout {
            id: "quad".into(),
            name: "Quad".into(),
            columns: fr(2),
            rows: fr(2),
            cells: vec![
                Cell::new("tl", (1, 2), (1, 2)),
                Cell::new("tr", (2, 3), (1, 2)),
                Cell::new("bl", (1, 2), (2, 3)),
                Cell::new("br", (2, 3), (2, 3)),
            ],
            ..Default::default()
        }
    }

    mod bounds {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn spans_include_inner_gaps() {
            let cell = Cell::new("wide", (1, 3), (2, 3));
            let rect = calculate_cell_bounds(&cell, &[100.0, 200.0, 300.0], &[50.0, 60.0], 10.0)
                .unwrap();
            assert_eq!(rect, Rect::new(0.0, 60.0, 310.0, 60.0));
        }

        #[test]
        fn out_of_range_spans_fail() {
            for cell in [
                Cell::new("a", (0, 1), (1, 2)),
                Cell::new("b", (1, 5), (1, 2)),
                Cell::new("c", (2, 2), (1, 2)),
                Cell::new("d", (1, 2), (1, 3)),
            ] {
                assert!(matches!(
                    calculate_cell_bounds(&cell, &[1.0, 1.0, 1.0], &[1.0], 0.0),
                    Err(ConfigurationError::CellSpanOutOfRange { .. })
                ));
            }
        }

        #[test]
        fn layout_is_offset_by_screen_origin() {
            let calc =
                calculate_layout(&two_by_two(), Rect::new(1920.0, 25.0, 1010.0, 810.0), 10.0)
                    .unwrap();
            assert_eq!(calc.column_sizes, vec![500.0, 500.0]);
            assert_eq!(calc.row_sizes, vec![400.0, 400.0]);
            assert_eq!(calc.bounds("tl"), Some(Rect::new(1920.0, 25.0, 500.0, 400.0)));
            assert_eq!(calc.bounds("br"), Some(Rect::new(2430.0, 435.0, 500.0, 400.0)));
            assert_eq!(calc.bounding_box(), Some(Rect::new(1920.0, 25.0, 1010.0, 810.0)));
        }
    }

    mod validation {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn rejects_empty_layouts() {
            let layout = Layout { id: "empty".into(), ..Default::default() };
            assert_eq!(layout.validate(), Err(ConfigurationError::NoCells("empty".into())));
        }

        #[test]
        fn rejects_duplicates_and_unknown_modes() {
            let mut layout = two_by_two();
            layout.cells.push(Cell::new("tl", (1, 2), (1, 2)));
            assert_eq!(
                layout.validate(),
                Err(ConfigurationError::DuplicateCell { layout: "quad".into(), cell: "tl".into() })
            );

            let mut layout = two_by_two();
            layout.cell_modes.insert("nowhere".into(), StackMode::Tabs);
            assert_eq!(
                layout.validate(),
                Err(ConfigurationError::UnknownCell { layout: "quad".into(), cell: "nowhere".into() })
            );
        }
    }

    mod areas {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test]
        fn builds_spanning_cells() {
            let cells = areas_to_cells(&[
                vec!["main", "main", "side"],
                vec!["main", "main", "side"],
                vec!["foot", "foot", "."],
            ])
            .unwrap();
            assert_eq!(cells, vec![
                Cell::new("main", (1, 3), (1, 3)),
                Cell::new("side", (3, 4), (1, 3)),
                Cell::new("foot", (1, 3), (3, 4)),
            ]);
        }

        #[test]
        fn rejects_non_rectangles_and_ragged_rows() {
            assert!(matches!(
                areas_to_cells(&[vec!["a", "b"], vec!["a", "a"]]),
                Err(ConfigurationError::MalformedAreas(_))
            ));
            assert!(matches!(
                areas_to_cells(&[vec!["a", "b"], vec!["a"]]),
                Err(ConfigurationError::MalformedAreas(_))
            ));
            assert!(areas_to_cells::<Vec<&str>, &str>(&[]).is_err());
        }
    }

    mod queries {
        use pretty_assertions::assert_eq;

        use super::*;

        fn quad_bounds() -> BTreeMap<String, Rect> {
            calculate_layout(&two_by_two(), Rect::new(0.0, 0.0, 1000.0, 800.0), 0.0)
                .unwrap()
                .cell_bounds
        }

        #[test]
        fn point_lookup() {
            let bounds = quad_bounds();
            assert_eq!(cell_at_point(&bounds, Point::new(750.0, 100.0)), Some("tr"));
            assert_eq!(cell_at_point(&bounds, Point::new(100.0, 700.0)), Some("bl"));
            assert_eq!(cell_at_point(&bounds, Point::new(-5.0, 700.0)), None);
        }

        #[test]
        fn adjacency_uses_perpendicular_overlap() {
            let bounds = quad_bounds();
            let adj = adjacent_cells(&bounds, "tl");
            assert_eq!(adj.get(Direction::Right), ["tr".to_string()]);
            assert_eq!(adj.get(Direction::Down), ["bl".to_string()]);
            assert!(adj.get(Direction::Left).is_empty());
            assert!(adj.get(Direction::Up).is_empty());
            assert_eq!(adjacent_cells(&bounds, "missing"), Adjacency::default());
        }

        #[test]
        fn reading_order() {
            assert_eq!(sort_cells_by_position(&quad_bounds()), vec!["tl", "tr", "bl", "br"]);
        }
    }
}
