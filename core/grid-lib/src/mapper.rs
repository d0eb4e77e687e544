use crate::*;

/// 連續座標與網格座標的轉換
///
/// 格子中心位於 `origin + cell * cell_size`，任意座標吸附到最近的格子中心。
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GridMapper {
    pub origin: Point,
    pub cell_size: f32,
}

impl Default for GridMapper {
    fn default() -> Self {
        Self {
            origin: Point::default(),
            cell_size: 2.0,
        }
    }
}

impl GridMapper {
    pub fn new(origin: Point, cell_size: f32) -> Result<Self, Error> {
        if !(cell_size > 0.0) {
            return Err(Error::InvalidParameter {
                func: "GridMapper::new",
                reason: format!("cell_size 必須大於 0，實際為 {cell_size}"),
            });
        }
        Ok(Self { origin, cell_size })
    }

    pub fn to_cell(&self, pos: Point) -> Cell {
        Cell {
            x: ((pos.x - self.origin.x) / self.cell_size).round() as Coord,
            y: ((pos.y - self.origin.y) / self.cell_size).round() as Coord,
        }
    }

    pub fn to_point(&self, cell: Cell) -> Point {
        Point {
            x: self.origin.x + cell.x as f32 * self.cell_size,
            y: self.origin.y + cell.y as f32 * self.cell_size,
        }
    }

    /// 吸附到最近的格子中心
    pub fn snap(&self, pos: Point) -> Point {
        self.to_point(self.to_cell(pos))
    }

    /// 從連續座標出發的可到達格子中心
    pub fn reachable_points(&self, origin: Point, budget: f32) -> Vec<Point> {
        reachable_cells(self.to_cell(origin), budget)
            .cells()
            .into_iter()
            .map(|cell| self.to_point(cell))
            .collect()
    }
}
