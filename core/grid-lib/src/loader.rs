//! 地圖載入器

use crate::*;
use std::collections::{BTreeSet, HashMap};

pub const FLOOR_SYMBOL: &str = ".";
pub const WALL_SYMBOL: &str = "#";

/// 有邊界的地圖，邊界外一律不可通行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridMap {
    pub width: Coord,
    pub height: Coord,
    pub walls: BTreeSet<Cell>,
}

impl GridMap {
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }
}

impl Walkability for GridMap {
    fn is_walkable(&self, cell: Cell) -> bool {
        self.contains(cell) && !self.walls.contains(&cell)
    }
}

/// 從 ASCII 格式載入地圖
///
/// ASCII 格式：每行用空格分隔的符號
/// - `.` = 地板
/// - `#` = 牆壁
/// - 其他字串（`S`、`E` 等）= 標記位置（也作為地板）
/// - 相同的標記會全部收集成 Vec
///
/// 返回：(地圖, 標記映射)
///
/// 例如：
/// ```text
/// S . #
/// . # E
/// . . .
/// ```
pub fn load_from_ascii(ascii: &str) -> Result<(GridMap, HashMap<String, Vec<Cell>>), Error> {
    let func = "load_from_ascii";

    let lines: Vec<&str> = ascii
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(Error::MapParse {
            func,
            reason: "地圖為空".to_string(),
        });
    }

    // 推導寬度（第一行的符號數）
    let width = lines[0].split_whitespace().count();
    let mut walls = BTreeSet::new();
    let mut markers: HashMap<String, Vec<Cell>> = HashMap::new();

    for (y, line) in lines.iter().enumerate() {
        let symbols: Vec<&str> = line.split_whitespace().collect();
        if symbols.len() != width {
            return Err(Error::MapParse {
                func,
                reason: format!("第 {y} 行寬度 {} 與第一行 {width} 不符", symbols.len()),
            });
        }
        for (x, symbol) in symbols.into_iter().enumerate() {
            let cell = Cell::new(to_coord(func, x)?, to_coord(func, y)?);
            match symbol {
                FLOOR_SYMBOL => {}
                WALL_SYMBOL => {
                    walls.insert(cell);
                }
                marker => markers.entry(marker.to_string()).or_default().push(cell),
            }
        }
    }

    let map = GridMap {
        width: to_coord(func, width)?,
        height: to_coord(func, lines.len())?,
        walls,
    };
    Ok((map, markers))
}

fn to_coord(func: &'static str, value: usize) -> Result<Coord, Error> {
    value.try_into().map_err(|_| Error::MapParse {
        func,
        reason: format!("地圖尺寸過大: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_ascii() {
        let (map, markers) = load_from_ascii(
            r#"
S . #
. # E
E . .
            "#,
        )
        .unwrap();
        assert_eq!(map.width, 3);
        assert_eq!(map.height, 3);
        assert_eq!(
            map.walls,
            BTreeSet::from([Cell::new(2, 0), Cell::new(1, 1)])
        );
        assert_eq!(markers["S"], vec![Cell::new(0, 0)]);
        assert_eq!(markers["E"], vec![Cell::new(2, 1), Cell::new(0, 2)]);
        assert!(map.is_walkable(Cell::new(0, 0)));
        assert!(!map.is_walkable(Cell::new(1, 1)));
        assert!(!map.is_walkable(Cell::new(-1, 0)));
        assert!(!map.is_walkable(Cell::new(0, 3)));
    }

    #[test]
    fn test_load_from_ascii_invalid() {
        assert!(load_from_ascii("   \n  ").is_err());
        assert!(load_from_ascii(". .\n.").is_err());
    }
}
