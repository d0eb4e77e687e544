use crate::*;
use strum::IntoEnumIterator;

/// 掩體提示的物件池大小，超過的提示直接捨棄
pub const COVER_POOL_SIZE: usize = 16;

/// 單一掩體提示：某格朝某方向有掩體
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverIndicator {
    pub cell: Cell,
    pub direction: Direction,
    /// 依距離淡出，中心為 1
    pub alpha: f32,
}

/// 探測中心附近的掩體
///
/// 掃描 `[-range, range)` 的方形區域，對每個可通行格的四個正向檢查鄰格是否為掩體。
pub fn cover_indicators(
    center: Cell,
    range: Coord,
    walkability: &impl Walkability,
    is_cover: impl Fn(Cell) -> bool,
) -> Vec<CoverIndicator> {
    let mut indicators = Vec::new();
    let fade = (range as f32 - 0.5) * (range as f32 - 0.5);

    for x in -range..range {
        for y in -range..range {
            let cell = center.offset(x, y);
            if !walkability.is_walkable(cell) {
                continue;
            }
            for direction in Direction::iter() {
                if !is_cover(direction.step(cell)) {
                    continue;
                }
                if indicators.len() >= COVER_POOL_SIZE {
                    log::debug!("cover_indicators: 超過物件池大小 {COVER_POOL_SIZE}");
                    return indicators;
                }
                let alpha = if fade > 0.0 {
                    (1.0 - (x * x + y * y) as f32 / fade).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                indicators.push(CoverIndicator {
                    cell,
                    direction,
                    alpha,
                });
            }
        }
    }
    indicators
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_indicators() {
        let (map, markers) = load_from_ascii(
            r#"
. . . .
. # S .
. . . .
. . . .
            "#,
        )
        .unwrap();
        let center = markers["S"][0];
        let indicators = cover_indicators(center, 1, &map, |cell| map.walls.contains(&cell));
        // 範圍 [-1, 1) 只掃到 (1,0) (2,0) (1,1) (2,1)，(1,1) 是牆本身
        assert_eq!(
            indicators
                .iter()
                .map(|i| (i.cell, i.direction))
                .collect::<Vec<_>>(),
            vec![
                (Cell::new(1, 0), Direction::Up),
                (Cell::new(2, 1), Direction::Left),
            ]
        );
        let at_center = indicators.iter().find(|i| i.cell == center).unwrap();
        assert_eq!(at_center.alpha, 1.0);
    }

    #[test]
    fn test_cover_pool_size() {
        // 到處都是掩體也不超過物件池
        let indicators = cover_indicators(Cell::default(), 5, &OpenGround, |_| true);
        assert_eq!(indicators.len(), COVER_POOL_SIZE);
    }
}
