use crate::*;
use std::collections::HashSet;

/// 可通行判定介面，取代引擎端的射線檢測
pub trait Walkability {
    fn is_walkable(&self, cell: Cell) -> bool;
}

impl<F> Walkability for F
where
    F: Fn(Cell) -> bool,
{
    fn is_walkable(&self, cell: Cell) -> bool {
        self(cell)
    }
}

/// 無限網格上只有少數障礙格
#[derive(Debug, Clone, Default)]
pub struct BlockedCells(pub HashSet<Cell>);

impl Walkability for BlockedCells {
    fn is_walkable(&self, cell: Cell) -> bool {
        !self.0.contains(&cell)
    }
}

impl FromIterator<Cell> for BlockedCells {
    fn from_iter<T: IntoIterator<Item = Cell>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 所有格子皆可通行
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGround;

impl Walkability for OpenGround {
    fn is_walkable(&self, _cell: Cell) -> bool {
        true
    }
}
