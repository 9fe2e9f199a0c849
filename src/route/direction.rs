//! Output-port directions of a (up to) 3-D torus router.

use serde::Serialize;

use crate::error::RoutingError;
use crate::topo::Sign;

/// X is the local dimension, Y runs east/west, Z north/south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    LocalWest,
    LocalEast,
    West,
    East,
    South,
    North,
    /// Eject at this node.
    Local,
}

impl Direction {
    /// Index order: LocalWest, LocalEast, West, East, South, North.
    pub fn from_index(index: i32) -> Result<Self, RoutingError> {
        match index {
            0 => Ok(Self::LocalWest),
            1 => Ok(Self::LocalEast),
            2 => Ok(Self::West),
            3 => Ok(Self::East),
            4 => Ok(Self::South),
            5 => Ok(Self::North),
            other => Err(RoutingError::UnknownDirection(other)),
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Self::LocalWest => Some(0),
            Self::LocalEast => Some(1),
            Self::West => Some(2),
            Self::East => Some(3),
            Self::South => Some(4),
            Self::North => Some(5),
            Self::Local => None,
        }
    }

    pub fn of(dim: usize, sign: Sign) -> Result<Self, RoutingError> {
        let index = dim as i32 * 2 + if sign == Sign::Positive { 1 } else { 0 };
        if dim > 2 {
            return Err(RoutingError::UnknownDirection(index));
        }
        Self::from_index(index)
    }

    pub fn dimension(self) -> Option<usize> {
        self.index().map(|i| i / 2)
    }

    pub fn sign(self) -> Option<Sign> {
        self.index()
            .map(|i| if i % 2 == 1 { Sign::Positive } else { Sign::Negative })
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::LocalWest => Self::LocalEast,
            Self::LocalEast => Self::LocalWest,
            Self::West => Self::East,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::North => Self::South,
            Self::Local => Self::Local,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Output port: direction plus virtual channel class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Port {
    pub direction: Direction,
    pub channel: usize,
}
