//! Non-uniform (skewed) traffic distribution table.
//!
//! One row per line, optional surrounding brackets, comma separated
//! unsigned integers. Row `k - 1` is selected by `non_uniform = k`; the
//! column is picked by `node_id mod 8`. A cell scales a node's data by
//! `cell / 8192`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::topo::NodeId;

pub const DISTRIBUTION_SCALE: u64 = 8192;
pub const DISTRIBUTION_COLUMNS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionTable {
    rows: Vec<Vec<u64>>,
}

impl DistributionTable {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        let err = |msg: String| ConfigError::Distribution {
            path: PathBuf::from(path),
            msg,
        };
        let mut rows = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line = line.strip_prefix('[').unwrap_or(line);
            let line = line.strip_suffix(']').unwrap_or(line);
            let row = line
                .split(',')
                .map(|cell| {
                    cell.trim().parse::<u64>().map_err(|e| {
                        err(format!("line {}: cannot parse {:?}: {e}", lineno + 1, cell.trim()))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if row.len() < DISTRIBUTION_COLUMNS {
                return Err(err(format!(
                    "line {}: expected at least {DISTRIBUTION_COLUMNS} columns, got {}",
                    lineno + 1,
                    row.len()
                )));
            }
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, col: usize) -> Result<u64, ConfigError> {
        let r = self
            .rows
            .get(row)
            .ok_or(ConfigError::DistributionRow { row })?;
        r.get(col)
            .copied()
            .ok_or(ConfigError::DistributionColumn { row, col })
    }

    /// Skewed data size of `node` for `non_uniform = flag` (flag >= 1).
    pub fn skew(&self, flag: usize, node: NodeId, data: u64) -> Result<u64, ConfigError> {
        let row = flag
            .checked_sub(1)
            .ok_or(ConfigError::DistributionRow { row: 0 })?;
        let cell = self.value(row, node.0 % DISTRIBUTION_COLUMNS)?;
        Ok((u128::from(cell) * u128::from(data) / u128::from(DISTRIBUTION_SCALE)) as u64)
    }
}
