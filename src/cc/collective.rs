//! Collective operation kinds.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum CollectiveOp {
    Allreduce,
    Allgather,
    Reducescatter,
    Alltoall,
}

impl CollectiveOp {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(Self::Allreduce);
        }
        let compact: String = normalized
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect();
        match compact.as_str() {
            "allreduce" => Ok(Self::Allreduce),
            "allgather" => Ok(Self::Allgather),
            "reducescatter" => Ok(Self::Reducescatter),
            "alltoall" => Ok(Self::Alltoall),
            _ => Err(format!("unknown collective op: {raw}")),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Allreduce => "all_reduce",
            Self::Allgather => "all_gather",
            Self::Reducescatter => "reduce_scatter",
            Self::Alltoall => "all_to_all",
        }
    }
}

impl TryFrom<String> for CollectiveOp {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<CollectiveOp> for &'static str {
    fn from(op: CollectiveOp) -> Self {
        op.name()
    }
}

impl std::fmt::Display for CollectiveOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
