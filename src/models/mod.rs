pub mod allocation;
pub mod pnl;
pub mod position;
pub mod trade;

pub use allocation::{AllocationDeviation, AllocationTarget, RebalanceAction, TokenAllocation};
pub use pnl::{PortfolioPnl, TokenPnl};
pub use position::PortfolioPosition;
pub use trade::TradeRecord;

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
    Swap,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
            Side::Swap => "SWAP",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
