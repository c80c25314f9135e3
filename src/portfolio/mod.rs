pub mod allocation;
pub mod pnl;
pub mod simulator;

pub use allocation::{compare_allocations, AllocationError, AllocationPlanner};
pub use pnl::{PnlCalculator, PnlTracker};
pub use simulator::{TradeError, TradeReceipt, TradeSimulator};
