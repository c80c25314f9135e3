pub mod cache;
pub mod ranges;
pub mod registry;
pub mod resolver;

pub use cache::{CacheEntryStatus, PriceCache};
pub use ranges::{PriceRange, PriceRanges};
pub use registry::{MarketListing, MarketRegistry, TokenSupport};
pub use resolver::{PriceError, PriceResolver};
