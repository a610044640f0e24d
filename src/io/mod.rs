/// CSV export of fleet listings.
pub mod export;
