//! Built-in store finder platforms.
//!
//! Each platform recognizes one embeddable store locator widget and knows
//! which attributes a generated spider for it needs.

pub mod html;
pub mod stockist;
pub mod storepoint;
pub mod storerocket;
pub mod where2getit;
pub mod woosmap;

pub use stockist::Stockist;
pub use storepoint::Storepoint;
pub use storerocket::StoreRocket;
pub use where2getit::Where2GetIt;
pub use woosmap::Woosmap;
