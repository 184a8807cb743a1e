//! Background maintenance services.

mod pending_purchase_reaper;

pub use pending_purchase_reaper::{PendingPurchaseReaper, ReaperConfig};
