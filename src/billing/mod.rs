//! Rolling billing-cycle aggregation.
//!
//! Everything in `cycle` and `bill` is pure: callers hand in a snapshot of a
//! member's attendance and leave rows plus the current local time and get
//! the same answer for the same input. `anchor_cache` is the only stateful
//! piece and lives on the HTTP side of that line.

pub mod anchor_cache;
pub mod bill;
pub mod cycle;

pub use bill::{approved_leave_count, compute_estimated_bill};
pub use cycle::{BillingCycle, compute_current_cycle_attendance};
