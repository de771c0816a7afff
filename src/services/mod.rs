pub mod assignment;
pub mod ledger;
pub mod notify;

pub use assignment::AssignmentEngine;
pub use ledger::PaymentLedger;
pub use notify::{DbNotifier, NoopNotifier, TaskNotifier};
