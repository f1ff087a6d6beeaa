//! Database models split into domain-specific modules.

pub mod alert;
pub mod common;
pub mod device;
pub mod expense;
pub mod product;
pub mod session;
pub mod transaction;

pub use alert::*;
pub use common::*;
pub use device::*;
pub use expense::*;
pub use product::*;
pub use session::*;
pub use transaction::*;
