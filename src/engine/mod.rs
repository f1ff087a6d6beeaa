pub mod checkout;
pub mod expiry;
pub mod sessions;
pub mod watchdog;

pub use checkout::{Cart, CheckoutError, CheckoutService};
pub use expiry::ExpiryMonitor;
pub use sessions::{SessionError, SessionService};
pub use watchdog::{InactivityWatchdog, ScreenGuard};
