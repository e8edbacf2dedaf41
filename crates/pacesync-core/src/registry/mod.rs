//! Delivery bookkeeping
//!
//! - `sent`: files broadcast at least once in the current watch session
//! - `clients`: identified devices and what each has received

pub mod clients;
pub mod sent;

pub use clients::{ClientRegistry, ClientSession};
pub use sent::SentRegistry;
