pub mod reject;
pub mod strategies;

pub use reject::{reject, Context, RejectError};
