pub use crate::chain::*;
