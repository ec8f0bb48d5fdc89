/// Coin selection and fee estimation
///
/// `fee` holds the size and sigops arithmetic; `selector` runs the
/// largest-first accumulation with the bounded sigops-rate convergence loop.
pub mod fee;
pub mod selector;

pub use fee::{fee_for_vsize, sigops_rate, SizedOutput};
pub use selector::{CoinSelector, SelectionOptions, SelectionResult};
