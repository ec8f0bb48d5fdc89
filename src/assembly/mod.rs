/// Transaction assembly
///
/// - `draft`: `TxDraft` and its PSBT conversions
/// - `assembler`: composes selected inputs and encoded outputs
/// - `trade`: seller listing / buyer completion
pub mod assembler;
pub mod draft;
pub mod trade;

pub use assembler::{ChangeTarget, TransactionAssembler};
pub use draft::{InputSpec, OutputSpec, ParentTransactions, PrevoutData, TxDraft};
pub use trade::{TradeAssembler, TradeCompletion};
