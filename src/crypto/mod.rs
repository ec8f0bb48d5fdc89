/// Cryptographic primitives for the payload codec
///
/// `arc4` provides the self-inverse keystream transform keyed by a txid;
/// `pubkey` provides the curve-point validation the pseudo-multisig encoder
/// retries against.
pub mod arc4;
pub mod pubkey;
