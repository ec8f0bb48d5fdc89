/// Payload codec: framing, pseudo-multisig and address-output encodings
pub mod addresses;
pub mod framing;
pub mod multisig;
pub mod payload;

pub use addresses::{
    address_output_count, encode_as_addresses, prepare_address_payload, AddressingCollaborator,
    WitnessProgramAddressing,
};
pub use framing::{frame_payload, pad_to_block, unframe_payload};
pub use multisig::{
    decode_pseudo_multisig, multisig_chunk_count, placeholder_script, PseudoMultisigEncoder,
    PseudoMultisigScript,
};
pub use payload::{MsgpackJsonEncoder, PassThrough, PayloadEncoder, ZlibPayloadEncoder};
