pub mod error;
pub mod head;
pub mod keep_signed;
pub mod part;
pub mod sign;
pub mod verify;

pub use error::SignError;
pub use head::ResponseHead;
pub use keep_signed::keep_signed;
pub use part::{ChunkExts, Part};
pub use sign::{sign_response, InjectionMeta, MANDATORY_SIG0_HEADERS, MANDATORY_SIG1_HEADERS, MAX_BLOCK_SIZE};
pub use verify::{verify_response, Verifier};
