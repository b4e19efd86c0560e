//! BEP5 bencoding codec, node ids, and DHT write-tokens. Wire format of the
//! BEP5 DHT transport the cache's announcer and lookup cache speak to.

pub mod mutable_data;
pub mod node_id;
pub mod token;
pub mod value;

pub use mutable_data::signature_buffer;
pub use node_id::NodeId;
pub use token::TokenSecret;
pub use value::{decode, encode, BValue, BencodeError};
