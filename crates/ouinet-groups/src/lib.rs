pub mod backed;
pub mod digest;
pub mod error;
pub mod trusted;
pub mod untrusted;

pub use backed::BackedGroups;
pub use error::GroupsError;
pub use trusted::TrustedGroups;
pub use untrusted::UntrustedGroups;
