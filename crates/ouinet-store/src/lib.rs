pub mod backed;
pub mod error;
pub mod for_each;
pub mod layout;
pub mod reader;
pub mod sigs;
pub mod store;
pub mod sweeper;
pub mod writer;

pub use backed::BackedStore;
pub use error::StoreError;
pub use for_each::for_each;
pub use reader::{read_hash_list, read_range, read_whole};
pub use sigs::{SigRecord, SIG_RECORD_LEN};
pub use store::{LocalStore, Store};
pub use sweeper::sweep_stale_tmp_dirs;
pub use writer::StoreWriter;
