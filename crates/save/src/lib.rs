//! Blueprint persistence: the binary file/wire codec, legacy text readers and
//! the directory-backed local store.

mod atomic_write;
pub mod blueprint_codec;
pub mod file_header;
pub mod local_store;
mod save_plugin;
pub mod save_types;
mod tmp_cleanup;


pub use atomic_write::{atomic_write, tmp_path_for};
pub use blueprint_codec::{decode_blueprint, decode_collection, encode_blueprint, encode_collection};
pub use local_store::{BlueprintStore, LoadCollision, LoadReport};
pub use save_plugin::{PlaceStoredBlueprint, SaveBlueprintEvent, StoreLoadSet, StorePlugin};
pub use tmp_cleanup::clean_stale_writes;
