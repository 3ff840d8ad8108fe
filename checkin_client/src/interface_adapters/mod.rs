// Interface adapters: HTTP backend client, wire protocol, storage and scanner.

pub mod clients;
pub mod protocol;
pub mod scanner;
pub mod storage;

pub use clients::ApiClient;
pub use scanner::LineScanner;
pub use storage::{FileStore, MemoryStore};
