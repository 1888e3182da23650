pub mod service;

pub use service::{is_valid_email, Directory, DirectoryStats, NewUser};
