mod files;
mod health;

pub use files::{
    delete_file, download_file, list_files, rename_file, search_files, share_file, upload_file,
};
pub use health::health;
