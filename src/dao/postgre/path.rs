use std::{fs, io, path::PathBuf};

/// Location of a cache-store migration shipped with the crate.
pub fn get_path(file: &str) -> PathBuf {
    let mut buf = PathBuf::new();

    for chunk in [env!("CARGO_MANIFEST_DIR"), "migration", "postgresql", file]
    {
        buf.push(chunk);
    }

    buf
}

pub fn read_migration(file: &str) -> io::Result<String> {
    fs::read_to_string(get_path(file))
}
