//! Reading a `BDMV/` tree into analysis inputs.
//!
//! The analysis core is pure over byte buffers; this module is the one
//! place that touches the file system. Stream files are never read
//! here: playlists and clip information are all the structure analysis
//! needs, and menu streams are attached explicitly by callers that opt
//! into the IG scan.

use crate::analysis::DiscInput;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

/// Reads the metadata files of a disc backup into a [`DiscInput`].
///
/// `path` may point at the backup root (the directory containing
/// `BDMV/`) or at the `BDMV/` directory itself. Missing pieces are
/// tolerated: the analysis reports what is absent through its warnings.
///
/// [`DiscInput`]: ../analysis/struct.DiscInput.html
pub fn load_disc(path: &Path) -> io::Result<DiscInput> {
    let bdmv = if path.join("BDMV").is_dir() {
        path.join("BDMV")
    } else {
        path.to_path_buf()
    };

    let mut input = DiscInput::new(path.display().to_string());

    for (name, data) in files_with_extension(&bdmv.join("PLAYLIST"), "mpls")? {
        input.add_playlist(name, data);
    }
    for (name, data) in files_with_extension(&bdmv.join("CLIPINF"), "clpi")? {
        input.add_clip_info(name, data);
    }
    input.index = read_optional(&bdmv.join("index.bdmv"))?;
    input.movie_object = read_optional(&bdmv.join("MovieObject.bdmv"))?;

    Ok(input)
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    if path.is_file() {
        fs::read(path).map(Some)
    } else {
        Ok(None)
    }
}

fn files_with_extension(dir: &Path, extension: &str) -> io::Result<Vec<(String, Vec<u8>)>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(OsStr::to_str)
            .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if !matches || !path.is_file() {
            continue;
        }
        let name = match path.file_name().and_then(OsStr::to_str) {
            Some(name) => name.to_owned(),
            None => continue,
        };
        out.push((name, fs::read(&path)?));
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}
