//! Capability-based file helpers for feeds and database paths.

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8};
use std::io;

/// Open a feed file for reading using ambient authority.
pub fn open_feed_file(path: &Utf8Path) -> io::Result<fs_utf8::File> {
    fs_utf8::File::open_ambient(path, ambient_authority())
}

/// Return whether `path` exists and is a regular file.
pub fn is_regular_file(path: &Utf8Path) -> io::Result<bool> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| io::Error::other("path should include a file name"))?;
    let dir = fs_utf8::Dir::open_ambient_dir(parent, ambient_authority())?;
    dir.metadata(name).map(|meta| meta.is_file())
}

/// Create the directory that will hold the database file, if missing.
pub fn ensure_parent_dir(path: &Utf8Path) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_str().is_empty() || parent.is_dir() {
        return Ok(());
    }
    let (base, missing) = split_at_existing(parent)?;
    fs_utf8::Dir::open_ambient_dir(base, ambient_authority())?.create_dir_all(missing)
}

/// Split `dir` into its deepest existing ancestor and the components below
/// it that still need creating.
fn split_at_existing(dir: &Utf8Path) -> io::Result<(&Utf8Path, &Utf8Path)> {
    let existing = dir
        .ancestors()
        .skip(1)
        .find(|ancestor| ancestor.as_str().is_empty() || ancestor.is_dir())
        .ok_or_else(|| io::Error::other(format!("no existing ancestor of {dir}")))?;
    let missing = dir
        .strip_prefix(existing)
        .map_err(|_| io::Error::other(format!("{existing} is not a prefix of {dir}")))?;
    if existing.as_str().is_empty() {
        Ok((Utf8Path::new("."), missing))
    } else {
        Ok((existing, missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use std::io::Read;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir should be UTF-8")
    }

    #[rstest]
    fn ensure_parent_dir_creates_nested_directories() {
        let temp = TempDir::new().expect("create temp dir");
        let target = utf8(&temp).join("nested/deeper/clickbus.sqlite");

        ensure_parent_dir(&target).expect("create parents");

        assert!(target.parent().expect("parent").is_dir());
    }

    #[rstest]
    fn ensure_parent_dir_accepts_parent_components() {
        let temp = TempDir::new().expect("create temp dir");
        let root = utf8(&temp);
        std::fs::create_dir(root.join("work")).expect("create working directory");
        let sibling = root.join("work/../data/clickbus.sqlite");
        let existing = root.join("work/../clickbus.sqlite");

        ensure_parent_dir(&existing).expect("existing parent");
        ensure_parent_dir(&sibling).expect("create sibling directory");

        assert!(root.join("data").is_dir());
    }

    #[rstest]
    #[case("clickbus.sqlite")]
    #[case("../clickbus.sqlite")]
    #[case("/")]
    fn ensure_parent_dir_ignores_trivial_parents(#[case] path: &str) {
        ensure_parent_dir(Utf8Path::new(path)).expect("no-op");
    }

    #[rstest]
    fn is_regular_file_distinguishes_files_and_directories() {
        let temp = TempDir::new().expect("create temp dir");
        let root = utf8(&temp);
        let file = root.join("orders.csv");
        std::fs::write(&file, "id_cliente\n").expect("write feed");
        std::fs::create_dir(root.join("archive")).expect("create subdirectory");

        assert!(is_regular_file(&file).expect("stat file"));
        assert!(!is_regular_file(&root.join("archive")).expect("stat directory"));
        assert!(is_regular_file(&root.join("missing.csv")).is_err());
    }

    #[rstest]
    fn open_feed_file_reads_contents() {
        let temp = TempDir::new().expect("create temp dir");
        let file = utf8(&temp).join("municipios.csv");
        std::fs::write(&file, "COD,NOME,UF\n").expect("write feed");

        let mut contents = String::new();
        open_feed_file(&file)
            .expect("open feed")
            .read_to_string(&mut contents)
            .expect("read feed");

        assert_eq!(contents, "COD,NOME,UF\n");
    }
}
