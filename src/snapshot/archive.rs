//! Source snapshot archive creation.
//!
//! Members are collected first, then written into a temporary file in the project root
//! that is renamed over the final name once the bzip2 stream is complete.

use super::policy::{ExclusionPolicy, PARTIAL_ARCHIVE_PREFIX, Verdict};
use crate::error::{CleanBuildError, Result};
use bzip2::Compression;
use bzip2::write::BzEncoder;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tar::{Builder as TarBuilder, EntryType, Header};
use walkdir::WalkDir;

/// Name GNU tar gives the record carrying an over-long member name
const LONG_NAME_RECORD: &[u8] = b"././@LongLink";

/// A finished snapshot archive on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotArchive {
    /// Final archive path, at the project root
    pub path: PathBuf,
    /// Member names in archive order (`.`, `./main.c`, ...)
    pub entries: Vec<String>,
}

impl SnapshotArchive {
    /// File name of the archive
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Whether the archive holds a member with this exact name
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    Directory,
    Symlink,
    File,
}

#[derive(Debug)]
struct Member {
    path: PathBuf,
    name: String,
    kind: MemberKind,
}

/// Pack every path of `project_root` the policy includes into `policy.archive_name()`.
///
/// Any unreadable path aborts the whole operation; the temporary file is removed and
/// no archive is committed.
pub fn package(project_root: &Path, policy: &ExclusionPolicy) -> Result<SnapshotArchive> {
    let members = collect_members(project_root, policy)?;
    write_archive(project_root, policy.archive_name(), members)
}

fn write_archive(
    project_root: &Path,
    archive_name: &str,
    members: Vec<Member>,
) -> Result<SnapshotArchive> {
    let final_path = project_root.join(archive_name);

    let mut partial = tempfile::Builder::new()
        .prefix(PARTIAL_ARCHIVE_PREFIX)
        .suffix(".partial")
        .tempfile_in(project_root)
        .map_err(|source| packaging_error(project_root, source))?;
    let partial_path = partial.path().to_path_buf();

    {
        let encoder = BzEncoder::new(BufWriter::new(partial.as_file_mut()), Compression::best());
        let mut builder = TarBuilder::new(encoder);

        for member in &members {
            append_member(&mut builder, member)
                .map_err(|source| packaging_error(&member.path, source))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|source| packaging_error(&partial_path, source))?;
        let mut writer = encoder
            .finish()
            .map_err(|source| packaging_error(&partial_path, source))?;
        writer
            .flush()
            .map_err(|source| packaging_error(&partial_path, source))?;
    }

    partial
        .as_file()
        .sync_all()
        .map_err(|source| packaging_error(&partial_path, source))?;
    partial
        .persist(&final_path)
        .map_err(|e| packaging_error(&final_path, e.error))?;

    log::debug!(
        "Wrote {} with {} member(s)",
        final_path.display(),
        members.len()
    );

    Ok(SnapshotArchive {
        path: final_path,
        entries: members.into_iter().map(|m| m.name).collect(),
    })
}

fn packaging_error(path: &Path, source: io::Error) -> CleanBuildError {
    CleanBuildError::Packaging {
        path: path.to_path_buf(),
        source,
    }
}

/// Walk the tree in sorted order, pruning excluded directories.
fn collect_members(root: &Path, policy: &ExclusionPolicy) -> Result<Vec<Member>> {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            policy.classify(relative) == Verdict::Include
        });

    let mut members = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            packaging_error(&path, io::Error::from(e))
        })?;

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let file_type = entry.file_type();
        let kind = if file_type.is_symlink() {
            MemberKind::Symlink
        } else if file_type.is_dir() {
            MemberKind::Directory
        } else if file_type.is_file() {
            MemberKind::File
        } else {
            log::debug!("Skipping special file: {}", entry.path().display());
            continue;
        };

        members.push(Member {
            path: entry.path().to_path_buf(),
            name: member_name(relative),
            kind,
        });
    }

    Ok(members)
}

/// `./`-prefixed, `/`-separated member name; the root itself is `.`.
fn member_name(relative: &Path) -> String {
    if relative.as_os_str().is_empty() {
        return ".".to_string();
    }
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("./{}", joined)
}

fn append_member<W: Write>(builder: &mut TarBuilder<W>, member: &Member) -> io::Result<()> {
    let metadata = fs::symlink_metadata(&member.path)?;

    let mut header = Header::new_gnu();
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        header.set_mode(metadata.permissions().mode() & 0o7777);
    }

    match member.kind {
        MemberKind::Directory => {
            #[cfg(not(unix))]
            header.set_mode(0o755);
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            set_member_name(builder, &mut header, &member.name)?;
            header.set_cksum();
            builder.append(&header, io::empty())
        }
        MemberKind::Symlink => {
            #[cfg(not(unix))]
            header.set_mode(0o777);
            let target = fs::read_link(&member.path)?;
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            set_link_target(builder, &mut header, &target)?;
            set_member_name(builder, &mut header, &member.name)?;
            header.set_cksum();
            builder.append(&header, io::empty())
        }
        MemberKind::File => {
            #[cfg(not(unix))]
            header.set_mode(0o644);
            let file = File::open(&member.path)?;
            header.set_entry_type(EntryType::Regular);
            header.set_size(metadata.len());
            set_member_name(builder, &mut header, &member.name)?;
            header.set_cksum();
            builder.append(&header, file.take(metadata.len()))
        }
    }
}

/// Write the member name verbatim into the header.
///
/// `Header::set_path` strips the leading `./`, which the snapshot keeps. Names that do
/// not fit the 100-byte field are preceded by a GNU long-name record.
fn set_member_name<W: Write>(
    builder: &mut TarBuilder<W>,
    header: &mut Header,
    name: &str,
) -> io::Result<()> {
    let bytes = name.as_bytes();
    let field = &mut header.as_old_mut().name;
    if bytes.len() > field.len() {
        append_long_record(builder, EntryType::GNULongName, bytes)?;
    }
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
    Ok(())
}

/// Write a symlink target into the header, with a GNU long-link record when it does
/// not fit the 100-byte link field.
fn set_link_target<W: Write>(
    builder: &mut TarBuilder<W>,
    header: &mut Header,
    target: &Path,
) -> io::Result<()> {
    let bytes = path_bytes(target);
    let field = &mut header.as_old_mut().linkname;
    if bytes.len() > field.len() {
        append_long_record(builder, EntryType::GNULongLink, &bytes)?;
    }
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
    Ok(())
}

/// `././@LongLink` record carrying a NUL-terminated name for the next header.
fn append_long_record<W: Write>(
    builder: &mut TarBuilder<W>,
    kind: EntryType,
    bytes: &[u8],
) -> io::Result<()> {
    let mut long = Header::new_gnu();
    long.as_old_mut().name[..LONG_NAME_RECORD.len()].copy_from_slice(LONG_NAME_RECORD);
    long.set_entry_type(kind);
    long.set_mode(0o644);
    long.set_uid(0);
    long.set_gid(0);
    long.set_mtime(0);
    long.set_size(bytes.len() as u64 + 1);
    long.set_cksum();
    builder.append(&long, bytes.chain(&[0u8][..]))
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().replace('\\', "/").into_bytes()
}
