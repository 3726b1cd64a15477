//! File-group and file-slice value types.
//!
//! A *file group* is the unit of data partitioning, identified by its
//! partition path plus a file id; a *file slice* is one versioned view of a
//! file group's data as of a base commit. Clustering plans are built from
//! slices and resolve back to file-group identities, so these types are pure
//! values with no storage I/O.

use std::fmt;

/// Globally unique identity of a file group within a table.
///
/// Immutable; used as a map key when enumerating file groups owned by
/// pending clustering operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileGroupId {
    /// Relative partition path the file group lives under.
    pub partition_path: String,
    /// Unique id of the file group within its partition.
    pub file_id: String,
}

impl FileGroupId {
    /// Create a new file-group identity.
    pub fn new(partition_path: impl Into<String>, file_id: impl Into<String>) -> Self {
        FileGroupId {
            partition_path: partition_path.into(),
            file_id: file_id.into(),
        }
    }
}

impl fmt::Display for FileGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_path, self.file_id)
    }
}

/// Reference to the base file backing a file slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaseFile {
    /// File name of the base file (no directory components).
    pub file_name: String,
}

impl BaseFile {
    /// Create a base-file reference from a file name.
    pub fn new(file_name: impl Into<String>) -> Self {
        BaseFile {
            file_name: file_name.into(),
        }
    }
}

/// One versioned view of a file group's data as of a given commit.
///
/// A slice belongs to exactly one file group; the base file is optional
/// because a slice may consist only of yet-unmerged deltas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSlice {
    /// Identity of the file group this slice belongs to.
    pub file_group_id: FileGroupId,
    /// Timestamp token of the commit this slice is based on.
    pub base_instant_time: String,
    /// Base file backing the slice, when one exists.
    pub base_file: Option<BaseFile>,
}

impl FileSlice {
    /// Create a slice with no base file.
    pub fn new(file_group_id: FileGroupId, base_instant_time: impl Into<String>) -> Self {
        FileSlice {
            file_group_id,
            base_instant_time: base_instant_time.into(),
            base_file: None,
        }
    }

    /// Attach a base file to the slice.
    pub fn with_base_file(mut self, base_file: BaseFile) -> Self {
        self.base_file = Some(base_file);
        self
    }
}

/// Build the canonical base-file name for a file group version.
///
/// Layout: `<fileId>_<writeToken>_<instantTime>.parquet`. The write token
/// disambiguates retried write attempts within one commit.
pub fn base_file_name(file_id: &str, write_token: &str, instant_time: &str) -> String {
    format!("{file_id}_{write_token}_{instant_time}.parquet")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_group_id_equality_and_display() {
        let a = FileGroupId::new("partition1", "file-a");
        let b = FileGroupId::new("partition1", "file-a");
        let c = FileGroupId::new("partition2", "file-a");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "partition1/file-a");
    }

    #[test]
    fn file_group_id_usable_as_map_key() {
        let mut map = std::collections::HashMap::new();
        map.insert(FileGroupId::new("p", "f1"), 1);
        map.insert(FileGroupId::new("p", "f2"), 2);

        assert_eq!(map.get(&FileGroupId::new("p", "f1")), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn base_file_name_layout() {
        assert_eq!(
            base_file_name("file-a", "1-0-1", "20250101"),
            "file-a_1-0-1_20250101.parquet"
        );
    }

    #[test]
    fn slice_builder_attaches_base_file() {
        let slice = FileSlice::new(FileGroupId::new("p", "f"), "0")
            .with_base_file(BaseFile::new(base_file_name("f", "1-0-1", "0")));

        assert_eq!(slice.base_instant_time, "0");
        assert_eq!(
            slice.base_file.as_ref().map(|b| b.file_name.as_str()),
            Some("f_1-0-1_0.parquet")
        );
    }
}
