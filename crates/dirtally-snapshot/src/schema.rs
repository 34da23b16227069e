//! Snapshot document wire schema.
//!
//! Field order in each struct is the field order on the wire.

use serde::{Deserialize, Serialize};

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

/// A persisted aggregate: root, run statistics and three sorted sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Absolute path of the scanned root.
    pub root: String,
    pub stats: SnapshotStats,
    /// Directories ordered by absolute path.
    #[serde(default)]
    pub dirs: Vec<DirRecord>,
    /// Owners ordered by name.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Groups ordered by name.
    #[serde(default)]
    pub groups: Vec<GroupRecord>,
}

/// Run statistics. Diagnostic only; never used for aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
    /// RFC 3339 start timestamp.
    pub started_at: String,
    /// RFC 3339 end timestamp.
    pub ended_at: String,
    #[serde(default)]
    pub runtime_seconds: f64,
    /// Human readable runtime.
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub dirs_scanned: i64,
    #[serde(default)]
    pub files_scanned: i64,
    /// Version of the program that wrote the snapshot.
    #[serde(default)]
    pub version: String,
    /// Resident set size at completion.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub mem_alloc_bytes: u64,
    /// Peak resident set size.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub peak_alloc_bytes: u64,
}

/// One directory with its recursive totals and ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirRecord {
    /// Absolute path.
    pub path: String,
    /// Path relative to the root; `"."` for the root itself.
    pub rel: String,
    pub size: i64,
    pub files: i64,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub uid: u32,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub gid: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
}

/// Totals for one owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub size: i64,
    pub files: i64,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub uid: u32,
}

/// Totals for one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub name: String,
    pub size: i64,
    pub files: i64,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub gid: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_empty_fields_omitted() {
        let dir = DirRecord {
            path: "/r".into(),
            rel: ".".into(),
            size: 10,
            files: 1,
            ..DirRecord::default()
        };
        let json = serde_json::to_string(&dir).unwrap();
        assert_eq!(json, r#"{"path":"/r","rel":".","size":10,"files":1}"#);

        let user = UserRecord {
            name: "u".into(),
            size: 1,
            files: 1,
            uid: 1000,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(json, r#"{"name":"u","size":1,"files":1,"uid":1000}"#);
    }

    #[test]
    fn test_dir_field_order() {
        let dir = DirRecord {
            path: "/r/a".into(),
            rel: "a".into(),
            size: 5,
            files: 2,
            uid: 1,
            gid: 2,
            user: "alice".into(),
            group: "staff".into(),
        };
        let json = serde_json::to_string(&dir).unwrap();
        assert_eq!(
            json,
            r#"{"path":"/r/a","rel":"a","size":5,"files":2,"uid":1,"gid":2,"user":"alice","group":"staff"}"#
        );
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = serde_json::from_str::<SnapshotDocument>(r#"{"stats":{"started_at":"s","ended_at":"e"}}"#)
            .unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn test_unknown_stats_fields_ignored() {
        let doc: SnapshotDocument = serde_json::from_str(
            r#"{"root":"r","stats":{"started_at":"s","ended_at":"e","num_gc":3,"gc_cpu_fraction":0.1}}"#,
        )
        .unwrap();
        assert_eq!(doc.root, "r");
        assert!(doc.dirs.is_empty());
    }
}
