use std::fmt;

/// Storage type of a column, independent of the backend dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Uint64,
    Text,
    Datetime,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub nullable: bool,
}

pub const PRIMARY_KEY: &str = "series_id";

pub const COLUMNS: [Column; 5] = [
    Column {
        name: PRIMARY_KEY,
        kind: ColumnType::Uint64,
        nullable: false,
    },
    Column {
        name: "title",
        kind: ColumnType::Text,
        nullable: true,
    },
    Column {
        name: "series_info",
        kind: ColumnType::Text,
        nullable: true,
    },
    Column {
        name: "release_date",
        kind: ColumnType::Datetime,
        nullable: true,
    },
    Column {
        name: "comment",
        kind: ColumnType::Text,
        nullable: true,
    },
];

/// One synthetic row, built per write task and dropped after submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    pub series_id: u64,
    pub title: String,
    pub series_info: String,
    /// Second of the minute (0..=59) at generation time, stored as a
    /// datetime in seconds since the epoch.
    pub release_date: u32,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePath {
    prefix: String,
    name: String,
}

impl TablePath {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.prefix.trim_end_matches('/');
        write!(f, "{}/{}", prefix, self.name)
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
