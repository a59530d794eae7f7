//! Mode words, access classes and permission levels

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mask over the file type field of a mode word
pub const S_IFMT: u32 = 0o170000;
/// Socket
pub const S_IFSOCK: u32 = 0o140000;
/// Symbolic link
pub const S_IFLNK: u32 = 0o120000;
/// Regular file
pub const S_IFREG: u32 = 0o100000;
/// Block device
pub const S_IFBLK: u32 = 0o060000;
/// Directory
pub const S_IFDIR: u32 = 0o040000;
/// Character device
pub const S_IFCHR: u32 = 0o020000;
/// FIFO
pub const S_IFIFO: u32 = 0o010000;

/// Type of a filesystem object, decoded from the high bits of a mode word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Socket,
    Symlink,
    Regular,
    BlockDevice,
    Directory,
    CharDevice,
    Fifo,
    /// No recognizable type bits (including the zero mode of an unreachable path)
    Unknown,
}

/// Raw `st_mode` word: type field plus permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RawMode(pub u32);

impl RawMode {
    /// Mode of an object that could not be inspected
    pub const UNKNOWN: RawMode = RawMode(0);

    /// Build a mode word from a type constant and permission bits
    pub fn new(file_type: u32, permissions: u32) -> Self {
        RawMode((file_type & S_IFMT) | (permissions & 0o7777))
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// The 9 rwx bits for owner, group and others
    pub fn permissions(self) -> u32 {
        self.0 & 0o777
    }

    pub fn file_type(self) -> FileType {
        match self.0 & S_IFMT {
            S_IFSOCK => FileType::Socket,
            S_IFLNK => FileType::Symlink,
            S_IFREG => FileType::Regular,
            S_IFBLK => FileType::BlockDevice,
            S_IFDIR => FileType::Directory,
            S_IFCHR => FileType::CharDevice,
            S_IFIFO => FileType::Fifo,
            _ => FileType::Unknown,
        }
    }

    pub fn is_directory(self) -> bool {
        self.file_type() == FileType::Directory
    }

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for RawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.0)
    }
}

/// Selector over the owner/group/other permission classes
///
/// The low three bits pick classes; the fourth bit marks a relaxed match,
/// where any single requested bit is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessClass(u8);

impl AccessClass {
    pub const OTHERS: AccessClass = AccessClass(0b0001);
    pub const GROUP: AccessClass = AccessClass(0b0010);
    pub const OWNER: AccessClass = AccessClass(0b0100);
    /// Owner or group; what a process that owns or shares the group gets tested as
    pub const EITHER: AccessClass = AccessClass(0b0110);
    /// Owner and group together
    pub const BOTH: AccessClass = AccessClass(0b0110);
    pub const ALL: AccessClass = AccessClass(0b0111);
    /// Any class, relaxed match
    pub const SOMEONE: AccessClass = AccessClass(0b1111);

    /// High bit that switches a check to relaxed matching
    pub const RELAXED: u8 = 0b1000;

    /// Build a selector from raw bits; `None` above `0b1111`
    ///
    /// Zero is accepted so callers can express an empty selector; the
    /// matcher rejects it.
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits <= 0b1111).then_some(AccessClass(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_relaxed(self) -> bool {
        self.0 > Self::ALL.0
    }

    /// The selector without the relaxed flag
    pub fn classes(self) -> AccessClass {
        AccessClass(self.0 & Self::ALL.0)
    }

    /// Same classes with the relaxed flag set
    pub fn relaxed(self) -> AccessClass {
        AccessClass(self.0 | Self::RELAXED)
    }

    pub fn contains(self, other: AccessClass) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for AccessClass {
    type Output = AccessClass;

    fn bitor(self, rhs: Self) -> Self::Output {
        AccessClass(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes = self.classes();
        let mut names = Vec::new();
        if classes.contains(Self::OWNER) {
            names.push("owner");
        }
        if classes.contains(Self::GROUP) {
            names.push("group");
        }
        if classes.contains(Self::OTHERS) {
            names.push("others");
        }
        if names.is_empty() {
            names.push("none");
        }
        write!(f, "{}", names.join("|"))?;
        if self.is_relaxed() {
            write!(f, " (relaxed)")?;
        }
        Ok(())
    }
}

/// A single octal permission digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel(u8);

impl PermissionLevel {
    pub const EXECUTE: PermissionLevel = PermissionLevel(1);
    pub const WRITE: PermissionLevel = PermissionLevel(2);
    pub const READ: PermissionLevel = PermissionLevel(4);
    pub const READ_EXECUTE: PermissionLevel = PermissionLevel(5);
    pub const READ_WRITE: PermissionLevel = PermissionLevel(6);
    pub const ALL: PermissionLevel = PermissionLevel(7);

    /// Build a level from an octal digit; `None` above 7
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits <= 7).then_some(PermissionLevel(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: PermissionLevel) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.contains(Self::READ) { 'r' } else { '-' };
        let w = if self.contains(Self::WRITE) { 'w' } else { '-' };
        let x = if self.contains(Self::EXECUTE) { 'x' } else { '-' };
        write!(f, "{}{}{}", r, w, x)
    }
}
