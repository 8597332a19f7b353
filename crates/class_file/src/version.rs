use std::fmt;

/// Class file major versions are offset by 44 from the Java release they target.
const JAVA_VERSION_OFFSET: u16 = 44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MajorVersion(pub u16);
impl MajorVersion {
    pub fn value(self) -> u16 {
        self.0
    }

    /// Java release number, e.g. 8 for major version 52. Saturates at 0 for values below 44.
    pub fn java_version(self) -> u16 {
        self.0.saturating_sub(JAVA_VERSION_OFFSET)
    }

    /// "JDK 1.x" for releases before 5, "Java SE x" from then on.
    pub fn label(self) -> String {
        match self.java_version() {
            v if v < 5 => format!("JDK 1.{}", v),
            v => format!("Java SE {}", v),
        }
    }
}
impl fmt::Display for MajorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
