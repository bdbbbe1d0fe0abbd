use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a remote item holds, derived from its type tag and name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Folder,
    Pdf,
    Epub,
    /// The cloud's own notebook format
    Native,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Folder => "folder",
            FileKind::Pdf => "pdf",
            FileKind::Epub => "epub",
            FileKind::Native => "native",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "folder" => Ok(FileKind::Folder),
            "pdf" => Ok(FileKind::Pdf),
            "epub" => Ok(FileKind::Epub),
            "native" => Ok(FileKind::Native),
            _ => Err(format!(
                "Invalid file kind '{}'. Valid options: folder, pdf, epub, native",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_display() {
        assert_eq!(format!("{}", FileKind::Folder), "folder");
        assert_eq!(format!("{}", FileKind::Pdf), "pdf");
        assert_eq!(format!("{}", FileKind::Epub), "epub");
        assert_eq!(format!("{}", FileKind::Native), "native");
    }

    #[test]
    fn test_file_kind_from_str() {
        assert_eq!(FileKind::from_str("folder").unwrap(), FileKind::Folder);
        assert_eq!(FileKind::from_str("PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_str("native").unwrap(), FileKind::Native);
        assert!(FileKind::from_str("rm").is_err());
    }

    #[test]
    fn test_file_kind_json() {
        let json = serde_json::to_string(&FileKind::Epub).unwrap();
        assert_eq!(json, "\"epub\"");
    }
}
