use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// `[file]#fragment`. A missing file part means "this document".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Uri {
    pub path: Option<PathBuf>,
    pub fragment: String,
}

impl Uri {
    pub fn parse(uri: &str) -> Self {
        let uri = uri.trim();
        let (path, fragment) = uri.split_once('#').unwrap_or((uri, ""));
        let path = path.strip_prefix("file://").unwrap_or(path);

        Self {
            path: (!path.is_empty()).then(|| PathBuf::from(path)),
            fragment: fragment.to_string(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.path.is_some()
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}", path.display())?;
        }
        write!(f, "#{}", self.fragment)
    }
}
