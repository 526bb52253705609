use serde::{Deserialize, Serialize};

/// A master-data entry as it appears in a selector: stable id, short code
/// and display title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectableOption {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    pub title: String,
}

impl SelectableOption {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: None,
            title: title.into(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Capability shared by every entity shown by name on a voucher: selector
/// entries as well as the discount and tax lines of the ledger.
pub trait Selectable {
    fn option_id(&self) -> &str;

    fn option_title(&self) -> &str;

    fn option_code(&self) -> Option<&str> {
        None
    }

    /// "code - title" when a code exists, the title otherwise
    fn label(&self) -> String {
        match self.option_code() {
            Some(code) if !code.is_empty() => format!("{} - {}", code, self.option_title()),
            _ => self.option_title().to_string(),
        }
    }

    fn to_option(&self) -> SelectableOption {
        SelectableOption {
            id: self.option_id().to_string(),
            code: self.option_code().map(str::to_string),
            title: self.option_title().to_string(),
        }
    }
}

impl Selectable for SelectableOption {
    fn option_id(&self) -> &str {
        &self.id
    }

    fn option_title(&self) -> &str {
        &self.title
    }

    fn option_code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}
