use std::{fmt, str::FromStr};

use serde_derive::{Deserialize, Serialize};
use url::form_urlencoded;

const SUPPORT_NOTICE: &str = "Please retry the print, and if the issue persists, contact Technical Support via <b>www.photocentricgroup.com/support/</b>";

/// The pages of the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Idle,
    PrintDialogue,
    Error,
}

impl Page {
    pub fn document(self) -> &'static str {
        match self {
            Page::Idle => "index.html",
            Page::PrintDialogue => "printdialogue.html",
            Page::Error => "error.html",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Page::Idle => "idle",
            Page::PrintDialogue => "printdialogue",
            Page::Error => "error",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Page {
    type Err = String;

    /// Accepts the page name or its document, e.g. `printdialogue` or `printdialogue.html`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_end_matches(".html").to_ascii_lowercase();
        match name.as_str() {
            "idle" | "index" => Ok(Page::Idle),
            "printdialogue" => Ok(Page::PrintDialogue),
            "error" => Ok(Page::Error),
            _ => Err(format!("unknown page '{}'", s.trim())),
        }
    }
}

/// A request for the shell to show `page` with the given query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub page: Page,
    pub params: Vec<(String, String)>,
}

impl NavigationRequest {
    pub fn print_dialogue() -> Self {
        Self { page: Page::PrintDialogue, params: Vec::new() }
    }

    pub fn print_failed(job_name: &str, job_id: &str) -> Self {
        Self::error_page(&[
            ("errorname", "Print Failed".to_owned()),
            ("errordetails", format!("The print {} [Job ID: {}] has unexpectedly failed.", job_name, job_id)),
            ("errordetails2", SUPPORT_NOTICE.to_owned()),
        ])
    }

    pub fn print_cancelled(job_name: &str) -> Self {
        Self::error_page(&[
            ("type", "info".to_owned()),
            ("errorname", "Print Cancelled".to_owned()),
            ("errordetails", format!("The print <b>{}</b> was cancelled. Please wait for platform to home then press OK.", job_name)),
        ])
    }

    fn error_page(params: &[(&str, String)]) -> Self {
        Self {
            page: Page::Error,
            params: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[cfg(test)]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Relative link the shell can load, e.g. `error.html?errorname=Print+Failed&...`.
    pub fn to_href(&self) -> String {
        if self.params.is_empty() {
            return self.page.document().to_owned();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish();
        format!("{}?{}", self.page.document(), query)
    }
}
