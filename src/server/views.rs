//! HTML views. Templates are compiled into the binary and registered once.

use minijinja::Environment;
use serde::Serialize;

use crate::error::AppResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("new.html", include_str!("../../templates/new.html")),
    ("edit.html", include_str!("../../templates/edit.html")),
    ("signin.html", include_str!("../../templates/signin.html")),
    ("document.html", include_str!("../../templates/document.html")),
];

/// Context shared by every page: the pending flash and the signed-in user.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
    pub flash: Option<String>,
    pub identity: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
pub struct IndexBody {
    pub documents: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct NewBody {
    pub filename: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EditBody {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SigninBody {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentBody {
    pub name: String,
    /// Rendered markdown, emitted without escaping.
    pub html: String,
}

/// Percent-encode a document name for use as one URL path segment.
fn path_segment(name: String) -> String {
    urlencoding::encode(&name).into_owned()
}

pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_filter("path_segment", path_segment);
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<T: Serialize>(&self, name: &str, page: &Page<T>) -> AppResult<String> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(page)?)
    }
}
