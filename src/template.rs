//! Page templates.
//!
//! Pages are produced from plain template files rendered with
//! [minijinja](https://docs.rs/minijinja):
//!
//! ```text
//! <a href="{{ href }}"><img src="{{ thumb_src }}" alt="{{ alt }}"></a>
//! ```
//!
//! Each template file has a fixed set of variable names it may use. Anything
//! else, and any syntax error, is rejected when the template set is loaded,
//! so a bad template never produces partial output. Rendering is strict: a
//! variable without a value is an error, never an empty string.
//!
//! ## Template set
//!
//! | File | Fields |
//! |---|---|
//! | `head.html` | `title` |
//! | `index.html` | `head`, `links`, `email` |
//! | `link.html` | `href`, `thumb_src`, `alt` |
//! | `older.html` | `older` |
//! | `newer.html` | `newer` |
//! | `post.html` | `head`, `photo_href`, `src`, `srcset`, `alt`, `older`, `newer` |
//! | `rss_item.xml` | `alt`, `permalink`, `url`, `src` |
//! | `index.xml` | `title`, `url`, `last_build`, `rss_items` |
//!
//! plus `style.css`, which is copied verbatim.
//!
//! Stock versions of every file are embedded in the binary and written out
//! by `photolog init`.

use minijinja::{Environment, UndefinedBehavior, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default template directory name inside a site source directory.
pub const TEMPLATE_DIR: &str = "templates";

pub const STYLESHEET: &str = "style.css";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{file}: {source}")]
    Syntax {
        file: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("{file}: {reason}")]
    Placeholder { file: String, reason: String },
    #[error("{file}: no value for {{{{ {field} }}}}")]
    MissingField { file: String, field: String },
    #[error("{file}: {source}")]
    Render {
        file: String,
        #[source]
        source: minijinja::Error,
    },
}

/// A compiled template file.
#[derive(Debug, Clone)]
pub struct Template {
    file: String,
    /// Variables the template reads, sorted.
    fields: Vec<String>,
    env: Environment<'static>,
}

impl Template {
    /// Compile `source`, allowing only the variable names in `fields`.
    pub fn parse(file: &str, source: &str, fields: &[&str]) -> Result<Self, TemplateError> {
        let syntax = |source: minijinja::Error| TemplateError::Syntax {
            file: file.to_string(),
            source,
        };

        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_template_owned(file.to_string(), source.to_string())
            .map_err(syntax)?;

        let mut used: Vec<String> = env
            .get_template(file)
            .map_err(syntax)?
            .undeclared_variables(false)
            .into_iter()
            .collect();
        used.sort();

        if let Some(unknown) = used.iter().find(|name| !fields.contains(&name.as_str())) {
            return Err(TemplateError::Placeholder {
                file: file.to_string(),
                reason: format!(
                    "unknown variable `{unknown}` (expected one of: {})",
                    fields.join(", ")
                ),
            });
        }

        Ok(Self {
            file: file.to_string(),
            fields: used,
            env,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Variable names the template uses, sorted.
    pub fn fields(&self) -> Vec<&str> {
        self.fields.iter().map(String::as_str).collect()
    }

    /// Substitute `values` into the template.
    ///
    /// Values are inserted as markup, unescaped; escape data with [`escape`]
    /// first. Every variable the template uses needs a value.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        if let Some(field) = self
            .fields
            .iter()
            .find(|f| !values.iter().any(|(name, _)| name == f))
        {
            return Err(TemplateError::MissingField {
                file: self.file.clone(),
                field: field.clone(),
            });
        }

        let context: BTreeMap<&str, Value> = values
            .iter()
            .map(|(name, value)| (*name, Value::from_safe_string(value.to_string())))
            .collect();
        self.env
            .get_template(&self.file)
            .and_then(|t| t.render(context))
            .map_err(|source| TemplateError::Render {
                file: self.file.clone(),
                source,
            })
    }
}

/// HTML/XML-escape a data value for interpolation.
pub fn escape(value: &str) -> String {
    maud::html! { (value) }.into_string()
}

struct Contract {
    file: &'static str,
    fields: &'static [&'static str],
    stock: &'static str,
}

const HEAD: Contract = Contract {
    file: "head.html",
    fields: &["title"],
    stock: include_str!("../static/templates/head.html"),
};
const INDEX: Contract = Contract {
    file: "index.html",
    fields: &["head", "links", "email"],
    stock: include_str!("../static/templates/index.html"),
};
const LINK: Contract = Contract {
    file: "link.html",
    fields: &["href", "thumb_src", "alt"],
    stock: include_str!("../static/templates/link.html"),
};
const OLDER: Contract = Contract {
    file: "older.html",
    fields: &["older"],
    stock: include_str!("../static/templates/older.html"),
};
const NEWER: Contract = Contract {
    file: "newer.html",
    fields: &["newer"],
    stock: include_str!("../static/templates/newer.html"),
};
const POST: Contract = Contract {
    file: "post.html",
    fields: &["head", "photo_href", "src", "srcset", "alt", "older", "newer"],
    stock: include_str!("../static/templates/post.html"),
};
const RSS_ITEM: Contract = Contract {
    file: "rss_item.xml",
    fields: &["alt", "permalink", "url", "src"],
    stock: include_str!("../static/templates/rss_item.xml"),
};
const FEED: Contract = Contract {
    file: "index.xml",
    fields: &["title", "url", "last_build", "rss_items"],
    stock: include_str!("../static/templates/index.xml"),
};
const STOCK_STYLESHEET: &str = include_str!("../static/templates/style.css");

const CONTRACTS: [&Contract; 8] = [
    &HEAD, &INDEX, &LINK, &OLDER, &NEWER, &POST, &RSS_ITEM, &FEED,
];

/// Every stock file as `(file name, contents)`, stylesheet last.
pub fn stock_files() -> Vec<(&'static str, &'static str)> {
    CONTRACTS
        .iter()
        .map(|c| (c.file, c.stock))
        .chain(std::iter::once((STYLESHEET, STOCK_STYLESHEET)))
        .collect()
}

/// The full set of templates a build needs.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub head: Template,
    pub index: Template,
    pub link: Template,
    pub older: Template,
    pub newer: Template,
    pub post: Template,
    pub rss_item: Template,
    pub feed: Template,
    pub stylesheet: String,
}

impl TemplateSet {
    /// Load every template from `dir`.
    ///
    /// All files are checked for presence before any is parsed, so the first
    /// missing file is reported even when another one is malformed.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let names = CONTRACTS
            .iter()
            .map(|c| c.file)
            .chain(std::iter::once(STYLESHEET));
        for name in names {
            let path = dir.join(name);
            if !path.is_file() {
                return Err(TemplateError::NotFound(path));
            }
        }

        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path).map_err(|source| TemplateError::Io { path, source })
        };
        Self::assemble(|c| read(c.file), read(STYLESHEET)?)
    }

    /// The embedded stock templates.
    pub fn stock() -> Result<Self, TemplateError> {
        Self::assemble(|c| Ok(c.stock.to_string()), STOCK_STYLESHEET.to_string())
    }

    fn assemble(
        source: impl Fn(&Contract) -> Result<String, TemplateError>,
        stylesheet: String,
    ) -> Result<Self, TemplateError> {
        let parse = |c: &Contract| Template::parse(c.file, &source(c)?, c.fields);
        Ok(Self {
            head: parse(&HEAD)?,
            index: parse(&INDEX)?,
            link: parse(&LINK)?,
            older: parse(&OLDER)?,
            newer: parse(&NEWER)?,
            post: parse(&POST)?,
            rss_item: parse(&RSS_ITEM)?,
            feed: parse(&FEED)?,
            stylesheet,
        })
    }
}

/// Write the stock templates into `dir`, leaving existing files alone.
///
/// Returns the files written.
pub fn write_stock(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (name, contents) in stock_files() {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, contents)?;
        written.push(path);
    }
    Ok(written)
}
