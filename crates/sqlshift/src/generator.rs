//! Migration file generation.
//!
//! Migration files are rendered from a minijinja template that receives the
//! migration `name` and the `up` and `down` SQL statements. The `yaml` filter
//! turns a statement into a double-quoted YAML scalar.

use std::path::Path;

use minijinja::{context, AutoEscape, Environment};

use crate::error::{MigrateError, Result};
use crate::query::MigrationQuery;

const BUNDLED_TEMPLATE: &str = include_str!("../templates/migration.yaml.j2");
const BUNDLED_NAME: &str = "<bundled>";

/// Renders migration files from a template.
#[derive(Debug, Clone)]
pub struct MigrationGenerator {
    source: String,
    origin: String,
}

impl Default for MigrationGenerator {
    fn default() -> Self {
        Self::bundled()
    }
}

impl MigrationGenerator {
    /// Uses the template shipped with the crate.
    #[must_use]
    pub fn bundled() -> Self {
        Self {
            source: BUNDLED_TEMPLATE.to_string(),
            origin: BUNDLED_NAME.to_string(),
        }
    }

    /// Loads a template file. Fails if it cannot be read or does not compile.
    pub fn from_path(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| MigrateError::Template {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let generator = Self {
            source,
            origin: path.display().to_string(),
        };
        Self::environment().template_from_str(&generator.source).map_err(|e| {
            MigrateError::Template {
                path: generator.origin.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(generator)
    }

    fn environment<'s>() -> Environment<'s> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("yaml", yaml_quote);
        env
    }

    /// Renders a migration file for `query`.
    pub fn generate(&self, name: &str, query: &MigrationQuery) -> Result<String> {
        Self::environment()
            .render_str(
                &self.source,
                context! {
                    name => name,
                    up => query.up(),
                    down => query.down(),
                },
            )
            .map_err(|e| MigrateError::Template {
                path: self.origin.clone(),
                message: e.to_string(),
            })
    }

    /// Renders a migration file with empty bodies.
    pub fn generate_empty(&self, name: &str) -> Result<String> {
        self.generate(name, &MigrationQuery::default())
    }
}

/// Quotes a string as a double-quoted YAML scalar.
fn yaml_quote(value: String) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
