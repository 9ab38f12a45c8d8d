//! Migration files.
//!
//! A migration is a YAML document with `up` and `down` lists. Each entry runs
//! one SQL statement, optionally with bound values:
//!
//! ```yaml
//! up:
//!   - run: "INSERT INTO `setting` (`key`, `value`) VALUES (?, ?);"
//!     binds: ["theme", "dark"]
//!   - run: "UPDATE `setting` SET `value` = :value WHERE `key` = :key;"
//!     binds: { key: "theme", value: "light" }
//! down:
//!   - run: "DELETE FROM `setting` WHERE `key` = 'theme';"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// A value bound to a statement placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl BindValue {
    /// Renders the value as a MySQL literal. Text escapes backslashes and
    /// doubles single quotes. NaN and infinite floats have no literal form.
    #[must_use]
    pub fn to_literal(&self) -> Option<String> {
        let literal = match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) if !f.is_finite() => return None,
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
        };
        Some(literal)
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for BindValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Values bound to a statement: positional for `?`, named for `:name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binds {
    Positional(Vec<BindValue>),
    Named(BTreeMap<String, BindValue>),
}

/// One statement of a migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "run")]
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binds: Option<Binds>,
}

/// A placeholder found while scanning a statement.
enum Placeholder<'a> {
    /// The n-th `?`, counting from zero.
    Positional(usize),
    /// `:name`, without the colon.
    Named(&'a str),
}

impl Statement {
    /// A statement without bound values.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: None,
        }
    }

    #[must_use]
    pub fn with_binds(sql: impl Into<String>, binds: Binds) -> Self {
        Self {
            sql: sql.into(),
            binds: Some(binds),
        }
    }

    /// Returns true when the statement carries bound values.
    #[must_use]
    pub fn has_binds(&self) -> bool {
        match &self.binds {
            None => false,
            Some(Binds::Positional(values)) => !values.is_empty(),
            Some(Binds::Named(values)) => !values.is_empty(),
        }
    }

    /// Substitutes bound values into the SQL text as literals.
    ///
    /// Positional values replace `?` from left to right and named values
    /// replace `:name` tokens with the exact same name. Placeholders inside
    /// quoted strings or identifiers are left alone, as are placeholders
    /// without a value.
    pub fn render(&self) -> Result<String> {
        let mut invalid = None;
        let sql = match &self.binds {
            None => return Ok(self.sql.clone()),
            Some(Binds::Positional(values)) => rewrite(&self.sql, |p| match p {
                Placeholder::Positional(i) => literal(values.get(i), &mut invalid),
                Placeholder::Named(_) => None,
            }),
            Some(Binds::Named(values)) => rewrite(&self.sql, |p| match p {
                Placeholder::Named(name) => literal(named_value(values, name), &mut invalid),
                Placeholder::Positional(_) => None,
            }),
        };
        match invalid {
            Some(value) => Err(MigrateError::InvalidBind {
                sql: self.sql.clone(),
                value,
            }),
            None => Ok(sql),
        }
    }

    /// Returns the SQL with `?` placeholders only and the values in bind order.
    pub fn prepare(&self) -> Result<(String, Vec<BindValue>)> {
        match &self.binds {
            None => Ok((self.sql.clone(), Vec::new())),
            Some(Binds::Positional(values)) => Ok((self.sql.clone(), values.clone())),
            Some(Binds::Named(values)) => {
                let mut ordered = Vec::new();
                let mut missing = None;
                let sql = rewrite(&self.sql, |p| match p {
                    Placeholder::Named(name) => {
                        if let Some(value) = named_value(values, name) {
                            ordered.push(value.clone());
                        } else if missing.is_none() {
                            missing = Some(name.to_string());
                        }
                        Some("?".to_string())
                    }
                    Placeholder::Positional(_) => None,
                });
                match missing {
                    Some(name) => Err(MigrateError::MissingBind {
                        sql: self.sql.clone(),
                        name,
                    }),
                    None => Ok((sql, ordered)),
                }
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Ok(sql) => f.write_str(&sql),
            Err(_) => f.write_str(&self.sql),
        }
    }
}

fn literal(value: Option<&BindValue>, invalid: &mut Option<String>) -> Option<String> {
    let value = value?;
    let text = value.to_literal();
    if text.is_none() && invalid.is_none() {
        *invalid = Some(format!("{value:?}"));
    }
    text
}

fn named_value<'a>(values: &'a BTreeMap<String, BindValue>, name: &str) -> Option<&'a BindValue> {
    values
        .get(name)
        .or_else(|| values.get(format!(":{name}").as_str()))
}

/// Scans `sql` for placeholders outside of quotes. `replace` returns the text
/// to put in place of a placeholder, or `None` to keep it as written.
fn rewrite<'s, F>(sql: &'s str, mut replace: F) -> String
where
    F: FnMut(Placeholder<'s>) -> Option<String>,
{
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut positional = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            } else if c == '\\' && q != '`' {
                out.push(c);
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
                continue;
            }
            out.push(c);
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '?' => {
                match replace(Placeholder::Positional(positional)) {
                    Some(text) => out.push_str(&text),
                    None => out.push(c),
                }
                positional += 1;
            }
            ':' if !sql[..i].ends_with(':')
                && chars
                    .peek()
                    .is_some_and(|&(_, n)| n.is_ascii_alphabetic() || n == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, n)) = chars.peek() {
                    if n.is_ascii_alphanumeric() || n == '_' {
                        end = j + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[start..end];
                match replace(Placeholder::Named(name)) {
                    Some(text) => out.push_str(&text),
                    None => {
                        out.push(':');
                        out.push_str(name);
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    up: Option<Vec<Statement>>,
    #[serde(default)]
    down: Option<Vec<Statement>>,
}

/// A loaded migration unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationScript {
    up: Vec<Statement>,
    down: Vec<Statement>,
}

impl MigrationScript {
    #[must_use]
    pub const fn new(up: Vec<Statement>, down: Vec<Statement>) -> Self {
        Self { up, down }
    }

    /// Reads and parses a migration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|message| MigrateError::InvalidScript {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parses a migration document.
    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
        let is_migration = value
            .as_mapping()
            .is_some_and(|m| m.contains_key("up") || m.contains_key("down"));
        if !is_migration {
            return Err("expected `up` and `down` statement lists".to_string());
        }
        let document: Document = serde_yaml::from_value(value).map_err(|e| e.to_string())?;
        Ok(Self {
            up: document.up.unwrap_or_default(),
            down: document.down.unwrap_or_default(),
        })
    }

    #[must_use]
    pub fn up(&self) -> &[Statement] {
        &self.up
    }

    #[must_use]
    pub fn down(&self) -> &[Statement] {
        &self.down
    }

    /// The DOWN statements as one SQL text with literal values, one
    /// statement per line. This is what gets stored with an applied
    /// migration so it can be reverted without its file.
    pub fn down_text(&self) -> Result<String> {
        let mut lines = Vec::with_capacity(self.down.len());
        for statement in &self.down {
            let sql = statement.render()?;
            let sql = sql.trim_end();
            lines.push(if sql.ends_with(';') {
                sql.to_string()
            } else {
                format!("{sql};")
            });
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_positional() {
        let stmt = Statement::with_binds(
            "INSERT INTO `user` (`name`, `age`) VALUES (?, ?)",
            Binds::Positional(vec!["O'Brien".into(), BindValue::Int(42)]),
        );
        assert_eq!(
            stmt.render().unwrap(),
            "INSERT INTO `user` (`name`, `age`) VALUES ('O''Brien', 42)"
        );
    }

    #[test]
    fn test_render_escapes_backslashes() {
        let stmt = Statement::with_binds(
            "UPDATE t SET path = ? WHERE id = ?",
            Binds::Positional(vec!["C:\\".into(), BindValue::Int(5)]),
        );
        let rendered = stmt.render().unwrap();
        assert_eq!(rendered, "UPDATE t SET path = 'C:\\\\' WHERE id = 5");

        // The literal must close where it was opened when scanned again.
        let again = Statement::with_binds(
            format!("{rendered} AND x = ?"),
            Binds::Positional(vec![BindValue::Int(9)]),
        );
        assert_eq!(
            again.render().unwrap(),
            "UPDATE t SET path = 'C:\\\\' WHERE id = 5 AND x = 9"
        );

        assert_eq!(
            BindValue::from("a\\'b").to_literal().as_deref(),
            Some("'a\\\\''b'")
        );
    }

    #[test]
    fn test_render_rejects_non_finite_floats() {
        assert_eq!(BindValue::Float(1.5).to_literal().as_deref(), Some("1.5"));
        assert_eq!(BindValue::Float(f64::NAN).to_literal(), None);

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let stmt = Statement::with_binds(
                "INSERT INTO t VALUES (?)",
                Binds::Positional(vec![BindValue::Float(value)]),
            );
            assert!(matches!(
                stmt.render(),
                Err(MigrateError::InvalidBind { sql, .. }) if sql == "INSERT INTO t VALUES (?)"
            ));
            assert_eq!(stmt.to_string(), "INSERT INTO t VALUES (?)");
        }

        let script = MigrationScript::new(
            vec![],
            vec![Statement::with_binds(
                "DELETE FROM t WHERE v = :v",
                Binds::Named(BTreeMap::from([("v".to_string(), BindValue::Float(f64::INFINITY))])),
            )],
        );
        assert!(script.down_text().is_err());
    }

    #[test]
    fn test_render_skips_quoted_placeholders() {
        let stmt = Statement::with_binds(
            "UPDATE `t?` SET a = '?', b = ? WHERE c = \"it\\\"s ?\"",
            Binds::Positional(vec![BindValue::Null]),
        );
        assert_eq!(
            stmt.render().unwrap(),
            "UPDATE `t?` SET a = '?', b = NULL WHERE c = \"it\\\"s ?\""
        );
    }

    #[test]
    fn test_render_named_exact_token() {
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), BindValue::Int(7));
        values.insert(":name".to_string(), BindValue::Text("x".into()));
        let stmt = Statement::with_binds(
            "UPDATE t SET name = :name, other = :identity WHERE id = :id AND d = '12:30'",
            Binds::Named(values),
        );

        assert_eq!(
            stmt.render().unwrap(),
            "UPDATE t SET name = 'x', other = :identity WHERE id = 7 AND d = '12:30'"
        );
    }

    #[test]
    fn test_render_leaves_missing_values() {
        let stmt = Statement::with_binds(
            "SELECT ?, ?",
            Binds::Positional(vec![BindValue::Bool(true)]),
        );
        assert_eq!(stmt.render().unwrap(), "SELECT TRUE, ?");
        assert_eq!(Statement::raw("SELECT ?").render().unwrap(), "SELECT ?");
    }

    #[test]
    fn test_prepare_named() {
        let mut values = BTreeMap::new();
        values.insert("a".to_string(), BindValue::Int(1));
        values.insert("b".to_string(), BindValue::Int(2));
        let stmt = Statement::with_binds("SELECT :b, :a, :b", Binds::Named(values));

        let (sql, binds) = stmt.prepare().unwrap();
        assert_eq!(sql, "SELECT ?, ?, ?");
        assert_eq!(
            binds,
            vec![BindValue::Int(2), BindValue::Int(1), BindValue::Int(2)]
        );
    }

    #[test]
    fn test_prepare_missing_named() {
        let stmt = Statement::with_binds("SELECT :nope", Binds::Named(BTreeMap::new()));
        assert!(matches!(
            stmt.prepare(),
            Err(MigrateError::MissingBind { name, .. }) if name == "nope"
        ));
    }

    #[test]
    fn test_parse_script() {
        let yaml = r#"
# comment
up:
  - run: "CREATE TABLE `a` (`id` INT);"
  - run: "INSERT INTO `a` VALUES (?);"
    binds: [1]
  - run: "INSERT INTO `a` VALUES (:id);"
    binds: { id: 2 }
down:
  - run: "DROP TABLE `a`"
"#;
        let script = MigrationScript::parse(yaml).unwrap();
        assert_eq!(script.up().len(), 3);
        assert_eq!(
            script.up()[1].binds,
            Some(Binds::Positional(vec![BindValue::Int(1)]))
        );
        assert!(matches!(script.up()[2].binds, Some(Binds::Named(_))));
        assert_eq!(script.down_text().unwrap(), "DROP TABLE `a`;");
    }

    #[test]
    fn test_parse_empty_lists() {
        let script = MigrationScript::parse("up: []\ndown: []\n").unwrap();
        assert!(script.up().is_empty());
        assert!(script.down().is_empty());
        assert_eq!(script.down_text().unwrap(), "");

        let script = MigrationScript::parse("up:\ndown:\n").unwrap();
        assert!(script.up().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(MigrationScript::parse("").is_err());
        assert!(MigrationScript::parse("hello: world").is_err());
        assert!(MigrationScript::parse("up: [{sql: 'x'}]").is_err());
        assert!(MigrationScript::parse("up: [").is_err());
    }

    #[test]
    fn test_down_text_inlines_binds() {
        let script = MigrationScript::new(
            vec![],
            vec![
                Statement::with_binds(
                    "DELETE FROM t WHERE k = ?",
                    Binds::Positional(vec!["a'b".into()]),
                ),
                Statement::raw("DROP TABLE u;\n"),
            ],
        );
        assert_eq!(
            script.down_text().unwrap(),
            "DELETE FROM t WHERE k = 'a''b';\nDROP TABLE u;"
        );
    }
}
