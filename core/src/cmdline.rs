use std::{ffi::OsStr, fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

/// Variables available inside `#{...}` of a command template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum Var {
    Source,
    SourceName,
    SourceStem,
    SourceDir,
    Artifact,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Undefined variable '{name}' at {}", .offset + 1)]
    UndefinedVar { name: String, offset: usize },

    #[error("Unclosed brace (found '#{{' at {})", .offset + 1)]
    UnclosedBrace { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Var),
}

/// A shell command line with `#{var}` placeholders. `##` stands for a literal `#`.
///
/// Syntax and variable names are checked by [`CommandTemplate::parse`], so rendering
/// cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommandTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// Values bound to each [`Var`] when rendering.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'a> {
    pub source: &'a Path,
    pub artifact: Option<&'a Path>,
}

impl CommandTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(i) = rest.find('#') {
            literal.push_str(&rest[..i]);
            let offset = raw.len() - rest.len() + i;
            let after = &rest[i + 1..];

            if let Some(tail) = after.strip_prefix('#') {
                literal.push('#');
                rest = tail;
            } else if let Some(tail) = after.strip_prefix('{') {
                let Some(end) = tail.find('}') else {
                    return Err(TemplateError::UnclosedBrace { offset });
                };
                let name = &tail[..end];
                let var = Var::from_str(name).map_err(|_| TemplateError::UndefinedVar {
                    name: name.to_owned(),
                    offset,
                })?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var(var));
                rest = &tail[end + 1..];
            } else {
                literal.push('#');
                rest = after;
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn uses(&self, var: Var) -> bool {
        self.segments.contains(&Segment::Var(var))
    }

    pub fn render(&self, b: &Bindings<'_>) -> String {
        let mut res = String::with_capacity(self.raw.len() * 2);
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => res.push_str(s),
                Segment::Var(var) => res.push_str(&b.lookup(*var).to_string_lossy()),
            }
        }
        res
    }
}

impl<'a> Bindings<'a> {
    fn lookup(&self, var: Var) -> &'a OsStr {
        use Var::*;
        match var {
            Source => self.source.as_os_str(),
            SourceName => self.source.file_name().unwrap_or_default(),
            SourceStem => self.source.file_stem().unwrap_or_default(),
            SourceDir => match self.source.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.as_os_str(),
                _ => OsStr::new("."),
            },
            Artifact => self.artifact.map(Path::as_os_str).unwrap_or_default(),
        }
    }
}

impl TryFrom<String> for CommandTemplate {
    type Error = TemplateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CommandTemplate> for String {
    fn from(value: CommandTemplate) -> Self {
        value.raw
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn render(tmpl: &str) -> String {
        let b = Bindings {
            source: Path::new("sol/main.c"),
            artifact: Some(Path::new("/tmp/main.c.out")),
        };
        CommandTemplate::parse(tmpl).unwrap().render(&b)
    }

    #[test]
    fn render_ok() {
        assert_eq!(render("cc #{source} -o #{artifact}"), "cc sol/main.c -o /tmp/main.c.out");
        assert_eq!(render("#{source}.out"), "sol/main.c.out");
        assert_eq!(render("#{sourceDir}/#{sourceStem}"), "sol/main");
        assert_eq!(render("#{sourceName}"), "main.c");
        assert_eq!(render("no vars"), "no vars");
        assert_eq!(render("echo {source}"), "echo {source}");
        assert_eq!(render("echo # {source}"), "echo # {source}");
        assert_eq!(render("echo ##{source}"), "echo #{source}");
        assert_eq!(render("#"), "#");
        assert_eq!(render("##"), "#");
        assert_eq!(render("###"), "##");
    }

    #[test]
    fn source_dir_of_bare_filename_is_current_dir() {
        let b = Bindings {
            source: Path::new("a.c"),
            artifact: None,
        };
        let t = CommandTemplate::parse("#{sourceDir}|#{artifact}").unwrap();
        assert_eq!(t.render(&b), ".|");
    }

    #[test]
    fn parse_ng() {
        assert_eq!(
            CommandTemplate::parse("cc #{src}").unwrap_err(),
            TemplateError::UndefinedVar {
                name: "src".to_owned(),
                offset: 3
            }
        );
        assert_eq!(
            CommandTemplate::parse("cc #{source} -o #{artifact").unwrap_err(),
            TemplateError::UnclosedBrace { offset: 16 }
        );
    }

    #[test]
    fn uses_var() {
        let t = CommandTemplate::parse("#{source}.out").unwrap();
        assert!(t.uses(Var::Source));
        assert!(!t.uses(Var::Artifact));
    }

    #[test]
    fn deserialize_from_toml_string() {
        #[derive(Deserialize)]
        struct X {
            cmd: CommandTemplate,
        }
        let x: X = toml::from_str(r#"cmd = "gcc #{source}""#).unwrap();
        assert_eq!(x.cmd.as_str(), "gcc #{source}");
        assert!(toml::from_str::<X>(r#"cmd = "gcc #{nope}""#).is_err());
    }
}
