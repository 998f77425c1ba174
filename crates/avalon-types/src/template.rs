//! Path template formatting.
//!
//! Templates use brace fields in the style of the project `config.template`
//! entries:
//!
//! - `{key}` substitutes the value of `key`
//! - `{key:0>3}` pads to width 3 with `0`, right aligned (`<`, `>`, `^`)
//! - `{key:>8}` pads with spaces; `{key:03}` zero-pads numeric values
//! - `{{` and `}}` produce literal braces

use std::collections::BTreeMap;

use crate::error::{Result, TypeError};

/// Widest padding a format spec may request.
pub const MAX_FIELD_WIDTH: usize = 4096;

/// Values available to a template, keyed by field name.
pub type TemplateData = BTreeMap<String, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            _ => None,
        }
    }
}

struct FormatSpec {
    fill: char,
    align: Align,
    width: usize,
}

impl FormatSpec {
    fn parse(template: &str, spec: &str, value: &str) -> Result<Self> {
        let malformed = || TypeError::MalformedTemplate {
            template: template.to_string(),
            reason: format!("invalid format spec {spec:?}"),
        };
        let chars: Vec<char> = spec.chars().collect();

        let (fill, align, rest) = match chars.as_slice() {
            [fill, align, ..] if Align::from_char(*align).is_some() => {
                (*fill, Align::from_char(*align), &chars[2..])
            }
            [align, ..] if Align::from_char(*align).is_some() => {
                (' ', Align::from_char(*align), &chars[1..])
            }
            ['0', ..] if value.parse::<i64>().is_ok() => ('0', Some(Align::Right), &chars[1..]),
            _ => (' ', None, &chars[..]),
        };

        let width: String = rest.iter().collect();
        let width = if width.is_empty() {
            0
        } else {
            width.parse::<usize>().map_err(|_| malformed())?
        };
        if width > MAX_FIELD_WIDTH {
            return Err(TypeError::MalformedTemplate {
                template: template.to_string(),
                reason: format!("field width {width} exceeds {MAX_FIELD_WIDTH}"),
            });
        }

        let numeric = value.parse::<f64>().is_ok();
        let align = align.unwrap_or(if numeric { Align::Right } else { Align::Left });
        Ok(Self { fill, align, width })
    }

    fn apply(&self, value: &str) -> String {
        let len = value.chars().count();
        if len >= self.width {
            return value.to_string();
        }
        let pad = self.width - len;
        let (left, right) = match self.align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };
        let mut out = String::with_capacity(value.len() + pad * self.fill.len_utf8());
        out.extend(std::iter::repeat(self.fill).take(left));
        out.push_str(value);
        out.extend(std::iter::repeat(self.fill).take(right));
        out
    }
}

/// Format `template` with `data`.
///
/// Fails with [`TypeError::MissingTemplateKey`] naming the first field that
/// has no value, or [`TypeError::MalformedTemplate`] on unbalanced braces or a
/// field width above [`MAX_FIELD_WIDTH`].
///
/// # Examples
///
/// ```
/// use avalon_types::{format_template, TemplateData};
///
/// let mut data = TemplateData::new();
/// data.insert("subset".into(), "modelDefault".into());
/// data.insert("version".into(), "7".into());
/// let path = format_template("{subset}/v{version:0>3}", &data).unwrap();
/// assert_eq!(path, "modelDefault/v007");
/// ```
pub fn format_template(template: &str, data: &TemplateData) -> Result<String> {
    let malformed = |reason: &str| TypeError::MalformedTemplate {
        template: template.to_string(),
        reason: reason.into(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for f in chars.by_ref() {
                    if f == '}' {
                        closed = true;
                        break;
                    }
                    if f == '{' {
                        return Err(malformed("nested '{' inside a field"));
                    }
                    field.push(f);
                }
                if !closed {
                    return Err(malformed("unclosed '{'"));
                }

                let (key, spec) = match field.split_once(':') {
                    Some((key, spec)) => (key, Some(spec)),
                    None => (field.as_str(), None),
                };
                if key.is_empty() {
                    return Err(malformed("empty field name"));
                }
                let value = data.get(key).ok_or_else(|| TypeError::MissingTemplateKey {
                    key: key.to_string(),
                })?;
                match spec {
                    Some(spec) => {
                        let spec = FormatSpec::parse(template, spec, value)?;
                        out.push_str(&spec.apply(value));
                    }
                    None => out.push_str(value),
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed("single '}' outside a field")),
            other => out.push(other),
        }
    }

    Ok(out)
}
