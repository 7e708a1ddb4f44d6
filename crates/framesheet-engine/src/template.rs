//! Column formula templates.
//!
//! `{name}` stands for the cell of column `name` in the row being written,
//! `{$name}` for the absolute data range of that column, and `{outer|inner}`
//! names a column by its full header tuple.
//!
//! Braces holding `,` or `;`, or a lone number, boolean, string or error
//! literal, are array constants and pass through untouched.

use std::ops::Range;

use framesheet_common::{CellValue, FrameResult, Labels};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::index::ColumnRef;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(\$?)([^{},;]+)\}").expect("static placeholder pattern"));

static ARRAY_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*(?:[+-]?(?:\d+\.?\d*|\.\d+)(?:e[+-]?\d+)?|true|false|"[^"]*"|#[a-z0-9/!?]+)\s*$"#,
    )
    .expect("static array literal pattern")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// `{$name}`: refer to the whole data range, not the current row.
    pub absolute: bool,
    pub column: ColumnRef,
    span: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    source: String,
    placeholders: Vec<Placeholder>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let placeholders = PLACEHOLDER
            .captures_iter(source)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let absolute = !caps[1].is_empty();
                let body = caps.get(2)?.as_str();
                if !absolute && ARRAY_LITERAL.is_match(body) {
                    return None;
                }
                let name = body.trim();
                let column = if name.contains('|') {
                    ColumnRef::Key(
                        name.split('|')
                            .map(|part| CellValue::from(part.trim()))
                            .collect::<Labels>(),
                    )
                } else {
                    ColumnRef::name(name)
                };
                Some(Placeholder {
                    absolute,
                    column,
                    span: whole.range(),
                })
            })
            .collect();
        Template {
            source: source.to_string(),
            placeholders,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Substitute every placeholder and return a formula with a leading `=`.
    pub fn render<F>(&self, mut resolve: F) -> FrameResult<String>
    where
        F: FnMut(&Placeholder) -> FrameResult<String>,
    {
        let mut out = String::with_capacity(self.source.len() + 16);
        let mut last = 0;
        for ph in &self.placeholders {
            out.push_str(&self.source[last..ph.span.start]);
            out.push_str(&resolve(ph)?);
            last = ph.span.end;
        }
        out.push_str(&self.source[last..]);
        if !out.starts_with('=') {
            out.insert(0, '=');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framesheet_common::FrameError;

    #[test]
    fn parses_all_placeholder_forms() {
        let t = Template::parse("{price} * {qty} / SUM({$qty}) + {2020|sales}");
        let kinds: Vec<(bool, ColumnRef)> = t
            .placeholders()
            .iter()
            .map(|p| (p.absolute, p.column.clone()))
            .collect();
        assert_eq!(
            kinds,
            [
                (false, ColumnRef::name("price")),
                (false, ColumnRef::name("qty")),
                (true, ColumnRef::name("qty")),
                (false, ColumnRef::key(["2020", "sales"])),
            ]
        );
    }

    #[test]
    fn renders_with_leading_equals() {
        let t = Template::parse("{a}+{$b}");
        let out = t
            .render(|p| {
                Ok(match (&p.column, p.absolute) {
                    (ColumnRef::Name(n), false) if n == "a" => "C5".to_string(),
                    _ => "$D$5:$D$9".to_string(),
                })
            })
            .unwrap();
        assert_eq!(out, "=C5+$D$5:$D$9");
        assert_eq!(Template::parse("=1+1").render(|_| unreachable!()).unwrap(), "=1+1");
    }

    #[test]
    fn resolver_errors_propagate() {
        let t = Template::parse("{ghost}");
        let err = t
            .render(|p| Err(FrameError::ColumnNotFound(p.column.describe())))
            .unwrap_err();
        assert!(matches!(err, FrameError::ColumnNotFound(n) if n == "ghost"));
    }

    #[test]
    fn array_constants_are_not_placeholders() {
        let t = Template::parse("SUMPRODUCT({qty},{1,2,3}) + INDEX({1;2},2) + {7} + {TRUE} + {$qty}");
        let names: Vec<String> = t.placeholders().iter().map(|p| p.column.describe()).collect();
        assert_eq!(names, ["qty", "qty"]);
        let out = t
            .render(|p| Ok(if p.absolute { "$C$3:$C$6" } else { "C3" }.to_string()))
            .unwrap();
        assert_eq!(out, "=SUMPRODUCT(C3,{1,2,3}) + INDEX({1;2},2) + {7} + {TRUE} + $C$3:$C$6");
    }
}
