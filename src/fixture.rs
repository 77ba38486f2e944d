//! # Fixture Parsing
//!
//! A fixture file is three sections separated by delimiter lines:
//!
//! ```text
//! ---
//! exception: nil
//! name: World
//! ---
//! Hello {{ name }}
//! ---
//! Hello World
//! ```
//!
//! A delimiter line is exactly `---`, optionally followed by spaces or tabs,
//! then a line break (`\n` or `\r\n`). The text must start with one.
//!
//! Parsing is pure: no engine, no filesystem. Sections are borrowed slices of
//! the raw text together with their byte spans, so later stages can point
//! diagnostics at the right place.

use std::ops::Range;

use miette::NamedSource;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::FixtureError;

static DELIMITER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^---[ \t]*\r?\n").expect("delimiter pattern is valid"));

/// How delimiter lines are chosen when a fixture contains more than three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DelimiterMode {
    /// The header and body extend as far as possible: the first delimiter
    /// line opens the header and the last two delimiter lines close the
    /// header and the body. This is the historical fixture behavior.
    #[default]
    Greedy,
    /// The first three delimiter lines are used. Literal `---` lines are
    /// then only allowed inside the expected section.
    First,
}

/// One section of a fixture: its text and its byte range in the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    pub text: &'a str,
    start: usize,
}

impl<'a> Section<'a> {
    fn slice(raw: &'a str, range: Range<usize>) -> Self {
        Self {
            text: &raw[range.clone()],
            start: range.start,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }

    /// Byte offset into the raw fixture of an offset inside this section.
    pub fn offset(&self, inner: usize) -> usize {
        self.start + inner.min(self.text.len())
    }
}

/// A fixture split into its header, template body and expected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFixture<'a> {
    name: &'a str,
    raw: &'a str,
    pub header: Section<'a>,
    pub body: Section<'a>,
    pub expected: Section<'a>,
}

impl<'a> ParsedFixture<'a> {
    /// Splits `raw` into sections. `name` only labels diagnostics.
    pub fn parse(name: &'a str, raw: &'a str, mode: DelimiterMode) -> Result<Self, FixtureError> {
        let delimiters: Vec<Range<usize>> = DELIMITER_LINE.find_iter(raw).map(|m| m.range()).collect();

        let Some(first) = delimiters.first() else {
            return Err(delimiter_error(name, raw, 0, 0..0, "expected a '---' line here"));
        };
        if first.start != 0 {
            let first_line = raw.find('\n').unwrap_or(raw.len());
            return Err(delimiter_error(
                name,
                raw,
                0,
                0..first_line,
                "fixture must start with a '---' line",
            ));
        }
        if delimiters.len() < 3 {
            return Err(delimiter_error(
                name,
                raw,
                delimiters.len(),
                raw.len()..raw.len(),
                "missing delimiter line before end of file",
            ));
        }

        let (second, third) = match mode {
            DelimiterMode::Greedy => (
                &delimiters[delimiters.len() - 2],
                &delimiters[delimiters.len() - 1],
            ),
            DelimiterMode::First => (&delimiters[1], &delimiters[2]),
        };

        Ok(Self {
            name,
            raw,
            header: Section::slice(raw, first.end..second.start),
            body: Section::slice(raw, second.end..third.start),
            expected: Section::slice(raw, third.end..raw.len()),
        })
    }

    /// The whole fixture as a diagnostic source.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name, self.raw.to_string())
    }
}

fn delimiter_error(
    name: &str,
    raw: &str,
    found: usize,
    span: Range<usize>,
    label: &'static str,
) -> FixtureError {
    FixtureError::Delimiters {
        found,
        src: NamedSource::new(name, raw.to_string()),
        span: (span.start, span.end - span.start).into(),
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ParsedFixture<'_> {
        ParsedFixture::parse("fixture.tpl", raw, DelimiterMode::Greedy).unwrap()
    }

    #[test]
    fn splits_three_sections() {
        let fixture = parse("---\nexception: nil\n---\nHello {{name}}\n---\nHello World\n");
        assert_eq!(fixture.header.text, "exception: nil\n");
        assert_eq!(fixture.body.text, "Hello {{name}}\n");
        assert_eq!(fixture.expected.text, "Hello World\n");
    }

    #[test]
    fn sections_are_ordered_substrings() {
        let raw = "---\na: 1\n---\nbody\n---\nout";
        let fixture = parse(raw);
        assert_eq!(&raw[fixture.header.span()], fixture.header.text);
        assert_eq!(&raw[fixture.body.span()], fixture.body.text);
        assert_eq!(&raw[fixture.expected.span()], fixture.expected.text);
        assert!(fixture.header.span().end <= fixture.body.span().start);
        assert!(fixture.body.span().end <= fixture.expected.span().start);
    }

    #[test]
    fn delimiters_allow_trailing_blanks_and_crlf() {
        let fixture = parse("--- \t\r\nexception: nil\r\n---\r\nbody\r\n---  \nout");
        assert_eq!(fixture.header.text, "exception: nil\r\n");
        assert_eq!(fixture.body.text, "body\r\n");
        assert_eq!(fixture.expected.text, "out");
    }

    #[test]
    fn empty_sections_are_allowed() {
        let fixture = parse("---\n---\n---\n");
        assert_eq!(fixture.header.text, "");
        assert_eq!(fixture.body.text, "");
        assert_eq!(fixture.expected.text, "");
    }

    #[test]
    fn near_delimiters_are_content() {
        let fixture = parse("---\n---\n----\n --- \n---x\n---\nout");
        assert_eq!(fixture.body.text, "----\n --- \n---x\n");
        assert_eq!(fixture.expected.text, "out");
    }

    #[test]
    fn missing_third_delimiter_is_malformed() {
        let err = ParsedFixture::parse("f", "---\nexception: nil\n---\nbody\n", DelimiterMode::Greedy)
            .unwrap_err();
        assert!(matches!(err, FixtureError::Delimiters { found: 2, .. }));
    }

    #[test]
    fn text_before_first_delimiter_is_malformed() {
        let err = ParsedFixture::parse("f", "intro\n---\na\n---\nb\n---\nc", DelimiterMode::Greedy)
            .unwrap_err();
        assert!(matches!(err, FixtureError::Delimiters { found: 0, .. }));
    }

    #[test]
    fn delimiter_without_line_break_does_not_count() {
        let err = ParsedFixture::parse("f", "---\na\n---\nb\n---", DelimiterMode::Greedy).unwrap_err();
        assert!(matches!(err, FixtureError::Delimiters { found: 2, .. }));
    }

    #[test]
    fn greedy_mode_uses_last_two_delimiters() {
        let raw = "---\nexception: nil\n---\nbody\n---\nmore body\n---\nout\n";
        let fixture = ParsedFixture::parse("f", raw, DelimiterMode::Greedy).unwrap();
        assert_eq!(fixture.header.text, "exception: nil\n---\nbody\n");
        assert_eq!(fixture.body.text, "more body\n");
        assert_eq!(fixture.expected.text, "out\n");
    }

    #[test]
    fn first_mode_uses_first_three_delimiters() {
        let raw = "---\nexception: nil\n---\nbody\n---\nout\n---\nstill out\n";
        let fixture = ParsedFixture::parse("f", raw, DelimiterMode::First).unwrap();
        assert_eq!(fixture.header.text, "exception: nil\n");
        assert_eq!(fixture.body.text, "body\n");
        assert_eq!(fixture.expected.text, "out\n---\nstill out\n");
    }

    #[test]
    fn greedy_mode_agrees_with_backtracking_pattern() {
        let pattern =
            Regex::new(r"(?ms)\A---[ \t]*\r?\n(.*)^---[ \t]*\r?\n(.*)^---[ \t]*\r?\n(.*)").unwrap();
        let inputs = [
            "---\na\n---\nb\n---\nc\n",
            "---\na\n---\nb\n---\nc\n---\nd\n",
            "---\n---\n---\n---\n---\n",
            "---\nh\n---\n\n---\n\n---\ntail",
        ];
        for raw in inputs {
            let caps = pattern.captures(raw).unwrap();
            let fixture = parse(raw);
            assert_eq!(fixture.header.text, &caps[1], "header of {raw:?}");
            assert_eq!(fixture.body.text, &caps[2], "body of {raw:?}");
            assert_eq!(fixture.expected.text, &caps[3], "expected of {raw:?}");
        }
    }
}
