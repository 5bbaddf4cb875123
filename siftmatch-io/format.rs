//! Text feature formats.
//!
//! Lowe:   `count dim` header, then per feature `y x scale orientation`
//!         followed by `dim` integer descriptor values, 20 per line.
//! Oxford: `dim` and `count` header lines, then one line per feature
//!         `x y a b c` followed by `dim` descriptor values.
//!
//! Readers only care about whitespace-separated tokens, so line wrapping of
//! descriptor values is free-form on input.

use std::io::Write;
use std::str::FromStr;

use siftmatch_core::{Feature, FeatureKind};

use crate::error::{FeatureIoError, FeatureIoResult};

/// Descriptor values per line in Lowe files
const LOWE_VALUES_PER_LINE: usize = 20;

/// Upper bound on the up-front reservation; header counts are untrusted
const MAX_RESERVED_FEATURES: usize = 4096;

/// Whitespace tokenizer that remembers line numbers for error reporting
struct Tokens<'s> {
    lines: std::iter::Enumerate<std::str::Lines<'s>>,
    current: std::str::SplitWhitespace<'s>,
    line: usize,
    peeked: Option<(usize, &'s str)>,
}

impl<'s> Tokens<'s> {
    fn new(text: &'s str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            current: "".split_whitespace(),
            line: 0,
            peeked: None,
        }
    }

    fn next_token(&mut self) -> Option<(usize, &'s str)> {
        if let Some(tok) = self.peeked.take() {
            return Some(tok);
        }
        loop {
            if let Some(tok) = self.current.next() {
                return Some((self.line, tok));
            }
            let (i, line) = self.lines.next()?;
            self.line = i + 1;
            self.current = line.split_whitespace();
        }
    }

    fn at_end(&mut self) -> bool {
        if self.peeked.is_none() {
            self.peeked = self.next_token();
        }
        self.peeked.is_none()
    }

    fn number<N: FromStr>(&mut self, what: &str) -> FeatureIoResult<N> {
        match self.next_token() {
            Some((line, tok)) => tok.parse().map_err(|_| FeatureIoError::Parse {
                line,
                message: format!("invalid {}: {:?}", what, tok),
            }),
            None => Err(FeatureIoError::Parse {
                line: self.line,
                message: format!("unexpected end of file, expected {}", what),
            }),
        }
    }

    fn descriptor(&mut self, dim: usize) -> FeatureIoResult<Vec<f64>> {
        (0..dim).map(|_| self.number("descriptor value")).collect()
    }
}

/// Guess the format from the header: Lowe starts with two numbers on the first line, Oxford with one
pub fn detect_kind(text: &str) -> Option<FeatureKind> {
    let first = text.lines().find(|l| !l.trim().is_empty())?;
    match first.split_whitespace().count() {
        1 => Some(FeatureKind::Oxford),
        2 => Some(FeatureKind::Lowe),
        _ => None,
    }
}

pub fn parse_features(text: &str, kind: FeatureKind) -> FeatureIoResult<Vec<Feature>> {
    match kind {
        FeatureKind::Lowe => parse_lowe(text),
        FeatureKind::Oxford => parse_oxford(text),
    }
}

fn parse_lowe(text: &str) -> FeatureIoResult<Vec<Feature>> {
    let mut tokens = Tokens::new(text);
    let count: usize = tokens.number("feature count")?;
    let dim: usize = tokens.number("descriptor length")?;

    let mut features = Vec::with_capacity(count.min(MAX_RESERVED_FEATURES));
    for found in 0..count {
        if tokens.at_end() {
            return Err(FeatureIoError::Truncated { expected: count, found });
        }
        let y = tokens.number("y coordinate")?;
        let x = tokens.number("x coordinate")?;
        let scale = tokens.number("scale")?;
        let orientation = tokens.number("orientation")?;
        let descriptor = tokens.descriptor(dim)?;
        features.push(Feature::new(x, y, scale, orientation, descriptor));
    }
    Ok(features)
}

fn parse_oxford(text: &str) -> FeatureIoResult<Vec<Feature>> {
    let mut tokens = Tokens::new(text);
    let dim: usize = tokens.number("descriptor length")?;
    let count: usize = tokens.number("feature count")?;

    let mut features = Vec::with_capacity(count.min(MAX_RESERVED_FEATURES));
    for found in 0..count {
        if tokens.at_end() {
            return Err(FeatureIoError::Truncated { expected: count, found });
        }
        let x = tokens.number("x coordinate")?;
        let y = tokens.number("y coordinate")?;
        let a = tokens.number("ellipse parameter a")?;
        let b = tokens.number("ellipse parameter b")?;
        let c = tokens.number("ellipse parameter c")?;
        let descriptor = tokens.descriptor(dim)?;
        features.push(Feature::oxford(x, y, a, b, c, descriptor));
    }
    Ok(features)
}

/// Shared descriptor length, or an error naming the first offender
fn common_dimension(features: &[Feature]) -> FeatureIoResult<usize> {
    let first = features.first().ok_or(FeatureIoError::EmptyFeatureSet)?;
    let expected = first.dimension();
    match features.iter().position(|f| f.dimension() != expected) {
        Some(index) => Err(FeatureIoError::InconsistentDimension {
            index,
            expected,
            actual: features[index].dimension(),
        }),
        None => Ok(expected),
    }
}

pub fn write_features<W: Write>(mut writer: W, features: &[Feature], kind: FeatureKind) -> FeatureIoResult<()> {
    let dim = common_dimension(features)?;
    match kind {
        FeatureKind::Lowe => {
            writeln!(writer, "{} {}", features.len(), dim)?;
            for f in features {
                write!(writer, "{:.6} {:.6} {:.6} {:.6}", f.y, f.x, f.scale, f.orientation)?;
                for (j, v) in f.descriptor.iter().enumerate() {
                    if j % LOWE_VALUES_PER_LINE == 0 {
                        writeln!(writer)?;
                    }
                    // Lowe descriptors are integral, fractional parts are dropped
                    write!(writer, " {}", *v as i64)?;
                }
                writeln!(writer)?;
            }
        }
        FeatureKind::Oxford => {
            writeln!(writer, "{}\n{}", dim, features.len())?;
            for f in features {
                write!(writer, "{:.6} {:.6} {:.6} {:.6} {:.6}", f.x, f.y, f.a, f.b, f.c)?;
                for v in &f.descriptor {
                    write!(writer, " {}", v)?;
                }
                writeln!(writer)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}
