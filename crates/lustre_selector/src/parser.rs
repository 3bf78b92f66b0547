//! Selector parser
//!
//! Parses CSS-like selector strings into a [`Selector`]:
//!
//! - `#id`, `.class`, `Type`, `*`
//! - `[attr]`, `[attr='value']`, `[attr="value"]`, `[attr=value]`, plus the
//!   `^=` (prefix), `$=` (suffix) and `*=` (substring) operators
//! - `:enabled`, `:disabled`, `:visible`, `:hidden`, `:focused` / `:focus`,
//!   and custom pseudo-classes resolved by the matcher at match time
//! - compounds separated by whitespace (descendant) or `>` (child)
//!
//! Combinators are recorded but **flattened** for matching: every part of every
//! compound must hold on the subject widget itself. `#dialog .button:enabled`
//! therefore matches a widget with id `dialog`, class `button`, that is enabled.
//! There is no walk up the widget tree.
//!
//! The grammar is built from nom combinators with `VerboseError` context so
//! syntax errors carry a column and the construct that was expected.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, consumed, cut, map, opt, recognize, value},
    error::{context, ErrorKind, VerboseError, VerboseErrorKind},
    multi::{many0, many1},
    sequence::{delimited, pair, preceded},
    Finish, IResult,
};
use rustc_hash::FxHasher;
use smallvec::SmallVec;
use tracing::trace;

use crate::error::{Result, SelectorError};
use crate::specificity::Specificity;

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Kind of a single selector part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Id,
    Class,
    Type,
    Universal,
    Attribute,
    Pseudo,
}

impl PartKind {
    /// Specificity contributed by one part of this kind
    pub fn specificity(self) -> Specificity {
        match self {
            PartKind::Id => Specificity::new(1, 0, 0),
            PartKind::Class | PartKind::Attribute | PartKind::Pseudo => Specificity::new(0, 1, 0),
            PartKind::Type => Specificity::new(0, 0, 1),
            PartKind::Universal => Specificity::ZERO,
        }
    }
}

/// Attribute comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr^=value]`
    Prefix,
    /// `[attr$=value]`
    Suffix,
    /// `[attr*=value]`
    Contains,
}

impl AttrOp {
    fn as_str(self) -> &'static str {
        match self {
            AttrOp::Exists => "",
            AttrOp::Equals => "=",
            AttrOp::Prefix => "^=",
            AttrOp::Suffix => "$=",
            AttrOp::Contains => "*=",
        }
    }
}

/// An attribute test such as `[role='dialog']`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    pub name: String,
    pub op: AttrOp,
    pub value: Option<String>,
}

impl AttributeSelector {
    /// Test an attribute value (`None` when the widget lacks the attribute)
    pub fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let expected = self.value.as_deref().unwrap_or("");
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == expected,
            AttrOp::Prefix => actual.starts_with(expected),
            AttrOp::Suffix => actual.ends_with(expected),
            AttrOp::Contains => actual.contains(expected),
        }
    }
}

/// Pseudo-class evaluated against live widget state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    Enabled,
    Disabled,
    Visible,
    Hidden,
    Focused,
    /// Resolved through a pseudo-class matcher registered on the matcher
    Custom(String),
}

impl PseudoClass {
    pub fn from_name(name: &str) -> Self {
        match name {
            "enabled" => PseudoClass::Enabled,
            "disabled" => PseudoClass::Disabled,
            "visible" => PseudoClass::Visible,
            "hidden" => PseudoClass::Hidden,
            "focused" | "focus" => PseudoClass::Focused,
            other => PseudoClass::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PseudoClass::Enabled => "enabled",
            PseudoClass::Disabled => "disabled",
            PseudoClass::Visible => "visible",
            PseudoClass::Hidden => "hidden",
            PseudoClass::Focused => "focused",
            PseudoClass::Custom(name) => name,
        }
    }
}

/// One simple selector within a parsed selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorPart {
    pub kind: PartKind,
    /// Id, class or type name, attribute name, pseudo-class name, or `*`
    pub value: String,
    /// Set for [`PartKind::Attribute`]
    pub attribute: Option<AttributeSelector>,
    /// Set for [`PartKind::Pseudo`]
    pub pseudo: Option<PseudoClass>,
    /// Index of the compound this part came from
    pub compound: usize,
}

impl SelectorPart {
    /// Whether the part depends on live widget state
    pub fn is_live(&self) -> bool {
        self.kind == PartKind::Pseudo
    }

    fn write_css(&self, out: &mut String) {
        match self.kind {
            PartKind::Id => {
                out.push('#');
                out.push_str(&self.value);
            }
            PartKind::Class => {
                out.push('.');
                out.push_str(&self.value);
            }
            PartKind::Type => out.push_str(&self.value),
            PartKind::Universal => out.push('*'),
            PartKind::Attribute => {
                out.push('[');
                out.push_str(&self.value);
                if let Some(attr) = &self.attribute {
                    if let Some(expected) = &attr.value {
                        out.push_str(attr.op.as_str());
                        out.push('\'');
                        out.push_str(expected);
                        out.push('\'');
                    }
                }
                out.push(']');
            }
            PartKind::Pseudo => {
                out.push(':');
                let name = self.pseudo.as_ref().map(|p| p.name()).unwrap_or(self.value.as_str());
                out.push_str(name);
            }
        }
    }
}

/// Relationship between two compounds (recorded, not walked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Whitespace
    Descendant,
    /// `>`
    Child,
}

/// A parsed selector with its specificity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    canonical: String,
    parts: SmallVec<[SelectorPart; 4]>,
    combinators: SmallVec<[Combinator; 2]>,
    specificity: Specificity,
    fingerprint: u64,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(input: &str) -> Result<Self> {
        parse(input)
    }

    /// The selector text as written (trimmed)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Normalized text, e.g. `A>B` and `A > B` share `A > B`
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn parts(&self) -> &[SelectorPart] {
        &self.parts
    }

    pub fn combinators(&self) -> &[Combinator] {
        &self.combinators
    }

    pub fn compound_count(&self) -> usize {
        self.combinators.len() + 1
    }

    pub fn specificity(&self) -> Specificity {
        self.specificity
    }

    /// Stable identity of the canonical selector, used in cache keys
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Whether any part depends on live widget state
    pub fn is_live(&self) -> bool {
        self.parts.iter().any(SelectorPart::is_live)
    }

    /// Parts that depend only on identity, type, classes and attributes
    pub fn structural_parts(&self) -> impl Iterator<Item = &SelectorPart> {
        self.parts.iter().filter(|p| !p.is_live())
    }

    /// Parts evaluated against live widget state
    pub fn live_parts(&self) -> impl Iterator<Item = &SelectorPart> {
        self.parts.iter().filter(|p| p.is_live())
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_css(&mut out);
        f.write_str(&out)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

// =============================================================================
// GRAMMAR
// =============================================================================

#[derive(Debug, Clone)]
enum Simple<'a> {
    Universal,
    Type(&'a str),
    Id(&'a str),
    Class(&'a str),
    Attr(AttributeSelector),
    Pseudo(&'a str),
}

fn name(input: &str) -> PResult<'_, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn type_name(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

fn quoted(input: &str) -> PResult<'_, &str> {
    alt((
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
    ))(input)
}

fn attr_op(input: &str) -> PResult<'_, AttrOp> {
    alt((
        value(AttrOp::Prefix, tag("^=")),
        value(AttrOp::Suffix, tag("$=")),
        value(AttrOp::Contains, tag("*=")),
        value(AttrOp::Equals, tag("=")),
    ))(input)
}

fn attribute_body(input: &str) -> PResult<'_, AttributeSelector> {
    let (input, _) = multispace0(input)?;
    let (input, attr) = context("attribute name", name)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, test) = opt(pair(
        attr_op,
        preceded(multispace0, context("attribute value", alt((quoted, name)))),
    ))(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = context("closing ']'", char(']'))(input)?;

    let selector = match test {
        Some((op, expected)) => AttributeSelector {
            name: attr.to_string(),
            op,
            value: Some(expected.to_string()),
        },
        None => AttributeSelector {
            name: attr.to_string(),
            op: AttrOp::Exists,
            value: None,
        },
    };
    Ok((input, selector))
}

fn simple(input: &str) -> PResult<'_, Simple<'_>> {
    alt((
        value(Simple::Universal, char('*')),
        map(preceded(char('#'), cut(context("id", name))), Simple::Id),
        map(preceded(char('.'), cut(context("class name", name))), Simple::Class),
        map(preceded(char('['), cut(attribute_body)), Simple::Attr),
        map(
            preceded(char(':'), cut(context("pseudo-class", name))),
            Simple::Pseudo,
        ),
        map(type_name, Simple::Type),
    ))(input)
}

fn compound(input: &str) -> PResult<'_, (&str, Vec<Simple<'_>>)> {
    context("selector", consumed(many1(simple)))(input)
}

fn combinator(input: &str) -> PResult<'_, Combinator> {
    alt((
        value(
            Combinator::Child,
            delimited(multispace0, char('>'), multispace0),
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

type Compound<'a> = (&'a str, Vec<Simple<'a>>);

fn selector_body(input: &str) -> PResult<'_, (Compound<'_>, Vec<(Combinator, Compound<'_>)>)> {
    pair(compound, many0(pair(combinator, compound)))(input)
}

/// Parse a selector string
pub fn parse(input: &str) -> Result<Selector> {
    let source = input.trim();
    if source.is_empty() {
        return Err(SelectorError::Empty);
    }

    let (_, (first, rest)) = all_consuming(selector_body)(source)
        .finish()
        .map_err(|err| syntax_error(source, err))?;

    let mut compounds = Vec::with_capacity(rest.len() + 1);
    let mut combinators: SmallVec<[Combinator; 2]> = SmallVec::new();
    compounds.push(first);
    for (comb, comp) in rest {
        combinators.push(comb);
        compounds.push(comp);
    }

    let mut parts: SmallVec<[SelectorPart; 4]> = SmallVec::new();
    for (index, (text, simples)) in compounds.into_iter().enumerate() {
        for (position, simple) in simples.into_iter().enumerate() {
            if position > 0 && matches!(simple, Simple::Universal | Simple::Type(_)) {
                return Err(SelectorError::Syntax {
                    selector: source.to_string(),
                    column: column_of(source, text),
                    message: "type or universal selector must start a compound".to_string(),
                });
            }
            parts.push(build_part(simple, index));
        }
    }

    let specificity = parts
        .iter()
        .fold(Specificity::ZERO, |acc, p| acc.add(p.kind.specificity()));
    let canonical = canonical_text(&parts, &combinators);
    let mut hasher = FxHasher::default();
    canonical.hash(&mut hasher);

    trace!(selector = source, %specificity, "parsed selector");

    Ok(Selector {
        source: source.to_string(),
        canonical,
        parts,
        combinators,
        specificity,
        fingerprint: hasher.finish(),
    })
}

fn build_part(simple: Simple<'_>, compound: usize) -> SelectorPart {
    let (kind, value, attribute, pseudo) = match simple {
        Simple::Universal => (PartKind::Universal, "*".to_string(), None, None),
        Simple::Type(name) => (PartKind::Type, name.to_string(), None, None),
        Simple::Id(name) => (PartKind::Id, name.to_string(), None, None),
        Simple::Class(name) => (PartKind::Class, name.to_string(), None, None),
        Simple::Attr(attr) => (PartKind::Attribute, attr.name.clone(), Some(attr), None),
        Simple::Pseudo(name) => (
            PartKind::Pseudo,
            name.to_string(),
            None,
            Some(PseudoClass::from_name(name)),
        ),
    };
    SelectorPart {
        kind,
        value,
        attribute,
        pseudo,
        compound,
    }
}

fn canonical_text(parts: &[SelectorPart], combinators: &[Combinator]) -> String {
    let mut out = String::new();
    let mut current = 0;
    for part in parts {
        if part.compound != current {
            out.push_str(match combinators.get(current) {
                Some(Combinator::Child) => " > ",
                _ => " ",
            });
            current = part.compound;
        }
        part.write_css(&mut out);
    }
    out
}

fn column_of(source: &str, fragment: &str) -> usize {
    let offset = source.len().saturating_sub(fragment.len());
    source
        .get(..offset)
        .map(|prefix| prefix.chars().count())
        .unwrap_or(0)
        + 1
}

fn syntax_error(source: &str, err: VerboseError<&str>) -> SelectorError {
    let contexts: Vec<&str> = err
        .errors
        .iter()
        .filter_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some(*ctx),
            _ => None,
        })
        .collect();

    let (column, message) = match err.errors.first() {
        Some((fragment, kind)) => {
            let message = match (contexts.first(), kind) {
                (Some(ctx), _) if *ctx != "selector" => format!("expected {}", ctx),
                (_, VerboseErrorKind::Char(c)) => format!("expected '{}'", c),
                (_, VerboseErrorKind::Nom(ErrorKind::Eof)) => "unexpected trailing input".to_string(),
                (_, VerboseErrorKind::Nom(_)) | (_, VerboseErrorKind::Context(_)) => {
                    "expected a selector".to_string()
                }
            };
            (column_of(source, fragment), message_near(message, fragment))
        }
        None => (1, "malformed selector".to_string()),
    };

    SelectorError::Syntax {
        selector: source.to_string(),
        column,
        message,
    }
}

fn message_near(message: String, fragment: &str) -> String {
    if fragment.is_empty() {
        return format!("{} at end of input", message);
    }
    let near: String = fragment.chars().take(16).collect();
    format!("{} near \"{}\"", message, near)
}
