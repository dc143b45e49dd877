//! Minimal CSS selector engine over `DomNode` trees
//!
//! Supports what the console selectors need: type and universal selectors,
//! `#id`, `.class`, attribute tests (`[a]`, `[a="v"]`, `[a*="v"]`,
//! `[a^="v"]`, `[a$="v"]`), the descendant combinator and selector lists.

use crate::models::DomNode;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
}

impl AttrTest {
    fn matches(&self, node: &DomNode) -> bool {
        let Some(value) = node.attr(&self.name) else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => value == v,
            AttrOp::Contains(v) => !v.is_empty() && value.contains(v.as_str()),
            AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
            AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, node: &DomNode) -> bool {
        if let Some(tag) = &self.tag {
            if &node.tag != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| node.has_class(c)) && self.attrs.iter().all(|a| a.matches(node))
    }
}

/// Compounds joined by descendant combinators, left to right
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

impl Complex {
    /// `ancestors` is ordered outermost first and ends with the parent of `node`
    fn matches(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        let Some((last, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !last.matches(node) {
            return false;
        }

        // Descendant-only chains can be matched greedily from the nearest ancestor.
        let mut remaining = rest.iter().rev().peekable();
        for ancestor in ancestors.iter().rev() {
            match remaining.peek() {
                Some(compound) if compound.matches(ancestor) => {
                    remaining.next();
                }
                Some(_) => {}
                None => break,
            }
        }
        remaining.peek().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        source.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        self.alternatives.iter().any(|c| c.matches(node, ancestors))
    }

    /// Matching descendants of `scope` in document order, like
    /// `scope.querySelectorAll(selector)`. Ancestors above the scope are
    /// not considered.
    pub fn query_all<'a>(&self, scope: &'a DomNode) -> Vec<&'a DomNode> {
        let mut out = Vec::new();
        let mut ancestors = vec![scope];
        self.walk(scope, &mut ancestors, &mut out);
        out
    }

    pub fn query_first<'a>(&self, scope: &'a DomNode) -> Option<&'a DomNode> {
        self.query_all(scope).into_iter().next()
    }

    fn walk<'a>(&self, node: &'a DomNode, ancestors: &mut Vec<&'a DomNode>, out: &mut Vec<&'a DomNode>) {
        for child in node.child_elements() {
            if self.matches(child, ancestors) {
                out.push(child);
            }
            ancestors.push(child);
            self.walk(child, ancestors, out);
            ancestors.pop();
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let error = |reason: &str| SelectorError {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut alternatives = Vec::new();
        for part in split_outside_brackets(source, |c| c == ',') {
            let compounds = split_outside_brackets(&part, char::is_whitespace)
                .iter()
                .filter(|s| !s.is_empty())
                .map(|s| parse_compound(s).map_err(|reason| error(&reason)))
                .collect::<Result<Vec<_>, _>>()?;
            if compounds.is_empty() {
                return Err(error("empty selector"));
            }
            alternatives.push(Complex { compounds });
        }

        if alternatives.is_empty() {
            return Err(error("empty selector"));
        }

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }
}

/// Split on `is_sep`, ignoring separators inside `[...]` or quotes
fn split_outside_brackets(input: &str, is_sep: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, c) if depth == 0 && is_sep(c) => {
                parts.push(std::mem::take(&mut current).trim().to_string());
            }
            (None, c) => current.push(c),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

fn parse_compound(input: &str) -> Result<Compound, String> {
    let mut compound = Compound::default();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '-' || chars[*i] == '_') {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if i < chars.len() && chars[i] == '*' {
        i += 1;
    } else {
        let tag = read_ident(&mut i);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let id = read_ident(&mut i);
                if id.is_empty() {
                    return Err("empty id".into());
                }
                compound.id = Some(id);
            }
            '.' => {
                i += 1;
                let class = read_ident(&mut i);
                if class.is_empty() {
                    return Err("empty class".into());
                }
                compound.classes.push(class);
            }
            '[' => {
                let end = chars[i..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|p| p + i)
                    .ok_or("unterminated attribute selector")?;
                let body: String = chars[i + 1..end].iter().collect();
                compound.attrs.push(parse_attr(&body)?);
                i = end + 1;
            }
            c => return Err(format!("unexpected character `{c}`")),
        }
    }

    Ok(compound)
}

fn parse_attr(body: &str) -> Result<AttrTest, String> {
    let Some(eq) = body.find('=') else {
        let name = body.trim();
        if name.is_empty() {
            return Err("empty attribute name".into());
        }
        return Ok(AttrTest {
            name: name.to_ascii_lowercase(),
            op: AttrOp::Exists,
        });
    };

    let (lhs, rhs) = body.split_at(eq);
    let value = unquote(rhs[1..].trim());
    let (name, op) = match lhs.chars().last() {
        Some('*') => (&lhs[..lhs.len() - 1], AttrOp::Contains(value)),
        Some('^') => (&lhs[..lhs.len() - 1], AttrOp::Prefix(value)),
        Some('$') => (&lhs[..lhs.len() - 1], AttrOp::Suffix(value)),
        _ => (lhs, AttrOp::Equals(value)),
    };

    let name = name.trim();
    if name.is_empty() {
        return Err("empty attribute name".into());
    }
    Ok(AttrTest {
        name: name.to_ascii_lowercase(),
        op,
    })
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
