//! Content expressions: the grammar that constrains a node's children.
//!
//! An expression is a sequence of terms separated by whitespace. Each term is
//! a node or group name, or a parenthesised alternation `(a | b)`, optionally
//! followed by `+`, `*` or `?`. Examples: `block+`, `paragraph block*`,
//! `(tableCell | tableHeader)*`. The empty expression only matches no children.

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::NodeKind;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+|[()|+*?]|\S").expect("token pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    One,
    Optional,
    Star,
    Plus,
}

impl Quantifier {
    fn bounds(self) -> (usize, usize) {
        match self {
            Self::One => (1, 1),
            Self::Optional => (0, 1),
            Self::Star => (0, usize::MAX),
            Self::Plus => (1, usize::MAX),
        }
    }
}

#[derive(Debug, Clone)]
struct Term {
    allowed: Vec<NodeKind>,
    quantifier: Quantifier,
}

impl Term {
    fn allows(&self, kind: NodeKind) -> bool {
        self.allowed.contains(&kind)
    }
}

#[derive(Debug, Clone)]
pub struct ContentExpr {
    source: String,
    terms: Vec<Term>,
}

impl ContentExpr {
    /// Parse `source`, resolving each name to the node kinds it stands for.
    pub fn parse(
        source: &str,
        resolve: impl Fn(&str) -> Option<Vec<NodeKind>>,
    ) -> Result<Self, String> {
        let tokens: Vec<&str> = TOKEN.find_iter(source).map(|m| m.as_str()).collect();
        let lookup = |name: &str| -> Result<Vec<NodeKind>, String> {
            if !is_name(name) {
                return Err(format!("unexpected `{name}`"));
            }
            resolve(name).ok_or_else(|| format!("unknown node or group `{name}`"))
        };

        let mut terms = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            let mut allowed = if tokens[i] == "(" {
                i += 1;
                let mut set = Vec::new();
                loop {
                    let name = tokens.get(i).ok_or("unterminated group")?;
                    set.extend(lookup(*name)?);
                    i += 1;
                    match tokens.get(i) {
                        Some(&"|") => i += 1,
                        Some(&")") => {
                            i += 1;
                            break;
                        }
                        Some(other) => return Err(format!("expected `|` or `)`, found `{other}`")),
                        None => return Err("unterminated group".to_owned()),
                    }
                }
                set
            } else {
                let set = lookup(tokens[i])?;
                i += 1;
                set
            };
            allowed.sort();
            allowed.dedup();

            let quantifier = match tokens.get(i) {
                Some(&"+") => Quantifier::Plus,
                Some(&"*") => Quantifier::Star,
                Some(&"?") => Quantifier::Optional,
                _ => Quantifier::One,
            };
            if quantifier != Quantifier::One {
                i += 1;
            }
            terms.push(Term {
                allowed,
                quantifier,
            });
        }

        Ok(Self {
            source: source.trim().to_owned(),
            terms,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True for the empty expression (leaf nodes).
    pub fn is_leaf(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether `kind` may appear anywhere in a matching sequence.
    pub fn allows(&self, kind: NodeKind) -> bool {
        self.terms.iter().any(|t| t.allows(kind))
    }

    pub fn matches(&self, kinds: &[NodeKind]) -> bool {
        self.match_from(0, kinds)
    }

    // Greedy with backtracking; expressions are short and child lists small.
    fn match_from(&self, term: usize, kinds: &[NodeKind]) -> bool {
        let Some(t) = self.terms.get(term) else {
            return kinds.is_empty();
        };
        let (min, max) = t.quantifier.bounds();
        let run = kinds
            .iter()
            .take(max)
            .take_while(|k| t.allows(**k))
            .count();
        if run < min {
            return false;
        }
        (min..=run)
            .rev()
            .any(|n| self.match_from(term + 1, &kinds[n..]))
    }
}

fn is_name(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
}
