//! Small CSS selector engine for the in-memory document.
//!
//! Supports type, universal, `#id`, `.class`, `[attr]` and `[attr=value]`
//! simple selectors, compound selectors, the descendant and child (`>`)
//! combinators, and comma-separated lists. Anything else fails to parse, and
//! a selector that fails to parse matches nothing.

use super::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
	Descendant,
	Child,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
	attrs: Vec<(String, Option<String>)>,
}

impl Compound {
	fn is_empty(&self) -> bool {
		self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
	}
}

/// Compound selectors, leftmost first. The combinator of entry `i` links it
/// to entry `i - 1`; the first entry's combinator is unused.
type Complex = Vec<(Combinator, Compound)>;

/// Parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorList(Vec<Complex>);

/// Read access to the tree a selector is matched against.
pub(crate) trait SelectorTarget {
	/// Lowercase tag name, `None` for non-elements.
	fn tag(&self, node: NodeId) -> Option<&str>;
	fn attr(&self, node: NodeId, name: &str) -> Option<&str>;
	/// Parent element, `None` at the top of a document.
	fn parent_element(&self, node: NodeId) -> Option<NodeId>;
}

impl SelectorList {
	pub(crate) fn parse(input: &str) -> Option<Self> {
		let mut list = Vec::new();
		for part in input.split(',') {
			list.push(parse_complex(part)?);
		}
		Some(Self(list))
	}

	pub(crate) fn matches(&self, tree: &impl SelectorTarget, node: NodeId) -> bool {
		tree.tag(node).is_some() && self.0.iter().any(|complex| matches_complex(tree, node, complex))
	}
}

struct Cursor<'a> {
	chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl Cursor<'_> {
	fn skip_ws(&mut self) -> bool {
		let mut skipped = false;
		while self.chars.next_if(|c| c.is_whitespace()).is_some() {
			skipped = true;
		}
		skipped
	}

	fn ident(&mut self) -> Option<String> {
		let mut out = String::new();
		while let Some(c) = self.chars.next_if(|&c| c.is_alphanumeric() || c == '-' || c == '_') {
			out.push(c);
		}
		(!out.is_empty()).then_some(out)
	}

	fn value(&mut self) -> Option<String> {
		match self.chars.peek().copied() {
			Some(quote @ ('"' | '\'')) => {
				self.chars.next();
				let mut out = String::new();
				loop {
					match self.chars.next()? {
						c if c == quote => return Some(out),
						c => out.push(c),
					}
				}
			}
			_ => self.ident(),
		}
	}
}

fn parse_complex(input: &str) -> Option<Complex> {
	let mut cursor = Cursor {
		chars: input.trim().chars().peekable(),
	};
	let mut parts = Vec::new();
	let mut combinator = Combinator::Descendant;

	loop {
		let compound = parse_compound(&mut cursor)?;
		parts.push((combinator, compound));

		let had_ws = cursor.skip_ws();
		match cursor.chars.peek() {
			None => break,
			Some('>') => {
				cursor.chars.next();
				cursor.skip_ws();
				combinator = Combinator::Child;
			}
			Some(_) if had_ws => combinator = Combinator::Descendant,
			Some(_) => return None,
		}
	}

	Some(parts)
}

fn parse_compound(cursor: &mut Cursor<'_>) -> Option<Compound> {
	let mut compound = Compound::default();
	let mut universal = false;

	if cursor.chars.next_if_eq(&'*').is_some() {
		universal = true;
	} else if let Some(tag) = cursor.ident() {
		compound.tag = Some(tag.to_ascii_lowercase());
	}

	loop {
		match cursor.chars.peek() {
			Some('#') => {
				cursor.chars.next();
				compound.id = Some(cursor.ident()?);
			}
			Some('.') => {
				cursor.chars.next();
				compound.classes.push(cursor.ident()?);
			}
			Some('[') => {
				cursor.chars.next();
				cursor.skip_ws();
				let name = cursor.ident()?.to_ascii_lowercase();
				cursor.skip_ws();
				let value = if cursor.chars.next_if_eq(&'=').is_some() {
					cursor.skip_ws();
					Some(cursor.value()?)
				} else {
					None
				};
				cursor.skip_ws();
				cursor.chars.next_if_eq(&']')?;
				compound.attrs.push((name, value));
			}
			_ => break,
		}
	}

	(universal || !compound.is_empty()).then_some(compound)
}

fn matches_compound(tree: &impl SelectorTarget, node: NodeId, compound: &Compound) -> bool {
	let Some(tag) = tree.tag(node) else {
		return false;
	};
	if compound.tag.as_deref().is_some_and(|want| want != tag) {
		return false;
	}
	if let Some(id) = &compound.id {
		if tree.attr(node, "id") != Some(id.as_str()) {
			return false;
		}
	}
	if !compound.classes.is_empty() {
		let classes: Vec<&str> = tree.attr(node, "class").unwrap_or_default().split_whitespace().collect();
		if !compound.classes.iter().all(|want| classes.contains(&want.as_str())) {
			return false;
		}
	}
	compound.attrs.iter().all(|(name, value)| match (tree.attr(node, name), value) {
		(Some(actual), Some(want)) => actual == want,
		(Some(_), None) => true,
		(None, _) => false,
	})
}

fn matches_complex(tree: &impl SelectorTarget, node: NodeId, parts: &[(Combinator, Compound)]) -> bool {
	let Some(((combinator, compound), rest)) = parts.split_last() else {
		return true;
	};
	if !matches_compound(tree, node, compound) {
		return false;
	}
	if rest.is_empty() {
		return true;
	}

	match combinator {
		Combinator::Child => tree
			.parent_element(node)
			.is_some_and(|parent| matches_complex(tree, parent, rest)),
		Combinator::Descendant => {
			let mut ancestor = tree.parent_element(node);
			while let Some(current) = ancestor {
				if matches_complex(tree, current, rest) {
					return true;
				}
				ancestor = tree.parent_element(current);
			}
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_compound_and_combinators() {
		let list = SelectorList::parse("main > button.primary[type=submit], #cancel").unwrap();
		assert_eq!(list.0.len(), 2);
		assert_eq!(list.0[0].len(), 2);
		assert_eq!(list.0[0][1].0, Combinator::Child);
		assert_eq!(list.0[0][1].1.tag.as_deref(), Some("button"));
		assert_eq!(list.0[0][1].1.classes, ["primary"]);
		assert_eq!(list.0[0][1].1.attrs, [("type".to_string(), Some("submit".to_string()))]);
		assert_eq!(list.0[1][0].1.id.as_deref(), Some("cancel"));
	}

	#[test]
	fn quoted_attribute_values_keep_spaces() {
		let list = SelectorList::parse(r#"[aria-label="Close dialog"]"#).unwrap();
		assert_eq!(
			list.0[0][0].1.attrs,
			[("aria-label".to_string(), Some("Close dialog".to_string()))]
		);
	}

	#[test]
	fn rejects_unsupported_syntax() {
		assert!(SelectorList::parse("").is_none());
		assert!(SelectorList::parse("button:hover").is_none());
		assert!(SelectorList::parse("a ~ b").is_none());
		assert!(SelectorList::parse("[unterminated").is_none());
		assert!(SelectorList::parse("div,").is_none());
	}

	#[test]
	fn universal_selector_parses() {
		let list = SelectorList::parse("*").unwrap();
		assert!(list.0[0][0].1.is_empty());
	}
}
