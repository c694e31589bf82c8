use std::collections::HashMap;

use crate::reader::find_close_bracket;

/// Command names with built-in behavior. User definitions under these names
/// are parsed but dropped.
pub const RESERVED_COMMANDS: &[&str] = &[
    r"\matrix",
    r"\pmatrix",
    r"\dmatrix",
    r"\ematrix",
    r"\simop",
    r"\eqop",
    r"\arrop",
];

/// One user macro: how many `#k` placeholders it consumes and the replacement
/// template they are substituted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub arity: usize,
    pub template: String,
}

/// The user's `\newcommand` definitions.
///
/// Built once from the definitions file before any request is processed and
/// never mutated afterwards; expansion only reads it.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    commands: HashMap<String, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `\newcommand{<name>}[<arity>]{<template>}` occurrence in
    /// `text`. Malformed definitions are skipped, duplicate names are
    /// last-definition-wins, reserved names are dropped.
    pub fn parse(text: &str) -> Self {
        let text: String = text.replace(['\n', '\r'], "");
        let mut table = Self::new();
        let mut search = 0;
        while let Some(off) = text[search..].find(r"\newcommand") {
            let at = search + off;
            search = at + r"\newcommand".len();
            if let Some((name, def)) = parse_definition(&text, search) {
                if !RESERVED_COMMANDS.contains(&name.as_str()) {
                    table.commands.insert(name, def);
                }
            }
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.commands.get(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Parses the `{<name>}[<arity>]{<template>}` tail of one definition,
/// starting just past the `\newcommand` token. Returns `None` when the tail
/// does not match the grammar.
fn parse_definition(text: &str, pos: usize) -> Option<(String, MacroDef)> {
    let mut pos = skip_blanks(text, pos);
    if !text[pos..].starts_with('{') {
        return None;
    }
    pos = skip_blanks(text, pos + 1);
    if !text[pos..].starts_with('\\') {
        return None;
    }
    let name_start = pos;
    pos += 1;
    let letters = text[pos..]
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    if letters == 0 {
        return None;
    }
    pos += letters;
    let name = text[name_start..pos].to_string();

    pos = skip_blanks(text, pos);
    if !text[pos..].starts_with('}') {
        return None;
    }
    pos = skip_blanks(text, pos + 1);

    let mut arity = 0;
    if text[pos..].starts_with('[') {
        let digits: String = text[pos + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() || !text[pos + 1 + digits.len()..].starts_with(']') {
            return None;
        }
        arity = digits.parse().ok()?;
        pos = skip_blanks(text, pos + digits.len() + 2);
    }

    if !text[pos..].starts_with('{') {
        return None;
    }
    let closing = find_close_bracket(text, pos, '{', '}').ok()?;
    let template = text[pos + 1..closing].to_string();
    Some((name, MacroDef { arity, template }))
}

fn skip_blanks(text: &str, mut pos: usize) -> usize {
    while text[pos..].starts_with([' ', '\t']) {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_definition() {
        let table = MacroTable::parse(r"\newcommand{\f}[2]{#2-#1}");
        let def = table.get(r"\f").unwrap();
        assert_eq!(def.arity, 2);
        assert_eq!(def.template, "#2-#1");
    }

    #[test]
    fn test_arity_defaults_to_zero() {
        let table = MacroTable::parse(r"\newcommand{\id}{\mathbb{1}}");
        let def = table.get(r"\id").unwrap();
        assert_eq!(def.arity, 0);
        assert_eq!(def.template, r"\mathbb{1}");
    }

    #[test]
    fn test_nested_braces_in_template() {
        let table = MacroTable::parse(r"\newcommand{\v}[1]{\vec{x_{#1}}}");
        assert_eq!(table.get(r"\v").unwrap().template, r"\vec{x_{#1}}");
    }

    #[test]
    fn test_multiline_definition() {
        let table = MacroTable::parse("\\newcommand{\\f}\n[1]\n{a\n#1}");
        assert_eq!(table.get(r"\f").unwrap().template, "a#1");
    }

    #[test]
    fn test_several_definitions() {
        let table = MacroTable::parse(concat!(
            r"\newcommand{\a}{x}",
            " some text between ",
            r"\newcommand{\b}[1]{y#1}",
        ));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(r"\a").unwrap().template, "x");
        assert_eq!(table.get(r"\b").unwrap().arity, 1);
    }

    #[test]
    fn test_last_definition_wins() {
        let table = MacroTable::parse(concat!(
            r"\newcommand{\f}{first}",
            r"\newcommand{\f}{second}",
        ));
        assert_eq!(table.get(r"\f").unwrap().template, "second");
    }

    #[test]
    fn test_reserved_names_dropped() {
        let table = MacroTable::parse(concat!(
            r"\newcommand{\matrix}{broken}",
            r"\newcommand{\simop}{also broken}",
            r"\newcommand{\ok}{fine}",
        ));
        assert_eq!(table.len(), 1);
        assert!(table.get(r"\matrix").is_none());
        assert!(table.get(r"\simop").is_none());
    }

    #[test]
    fn test_malformed_definitions_skipped() {
        for text in [
            r"\newcommand{f}{x}",
            r"\newcommand{\f}[a]{x}",
            r"\newcommand{\f}{x",
            r"\newcommand \f {x}",
        ] {
            let table = MacroTable::parse(text);
            assert!(table.is_empty(), "accepted {text}");
        }
    }
}
