//! Syntax of grammar definition files.
//!
//! ```text
//! TERMINALS a b
//! NONTERMINALS S
//! ##
//! S -> a S b | EPS
//! ```
//!
//! The declaration section lists terminal and nonterminal names, the first
//! nonterminal being the start symbol. After the `##` separator, each line
//! declares the alternatives of one left-hand side. Symbols are separated by
//! whitespace and `EPS` stands for the empty body.

use crate::grammar::GrammarError;

const KW_TERMINALS: &str = "TERMINALS";
const KW_NONTERMINALS: &str = "NONTERMINALS";
const SEPARATOR: &str = "##";

#[derive(Debug, Default, PartialEq)]
pub struct Grammar {
    pub terminals: Vec<String>,
    pub nonterminals: Vec<String>,
    pub rules: Vec<RuleDesc>,
}

#[derive(Debug, PartialEq)]
pub struct RuleDesc {
    /// 1-based line number of the declaration.
    pub line: usize,
    pub left: String,
    pub alternatives: Vec<Vec<String>>,
}

pub fn parse(source: &str) -> Result<Grammar, GrammarError> {
    let _entered = tracing::trace_span!("parse").entered();

    let mut grammar = Grammar::default();
    let mut in_rules = false;
    let mut last_line = 0;

    for (i, line) in source.lines().enumerate() {
        let lineno = i + 1;
        last_line = lineno;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line == SEPARATOR {
            if in_rules {
                return Err(syntax_error(lineno, "duplicated `##' separator"));
            }
            in_rules = true;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if in_rules {
            let rule = parse_rule(lineno, line)?;
            tracing::trace!("rule at line {}: {:?}", lineno, rule);
            grammar.rules.push(rule);
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some(KW_TERMINALS) => grammar.terminals.extend(words.map(ToOwned::to_owned)),
            Some(KW_NONTERMINALS) => grammar.nonterminals.extend(words.map(ToOwned::to_owned)),
            _ if line.contains("->") => {
                return Err(syntax_error(
                    lineno,
                    "production rule found before the `##' separator",
                ))
            }
            Some(word) => {
                return Err(syntax_error(
                    lineno,
                    format!("unknown declaration `{}'", word),
                ))
            }
            None => unreachable!("blank lines are skipped"),
        }
    }

    if !in_rules {
        return Err(syntax_error(
            last_line.max(1),
            "missing `##' separator before the production rules",
        ));
    }

    Ok(grammar)
}

fn parse_rule(lineno: usize, line: &str) -> Result<RuleDesc, GrammarError> {
    let (left, right) = line
        .split_once("->")
        .ok_or_else(|| syntax_error(lineno, "expected `LHS -> RHS'"))?;

    let mut left_words = left.split_whitespace();
    let left = match (left_words.next(), left_words.next()) {
        (Some(left), None) => left.to_owned(),
        _ => {
            return Err(syntax_error(
                lineno,
                "the left-hand side must be exactly one symbol",
            ))
        }
    };

    let mut alternatives = vec![];
    for alternative in right.split('|') {
        let symbols: Vec<String> = alternative.split_whitespace().map(ToOwned::to_owned).collect();
        if symbols.is_empty() {
            return Err(syntax_error(
                lineno,
                "empty alternative (write `EPS' for the empty production)",
            ));
        }
        alternatives.push(symbols);
    }

    Ok(RuleDesc {
        line: lineno,
        left,
        alternatives,
    })
}

fn syntax_error(line: usize, msg: impl Into<String>) -> GrammarError {
    GrammarError::Syntax {
        line,
        msg: msg.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(ToOwned::to_owned).collect()
    }

    #[test]
    fn parse_declarations_and_rules() {
        let grammar = parse(
            "# balanced strings\n\
             TERMINALS a b\n\
             NONTERMINALS S\n\
             \n\
             ##\n\
             S -> a S b | EPS\n",
        )
        .unwrap();

        assert_eq!(grammar.terminals, words("a b"));
        assert_eq!(grammar.nonterminals, words("S"));
        assert_eq!(
            grammar.rules,
            vec![RuleDesc {
                line: 6,
                left: "S".into(),
                alternatives: vec![words("a S b"), words("EPS")],
            }]
        );
    }

    #[test]
    fn declarations_accumulate() {
        let grammar = parse(
            "TERMINALS a\n\
             TERMINALS b c\n\
             NONTERMINALS S\n\
             NONTERMINALS T\n\
             ##\n\
             S -> T\n\
             S -> a\n",
        )
        .unwrap();

        assert_eq!(grammar.terminals, words("a b c"));
        assert_eq!(grammar.nonterminals, words("S T"));
        assert_eq!(grammar.rules.len(), 2);
        assert_eq!(grammar.rules[1].line, 7);
    }

    #[test]
    fn missing_arrow() {
        let err = parse("TERMINALS a\nNONTERMINALS S\n##\nS a\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 4, .. }), "{}", err);
    }

    #[test]
    fn empty_alternative() {
        let err = parse("TERMINALS a\nNONTERMINALS S\n##\nS -> a |\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 4, .. }), "{}", err);
    }

    #[test]
    fn multiple_symbols_on_left_hand_side() {
        let err = parse("TERMINALS a\nNONTERMINALS S\n##\nS T -> a\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 4, .. }), "{}", err);
    }

    #[test]
    fn rule_before_separator() {
        let err = parse("TERMINALS a\nNONTERMINALS S\nS -> a\n##\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 3, .. }), "{}", err);
    }

    #[test]
    fn unknown_declaration() {
        let err = parse("TOKENS a\n##\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 1, .. }), "{}", err);
    }

    #[test]
    fn missing_separator() {
        let err = parse("TERMINALS a\nNONTERMINALS S\n").unwrap_err();
        assert!(matches!(err, GrammarError::Syntax { line: 2, .. }), "{}", err);
    }
}
