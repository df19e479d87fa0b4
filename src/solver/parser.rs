//! Solver program parser.
//!
//! Hand-written line-based parser for the concrete syntax the pipeline
//! renders: one statement per line, `%` comments, quoted string constants,
//! uppercase variables, and the anonymous placeholder `_`.
//!
//! ```text
//! seed("bn:00000001n").
//! subclass_of("bn:00000001n","bn:00000002n").
//! common(E) :- entity(E), not notAncestor(E).
//! ```

use super::ast::{Atom, BodyPredicate, Program, Rule, Term};
use super::SolverError;

/// Parse a full program
pub fn parse_program(source: &str) -> Result<Program, SolverError> {
    let mut program = Program::new();

    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let statement = line.strip_suffix('.').ok_or_else(|| SolverError::Parse {
            line: line_no,
            message: format!("statement is not terminated by '.': {line}"),
        })?;

        program.add_rule(parse_rule(statement.trim(), line_no)?);
    }

    Ok(program)
}

/// Find the start of a `%` comment, respecting string literals
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        if c == '"' {
            in_string = !in_string;
        } else if c == '%' && !in_string {
            return &line[..i];
        }
    }
    line
}

/// Parse one statement: `head.` or `head :- body.`
fn parse_rule(statement: &str, line: usize) -> Result<Rule, SolverError> {
    match split_implication(statement) {
        Some((head_text, body_text)) => {
            let head = parse_atom(head_text.trim(), line)?;
            let mut body = Vec::new();
            for item in split_top_level(body_text) {
                let item = item.trim();
                if item.is_empty() {
                    return Err(SolverError::Parse {
                        line,
                        message: "empty body literal".to_string(),
                    });
                }
                if let Some(negated) = item.strip_prefix("not ") {
                    body.push(BodyPredicate::Negated(parse_atom(negated.trim(), line)?));
                } else {
                    body.push(BodyPredicate::Positive(parse_atom(item, line)?));
                }
            }
            if body.is_empty() {
                return Err(SolverError::Parse {
                    line,
                    message: "rule body is empty".to_string(),
                });
            }
            Ok(Rule::new(head, body))
        }
        None => {
            let head = parse_atom(statement, line)?;
            Ok(Rule::new(head, vec![]))
        }
    }
}

/// Locate `:-` outside string literals
fn split_implication(statement: &str) -> Option<(&str, &str)> {
    let bytes = statement.as_bytes();
    let mut in_string = false;
    for i in 0..bytes.len().saturating_sub(1) {
        let c = bytes[i] as char;
        if c == '"' {
            in_string = !in_string;
        } else if !in_string && c == ':' && bytes[i + 1] as char == '-' {
            return Some((&statement[..i], &statement[i + 2..]));
        }
    }
    None
}

/// Split on commas outside parentheses and string literals
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Parse `relation(arg, ..., arg)`
fn parse_atom(text: &str, line: usize) -> Result<Atom, SolverError> {
    let open = text.find('(').ok_or_else(|| SolverError::Parse {
        line,
        message: format!("expected '(' in atom: {text}"),
    })?;
    if !text.ends_with(')') {
        return Err(SolverError::Parse {
            line,
            message: format!("expected ')' at end of atom: {text}"),
        });
    }

    let relation = text[..open].trim();
    if relation.is_empty()
        || !relation
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SolverError::Parse {
            line,
            message: format!("invalid relation name: {relation}"),
        });
    }

    let args_text = &text[open + 1..text.len() - 1];
    let mut args = Vec::new();
    if !args_text.trim().is_empty() {
        for part in split_top_level(args_text) {
            args.push(parse_term(part.trim(), line)?);
        }
    }

    Ok(Atom::new(relation.to_string(), args))
}

fn parse_term(text: &str, line: usize) -> Result<Term, SolverError> {
    if text == "_" {
        return Ok(Term::Placeholder);
    }

    if let Some(stripped) = text.strip_prefix('"') {
        let value = stripped.strip_suffix('"').ok_or_else(|| SolverError::Parse {
            line,
            message: format!("unterminated string constant: {text}"),
        })?;
        if value.contains('"') {
            return Err(SolverError::Parse {
                line,
                message: format!("malformed string constant: {text}"),
            });
        }
        return Ok(Term::Constant(value.to_string()));
    }

    let first = text.chars().next().ok_or_else(|| SolverError::Parse {
        line,
        message: "empty term".to_string(),
    })?;
    if !text
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(SolverError::Parse {
            line,
            message: format!("invalid term: {text}"),
        });
    }

    if first.is_ascii_uppercase() {
        Ok(Term::Variable(text.to_string()))
    } else {
        // Bare lowercase symbols are constants, clingo style
        Ok(Term::Constant(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ground_fact() {
        let program = parse_program("seed(\"bn:00000001n\").\n").unwrap();
        assert_eq!(program.rules.len(), 1);
        let rule = &program.rules[0];
        assert!(rule.is_fact());
        assert_eq!(rule.head.relation, "seed");
        assert_eq!(
            rule.head.args,
            vec![Term::Constant("bn:00000001n".to_string())]
        );
    }

    #[test]
    fn test_parse_rule_with_negation() {
        let program =
            parse_program("common(E) :- entity(E), not notAncestor(E).").unwrap();
        let rule = &program.rules[0];
        assert_eq!(rule.body.len(), 2);
        assert!(rule.body[0].is_positive());
        assert!(rule.body[1].is_negated());
        assert_eq!(rule.body[1].atom().relation, "notAncestor");
    }

    #[test]
    fn test_parse_placeholder_argument() {
        let program = parse_program("entity(X) :- is_a(X,_).").unwrap();
        let rule = &program.rules[0];
        assert_eq!(rule.body[0].atom().args[1], Term::Placeholder);
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let source = "% transitive closure\n\nis_a(X,Y) :- subclass_of(X,Y). % collapse\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.rules.len(), 1);
    }

    #[test]
    fn test_percent_inside_string_is_not_a_comment() {
        let program = parse_program("seed(\"a%b\").").unwrap();
        assert_eq!(
            program.rules[0].head.args,
            vec![Term::Constant("a%b".to_string())]
        );
    }

    #[test]
    fn test_missing_terminator_is_an_error() {
        let err = parse_program("seed(\"bn:00000001n\")").unwrap_err();
        assert!(matches!(err, SolverError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_malformed_atom_is_an_error() {
        assert!(parse_program("seed bn.").is_err());
        assert!(parse_program("seed(\"x).").is_err());
        assert!(parse_program("se ed(\"x\").").is_err());
    }

    #[test]
    fn test_whole_lca_program_shape_parses() {
        let source = r#"
seed("bn:00000001n").
seed("bn:00000002n").
subclass_of("bn:00000001n","bn:00000003n").
entity(X) :- is_a(X,_).
entity(X) :- is_a(_,X).
notAncestor(E) :- seed(S), entity(E), not is_a(S,E).
common(E) :- entity(E), not notAncestor(E).
equiv(X,Y) :- is_a(X,Y), is_a(Y,X).
noLeastCommon(E) :- common(E), is_a(C,E), common(C), not equiv(C,E).
leastCommon(X) :- common(X), not noLeastCommon(X).
subclass_of(X,Z) :- subclass_of(X,Y), subclass_of(Y,Z).
is_a(X,Y) :- subclass_of(X,Y).
"#;
        let program = parse_program(source).unwrap();
        assert_eq!(program.rules.len(), 12);
        assert!(program.rules.iter().all(Rule::is_safe));
    }
}
