//! Solver AST types.
//!
//! Programs are Datalog with stratified negation: facts, rules with
//! positive and negated body atoms, string constants, and the anonymous
//! placeholder `_`.

use std::collections::HashSet;
use std::fmt;

/// A variable, a string constant, or the anonymous placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Variable(String),
    Constant(String),
    Placeholder,
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    pub fn as_variable(&self) -> Option<&str> {
        if let Term::Variable(name) = self {
            Some(name)
        } else {
            None
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => f.write_str(name),
            Term::Constant(value) => write!(f, "\"{value}\""),
            Term::Placeholder => f.write_str("_"),
        }
    }
}

/// An atom like `subclass_of(X, Y)` or `seed("bn:00000001n")`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub relation: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(relation: String, args: Vec<Term>) -> Self {
        Atom { relation, args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// All variables named in this atom (placeholders excluded)
    pub fn variables(&self) -> HashSet<String> {
        self.args
            .iter()
            .filter_map(|t| t.as_variable().map(str::to_string))
            .collect()
    }

    /// True when every argument is a constant
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_constant)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.relation)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            arg.fmt(f)?;
        }
        f.write_str(")")
    }
}

/// A body literal: positive or negated atom
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyPredicate {
    Positive(Atom),
    Negated(Atom),
}

impl BodyPredicate {
    pub fn atom(&self) -> &Atom {
        match self {
            BodyPredicate::Positive(atom) | BodyPredicate::Negated(atom) => atom,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, BodyPredicate::Positive(_))
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, BodyPredicate::Negated(_))
    }
}

/// A single rule; a rule with an empty body is a fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<BodyPredicate>,
}

impl Rule {
    pub fn new(head: Atom, body: Vec<BodyPredicate>) -> Self {
        Rule { head, body }
    }

    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// All variables bound by positive body atoms
    pub fn positive_body_variables(&self) -> HashSet<String> {
        self.body
            .iter()
            .filter(|pred| pred.is_positive())
            .flat_map(|pred| pred.atom().variables())
            .collect()
    }

    /// Safety (range restriction): head variables and negated-atom
    /// variables must be bound by positive body atoms, facts must be
    /// ground, and a head never carries the placeholder.
    pub fn is_safe(&self) -> bool {
        if self.head.args.iter().any(|t| matches!(t, Term::Placeholder)) {
            return false;
        }

        if self.is_fact() {
            return self.head.is_ground();
        }

        let safe_vars = self.positive_body_variables();

        if !self.head.variables().is_subset(&safe_vars) {
            return false;
        }

        for pred in &self.body {
            if let BodyPredicate::Negated(atom) = pred {
                if !atom.variables().is_subset(&safe_vars) {
                    return false;
                }
            }
        }

        true
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.head.fmt(f)?;
        for (i, pred) in self.body.iter().enumerate() {
            f.write_str(if i == 0 { " :- " } else { ", " })?;
            if pred.is_negated() {
                f.write_str("not ")?;
            }
            pred.atom().fmt(f)?;
        }
        f.write_str(".")
    }
}

/// A complete solver program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub rules: Vec<Rule>,
}

impl Program {
    pub fn new() -> Self {
        Program { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Relations appearing as the head of at least one non-fact rule
    pub fn idbs(&self) -> Vec<String> {
        let mut idbs: Vec<String> = self
            .rules
            .iter()
            .filter(|rule| !rule.is_fact())
            .map(|rule| rule.head.relation.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        idbs.sort();
        idbs
    }

    /// All relation names mentioned anywhere in the program
    pub fn relations(&self) -> Vec<String> {
        let mut all: HashSet<String> = HashSet::new();
        for rule in &self.rules {
            all.insert(rule.head.relation.clone());
            for pred in &rule.body {
                all.insert(pred.atom().relation.clone());
            }
        }
        let mut result: Vec<String> = all.into_iter().collect();
        result.sort();
        result
    }
}
