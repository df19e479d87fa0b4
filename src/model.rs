//! # Core Data Model
//!
//! Value types shared by every pipeline stage: validated entity
//! identifiers, free/bound variables, terms, atoms, per-entity summaries,
//! and the per-request response carrier.
//!
//! Atoms, summaries, and variables are immutable values; the engines build
//! new collections instead of mutating in place. The response carrier is
//! the only mutable aggregate and is confined to a single request.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Identifier format: `bn:<8 digits><one of n,v,a,r>`
static ENTITY_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bn:[0-9]{8}[nvar]$").expect("entity id pattern is valid"));

/// Check a candidate identifier against the `bn:<8 digits><pos>` format
pub fn is_valid_entity_id(candidate: &str) -> bool {
    ENTITY_ID_PATTERN.is_match(candidate)
}

/// A validated knowledge-graph entity identifier.
///
/// Construction goes through [`EntityId::new`] (or serde deserialization,
/// which routes through it), so an `EntityId` held anywhere in the core is
/// known to be well-formed. Equality and ordering are by the underlying
/// string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Result<Self, PipelineError> {
        let raw = raw.into();
        if is_valid_entity_id(&raw) {
            Ok(EntityId(raw))
        } else {
            Err(PipelineError::InvalidInput(format!(
                "{raw} is not a valid entity id"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        EntityId::new(raw).map_err(|e| e.to_string())
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A variable occurring in derived atoms.
///
/// Printed as `X_n` when free and `Y_n` when bound; the printed form is the
/// canonical identity, so equality and hashing ignore `origin`. The single
/// free variable of a characterization carries the unit it stands for in
/// `origin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub origin: Vec<EntityId>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub nominal: u32,
}

impl Variable {
    /// The free variable binding a unit
    pub fn free(origin: Vec<EntityId>) -> Self {
        Variable {
            origin,
            is_free: true,
            nominal: 0,
        }
    }

    /// The k-th bound variable of a pairwise characterization
    pub fn bound(nominal: u32) -> Self {
        Variable {
            origin: Vec::new(),
            is_free: false,
            nominal,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            if self.is_free { "X" } else { "Y" },
            self.nominal
        )
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.is_free == other.is_free && self.nominal == other.nominal
    }
}

impl Eq for Variable {}

impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_free.hash(state);
        self.nominal.hash(state);
    }
}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        // Free variables print as X_*, bound ones as Y_*; X sorts first.
        (!self.is_free, self.nominal).cmp(&(!other.is_free, other.nominal))
    }
}

/// Argument of an atom: either an entity constant or a variable.
///
/// Serialized untagged, matching the wire shape: constants are plain
/// strings, variables are objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Term {
    Entity(EntityId),
    Variable(Variable),
}

impl Term {
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn as_entity(&self) -> Option<&EntityId> {
        match self {
            Term::Entity(id) => Some(id),
            Term::Variable(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Entity(id) => id.fmt(f),
            Term::Variable(v) => v.fmt(f),
        }
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        // Printed forms never collide across the variants (entity ids are
        // anchored to the bn: prefix), so entity-before-variable plus the
        // per-variant orders is a total order on printed forms.
        match (self, other) {
            (Term::Entity(a), Term::Entity(b)) => a.cmp(b),
            (Term::Variable(a), Term::Variable(b)) => a.cmp(b),
            (Term::Entity(_), Term::Variable(_)) => Ordering::Less,
            (Term::Variable(_), Term::Entity(_)) => Ordering::Greater,
        }
    }
}

impl From<EntityId> for Term {
    fn from(id: EntityId) -> Self {
        Term::Entity(id)
    }
}

impl From<Variable> for Term {
    fn from(v: Variable) -> Self {
        Term::Variable(v)
    }
}

/// A directed labeled edge between two terms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    #[serde(rename = "source_id")]
    pub source: Term,
    #[serde(rename = "target_id")]
    pub target: Term,
    pub predicate: String,
}

impl Atom {
    pub fn new(source: impl Into<Term>, target: impl Into<Term>, predicate: impl Into<String>) -> Self {
        Atom {
            source: source.into(),
            target: target.into(),
            predicate: predicate.into(),
        }
    }

    /// Whether the predicate is one of the taxonomic relations, in either
    /// spelling
    pub fn is_taxonomic(&self) -> bool {
        is_taxonomic_predicate(&self.predicate)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.predicate, self.source, self.target)
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.source, &self.predicate, &self.target).cmp(&(
            &other.source,
            &other.predicate,
            &other.target,
        ))
    }
}

/// The taxonomic predicate base names, lower spelling
pub const TAXONOMIC_PREDICATES: [&str; 4] = ["is_a", "instance_of", "subclass_of", "part_of"];

/// Case-insensitive membership in the taxonomic predicate set
pub fn is_taxonomic_predicate(predicate: &str) -> bool {
    TAXONOMIC_PREDICATES
        .iter()
        .any(|p| predicate.eq_ignore_ascii_case(p))
}

/// Process-wide predicate spelling, read once from configuration.
///
/// The graph may carry its taxonomic relations in lower or upper case; the
/// same spelling is used for every query, pattern match, and emitted atom
/// within one computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredicateStyle {
    pub upper: bool,
}

impl PredicateStyle {
    pub fn new(upper: bool) -> Self {
        PredicateStyle { upper }
    }

    pub fn is_a(&self) -> &'static str {
        if self.upper {
            "IS_A"
        } else {
            "is_a"
        }
    }

    pub fn instance_of(&self) -> &'static str {
        if self.upper {
            "INSTANCE_OF"
        } else {
            "instance_of"
        }
    }

    pub fn subclass_of(&self) -> &'static str {
        if self.upper {
            "SUBCLASS_OF"
        } else {
            "subclass_of"
        }
    }

    pub fn part_of(&self) -> &'static str {
        if self.upper {
            "PART_OF"
        } else {
            "part_of"
        }
    }
}

/// Sort atoms by `(source, predicate, target)` on printed form and drop
/// structural duplicates. Every externally visible atom list goes through
/// this before it is stored on the carrier.
pub fn canonicalize(mut atoms: Vec<Atom>) -> Vec<Atom> {
    atoms.sort();
    atoms.dedup();
    atoms
}

/// Whether an entity names a concept or a named entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "CONCEPT")]
    Concept,
    #[default]
    #[serde(rename = "NAMED_ENTITY")]
    NamedEntity,
}

/// A resolved knowledge-graph entity, used to enrich reports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub main_sense: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub image_url: String,
}

impl Entity {
    pub fn shown_name(&self) -> String {
        self.main_sense.replace('_', " ")
    }
}

/// The transitively-closed relational summary of one unit member.
///
/// Every atom has the summarized entity as its source. `tops` caches the
/// set of entity endpoints occurring in the atoms and is rebuilt whenever
/// the atoms are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub entity: EntityId,
    #[serde(rename = "summary")]
    pub atoms: Vec<Atom>,
    pub tops: Vec<EntityId>,
}

impl Summary {
    /// Build a summary from raw atoms: deduplicate, sort canonically, and
    /// derive `tops`
    pub fn from_atoms(entity: EntityId, atoms: Vec<Atom>) -> Self {
        let atoms = canonicalize(atoms);
        let tops = derive_tops(&atoms);
        Summary { entity, atoms, tops }
    }

    /// The entity endpoints (sources and targets) occurring in the atoms
    pub fn derived_tops(&self) -> Vec<EntityId> {
        derive_tops(&self.atoms)
    }
}

fn derive_tops(atoms: &[Atom]) -> Vec<EntityId> {
    let mut tops: BTreeSet<EntityId> = BTreeSet::new();
    for atom in atoms {
        if let Term::Entity(id) = &atom.source {
            tops.insert(id.clone());
        }
        if let Term::Entity(id) = &atom.target {
            tops.insert(id.clone());
        }
    }
    tops.into_iter().collect()
}

/// The per-request unit-of-work carrier.
///
/// Created from the inbound request, populated monotonically by each
/// pipeline stage, serialized back to the caller, and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResponse {
    pub unit: Vec<EntityId>,
    #[serde(default)]
    pub summaries: Option<Vec<Summary>>,
    #[serde(default)]
    pub lca: Option<Vec<Atom>>,
    #[serde(default)]
    pub characterization: Option<Vec<Atom>>,
    #[serde(default)]
    pub kernel_explanation: Option<Vec<Atom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tops: Option<Vec<String>>,
    #[serde(default)]
    pub computation_times: Option<BTreeMap<String, f64>>,
}

impl UnitResponse {
    pub fn new(unit: Vec<EntityId>) -> Self {
        UnitResponse {
            unit,
            summaries: None,
            lca: None,
            characterization: None,
            kernel_explanation: None,
            tops: None,
            computation_times: None,
        }
    }

    /// Record the wall-clock duration of a stage, in seconds rounded to
    /// five decimals
    pub fn record_time(&mut self, stage: &str, started: Instant) {
        let secs = started.elapsed().as_secs_f64();
        let rounded = (secs * 1e5).round() / 1e5;
        self.computation_times
            .get_or_insert_with(BTreeMap::new)
            .insert(stage.to_string(), rounded);
    }

    /// True when a summary is present for every unit member
    pub fn has_summary_for_unit(&self) -> bool {
        let Some(summaries) = &self.summaries else {
            return false;
        };
        self.unit
            .iter()
            .all(|e| summaries.iter().any(|s| &s.entity == e))
    }

    pub fn has_lca(&self) -> bool {
        self.lca.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eid(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    #[test]
    fn test_entity_id_accepts_valid_forms() {
        for raw in ["bn:00000001n", "bn:12345678v", "bn:00000000a", "bn:99999999r"] {
            assert!(is_valid_entity_id(raw), "{raw} should be valid");
        }
    }

    #[test]
    fn test_entity_id_rejects_malformed_forms() {
        for raw in [
            "bnn:00000001n",
            "bn:0000001n",
            "bn:000000001n",
            "bn:00000001x",
            "bn:00000001N",
            "00000001n",
            "",
        ] {
            assert!(EntityId::new(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_entity_id_serde_round_trip() {
        let id = eid("bn:00000001n");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"bn:00000001n\"");
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_entity_id_deserialization_validates() {
        let result: Result<EntityId, _> = serde_json::from_str("\"zz:00000001n\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_variable_printed_form() {
        assert_eq!(Variable::free(vec![]).to_string(), "X_0");
        assert_eq!(Variable::bound(3).to_string(), "Y_3");
    }

    #[test]
    fn test_variable_equality_ignores_origin() {
        let a = Variable::free(vec![eid("bn:00000001n")]);
        let b = Variable::free(vec![eid("bn:00000002n")]);
        assert_eq!(a, b);
        assert_ne!(Variable::bound(0), Variable::bound(1));
        assert_ne!(Variable::free(vec![]), Variable::bound(0));
    }

    #[test]
    fn test_term_equality_across_variants() {
        let entity = Term::Entity(eid("bn:00000001n"));
        let var = Term::Variable(Variable::free(vec![]));
        assert_ne!(entity, var);
        assert_eq!(entity, Term::Entity(eid("bn:00000001n")));
    }

    #[test]
    fn test_term_ordering_entities_before_variables() {
        let mut terms = vec![
            Term::Variable(Variable::bound(0)),
            Term::Entity(eid("bn:00000002n")),
            Term::Variable(Variable::free(vec![])),
            Term::Entity(eid("bn:00000001n")),
        ];
        terms.sort();
        assert_eq!(
            terms.iter().map(ToString::to_string).collect::<Vec<_>>(),
            vec!["bn:00000001n", "bn:00000002n", "X_0", "Y_0"]
        );
    }

    #[test]
    fn test_atom_serde_uses_wire_field_names() {
        let atom = Atom::new(eid("bn:00000001n"), eid("bn:00000002n"), "is_a");
        let json = serde_json::to_value(&atom).unwrap();
        assert_eq!(json["source_id"], "bn:00000001n");
        assert_eq!(json["target_id"], "bn:00000002n");
        assert_eq!(json["predicate"], "is_a");
    }

    #[test]
    fn test_atom_deserializes_variable_terms() {
        let json = r#"{
            "source_id": {"origin": ["bn:00000001n"], "is_free": true, "nominal": 0},
            "target_id": "bn:00000002n",
            "predicate": "is_a"
        }"#;
        let atom: Atom = serde_json::from_str(json).unwrap();
        assert!(atom.source.is_variable());
        assert_eq!(atom.target, Term::Entity(eid("bn:00000002n")));
    }

    #[test]
    fn test_canonicalize_sorts_and_dedups() {
        let a = Atom::new(eid("bn:00000001n"), eid("bn:00000003n"), "part_of");
        let b = Atom::new(eid("bn:00000001n"), eid("bn:00000002n"), "is_a");
        let atoms = canonicalize(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(atoms, vec![b, a]);
    }

    #[test]
    fn test_taxonomic_predicate_both_spellings() {
        assert!(is_taxonomic_predicate("is_a"));
        assert!(is_taxonomic_predicate("IS_A"));
        assert!(is_taxonomic_predicate("PART_OF"));
        assert!(!is_taxonomic_predicate("color"));
    }

    #[test]
    fn test_predicate_style_spelling() {
        let lower = PredicateStyle::new(false);
        let upper = PredicateStyle::new(true);
        assert_eq!(lower.subclass_of(), "subclass_of");
        assert_eq!(upper.subclass_of(), "SUBCLASS_OF");
    }

    #[test]
    fn test_summary_derives_tops_from_endpoints() {
        let e = eid("bn:00000001n");
        let summary = Summary::from_atoms(
            e.clone(),
            vec![
                Atom::new(e.clone(), eid("bn:00000002n"), "is_a"),
                Atom::new(e.clone(), Term::Variable(Variable::bound(0)), "color"),
            ],
        );
        assert_eq!(summary.tops, vec![e, eid("bn:00000002n")]);
        assert_eq!(summary.tops, summary.derived_tops());
    }

    #[test]
    fn test_response_records_rounded_times() {
        let mut response = UnitResponse::new(vec![eid("bn:00000001n")]);
        response.record_time("summary", Instant::now());
        let times = response.computation_times.unwrap();
        let value = times["summary"];
        assert!(value >= 0.0);
        assert_eq!((value * 1e5).round() / 1e5, value);
    }

    #[test]
    fn test_response_summary_coverage_check() {
        let e1 = eid("bn:00000001n");
        let e2 = eid("bn:00000002n");
        let mut response = UnitResponse::new(vec![e1.clone(), e2.clone()]);
        assert!(!response.has_summary_for_unit());

        response.summaries = Some(vec![Summary::from_atoms(e1.clone(), vec![])]);
        assert!(!response.has_summary_for_unit());

        response.summaries = Some(vec![
            Summary::from_atoms(e1, vec![]),
            Summary::from_atoms(e2, vec![]),
        ]);
        assert!(response.has_summary_for_unit());
    }

    #[test]
    fn test_response_serializes_nullable_stages() {
        let response = UnitResponse::new(vec![eid("bn:00000001n")]);
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["summaries"].is_null());
        assert!(json["lca"].is_null());
        assert!(json.get("tops").is_none());
    }
}
