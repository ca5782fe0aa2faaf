//! Heuristic classification of files by name
//!
//! Path segments and filename dot-segments are tagged verbatim; an ordered
//! table of `(token, terms)` rules then adds ontology terms for every rule
//! whose token occurs in the filename.

use crate::graph::namespace::{fs, nidm, nif, obo, prov};
use crate::graph::{Attributes, Literal, QualifiedName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One ontology term attached by a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTerm {
    /// Predicate to record the term under; `prov:type` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<QualifiedName>,
    pub value: QualifiedName,
}

impl TagTerm {
    /// A `prov:type` term
    pub fn typed(value: QualifiedName) -> Self {
        Self { predicate: None, value }
    }

    pub fn with_predicate(predicate: QualifiedName, value: QualifiedName) -> Self {
        Self {
            predicate: Some(predicate),
            value,
        }
    }

    fn predicate_or_type(&self) -> QualifiedName {
        self.predicate.clone().unwrap_or_else(|| prov("type"))
    }
}

/// A filename token and the terms it implies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRule {
    pub token: String,
    pub terms: Vec<TagTerm>,
}

impl TagRule {
    pub fn new(token: impl Into<String>, terms: Vec<TagTerm>) -> Self {
        Self {
            token: token.into(),
            terms,
        }
    }

    /// The token as a bare tag, without the `.` anchors
    pub fn bare_token(&self) -> &str {
        self.token.trim_matches('.')
    }
}

/// Applies an ordered rule table to filenames
#[derive(Debug, Clone)]
pub struct HeuristicTagger {
    rules: Vec<TagRule>,
}

impl HeuristicTagger {
    pub fn new(rules: Vec<TagRule>) -> Self {
        Self { rules }
    }

    /// Tagger over the FreeSurfer rule table
    pub fn freesurfer() -> Self {
        Self::new(freesurfer_rules())
    }

    pub fn rules(&self) -> &[TagRule] {
        &self.rules
    }

    /// Rules whose token occurs in `filename`, in table order
    pub fn matching_rules<'a>(&'a self, filename: &'a str) -> impl Iterator<Item = &'a TagRule> + 'a {
        self.rules
            .iter()
            .filter(move |rule| filename.contains(rule.token.as_str()))
    }

    /// Build the tag attributes for a file
    ///
    /// Every matching rule applies; tagging is additive. A rule's bare token
    /// is only added as `nidm:tag` when no segment or earlier rule produced
    /// the same tag.
    pub fn tag(&self, filename: &str, path_segments: &[&str], filename_segments: &[&str]) -> Attributes {
        let tag_key = nidm("tag");
        let mut attributes = Attributes::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for segment in path_segments.iter().chain(filename_segments) {
            if segment.is_empty() {
                continue;
            }
            attributes.push(tag_key.clone(), *segment);
            seen.insert(*segment);
        }

        for rule in self.matching_rules(filename) {
            let bare = rule.bare_token();
            if !bare.is_empty() && seen.insert(bare) {
                attributes.push(tag_key.clone(), bare);
            }
            for term in &rule.terms {
                attributes.push(term.predicate_or_type(), Literal::Name(term.value.clone()));
            }
        }

        attributes
    }
}

impl Default for HeuristicTagger {
    fn default() -> Self {
        Self::freesurfer()
    }
}

/// The FreeSurfer filename table
pub fn freesurfer_rules() -> Vec<TagRule> {
    let anat = |value: QualifiedName| TagTerm::with_predicate(nidm("AnatomicalAnnotation"), value);
    let file_type = |value: QualifiedName| TagTerm::with_predicate(fs("FileType"), value);

    vec![
        // 3D T1-weighted scan
        TagRule::new("T1", vec![TagTerm::typed(nif("nlx_inv_20090243"))]),
        // left / right cerebral hemisphere
        TagRule::new("lh", vec![anat(obo("UBERON_0002812"))]),
        TagRule::new("rh", vec![anat(obo("UBERON_0002813"))]),
        // Brodmann areas
        TagRule::new("BA.", vec![anat(obo("UBERON_0013529"))]),
        TagRule::new("BA1.", vec![anat(obo("UBERON_0006099"))]),
        TagRule::new("BA2.", vec![anat(obo("UBERON_0013533"))]),
        TagRule::new("BA3a.", vec![anat(obo("UBERON_0006100")), anat(obo("FMA_74532"))]),
        TagRule::new("BA3b.", vec![anat(obo("UBERON_0006100")), anat(obo("FMA_74533"))]),
        TagRule::new("BA44.", vec![anat(obo("UBERON_0006481"))]),
        TagRule::new("BA45.", vec![anat(obo("UBERON_0006482"))]),
        TagRule::new("BA4a.", vec![anat(obo("UBERON_0013535")), anat(obo("FMA_74532"))]),
        TagRule::new("BA4p.", vec![anat(obo("UBERON_0013535")), anat(obo("FMA_74533"))]),
        TagRule::new("BA6.", vec![anat(obo("UBERON_0006472"))]),
        // visual areas
        TagRule::new("V1.", vec![anat(obo("UBERON_0002436"))]),
        TagRule::new("V2.", vec![anat(obo("UBERON_0006473"))]),
        TagRule::new("MT", vec![anat(fs("MT_area"))]),
        TagRule::new("entorhinal", vec![anat(obo("UBERON_0002728"))]),
        TagRule::new(
            "exvivo",
            vec![TagTerm::with_predicate(nidm("AnnotationSource"), fs("exvivo"))],
        ),
        TagRule::new("label", vec![file_type(fs("label_file"))]),
        TagRule::new("annot", vec![file_type(fs("annotation_file"))]),
        TagRule::new("cortex", vec![anat(obo("UBERON_0000956"))]),
        TagRule::new(".stats", vec![file_type(fs("statistic_file"))]),
        TagRule::new(
            "aparc.annot",
            vec![TagTerm::with_predicate(nidm("AtlasName"), fs("default_parcellation"))],
        ),
        TagRule::new(
            "aparc.a2009s",
            vec![TagTerm::with_predicate(nidm("AtlasName"), fs("a2009s_parcellation"))],
        ),
        TagRule::new(".ctab", vec![file_type(fs("color_table"))]),
    ]
}
