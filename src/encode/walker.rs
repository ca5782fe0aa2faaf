//! Bounded traversal of a subject directory

use super::collection::CollectionBuilder;
use super::entity::EntityFactory;
use super::{EncodeError, EncodeResult};
use crate::graph::namespace::{fs, nidm, niiri, prov};
use crate::graph::{Attributes, Literal, ProvenanceGraph, QualifiedName};
use crate::identifier::IdentifierPolicy;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Counters describing one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// File entities created and linked
    pub encoded: usize,
    pub skipped_hidden: usize,
    pub skipped_ignored: usize,
    /// Paths that did not resolve to a regular file (dangling links, sockets)
    pub skipped_irregular: usize,
    /// Files dropped after a file-level error
    pub failed: usize,
    /// True if the walk stopped at the item cap
    pub capped: bool,
}

/// Result of encoding one subject directory
#[derive(Debug, Clone)]
pub struct SubjectEncoding {
    pub collection: QualifiedName,
    /// Canonical subject root
    pub root: PathBuf,
    pub summary: WalkSummary,
}

/// Walks a subject directory and turns each eligible file into a member
/// of the subject collection
pub struct DirectoryWalker<'a> {
    factory: &'a EntityFactory<'a>,
    policy: &'a dyn IdentifierPolicy,
    ignore: &'a [String],
    max_items: usize,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(
        factory: &'a EntityFactory<'a>,
        policy: &'a dyn IdentifierPolicy,
        ignore: &'a [String],
        max_items: usize,
    ) -> Self {
        Self {
            factory,
            policy,
            ignore,
            max_items,
        }
    }

    /// Create the subject collection for `root` and encode its files
    pub fn encode_subject(
        &self,
        graph: &mut ProvenanceGraph,
        root: &Path,
        project_id: &str,
        hostname: &str,
    ) -> EncodeResult<SubjectEncoding> {
        if !root.is_dir() {
            return Err(EncodeError::RootNotFound(root.to_path_buf()));
        }
        let root = root
            .canonicalize()
            .map_err(|e| EncodeError::io(root, e))?;
        let subject_id = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let attributes = Attributes::new()
            .with(prov("type"), Literal::Name(fs("subject_directory")))
            .with(nidm("tag"), project_id)
            .with(fs("subject_id"), subject_id.as_str());
        let id = niiri(&self.policy.mint(&["subject_directory", project_id, subject_id.as_str()]));
        let mut collection = CollectionBuilder::create(graph, id, attributes)?;

        let summary = self.walk(graph, &mut collection, &root, &subject_id, hostname)?;
        info!(
            subject = %subject_id,
            encoded = summary.encoded,
            ignored = summary.skipped_ignored,
            failed = summary.failed,
            capped = summary.capped,
            "subject directory encoded"
        );

        Ok(SubjectEncoding {
            collection: collection.id().clone(),
            root,
            summary,
        })
    }

    fn walk(
        &self,
        graph: &mut ProvenanceGraph,
        collection: &mut CollectionBuilder,
        root: &Path,
        subject_id: &str,
        hostname: &str,
    ) -> EncodeResult<WalkSummary> {
        let mut summary = WalkSummary::default();

        for entry in WalkDir::new(root).follow_links(true).sort_by(files_first) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "unreadable directory entry");
                    summary.failed += 1;
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            if is_hidden(&entry) {
                summary.skipped_hidden += 1;
                continue;
            }

            let path = match entry.path().canonicalize() {
                Ok(p) if p.is_file() => p,
                _ => {
                    warn!(path = %entry.path().display(), "not a regular file, skipping");
                    summary.skipped_irregular += 1;
                    continue;
                }
            };

            let path_str = path.to_string_lossy();
            if let Some(token) = self.ignore.iter().find(|t| path_str.contains(t.as_str())) {
                debug!(path = %path_str, token = %token, "ignored");
                summary.skipped_ignored += 1;
                continue;
            }

            if summary.encoded >= self.max_items {
                summary.capped = true;
                break;
            }

            // Links keep their own name; hashing reads through them.
            let located = entry.path();
            match self.factory.file_entity(subject_id, located, root, hostname) {
                Ok(file) => {
                    debug!(path = %file.relative_path, "encoded");
                    collection.add_record(graph, file.into_record())?;
                    summary.encoded += 1;
                }
                Err(e) if e.is_file_level() => {
                    warn!(path = %located.display(), error = %e, "skipping file");
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }
}

/// Files before subdirectories, each group by name
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NamespaceTable, RelationKind};
    use crate::hash::DigestAlgorithm;
    use crate::identifier::{ContentIdentifiers, RandomIdentifiers};
    use crate::tagger::HeuristicTagger;
    use std::fs as stdfs;

    fn ignore() -> Vec<String> {
        vec!["trash".into(), "bak".into()]
    }

    fn tree() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bert");
        stdfs::create_dir_all(root.join("mri")).unwrap();
        stdfs::create_dir_all(root.join("surf")).unwrap();
        stdfs::create_dir_all(root.join("trash")).unwrap();
        stdfs::write(root.join("mri").join("T1.mgz"), b"t1").unwrap();
        stdfs::write(root.join("mri").join("aseg.mgz"), b"aseg").unwrap();
        stdfs::write(root.join("surf").join("lh.white"), b"white").unwrap();
        stdfs::write(root.join("trash").join("old.mgz"), b"old").unwrap();
        stdfs::write(root.join("surf").join("rh.white.bak"), b"bak").unwrap();
        stdfs::write(root.join(".DS_Store"), b"").unwrap();
        (dir, root)
    }

    fn run(root: &Path, max_items: usize) -> (ProvenanceGraph, SubjectEncoding) {
        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5];
        let factory = EntityFactory::new(&tagger, &digests, &RandomIdentifiers);
        let ignore = ignore();
        let walker = DirectoryWalker::new(&factory, &RandomIdentifiers, &ignore, max_items);
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let encoding = walker.encode_subject(&mut graph, root, "proj", "h").unwrap();
        (graph, encoding)
    }

    #[test]
    fn encodes_eligible_files_in_walk_order() {
        let (_dir, root) = tree();
        let (graph, encoding) = run(&root, 100);

        assert_eq!(encoding.summary.encoded, 3);
        assert_eq!(encoding.summary.skipped_hidden, 1);
        assert_eq!(encoding.summary.skipped_ignored, 2);
        assert!(!encoding.summary.capped);

        let paths: Vec<String> = graph
            .members_of(&encoding.collection)
            .into_iter()
            .filter_map(|id| graph.get(id))
            .filter_map(|r| r.attributes.first(&fs("relative_path")))
            .filter_map(|l| l.as_str().map(str::to_string))
            .collect();
        assert_eq!(paths, vec!["mri/T1.mgz", "mri/aseg.mgz", "surf/lh.white"]);
    }

    #[test]
    fn subject_collection_attributes() {
        let (_dir, root) = tree();
        let (graph, encoding) = run(&root, 100);
        let record = graph.get(&encoding.collection).unwrap();

        assert!(record
            .attributes
            .contains(&prov("type"), &Literal::Name(fs("subject_directory"))));
        assert_eq!(record.tags(), vec!["proj"]);
        assert_eq!(
            record.attributes.first(&fs("subject_id")).and_then(Literal::as_str),
            Some("bert")
        );
    }

    #[test]
    fn cap_stops_after_k_entities() {
        let (_dir, root) = tree();
        let (graph, encoding) = run(&root, 2);

        assert_eq!(encoding.summary.encoded, 2);
        assert!(encoding.summary.capped);
        assert_eq!(graph.relations_of(RelationKind::HadMember).count(), 2);
        assert_eq!(graph.entities().count(), 2);
    }

    #[test]
    fn cap_equal_to_eligible_count_is_not_capped() {
        let (_dir, root) = tree();
        let (_graph, encoding) = run(&root, 3);
        assert_eq!(encoding.summary.encoded, 3);
        assert!(!encoding.summary.capped);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let tagger = HeuristicTagger::freesurfer();
        let factory = EntityFactory::new(&tagger, &[], &RandomIdentifiers);
        let ignore = ignore();
        let walker = DirectoryWalker::new(&factory, &RandomIdentifiers, &ignore, 10);
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());

        let err = walker
            .encode_subject(&mut graph, &dir.path().join("nobody"), "proj", "h")
            .unwrap_err();
        assert!(matches!(err, EncodeError::RootNotFound(_)));
        assert_eq!(graph.record_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped() {
        let (_dir, root) = tree();
        std::os::unix::fs::symlink(root.join("missing.mgz"), root.join("mri").join("link.mgz"))
            .unwrap();
        let (_graph, encoding) = run(&root, 100);
        assert_eq!(encoding.summary.encoded, 3);
        assert_eq!(encoding.summary.skipped_irregular + encoding.summary.failed, 1);
    }

    fn relative_paths(graph: &ProvenanceGraph, encoding: &SubjectEncoding) -> Vec<String> {
        graph
            .members_of(&encoding.collection)
            .into_iter()
            .filter_map(|id| graph.get(id))
            .filter_map(|r| r.attributes.first(&fs("relative_path")))
            .filter_map(|l| l.as_str().map(str::to_string))
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn in_tree_symlink_keeps_its_own_name() {
        let (_dir, root) = tree();
        let surf = root.join("surf");
        stdfs::write(surf.join("lh.pial.T1"), b"pial").unwrap();
        std::os::unix::fs::symlink("lh.pial.T1", surf.join("lh.pial")).unwrap();

        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5];
        let factory = EntityFactory::new(&tagger, &digests, &ContentIdentifiers);
        let ignore = ignore();
        let walker = DirectoryWalker::new(&factory, &ContentIdentifiers, &ignore, 100);
        let mut graph = ProvenanceGraph::new(NamespaceTable::standard());
        let encoding = walker.encode_subject(&mut graph, &root, "proj", "h").unwrap();

        assert_eq!(encoding.summary.encoded, 5);
        let paths = relative_paths(&graph, &encoding);
        assert_eq!(
            paths,
            vec!["mri/T1.mgz", "mri/aseg.mgz", "surf/lh.pial", "surf/lh.pial.T1", "surf/lh.white"]
        );

        let members = graph.members_of(&encoding.collection);
        let link = graph.get(members[2]).unwrap();
        let target = graph.get(members[3]).unwrap();
        assert_ne!(link.id, target.id);
        assert_eq!(link.attributes.first(&prov("label")), Some(&Literal::from("lh.pial")));
        assert_eq!(
            link.attributes.first(&crate::graph::namespace::crypto("md5")),
            target.attributes.first(&crate::graph::namespace::crypto("md5"))
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn read_failure_skips_only_that_file() {
        let (_dir, root) = tree();
        // Reading /proc/self/mem at offset 0 fails with EIO, even as root.
        std::os::unix::fs::symlink("/proc/self/mem", root.join("mri").join("a_mem")).unwrap();

        let (graph, encoding) = run(&root, 100);
        assert_eq!(encoding.summary.failed, 1);
        assert_eq!(encoding.summary.skipped_irregular, 0);
        assert_eq!(encoding.summary.encoded, 3);
        assert_eq!(
            relative_paths(&graph, &encoding),
            vec!["mri/T1.mgz", "mri/aseg.mgz", "surf/lh.white"]
        );
    }

    #[test]
    fn content_policy_reproduces_identifiers() {
        let (_dir, root) = tree();
        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5];
        let factory = EntityFactory::new(&tagger, &digests, &ContentIdentifiers);
        let ignore = ignore();
        let walker = DirectoryWalker::new(&factory, &ContentIdentifiers, &ignore, 100);

        let mut a = ProvenanceGraph::new(NamespaceTable::standard());
        let mut b = ProvenanceGraph::new(NamespaceTable::standard());
        walker.encode_subject(&mut a, &root, "proj", "h").unwrap();
        walker.encode_subject(&mut b, &root, "proj", "h").unwrap();

        let ids = |g: &ProvenanceGraph| g.records().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }
}
