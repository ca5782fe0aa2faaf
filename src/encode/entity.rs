//! File entity construction

use super::{EncodeError, EncodeResult};
use crate::graph::namespace::{fs, niiri, prov};
use crate::graph::{Attributes, Literal, QualifiedName, Record};
use crate::hash::{hash_file, Digest, DigestAlgorithm};
use crate::identifier::IdentifierPolicy;
use crate::tagger::HeuristicTagger;
use std::path::{Component, Path};
use tracing::warn;

/// A fully attributed file entity, not yet part of any graph
#[derive(Debug, Clone)]
pub struct FileEntity {
    pub id: QualifiedName,
    /// Path relative to the subject root, `/`-separated
    pub relative_path: String,
    pub digests: Vec<Digest>,
    pub attributes: Attributes,
}

impl FileEntity {
    pub fn into_record(self) -> Record {
        Record::entity(self.id).with_attributes(self.attributes)
    }

    pub fn digest(&self, algorithm: DigestAlgorithm) -> Option<&Digest> {
        self.digests.iter().find(|d| d.algorithm == algorithm)
    }
}

/// Builds file entities: relative path, digests, location, tags, identifier
pub struct EntityFactory<'a> {
    tagger: &'a HeuristicTagger,
    digests: &'a [DigestAlgorithm],
    location_base: Option<&'a str>,
    policy: &'a dyn IdentifierPolicy,
}

impl<'a> EntityFactory<'a> {
    pub fn new(
        tagger: &'a HeuristicTagger,
        digests: &'a [DigestAlgorithm],
        policy: &'a dyn IdentifierPolicy,
    ) -> Self {
        Self {
            tagger,
            digests,
            location_base: None,
            policy,
        }
    }

    /// Route file locations through a retrieval service
    pub fn with_location_base(mut self, base: Option<&'a str>) -> Self {
        self.location_base = base;
        self
    }

    /// Build the entity for `path`, a file under `subject_root`
    ///
    /// Only hashing touches the filesystem. A file that yields no digest
    /// (it vanished after enumeration) is still encoded, without digests.
    pub fn file_entity(
        &self,
        subject_id: &str,
        path: &Path,
        subject_root: &Path,
        hostname: &str,
    ) -> EncodeResult<FileEntity> {
        let relative = path
            .strip_prefix(subject_root)
            .map_err(|_| EncodeError::OutsideRoot {
                path: path.to_path_buf(),
                root: subject_root.to_path_buf(),
            })?;
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let Some((filename, dirs)) = segments.split_last() else {
            return Err(EncodeError::OutsideRoot {
                path: path.to_path_buf(),
                root: subject_root.to_path_buf(),
            });
        };
        let relative_path = segments.join("/");

        let mut digests = Vec::with_capacity(self.digests.len());
        for &algorithm in self.digests {
            match hash_file(path, algorithm).map_err(|e| EncodeError::io(path, e))? {
                Some(digest) => digests.push(digest),
                None => warn!(path = %path.display(), %algorithm, "no digest; file is not readable as a regular file"),
            }
        }

        let mut attributes = Attributes::new()
            .with(prov("label"), filename.as_str())
            .with(fs("relative_path"), relative_path.as_str())
            .with(prov("location"), self.location(path, hostname));
        for digest in &digests {
            attributes.push(digest.algorithm.predicate(), digest.hex.as_str());
        }

        let dir_segments: Vec<&str> = dirs.iter().map(String::as_str).collect();
        let name_segments: Vec<&str> = filename.split('.').collect();
        attributes.extend(self.tagger.tag(filename, &dir_segments, &name_segments));

        let content = digests.first().map(|d| d.hex.as_str()).unwrap_or("");
        let id = niiri(&self.policy.mint(&[subject_id, relative_path.as_str(), content]));

        Ok(FileEntity {
            id,
            relative_path,
            digests,
            attributes,
        })
    }

    fn location(&self, path: &Path, hostname: &str) -> Literal {
        let file_url = file_url(hostname, path);
        match self.location_base {
            Some(base) => Literal::Uri(format!("{}?file_uri={}", base, file_url)),
            None => Literal::Uri(file_url),
        }
    }
}

/// `file://<hostname><absolute path>`
pub fn file_url(hostname: &str, path: &Path) -> String {
    format!("file://{}{}", hostname, path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::namespace::{crypto, nidm, nif};
    use crate::identifier::{ContentIdentifiers, RandomIdentifiers};
    use std::fs;

    fn subject_with_t1() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("bert");
        fs::create_dir_all(root.join("mri")).unwrap();
        fs::write(root.join("mri").join("T1.mgz"), b"volume bytes").unwrap();
        (dir, root)
    }

    #[test]
    fn bert_t1_entity() {
        let (_dir, root) = subject_with_t1();
        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5, DigestAlgorithm::Sha512];
        let factory = EntityFactory::new(&tagger, &digests, &ContentIdentifiers);

        let path = root.join("mri").join("T1.mgz");
        let entity = factory.file_entity("bert", &path, &root, "host.example").unwrap();

        assert_eq!(entity.relative_path, "mri/T1.mgz");
        let record = entity.clone().into_record();
        assert_eq!(record.tags(), vec!["mri", "T1", "mgz"]);
        assert!(record
            .attributes
            .contains(&prov("type"), &Literal::Name(nif("nlx_inv_20090243"))));
        assert_eq!(
            record.attributes.first(&crypto("md5")).and_then(Literal::as_str),
            Some(entity.digest(DigestAlgorithm::Md5).unwrap().hex.as_str())
        );
        assert!(record.attributes.contains_key(&crypto("sha")));
        assert_eq!(
            record.attributes.first(&prov("location")),
            Some(&Literal::Uri(format!("file://host.example{}", path.display())))
        );
        assert!(!record.attributes.contains_key(&nidm("AnatomicalAnnotation")));
    }

    #[test]
    fn content_identifier_is_stable_across_builds() {
        let (_dir, root) = subject_with_t1();
        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5];
        let factory = EntityFactory::new(&tagger, &digests, &ContentIdentifiers);
        let path = root.join("mri").join("T1.mgz");

        let a = factory.file_entity("bert", &path, &root, "h").unwrap();
        let b = factory.file_entity("bert", &path, &root, "h").unwrap();
        assert_eq!(a.id, b.id);

        let random = EntityFactory::new(&tagger, &digests, &RandomIdentifiers);
        let c = random.file_entity("bert", &path, &root, "h").unwrap();
        let d = random.file_entity("bert", &path, &root, "h").unwrap();
        assert_ne!(c.id, d.id);
        assert_eq!(c.attributes, d.attributes);
    }

    #[test]
    fn location_base_wraps_file_url() {
        let (_dir, root) = subject_with_t1();
        let tagger = HeuristicTagger::freesurfer();
        let factory = EntityFactory::new(&tagger, &[], &RandomIdentifiers)
            .with_location_base(Some("http://files.example:10101/file"));
        let path = root.join("mri").join("T1.mgz");

        let entity = factory.file_entity("bert", &path, &root, "h").unwrap();
        let location = entity.attributes.first(&prov("location")).unwrap();
        assert_eq!(
            location.as_str().unwrap(),
            format!("http://files.example:10101/file?file_uri=file://h{}", path.display())
        );
        assert!(entity.digests.is_empty());
    }

    #[test]
    fn path_outside_root_is_rejected() {
        let (dir, root) = subject_with_t1();
        let tagger = HeuristicTagger::freesurfer();
        let factory = EntityFactory::new(&tagger, &[], &RandomIdentifiers);
        let stray = dir.path().join("stray.txt");
        fs::write(&stray, b"x").unwrap();

        let err = factory.file_entity("bert", &stray, &root, "h").unwrap_err();
        assert!(matches!(err, EncodeError::OutsideRoot { .. }));
    }

    #[test]
    fn vanished_file_has_no_digest() {
        let (_dir, root) = subject_with_t1();
        let tagger = HeuristicTagger::freesurfer();
        let digests = [DigestAlgorithm::Md5];
        let factory = EntityFactory::new(&tagger, &digests, &RandomIdentifiers);

        let gone = root.join("mri").join("orig.mgz");
        let entity = factory.file_entity("bert", &gone, &root, "h").unwrap();
        assert!(entity.digests.is_empty());
        assert!(!entity.attributes.contains_key(&crypto("md5")));
    }
}
