//! Job orchestration
//!
//! A job wraps one encoder run in its provenance context: an activity, the
//! agent who ran it, and the links from the encoded collection back to the
//! activity and to the upstream record it was derived from.

use crate::config::EncoderConfig;
use crate::encode::entity::file_url;
use crate::encode::{
    EncodeError, EncodeResult, EntityFactory, DirectoryWalker, StatsEncoder, StatsEncoding,
    StatsReport, SubjectEncoding, TableEncoder, TableEncoding,
};
use crate::graph::namespace::{crypto, foaf, niiri, prov};
use crate::graph::{Attributes, Literal, ProvenanceGraph, QualifiedName};
use crate::hash::{hash_bytes, DigestAlgorithm};
use crate::identifier::IdentifierPolicy;
use crate::retrieval::FileRetrieval;
use crate::tagger::HeuristicTagger;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{info, warn};

/// Where a job gets its clock, user and host from
pub trait JobEnvironment: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn user_name(&self) -> String;
    fn hostname(&self) -> String;
}

/// The running process's environment
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl JobEnvironment for SystemEnvironment {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn user_name(&self) -> String {
        std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn hostname(&self) -> String {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("HOST"))
            .ok()
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or_else(|| "localhost".to_string())
    }
}

/// Fixed values, for reproducible runs
#[derive(Debug, Clone)]
pub struct FixedEnvironment {
    pub now: DateTime<Utc>,
    pub user: String,
    pub hostname: String,
}

impl JobEnvironment for FixedEnvironment {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn user_name(&self) -> String {
        self.user.clone()
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }
}

/// A finished job
#[derive(Debug)]
pub struct JobOutcome<T> {
    pub graph: ProvenanceGraph,
    pub activity: QualifiedName,
    pub agent: QualifiedName,
    /// The record the top collection was derived from
    pub upstream: QualifiedName,
    pub encoding: T,
}

struct Job {
    graph: ProvenanceGraph,
    activity: QualifiedName,
    agent: QualifiedName,
}

impl Job {
    fn finish<T>(
        mut self,
        collection: &QualifiedName,
        upstream: QualifiedName,
        encoding: T,
    ) -> EncodeResult<JobOutcome<T>> {
        self.graph.was_generated_by(collection, &self.activity)?;
        Ok(JobOutcome {
            graph: self.graph,
            activity: self.activity,
            agent: self.agent,
            upstream,
            encoding,
        })
    }
}

/// Runs encoding jobs against one configuration
pub struct GraphOrchestrator {
    config: EncoderConfig,
    tagger: HeuristicTagger,
    env: Box<dyn JobEnvironment>,
    policy: Box<dyn IdentifierPolicy>,
}

impl GraphOrchestrator {
    pub fn new(config: EncoderConfig) -> Self {
        let tagger = HeuristicTagger::new(config.tag_rules.clone());
        let policy = config.identifiers.policy();
        Self {
            config,
            tagger,
            env: Box::new(SystemEnvironment),
            policy,
        }
    }

    pub fn with_environment(mut self, env: impl JobEnvironment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn IdentifierPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn hostname(&self) -> String {
        self.config
            .hostname
            .clone()
            .unwrap_or_else(|| self.env.hostname())
    }

    fn factory(&self) -> EntityFactory<'_> {
        EntityFactory::new(&self.tagger, &self.config.digests, self.policy.as_ref())
            .with_location_base(self.config.location_base.as_deref())
    }

    /// Fresh graph with the activity, agent and their association
    fn begin_job(&self, kind: &str, target: &str) -> EncodeResult<Job> {
        let mut graph = ProvenanceGraph::new(self.config.namespace_table());
        let user = self.env.user_name();

        let activity = graph.activity(
            niiri(&self.policy.mint(&["activity", kind, target])),
            self.env.now(),
            Attributes::new(),
        )?;
        let agent = graph.agent(
            niiri(&self.policy.mint(&["agent", user.as_str()])),
            Attributes::new()
                .with(prov("type"), Literal::Name(prov("Person")))
                .with(prov("label"), user.as_str())
                .with(foaf("name"), user.as_str()),
        )?;
        graph.was_associated_with(&activity, &agent, &self.config.agent_role)?;

        Ok(Job {
            graph,
            activity,
            agent,
        })
    }

    /// Encode a subject directory; the subject id is the directory's name
    pub fn encode_directory(
        &self,
        subject_dir: &Path,
        project_id: &str,
    ) -> EncodeResult<JobOutcome<SubjectEncoding>> {
        let hostname = self.hostname();
        let mut job = self.begin_job("directory", &subject_dir.display().to_string())?;

        let factory = self.factory();
        let walker = DirectoryWalker::new(
            &factory,
            self.policy.as_ref(),
            &self.config.ignore,
            self.config.max_items,
        );
        let subject = walker.encode_subject(&mut job.graph, subject_dir, project_id, &hostname)?;

        let url = file_url(&hostname, &subject.root);
        let directory = job.graph.entity(
            niiri(&self.policy.mint(&["directory", url.as_str()])),
            Attributes::new().with(prov("location"), Literal::Uri(url.clone())),
        )?;
        job.graph.was_derived_from(&subject.collection, &directory)?;

        if subject.summary.capped {
            warn!(
                max_items = self.config.max_items,
                "item cap reached; remaining files were not encoded"
            );
        }
        info!(records = job.graph.record_count(), "directory job finished");
        let collection = subject.collection.clone();
        job.finish(&collection, directory, subject)
    }

    /// Encode a delimited table file
    pub fn encode_table(&self, path: &Path) -> EncodeResult<JobOutcome<TableEncoding>> {
        let mut job = self.begin_job("table", &path.display().to_string())?;
        let table = TableEncoder::new(&self.config.table, self.policy.as_ref())
            .encode_file(&mut job.graph, path)?;
        info!(records = job.graph.record_count(), "table job finished");
        let (collection, source) = (table.collection.clone(), table.source.clone());
        job.finish(&collection, source, table)
    }

    /// Encode a local stats report
    ///
    /// The report file becomes the source entity, encoded like any file
    /// with its parent directory as the root.
    pub fn encode_stats(&self, path: &Path) -> EncodeResult<JobOutcome<StatsEncoding>> {
        if !path.is_file() {
            return Err(EncodeError::InputNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| EncodeError::io(path, e))?;
        let report = StatsReport::parse(&text, &self.config.stats.unitless_units)?;

        let path = path.canonicalize().map_err(|e| EncodeError::io(path, e))?;
        let parent = path.parent().unwrap_or_else(|| Path::new("/"));
        let owner = parent
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut job = self.begin_job("stats", &path.display().to_string())?;
        let file = self
            .factory()
            .file_entity(&owner, &path, parent, &self.hostname())?;
        let source = job.graph.add_record(file.into_record())?;

        let stats = StatsEncoder::new(self.policy.as_ref()).encode(&mut job.graph, &report, &source)?;
        info!(records = job.graph.record_count(), "stats job finished");
        let collection = stats.collection.clone();
        job.finish(&collection, source, stats)
    }

    /// Re-encode a stats report already recorded in a store
    ///
    /// `source` and `recorded_md5` come from the earlier upload. The ticket
    /// and the downloaded bytes must both match `recorded_md5`.
    pub fn reencode_stats(
        &self,
        source: &QualifiedName,
        recorded_md5: &str,
        location: &str,
        retrieval: &dyn FileRetrieval,
    ) -> EncodeResult<JobOutcome<StatsEncoding>> {
        let ticket = retrieval.ticket(location)?;
        if !ticket.md5sum.eq_ignore_ascii_case(recorded_md5) {
            return Err(EncodeError::DigestMismatch {
                uri: location.to_string(),
                recorded: recorded_md5.to_string(),
                received: ticket.md5sum,
            });
        }

        let bytes = retrieval.fetch(&ticket)?;
        let received = hash_bytes(&bytes, DigestAlgorithm::Md5).hex;
        if !received.eq_ignore_ascii_case(recorded_md5) {
            return Err(EncodeError::DigestMismatch {
                uri: ticket.uri,
                recorded: recorded_md5.to_string(),
                received,
            });
        }

        let text = String::from_utf8_lossy(&bytes);
        let report = StatsReport::parse(&text, &self.config.stats.unitless_units)?;

        let mut job = self.begin_job("stats", location)?;
        let source = job.graph.entity(
            source.clone(),
            Attributes::new()
                .with(crypto("md5"), received.as_str())
                .with(prov("location"), Literal::Uri(location.to_string())),
        )?;
        let stats = StatsEncoder::new(self.policy.as_ref()).encode(&mut job.graph, &report, &source)?;
        let collection = stats.collection.clone();
        job.finish(&collection, source, stats)
    }
}
