//! Extract stage - parse, classify, annotate
//!
//! Each worker owns one `ExtractStage` because the tree-sitter parser is not `Sync`.
//! The classifier is shared read-only.

use crate::classify::{Classifier, Posture};
use crate::indexing::pipeline::types::{FileContent, FileOutcome, PipelineError, PipelineResult};
use crate::indexing::warning::WarningKind;
use crate::parsing::{HclExtractor, ParseError, RawResource};
use crate::types::{IndexedResource, SourceFileInfo};
use crate::utils::detect_environment;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ExtractStage {
    extractor: HclExtractor,
    classifier: Arc<Classifier>,
    /// Canonical scan roots, for root-relative environment detection
    roots: Arc<Vec<PathBuf>>,
}

impl ExtractStage {
    pub fn new(classifier: Arc<Classifier>, roots: Arc<Vec<PathBuf>>) -> PipelineResult<Self> {
        let extractor =
            HclExtractor::new().map_err(|e| PipelineError::ParserInit(e.to_string()))?;
        Ok(Self {
            extractor,
            classifier,
            roots,
        })
    }

    /// Turn one file's content into either an indexed record or a skip record.
    pub fn process(&mut self, content: FileContent) -> FileOutcome {
        let size_bytes = content.size_bytes();
        let FileContent {
            path,
            bytes,
            checksum,
        } = content;

        let code = match String::from_utf8(bytes) {
            Ok(code) => code,
            Err(e) => {
                let reason = ParseError::Encoding(e.utf8_error().to_string()).to_string();
                return FileOutcome::skipped(path, Some(checksum), WarningKind::ReadError, reason);
            }
        };

        let raw = match self.extractor.extract(&code) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("[extract] {}: {e}", path.display());
                return FileOutcome::skipped(path, Some(checksum), WarningKind::SyntaxError, e.to_string());
            }
        };

        let environment = detect_environment(self.relative_to_root(&path));
        let resources: Vec<_> = raw
            .into_iter()
            .map(|resource| self.classify(resource, &path, environment))
            .collect();

        FileOutcome::Indexed {
            info: SourceFileInfo {
                path,
                checksum,
                size_bytes,
                resources_found: resources.len(),
            },
            resources,
        }
    }

    fn classify(
        &self,
        raw: RawResource,
        path: &Path,
        environment: Option<&'static str>,
    ) -> IndexedResource {
        let classification = self.classifier.classify(&raw.resource_type, &raw.attributes);
        let posture = Posture::assess(
            &raw.resource_type,
            &raw.attributes,
            !classification.control_ids.is_empty(),
        );
        let mut resource = IndexedResource::new(
            raw.resource_type,
            raw.resource_name,
            path,
            raw.line_start,
            raw.line_end,
        );
        resource.environment = environment.map(str::to_string);
        resource.configuration = classification.evidence(&raw.attributes);
        resource.security_attributes = classification.security_attributes;
        resource.control_ids = classification.control_ids;
        resource.risk_level = posture.risk_level;
        resource.compliance_status = posture.compliance_status;
        resource
    }

    /// Strip the longest scan root so directories above the workspace never imply an environment.
    fn relative_to_root<'p>(&self, path: &'p Path) -> &'p Path {
        self.roots
            .iter()
            .filter_map(|root| path.strip_prefix(root).ok())
            .min_by_key(|relative| relative.components().count())
            .unwrap_or(path)
    }
}
