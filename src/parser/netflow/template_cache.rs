use crate::models::Template;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Templates are scoped to one observation domain of one exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub exporter: IpAddr,
    pub source_id: u32,
    pub template_id: u16,
}

/// Templates one exporter may keep across all its observation domains.
///
/// Template ids are 16 bits wide and source ids are free-form, so without a cap a single
/// sender, spoofed source address included, could grow the cache without bound.
pub const DEFAULT_MAX_TEMPLATES_PER_EXPORTER: usize = 4096;

/// Templates received so far, shared by every NetFlow receive task.
///
/// A template announced again under the same key replaces the previous one. New keys from an
/// exporter that already holds `max_per_exporter` templates are refused.
#[derive(Debug)]
pub struct TemplateCache {
    templates: DashMap<TemplateKey, Arc<Template>>,
    /// Template count per exporter. Its entry lock is taken before touching `templates`.
    per_exporter: DashMap<IpAddr, usize>,
    max_per_exporter: usize,
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_TEMPLATES_PER_EXPORTER)
    }
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_per_exporter: usize) -> Self {
        TemplateCache {
            templates: DashMap::new(),
            per_exporter: DashMap::new(),
            max_per_exporter,
        }
    }

    pub fn max_per_exporter(&self) -> usize {
        self.max_per_exporter
    }

    /// Store `template`, returning false if it was refused because `exporter` is at its limit.
    /// Replacing a template the exporter already holds always succeeds.
    pub fn insert(&self, exporter: IpAddr, source_id: u32, template: Template) -> bool {
        let key = TemplateKey {
            exporter,
            source_id,
            template_id: template.template_id,
        };
        let mut count = self.per_exporter.entry(exporter).or_insert(0);
        if !self.templates.contains_key(&key) {
            if *count >= self.max_per_exporter {
                return false;
            }
            *count += 1;
        }
        self.templates.insert(key, Arc::new(template));
        true
    }

    pub fn get(&self, exporter: IpAddr, source_id: u32, template_id: u16) -> Option<Arc<Template>> {
        let key = TemplateKey {
            exporter,
            source_id,
            template_id,
        };
        self.templates.get(&key).map(|t| Arc::clone(t.value()))
    }

    /// Forget every template learned from `exporter`.
    pub fn remove_exporter(&self, exporter: IpAddr) {
        if let Some(mut count) = self.per_exporter.get_mut(&exporter) {
            self.templates.retain(|key, _| key.exporter != exporter);
            *count = 0;
        }
        self.per_exporter.remove_if(&exporter, |_, count| *count == 0);
    }

    /// Number of templates currently held for `exporter`.
    pub fn exporter_len(&self, exporter: IpAddr) -> usize {
        self.per_exporter.get(&exporter).map_or(0, |count| *count)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
