//! Sample catalog: category ordering and grouping of the engine sample list.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
};

use shared::{domain::Sample, error::CatalogError};

pub const DEFAULT_PREFERRED_CATEGORIES: [&str; 2] = ["api", "performance"];

const LISTING_COLUMN: usize = 20;
const LISTING_RULE: usize = 30;

/// Tab order for categories: preferred names first in list order, then
/// everything else alphabetically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOrderPolicy {
    preferred: Vec<String>,
}

impl Default for CategoryOrderPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PREFERRED_CATEGORIES)
    }
}

impl CategoryOrderPolicy {
    pub fn new<I, S>(preferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preferred: preferred.into_iter().map(Into::into).collect(),
        }
    }

    pub fn preferred(&self) -> &[String] {
        &self.preferred
    }

    fn rank(&self, category: &str) -> Option<usize> {
        self.preferred.iter().position(|p| p == category)
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ra), Some(rb)) => ra.cmp(&rb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    /// Orders a set of category names. Duplicates collapse.
    pub fn order<'a, I>(&self, categories: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let unique: BTreeSet<&str> = categories.into_iter().collect();
        let mut ordered: Vec<&str> = unique.into_iter().collect();
        ordered.sort_by(|a, b| self.compare(a, b));
        ordered.into_iter().map(str::to_string).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSection {
    pub category: String,
    pub samples: Vec<Sample>,
}

/// Ordered, categorized view of the samples for one presentation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    sections: Vec<CatalogSection>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[CatalogSection] {
        &self.sections
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.category.as_str())
    }

    pub fn samples_in(&self, category: &str) -> Option<&[Sample]> {
        self.sections
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.samples.as_slice())
    }

    pub fn find(&self, id: &str) -> Option<&Sample> {
        self.samples().find(|sample| sample.id == id)
    }

    /// All samples in presentation order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.sections.iter().flat_map(|s| s.samples.iter())
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.samples.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn tab_count(&self) -> usize {
        self.sections.len()
    }

    /// `Id | Name | Description` table, one row per sample in tab order.
    pub fn render_listing(&self) -> Vec<String> {
        let rule = "-".repeat(LISTING_RULE);
        let mut lines = vec![
            format!(
                "{:w$} | {:w$} | {:w$}",
                "Id",
                "Name",
                "Description",
                w = LISTING_COLUMN
            ),
            format!("{rule}---{rule}---{rule}"),
        ];
        for sample in self.samples() {
            let line = format!(
                "{:w$} | {:w$} | {}",
                sample.id,
                sample.display_name,
                sample.description,
                w = LISTING_COLUMN
            );
            lines.push(line.trim_end().to_string());
        }
        lines
    }
}

#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    policy: CategoryOrderPolicy,
}

impl CatalogBuilder {
    pub fn new(policy: CategoryOrderPolicy) -> Self {
        Self { policy }
    }

    /// Fails on the first id seen twice.
    pub fn build(&self, samples: Vec<Sample>) -> Result<Catalog, CatalogError> {
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in &samples {
            if !seen.insert(sample.id.as_str()) {
                return Err(CatalogError::DuplicateId {
                    id: sample.id.clone(),
                });
            }
        }
        Ok(self.assemble(samples))
    }

    /// First-seen wins; later samples reusing an id are returned so the caller
    /// can report them.
    pub fn build_lenient(&self, samples: Vec<Sample>) -> (Catalog, Vec<Sample>) {
        let mut seen = HashSet::with_capacity(samples.len());
        let mut kept = Vec::with_capacity(samples.len());
        let mut dropped = Vec::new();
        for sample in samples {
            if seen.insert(sample.id.clone()) {
                kept.push(sample);
            } else {
                dropped.push(sample);
            }
        }
        (self.assemble(kept), dropped)
    }

    fn assemble(&self, samples: Vec<Sample>) -> Catalog {
        let mut groups: HashMap<String, Vec<Sample>> = HashMap::new();
        for sample in samples {
            groups.entry(sample.category.clone()).or_default().push(sample);
        }

        let order = self.policy.order(groups.keys().map(String::as_str));
        let sections = order
            .into_iter()
            .filter_map(|category| {
                groups.remove(&category).map(|samples| CatalogSection { category, samples })
            })
            .collect();
        Catalog { sections }
    }
}
