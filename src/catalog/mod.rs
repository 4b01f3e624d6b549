//! CSV scheme catalog import. Administrators maintain the benefit-scheme
//! catalog as a spreadsheet export; this module turns it into `Scheme` records
//! with document keywords resolved to categories at load time.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use tracing::warn;

use crate::domain::{DocumentRequirement, Scheme, SchemeCriteria, SchemeId};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Invalid(String),
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read scheme catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid catalog CSV data: {}", err),
            CatalogImportError::Invalid(detail) => {
                write!(f, "catalog row rejected: {}", detail)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct SchemeCatalogImporter;

impl SchemeCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Scheme>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse the catalog, keeping the first row for each scheme slug and
    /// logging any duplicates it shadows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Scheme>, CatalogImportError> {
        let now = Utc::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut schemes = Vec::new();

        for record in parser::parse_records(reader)? {
            let slug = slugify(&record.name);
            if !seen.insert(slug.clone()) {
                warn!(scheme = %record.name, "duplicate catalog row skipped");
                continue;
            }

            schemes.push(Scheme {
                id: SchemeId(slug),
                name: record.name,
                category: record.category,
                description: record.description,
                criteria: SchemeCriteria {
                    min_age: record.min_age,
                    max_age: record.max_age,
                    income_ceiling: record.income_ceiling,
                    categories: record.castes,
                    gender: record.gender,
                    states: record.states,
                    education: None,
                    employment: None,
                },
                required_documents: record
                    .documents
                    .into_iter()
                    .map(DocumentRequirement::resolve)
                    .collect(),
                benefits: record.benefits,
                active: record.active,
                created_at: now,
            });
        }

        Ok(schemes)
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut previous_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
