use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::CatalogImportError;

#[derive(Debug)]
pub(crate) struct CatalogRecord {
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) description: String,
    pub(crate) min_age: Option<u8>,
    pub(crate) max_age: Option<u8>,
    pub(crate) income_ceiling: Option<String>,
    pub(crate) castes: Vec<String>,
    pub(crate) gender: Option<String>,
    pub(crate) states: Vec<String>,
    pub(crate) documents: Vec<String>,
    pub(crate) benefits: Vec<String>,
    pub(crate) active: bool,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<CatalogRecord>, CatalogImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for (index, record) in csv_reader.deserialize::<CatalogRow>().enumerate() {
        let row = record?;
        let line = index + 2; // header occupies line 1
        if row.name.trim().is_empty() {
            return Err(CatalogImportError::Invalid(format!(
                "line {line}: scheme name is empty"
            )));
        }

        records.push(CatalogRecord {
            name: row.name.trim().to_string(),
            category: row.category.clone().unwrap_or_else(|| "General".to_string()),
            description: row.description.clone().unwrap_or_default(),
            min_age: parse_age(row.min_age.as_deref(), "Min Age", line)?,
            max_age: parse_age(row.max_age.as_deref(), "Max Age", line)?,
            income_ceiling: row.income_ceiling.clone(),
            castes: split_list(row.castes.as_deref()),
            gender: row.gender.clone(),
            states: split_list(row.states.as_deref()),
            documents: split_list(row.documents.as_deref()),
            benefits: split_list(row.benefits.as_deref()),
            active: parse_active(row.active.as_deref(), line)?,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Category", default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
    #[serde(rename = "Min Age", default, deserialize_with = "empty_string_as_none")]
    min_age: Option<String>,
    #[serde(rename = "Max Age", default, deserialize_with = "empty_string_as_none")]
    max_age: Option<String>,
    #[serde(
        rename = "Income Ceiling",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    income_ceiling: Option<String>,
    #[serde(rename = "Castes", default, deserialize_with = "empty_string_as_none")]
    castes: Option<String>,
    #[serde(rename = "Gender", default, deserialize_with = "empty_string_as_none")]
    gender: Option<String>,
    #[serde(rename = "States", default, deserialize_with = "empty_string_as_none")]
    states: Option<String>,
    #[serde(rename = "Documents", default, deserialize_with = "empty_string_as_none")]
    documents: Option<String>,
    #[serde(rename = "Benefits", default, deserialize_with = "empty_string_as_none")]
    benefits: Option<String>,
    #[serde(rename = "Active", default, deserialize_with = "empty_string_as_none")]
    active: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Pipe-separated multi-value cell, e.g. "OBC|SC|ST".
fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split('|')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_age(
    value: Option<&str>,
    column: &str,
    line: usize,
) -> Result<Option<u8>, CatalogImportError> {
    match value {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u8>().map(Some).map_err(|_| {
            CatalogImportError::Invalid(format!("line {line}: {column} '{raw}' is not an age"))
        }),
    }
}

fn parse_active(value: Option<&str>, line: usize) -> Result<bool, CatalogImportError> {
    match value {
        None => Ok(true),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(CatalogImportError::Invalid(format!(
                "line {line}: Active '{other}' is not a boolean"
            ))),
        },
    }
}
