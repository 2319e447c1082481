//! Deposition metadata changes.
//!
//! A [`MetadataUpdate`] is laid over the metadata a deposition already has.
//! The merged result is then checked: the upload type decides which sub-type
//! is required, the access right decides which companions are required, and
//! missing dates and licenses fall back to documented defaults with a notice.

use crate::error::{Result, ZenodoError};
use crate::report::{Notice, Reporter};
use crate::vocabulary::{AccessRight, ImageType, PublicationType, UploadType, CREATOR_FIELDS};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// One author of a deposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Creator {
    /// `Family name, Given names`
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orcid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnd: Option<String>,
}

impl Creator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
            orcid: None,
            gnd: None,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn with_orcid(mut self, orcid: impl Into<String>) -> Self {
        self.orcid = Some(orcid.into());
        self
    }
}

impl TryFrom<Value> for Creator {
    type Error = ZenodoError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(ZenodoError::InvalidArgument(
                "Members of the 'creators' list must be JSON objects".into(),
            ));
        };

        let allowed: Vec<&str> = CREATOR_FIELDS.iter().map(|(key, _)| *key).collect();
        if let Some(unknown) = map.keys().find(|key| !allowed.contains(&key.as_str())) {
            return Err(ZenodoError::InvalidArgument(format!(
                "Unknown creator key '{}'. The elements of the 'creators' list allow the keys: {}",
                unknown,
                allowed.join(", ")
            )));
        }

        let text = |key: &str| -> Result<Option<String>> {
            match map.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(ZenodoError::InvalidArgument(format!(
                    "The creator '{key}' must be a string"
                ))),
            }
        };

        let name = text("name")?
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ZenodoError::InvalidArgument("A creator requires a 'name'".into()))?;

        Ok(Self {
            name,
            affiliation: text("affiliation")?,
            orcid: text("orcid")?,
            gnd: text("gnd")?,
        })
    }
}

/// Changes to a deposition's metadata.
///
/// Fields left as `None` keep the value the deposition already has.
/// Optional descriptive fields (`keywords`, `notes`, `related_identifiers`,
/// `journal_title`, ...) go in `extra` and are passed through as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataUpdate {
    pub upload_type: Option<UploadType>,
    pub publication_type: Option<PublicationType>,
    pub image_type: Option<ImageType>,
    /// `YYYY-MM-DD`; defaults to today (UTC)
    pub publication_date: Option<String>,
    pub title: Option<String>,
    pub creators: Option<Vec<Creator>>,
    pub description: Option<String>,
    /// Defaults to `open`
    pub access_right: Option<AccessRight>,
    pub license: Option<String>,
    /// `YYYY-MM-DD`; defaults to today (UTC) when embargoed
    pub embargo_date: Option<String>,
    pub access_conditions: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetadataUpdate {
    pub fn new(upload_type: UploadType, title: impl Into<String>) -> Self {
        Self {
            upload_type: Some(upload_type),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_creator(mut self, creator: Creator) -> Self {
        self.creators.get_or_insert_with(Vec::new).push(creator);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_access_right(mut self, access_right: AccessRight) -> Self {
        self.access_right = Some(access_right);
        self
    }

    pub fn with_license(mut self, license: impl Into<String>) -> Self {
        self.license = Some(license.into());
        self
    }

    /// Set an optional descriptive field.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Merge over `existing` and check the result, using today's UTC date
    /// for defaulted dates.
    pub fn resolve(
        &self,
        existing: &Map<String, Value>,
        reporter: &dyn Reporter,
    ) -> Result<Map<String, Value>> {
        self.resolve_at(existing, Utc::now().date_naive(), reporter)
    }

    pub(crate) fn resolve_at(
        &self,
        existing: &Map<String, Value>,
        today: NaiveDate,
        reporter: &dyn Reporter,
    ) -> Result<Map<String, Value>> {
        let mut merged = existing.clone();
        for (key, value) in &self.extra {
            merged.insert(key.clone(), value.clone());
        }

        let upload_type: UploadType =
            pick(self.upload_type, &merged, "upload_type")?.ok_or_else(|| required("upload_type"))?;
        merged.insert("upload_type".into(), upload_type.as_str().into());

        match upload_type {
            UploadType::Publication => {
                let sub: PublicationType = pick(self.publication_type, &merged, "publication_type")?
                    .ok_or_else(|| required("publication_type"))?;
                merged.insert("publication_type".into(), sub.as_str().into());
            }
            UploadType::Image => {
                let sub: ImageType = pick(self.image_type, &merged, "image_type")?
                    .ok_or_else(|| required("image_type"))?;
                merged.insert("image_type".into(), sub.as_str().into());
            }
            _ => {}
        }

        match pick_text(self.publication_date.as_deref(), &merged, "publication_date") {
            Some(date) => {
                let date = parse_date("publication_date", &date)?;
                merged.insert("publication_date".into(), date.to_string().into());
            }
            None => {
                let value = today.to_string();
                reporter.notice(Notice::DefaultApplied {
                    field: "publication_date",
                    value: value.clone(),
                });
                merged.insert("publication_date".into(), value.into());
            }
        }

        for (field, given) in [
            ("title", self.title.as_deref()),
            ("description", self.description.as_deref()),
        ] {
            let text = pick_text(given, &merged, field).ok_or_else(|| required(field))?;
            merged.insert(field.into(), text.into());
        }

        let creators = match &self.creators {
            Some(creators) => creators.clone(),
            None => existing_creators(&merged)?,
        };
        if creators.is_empty() {
            return Err(required("creators"));
        }
        let creators = serde_json::to_value(&creators)
            .map_err(|e| ZenodoError::Parse(format!("Failed to encode creators: {}", e)))?;
        merged.insert("creators".into(), creators);

        self.resolve_access(&mut merged, upload_type, today, reporter)?;

        Ok(merged)
    }

    fn resolve_access(
        &self,
        merged: &mut Map<String, Value>,
        upload_type: UploadType,
        today: NaiveDate,
        reporter: &dyn Reporter,
    ) -> Result<()> {
        let access_right: AccessRight = match pick(self.access_right, merged, "access_right")? {
            Some(access_right) => access_right,
            None => {
                reporter.notice(Notice::DefaultApplied {
                    field: "access_right",
                    value: AccessRight::Open.as_str().into(),
                });
                if pick_text(self.license.as_deref(), merged, "license").is_none() {
                    let license = upload_type.default_license();
                    reporter.notice(Notice::DefaultApplied {
                        field: "license",
                        value: license.into(),
                    });
                    merged.insert("license".into(), license.into());
                }
                AccessRight::Open
            }
        };
        merged.insert("access_right".into(), access_right.as_str().into());

        if matches!(access_right, AccessRight::Open | AccessRight::Embargoed) {
            let license = pick_text(self.license.as_deref(), merged, "license").ok_or_else(|| {
                ZenodoError::InvalidArgument(
                    "The 'license' argument cannot be empty if 'access_right' is 'open' or 'embargoed'"
                        .into(),
                )
            })?;
            merged.insert("license".into(), license.into());
        }

        match access_right {
            AccessRight::Embargoed => {
                let date = match pick_text(self.embargo_date.as_deref(), merged, "embargo_date") {
                    Some(date) => parse_date("embargo_date", &date)?,
                    None => {
                        reporter.notice(Notice::DefaultApplied {
                            field: "embargo_date",
                            value: today.to_string(),
                        });
                        today
                    }
                };
                merged.insert("embargo_date".into(), date.to_string().into());
            }
            AccessRight::Restricted => {
                let conditions =
                    pick_text(self.access_conditions.as_deref(), merged, "access_conditions")
                        .ok_or_else(|| required("access_conditions"))?;
                merged.insert("access_conditions".into(), conditions.into());
            }
            AccessRight::Open | AccessRight::Closed => {}
        }

        Ok(())
    }
}

fn required(field: &str) -> ZenodoError {
    ZenodoError::InvalidArgument(format!("The '{field}' argument cannot be empty"))
}

// Given value, else the existing one parsed from its wire name.
fn pick<T>(given: Option<T>, merged: &Map<String, Value>, field: &str) -> Result<Option<T>>
where
    T: FromStr<Err = ZenodoError>,
{
    if given.is_some() {
        return Ok(given);
    }
    match merged.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => other.to_string().parse().map(Some),
    }
}

fn pick_text(given: Option<&str>, merged: &Map<String, Value>, field: &str) -> Option<String> {
    given
        .map(str::to_string)
        .or_else(|| merged.get(field).and_then(Value::as_str).map(str::to_string))
        .filter(|text| !text.trim().is_empty())
}

fn parse_date(field: &str, text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| {
        ZenodoError::InvalidArgument(format!(
            "The '{field}' value ({text}) must be a date in the form YYYY-MM-DD"
        ))
    })
}

fn existing_creators(merged: &Map<String, Value>) -> Result<Vec<Creator>> {
    match merged.get("creators") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().cloned().map(Creator::try_from).collect(),
        Some(_) => Err(ZenodoError::InvalidArgument(
            "The 'creators' metadata must be a list".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn software() -> MetadataUpdate {
        MetadataUpdate::new(UploadType::Software, "My tool")
            .with_creator(Creator::new("Doe, Jane").with_affiliation("CERN"))
            .with_description("A tool")
    }

    fn resolve(update: &MetadataUpdate, existing: Value) -> (Result<Map<String, Value>>, Vec<Notice>) {
        let reporter = MemoryReporter::new();
        let existing = existing.as_object().cloned().unwrap_or_default();
        let result = update.resolve_at(&existing, today(), &reporter);
        (result, reporter.notices())
    }

    fn invalid(result: Result<Map<String, Value>>) -> String {
        match result {
            Err(ZenodoError::InvalidArgument(msg)) => msg,
            other => panic!("Expected InvalidArgument, got: {:?}", other),
        }
    }

    #[test]
    fn test_defaults_with_notices() {
        let (merged, notices) = resolve(&software(), json!({}));
        let merged = merged.unwrap();

        assert_eq!(merged["upload_type"], json!("software"));
        assert_eq!(merged["publication_date"], json!("2024-05-17"));
        assert_eq!(merged["access_right"], json!("open"));
        assert_eq!(merged["license"], json!("cc-by"));
        assert_eq!(
            merged["creators"],
            json!([{"name": "Doe, Jane", "affiliation": "CERN"}])
        );

        let fields: Vec<&str> = notices
            .iter()
            .filter_map(|n| match n {
                Notice::DefaultApplied { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec!["publication_date", "access_right", "license"]);
    }

    #[test]
    fn test_dataset_defaults_to_cc_zero() {
        let mut update = software();
        update.upload_type = Some(UploadType::Dataset);
        let (merged, _) = resolve(&update, json!({}));
        assert_eq!(merged.unwrap()["license"], json!("cc-zero"));
    }

    #[test]
    fn test_existing_metadata_fills_gaps() {
        let update = MetadataUpdate {
            title: Some("New title".into()),
            ..MetadataUpdate::default()
        };
        let existing = json!({
            "upload_type": "dataset",
            "title": "Old title",
            "description": "Kept",
            "creators": [{"name": "Doe, John", "orcid": "0000-0002-1825-0097"}],
            "publication_date": "2020-01-01",
            "access_right": "closed",
            "keywords": ["a", "b"]
        });
        let (merged, notices) = resolve(&update, existing);
        let merged = merged.unwrap();

        assert_eq!(merged["title"], json!("New title"));
        assert_eq!(merged["description"], json!("Kept"));
        assert_eq!(merged["publication_date"], json!("2020-01-01"));
        assert_eq!(merged["access_right"], json!("closed"));
        assert_eq!(merged["keywords"], json!(["a", "b"]));
        assert!(notices.is_empty());
    }

    #[test]
    fn test_existing_license_survives_access_default() {
        let update = MetadataUpdate {
            title: Some("New".into()),
            ..MetadataUpdate::default()
        };
        let existing = json!({
            "upload_type": "software",
            "title": "Old",
            "description": "Kept",
            "creators": [{"name": "Doe, Jane"}],
            "publication_date": "2021-03-04",
            "license": "mit"
        });
        let (merged, notices) = resolve(&update, existing);
        let merged = merged.unwrap();

        assert_eq!(merged["license"], json!("mit"));
        assert_eq!(merged["access_right"], json!("open"));
        assert_eq!(
            notices,
            vec![Notice::DefaultApplied {
                field: "access_right",
                value: "open".into()
            }]
        );
    }

    #[test]
    fn test_publication_requires_sub_type() {
        let mut update = software();
        update.upload_type = Some(UploadType::Publication);
        let msg = invalid(resolve(&update, json!({})).0);
        assert!(msg.contains("publication_type"));

        update.publication_type = Some(PublicationType::Article);
        let merged = resolve(&update, json!({})).0.unwrap();
        assert_eq!(merged["publication_type"], json!("article"));
    }

    #[test]
    fn test_image_requires_sub_type() {
        let mut update = software();
        update.upload_type = Some(UploadType::Image);
        assert!(invalid(resolve(&update, json!({})).0).contains("image_type"));
    }

    #[test]
    fn test_missing_upload_type() {
        let update = MetadataUpdate::default();
        assert!(invalid(resolve(&update, json!({})).0).contains("upload_type"));
    }

    #[test]
    fn test_existing_out_of_vocabulary_value() {
        let update = MetadataUpdate::default();
        let msg = invalid(resolve(&update, json!({"upload_type": "spreadsheet"})).0);
        assert!(msg.contains("publication, poster"));
    }

    #[test]
    fn test_creators_required() {
        let update = MetadataUpdate::new(UploadType::Software, "t").with_description("d");
        assert!(invalid(resolve(&update, json!({})).0).contains("creators"));
    }

    #[test]
    fn test_embargo_defaults_to_today() {
        let update = software()
            .with_access_right(AccessRight::Embargoed)
            .with_license("cc-by");
        let (merged, notices) = resolve(&update, json!({}));
        assert_eq!(merged.unwrap()["embargo_date"], json!("2024-05-17"));
        assert!(notices.contains(&Notice::DefaultApplied {
            field: "embargo_date",
            value: "2024-05-17".into()
        }));
    }

    #[test]
    fn test_open_requires_license() {
        let update = software().with_access_right(AccessRight::Open);
        assert!(invalid(resolve(&update, json!({})).0).contains("license"));
    }

    #[test]
    fn test_restricted_requires_conditions() {
        let mut update = software().with_access_right(AccessRight::Restricted);
        assert!(invalid(resolve(&update, json!({})).0).contains("access_conditions"));

        update.access_conditions = Some("Ask first".into());
        let merged = resolve(&update, json!({})).0.unwrap();
        assert_eq!(merged["access_conditions"], json!("Ask first"));
    }

    #[test]
    fn test_bad_date_rejected() {
        let mut update = software();
        update.publication_date = Some("17/05/2024".into());
        assert!(invalid(resolve(&update, json!({})).0).contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_creator_rejects_unknown_keys() {
        let err = Creator::try_from(json!({"name": "Doe, J", "email": "j@x.org"})).unwrap_err();
        match err {
            ZenodoError::InvalidArgument(msg) => {
                assert!(msg.contains("'email'"));
                assert!(msg.contains("name, affiliation, orcid, gnd"));
            }
            e => panic!("Expected InvalidArgument, got: {:?}", e),
        }
        assert!(Creator::try_from(json!("Doe, J")).is_err());
        assert!(Creator::try_from(json!({"affiliation": "CERN"})).is_err());
    }

    #[test]
    fn test_deserialize_from_json() {
        let update: MetadataUpdate = serde_json::from_value(json!({
            "upload_type": "poster",
            "title": "A poster",
            "creators": [{"name": "Doe, Jane"}],
            "description": "desc",
            "keywords": ["x"]
        }))
        .unwrap();
        assert_eq!(update.upload_type, Some(UploadType::Poster));
        assert_eq!(update.extra["keywords"], json!(["x"]));

        let bad = serde_json::from_value::<MetadataUpdate>(json!({
            "creators": [{"name": "Doe", "mail": "x"}]
        }));
        assert!(bad.is_err());
    }
}
