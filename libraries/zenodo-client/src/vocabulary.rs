//! Controlled vocabularies of the deposition API.
//!
//! Every enum parses from its wire name and rejects anything else with a
//! message listing the legal choices.

use crate::error::ZenodoError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $( $variant:ident => ($wire:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every value, in documentation order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire name.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// Human-readable label.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Wire names of every value.
            pub fn choices() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ZenodoError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| invalid_choice($field, wanted, &Self::choices()))
            }
        }
    };
}

pub(crate) fn invalid_choice(field: &str, value: &str, choices: &[&str]) -> ZenodoError {
    ZenodoError::InvalidArgument(format!(
        "Invalid '{field}' value ({value}). The '{field}' argument can take one of the following values: {}",
        choices.join(", ")
    ))
}

vocabulary! {
    /// Kind of upload; conditions which sub-type is required.
    UploadType, "upload_type" {
        Publication => ("publication", "Publication"),
        Poster => ("poster", "Poster"),
        Presentation => ("presentation", "Presentation"),
        Dataset => ("dataset", "Dataset"),
        Image => ("image", "Image"),
        Video => ("video", "Video/Audio"),
        Software => ("software", "Software"),
        Lesson => ("lesson", "Lesson"),
        PhysicalObject => ("physicalobject", "Physical object"),
        Other => ("other", "Other"),
    }
}

vocabulary! {
    /// Required when the upload type is `publication`.
    PublicationType, "publication_type" {
        AnnotationCollection => ("annotationcollection", "Annotation collection"),
        Book => ("book", "Book"),
        Section => ("section", "Book section"),
        ConferencePaper => ("conferencepaper", "Conference paper"),
        DataManagementPlan => ("datamanagementplan", "Data management plan"),
        Article => ("article", "Journal article"),
        Patent => ("patent", "Patent"),
        Preprint => ("preprint", "Preprint"),
        Deliverable => ("deliverable", "Project deliverable"),
        Milestone => ("milestone", "Project milestone"),
        Proposal => ("proposal", "Proposal"),
        Report => ("report", "Report"),
        SoftwareDocumentation => ("softwaredocumentation", "Software documentation"),
        TaxonomicTreatment => ("taxonomictreatment", "Taxonomic treatment"),
        TechnicalNote => ("technicalnote", "Technical note"),
        Thesis => ("thesis", "Thesis"),
        WorkingPaper => ("workingpaper", "Working paper"),
        Other => ("other", "Other"),
    }
}

vocabulary! {
    /// Required when the upload type is `image`.
    ImageType, "image_type" {
        Figure => ("figure", "Figure"),
        Plot => ("plot", "Plot"),
        Drawing => ("drawing", "Drawing"),
        Diagram => ("diagram", "Diagram"),
        Photo => ("photo", "Photo"),
        Other => ("other", "Other"),
    }
}

vocabulary! {
    AccessRight, "access_right" {
        Open => ("open", "Open Access"),
        Embargoed => ("embargoed", "Embargoed Access"),
        Restricted => ("restricted", "Restricted Access"),
        Closed => ("closed", "Closed Access"),
    }
}

vocabulary! {
    /// Lifecycle actions on a deposition.
    DepositionAction, "action" {
        Publish => ("publish", "Publish a deposition. Once published it can no longer be deleted."),
        Edit => ("edit", "Unlock an already submitted deposition for editing."),
        Discard => ("discard", "Discard changes in the current editing session."),
        NewVersion => ("newversion", "Create a new version of a deposition. The new draft is linked from 'links.latest_draft' of the response."),
    }
}

vocabulary! {
    /// Encodings the records search can answer in.
    ContentType, "content_type" {
        Json => ("json", "application/json"),
        Zenodo => ("zenodo", "application/vnd.zenodo.v1+json"),
        MarcXml => ("marcxml", "application/marcxml+xml"),
        Bibtex => ("bibtex", "application/x-bibtex"),
        DataCiteXml => ("datacitexml", "application/x-datacite+xml"),
        DublinCore => ("dublincore", "application/x-dc+xml"),
    }
}

vocabulary! {
    SearchStatus, "status" {
        Draft => ("draft", "Draft"),
        Published => ("published", "Published"),
    }
}

vocabulary! {
    SearchSort, "sort" {
        BestMatch => ("bestmatch", "Best match"),
        MostRecent => ("mostrecent", "Most recent (ascending)"),
        LeastRecent => ("-mostrecent", "Most recent (descending)"),
    }
}

vocabulary! {
    /// Auxiliary lookup collections.
    ResourceKind, "resource" {
        Licenses => ("licenses", "Licenses"),
        Communities => ("communities", "Communities"),
        Funders => ("funders", "Funders"),
        Grants => ("grants", "Grants"),
    }
}

impl ContentType {
    pub fn mime_type(&self) -> &'static str {
        self.label()
    }
}

impl UploadType {
    /// License applied when the access right defaults to open.
    pub fn default_license(&self) -> &'static str {
        match self {
            UploadType::Dataset => "cc-zero",
            _ => "cc-by",
        }
    }
}

/// Keys allowed in a creator object, with their meaning.
pub const CREATOR_FIELDS: &[(&str, &str)] = &[
    ("name", "Name of creator in the format Family name, Given names"),
    ("affiliation", "Affiliation of creator (optional)"),
    ("orcid", "ORCID identifier of creator (optional)"),
    ("gnd", "GND identifier of creator (optional)"),
];

/// Funder DOI prefixes accepted in grant identifiers (`<prefix>::<grant>`).
pub const FUNDER_DOIS: &[(&str, &str)] = &[
    ("Australian Research Council", "10.13039/501100000923"),
    ("Austrian Science Fund", "10.13039/501100002428"),
    ("European Commission", "10.13039/501100000780"),
    ("European Environment Agency", "10.13039/501100000806"),
    ("Academy of Finland", "10.13039/501100002341"),
    ("Hrvatska Zaklada za Znanost", "10.13039/501100004488"),
    ("Fundação para a Ciência e a Tecnologia", "10.13039/501100001871"),
    ("Ministarstvo Prosvete, Nauke i Tehnološkog Razvoja", "10.13039/501100004564"),
    ("Ministarstvo Znanosti, Obrazovanja i Sporta", "10.13039/501100006588"),
    ("National Health and Medical Research Council", "10.13039/501100000925"),
    ("National Institutes of Health", "10.13039/100000002"),
    ("National Science Foundation", "10.13039/100000001"),
    ("Nederlandse Organisatie voor Wetenschappelijk Onderzoek", "10.13039/501100003246"),
    ("Research Councils", "10.13039/501100000690"),
    (
        "Schweizerischer Nationalfonds zur Förderung der wissenschaftlichen Forschung",
        "10.13039/501100001711",
    ),
    ("Science Foundation Ireland", "10.13039/501100001602"),
    ("Wellcome Trust", "10.13039/100004440"),
];

/// Funder DOI prefix by funder name.
pub fn funder_doi(funder: &str) -> Option<&'static str> {
    FUNDER_DOIS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(funder))
        .map(|(_, doi)| *doi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_names() {
        assert_eq!("dataset".parse::<UploadType>().unwrap(), UploadType::Dataset);
        assert_eq!(
            "-mostrecent".parse::<SearchSort>().unwrap(),
            SearchSort::LeastRecent
        );
        assert_eq!(
            "newversion".parse::<DepositionAction>().unwrap(),
            DepositionAction::NewVersion
        );
        assert_eq!(" grants ".parse::<ResourceKind>().unwrap(), ResourceKind::Grants);
    }

    #[test]
    fn test_invalid_value_lists_choices() {
        let err = "latest".parse::<SearchSort>().unwrap_err();
        match err {
            ZenodoError::InvalidArgument(msg) => {
                assert!(msg.contains("'sort'"));
                assert!(msg.contains("bestmatch, mostrecent, -mostrecent"));
            }
            e => panic!("Expected InvalidArgument, got: {:?}", e),
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let value = serde_json::to_value(AccessRight::Embargoed).unwrap();
        assert_eq!(value, serde_json::json!("embargoed"));

        let parsed: PublicationType = serde_json::from_str("\"workingpaper\"").unwrap();
        assert_eq!(parsed, PublicationType::WorkingPaper);
    }

    #[test]
    fn test_content_type_mime() {
        assert_eq!(ContentType::Bibtex.mime_type(), "application/x-bibtex");
        assert_eq!(ContentType::Json.to_string(), "json");
    }

    #[test]
    fn test_default_license() {
        assert_eq!(UploadType::Dataset.default_license(), "cc-zero");
        assert_eq!(UploadType::Software.default_license(), "cc-by");
    }

    #[test]
    fn test_funder_lookup() {
        assert_eq!(funder_doi("european commission"), Some("10.13039/501100000780"));
        assert_eq!(funder_doi("Nobody"), None);
    }

    #[test]
    fn test_all_is_complete() {
        assert_eq!(UploadType::ALL.len(), 10);
        assert_eq!(PublicationType::ALL.len(), 18);
        assert_eq!(ImageType::ALL.len(), 6);
        assert_eq!(DepositionAction::choices(), vec!["publish", "edit", "discard", "newversion"]);
    }
}
