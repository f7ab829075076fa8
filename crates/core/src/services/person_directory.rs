//! Person directory adapter.
//!
//! Wraps the external family/person registry. A missing subject is an
//! expected outcome and is reported as [`DirectoryError::NotFound`], distinct
//! from a degraded upstream.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use travel_cost_common::config::PersonDirectoryConfig;
use travel_cost_common::{AppError, AppResult};

const FAMILY_PATH: &str = "/motpartbarnrelasjon";
const PERSON_INFO_PATH: &str = "/informasjon";

/// Failure of a directory lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// The registry has no person with the identifier.
    #[error("Person not found")]
    NotFound,
    /// The registry failed or could not be reached.
    #[error("Upstream failure (status {status:?})")]
    Upstream { status: Option<u16> },
}

impl DirectoryError {
    /// Convert to the application error for a lookup of `ident`.
    #[must_use]
    pub fn into_app_error(self, ident: &str) -> AppError {
        match self {
            Self::NotFound => AppError::SubjectNotFound(mask(ident)),
            Self::Upstream { status } => AppError::UpstreamUnavailable { status },
        }
    }
}

/// Keep only the birthdate part of a personal identifier for messages.
fn mask(ident: &str) -> String {
    let visible: String = ident.chars().take(6).collect();
    format!("{visible}*****")
}

/// A person as listed in someone's family relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub ident: String,
    pub first_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

impl FamilyMember {
    /// Age in whole years on the given date, if the birthdate is known.
    #[must_use]
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        self.birthdate.and_then(|b| date.years_since(b))
    }
}

/// A co-parent and the children shared with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoParentRelation {
    pub co_parent: FamilyMember,
    pub shared_children: Vec<FamilyMember>,
}

/// Family relations of one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyRelations {
    pub co_parent_relations: Vec<CoParentRelation>,
    pub children_without_co_parent: Vec<FamilyMember>,
}

impl FamilyRelations {
    /// Whether nothing at all is on record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.co_parent_relations.is_empty() && self.children_without_co_parent.is_empty()
    }

    /// All recorded co-parents.
    pub fn co_parents(&self) -> impl Iterator<Item = &FamilyMember> {
        self.co_parent_relations.iter().map(|r| &r.co_parent)
    }

    /// All recorded children, each once.
    #[must_use]
    pub fn children(&self) -> Vec<&FamilyMember> {
        let mut by_ident = BTreeMap::new();
        for child in self
            .co_parent_relations
            .iter()
            .flat_map(|r| r.shared_children.iter())
            .chain(self.children_without_co_parent.iter())
        {
            by_ident.entry(child.ident.as_str()).or_insert(child);
        }
        by_ident.into_values().collect()
    }

    /// Children shared with the given co-parent.
    pub fn shared_children_with<'a>(
        &'a self,
        co_parent: &'a str,
    ) -> impl Iterator<Item = &'a FamilyMember> + 'a {
        self.co_parent_relations
            .iter()
            .filter(move |r| r.co_parent.ident == co_parent)
            .flat_map(|r| r.shared_children.iter())
    }

    /// Whether the identity is a recorded co-parent.
    #[must_use]
    pub fn has_co_parent(&self, ident: &str) -> bool {
        self.co_parents().any(|p| p.ident == ident)
    }

    /// Whether the identity is a recorded child.
    #[must_use]
    pub fn has_child(&self, ident: &str) -> bool {
        self.co_parent_relations
            .iter()
            .flat_map(|r| r.shared_children.iter())
            .chain(self.children_without_co_parent.iter())
            .any(|c| c.ident == ident)
    }
}

/// Biographical data of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInfo {
    pub ident: String,
    pub first_name: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

/// Lookup of family and person data.
#[async_trait]
pub trait PersonDirectory: Send + Sync {
    /// Fetch the family relations of a person.
    async fn fetch_family(&self, ident: &str) -> Result<FamilyRelations, DirectoryError>;

    /// Fetch name and birthdate of a person.
    async fn fetch_person_info(&self, ident: &str) -> Result<PersonInfo, DirectoryError>;
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    ident: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryPerson {
    ident: String,
    #[serde(default)]
    fornavn: Option<String>,
    #[serde(default)]
    foedselsdato: Option<NaiveDate>,
}

impl From<RegistryPerson> for FamilyMember {
    fn from(p: RegistryPerson) -> Self {
        Self {
            ident: p.ident,
            first_name: p.fornavn,
            birthdate: p.foedselsdato,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryRelation {
    motpart: Option<RegistryPerson>,
    #[serde(default)]
    felles_barn: Vec<RegistryPerson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryFamily {
    #[serde(default)]
    personens_motpart_barn_relasjon: Vec<RegistryRelation>,
}

impl From<RegistryFamily> for FamilyRelations {
    fn from(family: RegistryFamily) -> Self {
        let mut relations = Self::default();
        for relation in family.personens_motpart_barn_relasjon {
            let children: Vec<FamilyMember> =
                relation.felles_barn.into_iter().map(Into::into).collect();
            match relation.motpart {
                Some(co_parent) => relations.co_parent_relations.push(CoParentRelation {
                    co_parent: co_parent.into(),
                    shared_children: children,
                }),
                None => relations.children_without_co_parent.extend(children),
            }
        }
        relations
    }
}

/// [`PersonDirectory`] over the registry's HTTP API.
///
/// No retries are attempted. Timeouts surface as upstream failures.
#[derive(Clone)]
pub struct HttpPersonDirectory {
    client: Client,
    base_url: String,
}

impl HttpPersonDirectory {
    /// Create a client from configuration.
    pub fn new(config: &PersonDirectoryConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, ident: &str) -> Result<T, DirectoryError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "Calling person directory");

        let response = self
            .client
            .post(&url)
            .json(&LookupRequest { ident })
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Person directory unreachable");
                DirectoryError::Upstream {
                    status: e.status().map(|s| s.as_u16()),
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(target: "secure_log", ident = %ident, path = %path, "Person not found in directory");
            return Err(DirectoryError::NotFound);
        }
        if !status.is_success() {
            warn!(url = %url, status = %status, "Person directory returned an error");
            return Err(DirectoryError::Upstream {
                status: Some(status.as_u16()),
            });
        }

        response.json::<T>().await.map_err(|e| {
            warn!(url = %url, error = %e, "Unreadable person directory response");
            DirectoryError::Upstream {
                status: Some(status.as_u16()),
            }
        })
    }
}

#[async_trait]
impl PersonDirectory for HttpPersonDirectory {
    async fn fetch_family(&self, ident: &str) -> Result<FamilyRelations, DirectoryError> {
        self.post::<RegistryFamily>(FAMILY_PATH, ident)
            .await
            .map(Into::into)
    }

    async fn fetch_person_info(&self, ident: &str) -> Result<PersonInfo, DirectoryError> {
        let person = self.post::<RegistryPerson>(PERSON_INFO_PATH, ident).await?;
        Ok(PersonInfo {
            ident: person.ident,
            first_name: person.fornavn,
            birthdate: person.foedselsdato,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn member(ident: &str) -> FamilyMember {
        FamilyMember {
            ident: ident.to_string(),
            first_name: None,
            birthdate: None,
        }
    }

    #[test]
    fn test_registry_family_maps_to_relations() {
        let json = r#"{
            "personensMotpartBarnRelasjon": [
                {
                    "motpart": { "ident": "11111122222", "fornavn": "Kari" },
                    "fellesBarn": [{ "ident": "33333355555", "foedselsdato": "2015-03-01" }]
                },
                {
                    "motpart": null,
                    "fellesBarn": [{ "ident": "44444466666" }]
                }
            ]
        }"#;

        let family: FamilyRelations = serde_json::from_str::<RegistryFamily>(json).unwrap().into();

        assert!(family.has_co_parent("11111122222"));
        assert!(family.has_child("33333355555"));
        assert!(family.has_child("44444466666"));
        assert_eq!(family.children_without_co_parent.len(), 1);
        assert_eq!(
            family.shared_children_with("11111122222").next().unwrap().birthdate,
            NaiveDate::from_ymd_opt(2015, 3, 1)
        );
    }

    #[test]
    fn test_children_are_listed_once() {
        let family = FamilyRelations {
            co_parent_relations: vec![
                CoParentRelation {
                    co_parent: member("B"),
                    shared_children: vec![member("C1")],
                },
                CoParentRelation {
                    co_parent: member("B2"),
                    shared_children: vec![member("C1"), member("C2")],
                },
            ],
            children_without_co_parent: vec![member("C3")],
        };

        let idents: Vec<&str> = family.children().iter().map(|c| c.ident.as_str()).collect();
        assert_eq!(idents, vec!["C1", "C2", "C3"]);
        assert!(!family.is_empty());
        assert!(FamilyRelations::default().is_empty());
    }

    #[test]
    fn test_directory_error_maps_to_app_error() {
        let err = DirectoryError::NotFound.into_app_error("12345678910");
        assert!(matches!(err, AppError::SubjectNotFound(ref s) if s == "123456*****"));

        let err = DirectoryError::Upstream { status: Some(500) }.into_app_error("12345678910");
        assert!(matches!(err, AppError::UpstreamUnavailable { status: Some(500) }));
        assert!(err.is_server_error());
    }

    #[test]
    fn test_age_on() {
        let child = FamilyMember {
            ident: "C1".to_string(),
            first_name: None,
            birthdate: NaiveDate::from_ymd_opt(2010, 6, 15),
        };
        let day_before = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let birthday = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(child.age_on(day_before), Some(14));
        assert_eq!(child.age_on(birthday), Some(15));
        assert_eq!(member("X").age_on(birthday), None);
    }
}
