//! Status list entries and the status list specifications they follow.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StatusError;

/// Status list specification an entry (or a fetched list) follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusListType {
    /// W3C CCG Revocation List 2020 (zlib, no purpose).
    RevocationList2020,
    /// W3C Status List 2021 (gzip).
    StatusList2021,
    /// W3C Bitstring Status List v1.0 (gzip).
    BitstringStatusList,
    /// IETF OAuth Token Status List (zlib, LSB-first).
    TokenStatusList,
}

/// Order of bits within each byte of an expanded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Index 0 is the most significant bit of byte 0 (W3C lists).
    MsbFirst,
    /// Index 0 is the least significant bit of byte 0 (IETF lists).
    LsbFirst,
}

impl StatusListType {
    /// Parse an entry or list type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "RevocationList2020" | "RevocationList2020Status" | "RevocationList2020Credential" => {
                Some(Self::RevocationList2020)
            }
            "StatusList2021" | "StatusList2021Entry" | "StatusList2021Credential" => {
                Some(Self::StatusList2021)
            }
            "BitstringStatusList" | "BitstringStatusListEntry" | "BitstringStatusListCredential" => {
                Some(Self::BitstringStatusList)
            }
            "TokenStatusList" => Some(Self::TokenStatusList),
            _ => None,
        }
    }

    pub fn bit_order(&self) -> BitOrder {
        match self {
            Self::TokenStatusList => BitOrder::LsbFirst,
            _ => BitOrder::MsbFirst,
        }
    }

    /// Whether the list belongs to the W3C family.
    pub fn is_w3c(&self) -> bool {
        !matches!(self, Self::TokenStatusList)
    }
}

impl fmt::Display for StatusListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RevocationList2020 => write!(f, "RevocationList2020"),
            Self::StatusList2021 => write!(f, "StatusList2021"),
            Self::BitstringStatusList => write!(f, "BitstringStatusList"),
            Self::TokenStatusList => write!(f, "TokenStatusList"),
        }
    }
}

/// Normalized reference from a credential into a status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListEntry {
    /// Dereferenceable id of the status assertion.
    pub id: String,
    #[serde(rename = "type")]
    pub list_type: StatusListType,
    /// `revocation`, `suspension`, ...; IETF entries carry none.
    pub status_purpose: Option<String>,
    pub status_list_index: u64,
    pub status_list_credential: String,
    /// Bits per entry when the entry declares it.
    pub status_size: Option<u8>,
}

impl StatusListEntry {
    /// Build an entry, checking that the list credential is an absolute URL.
    pub fn new(
        id: impl Into<String>,
        list_type: StatusListType,
        status_purpose: Option<String>,
        status_list_index: u64,
        status_list_credential: impl Into<String>,
    ) -> Result<Self, StatusError> {
        let status_list_credential = status_list_credential.into();
        url::Url::parse(&status_list_credential).map_err(|e| {
            StatusError::InvalidEntry(format!(
                "statusListCredential {:?} is not a valid URL: {}",
                status_list_credential, e
            ))
        })?;

        Ok(Self {
            id: id.into(),
            list_type,
            status_purpose,
            status_list_index,
            status_list_credential,
            status_size: None,
        })
    }

    pub fn with_status_size(mut self, status_size: u8) -> Self {
        self.status_size = Some(status_size);
        self
    }
}

/// Fields shared by `StatusList2021Entry` and `BitstringStatusListEntry`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusListEntryFields {
    pub id: Option<String>,
    pub status_purpose: Option<String>,
    #[serde(deserialize_with = "deserialize_index")]
    pub status_list_index: u64,
    pub status_list_credential: String,
    #[serde(default)]
    pub status_size: Option<u8>,
}

/// Fields of a `RevocationList2020Status` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationListEntryFields {
    pub id: Option<String>,
    #[serde(deserialize_with = "deserialize_index")]
    pub revocation_list_index: u64,
    pub revocation_list_credential: String,
}

/// W3C `credentialStatus` object, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum CredentialStatus {
    StatusList2021Entry(StatusListEntryFields),
    BitstringStatusListEntry(StatusListEntryFields),
    RevocationList2020Status(RevocationListEntryFields),
}

impl TryFrom<CredentialStatus> for StatusListEntry {
    type Error = StatusError;

    fn try_from(status: CredentialStatus) -> Result<Self, Self::Error> {
        let (list_type, fields) = match status {
            CredentialStatus::StatusList2021Entry(fields) => (StatusListType::StatusList2021, fields),
            CredentialStatus::BitstringStatusListEntry(fields) => {
                (StatusListType::BitstringStatusList, fields)
            }
            CredentialStatus::RevocationList2020Status(fields) => {
                let id = fields.id.unwrap_or_else(|| {
                    format!(
                        "{}#{}",
                        fields.revocation_list_credential, fields.revocation_list_index
                    )
                });
                return StatusListEntry::new(
                    id,
                    StatusListType::RevocationList2020,
                    Some("revocation".into()),
                    fields.revocation_list_index,
                    fields.revocation_list_credential,
                );
            }
        };

        let id = fields.id.unwrap_or_else(|| {
            format!("{}#{}", fields.status_list_credential, fields.status_list_index)
        });
        let purpose = fields.status_purpose.unwrap_or_else(|| "revocation".into());
        let mut entry = StatusListEntry::new(
            id,
            list_type,
            Some(purpose),
            fields.status_list_index,
            fields.status_list_credential,
        )?;
        entry.status_size = fields.status_size;
        Ok(entry)
    }
}

/// Reference of an IETF token status list claim: `{"idx": .., "uri": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenStatusReference {
    pub idx: u64,
    pub uri: String,
}

impl TryFrom<TokenStatusReference> for StatusListEntry {
    type Error = StatusError;

    fn try_from(reference: TokenStatusReference) -> Result<Self, Self::Error> {
        StatusListEntry::new(
            format!("{}#{}", reference.uri, reference.idx),
            StatusListType::TokenStatusList,
            None,
            reference.idx,
            reference.uri,
        )
    }
}

/// W3C lists encode the index as a decimal string; accept numbers too.
fn deserialize_index<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Index {
        Number(u64),
        Text(String),
    }

    match Index::deserialize(deserializer)? {
        Index::Number(n) => Ok(n),
        Index::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid status list index {:?}: {}", s, e))),
    }
}
