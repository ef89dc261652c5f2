//! Veritas Status: Status list revocation checking.
//!
//! - Status Entry Extractor (`extract`): finds `credentialStatus` / `status`
//!   claims and normalizes them into [`StatusListEntry`] records
//! - Status list documents (`content`) and their expansion (`expansion`)
//! - Status Value Reader (`reader`)
//! - Fetch capability with single-flight caching (`fetch`)
//! - [`StatusValidator`] tying the steps together for one entry

pub mod content;
pub mod entry;
pub mod error;
pub mod expansion;
pub mod extract;
pub mod fetch;
pub mod reader;
pub mod validator;

pub use content::{read_status_list, StatusListContent};
pub use entry::{BitOrder, CredentialStatus, StatusListEntry, StatusListType};
pub use error::{FetchError, StatusError};
pub use expansion::{expand, Compression, ExpandedStatusList};
pub use extract::{extract_status_entries, StatusEntryExtractor};
pub use fetch::{SingleFlightFetcher, StaticFetcher, StatusListFetcher};
pub use reader::read_status;
pub use validator::StatusValidator;
