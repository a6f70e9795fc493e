pub mod credential;
pub mod listing;

pub use credential::{ApiCredentials, CredentialUpdate, Endpoint, TenantCredential, TenantId};
pub use listing::{
    ListingDetails, ListingFilter, ListingRecord, ListingStatus, ListingType, NormalizedListing,
};
