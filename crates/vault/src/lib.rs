//! `HashiCorp` Vault integration for ccr
//!
//! This crate decides which store to query and reads secrets from it:
//! - [`locate`] turns a [`SourceSelector`] into [`StoreCredentials`]
//! - [`VcapServices`] reads brokered credentials from `VCAP_SERVICES`
//! - [`StoreSource`] fetches a secret mapping through a [`StoreClient`]
//! - [`VaultHttpClient`] is the AppRole + KV client built on `vaultrs`

mod binding;
mod credentials;
mod locator;
mod store;

pub use binding::{
    BindingLookup, BindingScope, BrokerCredentials, DEFAULT_SERVICE_NAME, VCAP_SERVICES,
    VcapServices,
};
pub use credentials::StoreCredentials;
pub use locator::{ExplicitFields, SourceSelector, broker_store_path, locate};
pub use store::{
    DEFAULT_APPROLE_MOUNT, StoreClient, StoreSource, VaultHttpClient, mapping_from_payload,
};
