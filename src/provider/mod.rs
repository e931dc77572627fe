mod types;

pub use types::{
    AzureSettings, ProviderKind, ProviderProfile, DEFAULT_AZURE_API_VERSION, DEFAULT_TIMEOUT,
};
