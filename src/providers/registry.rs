use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::apaleo::Apaleo;
use super::guestline::Guestline;
use super::PmsProvider;
use crate::common::constants::{APALEO_PROVIDER, GUESTLINE_PROVIDER};
use crate::common::error::{PmsError, Result};
use crate::domain::Hotel;
use crate::vendor::{RetryPolicy, VendorApi};

/// Builds a provider around the shared vendor handle
pub type ProviderConstructor = fn(Arc<dyn VendorApi>, RetryPolicy) -> Box<dyn PmsProvider>;

/// Registry of the PMS providers this process can talk to.
///
/// Built once at startup and handed to request handlers through the app state.
pub struct ProviderRegistry {
    constructors: IndexMap<&'static str, ProviderConstructor>,
    vendor: Arc<dyn VendorApi>,
    retry: RetryPolicy,
}

impl ProviderRegistry {
    /// Registry with every built-in provider
    pub fn new(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Self {
        let mut registry = Self::empty(vendor, retry);
        registry.register(APALEO_PROVIDER, build_apaleo);
        registry.register(GUESTLINE_PROVIDER, build_guestline);
        registry
    }

    pub fn empty(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Self {
        Self {
            constructors: IndexMap::new(),
            vendor,
            retry,
        }
    }

    pub fn register(&mut self, name: &'static str, constructor: ProviderConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Resolve a provider from a user-supplied name (`apaleo`, `APALEO`, ...)
    pub fn resolve(&self, name: &str) -> Result<Box<dyn PmsProvider>> {
        let key = canonical_name(name)?;
        let constructor = self
            .constructors
            .get(key.as_str())
            .ok_or_else(|| PmsError::NotFound(format!("PMS provider {key}")))?;
        debug!(provider = %key, "resolved PMS provider");
        Ok(constructor(self.vendor.clone(), self.retry))
    }

    /// The provider of a hotel. Hotels without a PMS have none.
    pub fn for_hotel(&self, hotel: &Hotel) -> Result<Box<dyn PmsProvider>> {
        match hotel.pms_provider_name.as_deref() {
            Some(name) => self.resolve(name),
            None => Err(PmsError::NotFound(format!(
                "hotel {} has no PMS provider",
                hotel.id
            ))),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }
}

fn build_apaleo(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Box<dyn PmsProvider> {
    Box::new(Apaleo::new(vendor, retry))
}

fn build_guestline(vendor: Arc<dyn VendorApi>, retry: RetryPolicy) -> Box<dyn PmsProvider> {
    Box::new(Guestline::new(vendor, retry))
}

/// Alphabetic names only, first letter upper, rest lower
fn canonical_name(name: &str) -> Result<String> {
    if name.is_empty() || !name.chars().all(char::is_alphabetic) {
        return Err(PmsError::InvalidName(name.to_string()));
    }
    let mut chars = name.chars();
    let mut canonical = String::with_capacity(name.len());
    if let Some(first) = chars.next() {
        canonical.extend(first.to_uppercase());
    }
    for c in chars {
        canonical.extend(c.to_lowercase());
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::SimulatedVendor;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(SimulatedVendor::reliable()), RetryPolicy::no_delay(1))
    }

    #[test]
    fn test_resolves_case_insensitively() {
        let registry = registry();
        assert_eq!(registry.resolve("apaleo").unwrap().name(), "Apaleo");
        assert_eq!(registry.resolve("APALEO").unwrap().name(), "Apaleo");
        assert_eq!(registry.resolve("guestLine").unwrap().name(), "Guestline");
    }

    #[test]
    fn test_rejects_non_alphabetic_names() {
        let registry = registry();
        assert!(matches!(registry.resolve("apa1eo"), Err(PmsError::InvalidName(_))));
        assert!(matches!(registry.resolve(""), Err(PmsError::InvalidName(_))));
        assert!(matches!(registry.resolve("../apaleo"), Err(PmsError::InvalidName(_))));
    }

    #[test]
    fn test_unknown_provider_is_not_found() {
        assert!(matches!(registry().resolve("mews"), Err(PmsError::NotFound(_))));
    }

    #[test]
    fn test_names_and_hotel_lookup() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["Apaleo", "Guestline"]);

        let hotel = Hotel::new("Hotel 2", "London", Some("Guestline"), "LON");
        assert_eq!(registry.for_hotel(&hotel).unwrap().name(), "Guestline");

        let no_pms = Hotel::new("Hotel 3", "Paris", None, "");
        assert!(matches!(registry.for_hotel(&no_pms), Err(PmsError::NotFound(_))));
    }
}
