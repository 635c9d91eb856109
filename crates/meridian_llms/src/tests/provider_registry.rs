use std::sync::Arc;

use crate::error::Error;
use crate::provider::{Provider, ProviderRegistry};
use crate::providers::LoremProvider;

#[test]
fn test_lookup_returns_the_registered_adapter() {
    let registry = ProviderRegistry::new().register("lorem", LoremProvider::new());

    let provider = registry.get_provider("lorem").expect("lorem is registered");
    assert_eq!(provider.provider_id(), "lorem");
    assert!(registry.contains("lorem"));
}

#[test]
fn test_unknown_provider_is_reported_by_id() {
    let registry = ProviderRegistry::new().register("lorem", LoremProvider::new());

    match registry.get_provider("anthropic") {
        Err(Error::ProviderNotFound(id)) => assert_eq!(id, "anthropic"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("anthropic was never registered"),
    }
}

#[test]
fn test_ids_are_listed_in_order_regardless_of_registration() {
    let registry = ProviderRegistry::new()
        .register("zeta", LoremProvider::new())
        .register("lorem", LoremProvider::new())
        .register("alpha", LoremProvider::new());

    assert_eq!(registry.list_providers(), ["alpha", "lorem", "zeta"]);
}

#[test]
fn test_shared_adapter_is_not_cloned() {
    let adapter: Arc<dyn Provider> = Arc::new(LoremProvider::new());
    let registry = ProviderRegistry::new()
        .register_arc("primary", Arc::clone(&adapter))
        .register_arc("fallback", Arc::clone(&adapter));

    let primary = registry.get_provider("primary").expect("registered");
    let fallback = registry.get_provider("fallback").expect("registered");
    assert!(Arc::ptr_eq(&primary, &fallback));
    assert_eq!(Arc::strong_count(&adapter), 3);
}

#[test]
fn test_environment_registry_always_offers_lorem() {
    let registry = ProviderRegistry::from_env();
    assert!(registry.contains("lorem"));
}
