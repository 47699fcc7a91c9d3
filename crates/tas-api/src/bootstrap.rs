//! # Bootstrap
//!
//! Wires a [`TasEngine`] from [`TasConfig`]:
//!
//! 1. **Identity**: TA keys from the file, or ephemeral keys with a warning.
//! 2. **Registry**: HTTP when `registry.url` is set, in-memory otherwise.
//! 3. **Issuers**: one HTTP route per ISSUER entity with a `serverUrl`.
//! 4. **Notifier**: HTTP gateways when configured, logging otherwise. The
//!    [`NotifierContext`] is returned so `main` can shut it down.
//!
//! Publishing the TA DID document and seeding entities touch the registry
//! and the store, so they run separately in [`initialize`].

use std::sync::Arc;

use tas_client::{
    DidRegistry, HttpDidRegistry, HttpIssuerGateway, HttpNotifier, LoggingNotifier, MemoryDidRegistry, Notifier,
    NotifierContext,
};
use tas_core::TasError;
use tas_engine::TasEngine;
use tas_state::{EntityRole, MemoryStore};

use crate::config::{ConfigError, TasConfig};

/// The engine and the notifier context it shares.
#[derive(Debug)]
pub struct Bootstrapped {
    pub engine: TasEngine,
    pub notifier_ctx: Option<Arc<NotifierContext>>,
    pub ephemeral_identity: bool,
}

/// Build the engine and its collaborators.
pub fn build(config: &TasConfig) -> Result<Bootstrapped, ConfigError> {
    let engine_config = config.engine_config()?;
    let (identity, ephemeral_identity) = config.identity()?;
    if ephemeral_identity {
        tracing::warn!(did = %identity.did(), "no TA keys configured; using ephemeral keys");
    }

    let registry: Arc<dyn DidRegistry> = match &config.registry.url {
        Some(url) => Arc::new(
            HttpDidRegistry::new(url, config.registry.timeout_secs)
                .map_err(|e| ConfigError::Invalid {
                    field: "registry.url".into(),
                    reason: e.to_string(),
                })?,
        ),
        None => {
            tracing::warn!("no registry URL configured; using in-memory registry");
            Arc::new(MemoryDidRegistry::new())
        }
    };

    let mut issuer = HttpIssuerGateway::new();
    for entity in config.entities.iter().filter(|e| e.role == EntityRole::Issuer) {
        let Some(url) = &entity.server_url else {
            continue;
        };
        issuer = issuer
            .with_issuer(entity.did.clone(), url, config.registry.timeout_secs)
            .map_err(|e| ConfigError::Invalid {
                field: format!("entities[{}].serverUrl", entity.did),
                reason: e.to_string(),
            })?;
    }

    let notifier_cfg = &config.notifier;
    let (notifier, notifier_ctx) =
        if notifier_cfg.push_url.is_some() || notifier_cfg.email_url.is_some() {
            let ctx = Arc::new(
                NotifierContext::new(
                    notifier_cfg.push_url.as_deref(),
                    notifier_cfg.email_url.as_deref(),
                    notifier_cfg.timeout_secs,
                )
                .map_err(|e| ConfigError::Invalid {
                    field: "notifier".into(),
                    reason: e.to_string(),
                })?,
            );
            (Arc::new(HttpNotifier::new(Arc::clone(&ctx))) as Arc<dyn Notifier>, Some(ctx))
        } else {
            (Arc::new(LoggingNotifier::new()) as Arc<dyn Notifier>, None)
        };

    let engine = TasEngine::new(
        engine_config,
        identity,
        Arc::new(MemoryStore::new()),
        registry,
        Arc::new(issuer),
        notifier,
    );
    Ok(Bootstrapped {
        engine,
        notifier_ctx,
        ephemeral_identity,
    })
}

/// Publish the TA DID document and seed configured entities.
pub fn initialize(engine: &TasEngine, config: &TasConfig) -> Result<(), TasError> {
    let published = engine.publish_identity()?;
    let seeded = engine.seed_entities(config.entities.iter().cloned())?;
    tracing::info!(
        did = %engine.identity().did(),
        published,
        entities = seeded,
        plans = config.vc_plans.len(),
        "trusted agent initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build_an_in_memory_engine() {
        let config = TasConfig::default();
        let boot = build(&config).unwrap();
        assert!(boot.ephemeral_identity);
        assert!(boot.notifier_ctx.is_none());
        initialize(&boot.engine, &config).unwrap();
        // Publishing twice is a no-op.
        assert!(!boot.engine.publish_identity().unwrap());
    }

    #[test]
    fn notifier_context_is_built_when_configured() {
        let mut config = TasConfig::default();
        config.notifier.email_url = Some("http://mail.local".into());
        let boot = build(&config).unwrap();
        let ctx = boot.notifier_ctx.unwrap();
        assert!(!ctx.is_shut_down());
    }
}
