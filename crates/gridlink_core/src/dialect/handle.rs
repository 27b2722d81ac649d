//! Capability descriptor and the handle that drives a dialect.

use super::context::{AssociationContext, TupleContext};
use super::facets::{
    BatchableDialect, CriteriaDialect, Facet, OptimisticLockingDialect, StoredProcedureDialect,
};
use super::GridDialect;
use crate::batch::BatchingDialect;
use crate::config::Config;
use crate::error::{DialectError, DialectResult};
use crate::key::AssociationKeyMetadata;
use crate::strategy::{AssociationTypeContext, BackendProfile, StrategyCache};
use gridlink_codec::{ScalarType, TypeRegistry, Value};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which optional facets a dialect offers. Computed once per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    /// Compare-and-swap tuple writes.
    pub optimistic_locking: bool,
    /// Named backend routines.
    pub stored_procedures: bool,
    /// Native batch submission.
    pub batch: bool,
    /// Structured criteria queries.
    pub criteria: bool,
    /// Native sequences.
    pub sequences: bool,
}

impl Capabilities {
    /// Asks `dialect` for each facet.
    #[must_use]
    pub fn of(dialect: &dyn GridDialect) -> Self {
        Self {
            optimistic_locking: dialect.optimistic_locking().is_some(),
            stored_procedures: dialect.stored_procedures().is_some(),
            batch: dialect.batchable().is_some(),
            criteria: dialect.criteria().is_some(),
            sequences: dialect.supports_sequences(),
        }
    }

    /// Whether `facet` is available.
    #[must_use]
    pub const fn supports(&self, facet: Facet) -> bool {
        match facet {
            Facet::OptimisticLocking => self.optimistic_locking,
            Facet::StoredProcedures => self.stored_procedures,
            Facet::Batch => self.batch,
            Facet::Criteria => self.criteria,
        }
    }
}

/// A dialect together with everything resolved about it at startup.
///
/// The handle computes the [`Capabilities`], composes the type registry from
/// the standard codecs and the dialect's overrides, and caches association
/// strategy resolution.
pub struct DialectHandle {
    dialect: Arc<dyn GridDialect>,
    batching: Option<Arc<BatchingDialect>>,
    capabilities: Capabilities,
    registry: TypeRegistry,
    profile: BackendProfile,
    config: Config,
    strategies: StrategyCache,
}

impl DialectHandle {
    /// Creates a handle with the default configuration.
    #[must_use]
    pub fn new(dialect: Arc<dyn GridDialect>) -> Self {
        Self::with_config(dialect, Config::default())
    }

    /// Creates a handle. With `config.batching` set, the dialect is wrapped
    /// in a [`BatchingDialect`] reachable through [`batch`](Self::batch).
    #[must_use]
    pub fn with_config(dialect: Arc<dyn GridDialect>, config: Config) -> Self {
        let (dialect, batching) = if config.batching {
            let batching = Arc::new(BatchingDialect::new(dialect));
            let dialect: Arc<dyn GridDialect> = Arc::clone(&batching) as Arc<dyn GridDialect>;
            (dialect, Some(batching))
        } else {
            (dialect, None)
        };
        let capabilities = Capabilities::of(dialect.as_ref());
        let registry = TypeRegistry::standard().overlay(&dialect.type_overrides());
        let profile = dialect.profile();
        debug!(?capabilities, ?profile, batching = config.batching, "dialect handle ready");
        Self {
            dialect,
            batching,
            capabilities,
            registry,
            profile,
            config,
            strategies: StrategyCache::new(),
        }
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn GridDialect {
        self.dialect.as_ref()
    }

    /// Returns the batching wrapper, if batching is enabled.
    #[must_use]
    pub fn batch(&self) -> Option<&BatchingDialect> {
        self.batching.as_deref()
    }

    /// Returns the precomputed capabilities.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Returns the composed type registry.
    #[must_use]
    pub fn type_registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Returns the backend profile.
    #[must_use]
    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Converts a canonical value into the dialect's stored form.
    ///
    /// Dialects store tuple values as given; this is the hook through which
    /// the mapping layer applies the dialect's type overrides before writing
    /// a column, and [`decode`](Self::decode) reverses it after reading.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the value does not fit `ty`.
    pub fn encode(&self, ty: ScalarType, value: &Value) -> DialectResult<Value> {
        Ok(self.registry.encode(ty, value)?)
    }

    /// Converts a stored value back into canonical form.
    ///
    /// # Errors
    ///
    /// Returns a codec error if the stored value cannot be decoded.
    pub fn decode(&self, ty: ScalarType, value: &Value) -> DialectResult<Value> {
        Ok(self.registry.decode(ty, value)?)
    }

    /// Builds the tuple context of `entity`.
    #[must_use]
    pub fn tuple_context(&self, entity: &str) -> TupleContext {
        TupleContext::new(
            self.config
                .options
                .effective(Some(entity), None, self.profile.defaults),
        )
    }

    /// Returns the cached association type context of `entity.role`.
    #[must_use]
    pub fn association_type_context(
        &self,
        entity: &str,
        metadata: &AssociationKeyMetadata,
    ) -> Arc<AssociationTypeContext> {
        self.strategies
            .get_or_resolve(entity, metadata, &self.config.options, &self.profile)
    }

    /// Builds the association context of `entity.role`.
    #[must_use]
    pub fn association_context(&self, entity: &str, metadata: &AssociationKeyMetadata) -> AssociationContext {
        AssociationContext::new(self.association_type_context(entity, metadata))
    }

    /// Returns the optimistic locking facet.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnsupportedFacet`] if the dialect lacks it.
    pub fn optimistic_locking(&self) -> DialectResult<&dyn OptimisticLockingDialect> {
        self.facet(Facet::OptimisticLocking, |d| d.optimistic_locking())
    }

    /// Returns the stored procedure facet.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnsupportedFacet`] if the dialect lacks it.
    pub fn stored_procedures(&self) -> DialectResult<&dyn StoredProcedureDialect> {
        self.facet(Facet::StoredProcedures, |d| d.stored_procedures())
    }

    /// Returns the batch execution facet.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnsupportedFacet`] if the dialect lacks it.
    pub fn batchable(&self) -> DialectResult<&dyn BatchableDialect> {
        self.facet(Facet::Batch, |d| d.batchable())
    }

    /// Returns the criteria facet.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnsupportedFacet`] if the dialect lacks it.
    pub fn criteria(&self) -> DialectResult<&dyn CriteriaDialect> {
        self.facet(Facet::Criteria, |d| d.criteria())
    }

    fn facet<'a, F: ?Sized>(
        &'a self,
        facet: Facet,
        get: impl FnOnce(&'a dyn GridDialect) -> Option<&'a F>,
    ) -> DialectResult<&'a F> {
        if !self.capabilities.supports(facet) {
            return Err(DialectError::unsupported_facet(facet));
        }
        get(self.dialect.as_ref()).ok_or(DialectError::unsupported_facet(facet))
    }
}

impl fmt::Debug for DialectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectHandle")
            .field("capabilities", &self.capabilities)
            .field("profile", &self.profile)
            .field("batching", &self.batching.is_some())
            .finish_non_exhaustive()
    }
}
