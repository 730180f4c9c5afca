//! Declarative resource kinds.

use crate::Result;
use seamicro_core::{Error, Resource, ResourceId, ResourceKind};

/// Id of a resource, required by resource-level operations.
pub(crate) fn require_id<K: ResourceKind>(resource: &Resource<K>) -> Result<ResourceId> {
    resource
        .id()
        .ok_or_else(|| Error::InvalidRequest(format!("{} has no id", K::NAME)))
}

/// Generate a resource kind marker, its resource alias and a manager with
/// the listing operations every kind shares.
///
/// `$record` is the typed view returned by `Resource::record`. `fetchable`
/// kinds also get a `get` operation; `list_only` kinds are never fetched
/// one by one.
macro_rules! resource_kind {
    (
        @define $kind:ident, $resource:ident, $manager:ident, $name:literal,
        $collection:literal, $record:ty, $fetchable:expr
    ) => {
        #[doc = concat!("Marker for ", $name, " resources.")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $kind;

        impl ::seamicro_core::ResourceKind for $kind {
            const NAME: &'static str = $name;
            const COLLECTION: &'static str = $collection;
            const SUPPORTS_GET: bool = $fetchable;
            type Record = $record;
        }

        #[doc = concat!("A ", $name, " as returned by `", $collection, "`.")]
        pub type $resource = ::seamicro_core::Resource<$kind>;

        #[doc = concat!("Operations on `", $collection, "`.")]
        #[derive(Debug, Clone)]
        pub struct $manager {
            inner: ::seamicro_core::Manager<$kind>,
        }

        impl $manager {
            pub(crate) fn new(
                transport: ::std::sync::Arc<dyn ::seamicro_core::Transport>,
            ) -> Self {
                Self {
                    inner: ::seamicro_core::Manager::new(transport),
                }
            }

            /// Manager sharing the transport of an existing resource.
            #[must_use]
            pub fn from_resource(resource: &$resource) -> Self {
                Self {
                    inner: resource.manager().clone(),
                }
            }

            /// Generic operations for this kind.
            #[must_use]
            pub fn manager(&self) -> &::seamicro_core::Manager<$kind> {
                &self.inner
            }

            #[doc = concat!("List every ", $name, ", optionally filtered.")]
            ///
            /// # Errors
            ///
            /// Propagates transport errors.
            pub async fn list(
                &self,
                filters: Option<&::seamicro_core::Filters>,
            ) -> $crate::Result<Vec<$resource>> {
                self.inner.list(filters).await
            }

            #[doc = concat!("List every ", $name, " satisfying all predicates.")]
            ///
            /// # Errors
            ///
            /// Propagates transport errors.
            pub async fn findall(
                &self,
                filters: &::seamicro_core::Filters,
            ) -> $crate::Result<Vec<$resource>> {
                self.inner.findall(filters).await
            }

            #[doc = concat!("The single ", $name, " satisfying all predicates.")]
            ///
            /// # Errors
            ///
            /// Returns `NotFound` for zero matches and `AmbiguousMatch` for
            /// several.
            pub async fn find(
                &self,
                filters: &::seamicro_core::Filters,
            ) -> $crate::Result<$resource> {
                self.inner.find(filters).await
            }
        }
    };
    (
        $kind:ident, $resource:ident, $manager:ident, $name:literal,
        $collection:literal, $record:ty, fetchable
    ) => {
        resource_kind!(@define $kind, $resource, $manager, $name, $collection, $record, true);

        impl $manager {
            #[doc = concat!("Fetch a single ", $name, " by id.")]
            ///
            /// # Errors
            ///
            /// Propagates transport errors.
            pub async fn get(
                &self,
                id: impl Into<::seamicro_core::ResourceId>,
            ) -> $crate::Result<$resource> {
                self.inner.get(id).await
            }
        }
    };
    (
        $kind:ident, $resource:ident, $manager:ident, $name:literal,
        $collection:literal, $record:ty, list_only
    ) => {
        resource_kind!(@define $kind, $resource, $manager, $name, $collection, $record, false);
    };
}
