//! Factory capability consumed by the pool core

use crate::errors::FactoryError;

/// Creates, validates, and destroys the resource instances a pool manages.
///
/// The pool never constructs a resource itself: startup population, lazy
/// growth on borrow, and idle top-up all go through [`create`], and every
/// entry leaving the pool goes through [`destroy`].
///
/// [`create`]: ResourceFactory::create
/// [`destroy`]: ResourceFactory::destroy
///
/// # Examples
///
/// ```
/// use lendpool::{FactoryError, ResourceFactory};
///
/// struct Conn { fd: u32 }
///
/// struct ConnFactory;
///
/// impl ResourceFactory for ConnFactory {
///     type Resource = Conn;
///
///     fn create(&self) -> Result<Conn, FactoryError> {
///         Ok(Conn { fd: 7 })
///     }
///
///     fn validate(&self, conn: &Conn) -> bool {
///         conn.fd != 0
///     }
/// }
/// ```
pub trait ResourceFactory: Send + Sync + 'static {
    type Resource: Send + 'static;

    /// Create a fresh resource instance.
    fn create(&self) -> Result<Self::Resource, FactoryError>;

    /// Health-check a resource before it is handed out or re-idled.
    ///
    /// Only consulted when the pool is configured with validation on
    /// borrow or on return. The default accepts everything.
    fn validate(&self, _resource: &Self::Resource) -> bool {
        true
    }

    /// Tear down a resource that is leaving the pool.
    ///
    /// Best-effort: implementations should log internal failures rather
    /// than panic, as destruction errors are never propagated to borrowers.
    fn destroy(&self, resource: Self::Resource) {
        drop(resource);
    }
}
