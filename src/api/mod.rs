//! Typed data access for the dashboard
//!
//! [`Dashboard`] is the context every page works through. It owns the store,
//! the query cache and the notifier, and hands out one API per entity:
//!
//! ```no_run
//! # async fn run(dashboard: attendx::api::Dashboard) -> attendx::Result<()> {
//! let students = dashboard.students().list().await?;
//! let warnings = dashboard.attendance().low_attendance().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Reads go through the cache. Writes report their outcome to the notifier,
//! and only a successful write invalidates cached reads.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{Entity, InvalidationGraph, QueryCache};
use crate::error::Result;
use crate::gate::AdminSession;
use crate::notify::{Notifier, TracingNotifier};
use crate::sheet::AttendanceSheet;
use crate::store::DataStore;

mod attendance;
mod classes;
mod dashboard;
mod messages;
mod students;

pub use self::attendance::AttendanceApi;
pub use self::classes::ClassesApi;
pub use self::dashboard::Overview;
pub use self::messages::MessagesApi;
pub use self::students::{StudentsApi, DUPLICATE_ROLL_NUMBER};

/// Shared dashboard context. Clones share the store, cache and session.
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn DataStore>,
    cache: Arc<QueryCache>,
    notifier: Arc<dyn Notifier>,
    session: Arc<AdminSession>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn DataStore>, session: AdminSession) -> Self {
        Self {
            store,
            cache: Arc::new(QueryCache::new(InvalidationGraph::default())),
            notifier: Arc::new(TracingNotifier),
            session: Arc::new(session),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_invalidation_graph(mut self, graph: InvalidationGraph) -> Self {
        self.cache = Arc::new(QueryCache::new(graph));
        self
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn students(&self) -> StudentsApi<'_> {
        StudentsApi::new(self)
    }

    pub fn classes(&self) -> ClassesApi<'_> {
        ClassesApi::new(self)
    }

    pub fn attendance(&self) -> AttendanceApi<'_> {
        AttendanceApi::new(self)
    }

    pub fn messages(&self) -> MessagesApi<'_> {
        MessagesApi::new(self)
    }

    /// Build the marking sheet for a class
    pub async fn open_attendance(&self, class_id: Uuid) -> Result<AttendanceSheet> {
        self.attendance().open(class_id).await
    }

    pub(crate) fn store(&self) -> &dyn DataStore {
        self.store.as_ref()
    }

    /// Run a write. On success the dependents of `entity` are invalidated
    /// before the notice goes out; on failure only the error notice is sent.
    pub(crate) async fn mutate<T, Fut>(
        &self,
        entity: Entity,
        success: &str,
        failure: &str,
        write: Fut,
    ) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match write.await {
            Ok(value) => {
                self.cache.invalidate(entity).await;
                debug!(?entity, "{}", success);
                self.notifier.success(success);
                Ok(value)
            }
            Err(err) => {
                warn!(?entity, error = %err, "{}", failure);
                self.notifier.error(&err.user_message(failure));
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("user", &self.session.user.id)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
