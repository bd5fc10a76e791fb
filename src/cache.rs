//! Read caches and the invalidation graph
//!
//! Reads are cached per [`QueryKey`]. After a write succeeds, the
//! [`InvalidationGraph`] names every query family that depends on the written
//! [`Entity`], and all cached entries of those families are dropped so the next
//! read goes back to the store.

use chrono::NaiveDate;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;

/// One cached read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Students,
    Classes,
    ClassesOn(NaiveDate),
    AttendanceByClass(Uuid),
    StudentStats,
    LowAttendance,
    DashboardStats,
    Messages,
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        match self {
            QueryKey::Students => QueryFamily::Students,
            QueryKey::Classes | QueryKey::ClassesOn(_) => QueryFamily::Classes,
            QueryKey::AttendanceByClass(_) => QueryFamily::Attendance,
            QueryKey::StudentStats => QueryFamily::StudentStats,
            QueryKey::LowAttendance => QueryFamily::LowAttendance,
            QueryKey::DashboardStats => QueryFamily::DashboardStats,
            QueryKey::Messages => QueryFamily::Messages,
        }
    }
}

/// All keys of one kind, regardless of parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    Students,
    Classes,
    Attendance,
    StudentStats,
    LowAttendance,
    DashboardStats,
    Messages,
}

/// What a mutation wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Student,
    Class,
    Attendance,
    Message,
}

/// Entity → dependent query families
#[derive(Debug, Clone)]
pub struct InvalidationGraph {
    edges: HashMap<Entity, Vec<QueryFamily>>,
}

impl Default for InvalidationGraph {
    fn default() -> Self {
        use QueryFamily::*;

        Self::empty()
            .depends(
                Entity::Student,
                &[Students, StudentStats, LowAttendance, DashboardStats],
            )
            .depends(
                Entity::Class,
                &[Classes, StudentStats, LowAttendance, DashboardStats],
            )
            .depends(
                Entity::Attendance,
                &[Attendance, StudentStats, LowAttendance, DashboardStats],
            )
            .depends(Entity::Message, &[Messages])
    }
}

impl InvalidationGraph {
    pub fn empty() -> Self {
        Self {
            edges: HashMap::new(),
        }
    }

    /// Declare that reads in `families` depend on writes to `entity`
    pub fn depends(mut self, entity: Entity, families: &[QueryFamily]) -> Self {
        let edges = self.edges.entry(entity).or_default();
        for family in families {
            if !edges.contains(family) {
                edges.push(*family);
            }
        }
        self
    }

    pub fn dependents(&self, entity: Entity) -> &[QueryFamily] {
        self.edges.get(&entity).map(Vec::as_slice).unwrap_or(&[])
    }
}

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Slots {
    entries: HashMap<QueryKey, Entry>,
    // Bumped on every invalidation of the family
    generations: HashMap<QueryFamily, u64>,
}

impl Slots {
    fn generation(&self, family: QueryFamily) -> u64 {
        self.generations.get(&family).copied().unwrap_or_default()
    }
}

/// Query results shared by every clone of the dashboard context
///
/// A read that started before an invalidation of its family is returned to
/// its caller but never cached, so the next read goes back to the store.
#[derive(Default)]
pub struct QueryCache {
    slots: RwLock<Slots>,
    graph: InvalidationGraph,
}

impl QueryCache {
    pub fn new(graph: InvalidationGraph) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            graph,
        }
    }

    pub fn graph(&self) -> &InvalidationGraph {
        &self.graph
    }

    /// The cached value for `key`, if it holds a `T`
    pub async fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let slots = self.slots.read().await;
        slots
            .entries
            .get(key)
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
    }

    pub async fn put<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        self.slots.write().await.entries.insert(key, Arc::new(value));
    }

    /// Returns the cached value or runs `fetch` and caches its result.
    /// Errors are returned as-is and nothing is cached.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.get::<T>(&key).await {
            return Ok(value);
        }
        let family = key.family();
        let generation = self.slots.read().await.generation(family);

        let value = fetch().await?;

        let mut slots = self.slots.write().await;
        if slots.generation(family) == generation {
            slots.entries.insert(key, Arc::new(value.clone()));
        } else {
            debug!(?key, "not caching a read that overlapped a write");
        }
        Ok(value)
    }

    /// Drops every entry whose family depends on `entity`; returns how many
    pub async fn invalidate(&self, entity: Entity) -> usize {
        let families = self.graph.dependents(entity);
        let mut slots = self.slots.write().await;
        for family in families {
            *slots.generations.entry(*family).or_default() += 1;
        }
        let before = slots.entries.len();
        slots
            .entries
            .retain(|key, _| !families.contains(&key.family()));
        let dropped = before - slots.entries.len();
        debug!(?entity, dropped, "invalidated cached queries");
        dropped
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.slots.read().await.entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.slots.write().await.entries.clear();
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn default_graph_edges() {
        let graph = InvalidationGraph::default();
        assert_eq!(
            graph.dependents(Entity::Student),
            &[
                QueryFamily::Students,
                QueryFamily::StudentStats,
                QueryFamily::LowAttendance,
                QueryFamily::DashboardStats
            ]
        );
        assert_eq!(graph.dependents(Entity::Message), &[QueryFamily::Messages]);
        assert!(InvalidationGraph::empty().dependents(Entity::Class).is_empty());
    }

    #[test]
    fn depends_ignores_repeats() {
        let graph = InvalidationGraph::empty()
            .depends(Entity::Message, &[QueryFamily::Messages])
            .depends(Entity::Message, &[QueryFamily::Messages, QueryFamily::DashboardStats]);
        assert_eq!(graph.dependents(Entity::Message).len(), 2);
    }

    #[tokio::test]
    async fn invalidate_drops_dependent_families() {
        let cache = QueryCache::default();
        let class_id = Uuid::new_v4();
        cache.put(QueryKey::Students, vec!["a".to_string()]).await;
        cache.put(QueryKey::AttendanceByClass(class_id), 1_u8).await;
        cache.put(QueryKey::StudentStats, 2_u8).await;
        cache.put(QueryKey::Messages, 3_u8).await;

        let dropped = cache.invalidate(Entity::Attendance).await;

        assert_eq!(dropped, 2);
        assert!(cache.contains(&QueryKey::Students).await);
        assert!(cache.contains(&QueryKey::Messages).await);
        assert!(!cache.contains(&QueryKey::AttendanceByClass(class_id)).await);
        assert!(!cache.contains(&QueryKey::StudentStats).await);
    }

    #[tokio::test]
    async fn classes_on_a_day_share_the_classes_family() {
        let cache = QueryCache::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        cache.put(QueryKey::ClassesOn(day), 0_u8).await;
        cache.invalidate(Entity::Class).await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn get_or_fetch_caches_success_only() {
        let cache = QueryCache::default();

        let err = cache
            .get_or_fetch::<u32, _, _>(QueryKey::Messages, || async {
                Err(Error::service("offline"))
            })
            .await;
        assert!(err.is_err());
        assert!(!cache.contains(&QueryKey::Messages).await);

        let value = cache
            .get_or_fetch(QueryKey::Messages, || async { Ok(7_u32) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let cached = cache
            .get_or_fetch(QueryKey::Messages, || async { Ok(8_u32) })
            .await
            .unwrap();
        assert_eq!(cached, 7);
    }

    #[tokio::test]
    async fn read_overlapping_an_invalidation_is_not_cached() {
        let cache = QueryCache::default();

        let value = cache
            .get_or_fetch(QueryKey::Students, || async {
                // A student write lands while the read is in flight
                cache.invalidate(Entity::Student).await;
                Ok(vec!["before the write".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(value, vec!["before the write".to_string()]);
        assert!(!cache.contains(&QueryKey::Students).await);

        // Writes to unrelated entities leave the read cacheable
        cache
            .get_or_fetch(QueryKey::Students, || async {
                cache.invalidate(Entity::Message).await;
                Ok(vec!["after".to_string()])
            })
            .await
            .unwrap();
        assert!(cache.contains(&QueryKey::Students).await);
    }

    #[tokio::test]
    async fn get_with_wrong_type_is_a_miss() {
        let cache = QueryCache::default();
        cache.put(QueryKey::DashboardStats, 1_u8).await;
        assert_eq!(cache.get::<String>(&QueryKey::DashboardStats).await, None);
    }
}
