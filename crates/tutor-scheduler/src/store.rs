//! Persistence boundary for performance rows and review schedules.
//!
//! Rows are keyed by (student_id, topic_id). [`InMemoryPracticeStore`] keeps
//! them in DashMaps; hosts with a real datastore implement [`PracticeStore`].

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::SchedulerError;
use crate::performance::TopicPerformance;
use crate::spaced::SpacedRepetitionSchedule;

type RowKey = (String, String);

fn key(student_id: &str, topic_id: &str) -> RowKey {
    (student_id.to_string(), topic_id.to_string())
}

#[async_trait]
pub trait PracticeStore: Send + Sync {
    async fn get_performance(
        &self,
        student_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicPerformance>, SchedulerError>;

    async fn put_performance(&self, performance: TopicPerformance) -> Result<(), SchedulerError>;

    /// All performance rows for a student, sorted by topic id.
    async fn list_performance(&self, student_id: &str) -> Result<Vec<TopicPerformance>, SchedulerError>;

    async fn get_schedule(
        &self,
        student_id: &str,
        topic_id: &str,
    ) -> Result<Option<SpacedRepetitionSchedule>, SchedulerError>;

    async fn put_schedule(&self, schedule: SpacedRepetitionSchedule) -> Result<(), SchedulerError>;

    /// All schedules for a student, sorted by topic id.
    async fn list_schedules(
        &self,
        student_id: &str,
    ) -> Result<Vec<SpacedRepetitionSchedule>, SchedulerError>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryPracticeStore {
    performance: DashMap<RowKey, TopicPerformance>,
    schedules: DashMap<RowKey, SpacedRepetitionSchedule>,
}

impl InMemoryPracticeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performance_rows(&self) -> usize {
        self.performance.len()
    }
}

#[async_trait]
impl PracticeStore for InMemoryPracticeStore {
    async fn get_performance(
        &self,
        student_id: &str,
        topic_id: &str,
    ) -> Result<Option<TopicPerformance>, SchedulerError> {
        Ok(self
            .performance
            .get(&key(student_id, topic_id))
            .map(|row| row.value().clone()))
    }

    async fn put_performance(&self, performance: TopicPerformance) -> Result<(), SchedulerError> {
        let k = key(&performance.student_id, &performance.topic_id);
        self.performance.insert(k, performance);
        Ok(())
    }

    async fn list_performance(&self, student_id: &str) -> Result<Vec<TopicPerformance>, SchedulerError> {
        let mut rows: Vec<TopicPerformance> = self
            .performance
            .iter()
            .filter(|row| row.key().0 == student_id)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
        Ok(rows)
    }

    async fn get_schedule(
        &self,
        student_id: &str,
        topic_id: &str,
    ) -> Result<Option<SpacedRepetitionSchedule>, SchedulerError> {
        Ok(self
            .schedules
            .get(&key(student_id, topic_id))
            .map(|row| row.value().clone()))
    }

    async fn put_schedule(&self, schedule: SpacedRepetitionSchedule) -> Result<(), SchedulerError> {
        let k = key(&schedule.student_id, &schedule.topic_id);
        self.schedules.insert(k, schedule);
        Ok(())
    }

    async fn list_schedules(
        &self,
        student_id: &str,
    ) -> Result<Vec<SpacedRepetitionSchedule>, SchedulerError> {
        let mut rows: Vec<SpacedRepetitionSchedule> = self
            .schedules
            .iter()
            .filter(|row| row.key().0 == student_id)
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by(|a, b| a.topic_id.cmp(&b.topic_id));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_rows_are_keyed_by_student_and_topic() {
        let store = InMemoryPracticeStore::new();
        store.put_performance(TopicPerformance::new("s1", "ratio")).await.unwrap();
        store.put_performance(TopicPerformance::new("s1", "fractions")).await.unwrap();
        store.put_performance(TopicPerformance::new("s2", "ratio")).await.unwrap();

        assert_eq!(store.performance_rows(), 3);
        assert!(store.get_performance("s1", "ratio").await.unwrap().is_some());
        assert!(store.get_performance("s2", "fractions").await.unwrap().is_none());

        let topics: Vec<String> = store
            .list_performance("s1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.topic_id)
            .collect();
        assert_eq!(topics, vec!["fractions", "ratio"]);
    }

    #[tokio::test]
    async fn test_put_replaces_row() {
        let store = InMemoryPracticeStore::new();
        let mut perf = TopicPerformance::new("s1", "ratio");
        store.put_performance(perf.clone()).await.unwrap();
        perf.record_attempt(true, Utc::now());
        store.put_performance(perf).await.unwrap();

        let row = store.get_performance("s1", "ratio").await.unwrap().unwrap();
        assert_eq!(row.attempted, 1);
        assert_eq!(store.performance_rows(), 1);
    }

    #[tokio::test]
    async fn test_schedules() {
        let store = InMemoryPracticeStore::new();
        let now = Utc::now();
        store
            .put_schedule(SpacedRepetitionSchedule::new("s1", "ratio", now))
            .await
            .unwrap();
        assert_eq!(store.list_schedules("s1").await.unwrap().len(), 1);
        assert!(store.list_schedules("s2").await.unwrap().is_empty());
    }
}
