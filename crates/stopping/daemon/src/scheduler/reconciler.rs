//! Stop protocols shared by the loop and the manual control surface

use crate::error::StopError;
use crate::notify::Notifier;
use crate::storage::InstanceStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use stopping_cluster::{ClusterGateway, ClusterResult};
use stopping_types::{
    decode_pod_identity, AuthToken, ClientId, InstanceId, InstanceStatus, Pod,
    StoppingCandidate, TerminationReason, OUT_OF_RESOURCES_MESSAGE,
};
use tracing::Instrument;
use uuid::Uuid;

/// Result of a completed stop attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Pod deleted and record moved to the given terminal status
    Terminated(InstanceStatus),
    /// No pod existed; the record was marked Stopped directly
    OrphanHealed,
    /// The record was already terminal; nothing was written
    AlreadyStopped,
    /// Nothing to act on (no matching record, or pod not terminated)
    Skipped,
}

/// Result of re-reading and marking a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    AlreadyTerminal,
}

/// Counters for one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Started records past their end date
    pub expired_candidates: usize,
    /// Expired instances whose pod was deleted and record stopped
    pub expired_stopped: usize,
    /// Expired instances with no pod, marked stopped directly
    pub orphans_healed: usize,
    /// Single-container pods found terminated
    pub errored_pods: usize,
    /// Terminated pods whose record became Stopped
    pub pods_stopped: usize,
    /// Terminated pods whose record became Errored
    pub pods_errored: usize,
    /// Records found already terminal
    pub already_stopped: usize,
    /// Candidates skipped without changes
    pub skipped: usize,
    /// Candidates that failed and will be retried next pass
    pub failures: usize,
}

impl PassReport {
    fn begin() -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ..Default::default()
        }
    }

    fn record_expired(&mut self, result: &Result<StopOutcome, StopError>) {
        match result {
            Ok(StopOutcome::Terminated(_)) => self.expired_stopped += 1,
            Ok(StopOutcome::OrphanHealed) => self.orphans_healed += 1,
            Ok(StopOutcome::AlreadyStopped) => self.already_stopped += 1,
            Ok(StopOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.failures += 1,
        }
    }

    fn record_pod(&mut self, result: &Result<StopOutcome, StopError>) {
        match result {
            Ok(StopOutcome::Terminated(InstanceStatus::Stopped)) => self.pods_stopped += 1,
            Ok(StopOutcome::Terminated(_)) => self.pods_errored += 1,
            Ok(StopOutcome::AlreadyStopped) => self.already_stopped += 1,
            Ok(StopOutcome::OrphanHealed | StopOutcome::Skipped) => self.skipped += 1,
            Err(StopError::Decode(_)) => self.skipped += 1,
            Err(_) => self.failures += 1,
        }
    }
}

/// Drives instances to a terminal state on both the cluster and the store
pub struct Reconciler {
    store: Arc<dyn InstanceStore>,
    cluster: Arc<dyn ClusterGateway>,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn InstanceStore>,
        cluster: Arc<dyn ClusterGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            cluster,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<dyn InstanceStore> {
        &self.store
    }

    pub fn cluster(&self) -> &Arc<dyn ClusterGateway> {
        &self.cluster
    }

    /// Run one full pass: expired instances first, then terminated pods.
    pub async fn run_pass(&self) -> PassReport {
        let mut report = PassReport::begin();
        let span = tracing::info_span!("stopping_pass", pass_id = %report.pass_id);

        async {
            match self.collect_expired(Utc::now()).await {
                Ok(candidates) => {
                    report.expired_candidates = candidates.len();
                    for candidate in &candidates {
                        let result = self.stop_expired_instance(candidate).await;
                        if let Err(e) = &result {
                            tracing::warn!(
                                client_id = %candidate.client_id,
                                instance_id = %candidate.instance_id,
                                error = %e,
                                "Failed to stop expired instance"
                            );
                        }
                        report.record_expired(&result);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping expired instances, store query failed");
                }
            }

            match self.collect_errored_pods().await {
                Ok(pods) => {
                    report.errored_pods = pods.len();
                    for pod in &pods {
                        let result = self.stop_errored_pod(pod).await;
                        if let Err(e) = &result {
                            tracing::warn!(
                                pod = pod.name(),
                                namespace = pod.namespace(),
                                error = %e,
                                "Failed to stop errored pod"
                            );
                        }
                        report.record_pod(&result);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping errored pods, cluster listing failed");
                }
            }

            report.finished_at = Some(Utc::now());
            tracing::info!(
                expired = report.expired_candidates,
                expired_stopped = report.expired_stopped,
                orphans_healed = report.orphans_healed,
                errored_pods = report.errored_pods,
                pods_stopped = report.pods_stopped,
                pods_errored = report.pods_errored,
                failures = report.failures,
                "Stopping pass complete"
            );
        }
        .instrument(span)
        .await;

        report
    }

    /// Started records whose end date has passed
    pub async fn collect_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<StoppingCandidate>, StopError> {
        let records = self.store.get_expired_past_date(now).await?;
        Ok(records
            .iter()
            .filter(|r| r.status == InstanceStatus::Started)
            .map(StoppingCandidate::from)
            .collect())
    }

    /// Pods whose only container has terminated
    pub async fn collect_errored_pods(&self) -> ClusterResult<Vec<Pod>> {
        let pods = self.cluster.list_pods(None).await?;
        Ok(pods
            .into_iter()
            .filter(|pod| pod.single_terminated_container().is_some())
            .collect())
    }

    /// Stop an instance whose end date has passed.
    ///
    /// With no live pod the record is orphaned and is marked Stopped without
    /// touching the cluster. Otherwise the pod is deleted first and the
    /// record is only marked once the delete succeeds.
    pub async fn stop_expired_instance(
        &self,
        candidate: &StoppingCandidate,
    ) -> Result<StopOutcome, StopError> {
        let pod = self.cluster.find_pod(&candidate.instance_id).await?;

        let Some(pod) = pod else {
            tracing::warn!(
                client_id = %candidate.client_id,
                instance_id = %candidate.instance_id,
                "Instance is started in the store but has no pod, marking it stopped"
            );
            return Ok(match self.mark_stopped_and_notify(candidate).await? {
                MarkOutcome::Marked => StopOutcome::OrphanHealed,
                MarkOutcome::AlreadyTerminal => StopOutcome::AlreadyStopped,
            });
        };

        self.delete_instance(&candidate.instance_id, pod.namespace())
            .await?;

        tracing::info!(
            client_id = %candidate.client_id,
            instance_id = %candidate.instance_id,
            "Stopped pod of expired instance"
        );

        Ok(match self.mark_stopped_and_notify(candidate).await? {
            MarkOutcome::Marked => StopOutcome::Terminated(InstanceStatus::Stopped),
            MarkOutcome::AlreadyTerminal => StopOutcome::AlreadyStopped,
        })
    }

    /// Stop the instance behind a pod whose only container has terminated.
    ///
    /// A pod with no matching record is left in place.
    pub async fn stop_errored_pod(&self, pod: &Pod) -> Result<StopOutcome, StopError> {
        let Some(terminated) = pod.single_terminated_container() else {
            return Ok(StopOutcome::Skipped);
        };

        let identity = decode_pod_identity(pod)?;

        let Some(found) = self
            .store
            .get_by_algo_and_instance(&identity.algo_id, &identity.instance_id)
            .await?
        else {
            tracing::info!(
                instance_id = %identity.instance_id,
                algo_id = %identity.algo_id,
                "Terminated pod has no instance record, leaving it in place"
            );
            return Ok(StopOutcome::Skipped);
        };

        self.delete_instance(&identity.instance_id, pod.namespace())
            .await?;

        // A manual stop may have landed while the delete was in flight.
        let Some(mut record) = self
            .store
            .get_by_client_and_instance(&found.client_id, &found.instance_id)
            .await?
        else {
            tracing::warn!(
                client_id = %found.client_id,
                instance_id = %found.instance_id,
                "Instance record vanished after pod deletion"
            );
            return Ok(StopOutcome::Skipped);
        };

        if record.status.is_terminal() {
            tracing::debug!(
                instance_id = %record.instance_id,
                status = %record.status,
                "Instance already terminal"
            );
            return Ok(StopOutcome::AlreadyStopped);
        }

        let reason = TerminationReason::parse(&terminated.reason);
        let status = reason.terminal_status();
        record.terminate(status, Utc::now());
        self.store.save(record.clone()).await?;

        tracing::info!(
            client_id = %record.client_id,
            instance_id = %record.instance_id,
            reason = %reason,
            status = %status,
            "Stopped instance after pod termination"
        );

        self.notify_summary(&record.client_id, &record.instance_id)
            .await;

        if reason.requires_user_notice() {
            self.notify_user(
                &record.instance_id,
                OUT_OF_RESOURCES_MESSAGE,
                &record.auth_token,
            )
            .await;
        }

        Ok(StopOutcome::Terminated(status))
    }

    /// Delete an instance's service and pod in the given namespace
    pub async fn delete_instance(
        &self,
        instance_id: &InstanceId,
        namespace: &str,
    ) -> Result<(), StopError> {
        self.cluster
            .delete_pod_and_service(instance_id, namespace)
            .await
            .map_err(|e| {
                tracing::warn!(
                    instance_id = %instance_id,
                    namespace,
                    error = %e,
                    "Could not delete instance pod"
                );
                StopError::from(e)
            })
    }

    /// Re-read a record and move it to Stopped.
    ///
    /// Missing or incomplete records are refused untouched. Terminal records
    /// are left as they are.
    pub async fn mark_stopped(
        &self,
        candidate: &StoppingCandidate,
    ) -> Result<MarkOutcome, StopError> {
        let record = self
            .store
            .get_by_client_and_instance(&candidate.client_id, &candidate.instance_id)
            .await?;

        let Some(mut record) = record else {
            tracing::warn!(
                client_id = %candidate.client_id,
                instance_id = %candidate.instance_id,
                "Instance not found and cannot be marked as stopped"
            );
            return Err(StopError::RecordNotFound {
                client_id: candidate.client_id.clone(),
                instance_id: candidate.instance_id.clone(),
            });
        };

        if !record.is_complete() {
            tracing::warn!(
                client_id = %candidate.client_id,
                instance_id = %candidate.instance_id,
                "Instance record is incomplete and cannot be marked as stopped"
            );
            return Err(StopError::IncompleteRecord {
                client_id: candidate.client_id.clone(),
                instance_id: candidate.instance_id.clone(),
            });
        }

        if record.status.is_terminal() {
            return Ok(MarkOutcome::AlreadyTerminal);
        }

        record.terminate(InstanceStatus::Stopped, Utc::now());
        self.store.save(record).await?;

        tracing::info!(
            client_id = %candidate.client_id,
            instance_id = %candidate.instance_id,
            "Instance marked as stopped"
        );
        Ok(MarkOutcome::Marked)
    }

    /// Mark a record Stopped and refresh its statistics when it changed
    pub async fn mark_stopped_and_notify(
        &self,
        candidate: &StoppingCandidate,
    ) -> Result<MarkOutcome, StopError> {
        let outcome = self.mark_stopped(candidate).await?;
        if outcome == MarkOutcome::Marked {
            self.notify_summary(&candidate.client_id, &candidate.instance_id)
                .await;
        }
        Ok(outcome)
    }

    async fn notify_summary(&self, client_id: &ClientId, instance_id: &InstanceId) {
        if let Err(e) = self.notifier.update_summary(client_id, instance_id).await {
            tracing::warn!(
                client_id = %client_id,
                instance_id = %instance_id,
                error = %e,
                "Failed to update summary statistics"
            );
        }
    }

    async fn notify_user(&self, instance_id: &InstanceId, message: &str, token: &AuthToken) {
        if let Err(e) = self.notifier.notify_user(instance_id, message, token).await {
            tracing::warn!(
                instance_id = %instance_id,
                error = %e,
                "Failed to deliver user notice"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notification, RecordingNotifier};
    use crate::storage::InMemoryInstanceStore;
    use chrono::Duration;
    use stopping_cluster::InMemoryCluster;
    use stopping_types::{
        AlgoId, Container, ContainerState, ContainerStatus, EnvVar, InstanceRecord,
        PodMeta, PodSpec, PodStatus, TerminatedState, APP_LABEL, INSTANCE_PARAMETERS_ENV,
    };

    struct Fixture {
        store: Arc<InMemoryInstanceStore>,
        cluster: Arc<InMemoryCluster>,
        notifier: Arc<RecordingNotifier>,
        reconciler: Reconciler,
    }

    fn fixture(records: Vec<InstanceRecord>, pods: Vec<Pod>) -> Fixture {
        let store = Arc::new(InMemoryInstanceStore::with_records(records));
        let cluster = Arc::new(InMemoryCluster::with_pods(pods));
        let notifier = Arc::new(RecordingNotifier::new());
        let reconciler = Reconciler::new(store.clone(), cluster.clone(), notifier.clone());
        Fixture {
            store,
            cluster,
            notifier,
            reconciler,
        }
    }

    fn expired(client: &str, instance: &str) -> InstanceRecord {
        InstanceRecord::started(client, instance, "A1", AuthToken::new(format!("tok-{}", instance)))
            .with_end_on_date(Utc::now() - Duration::days(1))
    }

    fn running_pod(instance: &str, namespace: &str) -> Pod {
        let mut metadata = PodMeta {
            name: instance.into(),
            namespace: namespace.into(),
            ..Default::default()
        };
        metadata.labels.insert(APP_LABEL.into(), instance.into());
        Pod {
            metadata,
            ..Default::default()
        }
    }

    fn terminated_pod(instance: &str, algo: &str, reason: &str) -> Pod {
        let mut pod = running_pod(instance, "TESTNS");
        pod.spec = Some(PodSpec {
            containers: vec![Container {
                name: "algo".into(),
                env: vec![EnvVar {
                    name: INSTANCE_PARAMETERS_ENV.into(),
                    value: Some(format!(r#"{{"AlgoId":"{}"}}"#, algo)),
                }],
            }],
        });
        pod.status = Some(PodStatus {
            phase: Some("Failed".into()),
            container_statuses: vec![ContainerStatus {
                name: "algo".into(),
                state: ContainerState {
                    terminated: Some(TerminatedState {
                        reason: reason.into(),
                        exit_code: 1,
                    }),
                },
            }],
        });
        pod
    }

    async fn status_of(store: &InMemoryInstanceStore, client: &str, instance: &str) -> InstanceRecord {
        store
            .get_by_client_and_instance(&ClientId::new(client), &InstanceId::new(instance))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_expired_instance_with_pod_is_stopped() {
        let f = fixture(vec![expired("C1", "I1")], vec![running_pod("I1", "TESTNS")]);
        let candidate = StoppingCandidate::new("C1", "I1");

        let outcome = f.reconciler.stop_expired_instance(&candidate).await.unwrap();

        assert_eq!(outcome, StopOutcome::Terminated(InstanceStatus::Stopped));
        let record = status_of(&f.store, "C1", "I1").await;
        assert_eq!(record.status, InstanceStatus::Stopped);
        assert!(record.stop_date.is_some());
        assert_eq!(f.cluster.delete_calls().await[0].namespace, "TESTNS");
        assert_eq!(f.notifier.summaries_for(&InstanceId::new("I1")).await, 1);
    }

    #[tokio::test]
    async fn test_orphaned_record_is_healed_without_delete() {
        let f = fixture(vec![expired("C1", "I1")], vec![]);
        let candidate = StoppingCandidate::new("C1", "I1");

        let outcome = f.reconciler.stop_expired_instance(&candidate).await.unwrap();

        assert_eq!(outcome, StopOutcome::OrphanHealed);
        assert!(f.cluster.delete_calls().await.is_empty());
        assert_eq!(
            status_of(&f.store, "C1", "I1").await.status,
            InstanceStatus::Stopped
        );
        assert_eq!(f.notifier.summaries_for(&InstanceId::new("I1")).await, 1);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_record_untouched() {
        let f = fixture(vec![expired("C1", "I1")], vec![running_pod("I1", "TESTNS")]);
        f.cluster.fail_all_deletes(true).await;

        let result = f
            .reconciler
            .stop_expired_instance(&StoppingCandidate::new("C1", "I1"))
            .await;

        assert!(matches!(result, Err(StopError::Cluster(_))));
        assert_eq!(
            status_of(&f.store, "C1", "I1").await.status,
            InstanceStatus::Started
        );
        assert_eq!(f.store.write_count(), 0);
        assert!(f.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_stopping_twice_notifies_once() {
        let f = fixture(vec![expired("C1", "I1")], vec![running_pod("I1", "TESTNS")]);
        let candidate = StoppingCandidate::new("C1", "I1");

        f.reconciler.stop_expired_instance(&candidate).await.unwrap();
        let second = f.reconciler.stop_expired_instance(&candidate).await.unwrap();

        assert_eq!(second, StopOutcome::AlreadyStopped);
        assert_eq!(f.store.write_count(), 1);
        assert_eq!(f.notifier.summaries_for(&InstanceId::new("I1")).await, 1);
    }

    #[tokio::test]
    async fn test_incomplete_records_are_refused() {
        let mut no_token = expired("C1", "I1");
        no_token.auth_token = AuthToken::default();
        let mut no_algo = expired("C1", "I2");
        no_algo.algo_id = AlgoId::default();
        let no_instance = expired("C1", "");
        let f = fixture(
            vec![no_token.clone(), no_algo.clone(), no_instance.clone()],
            vec![],
        );

        for record in [&no_token, &no_algo, &no_instance] {
            let result = f.reconciler.mark_stopped_and_notify(&record.candidate()).await;
            assert!(matches!(result, Err(StopError::IncompleteRecord { .. })));
        }

        let missing = f
            .reconciler
            .mark_stopped(&StoppingCandidate::new("C9", "I9"))
            .await;
        assert!(matches!(missing, Err(StopError::RecordNotFound { .. })));

        assert_eq!(f.store.write_count(), 0);
        assert_eq!(status_of(&f.store, "C1", "I1").await, no_token);
        assert_eq!(status_of(&f.store, "C1", "").await, no_instance);
        assert!(f.notifier.sent().await.is_empty());
    }

    /// Marks the record stopped while its pod is being deleted
    struct StopsDuringDelete {
        inner: InMemoryCluster,
        store: Arc<InMemoryInstanceStore>,
    }

    #[async_trait::async_trait]
    impl ClusterGateway for StopsDuringDelete {
        async fn list_pods(&self, instance_id: Option<&InstanceId>) -> ClusterResult<Vec<Pod>> {
            self.inner.list_pods(instance_id).await
        }

        async fn delete_pod_and_service(
            &self,
            instance_id: &InstanceId,
            namespace: &str,
        ) -> ClusterResult<()> {
            let mut record = status_of(&self.store, "C1", instance_id.as_str()).await;
            record.terminate(InstanceStatus::Stopped, Utc::now());
            self.store.save(record).await.unwrap();
            self.inner.delete_pod_and_service(instance_id, namespace).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_stop_wins_over_errored_pod() {
        let store = Arc::new(InMemoryInstanceStore::with_records([InstanceRecord::started(
            "C1",
            "I1",
            "A1",
            AuthToken::new("t1"),
        )]));
        let pod = terminated_pod("I1", "A1", "OOMKilled");
        let cluster = Arc::new(StopsDuringDelete {
            inner: InMemoryCluster::with_pods(vec![pod.clone()]),
            store: store.clone(),
        });
        let notifier = Arc::new(RecordingNotifier::new());
        let reconciler = Reconciler::new(store.clone(), cluster, notifier.clone());

        let outcome = reconciler.stop_errored_pod(&pod).await.unwrap();

        assert_eq!(outcome, StopOutcome::AlreadyStopped);
        assert_eq!(status_of(&store, "C1", "I1").await.status, InstanceStatus::Stopped);
        assert_eq!(store.write_count(), 1);
        assert!(notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_completed_pod_stops_record() {
        let f = fixture(
            vec![InstanceRecord::started("C1", "I1", "A1", AuthToken::new("t1"))],
            vec![terminated_pod("I1", "A1", "Completed")],
        );
        let pod = f.cluster.pods().await.remove(0);

        let outcome = f.reconciler.stop_errored_pod(&pod).await.unwrap();

        assert_eq!(outcome, StopOutcome::Terminated(InstanceStatus::Stopped));
        assert!(f.notifier.user_notices().await.is_empty());
        assert_eq!(f.notifier.summaries_for(&InstanceId::new("I1")).await, 1);
    }

    #[tokio::test]
    async fn test_oom_killed_pod_errors_record_and_tells_user() {
        let f = fixture(
            vec![InstanceRecord::started("C1", "I1", "A1", AuthToken::new("t1"))],
            vec![terminated_pod("I1", "A1", "OOMKilled")],
        );
        let pod = f.cluster.pods().await.remove(0);

        let outcome = f.reconciler.stop_errored_pod(&pod).await.unwrap();

        assert_eq!(outcome, StopOutcome::Terminated(InstanceStatus::Errored));
        let record = status_of(&f.store, "C1", "I1").await;
        assert_eq!(record.status, InstanceStatus::Errored);
        assert!(record.stop_date.is_some());
        assert_eq!(
            f.notifier.user_notices().await,
            vec![Notification::User {
                instance_id: InstanceId::new("I1"),
                message: OUT_OF_RESOURCES_MESSAGE.into(),
                auth_token: AuthToken::new("t1"),
            }]
        );
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_undo_transition() {
        let f = fixture(
            vec![InstanceRecord::started("C1", "I1", "A1", AuthToken::new("t1"))],
            vec![terminated_pod("I1", "A1", "OOMKilled")],
        );
        f.notifier.set_failing(true);
        let pod = f.cluster.pods().await.remove(0);

        let outcome = f.reconciler.stop_errored_pod(&pod).await.unwrap();

        assert_eq!(outcome, StopOutcome::Terminated(InstanceStatus::Errored));
        assert_eq!(
            status_of(&f.store, "C1", "I1").await.status,
            InstanceStatus::Errored
        );
    }

    #[tokio::test]
    async fn test_errored_pod_without_record_is_left_alone() {
        let f = fixture(vec![], vec![terminated_pod("I1", "A1", "Error")]);
        let pod = f.cluster.pods().await.remove(0);

        let outcome = f.reconciler.stop_errored_pod(&pod).await.unwrap();

        assert_eq!(outcome, StopOutcome::Skipped);
        assert!(f.cluster.delete_calls().await.is_empty());
        assert_eq!(f.cluster.pods().await.len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_pod_is_reported() {
        let mut pod = terminated_pod("I1", "A1", "Error");
        pod.spec = None;
        let f = fixture(vec![], vec![pod.clone()]);

        let result = f.reconciler.stop_errored_pod(&pod).await;
        assert!(matches!(result, Err(StopError::Decode(_))));
        assert!(f.cluster.delete_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_collect_expired_keeps_started_only() {
        let mut already = expired("C1", "I2");
        already.terminate(InstanceStatus::Stopped, Utc::now());
        let f = fixture(vec![expired("C1", "I1"), already], vec![]);

        let candidates = f.reconciler.collect_expired(Utc::now()).await.unwrap();
        assert_eq!(candidates, vec![StoppingCandidate::new("C1", "I1")]);
    }

    #[tokio::test]
    async fn test_pass_survives_store_outage() {
        let f = fixture(vec![expired("C1", "I1")], vec![terminated_pod("I2", "A1", "Error")]);
        f.store.set_unavailable(true);

        let report = f.reconciler.run_pass().await;

        assert_eq!(report.expired_candidates, 0);
        assert_eq!(report.errored_pods, 1);
        assert_eq!(report.failures, 1);
        assert!(report.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_full_pass_counts() {
        let f = fixture(
            vec![
                expired("C1", "I1"),
                expired("C1", "I2"),
                InstanceRecord::started("C2", "I3", "A3", AuthToken::new("t3")),
            ],
            vec![
                running_pod("I1", "TESTNS"),
                terminated_pod("I3", "A3", "Completed"),
            ],
        );

        let report = f.reconciler.run_pass().await;

        assert_eq!(report.expired_candidates, 2);
        assert_eq!(report.expired_stopped, 1);
        assert_eq!(report.orphans_healed, 1);
        assert_eq!(report.errored_pods, 1);
        assert_eq!(report.pods_stopped, 1);
        assert_eq!(report.failures, 0);
        for record in f.store.records().await {
            assert_eq!(record.status, InstanceStatus::Stopped);
        }
    }
}
