use super::{merge_labels, Syncer};
use crate::constants::{
    CRON_ACTIVE_DEADLINE_SECS, CRON_FAILED_JOBS_HISTORY, CRON_SCHEDULE,
    CRON_STARTING_DEADLINE_SECS, CRON_SUCCESSFUL_JOBS_HISTORY,
};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::merge::merge_into;
use crate::controller::resolver::EffectiveSpec;
use crate::controller::template::job_pod_template;
use k8s_openapi::api::batch::v1::{CronJob, JobTemplateSpec};
use std::sync::Arc;

pub const CRON_COMMAND: [&str; 5] = ["wp", "cron", "event", "run", "--due-now"];

/// Every-minute wp-cron CronJob
#[derive(Debug)]
pub struct CronSyncer {
    spec: Arc<EffectiveSpec>,
}

impl CronSyncer {
    pub fn new(spec: Arc<EffectiveSpec>) -> Self {
        Self { spec }
    }
}

impl Syncer for CronSyncer {
    type Object = CronJob;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::Cron)
    }

    fn transform(&self, mut existing: CronJob) -> Result<CronJob, SyncError> {
        let spec = &self.spec;
        let labels = spec.component_labels(Component::Cron);
        merge_labels(&mut existing.metadata, labels.clone());

        let mut cron = existing.spec.take().unwrap_or_default();
        cron.schedule = CRON_SCHEDULE.to_string();
        cron.concurrency_policy = Some("Forbid".to_string());
        cron.starting_deadline_seconds = Some(CRON_STARTING_DEADLINE_SECS);
        cron.successful_jobs_history_limit = Some(CRON_SUCCESSFUL_JOBS_HISTORY);
        cron.failed_jobs_history_limit = Some(CRON_FAILED_JOBS_HISTORY);

        let JobTemplateSpec {
            metadata,
            spec: job,
        } = cron.job_template;
        let mut metadata = metadata.unwrap_or_default();
        merge_labels(&mut metadata, labels);
        let mut job = job.unwrap_or_default();
        job.backoff_limit = Some(0);
        job.active_deadline_seconds = Some(CRON_ACTIVE_DEADLINE_SECS);
        job.template = merge_into(&job.template, &job_pod_template(spec, &CRON_COMMAND))
            .map_err(|source| SyncError::Merge {
                kind: "CronJob",
                source,
            })?;
        cron.job_template = JobTemplateSpec {
            metadata: Some(metadata),
            spec: Some(job),
        };

        existing.spec = Some(cron);
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::effective;
    use super::*;
    use crate::constants::CLI_CONTAINER_NAME;
    use crate::crd::WordpressSpec;

    #[test]
    fn test_cron_job_shape() {
        let syncer = CronSyncer::new(effective(WordpressSpec::default()));
        assert_eq!(syncer.key().name, "blog-wp-cron");
        let out = syncer.transform(syncer.placeholder()).expect("transforms");
        let cron = out.spec.expect("spec");
        assert_eq!(cron.schedule, "* * * * *");
        assert_eq!(cron.concurrency_policy.as_deref(), Some("Forbid"));
        assert_eq!(cron.starting_deadline_seconds, Some(10));
        assert_eq!(cron.successful_jobs_history_limit, Some(3));
        assert_eq!(cron.failed_jobs_history_limit, Some(1));

        let job = cron.job_template.spec.expect("job");
        assert_eq!(job.backoff_limit, Some(0));
        assert_eq!(job.active_deadline_seconds, Some(10));
        let pod = job.template.spec.expect("pod");
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.containers[0].name, CLI_CONTAINER_NAME);
        assert_eq!(
            pod.containers[0].args.clone().unwrap_or_default(),
            CRON_COMMAND.map(String::from).to_vec()
        );
    }

    #[test]
    fn test_cron_transform_is_idempotent() {
        let syncer = CronSyncer::new(effective(WordpressSpec::default()));
        let once = syncer.transform(syncer.placeholder()).expect("transforms");
        let twice = syncer.transform(once.clone()).expect("transforms");
        assert_eq!(once, twice);
    }
}
