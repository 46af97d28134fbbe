//! [`BatchApi`] implementation on the official AWS SDK.
//!
//! The SDK is async; every call is driven to completion on a private
//! current-thread runtime owned by the client, so callers stay synchronous.

use std::collections::HashMap;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_batch::Client;
use aws_sdk_batch::types::{
    CeState, CeType, ComputeEnvironmentOrder, ComputeResource, ComputeResourceUpdate,
    ContainerProperties, CrType, Host, JobDefinitionType, JobStatus as SdkJobStatus, JqState,
    KeyValuePair, MountPoint, RetryStrategy, Ulimit, Volume,
};
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use super::BatchApi;
use crate::error::{Error, Result};
use crate::render::Payload;
use crate::types::{
    JobDefinitionRevision, JobStatus, JobSubmission, LiveComputeEnvironment, LiveQueue, Page,
};

/// AWS Batch client bound to one region.
pub struct AwsBatch {
    runtime: Runtime,
    client: Client,
}

impl AwsBatch {
    /// Load credentials and region from the environment.
    ///
    /// `region` overrides the region from the environment or profile.
    pub fn new(region: Option<String>) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let config = runtime.block_on(async {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            loader.load().await
        });
        log::debug!(
            "AWS Batch client for region {}",
            config.region().map_or("(default)", |r| r.as_ref())
        );
        Ok(Self {
            runtime,
            client: Client::new(&config),
        })
    }
}

impl BatchApi for AwsBatch {
    fn describe_job_definitions(
        &self,
        name: &str,
        next_token: Option<&str>,
    ) -> Result<Page<JobDefinitionRevision>> {
        log::debug!("DescribeJobDefinitions {name}");
        let output = self
            .runtime
            .block_on(
                self.client
                    .describe_job_definitions()
                    .job_definition_name(name)
                    .status("ACTIVE")
                    .set_next_token(next_token.map(str::to_string))
                    .send(),
            )
            .map_err(|e| Error::api("DescribeJobDefinitions", e))?;

        let items = output
            .job_definitions()
            .iter()
            .map(|jd| JobDefinitionRevision {
                name: text(jd.job_definition_name()),
                arn: text(jd.job_definition_arn()),
                revision: number(jd.revision()),
            })
            .collect();
        Ok(Page {
            items,
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn deregister_job_definition(&self, arn: &str) -> Result<()> {
        log::debug!("DeregisterJobDefinition {arn}");
        self.runtime
            .block_on(
                self.client
                    .deregister_job_definition()
                    .job_definition(arn)
                    .send(),
            )
            .map_err(|e| Error::api("DeregisterJobDefinition", e))?;
        Ok(())
    }

    fn register_job_definition(&self, payload: &Payload) -> Result<JobDefinitionRevision> {
        const OP: &str = "RegisterJobDefinition";
        let name = required(OP, payload, "jobDefinitionName")?;
        log::debug!("{OP} {name}");

        let container = payload
            .get("containerProperties")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::payload(OP, "missing containerProperties"))?;
        let retry_strategy = object(payload, "retryStrategy").map(|r| {
            RetryStrategy::builder()
                .set_attempts(int(r, "attempts"))
                .build()
        });

        let output = self
            .runtime
            .block_on(
                self.client
                    .register_job_definition()
                    .job_definition_name(name)
                    .r#type(JobDefinitionType::Container)
                    .container_properties(container_properties(container)?)
                    .set_parameters(string_map(payload, "parameters"))
                    .set_retry_strategy(retry_strategy)
                    .send(),
            )
            .map_err(|e| Error::api(OP, e))?;

        Ok(JobDefinitionRevision {
            name: text(output.job_definition_name()),
            arn: text(output.job_definition_arn()),
            revision: number(output.revision()),
        })
    }

    fn describe_compute_environments(
        &self,
        names: &[String],
    ) -> Result<Vec<LiveComputeEnvironment>> {
        log::debug!("DescribeComputeEnvironments {names:?}");
        let mut described = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .runtime
                .block_on(
                    self.client
                        .describe_compute_environments()
                        .set_compute_environments(Some(names.to_vec()))
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(|e| Error::api("DescribeComputeEnvironments", e))?;

            described.extend(output.compute_environments().iter().map(|ce| {
                LiveComputeEnvironment {
                    name: text(ce.compute_environment_name()),
                    arn: text(ce.compute_environment_arn()),
                    state: variant(ce.state()),
                    status: variant(ce.status()),
                    status_reason: optional(ce.status_reason()),
                    ecs_cluster_arn: optional(ce.ecs_cluster_arn()),
                    service_role: optional(ce.service_role()),
                }
            }));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(described)
    }

    fn create_compute_environment(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "CreateComputeEnvironment";
        let name = required(OP, payload, "computeEnvironmentName")?;
        let kind = required(OP, payload, "type")?;
        log::debug!("{OP} {name}");

        let resources = object(payload, "computeResources")
            .map(compute_resource)
            .transpose()?;

        self.runtime
            .block_on(
                self.client
                    .create_compute_environment()
                    .compute_environment_name(name)
                    .r#type(CeType::from(kind.as_str()))
                    .set_state(string(payload, "state").map(|s| CeState::from(s.as_str())))
                    .set_service_role(string(payload, "serviceRole"))
                    .set_compute_resources(resources)
                    .send(),
            )
            .map_err(|e| Error::api(OP, e))?;
        Ok(())
    }

    fn update_compute_environment(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "UpdateComputeEnvironment";
        let identifier = required(OP, payload, "computeEnvironment")?;
        log::debug!("{OP} {identifier}");

        let resources = object(payload, "computeResources").map(|r| {
            ComputeResourceUpdate::builder()
                .set_minv_cpus(int(r, "minvCpus"))
                .set_maxv_cpus(int(r, "maxvCpus"))
                .set_desiredv_cpus(int(r, "desiredvCpus"))
                .set_tags(string_map(r, "tags"))
                .build()
        });

        self.runtime
            .block_on(
                self.client
                    .update_compute_environment()
                    .compute_environment(identifier)
                    .set_state(string(payload, "state").map(|s| CeState::from(s.as_str())))
                    .set_service_role(string(payload, "serviceRole"))
                    .set_compute_resources(resources)
                    .send(),
            )
            .map_err(|e| Error::api(OP, e))?;
        Ok(())
    }

    fn delete_compute_environment(&self, name: &str) -> Result<()> {
        log::debug!("DeleteComputeEnvironment {name}");
        self.runtime
            .block_on(
                self.client
                    .delete_compute_environment()
                    .compute_environment(name)
                    .send(),
            )
            .map_err(|e| Error::api("DeleteComputeEnvironment", e))?;
        Ok(())
    }

    fn describe_job_queues(&self, names: &[String]) -> Result<Vec<LiveQueue>> {
        log::debug!("DescribeJobQueues {names:?}");
        let mut described = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = self
                .runtime
                .block_on(
                    self.client
                        .describe_job_queues()
                        .set_job_queues(Some(names.to_vec()))
                        .set_next_token(next_token.take())
                        .send(),
                )
                .map_err(|e| Error::api("DescribeJobQueues", e))?;

            described.extend(output.job_queues().iter().map(|q| LiveQueue {
                name: text(q.job_queue_name()),
                arn: text(q.job_queue_arn()),
                state: variant(q.state()),
                status: variant(q.status()),
                status_reason: optional(q.status_reason()),
                priority: q.priority().into(),
            }));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(described)
    }

    fn create_job_queue(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "CreateJobQueue";
        let name = required(OP, payload, "jobQueueName")?;
        log::debug!("{OP} {name}");

        self.runtime
            .block_on(
                self.client
                    .create_job_queue()
                    .job_queue_name(name)
                    .set_state(string(payload, "state").map(|s| JqState::from(s.as_str())))
                    .set_priority(int(payload, "priority"))
                    .set_compute_environment_order(environment_order(OP, payload)?)
                    .send(),
            )
            .map_err(|e| Error::api(OP, e))?;
        Ok(())
    }

    fn update_job_queue(&self, payload: &Payload) -> Result<()> {
        const OP: &str = "UpdateJobQueue";
        let identifier = required(OP, payload, "jobQueue")?;
        log::debug!("{OP} {identifier}");

        self.runtime
            .block_on(
                self.client
                    .update_job_queue()
                    .job_queue(identifier)
                    .set_state(string(payload, "state").map(|s| JqState::from(s.as_str())))
                    .set_priority(int(payload, "priority"))
                    .set_compute_environment_order(environment_order(OP, payload)?)
                    .send(),
            )
            .map_err(|e| Error::api(OP, e))?;
        Ok(())
    }

    fn delete_job_queue(&self, name: &str) -> Result<()> {
        log::debug!("DeleteJobQueue {name}");
        self.runtime
            .block_on(self.client.delete_job_queue().job_queue(name).send())
            .map_err(|e| Error::api("DeleteJobQueue", e))?;
        Ok(())
    }

    fn list_jobs(
        &self,
        queue: &str,
        status: JobStatus,
        next_token: Option<&str>,
    ) -> Result<Page<String>> {
        log::trace!("ListJobs {queue} {status}");
        let output = self
            .runtime
            .block_on(
                self.client
                    .list_jobs()
                    .job_queue(queue)
                    .job_status(SdkJobStatus::from(status.as_str()))
                    .set_next_token(next_token.map(str::to_string))
                    .send(),
            )
            .map_err(|e| Error::api("ListJobs", e))?;

        Ok(Page {
            items: output
                .job_summary_list()
                .iter()
                .map(|job| text(job.job_id()))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    fn submit_job(&self, submission: &JobSubmission) -> Result<String> {
        log::debug!(
            "SubmitJob {} to {} using {}",
            submission.job_name,
            submission.job_queue,
            submission.job_definition
        );
        let parameters = (!submission.parameters.is_empty()).then(|| {
            submission
                .parameters
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>()
        });
        let output = self
            .runtime
            .block_on(
                self.client
                    .submit_job()
                    .job_name(&submission.job_name)
                    .job_queue(&submission.job_queue)
                    .job_definition(&submission.job_definition)
                    .set_parameters(parameters)
                    .send(),
            )
            .map_err(|e| Error::api("SubmitJob", e))?;
        Ok(text(output.job_id()))
    }

    fn cancel_job(&self, job_id: &str, reason: &str) -> Result<()> {
        log::debug!("CancelJob {job_id}");
        self.runtime
            .block_on(self.client.cancel_job().job_id(job_id).reason(reason).send())
            .map_err(|e| Error::api("CancelJob", e))?;
        Ok(())
    }

    fn terminate_job(&self, job_id: &str, reason: &str) -> Result<()> {
        log::debug!("TerminateJob {job_id}");
        self.runtime
            .block_on(
                self.client
                    .terminate_job()
                    .job_id(job_id)
                    .reason(reason)
                    .send(),
            )
            .map_err(|e| Error::api("TerminateJob", e))?;
        Ok(())
    }
}

// ============================================================================
// Output accessors
// ============================================================================

// Model members are exposed either directly or as `Option`, depending on
// whether the service marks them required.

fn text<'a>(value: impl Into<Option<&'a str>>) -> String {
    value.into().unwrap_or_default().to_string()
}

fn optional<'a>(value: impl Into<Option<&'a str>>) -> Option<String> {
    value.into().map(str::to_string)
}

fn number(value: impl Into<Option<i32>>) -> i32 {
    value.into().unwrap_or_default()
}

fn variant<'a, T>(value: impl Into<Option<&'a T>>) -> Option<String>
where
    T: AsRef<str> + 'a,
{
    value.into().map(|v| v.as_ref().to_string())
}

// ============================================================================
// Payload accessors
// ============================================================================

fn string(payload: &Payload, key: &str) -> Option<String> {
    payload.get(key).and_then(Value::as_str).map(str::to_string)
}

fn required(operation: &'static str, payload: &Payload, key: &str) -> Result<String> {
    string(payload, key).ok_or_else(|| Error::payload(operation, format!("missing {key}")))
}

fn int(payload: &Payload, key: &str) -> Option<i32> {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn boolean(payload: &Payload, key: &str) -> Option<bool> {
    payload.get(key).and_then(Value::as_bool)
}

fn object<'a>(payload: &'a Payload, key: &str) -> Option<&'a Payload> {
    payload.get(key).and_then(Value::as_object)
}

fn objects<'a>(payload: &'a Payload, key: &str) -> impl Iterator<Item = &'a Payload> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn strings(payload: &Payload, key: &str) -> Option<Vec<String>> {
    payload.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    })
}

fn string_map(payload: &Payload, key: &str) -> Option<HashMap<String, String>> {
    object(payload, key).map(|map| {
        map.iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    })
}

// ============================================================================
// Request shapes
// ============================================================================

fn compute_resource(resources: &Payload) -> Result<ComputeResource> {
    const OP: &str = "CreateComputeEnvironment";
    let kind = required(OP, resources, "type")?;
    Ok(ComputeResource::builder()
        .r#type(CrType::from(kind.as_str()))
        .set_minv_cpus(int(resources, "minvCpus"))
        .set_maxv_cpus(int(resources, "maxvCpus"))
        .set_desiredv_cpus(int(resources, "desiredvCpus"))
        .set_instance_types(strings(resources, "instanceTypes"))
        .set_subnets(strings(resources, "subnets"))
        .set_security_group_ids(strings(resources, "securityGroupIds"))
        .set_instance_role(string(resources, "instanceRole"))
        .set_image_id(string(resources, "imageId"))
        .set_ec2_key_pair(string(resources, "ec2KeyPair"))
        .set_tags(string_map(resources, "tags"))
        .set_bid_percentage(int(resources, "bidPercentage"))
        .set_spot_iam_fleet_role(string(resources, "spotIamFleetRole"))
        .build())
}

fn environment_order(
    operation: &'static str,
    payload: &Payload,
) -> Result<Option<Vec<ComputeEnvironmentOrder>>> {
    if !payload.contains_key("computeEnvironmentOrder") {
        return Ok(None);
    }
    objects(payload, "computeEnvironmentOrder")
        .map(|entry| {
            Ok(ComputeEnvironmentOrder::builder()
                .set_order(int(entry, "order"))
                .set_compute_environment(string(entry, "computeEnvironment"))
                .build())
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

#[allow(deprecated)]
fn container_properties(container: &Payload) -> Result<ContainerProperties> {
    const OP: &str = "RegisterJobDefinition";

    let ulimits = objects(container, "ulimits")
        .map(|u| {
            Ok(Ulimit::builder()
                .set_name(string(u, "name"))
                .set_hard_limit(int(u, "hardLimit"))
                .set_soft_limit(int(u, "softLimit"))
                .build())
        })
        .collect::<Result<Vec<_>>>()?;

    let volumes = objects(container, "volumes")
        .map(|v| {
            Volume::builder()
                .set_name(string(v, "name"))
                .set_host(object(v, "host").map(|h| {
                    Host::builder()
                        .set_source_path(string(h, "sourcePath"))
                        .build()
                }))
                .build()
        })
        .collect::<Vec<_>>();

    let mount_points = objects(container, "mountPoints")
        .map(|m| {
            MountPoint::builder()
                .set_container_path(string(m, "containerPath"))
                .set_read_only(boolean(m, "readOnly"))
                .set_source_volume(string(m, "sourceVolume"))
                .build()
        })
        .collect::<Vec<_>>();

    let environment = objects(container, "environment")
        .map(|e| {
            KeyValuePair::builder()
                .set_name(string(e, "name"))
                .set_value(string(e, "value"))
                .build()
        })
        .collect::<Vec<_>>();

    Ok(ContainerProperties::builder()
        .set_image(string(container, "image"))
        .set_memory(int(container, "memory"))
        .set_vcpus(int(container, "vcpus"))
        .set_command(strings(container, "command"))
        .set_job_role_arn(string(container, "jobRoleArn"))
        .set_readonly_root_filesystem(boolean(container, "readonlyRootFilesystem"))
        .set_privileged(boolean(container, "privileged"))
        .set_user(string(container, "user"))
        .set_volumes((!volumes.is_empty()).then_some(volumes))
        .set_mount_points((!mount_points.is_empty()).then_some(mount_points))
        .set_environment((!environment.is_empty()).then_some(environment))
        .set_ulimits((!ulimits.is_empty()).then_some(ulimits))
        .build())
}
