use crate::report::AssessmentReport;
use serde::{Deserialize, Serialize};

/// Telemetry request body for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub workloads: Vec<Workload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub kind: String,
    pub namespace: String,
    pub replicas: i32,
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    pub image_id: String,
}

impl TelemetryPayload {
    /// Flattens the report into one workload per workload assessment, in report order,
    /// with one container entry per container of every pod.
    pub fn from_report(report: &AssessmentReport) -> Self {
        let workloads = report
            .spec
            .namespace_assessments
            .iter()
            .flat_map(|ns| {
                ns.workload_assessments.iter().map(move |assessment| {
                    let workload = &assessment.workload;
                    Workload {
                        name: workload.name.clone(),
                        kind: workload.kind.clone(),
                        namespace: ns.namespace.name.clone(),
                        replicas: workload.replicas,
                        containers: workload
                            .pods
                            .iter()
                            .flat_map(|pod| &pod.containers)
                            .map(|c| Container {
                                name: c.name.clone(),
                                image: c.image.clone(),
                                image_id: c.image_id.clone(),
                            })
                            .collect(),
                    }
                })
            })
            .collect();

        Self { workloads }
    }

    pub fn container_count(&self) -> usize {
        self.workloads.iter().map(|w| w.containers.len()).sum()
    }
}
