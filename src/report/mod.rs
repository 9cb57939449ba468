//! Assessment report as written by the inspector, in the CRD's camelCase layout.
//!
//! Only the fields the exporter reads are modelled; everything else is ignored.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentReport {
    pub spec: AssessmentReportSpec,
}

impl AssessmentReport {
    pub async fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let raw = tokio::fs::read(path).await?;
        serde_json::from_slice(&raw).map_err(std::io::Error::other)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentReportSpec {
    pub namespace_assessments: Vec<NamespaceAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamespaceAssessment {
    pub namespace: NamespaceRef,
    pub workload_assessments: Vec<WorkloadAssessment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadAssessment {
    pub workload: ReportWorkload,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportWorkload {
    pub name: String,
    pub kind: String,
    pub replicas: i32,
    pub pods: Vec<ReportPod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPod {
    pub containers: Vec<ReportContainer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportContainer {
    pub name: String,
    pub image: String,
    #[serde(rename = "imageID")]
    pub image_id: String,
}
