//! Workload manifest construction.
//!
//! The Deployment, Service, and Ingress are built as typed k8s-openapi
//! resources and serialized into one multi-document YAML string. Environment
//! variables from the request become typed `EnvVar` fields, so values
//! containing quotes or YAML metacharacters cannot break out of the manifest.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::dockerfile::APP_PORT;
use crate::error::DeployError;

/// Service port exposed inside the cluster; the ingress routes to it.
const SERVICE_PORT: i32 = 80;

#[must_use]
pub fn deployment_name(slug: &str) -> String {
    format!("{slug}-deployment")
}

#[must_use]
pub fn service_name(slug: &str) -> String {
    format!("{slug}-service")
}

#[must_use]
pub fn ingress_name(slug: &str) -> String {
    format!("{slug}-ingress")
}

/// Render the full workload manifest (Deployment + Service + Ingress) for a
/// namespace identity.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render(
    namespace: &str,
    slug: &str,
    image: &str,
    env_variables: &BTreeMap<String, String>,
) -> Result<String, DeployError> {
    let docs = [
        to_document(&deployment(namespace, slug, image, env_variables))?,
        to_document(&service(namespace, slug))?,
        to_document(&ingress(namespace, slug))?,
    ];
    Ok(docs.join("---\n"))
}

fn app_labels(slug: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), slug.to_string())])
}

fn deployment(
    namespace: &str,
    slug: &str,
    image: &str,
    env_variables: &BTreeMap<String, String>,
) -> Deployment {
    let env: Vec<EnvVar> = env_variables
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            value_from: None,
        })
        .collect();

    let container = Container {
        name: slug.to_string(),
        image: Some(image.to_string()),
        ports: Some(vec![ContainerPort {
            container_port: i32::from(APP_PORT),
            ..ContainerPort::default()
        }]),
        env: if env.is_empty() { None } else { Some(env) },
        resources: Some(ResourceRequirements {
            requests: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("100m".to_string())),
                ("memory".to_string(), Quantity("128Mi".to_string())),
            ])),
            limits: Some(BTreeMap::from([
                ("cpu".to_string(), Quantity("500m".to_string())),
                ("memory".to_string(), Quantity("512Mi".to_string())),
            ])),
            ..ResourceRequirements::default()
        }),
        ..Container::default()
    };

    Deployment {
        metadata: ObjectMeta {
            name: Some(deployment_name(slug)),
            namespace: Some(namespace.to_string()),
            labels: Some(app_labels(slug)),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(app_labels(slug)),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(app_labels(slug)),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}

fn service(namespace: &str, slug: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(service_name(slug)),
            namespace: Some(namespace.to_string()),
            labels: Some(app_labels(slug)),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(app_labels(slug)),
            ports: Some(vec![ServicePort {
                port: SERVICE_PORT,
                target_port: Some(IntOrString::Int(i32::from(APP_PORT))),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

fn ingress(namespace: &str, slug: &str) -> Ingress {
    let annotations = BTreeMap::from([
        (
            "alb.ingress.kubernetes.io/scheme".to_string(),
            "internet-facing".to_string(),
        ),
        (
            "alb.ingress.kubernetes.io/target-type".to_string(),
            "ip".to_string(),
        ),
    ]);

    Ingress {
        metadata: ObjectMeta {
            name: Some(ingress_name(slug)),
            namespace: Some(namespace.to_string()),
            annotations: Some(annotations),
            ..ObjectMeta::default()
        },
        spec: Some(IngressSpec {
            ingress_class_name: Some("alb".to_string()),
            rules: Some(vec![IngressRule {
                host: None,
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name(slug),
                                port: Some(ServiceBackendPort {
                                    number: Some(SERVICE_PORT),
                                    name: None,
                                }),
                            }),
                            resource: None,
                        },
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

/// Serialize a typed resource to a YAML document with `apiVersion`/`kind`
/// injected (the typed structs carry them as consts, not fields).
fn to_document<T>(resource: &T) -> Result<String, DeployError>
where
    T: k8s_openapi::Resource + serde::Serialize,
{
    let mut value = serde_json::to_value(resource)
        .map_err(|e| DeployError::Manifest(format!("failed to serialize {}: {e}", T::KIND)))?;
    if let serde_json::Value::Object(ref mut map) = value {
        map.insert(
            "apiVersion".to_string(),
            serde_json::Value::String(T::API_VERSION.to_string()),
        );
        map.insert(
            "kind".to_string(),
            serde_json::Value::String(T::KIND.to_string()),
        );
    }
    serde_yaml::to_string(&value)
        .map_err(|e| DeployError::Manifest(format!("failed to render {}: {e}", T::KIND)))
}
