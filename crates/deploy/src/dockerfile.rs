//! Dockerfile detection and synthesis.
//!
//! If the cloned tree already carries a Dockerfile it is used unmodified.
//! Otherwise the project type is guessed from marker files and a minimal,
//! opinionated Dockerfile is written. This is a convenience heuristic, not a
//! build system: an unsupported project falls through to the Node template
//! and any resulting build failure surfaces as a normal pipeline error.

use std::path::Path;

use tracing::info;

use crate::error::DeployError;

/// Conventional port every synthesized container listens on; the workload
/// manifest targets the same port.
pub const APP_PORT: u16 = 3000;

/// Detected project ecosystem, in marker precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Python,
    Java,
    Go,
    Node,
}

impl ProjectKind {
    /// Detect by marker-file presence. Precedence: requirements.txt, then
    /// pom.xml, then go.mod; everything else defaults to Node.
    #[must_use]
    pub fn detect(dir: &Path) -> Self {
        if dir.join("requirements.txt").exists() {
            Self::Python
        } else if dir.join("pom.xml").exists() {
            Self::Java
        } else if dir.join("go.mod").exists() {
            Self::Go
        } else {
            Self::Node
        }
    }

    /// Opinionated Dockerfile template for this ecosystem.
    #[must_use]
    pub fn dockerfile(&self) -> &'static str {
        match self {
            Self::Python => PYTHON_DOCKERFILE,
            Self::Java => JAVA_DOCKERFILE,
            Self::Go => GO_DOCKERFILE,
            Self::Node => NODE_DOCKERFILE,
        }
    }
}

impl std::fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Java => write!(f, "java"),
            Self::Go => write!(f, "go"),
            Self::Node => write!(f, "node"),
        }
    }
}

/// How the build file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildFile {
    /// The clone already carried a Dockerfile.
    Existing,
    /// A template was synthesized for the detected ecosystem.
    Generated(ProjectKind),
}

/// Ensure `dir` contains a Dockerfile, synthesizing one when absent.
///
/// # Errors
///
/// Returns an error if the synthesized Dockerfile cannot be written.
pub fn ensure_dockerfile(dir: &Path) -> Result<BuildFile, DeployError> {
    let dockerfile = dir.join("Dockerfile");
    if dockerfile.exists() {
        info!("Repository provides its own Dockerfile");
        return Ok(BuildFile::Existing);
    }

    let kind = ProjectKind::detect(dir);
    std::fs::write(&dockerfile, kind.dockerfile())
        .map_err(|e| DeployError::io(format!("failed to write {}", dockerfile.display()), e))?;
    info!(project_kind = %kind, "Synthesized Dockerfile");
    Ok(BuildFile::Generated(kind))
}

const NODE_DOCKERFILE: &str = "\
FROM node:18-alpine
WORKDIR /app
COPY package*.json ./
RUN npm install --production
COPY . .
EXPOSE 3000
CMD [\"npm\", \"start\"]
";

const PYTHON_DOCKERFILE: &str = "\
FROM python:3.11-slim
WORKDIR /app
COPY requirements.txt ./
RUN pip install --no-cache-dir -r requirements.txt
COPY . .
EXPOSE 3000
CMD [\"python\", \"app.py\"]
";

const JAVA_DOCKERFILE: &str = "\
FROM maven:3.9-eclipse-temurin-17 AS build
WORKDIR /build
COPY . .
RUN mvn -q package -DskipTests
FROM eclipse-temurin:17-jre
WORKDIR /app
COPY --from=build /build/target/*.jar app.jar
EXPOSE 3000
CMD [\"java\", \"-jar\", \"app.jar\"]
";

const GO_DOCKERFILE: &str = "\
FROM golang:1.22-alpine AS build
WORKDIR /src
COPY . .
RUN go build -o /bin/app .
FROM alpine:3.20
COPY --from=build /bin/app /bin/app
EXPOSE 3000
CMD [\"/bin/app\"]
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_precedence_is_python_java_go_node() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Node);

        std::fs::write(dir.path().join("go.mod"), "module m").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Go);

        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Java);

        std::fs::write(dir.path().join("requirements.txt"), "flask").unwrap();
        assert_eq!(ProjectKind::detect(dir.path()), ProjectKind::Python);
    }

    #[test]
    fn bare_repo_gets_the_node_template() {
        // Scenario: no Dockerfile and no marker files at all.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), "console.log('hi')").unwrap();

        let result = ensure_dockerfile(dir.path()).unwrap();
        assert_eq!(result, BuildFile::Generated(ProjectKind::Node));

        let written = std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap();
        assert_eq!(written, NODE_DOCKERFILE);
        assert!(written.contains("EXPOSE 3000"));
    }

    #[test]
    fn existing_dockerfile_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("requirements.txt"), "flask").unwrap();

        let result = ensure_dockerfile(dir.path()).unwrap();
        assert_eq!(result, BuildFile::Existing);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Dockerfile")).unwrap(),
            "FROM scratch\n"
        );
    }

    #[test]
    fn every_template_exposes_the_conventional_port() {
        for kind in [
            ProjectKind::Python,
            ProjectKind::Java,
            ProjectKind::Go,
            ProjectKind::Node,
        ] {
            assert!(
                kind.dockerfile().contains(&format!("EXPOSE {APP_PORT}")),
                "{kind} template must expose {APP_PORT}"
            );
        }
    }
}
