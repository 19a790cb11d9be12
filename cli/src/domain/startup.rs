//! First-boot startup sequence.
//!
//! The sequence is an ordered list of step descriptors. It is built once,
//! inspected by `campfire plan`, and rendered separately into the bash
//! user-data script that runs at first boot. Any failing step aborts that
//! boot; nothing is retried.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::compute::{Access, Grant};
use crate::domain::ids::hex_encode;
use crate::domain::save_store::{SaveStore, store_arn};

pub const AUTO_SHUTDOWN_INSTALL_PATH: &str = "/usr/local/bin/auto-shutdown.sh";
pub const AUTO_SHUTDOWN_SERVICE: &str = "auto-shutdown";
pub const CLI_INSTALLER_URL: &str = "https://awscli.amazonaws.com/awscli-exe-linux-x86_64.zip";
const DOWNLOAD_DIR: &str = "/tmp/campfire";

/// A script published to the asset bucket, content-addressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Local file the artifact was staged from.
    pub source: PathBuf,
    pub bucket: String,
    /// `assets/<sha256>.<ext>`
    pub key: String,
}

impl Artifact {
    /// Content-addressed artifact for `source` with the given digest.
    #[must_use]
    pub fn staged(source: &Path, bucket: &str, sha256: &str) -> Self {
        let key = match source.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("assets/{sha256}.{ext}"),
            None => format!("assets/{sha256}"),
        };
        Self {
            source: source.to_path_buf(),
            bucket: bucket.to_string(),
            key,
        }
    }

    #[must_use]
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Resource name of the object, for read grants.
    #[must_use]
    pub fn arn(&self) -> String {
        format!("{}/{}", store_arn(&self.bucket), self.key)
    }

    /// Where the artifact lands on the instance.
    #[must_use]
    pub fn local_path(&self) -> String {
        let file = self.key.rsplit('/').next().unwrap_or(&self.key);
        format!("{DOWNLOAD_DIR}/{file}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliTool {
    /// Install the platform CLI from the vendor installer.
    Install,
    /// Assume the image ships it; fail the boot if it is missing.
    Verify,
}

/// A systemd unit wrapping an installed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedService {
    pub name: String,
    pub exec_path: String,
    pub description: String,
}

impl ManagedService {
    #[must_use]
    pub fn unit_path(&self) -> String {
        format!("/etc/systemd/system/{}.service", self.name)
    }

    #[must_use]
    pub fn unit_file(&self) -> String {
        format!(
            "[Unit]\n\
             Description={description}\n\
             After=network-online.target\n\
             \n\
             [Service]\n\
             Type=simple\n\
             ExecStart={exec}\n\
             Restart=always\n\
             RestartSec=10\n\
             \n\
             [Install]\n\
             WantedBy=multi-user.target\n",
            description = self.description,
            exec = self.exec_path,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StartupStep {
    EnsureCliTool {
        mode: CliTool,
    },
    FetchAndExecute {
        artifact: Artifact,
        args: Vec<String>,
    },
    FetchAndInstallService {
        artifact: Artifact,
        install_path: String,
        service: ManagedService,
    },
}

impl StartupStep {
    /// One-line summary for `campfire plan`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::EnsureCliTool { mode: CliTool::Install } => "install platform CLI".to_string(),
            Self::EnsureCliTool { mode: CliTool::Verify } => "verify platform CLI".to_string(),
            Self::FetchAndExecute { artifact, args } => {
                format!("fetch {} and run it with [{}]", artifact.uri(), args.join(", "))
            }
            Self::FetchAndInstallService {
                artifact,
                install_path,
                service,
            } => format!(
                "fetch {} to {install_path} and enable {}.service",
                artifact.uri(),
                service.name
            ),
        }
    }

    fn artifact(&self) -> Option<&Artifact> {
        match self {
            Self::EnsureCliTool { .. } => None,
            Self::FetchAndExecute { artifact, .. }
            | Self::FetchAndInstallService { artifact, .. } => Some(artifact),
        }
    }
}

/// The two scripts every server boots with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupArtifacts {
    pub install: Artifact,
    pub auto_shutdown: Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupSequence {
    steps: Vec<StartupStep>,
}

impl StartupSequence {
    /// CLI tool, then the install script with `(store, experimental)`, then
    /// the auto-shutdown service. Always in that order.
    #[must_use]
    pub fn build(
        store: &SaveStore,
        use_experimental_build: bool,
        artifacts: &StartupArtifacts,
        cli_tool: CliTool,
    ) -> Self {
        let steps = vec![
            StartupStep::EnsureCliTool { mode: cli_tool },
            StartupStep::FetchAndExecute {
                artifact: artifacts.install.clone(),
                args: vec![store.name.clone(), use_experimental_build.to_string()],
            },
            StartupStep::FetchAndInstallService {
                artifact: artifacts.auto_shutdown.clone(),
                install_path: AUTO_SHUTDOWN_INSTALL_PATH.to_string(),
                service: ManagedService {
                    name: AUTO_SHUTDOWN_SERVICE.to_string(),
                    exec_path: AUTO_SHUTDOWN_INSTALL_PATH.to_string(),
                    description: "Stop the game server when nobody is playing".to_string(),
                },
            },
        ];
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[StartupStep] {
        &self.steps
    }

    /// Read access the instance needs to fetch every artifact.
    #[must_use]
    pub fn required_grants(&self) -> Vec<Grant> {
        self.steps
            .iter()
            .filter_map(StartupStep::artifact)
            .map(|a| Grant {
                resource: a.arn(),
                access: Access::Read,
            })
            .collect()
    }

    /// Renders the user-data script.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("#!/bin/bash\nset -euo pipefail\n");
        let _ = writeln!(out, "mkdir -p {DOWNLOAD_DIR}");
        for step in &self.steps {
            out.push('\n');
            let _ = writeln!(out, "# {}", step.summary());
            render_step(&mut out, step);
        }
        out
    }

    /// SHA-256 of the rendered script. A change replaces the instance.
    #[must_use]
    pub fn digest(&self) -> String {
        hex_encode(&Sha256::digest(self.render().as_bytes()))
    }
}

fn render_step(out: &mut String, step: &StartupStep) {
    match step {
        StartupStep::EnsureCliTool { mode: CliTool::Install } => {
            out.push_str("apt-get install -y unzip\n");
            let _ = writeln!(out, "curl -fsSL {CLI_INSTALLER_URL} -o /tmp/awscliv2.zip");
            out.push_str("unzip -oq /tmp/awscliv2.zip -d /tmp\n");
            out.push_str("/tmp/aws/install --update\n");
        }
        StartupStep::EnsureCliTool { mode: CliTool::Verify } => {
            out.push_str("command -v aws >/dev/null\n");
        }
        StartupStep::FetchAndExecute { artifact, args } => {
            let local = shell_quote(&artifact.local_path());
            let _ = writeln!(out, "aws s3 cp {} {local}", shell_quote(&artifact.uri()));
            let _ = writeln!(out, "chmod +x {local}");
            let quoted: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();
            let _ = writeln!(out, "{local} {}", quoted.join(" "));
        }
        StartupStep::FetchAndInstallService {
            artifact,
            install_path,
            service,
        } => {
            let local = shell_quote(&artifact.local_path());
            let _ = writeln!(out, "aws s3 cp {} {local}", shell_quote(&artifact.uri()));
            let _ = writeln!(out, "install -m 0755 {local} {}", shell_quote(install_path));
            let _ = writeln!(out, "cat > {} <<'UNIT'", service.unit_path());
            out.push_str(&service.unit_file());
            out.push_str("UNIT\n");
            out.push_str("systemctl daemon-reload\n");
            let _ = writeln!(out, "systemctl enable {}", service.name);
            let _ = writeln!(out, "systemctl start {}", service.name);
        }
    }
}

/// Single-quotes `s` for bash.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
