use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use regex::Regex;

use crate::model::config::InstallerConfig;
use crate::model::scripts;

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([^\]]+)\]$").expect("valid annotation regex"));

/// What an item is, and therefore how it gets installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallKind {
    Package,
    Extension,
    Script,
}

impl InstallKind {
    pub fn noun(&self) -> &'static str {
        match self {
            InstallKind::Package => "package",
            InstallKind::Extension => "extension",
            InstallKind::Script => "script",
        }
    }
}

/// Result of a single install attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub item_name: String,
    pub succeeded: bool,
    pub log_line: String,
}

impl InstallOutcome {
    pub fn success(item_name: impl Into<String>, log_line: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            succeeded: true,
            log_line: log_line.into(),
        }
    }

    pub fn failure(item_name: impl Into<String>, log_line: impl Into<String>) -> Self {
        Self {
            item_name: item_name.into(),
            succeeded: false,
            log_line: log_line.into(),
        }
    }
}

/// Performs one install. Implementations block until the attempt is over
/// and report every failure through the outcome instead of an error.
pub trait Installer: Send + Sync {
    fn install(&self, item_name: &str, kind: InstallKind) -> InstallOutcome;
}

/// A package entry with its optional service annotations,
/// e.g. `pipewire [user] [pipewire-pulse.service]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub services: Vec<String>,
    pub user_level: bool,
}

impl PackageSpec {
    pub fn parse(entry: &str) -> Option<Self> {
        let mut fields = entry.split_whitespace();
        let name = fields.next()?.to_string();

        let mut services = Vec::new();
        let mut user_level = false;
        for field in fields {
            let Some(caps) = ANNOTATION_RE.captures(field) else {
                continue;
            };
            match &caps[1] {
                "user" => user_level = true,
                service => services.push(service.to_string()),
            }
        }

        Some(Self {
            name,
            services,
            user_level,
        })
    }
}

/// Installer that shells out to the commands configured for each kind.
pub struct SystemInstaller {
    config: InstallerConfig,
}

impl SystemInstaller {
    pub fn new(config: InstallerConfig) -> Self {
        Self { config }
    }

    fn install_package(&self, entry: &str) -> InstallOutcome {
        let Some(spec) = PackageSpec::parse(entry) else {
            return InstallOutcome::failure(entry, "Invalid package string");
        };

        if let Err(diag) = run_with_arg(&self.config.package_command, &spec.name) {
            return InstallOutcome::failure(
                entry,
                format!("{}: Failed to install {diag}", spec.name),
            );
        }

        let mut message = format!("{}: Installed successfully", spec.name);
        let service_command = if spec.user_level {
            &self.config.user_service_command
        } else {
            &self.config.service_command
        };
        for service in &spec.services {
            match run_with_arg(service_command, service) {
                Ok(()) => message.push_str(&format!("\n{service} Enabled successfully")),
                Err(diag) => {
                    return InstallOutcome::failure(
                        entry,
                        format!("{message}\nFailed to enable {service}: {diag}"),
                    );
                }
            }
        }

        InstallOutcome::success(entry, message)
    }

    fn install_extension(&self, name: &str) -> InstallOutcome {
        match run_with_arg(&self.config.extension_command, name) {
            Ok(()) => InstallOutcome::success(name, format!("{name}: Installed successfully")),
            Err(diag) => InstallOutcome::failure(name, format!("{name}: Failed to install {diag}")),
        }
    }
}

impl Installer for SystemInstaller {
    fn install(&self, item_name: &str, kind: InstallKind) -> InstallOutcome {
        tracing::debug!("installing {} {item_name}", kind.noun());
        match kind {
            InstallKind::Package => self.install_package(item_name),
            InstallKind::Extension => self.install_extension(item_name),
            InstallKind::Script => match scripts::find(item_name) {
                Some(script) => script.run(),
                None => InstallOutcome::failure(
                    item_name,
                    crate::error::Error::UnknownScript(item_name.to_string()).to_string(),
                ),
            },
        }
    }
}

/// Runs `argv + [arg]`, folding spawn errors and non-zero exits into one
/// diagnostic string made of the status and the combined output.
pub fn run_with_arg(argv: &[String], arg: &str) -> Result<(), String> {
    let mut full: Vec<&str> = argv.iter().map(String::as_str).collect();
    full.push(arg);
    run(&full)
}

pub fn run(argv: &[&str]) -> Result<(), String> {
    run_command(argv, RunOptions::default()).map(drop)
}

/// Where a command runs and what it reads on stdin. Without `stdin` the
/// child gets an empty input.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions<'a> {
    pub cwd: Option<&'a Path>,
    pub stdin: Option<&'a str>,
}

/// Runs `argv` to completion and returns its stdout. Spawn errors become
/// `"<program>: <error>"`; a non-zero exit becomes the status followed by
/// the combined stdout and stderr.
pub fn run_command(argv: &[&str], options: RunOptions<'_>) -> Result<String, String> {
    let Some((program, args)) = argv.split_first() else {
        return Err("empty command".to_string());
    };

    let mut command = Command::new(program);
    command
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if options.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = options.cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|err| format!("{program}: {err}"))?;
    if let (Some(input), Some(mut stdin)) = (options.stdin, child.stdin.take()) {
        stdin
            .write_all(input.as_bytes())
            .map_err(|err| format!("{program}: {err}"))?;
    }
    let output = child
        .wait_with_output()
        .map_err(|err| format!("{program}: {err}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let mut combined = stdout;
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let combined = combined.trim_matches('\n');
    if combined.is_empty() {
        Err(format!("{}", output.status))
    } else {
        Err(format!("{}\n{combined}", output.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installer(package: &[&str], service: &[&str]) -> SystemInstaller {
        let to_vec = |argv: &[&str]| argv.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        SystemInstaller::new(InstallerConfig {
            package_command: to_vec(package),
            extension_command: to_vec(package),
            service_command: to_vec(service),
            user_service_command: to_vec(service),
        })
    }

    #[test]
    fn parses_plain_package() {
        let spec = PackageSpec::parse("neovim").unwrap();
        assert_eq!(spec.name, "neovim");
        assert!(spec.services.is_empty());
        assert!(!spec.user_level);
    }

    #[test]
    fn parses_service_annotations() {
        let spec = PackageSpec::parse("pipewire [user] [pipewire-pulse.service] noise").unwrap();
        assert_eq!(spec.name, "pipewire");
        assert_eq!(spec.services, vec!["pipewire-pulse.service".to_string()]);
        assert!(spec.user_level);
    }

    #[test]
    fn blank_entry_is_not_a_package() {
        assert!(PackageSpec::parse("   ").is_none());
    }

    #[test]
    fn blank_entry_fails_install() {
        let outcome = installer(&["true"], &["true"]).install("  ", InstallKind::Package);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.log_line, "Invalid package string");
    }

    #[test]
    fn successful_command_reports_success() {
        let outcome = installer(&["true"], &["true"]).install("htop", InstallKind::Package);
        assert!(outcome.succeeded);
        assert_eq!(outcome.item_name, "htop");
        assert_eq!(outcome.log_line, "htop: Installed successfully");
    }

    #[test]
    fn failing_command_reports_failure() {
        let outcome = installer(&["false"], &["true"]).install("htop", InstallKind::Extension);
        assert!(!outcome.succeeded);
        assert!(outcome.log_line.starts_with("htop: Failed to install"));
    }

    #[test]
    fn service_failure_fails_the_item() {
        let outcome =
            installer(&["true"], &["false"]).install("docker [docker.service]", InstallKind::Package);
        assert!(!outcome.succeeded);
        assert!(outcome.log_line.contains("docker: Installed successfully"));
        assert!(outcome.log_line.contains("Failed to enable docker.service"));
    }

    #[test]
    fn missing_program_is_a_failure_not_a_panic() {
        let err = run(&["archutils-definitely-not-a-binary"]).unwrap_err();
        assert!(err.starts_with("archutils-definitely-not-a-binary:"));
    }

    #[test]
    fn unknown_script_fails() {
        let outcome = installer(&["true"], &["true"]).install("nope", InstallKind::Script);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.log_line, "unknown script: nope");
    }

    #[test]
    fn failure_diagnostic_carries_status_and_output() {
        let err = run(&["sh", "-c", "echo out; echo err >&2; exit 3"]).unwrap_err();
        assert!(err.starts_with("exit status: 3"), "{err}");
        assert!(err.contains("out"));
        assert!(err.contains("err"));
    }

    #[test]
    fn stdin_is_piped_to_the_command() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.conf");
        let target = target.to_string_lossy().into_owned();
        let options = RunOptions {
            stdin: Some("PasswordAuthentication no\n"),
            ..RunOptions::default()
        };
        run_command(&["tee", target.as_str()], options).unwrap();
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "PasswordAuthentication no\n"
        );
    }

    #[test]
    fn cwd_sets_the_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();
        let options = RunOptions {
            cwd: Some(dir.path()),
            ..RunOptions::default()
        };
        assert!(run_command(&["test", "-f", "marker"], options).is_ok());
        assert!(run_command(&["test", "-f", "absent"], options).is_err());
    }

    #[test]
    fn stdout_is_returned_on_success() {
        let out = run_command(&["echo", "paru-bin"], RunOptions::default()).unwrap();
        assert_eq!(out.trim(), "paru-bin");
    }
}
