use crate::model::installer::{InstallOutcome, RunOptions, run, run_command};

pub const PARU: &str = "paru";
pub const AUTOLOGIN: &str = "autologin";
pub const PASSWORDLESS_SSH: &str = "passwordless-ssh";

const PARU_AUR_URL: &str = "https://aur.archlinux.org/paru.git";
const AUTOLOGIN_TEMPLATE: &str = include_str!("../../config/autologin.conf");
const AUTOLOGIN_DIR: &str = "/etc/systemd/system/getty@tty1.service.d";
const SSH_DROPIN_DIR: &str = "/etc/ssh/ssh_config.d";

/// A named setup routine made of external commands.
pub struct Script {
    pub name: &'static str,
    steps: fn() -> Result<String, String>,
}

impl Script {
    pub fn run(&self) -> InstallOutcome {
        tracing::info!("running script {}", self.name);
        match (self.steps)() {
            Ok(message) => InstallOutcome::success(self.name, message),
            Err(message) => InstallOutcome::failure(self.name, message),
        }
    }
}

static SCRIPTS: &[Script] = &[
    Script {
        name: PARU,
        steps: install_paru,
    },
    Script {
        name: AUTOLOGIN,
        steps: enable_autologin,
    },
    Script {
        name: PASSWORDLESS_SSH,
        steps: enable_passwordless_ssh,
    },
];

pub fn find(name: &str) -> Option<&'static Script> {
    SCRIPTS.iter().find(|script| script.name == name)
}

fn install_paru() -> Result<String, String> {
    // A stale paru (or paru-bin) blocks makepkg; remove whatever is there.
    if let Ok(installed) = run_command(&["pacman", "-Qeq", "paru"], RunOptions::default()) {
        let installed = installed.trim();
        if !installed.is_empty() {
            run(&["sudo", "pacman", "-Rns", "--noconfirm", installed]).map_err(|err| {
                format!("Failed to uninstall previous versions of paru ({installed}): {err}")
            })?;
        }
    }

    run(&["sudo", "pacman", "-S", "--needed", "--noconfirm", "base-devel", "git"])
        .map_err(|err| format!("Failed to install base-devel and git: {err}"))?;

    let build_dir = std::env::temp_dir().join("paru");
    let _ = std::fs::remove_dir_all(&build_dir);
    let build_dir_str = build_dir.to_string_lossy().into_owned();
    run(&["git", "clone", PARU_AUR_URL, build_dir_str.as_str()])
        .map_err(|err| format!("Failed to clone paru repository: {err}"))?;

    let built = run_command(
        &["makepkg", "-si", "--noconfirm"],
        RunOptions {
            cwd: Some(build_dir.as_path()),
            ..RunOptions::default()
        },
    );
    let _ = std::fs::remove_dir_all(&build_dir);
    built.map_err(|err| format!("Installation Error:\n{err}"))?;

    Ok("Paru installed successfully!".to_string())
}

fn enable_autologin() -> Result<String, String> {
    let user = std::env::var("USER")
        .ok()
        .filter(|user| !user.is_empty())
        .ok_or_else(|| "Unable to get current user".to_string())?;

    let dropin = render_autologin(&user);

    run(&["sudo", "mkdir", "-p", AUTOLOGIN_DIR])
        .map_err(|err| format!("Failed to create directory: {err}"))?;
    let target = format!("{AUTOLOGIN_DIR}/autologin.conf");
    write_as_root(&target, &dropin)
        .map_err(|err| format!("Failed to write autologin.conf: {err}"))?;

    Ok("Autologin configured successfully".to_string())
}

fn render_autologin(user: &str) -> String {
    AUTOLOGIN_TEMPLATE.replace("$USER", user)
}

fn write_as_root(target: &str, contents: &str) -> Result<(), String> {
    let options = RunOptions {
        stdin: Some(contents),
        ..RunOptions::default()
    };
    run_command(&["sudo", "tee", target], options).map(drop)
}

fn enable_passwordless_ssh() -> Result<String, String> {
    run(&["sudo", "mkdir", "-p", SSH_DROPIN_DIR])
        .map_err(|err| format!("Failed to create directory {SSH_DROPIN_DIR}: {err}"))?;
    let target = format!("{SSH_DROPIN_DIR}/disable_password.conf");
    write_as_root(&target, "PasswordAuthentication no\n")
        .map_err(|err| format!("Failed to write disable_password.conf: {err}"))?;
    let disabled = "SSH password authentication disabled successfully";

    run(&["sudo", "systemctl", "enable", "--now", "sshd"])
        .map_err(|err| format!("{disabled} - Failed to enable sshd: {err}"))?;

    Ok(format!("{disabled} - sshd Enabled successfully"))
}
