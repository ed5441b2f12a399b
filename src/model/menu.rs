use crate::model::config::CatalogsConfig;
use crate::model::installer::InstallKind;
use crate::model::scripts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogId {
    Packages,
    Extensions,
}

impl CatalogId {
    pub fn key<'a>(&self, catalogs: &'a CatalogsConfig) -> &'a str {
        match self {
            CatalogId::Packages => &catalogs.packages,
            CatalogId::Extensions => &catalogs.extensions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    /// Browse a catalog; its items install as `kind`.
    Catalog { id: CatalogId, kind: InstallKind },
    /// Run a single setup script directly.
    Script(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct MenuAction {
    pub title: &'static str,
    pub description: &'static str,
    pub target: MenuTarget,
}

pub static MAIN_MENU: &[MenuAction] = &[
    MenuAction {
        title: "Arch Linux Packages",
        description: "A categorized collection of Arch Linux packages",
        target: MenuTarget::Catalog {
            id: CatalogId::Packages,
            kind: InstallKind::Package,
        },
    },
    MenuAction {
        title: "Install Paru",
        description: "Paru AUR helper - a package manager for the Arch Linux community repository",
        target: MenuTarget::Script(scripts::PARU),
    },
    MenuAction {
        title: "VSCode Extensions",
        description: "A collection of VSCode extensions",
        target: MenuTarget::Catalog {
            id: CatalogId::Extensions,
            kind: InstallKind::Extension,
        },
    },
    MenuAction {
        title: "Enable Autologin",
        description: "Log the current user in automatically on tty1",
        target: MenuTarget::Script(scripts::AUTOLOGIN),
    },
    MenuAction {
        title: "Passwordless SSH",
        description: "Disable SSH password authentication and enable sshd",
        target: MenuTarget::Script(scripts::PASSWORDLESS_SSH),
    },
];
